//! libxml2 FFI binding.
//!
//! All grammar parsing, type checking and constraint evaluation is delegated
//! to libxml2's `xmlschemas` module; this wrapper only compiles a schema,
//! runs validation, and collects structured errors into [`Issue`] records.
//!
//! The Rust ecosystem has no mature XSD validator, so libxml2 is bound
//! directly with hand-written FFI declarations rather than through a binding
//! crate. Initialization is guarded by `std::sync::Once` because libxml2's
//! init functions are not re-entrant.
//!
//! There is no "locations" parameter in libxml2's schema API. When a
//! namespace-to-path map is in play, a small driver schema is synthesized in
//! memory that imports the main schema and every mapped namespace, and that
//! driver is compiled instead.

use std::ffi::{CStr, CString};
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Once;

use indexmap::IndexMap;
use libc::{c_char, c_int, c_ushort, c_void};
use log::{debug, warn};

use crate::cli::SchemaVersion;
use crate::error::{EngineError, EngineResult};

static LIBXML2_INIT: Once = Once::new();

// Opaque libxml2 structures.
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

/// Mirror of libxml2's `xmlNs` (xmlsoft.org/html/libxml-tree.html).
#[repr(C)]
#[allow(dead_code)]
struct XmlNs {
    next: *mut XmlNs,
    typ: c_int,
    href: *const c_char,
    prefix: *const c_char,
    _private: *mut c_void,
    context: *mut c_void,
}

/// Mirror of libxml2's `xmlNode`, up to the fields we read.
#[repr(C)]
#[allow(dead_code)]
struct XmlNode {
    _private: *mut c_void,
    typ: c_int,
    name: *const c_char,
    children: *mut XmlNode,
    last: *mut XmlNode,
    parent: *mut XmlNode,
    next: *mut XmlNode,
    prev: *mut XmlNode,
    doc: *mut c_void,
    ns: *mut XmlNs,
    content: *mut c_char,
    properties: *mut XmlAttr,
    ns_def: *mut XmlNs,
    psvi: *mut c_void,
    line: c_ushort,
    extra: c_ushort,
}

/// Mirror of libxml2's `xmlAttr`, up to the fields we read.
#[repr(C)]
#[allow(dead_code)]
struct XmlAttr {
    _private: *mut c_void,
    typ: c_int,
    name: *const c_char,
    children: *mut XmlNode,
    last: *mut XmlNode,
    parent: *mut XmlNode,
    next: *mut XmlAttr,
    prev: *mut XmlAttr,
    doc: *mut c_void,
    ns: *mut XmlNs,
    atype: c_int,
    psvi: *mut c_void,
}

/// Mirror of libxml2's `xmlError`.
#[repr(C)]
#[allow(dead_code)]
struct XmlError {
    domain: c_int,
    code: c_int,
    message: *const c_char,
    level: c_int,
    file: *const c_char,
    line: c_int,
    str1: *const c_char,
    str2: *const c_char,
    str3: *const c_char,
    int1: c_int,
    int2: c_int,
    ctxt: *mut c_void,
    node: *mut c_void,
}

type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut XmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
extern "C" {
    fn xmlInitParser();

    // Document parsing
    fn xmlReadFile(filename: *const c_char, encoding: *const c_char, options: c_int)
        -> *mut XmlDoc;
    fn xmlFreeDoc(doc: *mut XmlDoc);
    fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);

    // Schema parsing
    fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaNewMemParserCtxt(buffer: *const c_char, size: c_int) -> *mut XmlSchemaParserCtxt;
    fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    fn xmlSchemaValidateDoc(ctxt: *const XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
    fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_int,
    ) -> c_int;
}

// Parser options (xmlParserOption)
const XML_PARSE_NOENT: c_int = 1 << 1;
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_NONET: c_int = 1 << 11;
const XML_PARSE_BIG_LINES: c_int = 1 << 22;

// Node types (xmlElementType)
const XML_ELEMENT_NODE: c_int = 1;
const XML_ATTRIBUTE_NODE: c_int = 2;

/// One validation error as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// The engine's message, trimmed.
    pub reason: String,
    /// Source line of the offending construct, when known.
    pub line: Option<u32>,
    /// What the error points at, for display.
    pub detail: IssueDetail,
}

/// Offending-object detail attached to an [`Issue`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IssueDetail {
    /// The offending element, rendered as `<tag attr="val">` in Clark form.
    Element(String),
    /// The element owning an offending attribute, rendered the same way.
    Owner(String),
    /// A plain text rendering of some other offending object.
    Value(String),
    /// Nothing usable (streaming validation, or no node on the error).
    #[default]
    Absent,
}

unsafe fn cstr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Render a name in Clark notation when the node is namespace-qualified.
unsafe fn clark_name(name: *const c_char, ns: *mut XmlNs) -> String {
    let local = cstr(name);
    if !ns.is_null() && !(*ns).href.is_null() {
        format!("{{{}}}{}", cstr((*ns).href), local)
    } else {
        local
    }
}

/// Render an element start tag, `<tag attr="val">`, names in Clark form.
unsafe fn element_text(node: *const XmlNode) -> String {
    let mut out = format!("<{}", clark_name((*node).name, (*node).ns));
    let mut attr = (*node).properties;
    while !attr.is_null() {
        let name = clark_name((*attr).name, (*attr).ns);
        // Attribute values are the content of the attr's first text child.
        // Entity references would need tree walking; display falls back to
        // empty rather than allocate through xmlFree-managed helpers.
        let child = (*attr).children;
        let value = if !child.is_null() && !(*child).content.is_null() {
            cstr((*child).content)
        } else {
            String::new()
        };
        let _ = write!(out, " {}=\"{}\"", name, value);
        attr = (*attr).next;
    }
    out.push('>');
    out
}

/// Derive display detail from the error's node pointer, when present.
unsafe fn node_detail(node: *mut c_void) -> IssueDetail {
    if node.is_null() {
        return IssueDetail::Absent;
    }
    let node = node as *const XmlNode;
    match (*node).typ {
        XML_ELEMENT_NODE => IssueDetail::Element(element_text(node)),
        XML_ATTRIBUTE_NODE => {
            let parent = (*node).parent;
            if !parent.is_null() && (*parent).typ == XML_ELEMENT_NODE {
                IssueDetail::Owner(element_text(parent))
            } else {
                IssueDetail::Absent
            }
        }
        _ => {
            let content = (*node).content;
            if content.is_null() {
                IssueDetail::Absent
            } else {
                IssueDetail::Value(cstr(content))
            }
        }
    }
}

/// libxml2 structured-error callback; `user_data` is a `*mut Vec<Issue>`.
unsafe extern "C" fn collect_issues(user_data: *mut c_void, error: *mut XmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let issues = &mut *(user_data as *mut Vec<Issue>);

    let reason = cstr((*error).message).trim_end().to_string();
    if reason.is_empty() {
        return;
    }
    let line = if (*error).line > 0 {
        Some((*error).line as u32)
    } else {
        None
    };
    issues.push(Issue {
        reason,
        line,
        detail: node_detail((*error).node),
    });
}

/// A compiled schema. Constructed once per run and read-only thereafter.
#[derive(Debug)]
pub struct CompiledSchema {
    ptr: *mut XmlSchema,
}

impl CompiledSchema {
    unsafe fn from_raw(ptr: *mut XmlSchema) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(CompiledSchema { ptr })
        }
    }

    fn as_ptr(&self) -> *const XmlSchema {
        self.ptr
    }
}

impl Drop for CompiledSchema {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlSchemaFree(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

fn path_cstring(path: &Path) -> EngineResult<CString> {
    path.to_str()
        .and_then(|s| CString::new(s).ok())
        .ok_or_else(|| EngineError::InvalidPath {
            file: path.to_path_buf(),
        })
}

fn parser_options(defused: bool) -> c_int {
    let base = XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_BIG_LINES;
    if defused {
        // No entity substitution, no network fetches.
        base | XML_PARSE_NONET
    } else {
        base | XML_PARSE_NOENT
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Synthesize the in-memory driver schema that carries the location map.
fn compose_driver_schema(
    schema: &Path,
    target_namespace: Option<&str>,
    locations: &IndexMap<String, PathBuf>,
) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">\n",
    );
    // Mapped namespaces come first so their locations win over any bare
    // imports inside the main schema.
    for (namespace, path) in locations {
        if target_namespace == Some(namespace.as_str()) {
            continue;
        }
        let _ = writeln!(
            out,
            "  <xs:import namespace=\"{}\" schemaLocation=\"{}\"/>",
            escape_attr(namespace),
            escape_attr(&path.display().to_string())
        );
    }
    let schema_location = escape_attr(&schema.display().to_string());
    match target_namespace {
        Some(ns) => {
            let _ = writeln!(
                out,
                "  <xs:import namespace=\"{}\" schemaLocation=\"{}\"/>",
                escape_attr(ns),
                schema_location
            );
        }
        None => {
            let _ = writeln!(out, "  <xs:include schemaLocation=\"{}\"/>", schema_location);
        }
    }
    out.push_str("</xs:schema>\n");
    out
}

fn issues_summary(issues: &[Issue], fallback: &str) -> String {
    if issues.is_empty() {
        fallback.to_string()
    } else {
        issues
            .iter()
            .map(|i| i.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Front door to libxml2 schema compilation and validation.
///
/// There is one engine variant per XSD version the tool knows about; both are
/// backed by the same libxml2 grammar code, which implements XSD 1.0. A 1.1
/// selection is recorded and warned about rather than refused, since 1.1
/// schemas are mostly checkable under 1.0 rules.
pub struct Engine {
    version: SchemaVersion,
    _phantom: PhantomData<*mut ()>,
}

impl Engine {
    pub fn new(version: SchemaVersion) -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });
        if version == SchemaVersion::V11 {
            warn!("XSD 1.1 selected; engine applies 1.0 rules to 1.1 constructs");
        }
        Engine {
            version,
            _phantom: PhantomData,
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Compile the schema at `path`, feeding `locations` to the engine via a
    /// synthesized driver schema when the map is non-empty.
    pub fn compile(
        &self,
        path: &Path,
        target_namespace: Option<&str>,
        locations: &IndexMap<String, PathBuf>,
    ) -> EngineResult<CompiledSchema> {
        if locations.is_empty() {
            self.compile_file(path)
        } else {
            let driver = compose_driver_schema(path, target_namespace, locations);
            debug!("driver schema:\n{}", driver);
            self.compile_memory(driver.as_bytes())
        }
    }

    /// Compile a schema directly from a file path or URL.
    pub fn compile_file(&self, path: &Path) -> EngineResult<CompiledSchema> {
        let c_path = path_cstring(path)?;
        let mut issues: Vec<Issue> = Vec::new();

        unsafe {
            let ctxt = xmlSchemaNewParserCtxt(c_path.as_ptr());
            if ctxt.is_null() {
                return Err(EngineError::MemoryAllocation);
            }
            xmlSchemaSetParserStructuredErrors(
                ctxt,
                Some(collect_issues),
                &mut issues as *mut Vec<Issue> as *mut c_void,
            );
            let schema = xmlSchemaParse(ctxt);
            xmlSchemaFreeParserCtxt(ctxt);

            CompiledSchema::from_raw(schema).ok_or_else(|| EngineError::SchemaParseFailed {
                details: issues_summary(&issues, "no detail from engine"),
            })
        }
    }

    /// Compile a schema from an in-memory buffer.
    pub fn compile_memory(&self, data: &[u8]) -> EngineResult<CompiledSchema> {
        let mut issues: Vec<Issue> = Vec::new();

        unsafe {
            let ctxt = xmlSchemaNewMemParserCtxt(data.as_ptr() as *const c_char, data.len() as c_int);
            if ctxt.is_null() {
                return Err(EngineError::MemoryAllocation);
            }
            xmlSchemaSetParserStructuredErrors(
                ctxt,
                Some(collect_issues),
                &mut issues as *mut Vec<Issue> as *mut c_void,
            );
            let schema = xmlSchemaParse(ctxt);
            xmlSchemaFreeParserCtxt(ctxt);

            CompiledSchema::from_raw(schema).ok_or_else(|| EngineError::SchemaParseFailed {
                details: issues_summary(&issues, "no detail from engine"),
            })
        }
    }

    /// Validate one file against a compiled schema, returning the engine's
    /// issues in document order.
    ///
    /// In the default mode the document is parsed to a tree first so that
    /// issues carry node detail; in lazy mode libxml2 streams the file and
    /// issues carry reason and line only. `defused` selects the parser
    /// options applied to the document (tree mode only; the streaming reader
    /// uses libxml2's defaults, which do not substitute entities).
    pub fn validate(
        &self,
        schema: &CompiledSchema,
        path: &Path,
        lazy: bool,
        defused: bool,
    ) -> EngineResult<Vec<Issue>> {
        let c_path = path_cstring(path)?;
        let mut issues: Vec<Issue> = Vec::new();

        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(EngineError::ValidationContextCreationFailed);
            }
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(collect_issues),
                &mut issues as *mut Vec<Issue> as *mut c_void,
            );

            let code = if lazy {
                xmlSchemaValidateFile(valid_ctxt, c_path.as_ptr(), 0)
            } else {
                let mut parse_issues: Vec<Issue> = Vec::new();
                xmlSetStructuredErrorFunc(
                    &mut parse_issues as *mut Vec<Issue> as *mut c_void,
                    Some(collect_issues),
                );
                let doc = xmlReadFile(c_path.as_ptr(), std::ptr::null(), parser_options(defused));
                xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);

                if doc.is_null() {
                    xmlSchemaFreeValidCtxt(valid_ctxt);
                    return Err(EngineError::DocumentParseFailed {
                        file: path.to_path_buf(),
                        details: issues_summary(&parse_issues, "malformed XML"),
                    });
                }
                let code = xmlSchemaValidateDoc(valid_ctxt, doc);
                xmlFreeDoc(doc);
                code
            };

            xmlSchemaFreeValidCtxt(valid_ctxt);

            if code < 0 {
                return Err(EngineError::InternalError {
                    code,
                    file: path.to_path_buf(),
                });
            }
            if code > 0 && issues.is_empty() {
                // The callback missed whatever made libxml2 unhappy.
                issues.push(Issue {
                    reason: format!("validation failed with code {}", code),
                    line: None,
                    detail: IssueDetail::Absent,
                });
            }
            Ok(issues)
        }
    }
}
