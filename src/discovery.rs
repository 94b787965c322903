//! Schema and location discovery.
//!
//! When no explicit schema was given, the first input document is sniffed for
//! its root namespace and `xsi:schemaLocation` hints; the chosen schema is
//! then sniffed for its `vc:minVersion` attribute, its `xs:import`
//! statements, and its declared namespace prefixes.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::info;
use roxmltree::Document;

use crate::error::{Result, ToolError};
use crate::resolver::Resolver;

pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const VC_NS: &str = "http://www.w3.org/2007/XMLSchema-versioning";

/// What the first input document tells us about its schema.
#[derive(Debug, Clone, Default)]
pub struct DocumentHints {
    /// Root element namespace, if qualified.
    pub namespace: Option<String>,
    /// Schema location paired with the root namespace, if any.
    pub schema: Option<String>,
    /// Remaining `xsi:schemaLocation` (namespace, location) pairs.
    pub locations: Vec<(String, String)>,
}

/// What the schema document itself tells us.
#[derive(Debug, Clone, Default)]
pub struct SchemaHints {
    pub target_namespace: Option<String>,
    /// Raw `vc:minVersion` attribute value.
    pub min_version: Option<String>,
    /// `xs:import` (namespace, schemaLocation) pairs.
    pub imports: Vec<(String, String)>,
    /// Clark-wrapped namespace -> short prefix, for error rendering only.
    pub prefixes: IndexMap<String, String>,
}

fn parse(path: &Path) -> Result<(String, PathBuf)> {
    let text = fs::read_to_string(path)?;
    Ok((text, path.to_path_buf()))
}

fn sniff_error(file: &Path, error: roxmltree::Error) -> ToolError {
    ToolError::Sniff {
        file: file.to_path_buf(),
        details: error.to_string(),
    }
}

/// Parse an input document and extract its schema hints.
pub fn sniff_document(path: &Path) -> Result<DocumentHints> {
    let (text, file) = parse(path)?;
    let doc = Document::parse(&text).map_err(|e| sniff_error(&file, e))?;
    let root = doc.root_element();

    let namespace = root.tag_name().namespace().map(str::to_string);

    let mut pairs: Vec<(String, String)> = Vec::new();
    if let Some(attr) = root.attribute((XSI_NS, "schemaLocation")) {
        let mut tokens = attr.split_whitespace();
        while let (Some(ns), Some(location)) = (tokens.next(), tokens.next()) {
            pairs.push((ns.to_string(), location.to_string()));
        }
    }

    let mut schema = None;
    if let Some(ns) = &namespace {
        if let Some(index) = pairs.iter().position(|(n, _)| n == ns) {
            schema = Some(pairs.remove(index).1);
        }
    }

    Ok(DocumentHints {
        namespace,
        schema,
        locations: pairs,
    })
}

/// Parse a schema document and extract version, imports and prefixes.
pub fn sniff_schema(path: &Path) -> Result<SchemaHints> {
    let (text, file) = parse(path)?;
    let doc = Document::parse(&text).map_err(|e| sniff_error(&file, e))?;
    let root = doc.root_element();

    let target_namespace = root.attribute("targetNamespace").map(str::to_string);
    let min_version = root.attribute((VC_NS, "minVersion")).map(str::to_string);

    let imports = root
        .children()
        .filter(|n| n.has_tag_name((XSD_NS, "import")))
        .filter_map(|n| {
            let namespace = n.attribute("namespace").unwrap_or("");
            let location = n.attribute("schemaLocation").unwrap_or("");
            if namespace.is_empty() || location.is_empty() {
                None
            } else {
                Some((namespace.to_string(), location.to_string()))
            }
        })
        .collect();

    // Reverse map '{NAMESPACE}' -> 'PREFIX:' used when reporting XML
    // elements and attributes.
    let prefixes = root
        .namespaces()
        .map(|ns| {
            (
                format!("{{{}}}", ns.uri()),
                format!("{}:", ns.name().unwrap_or("")),
            )
        })
        .collect();

    Ok(SchemaHints {
        target_namespace,
        min_version,
        imports,
        prefixes,
    })
}

/// Resolve `pairs` and merge them into `locations`.
///
/// Entries already present are never overwritten: explicit flags beat
/// document hints, which beat schema imports. Resolved paths are
/// absolutized because relative paths are unreliable once handed to the
/// engine's own import loader.
pub fn add_locations(
    locations: &mut IndexMap<String, PathBuf>,
    pairs: &[(String, String)],
    resolver: &Resolver,
) {
    for (namespace, file) in pairs {
        if locations.contains_key(namespace) {
            continue;
        }
        if let Some(path) = resolver.resolve(file) {
            let path = std::path::absolute(&path).unwrap_or(path);
            info!("set location {} to {}", namespace, path.display());
            locations.insert(namespace.clone(), path);
        }
    }
}
