//! # xsd-validate
//!
//! Command-line front end for XML Schema validation. The tool locates an XML
//! document and its XSD schema, resolves cross-references between schema
//! namespaces and schema files, hands the actual validation to libxml2, and
//! reformats the engine's errors into concise, readable diagnostics.
//!
//! If the include path is set, it shouldn't usually be necessary to set the
//! schema, version or locations explicitly.

pub mod cli;
pub mod discovery;
pub mod driver;
pub mod engine;
pub mod error;
pub mod report;
pub mod resolver;

pub use cli::{Cli, Defuse, SchemaVersion};
pub use discovery::{sniff_document, sniff_schema, DocumentHints, SchemaHints};
pub use driver::{validate_all, RunConfig, Totals};
pub use engine::{CompiledSchema, Engine, Issue, IssueDetail};
pub use error::{EngineError, ToolError};
pub use report::{issue_message, NamespaceMap};
pub use resolver::Resolver;
