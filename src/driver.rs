//! Sequential validation driver.
//!
//! Walks the input files in command-line order, resolving each against the
//! include path, validating it against the one shared compiled schema, and
//! feeding every engine issue through the normalizer. A failure on one file
//! never aborts validation of the rest.

use log::info;

use crate::cli::Defuse;
use crate::engine::{CompiledSchema, Engine};
use crate::error::{EngineError, ToolError};
use crate::report::{report_failure, report_issue, NamespaceMap};
use crate::resolver::{is_url, Resolver};

/// Per-run validation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunConfig {
    pub terse: bool,
    pub lazy: bool,
    pub defuse: Defuse,
}

/// Running counts across all files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Errors reported (drives the process exit code).
    pub reported: usize,
    /// Errors suppressed by the normalizer.
    pub ignored: usize,
}

/// Validate every file against the shared compiled schema.
///
/// The same compiled schema is reused for all files on the assumption that
/// they conform to one schema; that keeps multi-file runs cheap but is an
/// assumption, not a guarantee. A `None` schema (load failed earlier) makes
/// every file report one engine failure.
pub fn validate_all(
    files: &[String],
    resolver: &Resolver,
    engine: &Engine,
    schema: Option<&CompiledSchema>,
    namespaces: &NamespaceMap,
    config: &RunConfig,
) -> Totals {
    let mut totals = Totals::default();

    for file in files {
        // Unresolved files are skipped, already logged, and never counted.
        let Some(path) = resolver.resolve(file) else {
            continue;
        };

        let Some(schema) = schema else {
            report_failure(file, &ToolError::Engine(EngineError::NoSchema));
            totals.reported += 1;
            continue;
        };

        let defused = config.defuse.applies(is_url(file));
        info!("validating {}", path.display());

        match engine.validate(schema, &path, config.lazy, defused) {
            Ok(issues) => {
                for issue in &issues {
                    if report_issue(file, issue, namespaces, config.terse) {
                        totals.reported += 1;
                    } else {
                        totals.ignored += 1;
                    }
                }
            }
            Err(failure) => {
                report_failure(file, &ToolError::Engine(failure));
                totals.reported += 1;
            }
        }
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SchemaVersion;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="root">
        <xs:complexType>
            <xs:attribute name="count" type="xs:integer"/>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn setup(dir: &TempDir) -> (Engine, CompiledSchema, Resolver) {
        let engine = Engine::new(SchemaVersion::V10);
        let schema = engine.compile_memory(SCHEMA.as_bytes()).unwrap();
        let resolver = Resolver::new(vec![dir.path().to_path_buf()]);
        (engine, schema, resolver)
    }

    #[test]
    fn test_valid_files_count_nothing() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ok.xml", r#"<root count="1"/>"#);
        let (engine, schema, resolver) = setup(&dir);

        let totals = validate_all(
            &["ok.xml".to_string()],
            &resolver,
            &engine,
            Some(&schema),
            &NamespaceMap::new(),
            &RunConfig::default(),
        );
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_failure_on_one_file_does_not_abort_the_rest() {
        let dir = TempDir::new().unwrap();
        write(&dir, "ok.xml", r#"<root count="1"/>"#);
        write(&dir, "broken.xml", "<root><unclosed></root>");
        write(&dir, "bad.xml", r#"<root count="x"/>"#);
        let (engine, schema, resolver) = setup(&dir);

        let files: Vec<String> = ["ok.xml", "broken.xml", "bad.xml"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let totals = validate_all(
            &files,
            &resolver,
            &engine,
            Some(&schema),
            &NamespaceMap::new(),
            &RunConfig::default(),
        );
        // One parse failure plus one validation error.
        assert_eq!(totals.reported, 2);
        assert_eq!(totals.ignored, 0);
    }

    #[test]
    fn test_unresolved_file_is_skipped_not_counted() {
        let dir = TempDir::new().unwrap();
        let (engine, schema, resolver) = setup(&dir);

        let totals = validate_all(
            &["missing.xml".to_string()],
            &resolver,
            &engine,
            Some(&schema),
            &NamespaceMap::new(),
            &RunConfig::default(),
        );
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_no_schema_reports_every_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.xml", "<root/>");
        write(&dir, "b.xml", "<root/>");
        let (engine, _schema, resolver) = setup(&dir);

        let files: Vec<String> = ["a.xml", "b.xml"].iter().map(|s| s.to_string()).collect();
        let totals = validate_all(
            &files,
            &resolver,
            &engine,
            None,
            &NamespaceMap::new(),
            &RunConfig::default(),
        );
        assert_eq!(totals.reported, 2);
    }
}
