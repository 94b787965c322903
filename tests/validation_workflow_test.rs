//! End-to-end workflow tests: schema auto-discovery from the first file,
//! location maps, version selection and continue-after-failure behavior.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_xsd-validate");

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(BIN)
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to execute xsd-validate")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn fixture(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

const NS1_SCHEMA: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:n1="urn:ns1"
           xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="urn:ns1"
           elementFormDefault="qualified">
    <xs:element name="root">
        <xs:complexType>
            <xs:attribute name="count">
                <xs:simpleType>
                    <xs:restriction base="xs:integer">
                        <xs:maxInclusive value="10"/>
                    </xs:restriction>
                </xs:simpleType>
            </xs:attribute>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

const NS1_VALID: &str = r#"<?xml version="1.0"?>
<n1:root xmlns:n1="urn:ns1"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="urn:ns1 ns1.xsd"
         count="3"/>"#;

const NS1_INVALID: &str = r#"<?xml version="1.0"?>
<n1:root xmlns:n1="urn:ns1"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="urn:ns1 ns1.xsd"
         count="99"/>"#;

#[test]
fn test_schema_discovered_from_first_file() {
    let dir = TempDir::new().unwrap();
    fixture(&dir, "ns1.xsd", NS1_SCHEMA);
    fixture(&dir, "doc.xml", NS1_VALID);

    let output = run(&["doc.xml"], dir.path());
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
}

#[test]
fn test_namespace_uris_rendered_as_prefixes() {
    let dir = TempDir::new().unwrap();
    fixture(&dir, "ns1.xsd", NS1_SCHEMA);
    fixture(&dir, "doc.xml", NS1_INVALID);

    let output = run(&["doc.xml"], dir.path());
    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));

    let err = stderr(&output);
    // The offending element is appended in Clark form and then rewritten
    // with the schema's declared prefix.
    assert!(err.contains("n1:root"), "stderr: {}", err);
    assert!(!err.contains("{urn:ns1}"), "stderr: {}", err);
}

#[test]
fn test_min_version_selects_the_11_engine_variant() {
    let dir = TempDir::new().unwrap();
    let schema_11 = NS1_SCHEMA.replace(
        r#"targetNamespace="urn:ns1""#,
        concat!(
            r#"xmlns:vc="http://www.w3.org/2007/XMLSchema-versioning" "#,
            r#"vc:minVersion="1.1" targetNamespace="urn:ns1""#
        ),
    );
    fixture(&dir, "ns1.xsd", &schema_11);
    fixture(&dir, "doc.xml", NS1_VALID);

    let output = run(&["doc.xml"], dir.path());
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    // The 1.1 variant warns that libxml2 applies 1.0 rules.
    assert!(stderr(&output).contains("XSD 1.1"), "stderr: {}", stderr(&output));

    // An explicit -V 1.0 overrides the sniffed minimum version.
    let output = run(&["-V", "1.0", "doc.xml"], dir.path());
    assert_eq!(output.status.code(), Some(0));
    assert!(!stderr(&output).contains("XSD 1.1"));
}

#[test]
fn test_location_flag_feeds_additional_namespaces() {
    let dir = TempDir::new().unwrap();
    let importing_schema = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:n2="urn:ns2"
           targetNamespace="urn:ns1"
           elementFormDefault="qualified">
    <xs:import namespace="urn:ns2"/>
    <xs:element name="root">
        <xs:complexType>
            <xs:attribute ref="n2:mark"/>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;
    let imported_schema = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="urn:ns2">
    <xs:attribute name="mark" type="xs:string"/>
</xs:schema>"#;
    let doc = r#"<?xml version="1.0"?>
<n1:root xmlns:n1="urn:ns1" xmlns:n2="urn:ns2" n2:mark="yes"/>"#;

    fixture(&dir, "ns1.xsd", importing_schema);
    fixture(&dir, "ns2.xsd", imported_schema);
    fixture(&dir, "doc.xml", doc);

    let output = run(
        &["-S", "ns1.xsd", "-L", "urn:ns2", "ns2.xsd", "doc.xml"],
        dir.path(),
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
}

#[test]
fn test_second_file_failure_does_not_stop_the_third() {
    let dir = TempDir::new().unwrap();
    fixture(&dir, "ns1.xsd", NS1_SCHEMA);
    fixture(&dir, "ok.xml", NS1_VALID);
    fixture(&dir, "broken.xml", "<n1:root xmlns:n1='urn:ns1'><oops></n1:root>");
    fixture(&dir, "bad.xml", NS1_INVALID);

    let output = run(&["ok.xml", "broken.xml", "bad.xml"], dir.path());
    // broken.xml contributes one reported failure, bad.xml one error.
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));

    let err = stderr(&output);
    assert!(err.contains("broken.xml"), "stderr: {}", err);
    assert!(err.contains("bad.xml"), "stderr: {}", err);
    assert!(!err.contains("ok.xml:"), "stderr: {}", err);
}

#[test]
fn test_schema_load_failure_reports_every_file() {
    let dir = TempDir::new().unwrap();
    fixture(&dir, "ns1.xsd", "<xs:schema xmlns:xs='urn:wrong'>not a schema</xs:schema>");
    fixture(&dir, "a.xml", NS1_VALID);
    fixture(&dir, "b.xml", NS1_VALID);

    let output = run(&["-S", "ns1.xsd", "a.xml", "b.xml"], dir.path());
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("no schema loaded"));
}
