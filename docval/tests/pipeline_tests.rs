#![allow(clippy::unwrap_used)]
//! Integration tests for `ValidationPipeline`.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use docval::{
    ConstraintValidator, Format, ProcessingError, RuleSetValidator, ValidationPipeline,
    ValidationResult, ValidatorConfig, Verdict,
};
use tempfile::TempDir;

const CATALOG_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="catalog">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="book" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="title" type="xs:string"/>
              <xs:element name="pages" type="xs:positiveInteger"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:ID" use="required"/>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>
"#;

const CATALOG_SCHEMA_JSON: &str = r#"{
  "type": "object",
  "required": ["book"],
  "properties": {
    "book": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["id", "title", "pages"],
        "properties": {
          "id": {"type": "string"},
          "title": {"type": "string"},
          "pages": {"type": "integer", "minimum": 1}
        }
      }
    }
  }
}"#;

const RULES: &str = "rules:
  - id: unique-book-id
    path: /book/id
    kind: unique
";

const VALID_XML: &str = r#"<?xml version="1.0"?>
<catalog>
  <book id="b1">
    <title>Dune</title>
    <pages>412</pages>
  </book>
  <book id="b2">
    <title>Solaris</title>
    <pages>204</pages>
  </book>
</catalog>
"#;

const VALID_JSON: &str = r#"{"book": [
  {"id": "b1", "title": "Dune", "pages": 412},
  {"id": "b2", "title": "Solaris", "pages": 204}
]}"#;

const VALID_YAML: &str = "book:
  - id: b1
    title: Dune
    pages: 412
  - id: b2
    title: Solaris
    pages: 204
";

struct Fixture {
    dir: TempDir,
    config: ValidatorConfig,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = ValidatorConfig::default();
        config.xml_schemas = vec![write(dir.path(), "catalog.xsd", CATALOG_XSD)];
        config.json_schema = Some(write(dir.path(), "catalog.schema.json", CATALOG_SCHEMA_JSON));
        config.constraints = vec![write(dir.path(), "rules.yaml", RULES)];
        Self { dir, config }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        write(self.dir.path(), name, content)
    }

    fn pipeline(&self) -> ValidationPipeline {
        ValidationPipeline::from_config(&self.config).unwrap()
    }
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Records how often the constraint stage runs.
struct CountingConstraints {
    calls: Rc<Cell<usize>>,
}

impl ConstraintValidator for CountingConstraints {
    fn validate(
        &self,
        target: &Path,
        _format: Format,
    ) -> Result<ValidationResult, ProcessingError> {
        self.calls.set(self.calls.get() + 1);
        Ok(ValidationResult::new(target))
    }
}

#[test]
fn test_valid_documents_in_every_format() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();
    for (name, content, format) in [
        ("sample.xml", VALID_XML, Format::Xml),
        ("sample.json", VALID_JSON, Format::Json),
        ("sample.yaml", VALID_YAML, Format::Yaml),
    ] {
        let outcome = pipeline.validate_path(fixture.file(name, content), None);
        assert_eq!(outcome.verdict, Verdict::Valid, "{name}: {:?}", outcome.message);
        assert_eq!(outcome.format, Some(format));
        assert!(outcome.constraints.is_some());
    }
}

#[test]
fn test_schema_failure_skips_constraint_stage() {
    let fixture = Fixture::new();
    let calls = Rc::new(Cell::new(0));
    let pipeline = fixture.pipeline().with_constraints(CountingConstraints {
        calls: Rc::clone(&calls),
    });

    for (name, content) in [
        ("bad.xml", "<catalog><book id=\"b1\"><title>x</title></book></catalog>"),
        ("bad.json", r#"{"book": [{"id": "b1", "title": "x", "pages": 0}]}"#),
        ("bad.yaml", "book: 3\n"),
    ] {
        let outcome = pipeline.validate_path(fixture.file(name, content), None);
        assert_eq!(outcome.verdict, Verdict::SchemaInvalid, "{name}");
    }
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_constraint_stage_runs_after_passing_schema() {
    let fixture = Fixture::new();
    let calls = Rc::new(Cell::new(0));
    let pipeline = fixture.pipeline().with_constraints(CountingConstraints {
        calls: Rc::clone(&calls),
    });
    let outcome = pipeline.validate_path(fixture.file("ok.json", VALID_JSON), None);
    assert_eq!(outcome.verdict, Verdict::Valid);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_invalid_hint_is_configuration_error() {
    let fixture = Fixture::new();
    let calls = Rc::new(Cell::new(0));
    let pipeline = fixture.pipeline().with_constraints(CountingConstraints {
        calls: Rc::clone(&calls),
    });
    let target = fixture.file("sample.json", VALID_JSON);

    for hint in ["toml", "", "jsonn", "x m l"] {
        let outcome = pipeline.validate_path(&target, Some(hint));
        assert_eq!(outcome.verdict, Verdict::ConfigurationError, "{hint:?}");
        assert!(outcome.schema.is_none());
        let message = outcome.message.unwrap();
        assert!(message.contains("XML, JSON, and YAML"), "{message}");
    }
    assert_eq!(calls.get(), 0);

    for hint in ["JSON", "json", "Json"] {
        assert_eq!(pipeline.validate_path(&target, Some(hint)).verdict, Verdict::Valid);
    }
}

#[test]
fn test_missing_target_names_the_path() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();
    let missing = fixture.dir.path().join("nope.xml");

    for hint in [None, Some("xml"), Some("yaml")] {
        let outcome = pipeline.validate_path(&missing, hint);
        assert_eq!(outcome.verdict, Verdict::ConfigurationError);
        assert_eq!(outcome.verdict.exit_code(), 4);
        let message = outcome.message.unwrap();
        assert!(message.contains(&*missing.to_string_lossy()), "{message}");
    }
}

#[test]
fn test_yaml_and_json_report_the_same_findings() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();
    let json = fixture.file(
        "data.json",
        r#"{"book": [{"id": "b1", "title": 7, "pages": -2}, {"id": "b2"}]}"#,
    );
    let yaml = fixture.file(
        "data.yaml",
        "book:\n  - id: b1\n    title: 7\n    pages: -2\n  - id: b2\n",
    );

    let from_json = pipeline.validate_path(&json, None);
    let from_yaml = pipeline.validate_path(&yaml, None);
    assert_eq!(from_json.verdict, Verdict::SchemaInvalid);
    assert_eq!(from_yaml.verdict, Verdict::SchemaInvalid);

    let json_result = from_json.schema.unwrap();
    let yaml_result = from_yaml.schema.unwrap();
    assert_eq!(json_result.findings, yaml_result.findings);
    assert_eq!(yaml_result.document, yaml);
    assert!(json_result.findings.len() >= 3);
}

#[test]
fn test_runs_are_idempotent() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();
    let target = fixture.file("twice.xml", "<catalog><book id=\"b1\"/></catalog>");

    let first = pipeline.validate_path(&target, None);
    let second = pipeline.validate_path(&target, None);
    assert_eq!(first.verdict, second.verdict);
    assert_eq!(first.schema, second.schema);
    assert_eq!(first.constraints, second.constraints);

    let rebuilt = fixture.pipeline().validate_path(&target, None);
    assert_eq!(first.schema, rebuilt.schema);
}

#[test]
fn test_removed_required_element_is_schema_invalid() {
    let fixture = Fixture::new();
    let pipeline = fixture.pipeline();
    let target = fixture.file("sample.xml", &VALID_XML.replace("    <pages>204</pages>\n", ""));

    let outcome = pipeline.validate_path(&target, None);
    assert_eq!(outcome.verdict, Verdict::SchemaInvalid);
    assert_eq!(outcome.verdict.exit_code(), 1);
    let findings = outcome.schema.unwrap().findings;
    assert!(!findings.is_empty());
    assert!(
        findings.iter().any(|f| f.message.contains("'pages'")),
        "{findings:?}"
    );
}

#[test]
fn test_xml_content_with_json_extension_routes_to_xml() {
    let fixture = Fixture::new();
    let target = fixture.file("catalog.json", VALID_XML);

    let outcome = fixture.pipeline().validate_path(&target, None);
    assert_eq!(outcome.format, Some(Format::Xml));
    assert_eq!(outcome.verdict, Verdict::Valid);
}

#[test]
fn test_json_with_byte_order_mark_is_validated() {
    let fixture = Fixture::new();
    let target = fixture.file("bom.json", &format!("\u{feff}{VALID_JSON}"));

    let outcome = fixture.pipeline().validate_path(target, None);
    assert_eq!(outcome.verdict, Verdict::Valid, "{:?}", outcome.message);
    assert_eq!(outcome.format, Some(Format::Json));
    assert!(outcome.constraints.is_some());
}

#[test]
fn test_unrecognizable_content_is_configuration_error() {
    let fixture = Fixture::new();
    let target = fixture.file("notes.txt", "just some words\n");

    let outcome = fixture.pipeline().validate_path(&target, None);
    assert_eq!(outcome.verdict, Verdict::ConfigurationError);
    assert!(outcome.message.unwrap().contains("unrecognizable format"));
}

#[test]
fn test_yaml_with_json_hint_is_processing_error() {
    let fixture = Fixture::new();
    let target = fixture.file("data.yaml", VALID_YAML);

    let outcome = fixture.pipeline().validate_path(&target, Some("json"));
    assert_eq!(outcome.verdict, Verdict::ProcessingError);
    assert_eq!(outcome.verdict.exit_code(), 3);
    assert_eq!(outcome.format, Some(Format::Json));
    assert!(outcome.message.unwrap().contains("JSON parse error"));

    // JSON is valid YAML, so the opposite mismatch validates
    let json = fixture.file("data.json", VALID_JSON);
    assert_eq!(
        fixture.pipeline().validate_path(&json, Some("yaml")).verdict,
        Verdict::Valid
    );
}

#[test]
fn test_constraint_failure_is_constraint_invalid() {
    let fixture = Fixture::new();
    let target = fixture.file("dupes.json", &VALID_JSON.replace("\"b2\"", "\"b1\""));

    let outcome = fixture.pipeline().validate_path(&target, None);
    assert_eq!(outcome.verdict, Verdict::ConstraintInvalid);
    assert_eq!(outcome.verdict.exit_code(), 2);
    assert!(outcome.schema.unwrap().is_passing());
    let constraints = outcome.constraints.unwrap();
    assert_eq!(constraints.findings.len(), 1);
    assert_eq!(constraints.findings[0].rule.as_deref(), Some("unique-book-id"));
}

#[test]
fn test_constraints_apply_to_xml_model() {
    let fixture = Fixture::new();
    let target = fixture.file("dupes.xml", &VALID_XML.replace("id=\"b2\"", "id=\"b1\""));

    let outcome = fixture.pipeline().validate_path(&target, None);
    assert_eq!(outcome.verdict, Verdict::ConstraintInvalid);
}

#[test]
fn test_unreadable_schema_is_processing_error() {
    let mut fixture = Fixture::new();
    fixture.config.json_schema = Some(fixture.dir.path().join("missing.schema.json"));
    fixture.config.xml_schemas = vec![fixture.dir.path().join("missing.xsd")];

    let json = fixture.file("a.json", VALID_JSON);
    let xml = fixture.file("a.xml", VALID_XML);
    for target in [json, xml] {
        let outcome = fixture.pipeline().validate_path(&target, None);
        assert_eq!(outcome.verdict, Verdict::ProcessingError);
        assert!(outcome.message.unwrap().contains("unable to load schema"));
    }
}

#[test]
fn test_malformed_xml_is_processing_error() {
    let fixture = Fixture::new();
    let target = fixture.file("broken.xml", "<catalog><book id=\"b1\"></catalog>");
    let outcome = fixture.pipeline().validate_path(&target, None);
    assert_eq!(outcome.verdict, Verdict::ProcessingError);
}

#[test]
fn test_missing_schema_for_format_is_configuration_error() {
    let mut fixture = Fixture::new();
    fixture.config.xml_schemas.clear();
    let target = fixture.file("a.xml", VALID_XML);

    let outcome = fixture.pipeline().validate_path(&target, None);
    assert_eq!(outcome.verdict, Verdict::ConfigurationError);
    assert!(outcome.message.unwrap().contains("Unsupported format: XML"));
}

#[test]
fn test_bad_rule_file_fails_pipeline_construction() {
    let mut fixture = Fixture::new();
    fixture.config.constraints =
        vec![fixture.file("bad-rules.yaml", "rules:\n  - id: x\n    kind: nope\n")];
    let err = ValidationPipeline::from_config(&fixture.config).unwrap_err();
    assert!(err.to_string().contains("bad-rules.yaml"), "{err}");

    let empty = RuleSetValidator::from_files(&[]).unwrap();
    assert!(empty.rules().is_empty());
}
