//! Constraint rule files and rule evaluation.
//!
//! A rule file is YAML (or JSON) with a top-level `rules` list:
//!
//! ```yaml
//! rules:
//!   - id: book-id-unique
//!     path: /book/id
//!     kind: unique
//!   - id: status-known
//!     level: warning
//!     path: /book/status
//!     kind: allowed-values
//!     values: [draft, final]
//! ```
//!
//! Supported kinds: `required`, `allowed-values` (`values`), `matches` (`pattern`),
//! `unique` and `cardinality` (`min`, `max`). `level` defaults to `error`.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::constraint::path::{RulePath, Selected};
use crate::error::ConfigError;
use crate::report::{Finding, Location, Severity, ValidationResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    id: String,
    #[serde(default)]
    level: Severity,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(flatten)]
    kind: KindSpec,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
enum KindSpec {
    Required {},
    AllowedValues { values: Vec<Value> },
    Matches { pattern: String },
    Unique {},
    Cardinality {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
}

#[derive(Debug, Clone)]
enum Check {
    Required,
    AllowedValues(Vec<Value>),
    Matches(Regex),
    Unique,
    Cardinality { min: Option<usize>, max: Option<usize> },
}

/// A compiled constraint rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub level: Severity,
    pub message: Option<String>,
    pub path: RulePath,
    check: Check,
}

/// An ordered collection of rules loaded from one or more files.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Load a rule file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, `ConfigError::Parse`
    /// if it is not a rule file, and `ConfigError::InvalidRule` for a bad rule.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let rules = Self::parse(&content, path)?;
        tracing::debug!(path = %path.display(), rules = rules.len(), "loaded constraint rules");
        Ok(rules)
    }

    /// Parse rule file content; `path` names the file in errors.
    ///
    /// # Errors
    ///
    /// See [`RuleSet::load`].
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: RuleFile =
            serde_saphyr::from_str(content).map_err(|e| ConfigError::Parse {
                path: path.to_owned(),
                message: e.to_string(),
            })?;

        let mut set = Self::default();
        for spec in file.rules {
            let rule = compile(spec).map_err(|(id, message)| ConfigError::InvalidRule {
                path: path.to_owned(),
                id,
                message,
            })?;
            set.push(rule, path)?;
        }
        Ok(set)
    }

    /// Append the rules of `other`, keeping ids unique.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRule` if an id is already present.
    pub fn extend(&mut self, other: Self, source: &Path) -> Result<(), ConfigError> {
        for rule in other.rules {
            self.push(rule, source)?;
        }
        Ok(())
    }

    fn push(&mut self, rule: Rule, source: &Path) -> Result<(), ConfigError> {
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(ConfigError::InvalidRule {
                path: source.to_owned(),
                id: rule.id,
                message: "duplicate rule id".to_owned(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate every rule against `document`; findings are attributed to `target`.
    #[must_use]
    pub fn evaluate(&self, document: &Value, target: &Path) -> ValidationResult {
        let mut result = ValidationResult::new(target);
        for rule in &self.rules {
            rule.evaluate(document, &mut result);
        }
        result
    }
}

fn compile(spec: RuleSpec) -> Result<Rule, (String, String)> {
    let id = spec.id.trim().to_owned();
    if id.is_empty() {
        return Err((spec.id, "rule id must not be empty".to_owned()));
    }
    let invalid = |message: String| (id.clone(), message);

    let path = RulePath::parse(&spec.path).map_err(invalid)?;
    let check = match spec.kind {
        KindSpec::Required {} => {
            if path.is_root() {
                return Err(invalid("'required' needs a non-empty path".to_owned()));
            }
            Check::Required
        }
        KindSpec::AllowedValues { values } => {
            if values.is_empty() {
                return Err(invalid("'values' must not be empty".to_owned()));
            }
            Check::AllowedValues(values)
        }
        KindSpec::Matches { pattern } => Check::Matches(
            Regex::new(&pattern).map_err(|e| invalid(format!("invalid pattern: {e}")))?,
        ),
        KindSpec::Unique {} => Check::Unique,
        KindSpec::Cardinality { min, max } => {
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(invalid(format!("min {min} is greater than max {max}")));
            }
            Check::Cardinality { min, max }
        }
    };

    Ok(Rule {
        id,
        level: spec.level,
        message: spec.message,
        path,
        check,
    })
}

/// Text of a scalar, so XML strings compare with YAML/JSON numbers and booleans.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b || scalar_text(a).is_some_and(|text| scalar_text(b).as_ref() == Some(&text))
}

impl Rule {
    fn finding(&self, default_message: String, pointer: Option<&str>) -> Finding {
        let message = self.message.clone().unwrap_or(default_message);
        let finding = Finding::new(self.level, message).with_rule(&self.id);
        match pointer {
            Some(pointer) => finding.at(Location::pointer(pointer)),
            None => finding,
        }
    }

    fn evaluate(&self, document: &Value, result: &mut ValidationResult) {
        match &self.check {
            Check::Required => self.check_required(document, result),
            Check::AllowedValues(values) => {
                for Selected { pointer, value } in self.path.select(document) {
                    if !values.iter().any(|allowed| loosely_equal(value, allowed)) {
                        let allowed: Vec<String> = values.iter().map(Value::to_string).collect();
                        result.push(self.finding(
                            format!(
                                "{value} is not one of the allowed values: {}",
                                allowed.join(", ")
                            ),
                            Some(&pointer),
                        ));
                    }
                }
            }
            Check::Matches(regex) => {
                for Selected { pointer, value } in self.path.select(document) {
                    let message = match scalar_text(value) {
                        Some(text) if regex.is_match(&text) => continue,
                        Some(text) => {
                            format!("'{text}' does not match pattern '{}'", regex.as_str())
                        }
                        None => format!("{value} is not a scalar value"),
                    };
                    result.push(self.finding(message, Some(&pointer)));
                }
            }
            Check::Unique => {
                let mut seen: HashMap<String, String> = HashMap::new();
                for Selected { pointer, value } in self.path.select(document) {
                    let key = scalar_text(value).unwrap_or_else(|| value.to_string());
                    if let Some(first) = seen.get(&key) {
                        result.push(self.finding(
                            format!("duplicate value '{key}' (first seen at {first})"),
                            Some(&pointer),
                        ));
                    } else {
                        seen.insert(key, pointer);
                    }
                }
            }
            Check::Cardinality { min, max } => {
                let count = self.path.select(document).len();
                if min.is_some_and(|min| count < min) || max.is_some_and(|max| count > max) {
                    let bounds = match (min, max) {
                        (Some(min), Some(max)) => format!("between {min} and {max}"),
                        (Some(min), None) => format!("at least {min}"),
                        (None, Some(max)) => format!("at most {max}"),
                        (None, None) => String::new(),
                    };
                    result.push(self.finding(
                        format!("expected {bounds} value(s) at '{}', found {count}", self.path),
                        None,
                    ));
                }
            }
        }
    }

    /// Every node selected by the parent path must carry the last key.
    fn check_required(&self, document: &Value, result: &mut ValidationResult) {
        let Some((parent, key)) = self.path.split_last() else {
            return;
        };
        let parents = parent.select(document);
        if parents.is_empty() {
            result.push(self.finding(format!("required value '{}' is missing", self.path), None));
            return;
        }

        // parents that are scalars cannot hold the key; reported once per parent
        let mut reported = BTreeSet::new();
        for Selected { pointer, value } in parents {
            let present = match (value, key) {
                (Value::Object(map), Some(key)) => map.get(key).is_some_and(|v| !v.is_null()),
                (Value::Object(map), None) => !map.is_empty(),
                _ => false,
            };
            if !present && reported.insert(pointer.clone()) {
                let what = key.map_or_else(|| "content".to_owned(), |k| format!("'{k}'"));
                result.push(self.finding(format!("missing required {what}"), Some(&pointer)));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(content: &str) -> RuleSet {
        RuleSet::parse(content, Path::new("rules.yaml")).unwrap()
    }

    fn messages(rules: &RuleSet, document: &Value) -> Vec<String> {
        rules
            .evaluate(document, Path::new("doc"))
            .findings
            .into_iter()
            .map(|f| f.message)
            .collect()
    }

    #[test]
    fn test_empty_rule_set_passes() {
        let set = rules("");
        assert!(set.is_empty());
        assert!(set.evaluate(&json!({"a": 1}), Path::new("doc")).is_passing());
        assert!(rules("rules: []").is_empty());
    }

    #[test]
    fn test_required() {
        let set = rules("rules:\n  - id: title\n    path: /book/title\n    kind: required\n");
        let document = json!({"book": [{"title": "A"}, {"id": "b2"}, {"title": null}]});
        let result = set.evaluate(&document, Path::new("doc"));
        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.findings[0].message, "missing required 'title'");
        assert_eq!(result.findings[0].location, Some(Location::pointer("/book/1")));
        assert_eq!(result.findings[0].rule.as_deref(), Some("title"));

        let missing_parent = messages(&set, &json!({"shelf": {}}));
        assert_eq!(missing_parent, vec!["required value '/book/title' is missing"]);
    }

    #[test]
    fn test_allowed_values_compare_across_formats() {
        let set = rules(
            "rules:\n  - id: version\n    path: /version\n    kind: allowed-values\n    values: [1, 2]\n",
        );
        assert!(messages(&set, &json!({"version": 2})).is_empty());
        // XML attributes and text are strings
        assert!(messages(&set, &json!({"version": "2"})).is_empty());
        assert_eq!(
            messages(&set, &json!({"version": "3"})),
            vec![r#""3" is not one of the allowed values: 1, 2"#]
        );
    }

    #[test]
    fn test_matches_and_custom_message() {
        let set = rules(concat!(
            "rules:\n",
            "  - id: isbn\n",
            "    path: /book/*/isbn\n",
            "    kind: matches\n",
            "    pattern: '^\\d{3}-\\d{10}$'\n",
            "    message: ISBN must be in 13-digit form\n",
        ));
        let document =
            json!({"book": {"a": {"isbn": "978-0441172719"}, "b": {"isbn": "0441172717"}}});
        let result = set.evaluate(&document, Path::new("doc"));
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].message, "ISBN must be in 13-digit form");
        assert_eq!(result.findings[0].location, Some(Location::pointer("/book/b/isbn")));
    }

    #[test]
    fn test_unique() {
        let set = rules("rules:\n  - id: ids\n    path: /book/id\n    kind: unique\n");
        let document = json!({"book": [{"id": "b1"}, {"id": "b2"}, {"id": "b1"}]});
        assert_eq!(
            messages(&set, &document),
            vec!["duplicate value 'b1' (first seen at /book/0/id)"]
        );
    }

    #[test]
    fn test_cardinality_and_levels() {
        let set = rules(concat!(
            "rules:\n",
            "  - id: few-books\n",
            "    level: warning\n",
            "    path: /book\n",
            "    kind: cardinality\n",
            "    min: 1\n",
            "    max: 2\n",
        ));
        let result = set.evaluate(&json!({"book": [1, 2, 3]}), Path::new("doc"));
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Warning);
        assert_eq!(
            result.findings[0].message,
            "expected between 1 and 2 value(s) at '/book', found 3"
        );
        // warnings are below the failing threshold
        assert!(result.is_passing());
    }

    #[test]
    fn test_json_rule_file() {
        let set = rules(
            r#"{"rules": [{"id": "r", "path": "/a", "kind": "unique", "level": "critical"}]}"#,
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.rules()[0].level, Severity::Critical);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let parse = |content: &str| RuleSet::parse(content, Path::new("rules.yaml")).unwrap_err();

        let err = parse("rules:\n  - id: r\n    path: /a\n    kind: matches\n    pattern: '('\n");
        assert!(matches!(err, ConfigError::InvalidRule { ref id, .. } if id == "r"));

        let err = parse(
            "rules:\n  - id: r\n    path: /a\n    kind: cardinality\n    min: 3\n    max: 1\n",
        );
        assert!(err.to_string().contains("greater than max"));

        let err = parse("rules:\n  - id: r\n    kind: required\n");
        assert!(err.to_string().contains("non-empty path"));

        let err = parse("rules:\n  - id: r\n    path: /a\n    kind: bogus\n");
        assert!(matches!(err, ConfigError::Parse { .. }));

        // a misspelled option must not silently drop the bound
        let err = parse("rules:\n  - id: r\n    path: /a\n    kind: cardinality\n    mx: 3\n");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("mx"), "{err}");

        let err = parse("rules:\n  - id: r\n    path: /a\n    kind: unique\n    values: [1]\n");
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse(
            "rules:\n  - {id: r, path: /a, kind: unique}\n  - {id: r, path: /b, kind: unique}\n",
        );
        assert!(err.to_string().contains("duplicate rule id"));
    }
}
