//! Validator configuration.
//!
//! Names the schema sources and constraint rule files a pipeline is built from.
//! It can be assembled in code or loaded from a YAML/JSON file:
//!
//! ```yaml
//! xml_schemas: [schemas/catalog.xsd]
//! json_schema: schemas/catalog.schema.json
//! constraints: [rules/catalog.yaml]
//! ```
//!
//! Relative paths in a file resolve against the file's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ValidatorConfig {
    /// XML Schema sources, compiled together for XML targets.
    pub xml_schemas: Vec<PathBuf>,
    /// JSON Schema used for JSON targets and normalized YAML targets.
    pub json_schema: Option<PathBuf>,
    /// Constraint rule files, evaluated in order.
    pub constraints: Vec<PathBuf>,
}

impl ValidatorConfig {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read and
    /// `ConfigError::Parse` if it is not a valid configuration.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let mut config = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_saphyr::from_str::<Self>(&content).map_err(|e| ConfigError::Parse {
                path: path.to_owned(),
                message: e.to_string(),
            })?
        };
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.xml_schemas.iter_mut().for_each(resolve);
        self.json_schema.iter_mut().for_each(resolve);
        self.constraints.iter_mut().for_each(resolve);
    }

    /// Overlay command line settings: schema lists are replaced when given,
    /// constraint files are appended.
    pub fn merge(
        &mut self,
        xml_schemas: Vec<PathBuf>,
        json_schema: Option<PathBuf>,
        constraints: Vec<PathBuf>,
    ) {
        if !xml_schemas.is_empty() {
            self.xml_schemas = xml_schemas;
        }
        if json_schema.is_some() {
            self.json_schema = json_schema;
        }
        self.constraints.extend(constraints);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docval.yaml");
        fs::write(
            &path,
            "xml_schemas: [a.xsd, /abs/b.xsd]\njson_schema: s.json\nconstraints: [rules.yaml]\n",
        )
        .unwrap();

        let config = ValidatorConfig::from_file(&path).unwrap();
        assert_eq!(
            config.xml_schemas,
            vec![dir.path().join("a.xsd"), PathBuf::from("/abs/b.xsd")]
        );
        assert_eq!(config.json_schema, Some(dir.path().join("s.json")));
        assert_eq!(config.constraints, vec![dir.path().join("rules.yaml")]);
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(ValidatorConfig::from_file(&path).unwrap(), ValidatorConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"xml_schema": "a.xsd"}"#).unwrap();
        let err = ValidatorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ValidatorConfig::from_file(Path::new("/nonexistent/docval.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_merge() {
        let mut config = ValidatorConfig {
            xml_schemas: vec![PathBuf::from("file.xsd")],
            json_schema: Some(PathBuf::from("file.json")),
            constraints: vec![PathBuf::from("file-rules.yaml")],
        };
        config.merge(
            Vec::new(),
            Some(PathBuf::from("cli.json")),
            vec![PathBuf::from("cli-rules.yaml")],
        );
        assert_eq!(config.xml_schemas, vec![PathBuf::from("file.xsd")]);
        assert_eq!(config.json_schema, Some(PathBuf::from("cli.json")));
        assert_eq!(config.constraints.len(), 2);
    }
}
