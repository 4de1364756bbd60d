//! Bundled schema engines.
//!
//! - `json`: JSON Schema validation via `jsonschema`
//! - `xsd`: an XML Schema subset engine on top of the `quick-xml` element tree

pub mod json;
pub mod xsd;

pub use json::JsonSchemaValidator;
pub use xsd::XsdSchema;
