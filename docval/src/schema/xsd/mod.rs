//! XML Schema (XSD) subset engine.
//!
//! Supported declarations:
//! - global and local `element` (with `type`, inline types, `ref`, `minOccurs`, `maxOccurs`)
//! - named and anonymous `complexType` with `sequence`, `choice`, `all`, nested groups,
//!   `any`, `attribute`, `anyAttribute`, `mixed` and `simpleContent` derivations
//! - named and anonymous `simpleType` restrictions with `enumeration`, `pattern`,
//!   length and numeric bound facets (`list` and `union` accept any text)
//! - the common built-in datatypes
//!
//! Names are compared by local name; target namespaces are not enforced.
//! Schemas using `complexContent`, model `group`s or `attributeGroup`s are rejected
//! when loaded rather than validated partially.

mod types;
mod validate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ProcessingError;
use crate::format::xml::{XmlElement, parse_xml_str, read_xml};
use crate::fs::read_document;
use crate::report::ValidationResult;

use types::Facets;
use validate::SchemaValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Occurs {
    pub(crate) min: u32,
    /// `None` is `unbounded`.
    pub(crate) max: Option<u32>,
}

impl Occurs {
    const ONCE: Self = Self {
        min: 1,
        max: Some(1),
    };

    fn admits_more(self, count: u32) -> bool {
        self.max.is_none_or(|max| count < max)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    /// A named type: user-defined complex or simple type, or a built-in.
    Named(String),
    Complex(Box<ComplexType>),
    Simple(SimpleType),
    AnyType,
}

#[derive(Debug, Clone)]
pub(crate) struct ElementDecl {
    pub(crate) name: String,
    /// The declaration is `ref="name"` to a global element.
    pub(crate) reference: bool,
    pub(crate) type_ref: TypeRef,
    pub(crate) occurs: Occurs,
}

#[derive(Debug, Clone)]
pub(crate) struct ComplexType {
    pub(crate) content: Content,
    pub(crate) attributes: Vec<AttributeDecl>,
    pub(crate) any_attribute: bool,
    pub(crate) mixed: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Empty,
    Elements(ModelGroup),
    Simple(TypeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compositor {
    Sequence,
    Choice,
    All,
}

#[derive(Debug, Clone)]
pub(crate) struct ModelGroup {
    pub(crate) compositor: Compositor,
    pub(crate) particles: Vec<Particle>,
    pub(crate) occurs: Occurs,
}

#[derive(Debug, Clone)]
pub(crate) enum Particle {
    Element(ElementDecl),
    Group(ModelGroup),
    Any(Occurs),
}

#[derive(Debug, Clone)]
pub(crate) struct AttributeDecl {
    pub(crate) name: String,
    pub(crate) type_ref: TypeRef,
    pub(crate) required: bool,
    pub(crate) fixed: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct SimpleType {
    /// Local name of the base type.
    pub(crate) base: String,
    facets: Facets,
}

/// A compiled set of XML Schema documents.
#[derive(Debug, Clone, Default)]
pub struct XsdSchema {
    elements: BTreeMap<String, ElementDecl>,
    complex_types: BTreeMap<String, ComplexType>,
    simple_types: BTreeMap<String, SimpleType>,
}

impl XsdSchema {
    /// Load and compile one or more schema documents into a single schema.
    ///
    /// Each source is opened, read and closed before the next one.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::SchemaResource` if a source cannot be read, is not
    /// well-formed XML, or uses unsupported XSD features.
    pub fn load(sources: &[PathBuf]) -> Result<Self, ProcessingError> {
        let mut schema = Self::default();
        for source in sources {
            let resource_error = |message: String| ProcessingError::SchemaResource {
                path: source.clone(),
                message,
            };
            let content = read_document(source).map_err(|e| resource_error(e.to_string()))?;
            let root = parse_xml_str(&content).map_err(|e| {
                resource_error(format!(
                    "{} (line {}, column {})",
                    e.message, e.position.line, e.position.column
                ))
            })?;
            schema.add_document(&root).map_err(resource_error)?;
            tracing::debug!(source = %source.display(), "loaded XML schema");
        }
        Ok(schema)
    }

    /// Compile a single schema document from text.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the text is not a usable schema.
    pub fn parse(content: &str) -> Result<Self, String> {
        let root = parse_xml_str(content).map_err(|e| e.message)?;
        let mut schema = Self::default();
        schema.add_document(&root)?;
        Ok(schema)
    }

    /// Read an XML document from disk and validate it.
    ///
    /// # Errors
    ///
    /// Returns a `ProcessingError` if the target cannot be read or is not well-formed.
    pub fn validate_path(&self, target: &Path) -> Result<ValidationResult, ProcessingError> {
        let root = read_xml(target)?;
        Ok(self.validate(&root, target))
    }

    /// Validate a parsed document; findings are attributed to `document`.
    #[must_use]
    pub fn validate(&self, root: &XmlElement, document: &Path) -> ValidationResult {
        let mut validator = SchemaValidator::new(self);
        validator.validate_root(root);
        ValidationResult::with_findings(document, validator.finish())
    }

    fn add_document(&mut self, root: &XmlElement) -> Result<(), String> {
        if root.name != "schema" {
            return Err(format!(
                "root element is '{}', expected 'schema'",
                root.name
            ));
        }
        for child in &root.children {
            match child.name.as_str() {
                "element" => {
                    let decl = compile_element(child, true)?;
                    let name = decl.name.clone();
                    if self.elements.insert(name.clone(), decl).is_some() {
                        return Err(format!("duplicate global element '{name}'"));
                    }
                }
                "complexType" => {
                    let name = required_attr(child, "name")?.to_owned();
                    let complex = compile_complex(child)?;
                    if self.complex_types.insert(name.clone(), complex).is_some() {
                        return Err(format!("duplicate complex type '{name}'"));
                    }
                }
                "simpleType" => {
                    let name = required_attr(child, "name")?.to_owned();
                    let simple = compile_simple(child)?;
                    if self.simple_types.insert(name.clone(), simple).is_some() {
                        return Err(format!("duplicate simple type '{name}'"));
                    }
                }
                // imported and included documents are passed as separate sources
                "annotation" | "import" | "include" | "notation" => {}
                other => return Err(format!("unsupported top-level declaration '{other}'")),
            }
        }
        Ok(())
    }
}

fn local(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

fn required_attr<'a>(node: &'a XmlElement, name: &str) -> Result<&'a str, String> {
    node.attribute(name)
        .ok_or_else(|| format!("'{}' declaration without '{name}'", node.name))
}

fn is_true(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

fn parse_count(value: &str, attribute: &str) -> Result<u32, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {attribute} '{value}'"))
}

fn compile_occurs(node: &XmlElement) -> Result<Occurs, String> {
    let min = match node.attribute("minOccurs") {
        Some(v) => parse_count(v, "minOccurs")?,
        None => 1,
    };
    let max = match node.attribute("maxOccurs") {
        Some(v) if v.trim() == "unbounded" => None,
        Some(v) => Some(parse_count(v, "maxOccurs")?),
        None => Some(1),
    };
    if let Some(max) = max
        && max < min
    {
        return Err(format!("maxOccurs {max} is less than minOccurs {min}"));
    }
    Ok(Occurs { min, max })
}

fn compile_element(node: &XmlElement, global: bool) -> Result<ElementDecl, String> {
    let occurs = if global {
        Occurs::ONCE
    } else {
        compile_occurs(node)?
    };

    if let Some(reference) = node.attribute("ref") {
        return Ok(ElementDecl {
            name: local(reference).to_owned(),
            reference: true,
            type_ref: TypeRef::AnyType,
            occurs,
        });
    }

    let name = required_attr(node, "name")?.to_owned();
    let type_ref = match node.attribute("type") {
        Some(type_name) => TypeRef::Named(local(type_name).to_owned()),
        None => inline_type(node)?.unwrap_or(TypeRef::AnyType),
    };
    Ok(ElementDecl {
        name,
        reference: false,
        type_ref,
        occurs,
    })
}

fn inline_type(node: &XmlElement) -> Result<Option<TypeRef>, String> {
    for child in &node.children {
        match child.name.as_str() {
            "complexType" => return Ok(Some(TypeRef::Complex(Box::new(compile_complex(child)?)))),
            "simpleType" => return Ok(Some(TypeRef::Simple(compile_simple(child)?))),
            _ => {}
        }
    }
    Ok(None)
}

fn compile_complex(node: &XmlElement) -> Result<ComplexType, String> {
    let mut complex = ComplexType {
        content: Content::Empty,
        attributes: Vec::new(),
        any_attribute: false,
        mixed: node.attribute("mixed").is_some_and(is_true),
    };
    for child in &node.children {
        match child.name.as_str() {
            "sequence" | "choice" | "all" => {
                complex.content = Content::Elements(compile_group(child)?);
            }
            "attribute" => complex.attributes.push(compile_attribute(child)?),
            "anyAttribute" => complex.any_attribute = true,
            "simpleContent" => compile_simple_content(child, &mut complex)?,
            "annotation" => {}
            other => return Err(format!("unsupported complexType content '{other}'")),
        }
    }
    Ok(complex)
}

fn compile_simple_content(node: &XmlElement, complex: &mut ComplexType) -> Result<(), String> {
    let derivation = node
        .children
        .iter()
        .find(|c| c.name == "extension" || c.name == "restriction")
        .ok_or("simpleContent without extension or restriction")?;
    let base = local(required_attr(derivation, "base")?).to_owned();

    complex.content = if derivation.name == "restriction" {
        Content::Simple(TypeRef::Simple(SimpleType {
            base,
            facets: compile_facets(derivation)?,
        }))
    } else {
        Content::Simple(TypeRef::Named(base))
    };

    for child in &derivation.children {
        match child.name.as_str() {
            "attribute" => complex.attributes.push(compile_attribute(child)?),
            "anyAttribute" => complex.any_attribute = true,
            _ => {}
        }
    }
    Ok(())
}

fn compile_group(node: &XmlElement) -> Result<ModelGroup, String> {
    let compositor = match node.name.as_str() {
        "sequence" => Compositor::Sequence,
        "choice" => Compositor::Choice,
        _ => Compositor::All,
    };
    let mut particles = Vec::new();
    for child in &node.children {
        match child.name.as_str() {
            "element" => particles.push(Particle::Element(compile_element(child, false)?)),
            "sequence" | "choice" | "all" => particles.push(Particle::Group(compile_group(child)?)),
            "any" => particles.push(Particle::Any(compile_occurs(child)?)),
            "annotation" => {}
            other => return Err(format!("unsupported particle '{other}' in {}", node.name)),
        }
    }
    Ok(ModelGroup {
        compositor,
        particles,
        occurs: compile_occurs(node)?,
    })
}

fn compile_attribute(node: &XmlElement) -> Result<AttributeDecl, String> {
    let name = match node.attribute("ref") {
        Some(reference) => local(reference).to_owned(),
        None => required_attr(node, "name")?.to_owned(),
    };
    let type_ref = match node.attribute("type") {
        Some(type_name) => TypeRef::Named(local(type_name).to_owned()),
        None => match node.children.iter().find(|c| c.name == "simpleType") {
            Some(simple) => TypeRef::Simple(compile_simple(simple)?),
            None => TypeRef::AnyType,
        },
    };
    Ok(AttributeDecl {
        name,
        type_ref,
        required: node.attribute("use").is_some_and(|u| u.trim() == "required"),
        fixed: node.attribute("fixed").map(|f| f.trim().to_owned()),
    })
}

fn compile_simple(node: &XmlElement) -> Result<SimpleType, String> {
    let Some(restriction) = node.children.iter().find(|c| c.name == "restriction") else {
        // list and union: lexical checks are not applied
        return Ok(SimpleType {
            base: "anySimpleType".to_owned(),
            facets: Facets::default(),
        });
    };
    let base = restriction
        .attribute("base")
        .map_or("anySimpleType", local)
        .to_owned();
    Ok(SimpleType {
        base,
        facets: compile_facets(restriction)?,
    })
}

fn parse_bound(node: &XmlElement) -> Result<f64, String> {
    let value = required_attr(node, "value")?;
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {} value '{value}'", node.name))
}

fn compile_facets(restriction: &XmlElement) -> Result<Facets, String> {
    let mut facets = Facets::default();
    for facet in &restriction.children {
        match facet.name.as_str() {
            "enumeration" => facets
                .enumeration
                .push(required_attr(facet, "value")?.trim().to_owned()),
            "pattern" => {
                let source = required_attr(facet, "value")?;
                let regex = Regex::new(&format!("^(?:{source})$"))
                    .map_err(|e| format!("unsupported pattern '{source}': {e}"))?;
                facets.patterns.push((source.to_owned(), regex));
            }
            "length" => {
                facets.length =
                    Some(parse_count(required_attr(facet, "value")?, "length")? as usize);
            }
            "minLength" => {
                facets.min_length =
                    Some(parse_count(required_attr(facet, "value")?, "minLength")? as usize);
            }
            "maxLength" => {
                facets.max_length =
                    Some(parse_count(required_attr(facet, "value")?, "maxLength")? as usize);
            }
            "minInclusive" => facets.min_inclusive = Some(parse_bound(facet)?),
            "maxInclusive" => facets.max_inclusive = Some(parse_bound(facet)?),
            "minExclusive" => facets.min_exclusive = Some(parse_bound(facet)?),
            "maxExclusive" => facets.max_exclusive = Some(parse_bound(facet)?),
            other => tracing::debug!(facet = other, "ignoring unsupported XSD facet"),
        }
    }
    Ok(facets)
}
