//! XML element tree.
//!
//! A small owned tree built with `quick-xml`: element and attribute names are kept
//! as local names (prefixes are dropped), character data is unescaped and every
//! element remembers the line and column of its start tag. The XSD engine
//! validates this tree and the constraint model converts it into a value tree.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::escape::unescape;
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use crate::error::ProcessingError;
use crate::format::Format;
use crate::fs::read_document;
use crate::report::Location;

/// 1-indexed line and column of a point in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl From<TextPosition> for Location {
    fn from(position: TextPosition) -> Self {
        Self::Position {
            line: position.line,
            column: position.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Local name (prefix stripped).
    pub name: String,
    /// Name as written, including any prefix.
    pub qualified_name: String,
    pub value: String,
}

impl XmlAttribute {
    /// Namespace declarations and `xml:`/`xsi:` attributes are not part of a
    /// document's content model.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.qualified_name == "xmlns"
            || self.qualified_name.starts_with("xmlns:")
            || self.qualified_name.starts_with("xml:")
            || self.qualified_name.starts_with("xsi:")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Local name (prefix stripped).
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    /// Character data appearing directly inside this element, concatenated.
    pub text: String,
    pub position: TextPosition,
}

impl XmlElement {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn content_attributes(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes.iter().filter(|a| !a.is_reserved())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A well-formedness error with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSyntaxError {
    pub message: String,
    pub position: TextPosition,
}

impl XmlSyntaxError {
    #[must_use]
    pub fn into_processing_error(self, path: &Path) -> ProcessingError {
        ProcessingError::Parse {
            path: path.to_owned(),
            format: Format::Xml,
            message: format!(
                "{} (line {}, column {})",
                self.message, self.position.line, self.position.column
            ),
            location: Some(self.position.into()),
        }
    }
}

/// Maps byte offsets to line/column positions.
struct LineIndex<'a> {
    content: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(content: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            content,
            line_starts,
        }
    }

    fn position<O: TryInto<usize>>(&self, offset: O) -> TextPosition {
        let offset = offset
            .try_into()
            .unwrap_or(usize::MAX)
            .min(self.content.len());
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .max(1);
        let line_start = self.line_starts[line - 1];
        let column = self
            .content
            .get(line_start..offset)
            .map_or(offset - line_start, |s| s.chars().count())
            + 1;
        TextPosition { line, column }
    }
}

fn utf8<'b>(bytes: &'b [u8], what: &str) -> Result<&'b str, String> {
    std::str::from_utf8(bytes).map_err(|e| format!("{what} is not valid UTF-8: {e}"))
}

fn open_element(start: &BytesStart<'_>, position: TextPosition) -> Result<XmlElement, String> {
    let name = utf8(start.local_name().as_ref(), "element name")?.to_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| format!("malformed attribute on '{name}': {e}"))?;
        let qualified_name = utf8(attribute.key.as_ref(), "attribute name")?.to_owned();
        let local = utf8(attribute.key.local_name().as_ref(), "attribute name")?.to_owned();
        let raw = utf8(&attribute.value, "attribute value")?;
        let value = unescape(raw)
            .map_err(|e| format!("bad escape in attribute '{qualified_name}': {e}"))?
            .into_owned();
        attributes.push(XmlAttribute {
            name: local,
            qualified_name,
            value,
        });
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
        position,
    })
}

/// Parse XML text into its root element.
///
/// # Errors
///
/// Returns an `XmlSyntaxError` if the document is not well-formed.
pub fn parse_xml_str(content: &str) -> Result<XmlElement, XmlSyntaxError> {
    let index = LineIndex::new(content);
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let offset = reader.buffer_position();
        let position = index.position(offset);
        let fail = |message: String| XmlSyntaxError { message, position };

        let event = reader.read_event().map_err(|e| XmlSyntaxError {
            message: e.to_string(),
            position: index.position(reader.error_position()),
        })?;

        match event {
            Event::Start(start) => stack.push(open_element(&start, position).map_err(fail)?),
            Event::Empty(start) => {
                let element = open_element(&start, position).map_err(fail)?;
                attach(&mut stack, &mut root, element).map_err(fail)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| fail("unexpected closing tag".to_owned()))?;
                attach(&mut stack, &mut root, element).map_err(fail)?;
            }
            Event::Text(text) => {
                let raw = utf8(&text, "character data").map_err(fail)?;
                let decoded = unescape(raw).map_err(|e| fail(format!("bad escape: {e}")))?;
                push_text(&mut stack, &decoded).map_err(fail)?;
            }
            Event::CData(data) => {
                let raw = utf8(&data, "CDATA section").map_err(fail)?;
                push_text(&mut stack, raw).map_err(fail)?;
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    let end = index.position(reader.buffer_position());
    if let Some(open) = stack.last() {
        return Err(XmlSyntaxError {
            message: format!("element '{}' is never closed", open.name),
            position: end,
        });
    }
    root.ok_or(XmlSyntaxError {
        message: "document has no root element".to_owned(),
        position: end,
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_some() {
        return Err(format!(
            "element '{}' appears after the root element",
            element.name
        ));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err("character data outside the root element".to_owned()),
    }
    Ok(())
}

/// Read and parse an XML file.
///
/// # Errors
///
/// Returns a `ProcessingError` if the file cannot be read or is not well-formed.
pub fn read_xml(path: &Path) -> Result<XmlElement, ProcessingError> {
    let content = read_document(path)?;
    parse_xml_str(&content).map_err(|e| e.into_processing_error(path))
}

/// Convert an element into a format-agnostic value tree.
///
/// Attributes and child elements become object keys, repeated children become
/// arrays, an element with neither becomes its trimmed text, and text mixed with
/// other content is kept under `#text`. Reserved attributes are dropped.
#[must_use]
pub fn to_value(element: &XmlElement) -> Value {
    let attributes: Vec<&XmlAttribute> = element.content_attributes().collect();
    let text = element.text.trim();
    if attributes.is_empty() && element.children.is_empty() {
        return Value::String(text.to_owned());
    }

    let mut map = Map::new();
    for attribute in attributes {
        map.insert(
            attribute.name.clone(),
            Value::String(attribute.value.clone()),
        );
    }

    let mut grouped: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for child in &element.children {
        grouped
            .entry(child.name.as_str())
            .or_default()
            .push(to_value(child));
    }
    for (name, values) in grouped {
        let value = match <[Value; 1]>::try_from(values) {
            Ok([single]) => single,
            Err(values) => Value::Array(values),
        };
        map.insert(name.to_owned(), value);
    }

    if !text.is_empty() {
        map.insert("#text".to_owned(), Value::String(text.to_owned()));
    }
    Value::Object(map)
}
