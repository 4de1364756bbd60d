//! Instance validation against a compiled `XsdSchema`.
//!
//! Children are first assigned to particles of the content model by name, without
//! descending into them, so alternatives of a `choice` can be tried without
//! recording findings. Assigned children are validated afterwards.

use crate::format::xml::XmlElement;
use crate::report::Finding;

use super::types::Builtin;
use super::{
    AttributeDecl, ComplexType, Compositor, Content, ElementDecl, ModelGroup, Particle,
    SimpleType, TypeRef, XsdSchema,
};

/// Limit on chained simple type restrictions, which also stops reference cycles.
const MAX_DERIVATION_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy)]
enum Slot<'s> {
    Declared(&'s ElementDecl),
    Wildcard,
}

/// Result of matching part of a content model against a run of children.
#[derive(Debug, Default)]
struct Attempt<'s> {
    end: usize,
    assigned: Vec<(usize, Slot<'s>)>,
    /// Descriptions of required particles that found no match.
    missing: Vec<String>,
}

impl Attempt<'_> {
    fn at(end: usize) -> Self {
        Self {
            end,
            ..Self::default()
        }
    }

    fn absorb(&mut self, other: Self) {
        self.end = other.end;
        self.assigned.extend(other.assigned);
        self.missing.extend(other.missing);
    }
}

enum Resolved<'s> {
    Complex(&'s ComplexType),
    Simple(&'s TypeRef),
    Any,
}

pub(super) struct SchemaValidator<'s> {
    schema: &'s XsdSchema,
    findings: Vec<Finding>,
}

impl<'s> SchemaValidator<'s> {
    pub(super) fn new(schema: &'s XsdSchema) -> Self {
        Self {
            schema,
            findings: Vec::new(),
        }
    }

    pub(super) fn finish(self) -> Vec<Finding> {
        self.findings
    }

    fn report(&mut self, element: &XmlElement, message: String) {
        self.findings
            .push(Finding::error(message).at(element.position.into()));
    }

    pub(super) fn validate_root(&mut self, root: &XmlElement) {
        let schema = self.schema;
        match schema.elements.get(&root.name) {
            Some(decl) => self.validate_element(root, decl),
            None => self.report(
                root,
                format!(
                    "Element '{}': no matching global element declaration",
                    root.name
                ),
            ),
        }
    }

    fn validate_element(&mut self, element: &XmlElement, decl: &'s ElementDecl) {
        let schema = self.schema;
        let decl = if decl.reference {
            let Some(global) = schema.elements.get(&decl.name) else {
                self.report(
                    element,
                    format!(
                        "Element '{}': reference to undeclared global element",
                        element.name
                    ),
                );
                return;
            };
            global
        } else {
            decl
        };

        match self.resolve(&decl.type_ref) {
            Ok(Resolved::Complex(complex)) => self.validate_complex(element, complex),
            Ok(Resolved::Simple(type_ref)) => self.validate_simple_element(element, type_ref),
            Ok(Resolved::Any) => {}
            Err(message) => self.report(element, format!("Element '{}': {message}", element.name)),
        }
    }

    fn resolve(&self, type_ref: &'s TypeRef) -> Result<Resolved<'s>, String> {
        let schema = self.schema;
        match type_ref {
            TypeRef::Named(name) => {
                if name == "anyType" {
                    Ok(Resolved::Any)
                } else if let Some(complex) = schema.complex_types.get(name) {
                    Ok(Resolved::Complex(complex))
                } else if schema.simple_types.contains_key(name) || Builtin::lookup(name).is_some()
                {
                    Ok(Resolved::Simple(type_ref))
                } else {
                    Err(format!("unknown type '{name}'"))
                }
            }
            TypeRef::Complex(complex) => Ok(Resolved::Complex(complex)),
            TypeRef::Simple(_) => Ok(Resolved::Simple(type_ref)),
            TypeRef::AnyType => Ok(Resolved::Any),
        }
    }

    fn validate_simple_element(&mut self, element: &XmlElement, type_ref: &TypeRef) {
        if let Some(child) = element.children.first() {
            self.report(
                child,
                format!(
                    "Element '{}': unexpected element '{}' in simple content",
                    element.name, child.name
                ),
            );
            return;
        }
        if let Some(attribute) = element.content_attributes().next() {
            self.report(
                element,
                format!(
                    "Element '{}': attribute '{}' is not allowed",
                    element.name, attribute.name
                ),
            );
        }
        if let Err(message) = self.check_value(&element.text, type_ref, 0) {
            self.report(element, format!("Element '{}': {message}", element.name));
        }
    }

    fn validate_complex(&mut self, element: &XmlElement, complex: &'s ComplexType) {
        self.validate_attributes(element, complex);

        match &complex.content {
            Content::Empty => {
                if let Some(child) = element.children.first() {
                    self.report(
                        child,
                        format!(
                            "Element '{}': unexpected element '{}'",
                            element.name, child.name
                        ),
                    );
                }
                if !complex.mixed && element.has_text() {
                    self.report(
                        element,
                        format!(
                            "Element '{}': character data is not allowed in empty content",
                            element.name
                        ),
                    );
                }
            }
            Content::Simple(type_ref) => self.validate_simple_content(element, type_ref),
            Content::Elements(group) => {
                if !complex.mixed && element.has_text() {
                    self.report(
                        element,
                        format!(
                            "Element '{}': character data is not allowed in element-only content",
                            element.name
                        ),
                    );
                }
                self.validate_children(element, group);
            }
        }
    }

    fn validate_simple_content(&mut self, element: &XmlElement, type_ref: &TypeRef) {
        if let Some(child) = element.children.first() {
            self.report(
                child,
                format!(
                    "Element '{}': unexpected element '{}' in simple content",
                    element.name, child.name
                ),
            );
            return;
        }
        if let Err(message) = self.check_value(&element.text, type_ref, 0) {
            self.report(element, format!("Element '{}': {message}", element.name));
        }
    }

    fn validate_attributes(&mut self, element: &XmlElement, complex: &ComplexType) {
        for decl in &complex.attributes {
            match element.attribute(&decl.name) {
                Some(value) => self.check_attribute(element, decl, value),
                None if decl.required => self.report(
                    element,
                    format!(
                        "Element '{}': missing required attribute '{}'",
                        element.name, decl.name
                    ),
                ),
                None => {}
            }
        }

        if complex.any_attribute {
            return;
        }
        for attribute in element.content_attributes() {
            if !complex.attributes.iter().any(|d| d.name == attribute.name) {
                self.report(
                    element,
                    format!(
                        "Element '{}': attribute '{}' is not allowed",
                        element.name, attribute.name
                    ),
                );
            }
        }
    }

    fn check_attribute(&mut self, element: &XmlElement, decl: &AttributeDecl, value: &str) {
        let result = match &decl.fixed {
            Some(fixed) if value.trim() != fixed => Err(format!("value must be '{fixed}'")),
            _ => self.check_value(value, &decl.type_ref, 0),
        };
        if let Err(message) = result {
            self.report(
                element,
                format!(
                    "Element '{}', attribute '{}': {message}",
                    element.name, decl.name
                ),
            );
        }
    }

    fn check_value(&self, value: &str, type_ref: &TypeRef, depth: usize) -> Result<(), String> {
        match type_ref {
            TypeRef::Named(name) => self.check_named(value, name, depth),
            TypeRef::Simple(simple) => self.check_restriction(value, simple, depth),
            TypeRef::AnyType => Ok(()),
            TypeRef::Complex(_) => Err("a complex type cannot hold a simple value".to_owned()),
        }
    }

    fn check_named(&self, value: &str, name: &str, depth: usize) -> Result<(), String> {
        let schema = self.schema;
        if let Some(simple) = schema.simple_types.get(name) {
            return self.check_restriction(value, simple, depth);
        }
        match Builtin::lookup(name) {
            Some(builtin) if builtin.accepts(value) => Ok(()),
            Some(_) => Err(format!("'{}' is not a valid {name}", value.trim())),
            None if schema.complex_types.contains_key(name) => {
                Err(format!("type '{name}' is not a simple type"))
            }
            None => Err(format!("unknown type '{name}'")),
        }
    }

    fn check_restriction(
        &self,
        value: &str,
        simple: &SimpleType,
        depth: usize,
    ) -> Result<(), String> {
        if depth >= MAX_DERIVATION_DEPTH {
            return Err(format!(
                "type derivation from '{}' is nested too deeply",
                simple.base
            ));
        }
        self.check_named(value, &simple.base, depth + 1)?;
        simple.facets.violation(value).map_or(Ok(()), Err)
    }

    fn validate_children(&mut self, element: &XmlElement, group: &'s ModelGroup) {
        let children = &element.children;
        let attempt = self.match_group(group, children, 0);

        for missing in attempt.missing {
            self.report(
                element,
                format!("Element '{}': missing {missing}", element.name),
            );
        }
        if let Some(extra) = children.get(attempt.end) {
            self.report(
                extra,
                format!(
                    "Element '{}': unexpected element '{}'",
                    element.name, extra.name
                ),
            );
        }

        for (index, slot) in attempt.assigned {
            if let Slot::Declared(decl) = slot {
                self.validate_element(&children[index], decl);
            }
        }
    }

    /// Match a group, honouring its own occurrence bounds.
    fn match_group(
        &self,
        group: &'s ModelGroup,
        children: &[XmlElement],
        start: usize,
    ) -> Attempt<'s> {
        let mut result = Attempt::at(start);
        let mut count = 0;
        while group.occurs.admits_more(count) {
            let attempt = self.match_compositor(group, children, result.end);
            if attempt.end == result.end {
                if count < group.occurs.min {
                    result.missing = attempt.missing;
                }
                break;
            }
            count += 1;
            let incomplete = !attempt.missing.is_empty();
            result.absorb(attempt);
            if incomplete {
                break;
            }
        }
        result
    }

    fn match_compositor(
        &self,
        group: &'s ModelGroup,
        children: &[XmlElement],
        start: usize,
    ) -> Attempt<'s> {
        match group.compositor {
            Compositor::Sequence => {
                let mut result = Attempt::at(start);
                for particle in &group.particles {
                    let attempt = self.match_particle(particle, children, result.end);
                    result.absorb(attempt);
                }
                result
            }
            Compositor::Choice => self.match_choice(group, children, start),
            Compositor::All => match_all(group, children, start),
        }
    }

    fn match_choice(
        &self,
        group: &'s ModelGroup,
        children: &[XmlElement],
        start: usize,
    ) -> Attempt<'s> {
        let mut best: Option<Attempt<'s>> = None;
        for particle in &group.particles {
            let attempt = self.match_particle(particle, children, start);
            if attempt.end == start {
                if attempt.missing.is_empty() && best.is_none() {
                    // an optional alternative satisfies the choice without content
                    best = Some(attempt);
                }
                continue;
            }
            if best.as_ref().is_none_or(|b| attempt.end > b.end) {
                best = Some(attempt);
            }
        }
        best.unwrap_or_else(|| Attempt {
            end: start,
            assigned: Vec::new(),
            missing: vec![format!("one of ({})", describe_group(group))],
        })
    }

    fn match_particle(
        &self,
        particle: &'s Particle,
        children: &[XmlElement],
        start: usize,
    ) -> Attempt<'s> {
        match particle {
            Particle::Element(decl) => {
                let mut result = Attempt::at(start);
                let mut count = 0;
                while decl.occurs.admits_more(count)
                    && children.get(result.end).is_some_and(|c| c.name == decl.name)
                {
                    result.assigned.push((result.end, Slot::Declared(decl)));
                    result.end += 1;
                    count += 1;
                }
                if count < decl.occurs.min {
                    result
                        .missing
                        .push(format!("required element '{}'", decl.name));
                }
                result
            }
            Particle::Any(occurs) => {
                let mut result = Attempt::at(start);
                let mut count = 0;
                while occurs.admits_more(count) && result.end < children.len() {
                    result.assigned.push((result.end, Slot::Wildcard));
                    result.end += 1;
                    count += 1;
                }
                if count < occurs.min {
                    result.missing.push("required element (any)".to_owned());
                }
                result
            }
            Particle::Group(group) => self.match_group(group, children, start),
        }
    }
}

/// `all`: each element particle at most once, in any order.
fn match_all<'s>(group: &'s ModelGroup, children: &[XmlElement], start: usize) -> Attempt<'s> {
    let mut result = Attempt::at(start);
    let mut used = vec![false; group.particles.len()];

    while let Some(child) = children.get(result.end) {
        let matched = group.particles.iter().enumerate().find_map(|(i, particle)| {
            match particle {
                Particle::Element(decl) if !used[i] && decl.name == child.name => Some((i, decl)),
                _ => None,
            }
        });
        let Some((i, decl)) = matched else { break };
        used[i] = true;
        result.assigned.push((result.end, Slot::Declared(decl)));
        result.end += 1;
    }

    for (particle, used) in group.particles.iter().zip(used) {
        if let Particle::Element(decl) = particle
            && !used
            && decl.occurs.min > 0
        {
            result
                .missing
                .push(format!("required element '{}'", decl.name));
        }
    }
    result
}

fn describe_group(group: &ModelGroup) -> String {
    let separator = match group.compositor {
        Compositor::Sequence => ", ",
        Compositor::Choice => " | ",
        Compositor::All => " & ",
    };
    group
        .particles
        .iter()
        .map(|particle| match particle {
            Particle::Element(decl) => decl.name.clone(),
            Particle::Any(_) => "*".to_owned(),
            Particle::Group(inner) => format!("({})", describe_group(inner)),
        })
        .collect::<Vec<_>>()
        .join(separator)
}
