//! Compiled schema model.
//!
//! The compiler turns the XSD document into these plain values once per
//! validation call; the instance walk only ever reads them.

use std::collections::HashMap;

use regex::Regex;

use crate::builtin::Builtin;

pub(crate) const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub(crate) const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Debug, Default)]
pub(crate) struct SchemaSet {
    pub target_namespace: Option<String>,
    pub elements: HashMap<String, ElementDecl>,
    pub complex_types: HashMap<String, ComplexType>,
    pub simple_types: HashMap<String, SimpleType>,
}

impl SchemaSet {
    pub fn complex<'a>(&'a self, r: &'a ComplexRef) -> Option<&'a ComplexType> {
        match r {
            ComplexRef::Named(name) => self.complex_types.get(name),
            ComplexRef::Anonymous(ty) => Some(ty),
        }
    }

    pub fn element<'a>(&'a self, slot: &'a ElementSlot) -> Option<&'a ElementDecl> {
        match slot {
            ElementSlot::Local(decl) => Some(decl),
            ElementSlot::Global(name) => self.elements.get(name),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ElementDecl {
    pub name: String,
    pub ty: ElementType,
    pub fixed: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) enum ElementType {
    /// `xs:anyType` or no type at all: any content is accepted.
    Any,
    Simple(SimpleRef),
    Complex(ComplexRef),
}

#[derive(Clone, Debug)]
pub(crate) enum ComplexRef {
    Named(String),
    Anonymous(Box<ComplexType>),
}

#[derive(Clone, Debug)]
pub(crate) enum SimpleRef {
    Builtin(Builtin),
    Named(String),
    Anonymous(Box<SimpleType>),
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ComplexType {
    pub content: ContentModel,
    pub attributes: Vec<AttributeDecl>,
    pub any_attribute: bool,
    pub mixed: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) enum ContentModel {
    #[default]
    Empty,
    Particle(Particle),
    /// Text-only content of the given simple type (`simpleContent`).
    Simple(SimpleRef),
}

#[derive(Clone, Debug)]
pub(crate) struct Particle {
    pub min: u32,
    /// `None` means unbounded.
    pub max: Option<u32>,
    pub term: Term,
}

impl Particle {
    pub fn once(term: Term) -> Self {
        Self {
            min: 1,
            max: Some(1),
            term,
        }
    }

    /// Element names this particle can match, in declaration order.
    pub fn element_names<'a>(&'a self, schema: &'a SchemaSet, out: &mut Vec<&'a str>) {
        match &self.term {
            Term::Element(slot) => {
                if let Some(decl) = schema.element(slot) {
                    if !out.contains(&decl.name.as_str()) {
                        out.push(decl.name.as_str());
                    }
                }
            }
            Term::Sequence(parts) | Term::Choice(parts) | Term::All(parts) => {
                for part in parts {
                    part.element_names(schema, out);
                }
            }
            Term::Any => {}
        }
    }

    /// The declaration for a child named `name`, searching depth-first.
    pub fn find_element<'a>(&'a self, schema: &'a SchemaSet, name: &str) -> Option<&'a ElementDecl> {
        match &self.term {
            Term::Element(slot) => schema.element(slot).filter(|d| d.name == name),
            Term::Sequence(parts) | Term::Choice(parts) | Term::All(parts) => {
                parts.iter().find_map(|p| p.find_element(schema, name))
            }
            Term::Any => None,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        match &self.term {
            Term::Any => true,
            Term::Element(_) => false,
            Term::Sequence(parts) | Term::Choice(parts) | Term::All(parts) => {
                parts.iter().any(Particle::has_wildcard)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Term {
    Element(ElementSlot),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    All(Vec<Particle>),
    /// `xs:any`: one element of any name, contents skipped.
    Any,
}

#[derive(Clone, Debug)]
pub(crate) enum ElementSlot {
    Local(ElementDecl),
    /// `ref` to a top-level element declaration.
    Global(String),
}

#[derive(Clone, Debug)]
pub(crate) struct AttributeDecl {
    pub name: String,
    pub ty: SimpleRef,
    pub usage: AttributeUse,
    pub fixed: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttributeUse {
    Optional,
    Required,
    Prohibited,
}

#[derive(Clone, Debug)]
pub(crate) enum SimpleType {
    Restriction { base: SimpleRef, facets: Facets },
    List { item: SimpleRef },
    Union { members: Vec<SimpleRef> },
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Facets {
    pub enumeration: Vec<String>,
    pub patterns: Vec<Regex>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self.enumeration.is_empty()
            && self.patterns.is_empty()
            && self.min_inclusive.is_none()
            && self.max_inclusive.is_none()
            && self.min_exclusive.is_none()
            && self.max_exclusive.is_none()
            && self.length.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }
}
