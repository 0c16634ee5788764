//! The structural validation gate.

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use crate::compile::compile;
use crate::config::ValidationConfig;
use crate::content::{match_children, Mismatch};
use crate::depth;
use crate::error::{Diagnostic, Severity, ValidationError, Violation};
use crate::schema::{
    AttributeUse, ComplexType, ContentModel, ElementDecl, ElementType, SchemaSet, SimpleRef,
    XSI_NS,
};
use crate::simple;

/// Checks candidate bytes against reference-definition bytes.
///
/// Implementations must be pure: the result depends only on the two inputs
/// and every call returns its own diagnostic.
pub trait StructuralValidator: Send + Sync {
    fn validate(&self, reference: &[u8], candidate: &[u8]) -> Result<(), ValidationError>;
}

/// XML Schema validator.
#[derive(Clone, Debug, Default)]
pub struct XsdValidator {
    config: ValidationConfig,
}

impl XsdValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Compile a schema once to validate several candidates against it.
    pub fn compile(&self, reference: &[u8]) -> Result<CompiledSchema, ValidationError> {
        if depth::exceeds(reference, self.config.max_depth) {
            return Err(ValidationError::reference(format!(
                "schema nests elements deeper than {} levels",
                self.config.max_depth
            )));
        }
        let schema = compile(reference)?;
        debug!(
            elements = schema.elements.len(),
            complex_types = schema.complex_types.len(),
            simple_types = schema.simple_types.len(),
            "compiled reference definition"
        );
        Ok(CompiledSchema {
            schema,
            max_violations: self.config.max_violations.max(1),
            max_depth: self.config.max_depth,
        })
    }
}

impl StructuralValidator for XsdValidator {
    fn validate(&self, reference: &[u8], candidate: &[u8]) -> Result<(), ValidationError> {
        self.compile(reference)?.validate(candidate)
    }
}

/// A reference definition compiled by [`XsdValidator::compile`].
#[derive(Debug)]
pub struct CompiledSchema {
    schema: SchemaSet,
    max_violations: usize,
    max_depth: usize,
}

impl CompiledSchema {
    /// Names of the top-level elements a document may start with.
    pub fn root_elements(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schema.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.schema.target_namespace.as_deref()
    }

    pub fn validate(&self, candidate: &[u8]) -> Result<(), ValidationError> {
        if depth::exceeds(candidate, self.max_depth) {
            return Err(ValidationError::StructuralViolation(Diagnostic::fatal(format!(
                "content nests elements deeper than {} levels",
                self.max_depth
            ))));
        }
        let text = std::str::from_utf8(candidate).map_err(|e| {
            ValidationError::StructuralViolation(Diagnostic::fatal(format!(
                "content is not valid UTF-8: {e}"
            )))
        })?;
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options).map_err(|e| {
            ValidationError::StructuralViolation(Diagnostic::fatal(format!(
                "content is not well-formed XML: {e}"
            )))
        })?;

        let mut walk = Walk {
            schema: &self.schema,
            doc: &doc,
            violations: Vec::new(),
            limit: self.max_violations,
            depth: 0,
            max_depth: self.max_depth,
        };
        walk.root(doc.root_element());

        if walk.violations.is_empty() {
            Ok(())
        } else {
            debug!(violations = walk.violations.len(), "candidate rejected");
            Err(ValidationError::StructuralViolation(Diagnostic::new(
                walk.violations,
            )))
        }
    }
}

struct Walk<'s, 'd, 'input> {
    schema: &'s SchemaSet,
    doc: &'d Document<'input>,
    violations: Vec<Violation>,
    limit: usize,
    depth: usize,
    /// Entity expansion can nest deeper than the raw text shows.
    max_depth: usize,
}

impl<'s, 'd, 'input> Walk<'s, 'd, 'input> {
    fn full(&self) -> bool {
        self.violations.len() >= self.limit
    }

    fn report(&mut self, node: Node<'_, '_>, message: String) {
        if self.full() {
            return;
        }
        let pos = self.doc.text_pos_at(node.range().start);
        self.violations.push(Violation {
            severity: Severity::Error,
            line: pos.row,
            column: pos.col,
            message,
        });
    }

    fn root(&mut self, node: Node<'_, '_>) {
        let name = node.tag_name().name();
        let namespace = node.tag_name().namespace();
        let expected = self.schema.target_namespace.as_deref();
        match self.schema.elements.get(name) {
            Some(decl) if namespace == expected => self.element(node, decl),
            Some(_) => self.report(
                node,
                format!(
                    "root element <{name}> must be in {}",
                    describe_namespace(expected)
                ),
            ),
            None => self.report(
                node,
                format!("root element <{name}> is not declared in the schema"),
            ),
        }
    }

    fn element(&mut self, node: Node<'_, '_>, decl: &ElementDecl) {
        if self.full() {
            return;
        }
        if node.attribute((XSI_NS, "nil")).map(str::trim) == Some("true") {
            return;
        }
        if self.depth >= self.max_depth {
            let message = format!(
                "element <{}> is nested deeper than {} levels",
                decl.name, self.max_depth
            );
            self.report(node, message);
            return;
        }
        self.depth += 1;
        match &decl.ty {
            ElementType::Any => {}
            ElementType::Simple(ty) => {
                for attr in node.attributes().filter(|a| a.namespace() != Some(XSI_NS)) {
                    let message = format!(
                        "attribute '{}' is not allowed on element <{}>",
                        attr.name(),
                        decl.name
                    );
                    self.report(node, message);
                }
                self.simple_content(node, ty);
            }
            ElementType::Complex(reference) => match self.schema.complex(reference) {
                Some(ty) => self.complex(node, ty),
                None => self.report(
                    node,
                    format!("element <{}> has an unknown type", decl.name),
                ),
            },
        }
        if let Some(fixed) = &decl.fixed {
            let text = text_of(node);
            if text.trim() != fixed.trim() {
                self.report(
                    node,
                    format!(
                        "element <{}> must have the fixed value '{fixed}', found '{}'",
                        decl.name,
                        text.trim()
                    ),
                );
            }
        }
        self.depth -= 1;
    }

    fn complex(&mut self, node: Node<'_, '_>, ty: &ComplexType) {
        self.attributes(node, ty);
        let name = node.tag_name().name();
        match &ty.content {
            ContentModel::Simple(simple_ty) => self.simple_content(node, simple_ty),
            ContentModel::Empty => {
                if let Some(child) = node.children().find(Node::is_element) {
                    let message = format!(
                        "element <{name}> must be empty but contains <{}>",
                        child.tag_name().name()
                    );
                    self.report(child, message);
                } else if !ty.mixed && has_text(node) {
                    self.report(node, format!("element <{name}> must be empty"));
                }
            }
            ContentModel::Particle(particle) => {
                if !ty.mixed && has_text(node) {
                    self.report(node, format!("element <{name}> cannot contain text"));
                }
                let children: Vec<Node<'_, '_>> = node.children().filter(Node::is_element).collect();
                let names: Vec<&str> = children.iter().map(|c| c.tag_name().name()).collect();
                if let Err(mismatch) = match_children(self.schema, particle, &names) {
                    match children.get(mismatch.index) {
                        Some(child) => {
                            let message = format!(
                                "element <{}> is not expected here{}",
                                child.tag_name().name(),
                                expectation(&mismatch, "; expected")
                            );
                            self.report(*child, message);
                        }
                        None => {
                            let message = format!(
                                "content of element <{name}> is incomplete{}",
                                expectation(&mismatch, "; expected")
                            );
                            self.report(node, message);
                        }
                    }
                }

                let schema = self.schema;
                let wildcard = particle.has_wildcard();
                for child in children {
                    let child_name = child.tag_name().name();
                    let decl = particle.find_element(schema, child_name).or_else(|| {
                        if wildcard {
                            schema.elements.get(child_name)
                        } else {
                            None
                        }
                    });
                    if let Some(decl) = decl {
                        self.element(child, decl);
                    }
                }
            }
        }
    }

    fn attributes(&mut self, node: Node<'_, '_>, ty: &ComplexType) {
        let element = node.tag_name().name();
        for attr in node.attributes() {
            if attr.namespace() == Some(XSI_NS) {
                continue;
            }
            let name = attr.name();
            match ty.attributes.iter().find(|decl| decl.name == name) {
                Some(decl) if decl.usage == AttributeUse::Prohibited => self.report(
                    node,
                    format!("attribute '{name}' is not allowed on element <{element}>"),
                ),
                Some(decl) => {
                    if let Err(reason) = simple::check(self.schema, &decl.ty, attr.value()) {
                        self.report(
                            node,
                            format!("attribute '{name}' on element <{element}>: {reason}"),
                        );
                    } else if let Some(fixed) = &decl.fixed {
                        if attr.value().trim() != fixed.trim() {
                            self.report(
                                node,
                                format!(
                                    "attribute '{name}' on element <{element}> must have the fixed value '{fixed}'"
                                ),
                            );
                        }
                    }
                }
                None if ty.any_attribute => {}
                None => self.report(
                    node,
                    format!("attribute '{name}' is not allowed on element <{element}>"),
                ),
            }
        }

        for decl in ty
            .attributes
            .iter()
            .filter(|decl| decl.usage == AttributeUse::Required)
        {
            if !node.attributes().any(|a| a.name() == decl.name) {
                let message = format!(
                    "missing required attribute '{}' on element <{element}>",
                    decl.name
                );
                self.report(node, message);
            }
        }
    }

    fn simple_content(&mut self, node: Node<'_, '_>, ty: &SimpleRef) {
        let name = node.tag_name().name();
        if let Some(child) = node.children().find(Node::is_element) {
            let message = format!(
                "element <{name}> cannot contain child elements, found <{}>",
                child.tag_name().name()
            );
            self.report(child, message);
            return;
        }
        if let Err(reason) = simple::check(self.schema, ty, &text_of(node)) {
            self.report(node, format!("element <{name}>: {reason}"));
        }
    }
}

fn expectation(mismatch: &Mismatch, lead: &str) -> String {
    let mut options: Vec<String> = mismatch
        .expected
        .iter()
        .map(|name| format!("<{name}>"))
        .collect();
    if mismatch.wildcard {
        options.push("any element".to_string());
    }
    match options.len() {
        0 => String::new(),
        1 => format!("{lead} {}", options[0]),
        _ => format!("{lead} one of {}", options.join(", ")),
    }
}

fn describe_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(uri) => format!("namespace '{uri}'"),
        None => "no namespace".to_string(),
    }
}

/// Concatenated direct text children.
fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect()
}

fn has_text(node: Node<'_, '_>) -> bool {
    node.children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .any(|t| !t.trim().is_empty())
}
