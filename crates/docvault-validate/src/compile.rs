//! XSD document → [`SchemaSet`].
//!
//! Compilation is two-phase: every top-level definition is indexed by name
//! first, then definitions are built. Named types are referenced by name in
//! the compiled model, so recursive element structures compile without
//! unrolling; only derivation (`complexContent` / `simpleContent` bases)
//! needs the base built first.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use crate::builtin::Builtin;
use crate::error::ValidationError;
use crate::schema::{
    AttributeDecl, AttributeUse, ComplexRef, ComplexType, ContentModel, ElementDecl, ElementSlot,
    ElementType, Facets, Particle, SchemaSet, SimpleRef, SimpleType, Term, XSD_NS,
};

type CompileResult<T> = Result<T, ValidationError>;

const NAME_START: &str = "_:A-Za-z";
const NAME_CHAR: &str = "-._:A-Za-z0-9";

/// `xs:all` membership is tracked in a `u64` bitmask while matching.
pub(crate) const MAX_ALL_PARTICLES: usize = 64;

/// Compile reference-definition bytes into a schema model.
pub(crate) fn compile(reference: &[u8]) -> CompileResult<SchemaSet> {
    let text = std::str::from_utf8(reference)
        .map_err(|e| ValidationError::reference(format!("schema is not valid UTF-8: {e}")))?;
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)
        .map_err(|e| ValidationError::reference(format!("schema is not well-formed XML: {e}")))?;

    let root = doc.root_element();
    if !is_xsd(root, "schema") {
        return Err(ValidationError::reference(format!(
            "root element must be xs:schema, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut compiler = Compiler::index(root)?;
    compiler.build()?;
    check_simple_cycles(&compiler.set)?;
    Ok(compiler.set)
}

struct Compiler<'a, 'input> {
    set: SchemaSet,
    complex_nodes: HashMap<&'a str, Node<'a, 'input>>,
    simple_nodes: HashMap<&'a str, Node<'a, 'input>>,
    group_nodes: HashMap<&'a str, Node<'a, 'input>>,
    attribute_group_nodes: HashMap<&'a str, Node<'a, 'input>>,
    attribute_nodes: HashMap<&'a str, Node<'a, 'input>>,
    element_nodes: Vec<Node<'a, 'input>>,
    /// Named complex types whose derivation is being built.
    deriving: HashSet<String>,
    /// Group and attribute-group references being expanded.
    expanding: Vec<String>,
    /// Names used in `<xs:element ref=...>`, checked once all globals exist.
    element_refs: Vec<String>,
}

impl<'a, 'input> Compiler<'a, 'input> {
    fn index(root: Node<'a, 'input>) -> CompileResult<Self> {
        let mut compiler = Self {
            set: SchemaSet {
                target_namespace: root.attribute("targetNamespace").map(str::to_string),
                ..SchemaSet::default()
            },
            complex_nodes: HashMap::new(),
            simple_nodes: HashMap::new(),
            group_nodes: HashMap::new(),
            attribute_group_nodes: HashMap::new(),
            attribute_nodes: HashMap::new(),
            element_nodes: Vec::new(),
            deriving: HashSet::new(),
            expanding: Vec::new(),
            element_refs: Vec::new(),
        };

        for child in xsd_children(root) {
            let kind = child.tag_name().name();
            let table = match kind {
                "include" | "import" | "redefine" | "override" => {
                    return Err(ValidationError::reference(format!(
                        "xs:{kind} is not supported; schemas must be self-contained"
                    )));
                }
                "notation" => continue,
                "element" => {
                    compiler.element_nodes.push(child);
                    continue;
                }
                "complexType" => &mut compiler.complex_nodes,
                "simpleType" => &mut compiler.simple_nodes,
                "group" => &mut compiler.group_nodes,
                "attributeGroup" => &mut compiler.attribute_group_nodes,
                "attribute" => &mut compiler.attribute_nodes,
                other => {
                    return Err(ValidationError::reference(format!(
                        "unexpected top-level <xs:{other}>"
                    )));
                }
            };
            let name = required_attr(child, "name")?;
            if table.insert(name, child).is_some() {
                return Err(ValidationError::reference(format!(
                    "duplicate top-level {kind} '{name}'"
                )));
            }
        }
        Ok(compiler)
    }

    fn build(&mut self) -> CompileResult<()> {
        let mut simple_names: Vec<&'a str> = self.simple_nodes.keys().copied().collect();
        simple_names.sort_unstable();
        for name in simple_names {
            if let Some(node) = self.simple_nodes.get(name).copied() {
                let ty = self.simple_type(node)?;
                self.set.simple_types.insert(name.to_string(), ty);
            }
        }

        let mut complex_names: Vec<&'a str> = self.complex_nodes.keys().copied().collect();
        complex_names.sort_unstable();
        for name in complex_names {
            self.named_complex(name)?;
        }

        for node in self.element_nodes.clone() {
            if node.has_attribute("ref") {
                return Err(ValidationError::reference(
                    "a top-level element cannot use 'ref'",
                ));
            }
            let decl = self.element_decl(node)?;
            if self.set.elements.contains_key(&decl.name) {
                return Err(ValidationError::reference(format!(
                    "duplicate top-level element '{}'",
                    decl.name
                )));
            }
            self.set.elements.insert(decl.name.clone(), decl);
        }

        if self.set.elements.is_empty() {
            return Err(ValidationError::reference(
                "schema declares no top-level elements",
            ));
        }
        if let Some(missing) = self
            .element_refs
            .iter()
            .find(|name| !self.set.elements.contains_key(*name))
        {
            return Err(ValidationError::reference(format!(
                "reference to undeclared element '{missing}'"
            )));
        }
        Ok(())
    }

    fn named_complex(&mut self, name: &str) -> CompileResult<()> {
        if self.set.complex_types.contains_key(name) {
            return Ok(());
        }
        let node = self.complex_nodes.get(name).copied().ok_or_else(|| {
            ValidationError::reference(format!("unknown complex type '{name}'"))
        })?;
        if !self.deriving.insert(name.to_string()) {
            return Err(ValidationError::reference(format!(
                "complex type '{name}' derives from itself"
            )));
        }
        let ty = self.complex_type(node);
        self.deriving.remove(name);
        self.set.complex_types.insert(name.to_string(), ty?);
        Ok(())
    }

    fn complex_type(&mut self, node: Node<'a, 'input>) -> CompileResult<ComplexType> {
        let mut ty = ComplexType {
            mixed: is_true(node.attribute("mixed")),
            ..ComplexType::default()
        };
        for child in xsd_children(node) {
            match child.tag_name().name() {
                "simpleContent" => self.simple_content(child, &mut ty)?,
                "complexContent" => self.complex_content(child, &mut ty)?,
                _ => self.content_child(child, &mut ty)?,
            }
        }
        Ok(ty)
    }

    fn content_child(&mut self, child: Node<'a, 'input>, ty: &mut ComplexType) -> CompileResult<()> {
        match child.tag_name().name() {
            "sequence" | "choice" | "all" | "group" => {
                if !matches!(ty.content, ContentModel::Empty) {
                    return Err(ValidationError::reference(
                        "complex type declares more than one content model",
                    ));
                }
                ty.content = ContentModel::Particle(self.particle(child)?);
            }
            "attribute" => {
                let decl = self.attribute(child)?;
                push_attribute(&mut ty.attributes, decl);
            }
            "attributeGroup" => self.attribute_group(child, ty)?,
            "anyAttribute" => ty.any_attribute = true,
            other => {
                return Err(ValidationError::reference(format!(
                    "unexpected <xs:{other}> in complex type"
                )));
            }
        }
        Ok(())
    }

    fn simple_content(&mut self, node: Node<'a, 'input>, ty: &mut ComplexType) -> CompileResult<()> {
        let derivation = derivation_of(node)?;
        let base_name = required_attr(derivation, "base")?;
        let (ns, local) = resolve_qname(derivation, base_name);

        let base = if let Some(builtin) = builtin_for(ns, local) {
            SimpleRef::Builtin(builtin)
        } else if self.simple_nodes.contains_key(local) {
            SimpleRef::Named(local.to_string())
        } else if self.complex_nodes.contains_key(local) {
            self.named_complex(local)?;
            let base_ty = self.set.complex_types.get(local).cloned().unwrap_or_default();
            let ContentModel::Simple(inner) = base_ty.content else {
                return Err(ValidationError::reference(format!(
                    "simpleContent base '{base_name}' does not have simple content"
                )));
            };
            ty.attributes = base_ty.attributes;
            ty.any_attribute |= base_ty.any_attribute;
            inner
        } else {
            return Err(ValidationError::reference(format!("unknown type '{base_name}'")));
        };

        let content = if derivation.tag_name().name() == "restriction" {
            let facets = facets(derivation)?;
            if facets.is_empty() {
                base
            } else {
                SimpleRef::Anonymous(Box::new(SimpleType::Restriction { base, facets }))
            }
        } else {
            base
        };
        ty.content = ContentModel::Simple(content);

        for child in xsd_children(derivation) {
            if matches!(
                child.tag_name().name(),
                "attribute" | "attributeGroup" | "anyAttribute"
            ) {
                self.content_child(child, ty)?;
            }
        }
        Ok(())
    }

    fn complex_content(&mut self, node: Node<'a, 'input>, ty: &mut ComplexType) -> CompileResult<()> {
        if is_true(node.attribute("mixed")) {
            ty.mixed = true;
        }
        let derivation = derivation_of(node)?;
        let base_name = required_attr(derivation, "base")?;
        let (ns, local) = resolve_qname(derivation, base_name);
        let is_extension = derivation.tag_name().name() == "extension";

        let base = if ns == Some(XSD_NS) && local == "anyType" {
            None
        } else if self.complex_nodes.contains_key(local) {
            self.named_complex(local)?;
            self.set.complex_types.get(local).cloned()
        } else {
            return Err(ValidationError::reference(format!(
                "complexContent base '{base_name}' is not a complex type"
            )));
        };

        let mut own = ComplexType::default();
        for child in xsd_children(derivation) {
            self.content_child(child, &mut own)?;
        }

        match base {
            Some(base) if is_extension => {
                ty.attributes = base.attributes;
                ty.any_attribute |= base.any_attribute;
                ty.mixed |= base.mixed;
                ty.content = match (base.content, own.content) {
                    (ContentModel::Particle(first), ContentModel::Particle(second)) => {
                        ContentModel::Particle(Particle::once(Term::Sequence(vec![first, second])))
                    }
                    (ContentModel::Empty, content) | (content, ContentModel::Empty) => content,
                    _ => {
                        return Err(ValidationError::reference(format!(
                            "cannot extend '{base_name}' with an element content model"
                        )));
                    }
                };
            }
            Some(base) => {
                // A restriction restates the content model; attributes are
                // inherited unless redeclared.
                ty.attributes = base.attributes;
                ty.content = own.content;
            }
            None => ty.content = own.content,
        }
        for attribute in own.attributes {
            push_attribute(&mut ty.attributes, attribute);
        }
        ty.any_attribute |= own.any_attribute;
        Ok(())
    }

    fn particle(&mut self, node: Node<'a, 'input>) -> CompileResult<Particle> {
        let (min, max) = occurs(node)?;
        let kind = node.tag_name().name();
        let term = match kind {
            "element" => Term::Element(self.element_slot(node)?),
            "sequence" | "choice" | "all" => {
                let mut parts = Vec::new();
                for child in xsd_children(node) {
                    parts.push(self.particle(child)?);
                }
                if kind == "all" && parts.len() > MAX_ALL_PARTICLES {
                    return Err(ValidationError::reference(format!(
                        "xs:all groups are limited to {MAX_ALL_PARTICLES} particles"
                    )));
                }
                match kind {
                    "sequence" => Term::Sequence(parts),
                    "choice" => Term::Choice(parts),
                    _ => Term::All(parts),
                }
            }
            "any" => Term::Any,
            "group" => return self.group_ref(node, min, max),
            other => {
                return Err(ValidationError::reference(format!(
                    "unexpected <xs:{other}> in content model"
                )));
            }
        };
        Ok(Particle { min, max, term })
    }

    fn group_ref(&mut self, node: Node<'a, 'input>, min: u32, max: Option<u32>) -> CompileResult<Particle> {
        let name = local_name(required_attr(node, "ref")?);
        let group = self.group_nodes.get(name).copied().ok_or_else(|| {
            ValidationError::reference(format!("reference to undeclared group '{name}'"))
        })?;
        if self.expanding.iter().any(|n| n == name) {
            return Err(ValidationError::reference(format!(
                "group '{name}' references itself"
            )));
        }
        let model = xsd_children(group)
            .next()
            .ok_or_else(|| ValidationError::reference(format!("group '{name}' is empty")))?;

        self.expanding.push(name.to_string());
        let inner = self.particle(model);
        self.expanding.pop();
        let inner = inner?;

        let term = if inner.min == 1 && inner.max == Some(1) {
            inner.term
        } else {
            Term::Sequence(vec![inner])
        };
        Ok(Particle { min, max, term })
    }

    fn element_slot(&mut self, node: Node<'a, 'input>) -> CompileResult<ElementSlot> {
        if let Some(target) = node.attribute("ref") {
            let name = local_name(target).to_string();
            self.element_refs.push(name.clone());
            return Ok(ElementSlot::Global(name));
        }
        Ok(ElementSlot::Local(self.element_decl(node)?))
    }

    fn element_decl(&mut self, node: Node<'a, 'input>) -> CompileResult<ElementDecl> {
        let name = required_attr(node, "name")?.to_string();
        let ty = if let Some(type_name) = node.attribute("type") {
            self.type_ref(node, type_name)?
        } else if let Some(inline) = child_named(node, "complexType") {
            ElementType::Complex(ComplexRef::Anonymous(Box::new(self.complex_type(inline)?)))
        } else if let Some(inline) = child_named(node, "simpleType") {
            ElementType::Simple(SimpleRef::Anonymous(Box::new(self.simple_type(inline)?)))
        } else {
            ElementType::Any
        };
        if node.has_attribute("substitutionGroup") || is_true(node.attribute("abstract")) {
            debug!(element = %name, "substitution groups are not enforced; element treated as concrete");
        }
        Ok(ElementDecl {
            name,
            ty,
            fixed: node.attribute("fixed").map(str::to_string),
        })
    }

    fn type_ref(&self, node: Node<'a, 'input>, qname: &str) -> CompileResult<ElementType> {
        let (ns, local) = resolve_qname(node, qname);
        if ns == Some(XSD_NS) && local == "anyType" {
            return Ok(ElementType::Any);
        }
        if let Some(builtin) = builtin_for(ns, local) {
            return Ok(ElementType::Simple(SimpleRef::Builtin(builtin)));
        }
        if self.complex_nodes.contains_key(local) {
            Ok(ElementType::Complex(ComplexRef::Named(local.to_string())))
        } else if self.simple_nodes.contains_key(local) {
            Ok(ElementType::Simple(SimpleRef::Named(local.to_string())))
        } else {
            Err(ValidationError::reference(format!("unknown type '{qname}'")))
        }
    }

    fn simple_ref(&self, node: Node<'a, 'input>, qname: &str) -> CompileResult<SimpleRef> {
        let (ns, local) = resolve_qname(node, qname);
        if let Some(builtin) = builtin_for(ns, local) {
            return Ok(SimpleRef::Builtin(builtin));
        }
        if self.simple_nodes.contains_key(local) {
            Ok(SimpleRef::Named(local.to_string()))
        } else if self.complex_nodes.contains_key(local) || local == "anyType" {
            Err(ValidationError::reference(format!(
                "'{qname}' is a complex type where a simple type is required"
            )))
        } else {
            Err(ValidationError::reference(format!("unknown type '{qname}'")))
        }
    }

    fn attribute(&mut self, node: Node<'a, 'input>) -> CompileResult<AttributeDecl> {
        let Some(target) = node.attribute("ref") else {
            return self.attribute_decl(node);
        };
        let name = local_name(target);
        let global = self.attribute_nodes.get(name).copied().ok_or_else(|| {
            ValidationError::reference(format!("reference to undeclared attribute '{name}'"))
        })?;
        let mut decl = self.attribute_decl(global)?;
        decl.usage = attribute_use(node)?;
        if let Some(fixed) = node.attribute("fixed") {
            decl.fixed = Some(fixed.to_string());
        }
        Ok(decl)
    }

    fn attribute_decl(&mut self, node: Node<'a, 'input>) -> CompileResult<AttributeDecl> {
        let name = required_attr(node, "name")?.to_string();
        let ty = if let Some(type_name) = node.attribute("type") {
            self.simple_ref(node, type_name)?
        } else if let Some(inline) = child_named(node, "simpleType") {
            SimpleRef::Anonymous(Box::new(self.simple_type(inline)?))
        } else {
            SimpleRef::Builtin(Builtin::AnySimpleType)
        };
        Ok(AttributeDecl {
            name,
            ty,
            usage: attribute_use(node)?,
            fixed: node.attribute("fixed").map(str::to_string),
        })
    }

    fn attribute_group(&mut self, node: Node<'a, 'input>, ty: &mut ComplexType) -> CompileResult<()> {
        let name = local_name(required_attr(node, "ref")?);
        let group = self.attribute_group_nodes.get(name).copied().ok_or_else(|| {
            ValidationError::reference(format!("reference to undeclared attribute group '{name}'"))
        })?;
        let key = format!("@{name}");
        if self.expanding.contains(&key) {
            return Err(ValidationError::reference(format!(
                "attribute group '{name}' references itself"
            )));
        }
        self.expanding.push(key);
        let result = xsd_children(group).try_for_each(|child| match child.tag_name().name() {
            "attribute" | "attributeGroup" | "anyAttribute" => self.content_child(child, ty),
            other => Err(ValidationError::reference(format!(
                "unexpected <xs:{other}> in attribute group '{name}'"
            ))),
        });
        self.expanding.pop();
        result
    }

    fn simple_type(&mut self, node: Node<'a, 'input>) -> CompileResult<SimpleType> {
        let derivation = xsd_children(node)
            .next()
            .ok_or_else(|| ValidationError::reference("simple type has no derivation"))?;
        match derivation.tag_name().name() {
            "restriction" => {
                let base = match derivation.attribute("base") {
                    Some(base) => self.simple_ref(derivation, base)?,
                    None => {
                        let inline = child_named(derivation, "simpleType").ok_or_else(|| {
                            ValidationError::reference(
                                "restriction has neither a base nor an inline simple type",
                            )
                        })?;
                        SimpleRef::Anonymous(Box::new(self.simple_type(inline)?))
                    }
                };
                Ok(SimpleType::Restriction {
                    base,
                    facets: facets(derivation)?,
                })
            }
            "list" => {
                let item = match derivation.attribute("itemType") {
                    Some(item) => self.simple_ref(derivation, item)?,
                    None => {
                        let inline = child_named(derivation, "simpleType").ok_or_else(|| {
                            ValidationError::reference("list has no item type")
                        })?;
                        SimpleRef::Anonymous(Box::new(self.simple_type(inline)?))
                    }
                };
                Ok(SimpleType::List { item })
            }
            "union" => {
                let mut members = Vec::new();
                if let Some(names) = derivation.attribute("memberTypes") {
                    for member in names.split_whitespace() {
                        members.push(self.simple_ref(derivation, member)?);
                    }
                }
                for inline in xsd_children(derivation).filter(|c| c.tag_name().name() == "simpleType") {
                    members.push(SimpleRef::Anonymous(Box::new(self.simple_type(inline)?)));
                }
                if members.is_empty() {
                    return Err(ValidationError::reference("union has no member types"));
                }
                Ok(SimpleType::Union { members })
            }
            other => Err(ValidationError::reference(format!(
                "unexpected <xs:{other}> in simple type"
            ))),
        }
    }
}

fn facets(derivation: Node<'_, '_>) -> CompileResult<Facets> {
    let mut facets = Facets::default();
    for child in xsd_children(derivation) {
        let kind = child.tag_name().name();
        match kind {
            "simpleType" | "attribute" | "attributeGroup" | "anyAttribute" => continue,
            "whiteSpace" | "totalDigits" | "fractionDigits" | "explicitTimezone" | "assertion" => {
                debug!(facet = kind, "facet is not enforced; ignoring");
                continue;
            }
            _ => {}
        }
        let value = required_attr(child, "value")?;
        match kind {
            "enumeration" => facets.enumeration.push(value.to_string()),
            "pattern" => facets.patterns.push(translate_pattern(value)?),
            "minInclusive" => facets.min_inclusive = Some(value.trim().to_string()),
            "maxInclusive" => facets.max_inclusive = Some(value.trim().to_string()),
            "minExclusive" => facets.min_exclusive = Some(value.trim().to_string()),
            "maxExclusive" => facets.max_exclusive = Some(value.trim().to_string()),
            "length" => facets.length = Some(parse_length(kind, value)?),
            "minLength" => facets.min_length = Some(parse_length(kind, value)?),
            "maxLength" => facets.max_length = Some(parse_length(kind, value)?),
            other => {
                return Err(ValidationError::reference(format!("unknown facet <xs:{other}>")));
            }
        }
    }
    Ok(facets)
}

fn parse_length(facet: &str, value: &str) -> CompileResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::reference(format!("invalid {facet} '{value}'")))
}

/// Translate an XSD regular expression into an anchored `regex` pattern.
///
/// XSD patterns match the whole value, treat `^` and `$` as literals and
/// add the `\i` / `\c` name-character escapes.
fn translate_pattern(pattern: &str) -> CompileResult<Regex> {
    let unsupported = |what: &str| {
        ValidationError::reference(format!("pattern '{pattern}': {what} is not supported"))
    };

    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?:");
    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('i') if in_class => out.push_str(NAME_START),
                Some('c') if in_class => out.push_str(NAME_CHAR),
                Some('i') => out.push_str(&format!("[{NAME_START}]")),
                Some('c') => out.push_str(&format!("[{NAME_CHAR}]")),
                Some('I') | Some('C') if in_class => {
                    return Err(unsupported("a negated name escape inside a class"));
                }
                Some('I') => out.push_str(&format!("[^{NAME_START}]")),
                Some('C') => out.push_str(&format!("[^{NAME_CHAR}]")),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '[' if in_class => return Err(unsupported("character class subtraction")),
            '[' => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '^' | '$' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push_str(")$");
    Regex::new(&out)
        .map_err(|e| ValidationError::reference(format!("invalid pattern '{pattern}': {e}")))
}

fn occurs(node: Node<'_, '_>) -> CompileResult<(u32, Option<u32>)> {
    let parse = |attr: &str, value: &str| {
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| ValidationError::reference(format!("invalid {attr} '{value}'")))
    };
    let min = match node.attribute("minOccurs") {
        Some(value) => parse("minOccurs", value)?,
        None => 1,
    };
    let max = match node.attribute("maxOccurs") {
        Some(value) if value.trim() == "unbounded" => None,
        Some(value) => Some(parse("maxOccurs", value)?),
        None => Some(1),
    };
    if let Some(max) = max {
        if max < min {
            return Err(ValidationError::reference(format!(
                "maxOccurs {max} is less than minOccurs {min}"
            )));
        }
    }
    Ok((min, max))
}

fn attribute_use(node: Node<'_, '_>) -> CompileResult<crate::schema::AttributeUse> {
    match node.attribute("use").map(str::trim) {
        None | Some("optional") => Ok(AttributeUse::Optional),
        Some("required") => Ok(AttributeUse::Required),
        Some("prohibited") => Ok(AttributeUse::Prohibited),
        Some(other) => Err(ValidationError::reference(format!(
            "invalid attribute use '{other}'"
        ))),
    }
}

fn push_attribute(attributes: &mut Vec<AttributeDecl>, decl: AttributeDecl) {
    match attributes.iter_mut().find(|a| a.name == decl.name) {
        Some(existing) => *existing = decl,
        None => attributes.push(decl),
    }
}

/// Simple types must not be defined in terms of themselves, or evaluation
/// would never terminate.
fn check_simple_cycles(set: &SchemaSet) -> CompileResult<()> {
    fn visit<'s>(
        set: &'s SchemaSet,
        name: &'s str,
        path: &mut Vec<&'s str>,
        done: &mut HashSet<&'s str>,
    ) -> CompileResult<()> {
        if done.contains(name) {
            return Ok(());
        }
        if path.contains(&name) {
            return Err(ValidationError::reference(format!(
                "simple type '{name}' is defined in terms of itself"
            )));
        }
        let Some(ty) = set.simple_types.get(name) else {
            return Ok(());
        };
        path.push(name);
        let mut deps = Vec::new();
        simple_deps(ty, &mut deps);
        for dep in deps {
            visit(set, dep, path, done)?;
        }
        path.pop();
        done.insert(name);
        Ok(())
    }

    let mut done = HashSet::new();
    for name in set.simple_types.keys() {
        visit(set, name, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}

fn simple_deps<'s>(ty: &'s SimpleType, out: &mut Vec<&'s str>) {
    fn ref_deps<'s>(r: &'s SimpleRef, out: &mut Vec<&'s str>) {
        match r {
            SimpleRef::Named(name) => out.push(name),
            SimpleRef::Anonymous(inner) => simple_deps(inner, out),
            SimpleRef::Builtin(_) => {}
        }
    }
    match ty {
        SimpleType::Restriction { base, .. } => ref_deps(base, out),
        SimpleType::List { item } => ref_deps(item, out),
        SimpleType::Union { members } => members.iter().for_each(|m| ref_deps(m, out)),
    }
}

fn is_xsd(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(XSD_NS) && node.tag_name().name() == name
}

/// XSD element children, skipping annotations and foreign elements.
fn xsd_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| {
        c.is_element() && c.tag_name().namespace() == Some(XSD_NS) && c.tag_name().name() != "annotation"
    })
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    xsd_children(node).find(|c| c.tag_name().name() == name)
}

fn derivation_of<'a, 'input>(node: Node<'a, 'input>) -> CompileResult<Node<'a, 'input>> {
    xsd_children(node)
        .find(|c| matches!(c.tag_name().name(), "extension" | "restriction"))
        .ok_or_else(|| {
            ValidationError::reference(format!(
                "<xs:{}> needs an extension or restriction",
                node.tag_name().name()
            ))
        })
}

fn required_attr<'a>(node: Node<'a, '_>, attr: &str) -> CompileResult<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        ValidationError::reference(format!(
            "<xs:{}> is missing the '{attr}' attribute",
            node.tag_name().name()
        ))
    })
}

fn resolve_qname<'a, 'q>(node: Node<'a, '_>, qname: &'q str) -> (Option<&'a str>, &'q str) {
    let qname = qname.trim();
    match qname.split_once(':') {
        Some((prefix, local)) => (node.lookup_namespace_uri(Some(prefix)), local),
        None => (node.lookup_namespace_uri(None), qname),
    }
}

/// A built-in simple type, when `ns:local` names one. A name in the XSD
/// namespace that is not a built-in falls through to user definitions so
/// schemas declaring XSD as their default namespace still resolve.
fn builtin_for(ns: Option<&str>, local: &str) -> Option<Builtin> {
    if ns == Some(XSD_NS) {
        Builtin::from_name(local)
    } else {
        None
    }
}

fn local_name(qname: &str) -> &str {
    qname.split_once(':').map_or(qname, |(_, local)| local).trim()
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(body: &str) -> String {
        format!(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">{body}</xs:schema>"#)
    }

    fn reference_error(body: &str) -> String {
        match compile(schema(body).as_bytes()) {
            Err(ValidationError::InvalidReferenceDefinition(message)) => message,
            other => panic!("expected an invalid reference definition, got {other:?}"),
        }
    }

    #[test]
    fn compiles_global_element_with_builtin_type() {
        let set = compile(schema(r#"<xs:element name="note" type="xs:string"/>"#).as_bytes()).unwrap();
        let decl = &set.elements["note"];
        assert!(matches!(decl.ty, ElementType::Simple(SimpleRef::Builtin(Builtin::String))));
        assert!(set.target_namespace.is_none());
    }

    #[test]
    fn records_target_namespace() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            targetNamespace="urn:models" xmlns:m="urn:models">
            <xs:complexType name="T"/>
            <xs:element name="root" type="m:T"/>
        </xs:schema>"#;
        let set = compile(xsd.as_bytes()).unwrap();
        assert_eq!(set.target_namespace.as_deref(), Some("urn:models"));
        assert!(matches!(set.elements["root"].ty, ElementType::Complex(ComplexRef::Named(ref n)) if n == "T"));
    }

    #[test]
    fn rejects_non_schema_documents() {
        let err = compile(b"<note/>").unwrap_err();
        assert!(err.to_string().contains("root element must be xs:schema"));

        let err = compile(b"<xs:schema").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidReferenceDefinition(_)));

        let err = compile(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn rejects_external_composition() {
        let message = reference_error(r#"<xs:include schemaLocation="other.xsd"/>"#);
        assert!(message.contains("xs:include is not supported"));
    }

    #[test]
    fn rejects_dangling_references() {
        assert!(reference_error(r#"<xs:element name="a" type="Missing"/>"#).contains("unknown type"));
        let message = reference_error(
            r#"<xs:element name="a"><xs:complexType><xs:sequence>
                 <xs:element ref="ghost"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        assert!(message.contains("undeclared element 'ghost'"));
    }

    #[test]
    fn rejects_schema_without_elements() {
        assert!(reference_error(r#"<xs:simpleType name="s"><xs:restriction base="xs:string"/></xs:simpleType>"#)
            .contains("no top-level elements"));
    }

    #[test]
    fn rejects_inverted_occurrence_bounds() {
        let message = reference_error(
            r#"<xs:element name="a"><xs:complexType><xs:sequence>
                 <xs:element name="b" minOccurs="3" maxOccurs="2"/>
               </xs:sequence></xs:complexType></xs:element>"#,
        );
        assert!(message.contains("maxOccurs 2 is less than minOccurs 3"));
    }

    #[test]
    fn rejects_circular_derivations() {
        let message = reference_error(
            r#"<xs:complexType name="A"><xs:complexContent><xs:extension base="B"/></xs:complexContent></xs:complexType>
               <xs:complexType name="B"><xs:complexContent><xs:extension base="A"/></xs:complexContent></xs:complexType>
               <xs:element name="a" type="A"/>"#,
        );
        assert!(message.contains("derives from itself"));

        let message = reference_error(
            r#"<xs:simpleType name="S"><xs:restriction base="T"/></xs:simpleType>
               <xs:simpleType name="T"><xs:restriction base="S"/></xs:simpleType>
               <xs:element name="a" type="S"/>"#,
        );
        assert!(message.contains("defined in terms of itself"));
    }

    #[test]
    fn extension_appends_content_and_attributes() {
        let set = compile(
            schema(
                r#"<xs:complexType name="Base">
                     <xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>
                     <xs:attribute name="id" type="xs:ID" use="required"/>
                   </xs:complexType>
                   <xs:complexType name="Derived"><xs:complexContent><xs:extension base="Base">
                     <xs:sequence><xs:element name="b" type="xs:int"/></xs:sequence>
                     <xs:attribute name="note" type="xs:string"/>
                   </xs:extension></xs:complexContent></xs:complexType>
                   <xs:element name="root" type="Derived"/>"#,
            )
            .as_bytes(),
        )
        .unwrap();

        let derived = &set.complex_types["Derived"];
        let ContentModel::Particle(particle) = &derived.content else {
            panic!("expected element content");
        };
        let mut names = Vec::new();
        particle.element_names(&set, &mut names);
        assert_eq!(names, vec!["a", "b"]);
        let attributes: Vec<_> = derived.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attributes, vec!["id", "note"]);
    }

    #[test]
    fn groups_are_expanded_with_occurrences() {
        let set = compile(
            schema(
                r#"<xs:group name="pair"><xs:sequence>
                     <xs:element name="k" type="xs:string"/>
                     <xs:element name="v" type="xs:string"/>
                   </xs:sequence></xs:group>
                   <xs:element name="map"><xs:complexType>
                     <xs:group ref="pair" minOccurs="0" maxOccurs="unbounded"/>
                   </xs:complexType></xs:element>"#,
            )
            .as_bytes(),
        )
        .unwrap();
        let ElementType::Complex(ComplexRef::Anonymous(ty)) = &set.elements["map"].ty else {
            panic!("expected an anonymous complex type");
        };
        let ContentModel::Particle(particle) = &ty.content else {
            panic!("expected element content");
        };
        assert_eq!((particle.min, particle.max), (0, None));
        assert!(matches!(particle.term, Term::Sequence(ref parts) if parts.len() == 2));
    }

    #[test]
    fn self_referencing_group_is_rejected() {
        let message = reference_error(
            r#"<xs:group name="g"><xs:sequence><xs:group ref="g"/></xs:sequence></xs:group>
               <xs:element name="a"><xs:complexType><xs:group ref="g"/></xs:complexType></xs:element>"#,
        );
        assert!(message.contains("references itself"));
    }

    #[test]
    fn patterns_are_anchored_and_translated() {
        let re = translate_pattern(r"[A-Z]{2}\d+").unwrap();
        assert!(re.is_match("AB12"));
        assert!(!re.is_match("xAB12"));
        assert!(!re.is_match("AB12x"));

        let re = translate_pattern(r"\i\c*").unwrap();
        assert!(re.is_match("_name-1"));
        assert!(!re.is_match("1name"));

        let re = translate_pattern("a$b").unwrap();
        assert!(re.is_match("a$b"));

        assert!(translate_pattern("[a-z-[aeiou]]").is_err());
    }

    #[test]
    fn unknown_facets_are_rejected_and_unenforced_ones_ignored() {
        let message = reference_error(
            r#"<xs:simpleType name="s"><xs:restriction base="xs:string">
                 <xs:bogus value="1"/>
               </xs:restriction></xs:simpleType>
               <xs:element name="a" type="s"/>"#,
        );
        assert!(message.contains("unknown facet"));

        let set = compile(
            schema(
                r#"<xs:simpleType name="s"><xs:restriction base="xs:decimal">
                     <xs:totalDigits value="5"/>
                   </xs:restriction></xs:simpleType>
                   <xs:element name="a" type="s"/>"#,
            )
            .as_bytes(),
        )
        .unwrap();
        assert!(matches!(
            &set.simple_types["s"],
            SimpleType::Restriction { facets, .. } if facets.is_empty()
        ));
    }

    #[test]
    fn attribute_refs_and_groups_resolve() {
        let set = compile(
            schema(
                r#"<xs:attribute name="lang" type="xs:language"/>
                   <xs:attributeGroup name="common">
                     <xs:attribute ref="lang" use="required"/>
                     <xs:anyAttribute/>
                   </xs:attributeGroup>
                   <xs:element name="a"><xs:complexType>
                     <xs:attributeGroup ref="common"/>
                   </xs:complexType></xs:element>"#,
            )
            .as_bytes(),
        )
        .unwrap();
        let ElementType::Complex(ComplexRef::Anonymous(ty)) = &set.elements["a"].ty else {
            panic!("expected an anonymous complex type");
        };
        assert!(ty.any_attribute);
        assert_eq!(ty.attributes[0].name, "lang");
        assert_eq!(ty.attributes[0].usage, AttributeUse::Required);
    }
}
