//! Simple-type evaluation: built-in lexical checks, derivation facets,
//! lists and unions.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::builtin::Builtin;
use crate::schema::{Facets, SchemaSet, SimpleRef, SimpleType};

/// Check `value` against a simple type. The error is a human-readable
/// reason without position.
pub(crate) fn check(schema: &SchemaSet, ty: &SimpleRef, value: &str) -> Result<(), String> {
    match ty {
        SimpleRef::Builtin(builtin) => builtin.check(&builtin.normalize(value)),
        SimpleRef::Named(name) => match schema.simple_types.get(name) {
            Some(simple) => check_type(schema, simple, value),
            None => Err(format!("unknown simple type '{name}'")),
        },
        SimpleRef::Anonymous(simple) => check_type(schema, simple, value),
    }
}

fn check_type(schema: &SchemaSet, ty: &SimpleType, value: &str) -> Result<(), String> {
    match ty {
        SimpleType::Restriction { base, facets } => {
            check(schema, base, value)?;
            if facets.is_empty() {
                Ok(())
            } else {
                check_facets(schema, base, facets, value)
            }
        }
        SimpleType::List { item } => value
            .split_whitespace()
            .try_for_each(|token| check(schema, item, token)),
        SimpleType::Union { members } => {
            if members.iter().any(|m| check(schema, m, value).is_ok()) {
                Ok(())
            } else {
                Err(format!("'{}' does not match any member type of the union", value.trim()))
            }
        }
    }
}

fn check_facets(schema: &SchemaSet, base: &SimpleRef, facets: &Facets, raw: &str) -> Result<(), String> {
    let primitive = primitive(schema, base);
    let list = is_list(schema, base);
    let value: Cow<'_, str> = match primitive {
        Some(builtin) => builtin.normalize(raw),
        None => raw.split_whitespace().collect::<Vec<_>>().join(" ").into(),
    };
    let value = value.as_ref();

    if !facets.enumeration.is_empty()
        && !facets
            .enumeration
            .iter()
            .any(|allowed| same_value(primitive, allowed, value))
    {
        return Err(format!(
            "'{value}' is not one of the allowed values: {}",
            facets.enumeration.join(", ")
        ));
    }

    if !facets.patterns.is_empty() && !facets.patterns.iter().any(|p| p.is_match(value)) {
        return Err(format!("'{value}' does not match the required pattern"));
    }

    let length = if list {
        value.split_whitespace().count()
    } else {
        primitive.map_or_else(|| value.chars().count(), |b| b.length_of(value))
    };
    if let Some(expected) = facets.length {
        if length != expected {
            return Err(format!("'{value}' has length {length}, expected exactly {expected}"));
        }
    }
    if let Some(min) = facets.min_length {
        if length < min {
            return Err(format!("'{value}' has length {length}, shorter than the minimum {min}"));
        }
    }
    if let Some(max) = facets.max_length {
        if length > max {
            return Err(format!("'{value}' has length {length}, longer than the maximum {max}"));
        }
    }

    let order = |bound: &str| compare(primitive, value, bound);
    if let Some(min) = &facets.min_inclusive {
        if order(min) == Ordering::Less {
            return Err(format!("'{value}' is less than the minimum {min}"));
        }
    }
    if let Some(min) = &facets.min_exclusive {
        if order(min) != Ordering::Greater {
            return Err(format!("'{value}' must be greater than {min}"));
        }
    }
    if let Some(max) = &facets.max_inclusive {
        if order(max) == Ordering::Greater {
            return Err(format!("'{value}' is greater than the maximum {max}"));
        }
    }
    if let Some(max) = &facets.max_exclusive {
        if order(max) != Ordering::Less {
            return Err(format!("'{value}' must be less than {max}"));
        }
    }
    Ok(())
}

fn compare(primitive: Option<Builtin>, value: &str, bound: &str) -> Ordering {
    primitive
        .and_then(|b| b.compare(value, bound))
        .unwrap_or_else(|| value.cmp(bound))
}

fn same_value(primitive: Option<Builtin>, allowed: &str, value: &str) -> bool {
    match primitive {
        Some(builtin) if builtin.is_numeric() => {
            builtin.compare(allowed.trim(), value) == Some(Ordering::Equal)
        }
        Some(builtin) => builtin.normalize(allowed) == value,
        None => allowed.split_whitespace().collect::<Vec<_>>().join(" ") == value,
    }
}

/// The built-in at the bottom of a restriction chain; `None` for lists and
/// unions.
fn primitive(schema: &SchemaSet, ty: &SimpleRef) -> Option<Builtin> {
    let simple = match ty {
        SimpleRef::Builtin(builtin) => return Some(*builtin),
        SimpleRef::Named(name) => schema.simple_types.get(name)?,
        SimpleRef::Anonymous(simple) => simple,
    };
    match simple {
        SimpleType::Restriction { base, .. } => primitive(schema, base),
        SimpleType::List { .. } | SimpleType::Union { .. } => None,
    }
}

fn is_list(schema: &SchemaSet, ty: &SimpleRef) -> bool {
    let simple = match ty {
        SimpleRef::Builtin(_) => return false,
        SimpleRef::Named(name) => match schema.simple_types.get(name) {
            Some(simple) => simple,
            None => return false,
        },
        SimpleRef::Anonymous(simple) => simple,
    };
    match simple {
        SimpleType::Restriction { base, .. } => is_list(schema, base),
        SimpleType::List { .. } => true,
        SimpleType::Union { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::schema::ElementType;

    /// Compile a schema whose single element `v` has the simple type `T`.
    fn typed(definition: &str) -> SchemaSet {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                 {definition}
                 <xs:element name="v" type="T"/>
               </xs:schema>"#
        );
        compile(xsd.as_bytes()).unwrap()
    }

    fn check_v(schema: &SchemaSet, value: &str) -> Result<(), String> {
        let ElementType::Simple(ty) = &schema.elements["v"].ty else {
            panic!("expected a simple element type");
        };
        check(schema, ty, value)
    }

    #[test]
    fn enumeration_restricts_values() {
        let schema = typed(
            r#"<xs:simpleType name="T"><xs:restriction base="xs:string">
                 <xs:enumeration value="draft"/>
                 <xs:enumeration value="final"/>
               </xs:restriction></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "draft").is_ok());
        let err = check_v(&schema, "review").unwrap_err();
        assert_eq!(err, "'review' is not one of the allowed values: draft, final");
    }

    #[test]
    fn numeric_bounds_compare_numerically() {
        let schema = typed(
            r#"<xs:simpleType name="T"><xs:restriction base="xs:int">
                 <xs:minInclusive value="1"/>
                 <xs:maxExclusive value="10"/>
               </xs:restriction></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "1").is_ok());
        assert!(check_v(&schema, " 9 ").is_ok());
        assert!(check_v(&schema, "0").unwrap_err().contains("less than the minimum 1"));
        assert!(check_v(&schema, "10").unwrap_err().contains("must be less than 10"));
        assert!(check_v(&schema, "x").unwrap_err().contains("not a valid value for type int"));
    }

    #[test]
    fn length_facets() {
        let schema = typed(
            r#"<xs:simpleType name="T"><xs:restriction base="xs:string">
                 <xs:minLength value="2"/>
                 <xs:maxLength value="4"/>
               </xs:restriction></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "abc").is_ok());
        assert!(check_v(&schema, "a").unwrap_err().contains("shorter than the minimum 2"));
        assert!(check_v(&schema, "abcde").unwrap_err().contains("longer than the maximum 4"));
    }

    #[test]
    fn pattern_facet() {
        let schema = typed(
            r#"<xs:simpleType name="T"><xs:restriction base="xs:token">
                 <xs:pattern value="[A-Z]{3}-\d{4}"/>
               </xs:restriction></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "ABC-1234").is_ok());
        assert!(check_v(&schema, "  ABC-1234 ").is_ok());
        assert!(check_v(&schema, "AB-1234").is_err());
    }

    #[test]
    fn derivation_chains_apply_every_step() {
        let schema = typed(
            r#"<xs:simpleType name="Small"><xs:restriction base="xs:integer">
                 <xs:maxInclusive value="100"/>
               </xs:restriction></xs:simpleType>
               <xs:simpleType name="T"><xs:restriction base="Small">
                 <xs:minInclusive value="10"/>
               </xs:restriction></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "50").is_ok());
        assert!(check_v(&schema, "5").is_err());
        assert!(check_v(&schema, "500").is_err());
    }

    #[test]
    fn lists_check_every_item() {
        let schema = typed(
            r#"<xs:simpleType name="T"><xs:restriction>
                 <xs:simpleType><xs:list itemType="xs:int"/></xs:simpleType>
                 <xs:maxLength value="3"/>
               </xs:restriction></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "1 2 3").is_ok());
        assert!(check_v(&schema, "1 two 3").is_err());
        assert!(check_v(&schema, "1 2 3 4").unwrap_err().contains("has length 4"));
    }

    #[test]
    fn unions_accept_any_member() {
        let schema = typed(
            r#"<xs:simpleType name="T"><xs:union memberTypes="xs:int">
                 <xs:simpleType><xs:restriction base="xs:string">
                   <xs:enumeration value="unknown"/>
                 </xs:restriction></xs:simpleType>
               </xs:union></xs:simpleType>"#,
        );
        assert!(check_v(&schema, "42").is_ok());
        assert!(check_v(&schema, "unknown").is_ok());
        let err = check_v(&schema, "maybe").unwrap_err();
        assert_eq!(err, "'maybe' does not match any member type of the union");
    }
}
