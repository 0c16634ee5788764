//! Structural validator for docvault.
//!
//! A model document is only accepted when it conforms to the XML Schema
//! (XSD) stored in its schema document. This crate performs that check:
//! it compiles the schema bytes into an internal content model and walks the
//! candidate document against it, collecting every violation it finds.
//!
//! The validator is a pure function of its two inputs. [`XsdValidator`] only
//! holds immutable configuration, and each call returns its own
//! [`Diagnostic`], so concurrent validations never observe each other.
//!
//! # Quick Start
//!
//! ```rust
//! use docvault_validate::{StructuralValidator, XsdValidator};
//!
//! let xsd = br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="note" type="xs:string"/>
//! </xs:schema>"#;
//!
//! let validator = XsdValidator::default();
//! assert!(validator.validate(xsd, b"<note>hello</note>").is_ok());
//! assert!(validator.validate(xsd, b"<memo>hello</memo>").is_err());
//! ```
//!
//! # Supported subset
//!
//! Element declarations (global, local, `ref`), named and anonymous complex
//! types with `sequence` / `choice` / `all` / `any`, model groups,
//! attribute groups, `simpleContent` and `complexContent` extension, simple
//! types with restriction facets, lists, unions, and the common built-in
//! datatypes. `xs:include` / `xs:import` are rejected because schemas are
//! self-contained documents.

mod builtin;
mod compile;
mod content;
mod depth;
mod schema;
mod simple;

pub mod config;
pub mod error;
pub mod validator;

pub use config::ValidationConfig;
pub use error::{Diagnostic, Severity, ValidationError, Violation};
pub use validator::{CompiledSchema, StructuralValidator, XsdValidator};
