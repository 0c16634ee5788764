use std::fmt;

/// Errors returned by structural validation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The reference definition is not a usable XML Schema.
    #[error("invalid reference definition: {0}")]
    InvalidReferenceDefinition(String),

    /// The candidate does not conform to the reference definition.
    #[error("{0}")]
    StructuralViolation(Diagnostic),
}

impl ValidationError {
    pub(crate) fn reference(message: impl Into<String>) -> Self {
        Self::InvalidReferenceDefinition(message.into())
    }

    /// The diagnostic, if this is a structural violation.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::StructuralViolation(d) => Some(d),
            Self::InvalidReferenceDefinition(_) => None,
        }
    }
}

/// How serious a violation is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The document is well-formed but does not conform.
    Error,
    /// The document could not be read at all (not UTF-8, not well-formed).
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Fatal => f.write_str("fatal"),
        }
    }
}

/// A single conformance violation with its position in the candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub severity: Severity,
    /// 1-based line, 0 when unknown.
    pub line: u32,
    /// 1-based column, 0 when unknown.
    pub column: u32,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(
                f,
                "{}: line {}, column {}: {}",
                self.severity, self.line, self.column, self.message
            )
        }
    }
}

/// Every violation found in one validation call, in document order.
///
/// The `Display` form (one violation per line) is what callers surface to
/// users verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostic {
    violations: Vec<Violation>,
}

impl Diagnostic {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub(crate) fn fatal(message: impl Into<String>) -> Self {
        Self::new(vec![Violation {
            severity: Severity::Fatal,
            line: 0,
            column: 0,
            message: message.into(),
        }])
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The first violation's message, without position.
    pub fn first_message(&self) -> Option<&str> {
        self.violations.first().map(|v| v.message.as_str())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}
