//! Diagnostics (spec.md §7 Error reporting).
//!
//! Modeled on the teacher's own hand-rolled `ExcType`/`RunError` pair
//! (`exception_public.rs`) rather than pulling in `thiserror`/`anyhow`: a
//! closed, `strum`-derived kind enum plus one concrete struct carrying a
//! source range, message, and optional candidate list. There is no
//! separate logging layer — a [`DiagnosticSink`] *is* the log, in the same
//! sense the teacher's own CLI treats accumulated `RunError`s as its only
//! structured output.

use std::fmt;

use crate::location::SourceRange;

/// The closed family of diagnosable conditions (spec.md §7): lookup
/// errors, type errors, structural/well-formedness errors, flow errors,
/// and internal errors (a resolver/validator invariant was violated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticKind {
    // Lookup
    UnresolvedId,
    AmbiguousId,
    DuplicateDeclaration,
    UnknownModule,

    // Type / operator
    NoMatchingOperator,
    AmbiguousOperator,
    TypeMismatch,
    IntegerOverflow,

    // Instruction
    UnknownInstruction,
    AmbiguousInstruction,

    // Structural / well-formedness
    InvalidOverlayField,
    InvalidUnitField,
    InvalidStructField,
    ThreadScopeViolation,
    HookSignatureMismatch,
    ExceptionCycle,

    // Flow
    UnreachableCode,
    MissingReturn,
    InvalidFlowTarget,

    // Internal
    Internal,
}

impl DiagnosticKind {
    /// Internal-error kinds indicate a pass invariant broke, not a
    /// malformed input program (spec.md §7 "Internal errors").
    #[must_use]
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// One diagnosed condition: a location, a kind, a human-readable message,
/// and (for ambiguity reports) the list of candidates that matched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: SourceRange,
    pub message: String,
    pub fatal: bool,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, location: SourceRange, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
            fatal: !kind.is_internal(),
        }
    }

    #[must_use]
    pub fn internal(location: SourceRange, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Internal,
            location,
            message: message.into(),
            fatal: true,
        }
    }
}

impl fmt::Display for Diagnostic {
    /// Renders without resolving the filename (no [`crate::intern::Interner`]
    /// is available here) — callers that need the full `file:line:col` form
    /// should use [`crate::location::SourceRange::render`] directly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location.start, self.kind, self.message)
    }
}

/// Accumulates diagnostics across a compiler pass (spec.md §4.8 "each pass
/// reports into a shared sink rather than aborting on first error").
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.fatal)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(other);
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_reports_fatal_errors() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.report(Diagnostic::new(
            DiagnosticKind::UnresolvedId,
            SourceRange::synthetic(),
            "cannot find `x`",
        ));
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn internal_diagnostics_are_still_fatal() {
        let d = Diagnostic::internal(SourceRange::synthetic(), "arena index out of bounds");
        assert!(d.fatal);
        assert!(d.kind.is_internal());
    }
}
