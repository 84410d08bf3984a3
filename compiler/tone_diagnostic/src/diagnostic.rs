use std::fmt;

use tone_ir::Span;

use crate::DiagnosticId;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A secondary location with a message ("declared here", "cycle enters here").
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

/// One reported problem.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[must_use = "diagnostics should be reported or returned, not silently dropped"]
pub struct Diagnostic {
    /// Stable identifier for tests and tooling.
    pub id: DiagnosticId,
    pub severity: Severity,
    /// Primary location.
    pub span: Span,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new_with_severity(id: DiagnosticId, severity: Severity, span: Span) -> Self {
        Diagnostic {
            id,
            severity,
            span,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[cold]
    pub fn error(id: DiagnosticId, span: Span) -> Self {
        Self::new_with_severity(id, Severity::Error, span)
    }

    #[cold]
    pub fn warning(id: DiagnosticId, span: Span) -> Self {
        Self::new_with_severity(id, Severity::Warning, span)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {:?}: {}",
            self.severity, self.id, self.span, self.message
        )?;
        for label in &self.labels {
            write!(f, "\n     {:?}: {}", label.span, label.message)?;
        }
        for note in &self.notes {
            write!(f, "\n  = note: {note}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_collects_context() {
        let diag = Diagnostic::error(DiagnosticId::ValueNotInitialized, Span::new(3, 4))
            .with_message("value `x` is not initialized")
            .with_label(Span::new(0, 1), "declared here")
            .with_note("assign it on every path before reading it");

        assert!(diag.is_error());
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(
            diag.to_string(),
            "error [ValueNotInitialized] 3..4: value `x` is not initialized\n     0..1: declared here\n  = note: assign it on every path before reading it"
        );
    }

    #[test]
    fn warnings_are_not_errors() {
        let diag = Diagnostic::warning(DiagnosticId::UnreachableCode, Span::DUMMY);
        assert!(!diag.is_error());
    }
}
