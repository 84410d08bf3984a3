//! Unrecoverable analysis failures.
//!
//! Ordinary problems are diagnostics and analysis continues past them. A
//! `FatalError` aborts the whole compilation unit: it is returned through
//! `Result` and propagated with `?` up to the entry point.

use thiserror::Error;
use tone_ir::Span;

use crate::{Diagnostic, DiagnosticId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("array has {count} elements, exceeding the maximum of {limit}")]
    ArrayElementCountExceeded { count: u64, limit: usize, span: Span },
}

impl FatalError {
    pub fn span(&self) -> Span {
        match self {
            FatalError::ArrayElementCountExceeded { span, .. } => *span,
        }
    }

    /// Render as a diagnostic for reporting alongside recoverable ones.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let id = match self {
            FatalError::ArrayElementCountExceeded { .. } => DiagnosticId::MaxArrayElementCountExceeded,
        };
        Diagnostic::error(id, self.span()).with_message(self.to_string())
    }
}
