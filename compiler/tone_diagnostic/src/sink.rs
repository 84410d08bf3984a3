//! The narrow interface the analyzer reports through.

use tone_ir::Span;

use crate::{Diagnostic, DiagnosticId};

/// Append-only receiver of diagnostics.
///
/// The analyzer is the single writer; implementations decide whether to
/// collect, filter, or forward.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);

    fn error(&mut self, id: DiagnosticId, span: Span, message: String) {
        self.emit(Diagnostic::error(id, span).with_message(message));
    }

    fn warning(&mut self, id: DiagnosticId, span: Span, message: String) {
        self.emit(Diagnostic::warning(id, span).with_message(message));
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
