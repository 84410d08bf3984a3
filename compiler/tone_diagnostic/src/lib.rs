//! Diagnostics for the Tone semantic analyzer.
//!
//! - `DiagnosticId`: stable identifier per diagnostic kind
//! - `Diagnostic`: message, primary span, secondary labels, notes
//! - `DiagnosticSink`: the collaborator interface the analyzer writes to
//! - `DiagnosticQueue`: collecting sink with limits and deduplication
//! - `FatalError`: resource-limit violations that abort analysis

mod diagnostic;
mod diagnostic_id;
mod fatal;
pub mod queue;
mod sink;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use diagnostic_id::{DiagnosticCategory, DiagnosticId};
pub use fatal::FatalError;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
pub use sink::DiagnosticSink;
