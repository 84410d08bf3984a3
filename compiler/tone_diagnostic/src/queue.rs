//! Diagnostic queue for collecting, deduplicating, and sorting diagnostics.
//!
//! Features:
//! - Error limits to prevent overwhelming output
//! - Deduplication of identical reports at the same location
//! - Stable sort by source position on flush

use rustc_hash::FxHashSet;
use tone_ir::Span;

use crate::{Diagnostic, DiagnosticId, DiagnosticSink};

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors kept (0 = unlimited).
    pub error_limit: usize,
    /// Drop a diagnostic whose id, span and message were already reported.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 100,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no limits (for testing).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Collecting [`DiagnosticSink`].
///
/// ```text
/// let mut queue = DiagnosticQueue::new();
/// queue.error(DiagnosticId::UnresolvedIdentifier, span, message);
/// let sorted = queue.flush();
/// ```
#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    seen: FxHashSet<(DiagnosticId, Span, String)>,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            seen: FxHashSet::default(),
            config,
        }
    }

    /// Add a diagnostic.
    ///
    /// Returns `true` if it was kept, `false` if it was filtered.
    pub fn add(&mut self, diagnostic: Diagnostic) -> bool {
        let is_error = diagnostic.is_error();
        if is_error && self.limit_reached() {
            return false;
        }

        if self.config.deduplicate {
            let key = (diagnostic.id, diagnostic.span, diagnostic.message.clone());
            if !self.seen.insert(key) {
                return false;
            }
        }

        if is_error {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    /// Whether the configured error limit has been hit.
    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Take all diagnostics, sorted by position (report order breaks ties).
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        diagnostics.sort_by_key(|d| d.span.start);
        self.error_count = 0;
        self.seen.clear();
        diagnostics
    }
}

impl DiagnosticSink for DiagnosticQueue {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.add(diagnostic);
    }
}
