//! Analyzer configuration.

use tone_diagnostic::DiagnosticConfig;

/// Default upper bound on the number of elements in one array.
pub const DEFAULT_MAX_ARRAY_ELEMENT_COUNT: usize = 1 << 20;

/// Configuration for one [`analyze`](crate::analyze) run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SemaConfig {
    /// Array literals and literal repeat counts above this abort analysis.
    pub max_array_element_count: usize,
    /// Error limit and deduplication of the collected diagnostics.
    pub diagnostics: DiagnosticConfig,
}

/// Every error is kept; identical reports are merged.
impl Default for SemaConfig {
    fn default() -> Self {
        SemaConfig {
            max_array_element_count: DEFAULT_MAX_ARRAY_ELEMENT_COUNT,
            diagnostics: DiagnosticConfig {
                error_limit: 0,
                deduplicate: true,
            },
        }
    }
}

impl SemaConfig {
    /// No error limit, no deduplication.
    pub fn unlimited() -> Self {
        SemaConfig {
            max_array_element_count: DEFAULT_MAX_ARRAY_ELEMENT_COUNT,
            diagnostics: DiagnosticConfig::unlimited(),
        }
    }

    #[must_use]
    pub fn with_max_array_element_count(mut self, count: usize) -> Self {
        self.max_array_element_count = count;
        self
    }
}
