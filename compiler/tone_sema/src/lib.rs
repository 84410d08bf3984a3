//! Tone semantic analysis.
//!
//! Turns the parse trees of one compilation unit into a typed program:
//! - Name resolution over a tree of scopes, with module overloads
//! - Runtime-mutability and upsample-factor typing of every expression
//! - Definite-assignment tracking for values and output parameters
//! - Overload resolution for module calls and operators
//! - Lazy resolution of default values, global initializers included
//!
//! # Usage
//!
//! ```ignore
//! use tone_sema::{analyze, BuiltinOperators, SemaConfig};
//!
//! let output = analyze(&files, &interner, &BuiltinOperators, &SemaConfig::default())?;
//! for diagnostic in &output.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! ```

mod check;
pub mod config;
pub mod decl;
pub mod defaults;
pub mod native;
pub mod overload;
pub mod scope;
mod stack;
pub mod tracker;
pub mod typed;

use std::sync::Once;

use tone_diagnostic::{Diagnostic, DiagnosticQueue, DiagnosticSink, FatalError};
use tone_ir::{SourceFile, StringInterner};

pub use config::{SemaConfig, DEFAULT_MAX_ARRAY_ELEMENT_COUNT};
pub use decl::{
    Declarations, FileId, ModuleDefinition, ModuleId, ModuleKind, ModuleParameter, ParamId,
    ScopeId, StructDefinition, StructField, ValueDefinition, ValueId, ValueKind,
};
pub use defaults::DefaultValueSite;
pub use native::{
    BuiltinOperators, NativeModuleRegistry, NativeName, NativeParam, NativeSignature, Operator,
};
pub use tracker::{InitState, ScopeTracker};
pub use typed::{
    ArgumentValue, CallArgument, FieldValue, ModuleCall, TypedBlock, TypedExpr, TypedExprKind,
    TypedModuleBody, TypedProgram, TypedStmt, TypedStmtKind,
};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set; safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Result of analyzing one compilation unit.
#[derive(Clone, Debug)]
pub struct AnalysisOutput {
    pub declarations: Declarations,
    pub program: TypedProgram,
    /// Sorted by position.
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

/// Analyze `files` as one compilation unit.
///
/// Diagnostics are collected according to `config.diagnostics`. A fatal
/// error aborts analysis and discards everything collected so far.
pub fn analyze(
    files: &[SourceFile],
    interner: &StringInterner,
    registry: &dyn NativeModuleRegistry,
    config: &SemaConfig,
) -> Result<AnalysisOutput, FatalError> {
    let mut queue = DiagnosticQueue::with_config(config.diagnostics.clone());
    let (declarations, program) = analyze_with_sink(files, interner, registry, config, &mut queue)?;
    Ok(AnalysisOutput {
        declarations,
        program,
        diagnostics: queue.flush(),
    })
}

/// Analyze `files`, writing diagnostics straight to `sink`.
#[tracing::instrument(level = "debug", skip_all, fields(files = files.len()))]
pub fn analyze_with_sink(
    files: &[SourceFile],
    interner: &StringInterner,
    registry: &dyn NativeModuleRegistry,
    config: &SemaConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<(Declarations, TypedProgram), FatalError> {
    check::Checker::new(files, interner, config, sink).run(registry)
}
