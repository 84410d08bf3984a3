//! Compilation-unit checker.
//!
//! The `Checker` owns all analyzer state for one run and drives the passes:
//!
//! ```text
//! Pass 0: Natives
//!   - Named natives go into the root scope, operators into the operator table
//!
//! Pass 1: Collection
//!   - One global scope per file, imports wired up
//!   - Structs, modules and global values declared (conflict matrix applies)
//!
//! Pass 2: Signatures
//!   - Struct field types, then module parameter and return types
//!   - Declared global value types
//!   - Duplicate overload detection
//!
//! Pass 3: Default values
//!   - Global initializers, struct-field and parameter defaults, in source
//!     order; each site resolves lazily so declaration order never matters
//!
//! Pass 4: Bodies
//!   - Module bodies with definite-assignment tracking
//! ```
//!
//! Expression and statement building live in `expr`, `call` and `stmt`; the
//! default-value driver lives in `defaults`.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tone_diagnostic::{Diagnostic, DiagnosticId, DiagnosticSink, FatalError};
use tone_ir::{Expr, ExprId, ModuleDecl, Name, SourceFile, Span, StringInterner, StructDecl, ValueDecl};
use tone_types::{AstDataType, StructId};

use crate::config::SemaConfig;
use crate::decl::{Declarations, FileId, ModuleId, ScopeId, ValueId};
use crate::defaults::{DefaultValueResolver, DefaultValueSite};
use crate::native::{NativeModuleRegistry, Operator};
use crate::scope::{Conflict, ScopeItem, ScopeTree};
use crate::typed::{TypedModuleBody, TypedProgram};

mod call;
mod collect;
mod defaults;
mod expr;
mod signatures;
mod stmt;

#[cfg(test)]
mod integration_tests;

/// A script module together with its source.
#[derive(Copy, Clone)]
struct ScriptModule<'a> {
    id: ModuleId,
    file: FileId,
    /// Scope holding the parameter values; the body block nests below it.
    body_scope: ScopeId,
    decl: &'a ModuleDecl,
}

#[derive(Copy, Clone)]
struct ScriptStruct<'a> {
    id: StructId,
    file: FileId,
    decl: &'a StructDecl,
}

#[derive(Copy, Clone)]
struct GlobalSource<'a> {
    file: FileId,
    decl: &'a ValueDecl,
    /// Resolved declared type; `None` when the type is inferred.
    declared: Option<AstDataType>,
}

/// Where an expression is being built.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ExprContext {
    pub file: FileId,
    pub scope: ScopeId,
    /// Enclosing module; `None` inside default values and global initializers.
    pub module: Option<ModuleId>,
}

pub(crate) struct Checker<'a> {
    // === Immutable Context ===
    files: &'a [SourceFile],
    interner: &'a StringInterner,
    config: &'a SemaConfig,

    // === Declarations and Scopes ===
    decls: Declarations,
    scopes: ScopeTree,
    root_scope: ScopeId,
    file_scopes: Vec<ScopeId>,
    operators: FxHashMap<Operator, SmallVec<[ModuleId; 8]>>,

    // === Sources ===
    script_modules: Vec<ScriptModule<'a>>,
    script_structs: Vec<ScriptStruct<'a>>,
    globals: FxHashMap<ValueId, GlobalSource<'a>>,
    /// Every default-value site, in source order.
    default_sites: Vec<DefaultValueSite>,

    // === Results ===
    defaults: DefaultValueResolver,
    module_bodies: Vec<TypedModuleBody>,

    // === Diagnostics ===
    diagnostics: &'a mut dyn DiagnosticSink,
    /// Nesting depth of speculative builds; nothing is reported while non-zero.
    muted: u32,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(
        files: &'a [SourceFile],
        interner: &'a StringInterner,
        config: &'a SemaConfig,
        diagnostics: &'a mut dyn DiagnosticSink,
    ) -> Self {
        let mut scopes = ScopeTree::new();
        let root_scope = scopes.new_scope(None);
        Checker {
            files,
            interner,
            config,
            decls: Declarations::new(),
            scopes,
            root_scope,
            file_scopes: Vec::with_capacity(files.len()),
            operators: FxHashMap::default(),
            script_modules: Vec::new(),
            script_structs: Vec::new(),
            globals: FxHashMap::default(),
            default_sites: Vec::new(),
            defaults: DefaultValueResolver::new(),
            module_bodies: Vec::new(),
            diagnostics,
            muted: 0,
        }
    }

    /// Run every pass. A fatal error aborts immediately.
    #[tracing::instrument(level = "debug", skip_all, fields(files = self.files.len()))]
    pub(crate) fn run(
        mut self,
        registry: &dyn NativeModuleRegistry,
    ) -> Result<(Declarations, TypedProgram), FatalError> {
        self.register_natives(registry);
        self.collect_declarations();
        self.resolve_signatures();
        self.resolve_all_defaults()?;
        self.check_bodies()?;

        tracing::debug!(
            values = self.decls.value_count(),
            modules = self.module_bodies.len(),
            cycles = self.defaults.cycle_count(),
            "analysis complete"
        );
        let program = TypedProgram {
            defaults: self.defaults.into_resolved(),
            modules: self.module_bodies,
        };
        Ok((self.decls, program))
    }

    // ── Lookup helpers ──────────────────────────────────────────────

    #[inline]
    fn expr(&self, file: FileId, id: ExprId) -> &'a Expr {
        self.files[file.index()].arena.get(id)
    }

    #[inline]
    fn file_scope(&self, file: FileId) -> ScopeId {
        self.file_scopes[file.index()]
    }

    #[inline]
    fn name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Render a type for a diagnostic message.
    fn type_name(&self, ty: AstDataType) -> String {
        ty.display(|id| self.name(self.decls.structure(id).name).to_string())
            .to_string()
    }

    fn module_name(&self, module: ModuleId) -> &str {
        &self.decls.module(module).display_name
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    fn emit(&mut self, diagnostic: Diagnostic) {
        if self.muted == 0 {
            self.diagnostics.emit(diagnostic);
        }
    }

    fn error(&mut self, id: DiagnosticId, span: Span, message: impl Into<String>) {
        self.emit(Diagnostic::error(id, span).with_message(message));
    }

    fn warning(&mut self, id: DiagnosticId, span: Span, message: impl Into<String>) {
        self.emit(Diagnostic::warning(id, span).with_message(message));
    }

    /// Report a declaration blocked by an existing binding.
    fn report_conflict(&mut self, name: Name, item: ScopeItem, span: Span, conflict: Conflict) {
        let id = if matches!(item, ScopeItem::Struct(_)) {
            DiagnosticId::StructNameConflict
        } else {
            DiagnosticId::NameConflict
        };
        let mut diagnostic = Diagnostic::error(id, span).with_message(format!(
            "`{}` is already declared as a {} in this scope",
            self.name(name),
            conflict.existing.describe()
        ));
        if conflict.span != Span::DUMMY {
            diagnostic = diagnostic.with_label(conflict.span, "previously declared here");
        }
        self.emit(diagnostic);
    }

    /// Bind `name` in `scope`, reporting a conflict if it is taken.
    fn declare(&mut self, scope: ScopeId, name: Name, item: ScopeItem, span: Span) {
        if let Err(conflict) = self.scopes.declare(scope, name, item, span) {
            self.report_conflict(name, item, span, conflict);
        }
    }
}
