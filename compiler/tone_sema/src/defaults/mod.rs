//! Lazy, memoized resolution of default-value expressions.
//!
//! Parameter defaults, struct-field defaults and global initializers can call
//! modules whose types depend on other defaults, so they are resolved on
//! demand in dependency order. Each site moves through
//! `Unresolved -> InProgress -> Resolved` exactly once; meeting a site that is
//! still `InProgress` means the dependency graph has a cycle.
//!
//! The resolver only owns the memo table. The checker drives it: it calls
//! [`DefaultValueResolver::enter`], builds the expression when told to, and
//! hands the result back with [`DefaultValueResolver::complete`].

use rustc_hash::{FxHashMap, FxHashSet};
use tone_diagnostic::DiagnosticId;
use tone_types::{AstDataType, StructId};

use crate::decl::{ParamId, ValueId};
use crate::typed::TypedExpr;

/// A declaration whose value expression is resolved lazily.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DefaultValueSite {
    Parameter(ParamId),
    StructField { structure: StructId, field: u32 },
    GlobalValue(ValueId),
}

impl DefaultValueSite {
    /// Diagnostic reported when this site is part of a cycle.
    pub fn cycle_diagnostic(self) -> DiagnosticId {
        match self {
            DefaultValueSite::Parameter(_) => DiagnosticId::ModuleParameterDefaultValueCyclicDependency,
            DefaultValueSite::StructField { .. } => DiagnosticId::StructFieldDefaultValueCyclicDependency,
            DefaultValueSite::GlobalValue(_) => DiagnosticId::GlobalValueCyclicDependency,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ResolutionState {
    Unresolved,
    InProgress,
    Resolved,
}

/// What the caller must do after [`DefaultValueResolver::enter`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Entered {
    /// The site is now `InProgress`; build it and call `complete`.
    Build,
    /// The site is already being built further up the stack.
    /// `report` is `true` the first time this site closes a cycle.
    Cycle { report: bool },
    Resolved(AstDataType),
}

#[derive(Clone, Debug)]
enum Slot {
    InProgress,
    Resolved { ty: AstDataType, expr: TypedExpr },
}

#[derive(Clone, Debug, Default)]
pub struct DefaultValueResolver {
    slots: FxHashMap<DefaultValueSite, Slot>,
    reported: FxHashSet<DefaultValueSite>,
}

impl DefaultValueResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, site: DefaultValueSite) -> ResolutionState {
        match self.slots.get(&site) {
            None => ResolutionState::Unresolved,
            Some(Slot::InProgress) => ResolutionState::InProgress,
            Some(Slot::Resolved { .. }) => ResolutionState::Resolved,
        }
    }

    pub fn enter(&mut self, site: DefaultValueSite) -> Entered {
        match self.slots.get(&site) {
            None => {
                self.slots.insert(site, Slot::InProgress);
                Entered::Build
            }
            Some(Slot::InProgress) => Entered::Cycle {
                report: self.reported.insert(site),
            },
            Some(Slot::Resolved { ty, .. }) => Entered::Resolved(*ty),
        }
    }

    /// Record the built expression of a site entered with [`Entered::Build`].
    ///
    /// `ty` is the type the site resolves to, which for a declared site is
    /// the declared type rather than the expression's own type.
    pub fn complete(&mut self, site: DefaultValueSite, ty: AstDataType, expr: TypedExpr) {
        debug_assert_eq!(self.state(site), ResolutionState::InProgress);
        self.slots.insert(site, Slot::Resolved { ty, expr });
    }

    /// Number of distinct sites reported as cyclic.
    pub fn cycle_count(&self) -> usize {
        self.reported.len()
    }

    /// Take every resolved expression.
    pub fn into_resolved(self) -> FxHashMap<DefaultValueSite, TypedExpr> {
        self.slots
            .into_iter()
            .filter_map(|(site, slot)| match slot {
                Slot::Resolved { expr, .. } => Some((site, expr)),
                Slot::InProgress => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
