//! Default-value resolution (pass 3).
//!
//! Sites are resolved on first use. A site met again while it is still being
//! built closes a cycle: the cycle is reported once at that site and the
//! re-entrant use sees a placeholder of the declared type.

use tone_diagnostic::{DiagnosticId, FatalError};
use tone_ir::{ExprId, Name, Span};
use tone_types::{AstDataType, RuntimeMutability};

use super::signatures::TypePosition;
use super::{Checker, ExprContext};
use crate::decl::{FileId, ModuleKind, ScopeId};
use crate::defaults::{DefaultValueSite, Entered};
use crate::tracker::ScopeTracker;
use crate::typed::TypedExpr;

/// Outcome of resolving one site for a use.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(super) struct ResolvedDefault {
    pub ty: AstDataType,
    /// The use re-entered a site still being built.
    pub cyclic: bool,
}

/// Source facts of a default-value site.
#[derive(Copy, Clone, Debug)]
struct SiteSource {
    name: Name,
    /// `None` for natives, which never carry defaults.
    file: Option<FileId>,
    scope: ScopeId,
    expr: Option<ExprId>,
    declared: Option<AstDataType>,
    span: Span,
}

impl<'a> Checker<'a> {
    /// Pass 3: resolve every site so unused defaults are still checked.
    #[tracing::instrument(level = "debug", skip_all, fields(sites = self.default_sites.len()))]
    pub(super) fn resolve_all_defaults(&mut self) -> Result<(), FatalError> {
        let sites = std::mem::take(&mut self.default_sites);
        for &site in &sites {
            self.resolve_default(site)?;
        }
        self.default_sites = sites;
        Ok(())
    }

    fn site_source(&self, site: DefaultValueSite) -> SiteSource {
        match site {
            DefaultValueSite::Parameter(id) => {
                let param = self.decls.param(id);
                let module = self.decls.module(param.module);
                let file = match module.kind {
                    ModuleKind::Script { file } => Some(file),
                    ModuleKind::Native | ModuleKind::Operator(_) => None,
                };
                SiteSource {
                    name: param.name,
                    file,
                    scope: module.scope,
                    expr: param.default,
                    declared: Some(param.ty),
                    span: param.span,
                }
            }
            DefaultValueSite::StructField { structure, field } => {
                let definition = self.decls.structure(structure);
                let field = &definition.fields[field as usize];
                SiteSource {
                    name: field.name,
                    file: Some(definition.file),
                    scope: definition.scope,
                    expr: field.default,
                    declared: Some(field.ty),
                    span: field.span,
                }
            }
            DefaultValueSite::GlobalValue(id) => {
                let value = self.decls.value(id);
                let source = self.globals.get(&id);
                SiteSource {
                    name: value.name,
                    file: source.map(|global| global.file),
                    scope: value.scope,
                    expr: source.and_then(|global| global.decl.init),
                    declared: source.and_then(|global| global.declared),
                    span: value.span,
                }
            }
        }
    }

    /// Resolve `site`, building it on first use.
    #[tracing::instrument(level = "trace", skip(self))]
    pub(super) fn resolve_default(&mut self, site: DefaultValueSite) -> Result<ResolvedDefault, FatalError> {
        match self.defaults.enter(site) {
            Entered::Resolved(ty) => Ok(ResolvedDefault { ty, cyclic: false }),
            Entered::Cycle { report } => {
                let source = self.site_source(site);
                if report {
                    tracing::debug!(?site, "default value cycle");
                    let what = match site {
                        DefaultValueSite::Parameter(_) => "parameter",
                        DefaultValueSite::StructField { .. } => "field",
                        DefaultValueSite::GlobalValue(_) => "global value",
                    };
                    self.error(
                        site.cycle_diagnostic(),
                        source.span,
                        format!(
                            "default value of {what} `{}` depends on itself",
                            self.name(source.name)
                        ),
                    );
                }
                Ok(ResolvedDefault {
                    ty: source.declared.unwrap_or(AstDataType::ERROR),
                    cyclic: true,
                })
            }
            Entered::Build => {
                let source = self.site_source(site);
                let (ty, expr) = self.build_site(site, source)?;
                self.defaults.complete(site, ty, expr);
                Ok(ResolvedDefault { ty, cyclic: false })
            }
        }
    }

    /// Build the expression of a site and decide the type it resolves to.
    fn build_site(
        &mut self,
        site: DefaultValueSite,
        source: SiteSource,
    ) -> Result<(AstDataType, TypedExpr), FatalError> {
        let (Some(file), Some(expr_id)) = (source.file, source.expr) else {
            if let DefaultValueSite::GlobalValue(_) = site {
                self.error(
                    DiagnosticId::ValueNotInitialized,
                    source.span,
                    format!("global value `{}` has no initializer", self.name(source.name)),
                );
            }
            let ty = source.declared.unwrap_or(AstDataType::ERROR);
            return Ok((ty, TypedExpr::placeholder(ty, source.span)));
        };

        let cx = ExprContext {
            file,
            scope: source.scope,
            module: None,
        };
        let mut tracker = ScopeTracker::new();
        let expr = self.build_value(cx, expr_id, &mut tracker)?;

        let ty = match site {
            DefaultValueSite::Parameter(_) | DefaultValueSite::StructField { .. } => {
                if let Some(declared) = source.declared {
                    if !expr.ty.is_assignable_to(&declared) {
                        let message = format!(
                            "default value of `{}` has type `{}`, expected `{}`",
                            self.name(source.name),
                            self.type_name(expr.ty),
                            self.type_name(declared)
                        );
                        self.error(DiagnosticId::InvalidDefaultValue, expr.span, message);
                    }
                }
                // Calls resolve dependent constants against the default's own type.
                if expr.is_error() {
                    source.declared.unwrap_or(AstDataType::ERROR)
                } else {
                    expr.ty
                }
            }
            DefaultValueSite::GlobalValue(id) => {
                let ty = self.global_type(source, &expr);
                self.decls.value_mut(id).ty = ty;
                ty
            }
        };
        Ok((ty, expr))
    }

    /// Declared type of a global, or the constant type inferred from its initializer.
    fn global_type(&mut self, source: SiteSource, init: &TypedExpr) -> AstDataType {
        if let Some(declared) = source.declared {
            if !init.ty.is_assignable_to(&declared) {
                let message = format!(
                    "cannot initialize `{}` of type `{}` with `{}`",
                    self.name(source.name),
                    self.type_name(declared),
                    self.type_name(init.ty)
                );
                self.error(DiagnosticId::InvalidAssignment, init.span, message);
            }
            return declared;
        }

        if init.is_error() {
            return AstDataType::ERROR;
        }
        if init.ty.is_empty_array() {
            self.error(
                DiagnosticId::ValueTypeNotInferable,
                init.span,
                format!("cannot infer the element type of `{}`", self.name(source.name)),
            );
            return AstDataType::ERROR;
        }
        let ty = self.check_legal(init.ty, TypePosition::Value, init.span);
        if !ty.is_error() && ty.mutability() != RuntimeMutability::Constant {
            let message = format!(
                "global value `{}` must be constant, found `{}`",
                self.name(source.name),
                self.type_name(ty)
            );
            self.error(DiagnosticId::IllegalGlobalValueType, init.span, message);
            return AstDataType::ERROR;
        }
        ty
    }
}
