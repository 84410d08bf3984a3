//! Module calls and operator applications.
//!
//! Every candidate of an overload group is tried in full: arguments are
//! bound, missing ones take defaults, the upsample factor and the
//! dependent-constant mutability are fixed, then each argument is checked
//! against its resolved parameter type. Problems found while trying a
//! candidate are kept aside and only reported when the group has a single
//! member; a larger group gets one aggregate diagnostic instead.

use smallvec::SmallVec;
use tone_diagnostic::{Diagnostic, DiagnosticId, FatalError};
use tone_ir::{CallArg, ExprId, Name, ParamDirection, Span};
use tone_types::{AstDataType, RuntimeMutability};

use super::expr::{BuiltExpr, PathResolution};
use super::{Checker, ExprContext};
use crate::decl::{ModuleId, ParamId, ValueId};
use crate::defaults::DefaultValueSite;
use crate::native::Operator;
use crate::overload::{
    bind_arguments, infer_upsample_factor, resolve_call_type, resolve_dependent_constant,
    select_best, ArgShape, BindingError, MatchQuality, ParamShape, Qualities, UpsampleError,
};
use crate::scope::Reference;
use crate::tracker::ScopeTracker;
use crate::typed::{ArgumentValue, CallArgument, ModuleCall, TypedExpr, TypedExprKind};

/// An argument after its expression has been built.
pub(super) struct BuiltArg {
    direction: ParamDirection,
    name: Option<Name>,
    span: Span,
    expr: TypedExpr,
}

/// A candidate that accepts the arguments.
struct CandidateMatch {
    module: ModuleId,
    upsample_factor: u32,
    dependent_constant: RuntimeMutability,
    /// Per parameter, the bound argument index.
    bindings: Vec<Option<usize>>,
    /// Per parameter, the type after upsample and dependent-constant resolution.
    resolved: Vec<AstDataType>,
    /// Per parameter, whether its default value is part of a cycle.
    cyclic_defaults: Vec<bool>,
    return_type: AstDataType,
    qualities: Qualities,
}

type Trial = Result<CandidateMatch, Vec<Diagnostic>>;

impl<'a> Checker<'a> {
    pub(super) fn build_call(
        &mut self,
        cx: ExprContext,
        callee: ExprId,
        upsample_factor: Option<u32>,
        args: &'a [CallArg],
        span: Span,
        tracker: ScopeTracker,
    ) -> Result<BuiltExpr, FatalError> {
        let callee_span = self.expr(cx.file, callee).span;
        let callee_name = self.path_name(cx, callee);
        let group = match self.resolve_path(cx, callee) {
            PathResolution::Found(Reference::ModuleGroup(group)) => Some(group),
            PathResolution::Found(reference) => {
                let name = callee_name.map_or("expression", |name| self.name(name));
                let what = match reference {
                    Reference::Value(_) => "a value",
                    Reference::Scope(_) => "an imported scope",
                    Reference::ModuleGroup(_) => "a module",
                };
                self.error(
                    DiagnosticId::NotAModule,
                    callee_span,
                    format!("`{name}` is {what}, not a module"),
                );
                None
            }
            PathResolution::Unresolved { name, member } => {
                self.report_unresolved(name, member, callee_span);
                None
            }
            PathResolution::NotAPath => {
                self.error(DiagnosticId::NotAModule, callee_span, "only modules can be called");
                None
            }
        };

        let mut tracker = tracker;
        let mut built = Vec::with_capacity(args.len());
        let mut assigned: SmallVec<[ValueId; 2]> = SmallVec::new();
        for arg in args {
            let expr = match arg.direction {
                ParamDirection::In => self.build_value(cx, arg.value, &mut tracker)?,
                ParamDirection::Out => {
                    let target = self.build_target(cx, arg.value, &mut tracker)?;
                    self.check_writable(&target, DiagnosticId::ModuleCallOutArgumentNotWritable, arg.span);
                    if let (true, Some(root)) = (target.whole, target.root) {
                        assigned.push(root);
                    }
                    target.expr
                }
            };
            built.push(BuiltArg {
                direction: arg.direction,
                name: arg.name,
                span: arg.span,
                expr,
            });
        }

        let typed = match group {
            Some(group) => self
                .resolve_module_call(&group, &mut built, upsample_factor, span)?
                .unwrap_or_else(|| TypedExpr::error(span)),
            None => TypedExpr::error(span),
        };

        // Outputs are written when the call returns, after every input was read.
        for root in assigned {
            tracker.assign(root);
        }
        Ok(BuiltExpr::plain(typed, tracker))
    }

    fn resolve_module_call(
        &mut self,
        group: &[ModuleId],
        args: &mut [BuiltArg],
        explicit_upsample: Option<u32>,
        span: Span,
    ) -> Result<Option<TypedExpr>, FatalError> {
        let mut matches = Vec::new();
        let mut single_failure = Vec::new();
        for &module in group {
            match self.try_candidate(module, args, explicit_upsample, span)? {
                Ok(candidate) => matches.push(candidate),
                Err(diagnostics) if group.len() == 1 => single_failure = diagnostics,
                Err(_) => {}
            }
        }

        // Errors in the arguments were already reported and match anything.
        let quiet = args.iter().any(|arg| arg.expr.is_error());
        let name = self.module_name(group[0]).to_string();
        let chosen = match matches.len() {
            0 if group.len() == 1 => {
                for diagnostic in single_failure {
                    self.emit(diagnostic);
                }
                return Ok(None);
            }
            0 if quiet => return Ok(None),
            0 => {
                let mut diagnostic = Diagnostic::error(DiagnosticId::ModuleCallNoMatchingOverload, span)
                    .with_message(format!(
                        "no overload of `{name}` accepts ({})",
                        self.argument_list(args)
                    ));
                for &module in group {
                    diagnostic = diagnostic.with_note(format!("candidate: {}", self.signature_text(module)));
                }
                self.emit(diagnostic);
                return Ok(None);
            }
            1 => matches.swap_remove(0),
            _ => match self.pick_best(&matches) {
                Some(index) => matches.swap_remove(index),
                None => {
                    if !quiet {
                        self.report_ambiguous(&name, &matches, args, span);
                    }
                    return Ok(None);
                }
            },
        };

        tracing::trace!(
            module = chosen.module.raw(),
            candidates = group.len(),
            upsample = chosen.upsample_factor,
            "resolved module call"
        );
        Ok(Some(self.assemble_call(chosen, args, span)))
    }

    /// Apply a unary or binary operator through the operator overload table.
    pub(super) fn call_operator(
        &mut self,
        op: Operator,
        operands: Vec<TypedExpr>,
        span: Span,
    ) -> Result<TypedExpr, FatalError> {
        if operands.iter().any(TypedExpr::is_error) {
            return Ok(TypedExpr::error(span));
        }
        let group = self.operators.get(&op).cloned().unwrap_or_default();
        let mut args: Vec<BuiltArg> = operands
            .into_iter()
            .map(|expr| BuiltArg {
                direction: ParamDirection::In,
                name: None,
                span: expr.span,
                expr,
            })
            .collect();

        let mut matches = Vec::new();
        for &module in &group {
            if let Ok(candidate) = self.try_candidate(module, &args, None, span)? {
                matches.push(candidate);
            }
        }

        let chosen = match matches.len() {
            0 => {
                let message = format!(
                    "no operator `{}` for ({})",
                    op.symbol(),
                    self.argument_list(&args)
                );
                self.error(DiagnosticId::NoMatchingOperatorOverload, span, message);
                return Ok(TypedExpr::error(span));
            }
            1 => matches.swap_remove(0),
            _ => match self.pick_best(&matches) {
                Some(index) => matches.swap_remove(index),
                None => {
                    let name = format!("operator{}", op.symbol());
                    self.report_ambiguous(&name, &matches, &args, span);
                    return Ok(TypedExpr::error(span));
                }
            },
        };
        Ok(self.assemble_call(chosen, &mut args, span))
    }

    fn pick_best(&self, matches: &[CandidateMatch]) -> Option<usize> {
        let qualities: Vec<Qualities> = matches.iter().map(|m| m.qualities.clone()).collect();
        select_best(&qualities)
    }

    fn report_ambiguous(&mut self, name: &str, matches: &[CandidateMatch], args: &[BuiltArg], span: Span) {
        let mut diagnostic = Diagnostic::error(DiagnosticId::ModuleCallAmbiguous, span).with_message(format!(
            "call to `{name}` with ({}) is ambiguous",
            self.argument_list(args)
        ));
        for candidate in matches {
            diagnostic = diagnostic.with_note(format!("candidate: {}", self.signature_text(candidate.module)));
        }
        self.emit(diagnostic);
    }

    /// Try one candidate. The outer `Result` carries fatal errors from default values.
    fn try_candidate(
        &mut self,
        module: ModuleId,
        args: &[BuiltArg],
        explicit_upsample: Option<u32>,
        span: Span,
    ) -> Result<Trial, FatalError> {
        let params: Vec<ParamId> = self.decls.module(module).params.clone();
        let shapes: Vec<ParamShape> = params
            .iter()
            .map(|&id| {
                let param = self.decls.param(id);
                ParamShape {
                    direction: param.direction,
                    name: param.name,
                }
            })
            .collect();
        let arg_shapes: Vec<ArgShape> = args
            .iter()
            .map(|arg| ArgShape {
                direction: arg.direction,
                name: arg.name,
            })
            .collect();

        let bindings = match bind_arguments(&shapes, &arg_shapes) {
            Ok(bindings) => bindings,
            Err(error) => return Ok(Err(vec![self.binding_diagnostic(module, error, args, span)])),
        };

        // Types of the values each parameter receives.
        let mut bound = Vec::with_capacity(params.len());
        let mut cyclic_defaults = vec![false; params.len()];
        let mut failures = Vec::new();
        for (index, &param) in params.iter().enumerate() {
            if let Some(arg) = bindings[index] {
                bound.push(args[arg].expr.ty);
            } else if self.decls.param(param).default.is_some() {
                let resolved = self.resolve_default(DefaultValueSite::Parameter(param))?;
                cyclic_defaults[index] = resolved.cyclic;
                bound.push(resolved.ty);
            } else {
                let message = format!(
                    "missing argument for parameter `{}` of `{}`",
                    self.name(self.decls.param(param).name),
                    self.module_name(module)
                );
                failures.push(Diagnostic::error(DiagnosticId::ModuleCallMissingArgument, span).with_message(message));
                bound.push(AstDataType::ERROR);
            }
        }
        if !failures.is_empty() {
            return Ok(Err(failures));
        }

        let declared: Vec<AstDataType> = params.iter().map(|&id| self.decls.param(id).ty).collect();
        let mut param_of_arg = vec![0; args.len()];
        for (param, binding) in bindings.iter().enumerate() {
            if let Some(arg) = binding {
                param_of_arg[*arg] = param;
            }
        }

        let pairs = args
            .iter()
            .enumerate()
            .map(|(index, arg)| (index, arg.expr.ty, declared[param_of_arg[index]]));
        let upsample_factor = match infer_upsample_factor(explicit_upsample, pairs) {
            Ok(factor) => factor,
            Err(UpsampleError::Invalid) => {
                return Ok(Err(vec![Diagnostic::error(
                    DiagnosticId::ModuleCallInvalidUpsampleFactor,
                    span,
                )
                .with_message("upsample factor must be at least 1")]));
            }
            Err(UpsampleError::NotIntegral {
                arg,
                arg_factor,
                param_factor,
            }) => {
                return Ok(Err(vec![Diagnostic::error(
                    DiagnosticId::ModuleCallUpsampleFactorNotIntegral,
                    args[arg].span,
                )
                .with_message(format!(
                    "argument upsample factor {arg_factor} is not a multiple of the parameter's factor {param_factor}"
                ))]));
            }
        };

        let dependent_constant = resolve_dependent_constant(
            params
                .iter()
                .enumerate()
                .filter(|&(_, &id)| self.decls.param(id).direction == ParamDirection::In)
                .map(|(index, _)| (declared[index], bound[index])),
        );

        let overflow = || {
            Diagnostic::error(DiagnosticId::InvalidUpsampleFactor, span)
                .with_message(format!("upsample factor {upsample_factor} is too large"))
        };
        let Some(resolved) = declared
            .iter()
            .map(|&ty| resolve_call_type(ty, upsample_factor, dependent_constant))
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(Err(vec![overflow()]));
        };
        let Some(return_type) = resolve_call_type(
            self.decls.module(module).return_type,
            upsample_factor,
            dependent_constant,
        ) else {
            return Ok(Err(vec![overflow()]));
        };

        let mut qualities = Qualities::new();
        for (index, arg) in args.iter().enumerate() {
            let param = param_of_arg[index];
            let expected = resolved[param];
            let compatible = match arg.direction {
                ParamDirection::In => arg.expr.ty.is_assignable_to(&expected),
                ParamDirection::Out => expected.is_assignable_to(&arg.expr.ty),
            };
            if !compatible {
                let param_name = self.name(self.decls.param(params[param]).name);
                let message = match arg.direction {
                    ParamDirection::In => format!(
                        "argument for `{param_name}` has type `{}`, expected `{}`",
                        self.type_name(arg.expr.ty),
                        self.type_name(expected)
                    ),
                    ParamDirection::Out => format!(
                        "output `{param_name}` of type `{}` cannot be written to `{}`",
                        self.type_name(expected),
                        self.type_name(arg.expr.ty)
                    ),
                };
                failures.push(
                    Diagnostic::error(DiagnosticId::ModuleCallArgumentTypeMismatch, arg.span).with_message(message),
                );
                continue;
            }
            if arg.direction == ParamDirection::In && arg.name.is_none() {
                qualities.push(if arg.expr.ty.is_identical_to(&expected) {
                    MatchQuality::Exact
                } else {
                    MatchQuality::Conversion
                });
            }
        }
        if !failures.is_empty() {
            return Ok(Err(failures));
        }

        Ok(Ok(CandidateMatch {
            module,
            upsample_factor,
            dependent_constant,
            bindings,
            resolved,
            cyclic_defaults,
            return_type,
            qualities,
        }))
    }

    fn binding_diagnostic(&self, module: ModuleId, error: BindingError, args: &[BuiltArg], span: Span) -> Diagnostic {
        let arg_span = args.get(error.arg()).map_or(span, |arg| arg.span);
        let module_name = self.module_name(module);
        let message = match error {
            BindingError::PositionalAfterNamed { .. } => {
                "positional arguments must come before named arguments".to_string()
            }
            BindingError::DuplicateArgument { name, .. } => {
                format!("parameter `{}` is given more than once", self.name(name))
            }
            BindingError::UnknownArgument { name, .. } => {
                format!("`{module_name}` has no parameter `{}`", self.name(name))
            }
            BindingError::TooManyArguments { .. } => format!(
                "too many arguments for `{module_name}`, which takes {}",
                self.decls.module(module).params.len()
            ),
            BindingError::DirectionMismatch { param, .. } => {
                let param = self.decls.param(self.decls.module(module).params[param]);
                format!(
                    "parameter `{}` is an `{}` parameter",
                    self.name(param.name),
                    param.direction.as_str()
                )
            }
        };
        Diagnostic::error(error.id(), arg_span).with_message(message)
    }

    /// Typed call node for the chosen candidate. Argument expressions are moved out of `args`.
    fn assemble_call(&self, chosen: CandidateMatch, args: &mut [BuiltArg], span: Span) -> TypedExpr {
        let params = &self.decls.module(chosen.module).params;
        let arguments = params
            .iter()
            .enumerate()
            .map(|(index, &param)| {
                let resolved_type = chosen.resolved[index];
                let value = match chosen.bindings[index] {
                    Some(arg) => {
                        let expr = std::mem::replace(&mut args[arg].expr, TypedExpr::error(span));
                        match args[arg].direction {
                            ParamDirection::In => ArgumentValue::In(expr),
                            ParamDirection::Out => ArgumentValue::Out(expr),
                        }
                    }
                    None if chosen.cyclic_defaults[index] => {
                        ArgumentValue::In(TypedExpr::placeholder(resolved_type, span))
                    }
                    None => ArgumentValue::Default(DefaultValueSite::Parameter(param)),
                };
                CallArgument {
                    param,
                    resolved_type,
                    value,
                }
            })
            .collect();

        TypedExpr::new(
            TypedExprKind::ModuleCall(Box::new(ModuleCall {
                module: chosen.module,
                upsample_factor: chosen.upsample_factor,
                dependent_constant_mutability: chosen.dependent_constant,
                arguments,
            })),
            chosen.return_type,
            span,
        )
    }

    fn argument_list(&self, args: &[BuiltArg]) -> String {
        args.iter()
            .map(|arg| match arg.direction {
                ParamDirection::In => self.type_name(arg.expr.ty),
                ParamDirection::Out => format!("out {}", self.type_name(arg.expr.ty)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `name(in const float x, out float y) -> float`
    fn signature_text(&self, module: ModuleId) -> String {
        let definition = self.decls.module(module);
        let params: Vec<String> = definition
            .params
            .iter()
            .map(|&id| {
                let param = self.decls.param(id);
                format!(
                    "{} {} {}",
                    param.direction.as_str(),
                    self.type_name(param.ty),
                    self.name(param.name)
                )
            })
            .collect();
        format!(
            "{}({}) -> {}",
            definition.display_name,
            params.join(", "),
            self.type_name(definition.return_type)
        )
    }
}
