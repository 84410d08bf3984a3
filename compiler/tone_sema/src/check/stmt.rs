//! Module bodies and statements (pass 4).

use tone_diagnostic::{DiagnosticId, FatalError};
use tone_ir::{BinaryOp, Block, ExprId, ParamDirection, Span, Stmt, StmtKind, ValueDecl};
use tone_types::AstDataType;

use super::signatures::TypePosition;
use super::{Checker, ExprContext, ScriptModule};
use crate::decl::{ModuleId, ModuleKind, ValueDefinition, ValueKind};
use crate::native::Operator;
use crate::scope::ScopeItem;
use crate::tracker::{InitState, ScopeTracker};
use crate::typed::{ArgumentValue, TypedBlock, TypedExpr, TypedExprKind, TypedModuleBody, TypedStmt, TypedStmtKind};

impl<'a> Checker<'a> {
    pub(super) fn check_bodies(&mut self) -> Result<(), FatalError> {
        for index in 0..self.script_modules.len() {
            let script = self.script_modules[index];
            let body = self.check_module_body(script)?;
            self.module_bodies.push(body);
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(module = self.name(script.decl.name)))]
    fn check_module_body(&mut self, script: ScriptModule<'a>) -> Result<TypedModuleBody, FatalError> {
        let cx = ExprContext {
            file: script.file,
            scope: script.body_scope,
            module: Some(script.id),
        };

        let mut tracker = ScopeTracker::new();
        for &param in &self.decls.module(script.id).params {
            let param = self.decls.param(param);
            if let (ParamDirection::Out, Some(value)) = (param.direction, param.value) {
                tracker.track_value(value, InitState::No);
            }
        }

        let body = self.build_block(cx, &script.decl.body, &mut tracker)?;

        if !tracker.is_unreachable() {
            let end = Span::point(script.decl.body.span.end);
            self.check_outputs(script.id, &tracker, end);
            let return_type = self.decls.module(script.id).return_type;
            if !return_type.is_void() && !return_type.is_error() {
                self.error(
                    DiagnosticId::ModuleMissingReturn,
                    end,
                    format!(
                        "module `{}` can reach its end without returning `{}`",
                        self.module_name(script.id),
                        self.type_name(return_type)
                    ),
                );
            }
        }

        Ok(TypedModuleBody {
            module: script.id,
            body,
        })
    }

    /// Report output parameters not assigned on every path reaching `span`.
    fn check_outputs(&mut self, module: ModuleId, tracker: &ScopeTracker, span: Span) {
        let params = self.decls.module(module).params.clone();
        for param in params {
            let param = self.decls.param(param);
            let Some(value) = param.value.filter(|_| param.direction == ParamDirection::Out) else {
                continue;
            };
            let (id, verb) = match tracker.value_state(value) {
                InitState::Yes => continue,
                InitState::No => (DiagnosticId::OutputParameterNotInitialized, "is not"),
                InitState::Maybe => (DiagnosticId::OutputParameterMaybeNotInitialized, "may not be"),
            };
            let message = format!(
                "output parameter `{}` {verb} assigned before the module returns",
                self.name(param.name)
            );
            self.error(id, span, message);
        }
    }

    pub(super) fn build_block(
        &mut self,
        cx: ExprContext,
        block: &'a Block,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedBlock, FatalError> {
        let cx = ExprContext {
            scope: self.scopes.new_scope(Some(cx.scope)),
            ..cx
        };
        let mut inner = tracker.child();
        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut warned = false;
        for stmt in &block.stmts {
            if inner.is_unreachable() && !warned {
                self.warning(DiagnosticId::UnreachableCode, stmt.span, "unreachable statement");
                warned = true;
            }
            stmts.push(self.build_stmt(cx, stmt, &mut inner)?);
        }
        tracker.integrate_child_scope(&inner);
        Ok(TypedBlock {
            stmts,
            span: block.span,
        })
    }

    fn build_stmt(
        &mut self,
        cx: ExprContext,
        stmt: &'a Stmt,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedStmt, FatalError> {
        let span = stmt.span;
        let kind = match &stmt.kind {
            StmtKind::Value(decl) => self.build_value_decl(cx, decl, tracker)?,
            StmtKind::Assign { target, op, value } => {
                self.build_assign(cx, *target, *op, *value, span, tracker)?
            }
            StmtKind::Expr(expr) => {
                let value = self.build_value(cx, *expr, tracker)?;
                if !value.is_error() && !self.has_effect(&value) {
                    self.warning(
                        DiagnosticId::ExpressionHasNoEffect,
                        span,
                        "expression result is unused and has no effect",
                    );
                }
                TypedStmtKind::Expr(value)
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.build_expr(cx, *cond, tracker.clone())?;
                self.require_bool(&cond.expr, "`if` condition");
                let mut then_tracker = cond.when_true;
                let then_block = self.build_block(cx, then_block, &mut then_tracker)?;
                let mut else_tracker = cond.when_false;
                let else_block = match else_block {
                    Some(block) => Some(self.build_block(cx, block, &mut else_tracker)?),
                    None => None,
                };
                *tracker = ScopeTracker::union(&[then_tracker, else_tracker]);
                TypedStmtKind::If {
                    cond: cond.expr,
                    then_block,
                    else_block,
                }
            }
            StmtKind::For {
                value,
                iterable,
                body,
            } => self.build_for(cx, value, *iterable, body, tracker)?,
            StmtKind::Break => {
                if !tracker.issue_break() {
                    self.error(DiagnosticId::IllegalBreak, span, "`break` outside of a loop");
                }
                TypedStmtKind::Break
            }
            StmtKind::Continue => {
                if !tracker.issue_continue() {
                    self.error(DiagnosticId::IllegalContinue, span, "`continue` outside of a loop");
                }
                TypedStmtKind::Continue
            }
            StmtKind::Return(value) => self.build_return(cx, *value, span, tracker)?,
            StmtKind::Block(block) => TypedStmtKind::Block(self.build_block(cx, block, tracker)?),
        };
        Ok(TypedStmt { kind, span })
    }

    fn build_value_decl(
        &mut self,
        cx: ExprContext,
        decl: &'a ValueDecl,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedStmtKind, FatalError> {
        let declared = match &decl.ty {
            Some(parsed) => {
                let ty = self.resolve_type(cx.file, parsed);
                Some(self.check_legal(ty, TypePosition::Value, parsed.span))
            }
            None => None,
        };
        let init = match decl.init {
            Some(init) => Some(self.build_value(cx, init, tracker)?),
            None => None,
        };

        let ty = match (declared, &init) {
            (Some(declared), Some(init)) => {
                if !init.ty.is_assignable_to(&declared) {
                    let message = format!(
                        "cannot initialize `{}` of type `{}` with `{}`",
                        self.name(decl.name),
                        self.type_name(declared),
                        self.type_name(init.ty)
                    );
                    self.error(DiagnosticId::InvalidAssignment, init.span, message);
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(init)) if init.is_error() => AstDataType::ERROR,
            (None, Some(init)) if init.ty.is_empty_array() => {
                self.error(
                    DiagnosticId::ValueTypeNotInferable,
                    decl.span,
                    format!("cannot infer the element type of `{}`", self.name(decl.name)),
                );
                AstDataType::ERROR
            }
            (None, Some(init)) => self.check_legal(init.ty, TypePosition::Value, init.span),
            (None, None) => {
                self.error(
                    DiagnosticId::ValueTypeNotInferable,
                    decl.span,
                    format!("value `{}` needs a type or an initializer", self.name(decl.name)),
                );
                AstDataType::ERROR
            }
        };

        let value = self.decls.add_value(ValueDefinition {
            name: decl.name,
            kind: ValueKind::Explicit,
            ty,
            span: decl.span,
            scope: cx.scope,
        });
        self.declare(cx.scope, decl.name, ScopeItem::Value(value), decl.span);
        tracker.track_value(
            value,
            if init.is_some() {
                InitState::Yes
            } else {
                InitState::No
            },
        );
        Ok(TypedStmtKind::Value { value, init })
    }

    fn build_assign(
        &mut self,
        cx: ExprContext,
        target: ExprId,
        op: Option<BinaryOp>,
        value: ExprId,
        span: Span,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedStmtKind, FatalError> {
        let target = self.build_target(cx, target, tracker)?;
        self.check_writable(&target, DiagnosticId::AssignmentTargetNotWritable, span);

        let value = self.build_value(cx, value, tracker)?;
        let value = match op {
            Some(op) => {
                // `x op= v` reads `x` first.
                if let (true, Some(root)) = (target.whole, target.root) {
                    self.check_initialized(root, target.expr.span, tracker);
                }
                self.call_operator(Operator::Binary(op), vec![target.expr.clone(), value], span)?
            }
            None => value,
        };

        if !value.ty.is_assignable_to(&target.expr.ty) {
            let message = format!(
                "cannot assign `{}` to `{}`",
                self.type_name(value.ty),
                self.type_name(target.expr.ty)
            );
            self.error(DiagnosticId::InvalidAssignment, value.span, message);
        }
        if let (true, Some(root)) = (target.whole, target.root) {
            tracker.assign(root);
        }
        Ok(TypedStmtKind::Assign {
            target: target.expr,
            value,
        })
    }

    fn build_for(
        &mut self,
        cx: ExprContext,
        decl: &'a ValueDecl,
        iterable: ExprId,
        body: &'a Block,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedStmtKind, FatalError> {
        let iterable = self.build_value(cx, iterable, tracker)?;
        let element = if iterable.is_error() {
            AstDataType::ERROR
        } else if !iterable.ty.is_array() {
            let message = format!("cannot iterate over `{}`; it is not an array", self.type_name(iterable.ty));
            self.error(DiagnosticId::NotAnArray, iterable.span, message);
            AstDataType::ERROR
        } else {
            iterable.ty.element_type()
        };

        let declared = match &decl.ty {
            Some(parsed) => {
                let ty = self.resolve_type(cx.file, parsed);
                Some(self.check_legal(ty, TypePosition::Value, parsed.span))
            }
            None => None,
        };
        let ty = match declared {
            Some(declared) => {
                if !element.is_assignable_to(&declared) {
                    let message = format!(
                        "loop value `{}` has type `{}`, but the elements are `{}`",
                        self.name(decl.name),
                        self.type_name(declared),
                        self.type_name(element)
                    );
                    self.error(DiagnosticId::InvalidAssignment, decl.span, message);
                }
                declared
            }
            None if iterable.ty.is_empty_array() => {
                self.error(
                    DiagnosticId::ValueTypeNotInferable,
                    decl.span,
                    format!("cannot infer the type of `{}` from an empty array", self.name(decl.name)),
                );
                AstDataType::ERROR
            }
            None => element,
        };

        let loop_scope = self.scopes.new_scope(Some(cx.scope));
        let value = self.decls.add_value(ValueDefinition {
            name: decl.name,
            kind: ValueKind::LoopValue,
            ty,
            span: decl.span,
            scope: loop_scope,
        });
        self.declare(loop_scope, decl.name, ScopeItem::Value(value), decl.span);

        let body_cx = ExprContext {
            scope: loop_scope,
            ..cx
        };
        // A later iteration starts from where the previous one ended.
        let mut entry = tracker.clone();
        entry.integrate_loop_scope(&self.speculative_loop_body(body_cx, body, tracker)?);
        let mut body_tracker = entry.loop_child();
        let body = self.build_block(body_cx, body, &mut body_tracker)?;
        tracker.integrate_loop_scope(&body_tracker);

        Ok(TypedStmtKind::For {
            value,
            iterable,
            body,
        })
    }

    /// End state of one pass over a loop body entered from `tracker`.
    ///
    /// Nothing is reported, and scopes and values created along the way are
    /// dropped again.
    fn speculative_loop_body(
        &mut self,
        cx: ExprContext,
        body: &'a Block,
        tracker: &ScopeTracker,
    ) -> Result<ScopeTracker, FatalError> {
        let scopes = self.scopes.scope_count();
        let values = self.decls.value_count();
        let mut body_tracker = tracker.loop_child();
        self.muted += 1;
        let built = self.build_block(cx, body, &mut body_tracker);
        self.muted -= 1;
        self.scopes.truncate(scopes);
        self.decls.truncate_values(values);
        built?;
        Ok(body_tracker)
    }

    fn build_return(
        &mut self,
        cx: ExprContext,
        value: Option<ExprId>,
        span: Span,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedStmtKind, FatalError> {
        let Some(module) = cx.module else {
            return Ok(TypedStmtKind::Return(None));
        };
        let return_type = self.decls.module(module).return_type;

        let value = match value {
            Some(value) => {
                let value = self.build_value(cx, value, tracker)?;
                if return_type.is_void() {
                    let message = format!("module `{}` does not return a value", self.module_name(module));
                    self.error(DiagnosticId::ReturnValueInVoidModule, value.span, message);
                } else if !value.ty.is_assignable_to(&return_type) {
                    let message = format!(
                        "module `{}` returns `{}`, found `{}`",
                        self.module_name(module),
                        self.type_name(return_type),
                        self.type_name(value.ty)
                    );
                    self.error(DiagnosticId::ReturnTypeMismatch, value.span, message);
                }
                Some(value)
            }
            None => {
                if !return_type.is_void() && !return_type.is_error() {
                    let message = format!(
                        "module `{}` must return `{}`",
                        self.module_name(module),
                        self.type_name(return_type)
                    );
                    self.error(DiagnosticId::MissingReturnValue, span, message);
                }
                None
            }
        };

        if !tracker.is_unreachable() {
            self.check_outputs(module, tracker, span);
        }
        tracker.issue_return();
        Ok(TypedStmtKind::Return(value))
    }

    /// Whether evaluating `expr` can do anything besides produce a value.
    fn has_effect(&self, expr: &TypedExpr) -> bool {
        match &expr.kind {
            TypedExprKind::ModuleCall(call) => {
                !matches!(self.decls.module(call.module).kind, ModuleKind::Operator(_))
                    || call.arguments.iter().any(|argument| match &argument.value {
                        ArgumentValue::In(value) => self.has_effect(value),
                        ArgumentValue::Out(_) => true,
                        ArgumentValue::Default(_) => false,
                    })
            }
            TypedExprKind::Not(operand) | TypedExprKind::Convert(operand) => self.has_effect(operand),
            TypedExprKind::And { left, right } | TypedExprKind::Or { left, right } => {
                self.has_effect(left) || self.has_effect(right)
            }
            TypedExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => self.has_effect(cond) || self.has_effect(if_true) || self.has_effect(if_false),
            TypedExprKind::ArrayLiteral(elements) => elements.iter().any(|element| self.has_effect(element)),
            _ => false,
        }
    }
}
