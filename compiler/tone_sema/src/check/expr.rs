//! Expression building.
//!
//! Every builder threads a [`ScopeTracker`] through its children in
//! evaluation order. Boolean expressions yield two trackers, one per outcome,
//! so `&&`, `||`, `!` and ternaries can tell which assignments happened on
//! the path that made the condition true or false.

use tone_diagnostic::{Diagnostic, DiagnosticId, FatalError};
use tone_ir::{
    BinaryOp, ExprId, ExprKind, FieldInit, Literal, Name, ParsedBaseType, ParsedType, Span,
    UnaryOp,
};
use tone_types::{AstDataType, DataKind, PrimitiveType, RuntimeMutability};

use super::{Checker, ExprContext};
use crate::decl::{ValueId, ValueKind};
use crate::defaults::DefaultValueSite;
use crate::native::Operator;
use crate::scope::Reference;
use crate::stack::ensure_sufficient_stack;
use crate::tracker::{InitState, ScopeTracker};
use crate::typed::{FieldValue, TypedExpr, TypedExprKind};

/// A built expression with the flow state after it evaluates to true and to false.
///
/// For non-boolean expressions both trackers are the same.
pub(super) struct BuiltExpr {
    pub expr: TypedExpr,
    pub when_true: ScopeTracker,
    pub when_false: ScopeTracker,
}

impl BuiltExpr {
    pub(super) fn plain(expr: TypedExpr, tracker: ScopeTracker) -> Self {
        BuiltExpr {
            expr,
            when_true: tracker.clone(),
            when_false: tracker,
        }
    }
}

/// What an identifier or `alias.name` chain refers to.
pub(super) enum PathResolution {
    Found(Reference),
    Unresolved { name: Name, member: bool },
    /// Not a name chain; `a.b` here is a struct field access.
    NotAPath,
}

/// An assignment or output-argument target.
pub(super) struct Target {
    pub expr: TypedExpr,
    /// Value the target writes into, if it resolved to one.
    pub root: Option<ValueId>,
    /// The target is the root value itself, not a field or element of it.
    pub whole: bool,
}

impl Target {
    fn invalid(span: Span) -> Self {
        Target {
            expr: TypedExpr::error(span),
            root: None,
            whole: false,
        }
    }
}

fn literal_type(literal: &Literal) -> AstDataType {
    let primitive = match literal {
        Literal::Float(_) => PrimitiveType::Float,
        Literal::Double(_) => PrimitiveType::Double,
        Literal::Int(_) => PrimitiveType::Int,
        Literal::Bool(_) => PrimitiveType::Bool,
        Literal::String(_) => PrimitiveType::String,
    };
    AstDataType::primitive(RuntimeMutability::Constant, primitive)
}

/// Type of `value` when which value is produced depends on `by`.
///
/// A runtime `by` makes the result at least as runtime as `by`, at its
/// upsample factor. `None` when the factors conflict or the result is illegal.
pub(super) fn narrowed_by(value: AstDataType, by: AstDataType) -> Option<AstDataType> {
    if by.is_error() || value.is_error() || by.mutability() == RuntimeMutability::Constant {
        return Some(value);
    }
    let ty = if value.mutability() == RuntimeMutability::Constant {
        value
            .demoted_to(by.mutability())
            .with_upsample_factor(by.upsample_factor())
    } else if value.upsample_factor() == by.upsample_factor() {
        value.demoted_to(by.mutability())
    } else {
        return None;
    };
    (!ty.is_error() && ty.is_legal_value_type()).then_some(ty)
}

/// Type of a struct field read through a value of type `container`.
///
/// Constant fields stay constant; other fields take on the container's
/// mutability and are scaled by its upsample factor.
pub(super) fn field_type(container: AstDataType, field: AstDataType) -> AstDataType {
    if container.is_error() || field.is_error() || field.mutability() == RuntimeMutability::Constant {
        return field;
    }
    let Some(scaled) = field.upsampled_by(container.upsample_factor()) else {
        return AstDataType::ERROR;
    };
    let ty = scaled.with_mutability(container.mutability());
    if ty.is_legal_value_type() {
        ty
    } else {
        AstDataType::ERROR
    }
}

impl<'a> Checker<'a> {
    /// Build an expression whose truth value does not matter.
    ///
    /// The two outcome trackers are merged back into `tracker`.
    pub(super) fn build_value(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedExpr, FatalError> {
        let built = self.build_expr(cx, id, tracker.clone())?;
        *tracker = ScopeTracker::union(&[built.when_true, built.when_false]);
        Ok(built.expr)
    }

    #[tracing::instrument(level = "trace", skip(self, cx, tracker))]
    pub(super) fn build_expr(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        tracker: ScopeTracker,
    ) -> Result<BuiltExpr, FatalError> {
        ensure_sufficient_stack(|| self.build_expr_inner(cx, id, tracker))
    }

    fn build_expr_inner(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        tracker: ScopeTracker,
    ) -> Result<BuiltExpr, FatalError> {
        let expr = self.expr(cx.file, id);
        let span = expr.span;
        let mut tracker = tracker;

        let typed = match &expr.kind {
            ExprKind::Literal(literal) => TypedExpr::new(
                TypedExprKind::Literal(*literal),
                literal_type(literal),
                span,
            ),
            ExprKind::Identifier(_) | ExprKind::Access { .. } => self.build_name(cx, id, &mut tracker)?,
            ExprKind::ArrayLiteral(elements) => {
                self.build_array_literal(cx, id, elements, span, &mut tracker)?
            }
            ExprKind::ArrayIndex { array, index } => {
                let array = self.build_value(cx, *array, &mut tracker)?;
                let index = self.build_value(cx, *index, &mut tracker)?;
                self.array_index(array, index, span)
            }
            ExprKind::ArrayConcat { left, right } => {
                self.check_static_length(cx, id, span)?;
                let left = self.build_value(cx, *left, &mut tracker)?;
                let right = self.build_value(cx, *right, &mut tracker)?;
                self.array_concat(left, right, span)
            }
            ExprKind::ArrayRepeat { array, count } => {
                self.build_array_repeat(cx, id, *array, *count, span, &mut tracker)?
            }
            ExprKind::Convert { value, target } => {
                let value = self.build_value(cx, *value, &mut tracker)?;
                self.convert(value, target, span)
            }
            ExprKind::Call {
                callee,
                upsample_factor,
                args,
            } => return self.build_call(cx, *callee, *upsample_factor, args, span, tracker),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => return self.build_not(cx, *operand, span, tracker),
            ExprKind::Unary { op, operand } => {
                let operand = self.build_value(cx, *operand, &mut tracker)?;
                self.call_operator(Operator::Unary(*op), vec![operand], span)?
            }
            ExprKind::Binary { op, left, right } if op.is_short_circuit() => {
                return self.build_short_circuit(cx, *op, *left, *right, span, tracker);
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.build_value(cx, *left, &mut tracker)?;
                let right = self.build_value(cx, *right, &mut tracker)?;
                self.call_operator(Operator::Binary(*op), vec![left, right], span)?
            }
            ExprKind::StructValue { path, fields } => {
                self.build_struct_value(cx, path, fields, span, &mut tracker)?
            }
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => return self.build_ternary(cx, *cond, *if_true, *if_false, span, tracker),
        };

        Ok(BuiltExpr::plain(typed, tracker))
    }

    // ── Names ───────────────────────────────────────────────────────

    /// Follow an identifier or a chain of `alias.name` accesses.
    pub(super) fn resolve_path(&self, cx: ExprContext, id: ExprId) -> PathResolution {
        match &self.expr(cx.file, id).kind {
            ExprKind::Identifier(name) => match self.scopes.lookup(cx.scope, *name) {
                Some(reference) => PathResolution::Found(reference),
                None => PathResolution::Unresolved {
                    name: *name,
                    member: false,
                },
            },
            ExprKind::Access { target, member } => match self.resolve_path(cx, *target) {
                PathResolution::Found(Reference::Scope(scope)) => {
                    match self.scopes.lookup_member(scope, *member) {
                        Some(reference) => PathResolution::Found(reference),
                        None => PathResolution::Unresolved {
                            name: *member,
                            member: true,
                        },
                    }
                }
                unresolved @ PathResolution::Unresolved { .. } => unresolved,
                PathResolution::Found(_) | PathResolution::NotAPath => PathResolution::NotAPath,
            },
            _ => PathResolution::NotAPath,
        }
    }

    /// Last name of an identifier or access, for messages.
    pub(super) fn path_name(&self, cx: ExprContext, id: ExprId) -> Option<Name> {
        match self.expr(cx.file, id).kind {
            ExprKind::Identifier(name) | ExprKind::Access { member: name, .. } => Some(name),
            _ => None,
        }
    }

    pub(super) fn report_unresolved(&mut self, name: Name, member: bool, span: Span) {
        if member {
            self.error(
                DiagnosticId::UnresolvedMember,
                span,
                format!("imported scope has no member `{}`", self.name(name)),
            );
        } else {
            self.error(
                DiagnosticId::UnresolvedIdentifier,
                span,
                format!("cannot find `{}` in this scope", self.name(name)),
            );
        }
    }

    fn report_not_a_value(&mut self, reference: &Reference, name: Option<Name>, span: Span) {
        let name = name.map_or("expression", |name| self.name(name));
        let what = match reference {
            Reference::ModuleGroup(_) => "a module",
            Reference::Scope(_) => "an imported scope",
            Reference::Value(_) => return,
        };
        self.error(
            DiagnosticId::NotAValue,
            span,
            format!("`{name}` is {what} and cannot be used as a value"),
        );
    }

    fn build_name(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedExpr, FatalError> {
        let expr = self.expr(cx.file, id);
        let span = expr.span;
        match self.resolve_path(cx, id) {
            PathResolution::Found(Reference::Value(value)) => self.read_value(value, span, tracker),
            PathResolution::Found(reference) => {
                self.report_not_a_value(&reference, self.path_name(cx, id), span);
                Ok(TypedExpr::error(span))
            }
            PathResolution::Unresolved { name, member } => {
                self.report_unresolved(name, member, span);
                Ok(TypedExpr::error(span))
            }
            PathResolution::NotAPath => {
                let ExprKind::Access { target, member } = expr.kind else {
                    return Ok(TypedExpr::error(span));
                };
                let target = self.build_value(cx, target, tracker)?;
                Ok(self.field_access(target, member, span))
            }
        }
    }

    /// Reference a value, resolving a global's initializer first.
    fn value_expr(&mut self, value: ValueId, span: Span) -> Result<TypedExpr, FatalError> {
        if self.decls.value(value).kind == ValueKind::Global {
            let resolved = self.resolve_default(DefaultValueSite::GlobalValue(value))?;
            if resolved.cyclic {
                return Ok(TypedExpr::placeholder(self.decls.value(value).ty, span));
            }
        }
        Ok(TypedExpr::new(
            TypedExprKind::Value(value),
            self.decls.value(value).ty,
            span,
        ))
    }

    fn read_value(
        &mut self,
        value: ValueId,
        span: Span,
        tracker: &ScopeTracker,
    ) -> Result<TypedExpr, FatalError> {
        let typed = self.value_expr(value, span)?;
        self.check_initialized(value, span, tracker);
        Ok(typed)
    }

    /// Report a read of `value` on a path where it may be unassigned.
    pub(super) fn check_initialized(&mut self, value: ValueId, span: Span, tracker: &ScopeTracker) {
        if tracker.is_unreachable() {
            return;
        }
        let state = tracker.value_state(value);
        let (id, verb) = match state {
            InitState::Yes => return,
            InitState::No => (DiagnosticId::ValueNotInitialized, "is"),
            InitState::Maybe => (DiagnosticId::ValueMaybeNotInitialized, "may be"),
        };
        let definition = self.decls.value(value);
        let declared_at = definition.span;
        let message = format!("`{}` {verb} read before it is assigned", self.name(definition.name));
        self.emit(
            Diagnostic::error(id, span)
                .with_message(message)
                .with_label(declared_at, "declared here"),
        );
    }

    // ── Structs and arrays ──────────────────────────────────────────

    pub(super) fn field_access(&mut self, target: TypedExpr, member: Name, span: Span) -> TypedExpr {
        if target.is_error() {
            return TypedExpr::error(span);
        }
        let Some(structure) = target.ty.struct_id().filter(|_| !target.ty.is_array()) else {
            let message = format!(
                "`{}` has no field `{}`; it is not a struct",
                self.type_name(target.ty),
                self.name(member)
            );
            self.error(DiagnosticId::NotAStruct, span, message);
            return TypedExpr::error(span);
        };

        let definition = self.decls.structure(structure);
        let Some(field) = definition.field_index(member) else {
            let message = format!(
                "struct `{}` has no field `{}`",
                self.name(definition.name),
                self.name(member)
            );
            self.error(DiagnosticId::UnresolvedMember, span, message);
            return TypedExpr::error(span);
        };

        let ty = field_type(target.ty, definition.fields[field].ty);
        TypedExpr::new(
            TypedExprKind::FieldAccess {
                target: Box::new(target),
                field,
            },
            ty,
            span,
        )
    }

    pub(super) fn array_index(&mut self, array: TypedExpr, index: TypedExpr, span: Span) -> TypedExpr {
        if array.is_error() || index.is_error() {
            return TypedExpr::error(span);
        }
        if !array.ty.is_array() {
            let message = format!("cannot index `{}`; it is not an array", self.type_name(array.ty));
            self.error(DiagnosticId::NotAnArray, array.span, message);
            return TypedExpr::error(span);
        }
        if !index.ty.is_scalar(PrimitiveType::Int) {
            let message = format!("array index must be `int`, found `{}`", self.type_name(index.ty));
            self.error(DiagnosticId::ArrayIndexNotInt, index.span, message);
            return TypedExpr::error(span);
        }
        if array.ty.is_empty_array() {
            self.error(
                DiagnosticId::IllegalArrayIndexResultType,
                span,
                "cannot index an empty array",
            );
            return TypedExpr::error(span);
        }

        let Some(ty) = narrowed_by(array.ty.element_type(), index.ty) else {
            let message = format!(
                "indexing `{}` with `{}` has no legal result type",
                self.type_name(array.ty),
                self.type_name(index.ty)
            );
            self.error(DiagnosticId::IllegalArrayIndexResultType, span, message);
            return TypedExpr::error(span);
        };
        TypedExpr::new(
            TypedExprKind::ArrayIndex {
                array: Box::new(array),
                index: Box::new(index),
            },
            ty,
            span,
        )
    }

    fn build_array_literal(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        elements: &[ExprId],
        span: Span,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedExpr, FatalError> {
        self.check_static_length(cx, id, span)?;

        let mut built = Vec::with_capacity(elements.len());
        for &element in elements {
            built.push(self.build_value(cx, element, tracker)?);
        }

        let Some(first) = built.first() else {
            return Ok(TypedExpr::new(
                TypedExprKind::ArrayLiteral(built),
                AstDataType::EMPTY_ARRAY,
                span,
            ));
        };

        let common = built[1..]
            .iter()
            .try_fold(first.ty, |common, element| common.common_type(element.ty));
        let ty = match common {
            None => {
                let mut diagnostic = Diagnostic::error(DiagnosticId::ArrayLiteralNoCommonType, span)
                    .with_message("array elements have no common type");
                for element in &built {
                    diagnostic = diagnostic.with_label(element.span, format!("`{}`", self.type_name(element.ty)));
                }
                self.emit(diagnostic);
                AstDataType::ERROR
            }
            Some(common) if common.is_error() => AstDataType::ERROR,
            Some(common) if common.is_array() => {
                self.error(DiagnosticId::IllegalValueType, span, "arrays of arrays are not supported");
                AstDataType::ERROR
            }
            Some(common) => {
                let array = common.array_type();
                match array.illegal_value_reason() {
                    None => array,
                    Some(reason) => {
                        let message = format!(
                            "an array of `{}` is not a legal value type: {reason}",
                            self.type_name(common)
                        );
                        self.error(DiagnosticId::IllegalValueType, span, message);
                        AstDataType::ERROR
                    }
                }
            }
        };

        Ok(TypedExpr::new(TypedExprKind::ArrayLiteral(built), ty, span))
    }

    fn array_concat(&mut self, left: TypedExpr, right: TypedExpr, span: Span) -> TypedExpr {
        if left.is_error() || right.is_error() {
            return TypedExpr::error(span);
        }
        for side in [&left, &right] {
            if !side.ty.is_array() {
                let message = format!("cannot concatenate `{}`; it is not an array", self.type_name(side.ty));
                self.error(DiagnosticId::NotAnArray, side.span, message);
                return TypedExpr::error(span);
            }
        }
        let Some(ty) = left.ty.common_type(right.ty) else {
            let message = format!(
                "cannot concatenate `{}` and `{}`",
                self.type_name(left.ty),
                self.type_name(right.ty)
            );
            self.error(DiagnosticId::ArrayConcatTypeMismatch, span, message);
            return TypedExpr::error(span);
        };
        TypedExpr::new(
            TypedExprKind::ArrayConcat {
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        )
    }

    fn build_array_repeat(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        array: ExprId,
        count: ExprId,
        span: Span,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedExpr, FatalError> {
        let literal_count = self.static_int(cx, count);
        if let Some(n) = literal_count.and_then(|n| u64::try_from(n).ok()) {
            self.check_element_count(n, span)?;
        }
        self.check_static_length(cx, id, span)?;

        let array = self.build_value(cx, array, tracker)?;
        let count = self.build_value(cx, count, tracker)?;
        if array.is_error() || count.is_error() {
            return Ok(TypedExpr::error(span));
        }
        if !array.ty.is_array() {
            let message = format!("cannot repeat `{}`; it is not an array", self.type_name(array.ty));
            self.error(DiagnosticId::NotAnArray, array.span, message);
            return Ok(TypedExpr::error(span));
        }
        if !count.ty.is_scalar(PrimitiveType::Int) || count.ty.mutability() != RuntimeMutability::Constant {
            let message = format!("repeat count must be a `const int`, found `{}`", self.type_name(count.ty));
            self.error(DiagnosticId::ArrayRepeatCountNotConstantInt, count.span, message);
            return Ok(TypedExpr::error(span));
        }
        if let Some(n) = literal_count.filter(|&n| n < 0) {
            self.error(
                DiagnosticId::ArrayRepeatCountNegative,
                count.span,
                format!("repeat count must not be negative, found {n}"),
            );
            return Ok(TypedExpr::error(span));
        }

        let ty = array.ty;
        Ok(TypedExpr::new(
            TypedExprKind::ArrayRepeat {
                array: Box::new(array),
                count: Box::new(count),
            },
            ty,
            span,
        ))
    }

    /// An integer literal, possibly negated.
    fn static_int(&self, cx: ExprContext, id: ExprId) -> Option<i64> {
        match self.expr(cx.file, id).kind {
            ExprKind::Literal(Literal::Int(n)) => Some(n),
            ExprKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => self.static_int(cx, operand)?.checked_neg(),
            _ => None,
        }
    }

    /// Element count of an array expression built only from literals.
    fn static_length(&self, cx: ExprContext, id: ExprId) -> Option<u64> {
        match &self.expr(cx.file, id).kind {
            ExprKind::ArrayLiteral(elements) => u64::try_from(elements.len()).ok(),
            ExprKind::ArrayConcat { left, right } => Some(
                self.static_length(cx, *left)?
                    .saturating_add(self.static_length(cx, *right)?),
            ),
            ExprKind::ArrayRepeat { array, count } => {
                let count = u64::try_from(self.static_int(cx, *count)?).ok()?;
                Some(self.static_length(cx, *array)?.saturating_mul(count))
            }
            _ => None,
        }
    }

    fn check_static_length(&self, cx: ExprContext, id: ExprId, span: Span) -> Result<(), FatalError> {
        match self.static_length(cx, id) {
            Some(count) => self.check_element_count(count, span),
            None => Ok(()),
        }
    }

    fn check_element_count(&self, count: u64, span: Span) -> Result<(), FatalError> {
        let limit = self.config.max_array_element_count;
        if count > u64::try_from(limit).unwrap_or(u64::MAX) {
            tracing::debug!(count, limit, "array element limit exceeded");
            return Err(FatalError::ArrayElementCountExceeded { count, limit, span });
        }
        Ok(())
    }

    // ── Conversions ─────────────────────────────────────────────────

    fn convert(&mut self, value: TypedExpr, target: &ParsedType, span: Span) -> TypedExpr {
        if value.is_error() {
            return TypedExpr::error(span);
        }
        let target_primitive = match target.base {
            ParsedBaseType::Primitive(keyword) if target.mutability.is_none()
                && target.upsample_factor.is_none()
                && !target.is_array =>
            {
                super::signatures::primitive(keyword)
            }
            _ => {
                self.error(
                    DiagnosticId::IllegalConversion,
                    target.span,
                    "conversion target must be a plain primitive type",
                );
                return TypedExpr::error(span);
            }
        };

        let legal = match value.ty.primitive_type() {
            Some(source) if source == target_primitive => true,
            Some(source) => {
                (source.is_numeric() || source == PrimitiveType::Bool) && target_primitive.is_numeric()
            }
            None => false,
        };
        if !legal {
            let message = format!(
                "cannot convert `{}` to `{}`",
                self.type_name(value.ty),
                target_primitive.name()
            );
            self.error(DiagnosticId::IllegalConversion, span, message);
            return TypedExpr::error(span);
        }

        let ty = AstDataType::new(
            value.ty.mutability(),
            DataKind::Primitive(target_primitive),
            value.ty.upsample_factor(),
            value.ty.is_array(),
        );
        TypedExpr::new(TypedExprKind::Convert(Box::new(value)), ty, span)
    }

    // ── Boolean flow ────────────────────────────────────────────────

    /// Report a non-`bool` condition. Returns whether `expr` is a usable bool.
    pub(super) fn require_bool(&mut self, expr: &TypedExpr, context: &str) -> bool {
        if expr.is_error() {
            return false;
        }
        if expr.ty.is_scalar(PrimitiveType::Bool) {
            return true;
        }
        let message = format!("{context} must be `bool`, found `{}`", self.type_name(expr.ty));
        self.error(DiagnosticId::ConditionNotBool, expr.span, message);
        false
    }

    fn build_not(
        &mut self,
        cx: ExprContext,
        operand: ExprId,
        span: Span,
        tracker: ScopeTracker,
    ) -> Result<BuiltExpr, FatalError> {
        let operand = self.build_expr(cx, operand, tracker)?;
        let ty = if self.require_bool(&operand.expr, "operand of `!`") {
            operand.expr.ty
        } else {
            AstDataType::ERROR
        };
        Ok(BuiltExpr {
            expr: TypedExpr::new(TypedExprKind::Not(Box::new(operand.expr)), ty, span),
            when_true: operand.when_false,
            when_false: operand.when_true,
        })
    }

    /// `a && b` evaluates `b` only when `a` is true; `a || b` only when it is false.
    fn build_short_circuit(
        &mut self,
        cx: ExprContext,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        span: Span,
        tracker: ScopeTracker,
    ) -> Result<BuiltExpr, FatalError> {
        let is_and = op == BinaryOp::LogicalAnd;
        let left = self.build_expr(cx, left, tracker)?;
        let right_start = if is_and {
            left.when_true.clone()
        } else {
            left.when_false.clone()
        };
        let right = self.build_expr(cx, right, right_start)?;

        let context = format!("operand of `{}`", op.symbol());
        let left_ok = self.require_bool(&left.expr, &context);
        let right_ok = self.require_bool(&right.expr, &context);
        let ty = if left_ok && right_ok {
            left.expr.ty.common_type(right.expr.ty).unwrap_or_else(|| {
                let message = format!(
                    "operands of `{}` have different upsample factors: `{}` and `{}`",
                    op.symbol(),
                    self.type_name(left.expr.ty),
                    self.type_name(right.expr.ty)
                );
                self.error(DiagnosticId::NoMatchingOperatorOverload, span, message);
                AstDataType::ERROR
            })
        } else {
            AstDataType::ERROR
        };

        let (left_expr, right_expr) = (Box::new(left.expr), Box::new(right.expr));
        if is_and {
            Ok(BuiltExpr {
                expr: TypedExpr::new(
                    TypedExprKind::And {
                        left: left_expr,
                        right: right_expr,
                    },
                    ty,
                    span,
                ),
                when_true: right.when_true,
                when_false: ScopeTracker::union(&[left.when_false, right.when_false]),
            })
        } else {
            Ok(BuiltExpr {
                expr: TypedExpr::new(
                    TypedExprKind::Or {
                        left: left_expr,
                        right: right_expr,
                    },
                    ty,
                    span,
                ),
                when_true: ScopeTracker::union(&[left.when_true, right.when_true]),
                when_false: right.when_false,
            })
        }
    }

    fn build_ternary(
        &mut self,
        cx: ExprContext,
        cond: ExprId,
        if_true: ExprId,
        if_false: ExprId,
        span: Span,
        tracker: ScopeTracker,
    ) -> Result<BuiltExpr, FatalError> {
        let cond = self.build_expr(cx, cond, tracker)?;
        let cond_ok = self.require_bool(&cond.expr, "ternary condition");
        let if_true = self.build_expr(cx, if_true, cond.when_true)?;
        let if_false = self.build_expr(cx, if_false, cond.when_false)?;

        let (true_ty, false_ty) = (if_true.expr.ty, if_false.expr.ty);
        let ty = if !cond_ok || true_ty.is_error() || false_ty.is_error() {
            AstDataType::ERROR
        } else if let Some(ty) = true_ty
            .common_type(false_ty)
            .and_then(|common| narrowed_by(common, cond.expr.ty))
        {
            ty
        } else {
            let message = format!(
                "ternary branches have no common type: `{}` and `{}`",
                self.type_name(true_ty),
                self.type_name(false_ty)
            );
            self.error(DiagnosticId::TernaryNoCommonType, span, message);
            AstDataType::ERROR
        };

        Ok(BuiltExpr {
            expr: TypedExpr::new(
                TypedExprKind::Ternary {
                    cond: Box::new(cond.expr),
                    if_true: Box::new(if_true.expr),
                    if_false: Box::new(if_false.expr),
                },
                ty,
                span,
            ),
            when_true: ScopeTracker::union(&[if_true.when_true, if_false.when_true]),
            when_false: ScopeTracker::union(&[if_true.when_false, if_false.when_false]),
        })
    }

    // ── Struct values ───────────────────────────────────────────────

    fn build_struct_value(
        &mut self,
        cx: ExprContext,
        path: &[Name],
        inits: &'a [FieldInit],
        span: Span,
        tracker: &mut ScopeTracker,
    ) -> Result<TypedExpr, FatalError> {
        let structure = self.scopes.lookup_struct(self.file_scope(cx.file), path);

        let mut values = Vec::with_capacity(inits.len());
        for init in inits {
            values.push(self.build_value(cx, init.value, tracker)?);
        }

        let Some(structure) = structure else {
            let written: Vec<&str> = path.iter().map(|&name| self.name(name)).collect();
            self.error(
                DiagnosticId::UnresolvedType,
                span,
                format!("unknown struct `{}`", written.join(".")),
            );
            return Ok(TypedExpr::error(span));
        };

        let field_count = self.decls.structure(structure).fields.len();
        let mut provided: Vec<Option<TypedExpr>> = vec![None; field_count];
        let mut failed = false;
        for (init, value) in inits.iter().zip(values) {
            let definition = self.decls.structure(structure);
            let struct_name = definition.name;
            let Some(index) = definition.field_index(init.name) else {
                let message = format!(
                    "struct `{}` has no field `{}`",
                    self.name(struct_name),
                    self.name(init.name)
                );
                self.error(DiagnosticId::UnresolvedMember, init.span, message);
                failed = true;
                continue;
            };
            if provided[index].is_some() {
                let message = format!("field `{}` is given more than once", self.name(init.name));
                self.error(DiagnosticId::DuplicateStructValueField, init.span, message);
                failed = true;
                continue;
            }
            let field_ty = definition.fields[index].ty;
            if !value.ty.is_assignable_to(&field_ty) {
                let message = format!(
                    "field `{}` has type `{}`, found `{}`",
                    self.name(init.name),
                    self.type_name(field_ty),
                    self.type_name(value.ty)
                );
                self.error(DiagnosticId::InvalidAssignment, value.span, message);
                failed = true;
            }
            provided[index] = Some(value);
        }

        let mut fields = Vec::with_capacity(field_count);
        let mut missing = Vec::new();
        let mut mutability = RuntimeMutability::Constant;
        for (index, value) in provided.into_iter().enumerate() {
            match value {
                Some(value) => {
                    mutability = mutability.least_constant(value.ty.mutability());
                    fields.push(FieldValue::Provided(value));
                }
                None if self.decls.structure(structure).fields[index].default.is_some() => {
                    let site = DefaultValueSite::StructField {
                        structure,
                        field: u32::try_from(index).unwrap_or(u32::MAX),
                    };
                    let resolved = self.resolve_default(site)?;
                    mutability = mutability.least_constant(resolved.ty.mutability());
                    fields.push(FieldValue::Default(site));
                }
                None => missing.push(self.decls.structure(structure).fields[index].name),
            }
        }

        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|&name| format!("`{}`", self.name(name))).collect();
            let message = format!(
                "missing {} {} in value of struct `{}`",
                if missing.len() == 1 { "field" } else { "fields" },
                names.join(", "),
                self.name(self.decls.structure(structure).name)
            );
            self.error(DiagnosticId::StructValueMissingField, span, message);
            failed = true;
        }
        if failed {
            return Ok(TypedExpr::error(span));
        }

        Ok(TypedExpr::new(
            TypedExprKind::StructValue { structure, fields },
            AstDataType::structure(mutability, structure),
            span,
        ))
    }

    // ── Assignment targets ──────────────────────────────────────────

    /// Build the left side of an assignment or an `out` argument.
    ///
    /// Writing a field or element reads the rest of the root value, so that
    /// root must already be assigned.
    pub(super) fn build_target(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        tracker: &mut ScopeTracker,
    ) -> Result<Target, FatalError> {
        ensure_sufficient_stack(|| self.build_target_inner(cx, id, tracker))
    }

    fn build_target_inner(
        &mut self,
        cx: ExprContext,
        id: ExprId,
        tracker: &mut ScopeTracker,
    ) -> Result<Target, FatalError> {
        let expr = self.expr(cx.file, id);
        let span = expr.span;
        match self.resolve_path(cx, id) {
            PathResolution::Found(Reference::Value(value)) => Ok(Target {
                expr: self.value_expr(value, span)?,
                root: Some(value),
                whole: true,
            }),
            PathResolution::Found(reference) => {
                self.report_not_a_value(&reference, self.path_name(cx, id), span);
                Ok(Target::invalid(span))
            }
            PathResolution::Unresolved { name, member } => {
                self.report_unresolved(name, member, span);
                Ok(Target::invalid(span))
            }
            PathResolution::NotAPath => match expr.kind {
                ExprKind::Access { target, member } => {
                    let inner = self.build_target(cx, target, tracker)?;
                    self.read_whole_root(&inner, tracker);
                    Ok(Target {
                        expr: self.field_access(inner.expr, member, span),
                        root: inner.root,
                        whole: false,
                    })
                }
                ExprKind::ArrayIndex { array, index } => {
                    let inner = self.build_target(cx, array, tracker)?;
                    self.read_whole_root(&inner, tracker);
                    let index = self.build_value(cx, index, tracker)?;
                    Ok(Target {
                        expr: self.array_index(inner.expr, index, span),
                        root: inner.root,
                        whole: false,
                    })
                }
                _ => {
                    self.build_value(cx, id, tracker)?;
                    self.error(
                        DiagnosticId::InvalidAssignmentTarget,
                        span,
                        "this expression cannot be assigned to",
                    );
                    Ok(Target::invalid(span))
                }
            },
        }
    }

    fn read_whole_root(&mut self, target: &Target, tracker: &ScopeTracker) {
        if let (true, Some(root)) = (target.whole, target.root) {
            self.check_initialized(root, target.expr.span, tracker);
        }
    }

    /// Report a write to a value that does not accept assignments.
    pub(super) fn check_writable(&mut self, target: &Target, id: DiagnosticId, span: Span) -> bool {
        let Some(root) = target.root else {
            return false;
        };
        let definition = self.decls.value(root);
        if definition.is_writable() {
            return true;
        }
        let what = match definition.kind {
            ValueKind::Global => "global value",
            ValueKind::LoopValue => "loop value",
            ValueKind::Parameter { .. } => "input parameter",
            ValueKind::Explicit => "value",
        };
        let message = format!("cannot assign to {what} `{}`", self.name(definition.name));
        self.error(id, span, message);
        false
    }
}
