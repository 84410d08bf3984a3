//! Programmatic construction of parse trees.
//!
//! Embedders that already hold a syntax tree from another front end, and the
//! analyzer's own tests, build [`SourceFile`]s through this API instead of
//! going through source text. Every node gets a fresh, strictly increasing
//! span so diagnostics sort in construction order.

use crate::ast::{
    BinaryOp, Block, CallArg, Expr, ExprKind, FieldDecl, FieldInit, ImportDecl, Item, Literal,
    ModuleDecl, MutabilityQualifier, ParamDecl, ParamDirection, ParsedBaseType, ParsedType,
    SourceFile, Stmt, StmtKind, StructDecl, TypeKeyword, UnaryOp, ValueDecl,
};
use crate::{ExprArena, ExprId, Name, Span, StringInterner};

/// Builder for a single [`SourceFile`].
pub struct TreeBuilder<'i> {
    interner: &'i StringInterner,
    path: Name,
    arena: ExprArena,
    items: Vec<Item>,
    next_offset: u32,
}

impl<'i> TreeBuilder<'i> {
    pub fn new(interner: &'i StringInterner, path: &str) -> Self {
        TreeBuilder {
            interner,
            path: interner.intern(path),
            arena: ExprArena::new(),
            items: Vec::new(),
            next_offset: 0,
        }
    }

    /// Continue numbering spans after `offset` (keeps spans of several files apart).
    #[must_use]
    pub fn starting_at(mut self, offset: u32) -> Self {
        self.next_offset = offset;
        self
    }

    fn span(&mut self) -> Span {
        let start = self.next_offset;
        self.next_offset += 1;
        Span::new(start, start + 1)
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Current position; spans allocated afterwards start at or after it.
    pub fn offset(&self) -> u32 {
        self.next_offset
    }

    // ── Types ───────────────────────────────────────────────────────

    /// Parse type syntax: `[const|const?] (void|float|double|int|bool|string|A.B)[@Nx][[]]`.
    ///
    /// # Panics
    /// Panics on malformed type text.
    pub fn ty(&mut self, text: &str) -> ParsedType {
        let span = self.span();
        let mut rest = text.trim();
        let mut mutability = None;
        if let Some(after) = rest.strip_prefix("const?") {
            mutability = Some(MutabilityQualifier::DependentConst);
            rest = after.trim_start();
        } else if let Some(after) = rest.strip_prefix("const ") {
            mutability = Some(MutabilityQualifier::Const);
            rest = after.trim_start();
        }

        let mut is_array = false;
        if let Some(before) = rest.strip_suffix("[]") {
            is_array = true;
            rest = before.trim_end();
        }

        let mut upsample_factor = None;
        if let Some((base, factor)) = rest.split_once('@') {
            let digits = factor.trim().trim_end_matches('x');
            let value = digits
                .parse::<u32>()
                .unwrap_or_else(|_| panic!("malformed upsample factor in type `{text}`"));
            upsample_factor = Some(value);
            rest = base.trim_end();
        }

        let base = match rest {
            "void" => ParsedBaseType::Void,
            "float" => ParsedBaseType::Primitive(TypeKeyword::Float),
            "double" => ParsedBaseType::Primitive(TypeKeyword::Double),
            "int" => ParsedBaseType::Primitive(TypeKeyword::Int),
            "bool" => ParsedBaseType::Primitive(TypeKeyword::Bool),
            "string" => ParsedBaseType::Primitive(TypeKeyword::String),
            "" => panic!("empty type in `{text}`"),
            path => ParsedBaseType::Named(path.split('.').map(|part| self.name(part)).collect()),
        };

        ParsedType {
            mutability,
            base,
            upsample_factor,
            is_array,
            span,
        }
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.span();
        self.arena.alloc(Expr::new(kind, span))
    }

    pub fn float(&mut self, value: f32) -> ExprId {
        self.expr(ExprKind::Literal(Literal::float(value)))
    }

    pub fn double(&mut self, value: f64) -> ExprId {
        self.expr(ExprKind::Literal(Literal::double(value)))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn bool(&mut self, value: bool) -> ExprId {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        let name = self.name(value);
        self.expr(ExprKind::Literal(Literal::String(name)))
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        let name = self.name(name);
        self.expr(ExprKind::Identifier(name))
    }

    pub fn access(&mut self, target: ExprId, member: &str) -> ExprId {
        let member = self.name(member);
        self.expr(ExprKind::Access { target, member })
    }

    pub fn array(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::ArrayLiteral(elements))
    }

    pub fn index(&mut self, array: ExprId, index: ExprId) -> ExprId {
        self.expr(ExprKind::ArrayIndex { array, index })
    }

    pub fn concat(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::ArrayConcat { left, right })
    }

    pub fn repeat(&mut self, array: ExprId, count: ExprId) -> ExprId {
        self.expr(ExprKind::ArrayRepeat { array, count })
    }

    pub fn convert(&mut self, value: ExprId, target: &str) -> ExprId {
        let target = self.ty(target);
        self.expr(ExprKind::Convert { value, target })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, left, right })
    }

    pub fn and(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::LogicalAnd, left, right)
    }

    pub fn or(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.binary(BinaryOp::LogicalOr, left, right)
    }

    pub fn not(&mut self, operand: ExprId) -> ExprId {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn ternary(&mut self, cond: ExprId, if_true: ExprId, if_false: ExprId) -> ExprId {
        self.expr(ExprKind::Ternary {
            cond,
            if_true,
            if_false,
        })
    }

    /// `Path { name = value, ... }`; `path` may be dotted.
    pub fn struct_value(&mut self, path: &str, fields: Vec<(&str, ExprId)>) -> ExprId {
        let path = path.split('.').map(|part| self.name(part)).collect();
        let fields = fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: self.name(name),
                value,
                span: self.span(),
            })
            .collect();
        self.expr(ExprKind::StructValue { path, fields })
    }

    // ── Calls ───────────────────────────────────────────────────────

    /// Positional input argument.
    pub fn arg(&mut self, value: ExprId) -> CallArg {
        CallArg {
            direction: ParamDirection::In,
            name: None,
            value,
            span: self.span(),
        }
    }

    /// Named input argument.
    pub fn named(&mut self, name: &str, value: ExprId) -> CallArg {
        CallArg {
            direction: ParamDirection::In,
            name: Some(self.name(name)),
            value,
            span: self.span(),
        }
    }

    /// Positional output argument.
    pub fn out(&mut self, value: ExprId) -> CallArg {
        CallArg {
            direction: ParamDirection::Out,
            name: None,
            value,
            span: self.span(),
        }
    }

    /// Named output argument.
    pub fn out_named(&mut self, name: &str, value: ExprId) -> CallArg {
        CallArg {
            direction: ParamDirection::Out,
            name: Some(self.name(name)),
            value,
            span: self.span(),
        }
    }

    /// Call a module by (possibly dotted) name.
    pub fn call(&mut self, callee: &str, args: Vec<CallArg>) -> ExprId {
        let callee = self.callee(callee);
        self.expr(ExprKind::Call {
            callee,
            upsample_factor: None,
            args,
        })
    }

    /// Call with an explicit upsample factor (`callee@Nx(...)`).
    pub fn call_upsampled(&mut self, callee: &str, factor: u32, args: Vec<CallArg>) -> ExprId {
        let callee = self.callee(callee);
        self.expr(ExprKind::Call {
            callee,
            upsample_factor: Some(factor),
            args,
        })
    }

    fn callee(&mut self, path: &str) -> ExprId {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        let mut target = self.ident(first);
        for part in parts {
            target = self.access(target, part);
        }
        target
    }

    // ── Statements ──────────────────────────────────────────────────

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let span = self.span();
        Stmt { kind, span }
    }

    pub fn value_decl(&mut self, name: &str, ty: Option<&str>, init: Option<ExprId>) -> ValueDecl {
        let ty = ty.map(|text| self.ty(text));
        ValueDecl {
            name: self.name(name),
            ty,
            init,
            span: self.span(),
        }
    }

    /// `val name[: ty] [= init];`
    pub fn val(&mut self, name: &str, ty: Option<&str>, init: Option<ExprId>) -> Stmt {
        let decl = self.value_decl(name, ty, init);
        self.stmt(StmtKind::Value(decl))
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> Stmt {
        self.stmt(StmtKind::Assign {
            target,
            op: None,
            value,
        })
    }

    pub fn compound_assign(&mut self, op: BinaryOp, target: ExprId, value: ExprId) -> Stmt {
        self.stmt(StmtKind::Assign {
            target,
            op: Some(op),
            value,
        })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        Block {
            stmts,
            span: self.span(),
        }
    }

    pub fn block_stmt(&mut self, stmts: Vec<Stmt>) -> Stmt {
        let block = self.block(stmts);
        self.stmt(StmtKind::Block(block))
    }

    pub fn if_stmt(&mut self, cond: ExprId, then_stmts: Vec<Stmt>, else_stmts: Option<Vec<Stmt>>) -> Stmt {
        let then_block = self.block(then_stmts);
        let else_block = else_stmts.map(|stmts| self.block(stmts));
        self.stmt(StmtKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn for_stmt(&mut self, name: &str, ty: Option<&str>, iterable: ExprId, body: Vec<Stmt>) -> Stmt {
        let value = self.value_decl(name, ty, None);
        let body = self.block(body);
        self.stmt(StmtKind::For {
            value,
            iterable,
            body,
        })
    }

    pub fn break_stmt(&mut self) -> Stmt {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_stmt(&mut self) -> Stmt {
        self.stmt(StmtKind::Continue)
    }

    pub fn return_stmt(&mut self, value: Option<ExprId>) -> Stmt {
        self.stmt(StmtKind::Return(value))
    }

    // ── Items ───────────────────────────────────────────────────────

    pub fn param(&mut self, name: &str, ty: &str, default: Option<ExprId>) -> ParamDecl {
        let ty = self.ty(ty);
        ParamDecl {
            direction: ParamDirection::In,
            name: self.name(name),
            ty,
            default,
            span: self.span(),
        }
    }

    pub fn out_param(&mut self, name: &str, ty: &str) -> ParamDecl {
        let ty = self.ty(ty);
        ParamDecl {
            direction: ParamDirection::Out,
            name: self.name(name),
            ty,
            default: None,
            span: self.span(),
        }
    }

    pub fn field(&mut self, name: &str, ty: &str, default: Option<ExprId>) -> FieldDecl {
        let ty = self.ty(ty);
        FieldDecl {
            name: self.name(name),
            ty,
            default,
            span: self.span(),
        }
    }

    pub fn import(&mut self, path: &str, alias: Option<&str>) {
        let decl = ImportDecl {
            path: self.name(path),
            alias: alias.map(|alias| self.name(alias)),
            span: self.span(),
        };
        self.items.push(Item::Import(decl));
    }

    pub fn module(&mut self, name: &str, params: Vec<ParamDecl>, return_type: &str, body: Vec<Stmt>) {
        let return_type = self.ty(return_type);
        let body = self.block(body);
        let decl = ModuleDecl {
            name: self.name(name),
            params,
            return_type,
            body,
            span: self.span(),
        };
        self.items.push(Item::Module(decl));
    }

    pub fn struct_decl(&mut self, name: &str, fields: Vec<FieldDecl>) {
        let decl = StructDecl {
            name: self.name(name),
            fields,
            span: self.span(),
        };
        self.items.push(Item::Struct(decl));
    }

    pub fn global(&mut self, name: &str, ty: Option<&str>, init: Option<ExprId>) {
        let decl = self.value_decl(name, ty, init);
        self.items.push(Item::Value(decl));
    }

    pub fn finish(self) -> SourceFile {
        SourceFile {
            path: self.path,
            items: self.items,
            arena: self.arena,
        }
    }
}
