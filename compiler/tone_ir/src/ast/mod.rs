//! Parse tree consumed by the semantic analyzer.
//!
//! The tree is produced by the parser (or built programmatically with
//! [`TreeBuilder`](crate::TreeBuilder)) and is never mutated afterwards.
//! Statements and items own their children; expressions live in the file's
//! [`ExprArena`] and are referenced by [`ExprId`].

mod expr;
mod operators;
mod types;

pub use expr::{CallArg, Expr, ExprKind, FieldInit, Literal};
pub use operators::{BinaryOp, UnaryOp};
pub use types::{MutabilityQualifier, ParsedBaseType, ParsedType, TypeKeyword};

use crate::{ExprArena, ExprId, Name, Span};

/// Direction of a module parameter or call argument.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ParamDirection {
    In,
    Out,
}

impl ParamDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            ParamDirection::In => "in",
            ParamDirection::Out => "out",
        }
    }
}

/// One parsed source file.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    /// Path other files use to import this one.
    pub path: Name,
    pub items: Vec<Item>,
    pub arena: ExprArena,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Import(ImportDecl),
    Module(ModuleDecl),
    Struct(StructDecl),
    Value(ValueDecl),
}

/// `import "path" [as alias];`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ImportDecl {
    pub path: Name,
    pub alias: Option<Name>,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ModuleDecl {
    pub name: Name,
    pub params: Vec<ParamDecl>,
    pub return_type: ParsedType,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParamDecl {
    pub direction: ParamDirection,
    pub name: Name,
    pub ty: ParsedType,
    pub default: Option<ExprId>,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructDecl {
    pub name: Name,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: ParsedType,
    pub default: Option<ExprId>,
    pub span: Span,
}

/// `val name[: type] [= init];`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ValueDecl {
    pub name: Name,
    pub ty: Option<ParsedType>,
    pub init: Option<ExprId>,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum StmtKind {
    Value(ValueDecl),
    /// `target = value` or `target op= value`.
    Assign {
        target: ExprId,
        op: Option<BinaryOp>,
        value: ExprId,
    },
    Expr(ExprId),
    If {
        cond: ExprId,
        then_block: Block,
        else_block: Option<Block>,
    },
    /// `for (val x in iterable) body`
    For {
        value: ValueDecl,
        iterable: ExprId,
        body: Block,
    },
    Break,
    Continue,
    Return(Option<ExprId>),
    Block(Block),
}
