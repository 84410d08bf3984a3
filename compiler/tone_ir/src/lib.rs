//! Tone IR - parse tree and source primitives.
//!
//! This crate contains the data the semantic analyzer reads:
//! - Spans for source locations
//! - Names for interned identifiers
//! - The parse tree (items, statements, flat expression arena)
//! - `TreeBuilder` for constructing trees without source text
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: identifiers and string literals are `Name(u32)`
//! - **Flatten Expressions**: children are `ExprId(u32)` indices, not boxes
//! - **Immutable Input**: nothing downstream mutates a `SourceFile`

mod arena;
pub mod ast;
mod builder;
mod interner;
mod name;
mod span;

pub use arena::{ExprArena, ExprId};
pub use ast::{
    BinaryOp, Block, CallArg, Expr, ExprKind, FieldDecl, FieldInit, ImportDecl, Item, Literal,
    ModuleDecl, MutabilityQualifier, ParamDecl, ParamDirection, ParsedBaseType, ParsedType,
    SourceFile, Stmt, StmtKind, StructDecl, TypeKeyword, UnaryOp, ValueDecl,
};
pub use builder::TreeBuilder;
pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use span::Span;
