//! Expression nodes.

use crate::{ExprId, Name, Span};

use super::{BinaryOp, ParamDirection, ParsedType, UnaryOp};

/// Literal values.
///
/// Floating-point payloads are stored as bits so the tree stays `Eq + Hash`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Literal {
    Float(u32),
    Double(u64),
    Int(i64),
    Bool(bool),
    String(Name),
}

impl Literal {
    pub fn float(value: f32) -> Self {
        Literal::Float(value.to_bits())
    }

    pub fn double(value: f64) -> Self {
        Literal::Double(value.to_bits())
    }
}

/// A call argument as written: `[out] [name =] value`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CallArg {
    pub direction: ParamDirection,
    pub name: Option<Name>,
    pub value: ExprId,
    pub span: Span,
}

/// `name = value` inside a struct value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldInit {
    pub name: Name,
    pub value: ExprId,
    pub span: Span,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Name),
    /// `target.member`: a struct field or a name inside an imported scope.
    Access {
        target: ExprId,
        member: Name,
    },
    ArrayLiteral(Vec<ExprId>),
    ArrayIndex {
        array: ExprId,
        index: ExprId,
    },
    ArrayConcat {
        left: ExprId,
        right: ExprId,
    },
    ArrayRepeat {
        array: ExprId,
        count: ExprId,
    },
    Convert {
        value: ExprId,
        target: ParsedType,
    },
    /// `callee[@Nx](args)`
    Call {
        callee: ExprId,
        upsample_factor: Option<u32>,
        args: Vec<CallArg>,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// `Path { field = value, ... }`
    StructValue {
        path: Vec<Name>,
        fields: Vec<FieldInit>,
    },
    Ternary {
        cond: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}
