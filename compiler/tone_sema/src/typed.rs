//! Typed AST produced by the analyzer.
//!
//! Every expression carries its final [`AstDataType`]; names are resolved to
//! declaration handles and module calls to one concrete overload with its
//! upsample factor and dependent-constant mutability fixed.

use rustc_hash::FxHashMap;
use tone_ir::{Literal, Span};
use tone_types::{AstDataType, RuntimeMutability, StructId};

use crate::decl::{ModuleId, ParamId, ValueId};
use crate::defaults::DefaultValueSite;

#[derive(Clone, Debug, PartialEq)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: AstDataType,
    pub span: Span,
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, ty: AstDataType, span: Span) -> Self {
        TypedExpr { kind, ty, span }
    }

    /// Stand-in after a reported error.
    pub fn error(span: Span) -> Self {
        TypedExpr::new(TypedExprKind::Error, AstDataType::ERROR, span)
    }

    /// Type-preserving stand-in for a value that could not be built.
    pub fn placeholder(ty: AstDataType, span: Span) -> Self {
        TypedExpr::new(TypedExprKind::Placeholder, ty, span)
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedExprKind {
    Error,
    /// Stands in for a cyclic default value.
    Placeholder,
    Literal(Literal),
    Value(ValueId),
    FieldAccess {
        target: Box<TypedExpr>,
        field: usize,
    },
    ArrayLiteral(Vec<TypedExpr>),
    ArrayIndex {
        array: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    ArrayConcat {
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    ArrayRepeat {
        array: Box<TypedExpr>,
        count: Box<TypedExpr>,
    },
    Convert(Box<TypedExpr>),
    ModuleCall(Box<ModuleCall>),
    Not(Box<TypedExpr>),
    And {
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    Or {
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    StructValue {
        structure: StructId,
        /// One entry per field, in declaration order.
        fields: Vec<FieldValue>,
    },
    Ternary {
        cond: Box<TypedExpr>,
        if_true: Box<TypedExpr>,
        if_false: Box<TypedExpr>,
    },
}

/// A fully resolved module call.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleCall {
    pub module: ModuleId,
    pub upsample_factor: u32,
    /// What every dependent-constant parameter and the return type became.
    pub dependent_constant_mutability: RuntimeMutability,
    /// One entry per parameter, in parameter order.
    pub arguments: Vec<CallArgument>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallArgument {
    pub param: ParamId,
    /// Parameter type after upsample and dependent-constant resolution.
    pub resolved_type: AstDataType,
    pub value: ArgumentValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentValue {
    In(TypedExpr),
    /// Assignment target receiving an output parameter.
    Out(TypedExpr),
    /// The parameter's default value, stored once under its site.
    Default(DefaultValueSite),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Provided(TypedExpr),
    Default(DefaultValueSite),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedStmt {
    pub kind: TypedStmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedStmtKind {
    Value {
        value: ValueId,
        init: Option<TypedExpr>,
    },
    /// Compound assignments are lowered to `target = op(target, value)`.
    Assign {
        target: TypedExpr,
        value: TypedExpr,
    },
    Expr(TypedExpr),
    If {
        cond: TypedExpr,
        then_block: TypedBlock,
        else_block: Option<TypedBlock>,
    },
    For {
        value: ValueId,
        iterable: TypedExpr,
        body: TypedBlock,
    },
    Break,
    Continue,
    Return(Option<TypedExpr>),
    Block(TypedBlock),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypedBlock {
    pub stmts: Vec<TypedStmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypedModuleBody {
    pub module: ModuleId,
    pub body: TypedBlock,
}

/// Everything the graph builder consumes.
#[derive(Clone, Debug, Default)]
pub struct TypedProgram {
    /// Global value initializers, struct-field and parameter defaults.
    pub defaults: FxHashMap<DefaultValueSite, TypedExpr>,
    /// Script module bodies, in declaration order.
    pub modules: Vec<TypedModuleBody>,
}

impl TypedProgram {
    pub fn default_value(&self, site: DefaultValueSite) -> Option<&TypedExpr> {
        self.defaults.get(&site)
    }

    pub fn global_value(&self, value: ValueId) -> Option<&TypedExpr> {
        self.default_value(DefaultValueSite::GlobalValue(value))
    }

    pub fn module_body(&self, module: ModuleId) -> Option<&TypedModuleBody> {
        self.modules.iter().find(|body| body.module == module)
    }
}
