//! Declaration arena.
//!
//! Every declaration the analyzer knows about (values, modules, module
//! parameters, structs) is stored once here and referred to by a small
//! integer handle. Flow tracking and memo tables key on these handles, so two
//! declarations with the same name (shadowing, overloads) never collide.

use std::fmt;

use tone_ir::{ExprId, Name, ParamDirection, Span};
use tone_types::{AstDataType, RuntimeMutability, StructId};

use crate::native::Operator;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of a source file in the compilation unit.
    FileId
);
define_id!(
    /// Handle of a [`Scope`](crate::scope::Scope).
    ScopeId
);
define_id!(
    /// Handle of a [`ValueDefinition`].
    ValueId
);
define_id!(
    /// Handle of a [`ModuleDefinition`].
    ModuleId
);
define_id!(
    /// Handle of a [`ModuleParameter`].
    ParamId
);

fn next_id(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("declaration arena exceeded u32::MAX entries"))
}

/// What introduced a value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueKind {
    /// `val` statement inside a module body.
    Explicit,
    /// `val` at file level; always a compile-time constant.
    Global,
    /// A module parameter as seen from inside the module body.
    Parameter {
        param: ParamId,
        direction: ParamDirection,
    },
    /// The iteration value of a `for` loop.
    LoopValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValueDefinition {
    pub name: Name,
    pub kind: ValueKind,
    /// Declared or inferred type. Global values start out as the error type
    /// and are filled in when their initializer is resolved.
    pub ty: AstDataType,
    pub span: Span,
    /// Scope the value was declared in.
    pub scope: ScopeId,
}

impl ValueDefinition {
    /// Whether assignments to this value are allowed.
    pub fn is_writable(&self) -> bool {
        match self.kind {
            ValueKind::Explicit => true,
            ValueKind::Parameter { direction, .. } => direction == ParamDirection::Out,
            ValueKind::Global | ValueKind::LoopValue => false,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ModuleKind {
    /// Declared in source with a body.
    Script { file: FileId },
    /// Supplied by the native module registry, callable by name.
    Native,
    /// Supplied by the native module registry, reached through operator syntax.
    Operator(Operator),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModuleDefinition {
    pub name: Name,
    /// Printable name; differs from `name` for operator modules.
    pub display_name: String,
    pub kind: ModuleKind,
    pub params: Vec<ParamId>,
    pub return_type: AstDataType,
    pub span: Span,
    /// Scope the module was declared in. Default values are resolved here.
    pub scope: ScopeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModuleParameter {
    pub module: ModuleId,
    pub direction: ParamDirection,
    pub name: Name,
    pub ty: AstDataType,
    /// Default-value expression in the module's file.
    pub default: Option<ExprId>,
    pub span: Span,
    /// The value standing for this parameter inside the module body.
    pub value: Option<ValueId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    pub name: Name,
    pub ty: AstDataType,
    pub default: Option<ExprId>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDefinition {
    pub name: Name,
    pub file: FileId,
    /// File-level scope the struct was declared in.
    pub scope: ScopeId,
    pub fields: Vec<StructField>,
    pub span: Span,
}

impl StructDefinition {
    pub fn field_index(&self, name: Name) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// Owner of all declarations of one compilation unit.
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    values: Vec<ValueDefinition>,
    modules: Vec<ModuleDefinition>,
    params: Vec<ModuleParameter>,
    structs: Vec<StructDefinition>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Values ──────────────────────────────────────────────────────

    pub fn add_value(&mut self, value: ValueDefinition) -> ValueId {
        let id = ValueId(next_id(self.values.len()));
        self.values.push(value);
        id
    }

    #[inline]
    pub fn value(&self, id: ValueId) -> &ValueDefinition {
        &self.values[id.index()]
    }

    #[inline]
    pub fn value_mut(&mut self, id: ValueId) -> &mut ValueDefinition {
        &mut self.values[id.index()]
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Drop every value added after there were `len`.
    pub fn truncate_values(&mut self, len: usize) {
        self.values.truncate(len);
    }

    // ── Modules ─────────────────────────────────────────────────────

    pub fn add_module(&mut self, module: ModuleDefinition) -> ModuleId {
        let id = ModuleId(next_id(self.modules.len()));
        self.modules.push(module);
        id
    }

    #[inline]
    pub fn module(&self, id: ModuleId) -> &ModuleDefinition {
        &self.modules[id.index()]
    }

    #[inline]
    pub fn module_mut(&mut self, id: ModuleId) -> &mut ModuleDefinition {
        &mut self.modules[id.index()]
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(|index| ModuleId(next_id(index)))
    }

    /// Whether any parameter or the return type is dependent-constant.
    pub fn is_dependent_constant(&self, id: ModuleId) -> bool {
        let module = self.module(id);
        module.return_type.mutability() == RuntimeMutability::DependentConstant
            || module.params.iter().any(|&param| {
                self.param(param).ty.mutability() == RuntimeMutability::DependentConstant
            })
    }

    // ── Parameters ──────────────────────────────────────────────────

    /// Append a parameter to `module`'s parameter list.
    pub fn add_param(&mut self, param: ModuleParameter) -> ParamId {
        let id = ParamId(next_id(self.params.len()));
        let module = param.module;
        self.params.push(param);
        self.modules[module.index()].params.push(id);
        id
    }

    #[inline]
    pub fn param(&self, id: ParamId) -> &ModuleParameter {
        &self.params[id.index()]
    }

    #[inline]
    pub fn param_mut(&mut self, id: ParamId) -> &mut ModuleParameter {
        &mut self.params[id.index()]
    }

    // ── Structs ─────────────────────────────────────────────────────

    pub fn add_struct(&mut self, definition: StructDefinition) -> StructId {
        let id = StructId::from_raw(next_id(self.structs.len()));
        self.structs.push(definition);
        id
    }

    #[inline]
    pub fn structure(&self, id: StructId) -> &StructDefinition {
        &self.structs[id.index()]
    }

    #[inline]
    pub fn structure_mut(&mut self, id: StructId) -> &mut StructDefinition {
        &mut self.structs[id.index()]
    }

    pub fn struct_ids(&self) -> impl Iterator<Item = StructId> + '_ {
        (0..self.structs.len()).map(|index| StructId::from_raw(next_id(index)))
    }
}
