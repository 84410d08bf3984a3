//! Type syntax as written in source.

use crate::{Name, Span};

/// Mutability qualifier written before a type.
///
/// No qualifier means the value is only known at runtime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MutabilityQualifier {
    /// `const`
    Const,
    /// `const?`
    DependentConst,
}

/// Built-in type keywords.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKeyword {
    Float,
    Double,
    Int,
    Bool,
    String,
}

impl TypeKeyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            TypeKeyword::Float => "float",
            TypeKeyword::Double => "double",
            TypeKeyword::Int => "int",
            TypeKeyword::Bool => "bool",
            TypeKeyword::String => "string",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ParsedBaseType {
    Void,
    Primitive(TypeKeyword),
    /// Struct name, optionally qualified by import aliases (`fx.Biquad`).
    Named(Vec<Name>),
}

/// `[const|const?] base[@Nx][[]]`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParsedType {
    pub mutability: Option<MutabilityQualifier>,
    pub base: ParsedBaseType,
    pub upsample_factor: Option<u32>,
    pub is_array: bool,
    pub span: Span,
}

impl ParsedType {
    pub fn void(span: Span) -> Self {
        ParsedType {
            mutability: None,
            base: ParsedBaseType::Void,
            upsample_factor: None,
            is_array: false,
            span,
        }
    }

    pub fn primitive(mutability: Option<MutabilityQualifier>, keyword: TypeKeyword, span: Span) -> Self {
        ParsedType {
            mutability,
            base: ParsedBaseType::Primitive(keyword),
            upsample_factor: None,
            is_array: false,
            span,
        }
    }

    #[must_use]
    pub fn with_upsample_factor(mut self, factor: u32) -> Self {
        self.upsample_factor = Some(factor);
        self
    }

    #[must_use]
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn is_void(&self) -> bool {
        matches!(self.base, ParsedBaseType::Void)
    }
}
