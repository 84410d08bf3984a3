//! `AstDataType`: the type attached to every typed expression and declaration.
//!
//! A type is a mutability, a shape (primitive or struct, or one of the
//! sentinels), an upsample factor and an array flag. It is a small `Copy`
//! value; two types are identical exactly when they compare equal, because
//! construction normalizes the upsample factor of constants to 1.

use std::fmt;

use crate::{PrimitiveType, RuntimeMutability};

/// Handle of a struct definition in the analyzer's declaration arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StructId(u32);

impl StructId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        StructId(raw)
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

/// Shape of a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DataKind {
    /// Placeholder after a reported error; suppresses follow-on diagnostics.
    Error,
    /// Return type of modules without a result.
    Void,
    /// Type of `[]` before it meets a declared array type.
    EmptyArray,
    Primitive(PrimitiveType),
    Struct(StructId),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct AstDataType {
    mutability: RuntimeMutability,
    kind: DataKind,
    upsample_factor: u32,
    is_array: bool,
}

impl AstDataType {
    pub const ERROR: Self = AstDataType {
        mutability: RuntimeMutability::Constant,
        kind: DataKind::Error,
        upsample_factor: 1,
        is_array: false,
    };

    pub const VOID: Self = AstDataType {
        mutability: RuntimeMutability::Constant,
        kind: DataKind::Void,
        upsample_factor: 1,
        is_array: false,
    };

    pub const EMPTY_ARRAY: Self = AstDataType {
        mutability: RuntimeMutability::Constant,
        kind: DataKind::EmptyArray,
        upsample_factor: 1,
        is_array: true,
    };

    /// Build a type. Constants always get upsample factor 1; a zero factor
    /// is treated as 1.
    pub fn new(
        mutability: RuntimeMutability,
        kind: DataKind,
        upsample_factor: u32,
        is_array: bool,
    ) -> Self {
        match kind {
            DataKind::Error => Self::ERROR,
            DataKind::Void => Self::VOID,
            DataKind::EmptyArray => Self::EMPTY_ARRAY,
            DataKind::Primitive(_) | DataKind::Struct(_) => {
                let upsample_factor = if mutability == RuntimeMutability::Constant {
                    1
                } else {
                    upsample_factor.max(1)
                };
                AstDataType {
                    mutability,
                    kind,
                    upsample_factor,
                    is_array,
                }
            }
        }
    }

    pub fn primitive(mutability: RuntimeMutability, primitive: PrimitiveType) -> Self {
        Self::new(mutability, DataKind::Primitive(primitive), 1, false)
    }

    pub fn structure(mutability: RuntimeMutability, id: StructId) -> Self {
        Self::new(mutability, DataKind::Struct(id), 1, false)
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[inline]
    pub fn mutability(&self) -> RuntimeMutability {
        self.mutability
    }

    #[inline]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    #[inline]
    pub fn upsample_factor(&self) -> u32 {
        self.upsample_factor
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind == DataKind::Error
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.kind == DataKind::Void
    }

    #[inline]
    pub fn is_empty_array(&self) -> bool {
        self.kind == DataKind::EmptyArray
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self.kind {
            DataKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn struct_id(&self) -> Option<StructId> {
        match self.kind {
            DataKind::Struct(id) => Some(id),
            _ => None,
        }
    }

    /// `true` for a non-array of the given primitive.
    pub fn is_scalar(&self, primitive: PrimitiveType) -> bool {
        !self.is_array && self.kind == DataKind::Primitive(primitive)
    }

    // ── Derived types ───────────────────────────────────────────────

    #[must_use]
    pub fn with_mutability(self, mutability: RuntimeMutability) -> Self {
        Self::new(mutability, self.kind, self.upsample_factor, self.is_array)
    }

    #[must_use]
    pub fn with_upsample_factor(self, upsample_factor: u32) -> Self {
        Self::new(self.mutability, self.kind, upsample_factor, self.is_array)
    }

    /// Element type of an array type; the error type for anything else.
    #[must_use]
    pub fn element_type(self) -> Self {
        if !self.is_array || self.is_empty_array() {
            return Self::ERROR;
        }
        Self::new(self.mutability, self.kind, self.upsample_factor, false)
    }

    /// Array of this type; sentinels stay unchanged.
    #[must_use]
    pub fn array_type(self) -> Self {
        Self::new(self.mutability, self.kind, self.upsample_factor, true)
    }

    /// Multiply the upsample factor of a non-constant type by `factor`.
    ///
    /// Returns `None` on overflow.
    pub fn upsampled_by(self, factor: u32) -> Option<Self> {
        if self.mutability == RuntimeMutability::Constant || self.is_sentinel() {
            return Some(self);
        }
        let upsample_factor = self.upsample_factor.checked_mul(factor)?;
        Some(self.with_upsample_factor(upsample_factor))
    }

    /// Make the type no more constant than `mutability`.
    ///
    /// Re-validates legality: a combination that is not a legal value type
    /// (for example a runtime string) becomes the error type.
    #[must_use]
    pub fn demoted_to(self, mutability: RuntimeMutability) -> Self {
        if self.is_sentinel() {
            return self;
        }
        let demoted = self.with_mutability(self.mutability.least_constant(mutability));
        if demoted.is_legal_value_type() {
            demoted
        } else {
            Self::ERROR
        }
    }

    fn is_sentinel(&self) -> bool {
        matches!(
            self.kind,
            DataKind::Error | DataKind::Void | DataKind::EmptyArray
        )
    }

    // ── Predicates ──────────────────────────────────────────────────

    /// Structural equality, including mutability and upsample factor.
    #[inline]
    pub fn is_identical_to(&self, other: &Self) -> bool {
        self == other
    }

    /// Whether a value of this type may be stored into `target`.
    ///
    /// The source must be at least as constant as the target, have the same
    /// shape and array-ness, and match the upsample factor unless it is a
    /// constant. The error type is assignable both ways so one mistake does
    /// not cascade.
    pub fn is_assignable_to(&self, target: &Self) -> bool {
        if self.is_error() || target.is_error() {
            return true;
        }
        if self.is_void() || target.is_void() {
            return false;
        }
        if self.is_empty_array() {
            return target.is_array;
        }
        if self.kind != target.kind || self.is_array != target.is_array {
            return false;
        }
        if self.mutability > target.mutability {
            return false;
        }
        self.mutability == RuntimeMutability::Constant
            || self.upsample_factor == target.upsample_factor
    }

    /// Why this type may not be used for a value, or `None` if it may.
    pub fn illegal_value_reason(&self) -> Option<&'static str> {
        match self.kind {
            DataKind::Error => Some("type contains errors"),
            DataKind::Void => Some("void is not a value type"),
            DataKind::EmptyArray => Some("the element type of an empty array cannot be inferred"),
            DataKind::Primitive(PrimitiveType::String)
                if self.mutability != RuntimeMutability::Constant =>
            {
                Some("strings must be compile-time constants")
            }
            DataKind::Primitive(_) | DataKind::Struct(_)
                if self.is_array
                    && self.mutability != RuntimeMutability::Constant
                    && self.upsample_factor > 1 =>
            {
                Some("runtime arrays cannot be upsampled")
            }
            DataKind::Primitive(_) | DataKind::Struct(_) => None,
        }
    }

    pub fn is_legal_value_type(&self) -> bool {
        self.illegal_value_reason().is_none()
    }

    pub fn is_legal_parameter_type(&self) -> bool {
        self.is_legal_value_type()
    }

    pub fn is_legal_return_type(&self) -> bool {
        self.is_void() || self.is_legal_value_type()
    }

    /// Smallest type both operands are assignable to, if any.
    ///
    /// Used for array literal elements and ternary branches.
    pub fn common_type(self, other: Self) -> Option<Self> {
        if self.is_error() || other.is_error() {
            return Some(Self::ERROR);
        }
        if self.is_empty_array() {
            return other.is_array.then_some(other);
        }
        if other.is_empty_array() {
            return self.is_array.then_some(self);
        }
        if self.is_void() || other.is_void() {
            return None;
        }
        if self.kind != other.kind || self.is_array != other.is_array {
            return None;
        }

        let mutability = self.mutability.least_constant(other.mutability);
        let upsample_factor = match (
            self.mutability == RuntimeMutability::Constant,
            other.mutability == RuntimeMutability::Constant,
        ) {
            (true, true) => 1,
            (true, false) => other.upsample_factor,
            (false, true) => self.upsample_factor,
            (false, false) if self.upsample_factor == other.upsample_factor => self.upsample_factor,
            (false, false) => return None,
        };
        Some(Self::new(mutability, self.kind, upsample_factor, self.is_array))
    }

    /// Render with struct names supplied by the caller.
    pub fn display<F>(&self, struct_name: F) -> DataTypeDisplay<F>
    where
        F: Fn(StructId) -> String,
    {
        DataTypeDisplay {
            ty: *self,
            struct_name,
        }
    }
}

/// `Display` adapter returned by [`AstDataType::display`].
pub struct DataTypeDisplay<F> {
    ty: AstDataType,
    struct_name: F,
}

impl<F> fmt::Display for DataTypeDisplay<F>
where
    F: Fn(StructId) -> String,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = &self.ty;
        match ty.kind {
            DataKind::Error => return f.write_str("<error>"),
            DataKind::Void => return f.write_str("void"),
            DataKind::EmptyArray => return f.write_str("[]"),
            DataKind::Primitive(_) | DataKind::Struct(_) => {}
        }

        let qualifier = ty.mutability.qualifier();
        if !qualifier.is_empty() {
            write!(f, "{qualifier} ")?;
        }
        match ty.kind {
            DataKind::Primitive(p) => f.write_str(p.name())?,
            DataKind::Struct(id) => f.write_str(&(self.struct_name)(id))?,
            DataKind::Error | DataKind::Void | DataKind::EmptyArray => {}
        }
        if ty.upsample_factor > 1 {
            write!(f, "@{}x", ty.upsample_factor)?;
        }
        if ty.is_array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}
