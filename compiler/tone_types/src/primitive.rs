use std::fmt;

/// Built-in scalar types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrimitiveType {
    Float,
    Double,
    Int,
    Bool,
    String,
}

impl PrimitiveType {
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Int => "int",
            PrimitiveType::Bool => "bool",
            PrimitiveType::String => "string",
        }
    }

    #[inline]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::Int
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
