//! Runtime mutability: how early a value is known.

use std::fmt;

/// Totally ordered: `Constant < DependentConstant < Variable`.
///
/// - `Constant`: known at compile time.
/// - `DependentConstant`: polymorphic over call sites; becomes whatever the
///   least constant bound argument is. Never survives into a resolved call.
/// - `Variable`: known only at runtime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Default)]
pub enum RuntimeMutability {
    #[default]
    Constant,
    DependentConstant,
    Variable,
}

impl RuntimeMutability {
    /// The less constant of the two (the lattice join).
    #[inline]
    #[must_use]
    pub fn least_constant(self, other: Self) -> Self {
        self.max(other)
    }

    /// The more constant of the two (the lattice meet).
    #[inline]
    #[must_use]
    pub fn most_constant(self, other: Self) -> Self {
        self.min(other)
    }

    /// Source qualifier, empty for `Variable`.
    pub const fn qualifier(self) -> &'static str {
        match self {
            RuntimeMutability::Constant => "const",
            RuntimeMutability::DependentConstant => "const?",
            RuntimeMutability::Variable => "",
        }
    }
}

impl fmt::Display for RuntimeMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMutability::Constant => f.write_str("const"),
            RuntimeMutability::DependentConstant => f.write_str("const?"),
            RuntimeMutability::Variable => f.write_str("variable"),
        }
    }
}
