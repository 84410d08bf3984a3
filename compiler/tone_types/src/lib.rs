//! Tone type lattice.
//!
//! Every value in a Tone program carries an [`AstDataType`]: a
//! [`RuntimeMutability`] (how early the value is known), a shape, an upsample
//! factor (how many samples per base-rate sample) and an array flag.
//! Assignability, legality and join operations live here so the analyzer and
//! overload resolution share one definition of each rule.

mod data_type;
mod mutability;
mod primitive;

pub use data_type::{AstDataType, DataKind, DataTypeDisplay, StructId};
pub use mutability::RuntimeMutability;
pub use primitive::PrimitiveType;
