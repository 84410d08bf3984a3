//! Native module registry interface and the built-in operator catalogue.
//!
//! Natives have the same shape as script modules once registered, so
//! overload resolution treats both alike. The analyzer only reads their
//! signatures; loading and validating native libraries happens elsewhere.

use tone_ir::{BinaryOp, ParamDirection, UnaryOp};
use tone_types::{AstDataType, PrimitiveType, RuntimeMutability};

/// Operator symbol a native module implements.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl Operator {
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Unary(op) => op.symbol(),
            Operator::Binary(op) => op.symbol(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum NativeName {
    /// Callable by name from source.
    Identifier(String),
    /// Reached only through operator syntax.
    Operator(Operator),
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NativeParam {
    pub direction: ParamDirection,
    pub name: String,
    pub ty: AstDataType,
}

impl NativeParam {
    pub fn input(name: &str, ty: AstDataType) -> Self {
        NativeParam {
            direction: ParamDirection::In,
            name: name.to_string(),
            ty,
        }
    }

    pub fn output(name: &str, ty: AstDataType) -> Self {
        NativeParam {
            direction: ParamDirection::Out,
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NativeSignature {
    pub name: NativeName,
    pub params: Vec<NativeParam>,
    pub return_type: AstDataType,
}

/// Source of native module signatures.
pub trait NativeModuleRegistry {
    fn signatures(&self) -> Vec<NativeSignature>;
}

/// Arithmetic, comparison and bitwise operators over the primitive types.
///
/// Every operand and result is `const?`, so an operator applied to constants
/// is constant and applied to anything runtime is runtime.
#[derive(Copy, Clone, Debug, Default)]
pub struct BuiltinOperators;

const ARITHMETIC: [PrimitiveType; 3] = [PrimitiveType::Float, PrimitiveType::Double, PrimitiveType::Int];
const EQUATABLE: [PrimitiveType; 5] = [
    PrimitiveType::Float,
    PrimitiveType::Double,
    PrimitiveType::Int,
    PrimitiveType::Bool,
    PrimitiveType::String,
];
const BITWISE: [PrimitiveType; 2] = [PrimitiveType::Int, PrimitiveType::Bool];

fn dependent(primitive: PrimitiveType) -> AstDataType {
    AstDataType::primitive(RuntimeMutability::DependentConstant, primitive)
}

fn constant(primitive: PrimitiveType) -> AstDataType {
    AstDataType::primitive(RuntimeMutability::Constant, primitive)
}

fn binary(op: BinaryOp, operand: AstDataType, result: AstDataType) -> NativeSignature {
    NativeSignature {
        name: NativeName::Operator(Operator::Binary(op)),
        params: vec![NativeParam::input("x", operand), NativeParam::input("y", operand)],
        return_type: result,
    }
}

fn unary(op: UnaryOp, operand: AstDataType) -> NativeSignature {
    NativeSignature {
        name: NativeName::Operator(Operator::Unary(op)),
        params: vec![NativeParam::input("x", operand)],
        return_type: operand,
    }
}

impl NativeModuleRegistry for BuiltinOperators {
    fn signatures(&self) -> Vec<NativeSignature> {
        let mut signatures = Vec::new();

        for op in [BinaryOp::Add, BinaryOp::Subtract, BinaryOp::Multiply, BinaryOp::Divide, BinaryOp::Modulo] {
            for primitive in ARITHMETIC {
                signatures.push(binary(op, dependent(primitive), dependent(primitive)));
            }
        }
        // String concatenation only exists at compile time.
        signatures.push(binary(
            BinaryOp::Add,
            constant(PrimitiveType::String),
            constant(PrimitiveType::String),
        ));

        for op in [BinaryOp::Equal, BinaryOp::NotEqual] {
            for primitive in EQUATABLE {
                let operand = if primitive == PrimitiveType::String {
                    constant(primitive)
                } else {
                    dependent(primitive)
                };
                let result = if primitive == PrimitiveType::String {
                    constant(PrimitiveType::Bool)
                } else {
                    dependent(PrimitiveType::Bool)
                };
                signatures.push(binary(op, operand, result));
            }
        }

        for op in [BinaryOp::Less, BinaryOp::LessEqual, BinaryOp::Greater, BinaryOp::GreaterEqual] {
            for primitive in ARITHMETIC {
                signatures.push(binary(op, dependent(primitive), dependent(PrimitiveType::Bool)));
            }
        }

        for op in [BinaryOp::BitAnd, BinaryOp::BitOr, BinaryOp::BitXor] {
            for primitive in BITWISE {
                signatures.push(binary(op, dependent(primitive), dependent(primitive)));
            }
        }

        for primitive in ARITHMETIC {
            signatures.push(unary(UnaryOp::Negate, dependent(primitive)));
        }
        signatures.push(unary(UnaryOp::BitNot, dependent(PrimitiveType::Int)));

        signatures
    }
}
