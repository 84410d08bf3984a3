//! Module overload resolution rules.
//!
//! The pieces here are independent of the checker state: binding arguments
//! to parameters, inferring the call's upsample factor, resolving
//! dependent-constant mutability and ranking the candidates that survive.
//! The checker strings them together per candidate (see `check::call`).

use smallvec::SmallVec;
use tone_diagnostic::DiagnosticId;
use tone_ir::{Name, ParamDirection};
use tone_types::{AstDataType, RuntimeMutability};

/// What binding needs to know about a parameter.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ParamShape {
    pub direction: ParamDirection,
    pub name: Name,
}

/// What binding needs to know about an argument.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ArgShape {
    pub direction: ParamDirection,
    pub name: Option<Name>,
}

/// Why arguments could not be bound to a candidate's parameters.
///
/// `arg` indexes the call's argument list.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BindingError {
    PositionalAfterNamed { arg: usize },
    DuplicateArgument { arg: usize, name: Name },
    UnknownArgument { arg: usize, name: Name },
    TooManyArguments { arg: usize },
    DirectionMismatch { arg: usize, param: usize },
}

impl BindingError {
    pub fn id(self) -> DiagnosticId {
        match self {
            BindingError::PositionalAfterNamed { .. } => DiagnosticId::ModuleCallPositionalAfterNamed,
            BindingError::DuplicateArgument { .. } => DiagnosticId::ModuleCallDuplicateArgument,
            BindingError::UnknownArgument { .. } => DiagnosticId::ModuleCallUnknownArgument,
            BindingError::TooManyArguments { .. } => DiagnosticId::ModuleCallTooManyArguments,
            BindingError::DirectionMismatch { .. } => DiagnosticId::ModuleCallDirectionMismatch,
        }
    }

    pub fn arg(self) -> usize {
        match self {
            BindingError::PositionalAfterNamed { arg }
            | BindingError::DuplicateArgument { arg, .. }
            | BindingError::UnknownArgument { arg, .. }
            | BindingError::TooManyArguments { arg }
            | BindingError::DirectionMismatch { arg, .. } => arg,
        }
    }
}

/// Bind arguments to parameters.
///
/// Positional arguments fill parameters in order and must all come before
/// named ones. Returns, per parameter, the index of the bound argument;
/// unbound parameters are left for default values.
pub fn bind_arguments(
    params: &[ParamShape],
    args: &[ArgShape],
) -> Result<Vec<Option<usize>>, BindingError> {
    let mut bindings = vec![None; params.len()];
    let mut seen_named = false;

    for (arg_index, arg) in args.iter().enumerate() {
        let param_index = match arg.name {
            None => {
                if seen_named {
                    return Err(BindingError::PositionalAfterNamed { arg: arg_index });
                }
                if arg_index >= params.len() {
                    return Err(BindingError::TooManyArguments { arg: arg_index });
                }
                arg_index
            }
            Some(name) => {
                seen_named = true;
                let Some(index) = params.iter().position(|param| param.name == name) else {
                    return Err(BindingError::UnknownArgument {
                        arg: arg_index,
                        name,
                    });
                };
                if bindings[index].is_some() {
                    return Err(BindingError::DuplicateArgument {
                        arg: arg_index,
                        name,
                    });
                }
                index
            }
        };

        if params[param_index].direction != arg.direction {
            return Err(BindingError::DirectionMismatch {
                arg: arg_index,
                param: param_index,
            });
        }
        bindings[param_index] = Some(arg_index);
    }

    Ok(bindings)
}

/// Why a call's upsample factor could not be determined.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UpsampleError {
    /// An explicit factor of zero.
    Invalid,
    /// The first runtime argument's factor is not a multiple of its parameter's.
    NotIntegral {
        arg: usize,
        arg_factor: u32,
        param_factor: u32,
    },
}

/// Determine the upsample factor of a call.
///
/// An explicit factor wins. Otherwise the first bound pair (in argument
/// order) where neither argument nor parameter is constant decides:
/// `argument factor / parameter factor`. With no such pair the factor is 1.
///
/// `bound` yields `(argument index, argument type, declared parameter type)`.
pub fn infer_upsample_factor(
    explicit: Option<u32>,
    bound: impl IntoIterator<Item = (usize, AstDataType, AstDataType)>,
) -> Result<u32, UpsampleError> {
    if let Some(factor) = explicit {
        return if factor == 0 {
            Err(UpsampleError::Invalid)
        } else {
            Ok(factor)
        };
    }

    let first_runtime = bound.into_iter().find(|(_, arg, param)| {
        !arg.is_error()
            && arg.mutability() != RuntimeMutability::Constant
            && param.mutability() != RuntimeMutability::Constant
    });
    let Some((arg, arg_ty, param_ty)) = first_runtime else {
        return Ok(1);
    };

    let arg_factor = arg_ty.upsample_factor();
    let param_factor = param_ty.upsample_factor();
    if arg_factor % param_factor != 0 {
        return Err(UpsampleError::NotIntegral {
            arg,
            arg_factor,
            param_factor,
        });
    }
    Ok(arg_factor / param_factor)
}

/// Mutability every dependent-constant parameter and the return type take on.
///
/// The least constant of the values bound to dependent-constant inputs, or
/// `Constant` when there are none. `bound` yields
/// `(declared parameter type, bound value type)` for input parameters.
pub fn resolve_dependent_constant(
    bound: impl IntoIterator<Item = (AstDataType, AstDataType)>,
) -> RuntimeMutability {
    bound
        .into_iter()
        .filter(|(param, value)| {
            param.mutability() == RuntimeMutability::DependentConstant && !value.is_error()
        })
        .fold(RuntimeMutability::Constant, |acc, (_, value)| {
            acc.least_constant(value.mutability())
        })
}

/// Declared parameter or return type as seen from one call.
///
/// Runtime types are scaled by the call's upsample factor; dependent-constant
/// types take on the resolved mutability. Returns `None` if scaling overflows.
pub fn resolve_call_type(
    declared: AstDataType,
    upsample_factor: u32,
    dependent_constant: RuntimeMutability,
) -> Option<AstDataType> {
    let scaled = declared.upsampled_by(upsample_factor)?;
    if declared.mutability() == RuntimeMutability::DependentConstant {
        Some(scaled.with_mutability(dependent_constant))
    } else {
        Some(scaled)
    }
}

/// How well one argument matches its parameter. Smaller is better.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum MatchQuality {
    /// Argument type identical to the resolved parameter type.
    Exact,
    /// Assignable only through an implicit conversion.
    Conversion,
}

pub type Qualities = SmallVec<[MatchQuality; 8]>;

/// `a` is at least as good as `b` everywhere and better somewhere.
pub fn strictly_beats(a: &[MatchQuality], b: &[MatchQuality]) -> bool {
    let mut better_somewhere = false;
    for (qa, qb) in a.iter().zip(b) {
        if qa > qb {
            return false;
        }
        better_somewhere |= qa < qb;
    }
    better_somewhere
}

/// Index of the candidate that strictly beats every other one.
pub fn select_best(candidates: &[Qualities]) -> Option<usize> {
    match candidates {
        [] => None,
        [_] => Some(0),
        _ => (0..candidates.len()).find(|&i| {
            candidates
                .iter()
                .enumerate()
                .all(|(j, other)| i == j || strictly_beats(&candidates[i], other))
        }),
    }
}

#[cfg(test)]
mod tests;
