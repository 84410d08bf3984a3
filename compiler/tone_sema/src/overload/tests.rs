use super::*;
use pretty_assertions::assert_eq;
use smallvec::smallvec;
use tone_types::PrimitiveType;
use super::MatchQuality::{Conversion, Exact};
use tone_ir::ParamDirection::{In, Out};

fn name(raw: u32) -> Name {
    Name::from_raw(raw)
}

fn params(shapes: &[(ParamDirection, u32)]) -> Vec<ParamShape> {
    shapes
        .iter()
        .map(|&(direction, raw)| ParamShape {
            direction,
            name: name(raw),
        })
        .collect()
}

fn positional(direction: ParamDirection) -> ArgShape {
    ArgShape {
        direction,
        name: None,
    }
}

fn named(direction: ParamDirection, raw: u32) -> ArgShape {
    ArgShape {
        direction,
        name: Some(name(raw)),
    }
}

fn float(m: RuntimeMutability, factor: u32) -> AstDataType {
    AstDataType::primitive(m, PrimitiveType::Float).with_upsample_factor(factor)
}

// ── Binding ─────────────────────────────────────────────────────────

#[test]
fn positional_then_named_binding() {
    let ps = params(&[(In, 1), (In, 2), (Out, 3)]);
    let bindings = bind_arguments(&ps, &[positional(In), named(Out, 3)]);
    assert_eq!(bindings, Ok(vec![Some(0), None, Some(1)]));
}

#[test]
fn named_arguments_may_come_in_any_order() {
    let ps = params(&[(In, 1), (In, 2)]);
    let bindings = bind_arguments(&ps, &[named(In, 2), named(In, 1)]);
    assert_eq!(bindings, Ok(vec![Some(1), Some(0)]));
}

#[test]
fn binding_failures() {
    let ps = params(&[(In, 1), (Out, 2)]);
    assert_eq!(
        bind_arguments(&ps, &[named(In, 1), positional(Out)]),
        Err(BindingError::PositionalAfterNamed { arg: 1 })
    );
    assert_eq!(
        bind_arguments(&ps, &[positional(In), named(In, 1)]),
        Err(BindingError::DuplicateArgument {
            arg: 1,
            name: name(1)
        })
    );
    assert_eq!(
        bind_arguments(&ps, &[named(In, 7)]),
        Err(BindingError::UnknownArgument {
            arg: 0,
            name: name(7)
        })
    );
    assert_eq!(
        bind_arguments(&ps, &[positional(In), positional(Out), positional(In)]),
        Err(BindingError::TooManyArguments { arg: 2 })
    );
    assert_eq!(
        bind_arguments(&ps, &[positional(In), positional(In)]),
        Err(BindingError::DirectionMismatch { arg: 1, param: 1 })
    );
}

// ── Upsample factor ─────────────────────────────────────────────────

#[test]
fn explicit_upsample_factor_wins() {
    let bound = [(0, float(RuntimeMutability::Variable, 4), float(RuntimeMutability::Variable, 1))];
    assert_eq!(infer_upsample_factor(Some(2), bound), Ok(2));
    assert_eq!(
        infer_upsample_factor(Some(0), bound),
        Err(UpsampleError::Invalid)
    );
}

#[test]
fn upsample_factor_is_argument_over_parameter() {
    let bound = [
        (0, float(RuntimeMutability::Constant, 1), float(RuntimeMutability::Variable, 1)),
        (1, float(RuntimeMutability::Variable, 6), float(RuntimeMutability::Variable, 2)),
        (2, float(RuntimeMutability::Variable, 5), float(RuntimeMutability::Variable, 1)),
    ];
    assert_eq!(infer_upsample_factor(None, bound), Ok(3));
}

#[test]
fn non_integral_upsample_factor_is_an_error() {
    let bound = [(4, float(RuntimeMutability::Variable, 3), float(RuntimeMutability::Variable, 2))];
    assert_eq!(
        infer_upsample_factor(None, bound),
        Err(UpsampleError::NotIntegral {
            arg: 4,
            arg_factor: 3,
            param_factor: 2
        })
    );
}

#[test]
fn constant_parameters_do_not_decide_the_factor() {
    let bound = [(0, float(RuntimeMutability::Variable, 4), float(RuntimeMutability::Constant, 1))];
    assert_eq!(infer_upsample_factor(None, bound), Ok(1));
}

// ── Dependent-constant resolution ───────────────────────────────────

#[test]
fn dependent_constant_takes_least_constant_input() {
    let dep = float(RuntimeMutability::DependentConstant, 1);
    let var = float(RuntimeMutability::Variable, 1);
    let konst = float(RuntimeMutability::Constant, 1);

    assert_eq!(
        resolve_dependent_constant(Vec::<(AstDataType, AstDataType)>::new()),
        RuntimeMutability::Constant
    );
    assert_eq!(
        resolve_dependent_constant([(dep, konst), (dep, konst)]),
        RuntimeMutability::Constant
    );
    assert_eq!(
        resolve_dependent_constant([(dep, konst), (dep, dep)]),
        RuntimeMutability::DependentConstant
    );
    assert_eq!(
        resolve_dependent_constant([(dep, dep), (dep, var)]),
        RuntimeMutability::Variable
    );
    // Inputs bound to ordinary parameters do not count.
    assert_eq!(
        resolve_dependent_constant([(var, var), (dep, konst)]),
        RuntimeMutability::Constant
    );
}

#[test]
fn call_types_are_scaled_and_resolved() {
    let dep = float(RuntimeMutability::DependentConstant, 1);
    assert_eq!(
        resolve_call_type(dep, 2, RuntimeMutability::Variable),
        Some(float(RuntimeMutability::Variable, 2))
    );
    assert_eq!(
        resolve_call_type(dep, 2, RuntimeMutability::Constant),
        Some(float(RuntimeMutability::Constant, 1))
    );
    let konst = float(RuntimeMutability::Constant, 1);
    assert_eq!(
        resolve_call_type(konst, 4, RuntimeMutability::Variable),
        Some(konst)
    );
}

// ── Ranking ─────────────────────────────────────────────────────────

#[test]
fn strictly_beats_needs_one_strict_improvement() {
    assert!(strictly_beats(&[Exact, Exact], &[Exact, Conversion]));
    assert!(!strictly_beats(&[Exact, Exact], &[Exact, Exact]));
    assert!(!strictly_beats(&[Exact, Conversion], &[Conversion, Exact]));
}

#[test]
fn select_best_picks_the_dominating_candidate() {
    let candidates: Vec<Qualities> = vec![
        smallvec![Conversion, Exact],
        smallvec![Exact, Exact],
        smallvec![Conversion, Conversion],
    ];
    assert_eq!(select_best(&candidates), Some(1));
}

#[test]
fn select_best_is_none_when_ambiguous() {
    let candidates: Vec<Qualities> = vec![
        smallvec![Exact, Conversion],
        smallvec![Conversion, Exact],
    ];
    assert_eq!(select_best(&candidates), None);

    let tied: Vec<Qualities> = vec![smallvec![Exact], smallvec![Exact]];
    assert_eq!(select_best(&tied), None);
}
