//! End-to-end tests for the analyzer.
//!
//! Each test builds parse trees, runs the public [`analyze`](crate::analyze)
//! entry point with the built-in operators and inspects the collected output.
//!
//! # Test Categories
//!
//! - **Definite assignment**: Branch merges, loop back edges, short-circuit
//!   and ternary `out` arguments
//! - **Default values**: Lazy resolution across modules, cycles
//! - **Overloads**: Exact matches, ambiguity, aggregate failures
//! - **Output**: Ordering, error limits, fatal errors

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;
use tone_diagnostic::{DiagnosticConfig, DiagnosticId, FatalError};
use tone_ir::{SourceFile, Span, StringInterner, TreeBuilder};
use tone_types::RuntimeMutability;

use crate::{analyze, AnalysisOutput, ArgumentValue, BuiltinOperators, SemaConfig, TypedExprKind, TypedStmtKind};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn analyze_with(config: &SemaConfig, build: impl FnOnce(&mut TreeBuilder<'_>)) -> Result<AnalysisOutput, FatalError> {
    let interner = StringInterner::new();
    let mut builder = TreeBuilder::new(&interner, "main");
    build(&mut builder);
    let files: Vec<SourceFile> = vec![builder.finish()];
    analyze(&files, &interner, &BuiltinOperators, config)
}

fn analyze_unit(build: impl FnOnce(&mut TreeBuilder<'_>)) -> AnalysisOutput {
    analyze_with(&SemaConfig::unlimited(), build).unwrap()
}

fn ids(output: &AnalysisOutput) -> Vec<DiagnosticId> {
    output.diagnostics.iter().map(|d| d.id).collect()
}

/// `F(out y: float): bool { y = 1.0f; return true; }`
fn assigning_predicate(b: &mut TreeBuilder<'_>) {
    let y = b.out_param("y", "float");
    let target = b.ident("y");
    let one = b.float(1.0);
    let assign = b.assign(target, one);
    let yes = b.bool(true);
    let ret = b.return_stmt(Some(yes));
    b.module("F", vec![y], "bool", vec![assign, ret]);
}

/// `F(out y)`
fn call_predicate(b: &mut TreeBuilder<'_>) -> tone_ir::ExprId {
    let y = b.ident("y");
    let arg = b.out(y);
    b.call("F", vec![arg])
}

// ============================================================================
// Definite assignment
// ============================================================================

#[test]
fn assignment_in_one_branch_is_maybe() {
    let output = analyze_unit(|b| {
        let decl = b.val("x", Some("float"), None);
        let target = b.ident("x");
        let one = b.float(1.0);
        let assign = b.assign(target, one);
        let cond = b.bool(true);
        let branch = b.if_stmt(cond, vec![assign], None);
        let x = b.ident("x");
        let ret = b.return_stmt(Some(x));
        b.module("M", vec![], "float", vec![decl, branch, ret]);
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ValueMaybeNotInitialized]);
}

#[test]
fn short_circuited_out_argument_may_not_run() {
    let output = analyze_unit(|b| {
        assigning_predicate(b);
        let flag = b.param("b", "bool", None);
        let decl = b.val("y", Some("float"), None);
        let read = b.ident("b");
        let call = call_predicate(b);
        let both = b.and(read, call);
        let c = b.val("c", None, Some(both));
        let y = b.ident("y");
        let ret = b.return_stmt(Some(y));
        b.module("M", vec![flag], "float", vec![decl, c, ret]);
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ValueMaybeNotInitialized]);
}

#[test]
fn out_argument_is_assigned_when_conjunction_holds() {
    let output = analyze_unit(|b| {
        assigning_predicate(b);
        let flag = b.param("b", "bool", None);
        let decl = b.val("y", Some("float"), None);
        let read = b.ident("b");
        let call = call_predicate(b);
        let both = b.and(read, call);
        let y = b.ident("y");
        let inner = b.return_stmt(Some(y));
        let branch = b.if_stmt(both, vec![inner], None);
        let zero = b.float(0.0);
        let ret = b.return_stmt(Some(zero));
        b.module("M", vec![flag], "float", vec![decl, branch, ret]);
    });
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
}

#[test]
fn out_argument_is_assigned_when_disjunction_fails() {
    let output = analyze_unit(|b| {
        assigning_predicate(b);
        let flag = b.param("b", "bool", None);
        let decl = b.val("y", Some("float"), None);
        let read = b.ident("b");
        let not_flag = b.not(read);
        let call = call_predicate(b);
        let not_call = b.not(call);
        let either = b.or(not_flag, not_call);
        let zero = b.float(0.0);
        let inner = b.return_stmt(Some(zero));
        let branch = b.if_stmt(either, vec![inner], None);
        let y = b.ident("y");
        let ret = b.return_stmt(Some(y));
        b.module("M", vec![flag], "float", vec![decl, branch, ret]);
    });
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
}

/// `M(b: bool): float { val y: float; val c = <select>; return y; }`
fn ternary_then_read(select: impl FnOnce(&mut TreeBuilder<'_>, tone_ir::ExprId) -> tone_ir::ExprId) -> AnalysisOutput {
    analyze_unit(|b| {
        assigning_predicate(b);
        let flag = b.param("b", "bool", None);
        let decl = b.val("y", Some("float"), None);
        let cond = b.ident("b");
        let picked = select(b, cond);
        let c = b.val("c", None, Some(picked));
        let y = b.ident("y");
        let ret = b.return_stmt(Some(y));
        b.module("M", vec![flag], "float", vec![decl, c, ret]);
    })
}

#[test]
fn out_argument_on_both_ternary_branches_assigns() {
    let output = ternary_then_read(|b, cond| {
        let if_true = call_predicate(b);
        let if_false = call_predicate(b);
        b.ternary(cond, if_true, if_false)
    });
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
}

#[test]
fn out_argument_on_one_ternary_branch_may_not_run() {
    let output = ternary_then_read(|b, cond| {
        let if_true = call_predicate(b);
        let if_false = b.bool(false);
        b.ternary(cond, if_true, if_false)
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ValueMaybeNotInitialized]);
}

/// `M(arr: float[]): float { val x: float; val z: float = 0.0f; for (v in arr) { <body> } return z; }`
fn loop_over_param(body: impl FnOnce(&mut TreeBuilder<'_>) -> Vec<tone_ir::Stmt>) -> AnalysisOutput {
    analyze_unit(|b| {
        let arr = b.param("arr", "float[]", None);
        let x = b.val("x", Some("float"), None);
        let zero = b.float(0.0);
        let z = b.val("z", Some("float"), Some(zero));
        let iterable = b.ident("arr");
        let stmts = body(b);
        let for_loop = b.for_stmt("v", None, iterable, stmts);
        let read = b.ident("z");
        let ret = b.return_stmt(Some(read));
        b.module("M", vec![arr], "float", vec![x, z, for_loop, ret]);
    })
}

#[test]
fn read_before_assignment_in_loop_body_is_maybe() {
    let output = loop_over_param(|b| {
        let z = b.ident("z");
        let x = b.ident("x");
        let copy = b.assign(z, x);
        let target = b.ident("x");
        let one = b.float(1.0);
        let assign = b.assign(target, one);
        vec![copy, assign]
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ValueMaybeNotInitialized]);
}

#[test]
fn value_never_assigned_in_loop_is_not_initialized() {
    let output = loop_over_param(|b| {
        let z = b.ident("z");
        let x = b.ident("x");
        vec![b.assign(z, x)]
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ValueNotInitialized]);
}

#[test]
fn nested_loop_bodies_report_once() {
    let output = loop_over_param(|b| {
        let inner_iterable = b.ident("arr");
        let z = b.ident("z");
        let x = b.ident("x");
        let copy = b.assign(z, x);
        let target = b.ident("x");
        let one = b.float(1.0);
        let assign = b.assign(target, one);
        let nope = b.ident("nope");
        let unresolved = b.val("w", None, Some(nope));
        vec![b.for_stmt("u", None, inner_iterable, vec![copy, assign, unresolved])]
    });
    assert_eq!(
        ids(&output),
        vec![DiagnosticId::ValueMaybeNotInitialized, DiagnosticId::UnresolvedIdentifier]
    );
}

// ============================================================================
// Default values
// ============================================================================

/// `<name>(<param>: <ty> = <callee>()): <ty> { return <param>; }`
fn forwarding_module(b: &mut TreeBuilder<'_>, name: &str, param: &str, ty: &str, callee: Option<&str>) {
    let default = match callee {
        Some(callee) => b.call(callee, vec![]),
        None => b.float(1.0),
    };
    let p = b.param(param, ty, Some(default));
    let read = b.ident(param);
    let ret = b.return_stmt(Some(read));
    b.module(name, vec![p], ty, vec![ret]);
}

#[test]
fn defaults_resolve_through_other_modules() {
    let output = analyze_unit(|b| {
        forwarding_module(b, "Foo", "x", "const? float", None);
        forwarding_module(b, "Bar", "y", "const? float", Some("Foo"));
    });
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert_eq!(output.program.defaults.len(), 2);
}

#[test]
fn mutually_dependent_defaults_report_one_cycle() {
    let mut second_module = 0;
    let output = analyze_unit(|b| {
        forwarding_module(b, "X", "x", "float", Some("Y"));
        second_module = b.offset();
        forwarding_module(b, "Y", "x", "float", Some("X"));
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ModuleParameterDefaultValueCyclicDependency]);
    assert!(output.diagnostics[0].span.start < second_module);
}

// ============================================================================
// Overloads
// ============================================================================

fn single_param_overloads(b: &mut TreeBuilder<'_>, types: &[&str]) {
    for ty in types {
        let x = b.param("x", ty, None);
        b.module("X", vec![x], "void", vec![]);
    }
}

fn call_statement(b: &mut TreeBuilder<'_>, args: Vec<tone_ir::ExprId>) {
    let args = args.into_iter().map(|value| b.arg(value)).collect();
    let call = b.call("X", args);
    let stmt = b.expr_stmt(call);
    b.module("M", vec![], "void", vec![stmt]);
}

#[test]
fn exact_match_beats_conversion() {
    let output = analyze_unit(|b| {
        single_param_overloads(b, &["float", "const float"]);
        let one = b.float(1.0);
        call_statement(b, vec![one]);
    });
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

    let body = output.program.modules.last().unwrap();
    let TypedStmtKind::Expr(expr) = &body.body.stmts[0].kind else {
        panic!("expected an expression statement");
    };
    let TypedExprKind::ModuleCall(call) = &expr.kind else {
        panic!("expected a module call");
    };
    let chosen = &output.declarations.module(call.module);
    let param = output.declarations.param(chosen.params[0]);
    assert_eq!(param.ty.mutability(), RuntimeMutability::Constant);
    assert!(matches!(call.arguments[0].value, ArgumentValue::In(_)));
}

#[test]
fn crossed_conversions_are_ambiguous() {
    let output = analyze_unit(|b| {
        let x = b.param("x", "float", None);
        let y = b.param("y", "const float", None);
        b.module("X", vec![x, y], "void", vec![]);
        let x = b.param("x", "const float", None);
        let y = b.param("y", "float", None);
        b.module("X", vec![x, y], "void", vec![]);
        let one = b.float(1.0);
        let two = b.float(1.0);
        call_statement(b, vec![one, two]);
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ModuleCallAmbiguous]);
}

#[test]
fn failing_every_overload_reports_once() {
    let output = analyze_unit(|b| {
        single_param_overloads(b, &["float"]);
        let x = b.param("x", "int", None);
        let y = b.param("y", "int", None);
        b.module("X", vec![x, y], "void", vec![]);
        let yes = b.bool(true);
        call_statement(b, vec![yes]);
    });
    assert_eq!(ids(&output), vec![DiagnosticId::ModuleCallNoMatchingOverload]);
    assert_eq!(output.diagnostics[0].notes.len(), 2);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn diagnostics_are_sorted_by_position() {
    let output = analyze_unit(|b| {
        let nope = b.ident("nope");
        b.global("g", None, Some(nope));
        let x = b.param("x", "Nope", None);
        b.module("M", vec![x], "void", vec![]);
    });
    assert_eq!(
        ids(&output),
        vec![DiagnosticId::UnresolvedIdentifier, DiagnosticId::UnresolvedType]
    );
    assert!(output.has_errors());
    assert_eq!(output.errors().count(), 2);
}

#[test]
fn warnings_do_not_count_as_errors() {
    let output = analyze_unit(|b| {
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(tone_ir::BinaryOp::Add, one, two);
        let stmt = b.expr_stmt(sum);
        b.module("M", vec![], "void", vec![stmt]);
    });
    assert!(!output.has_errors());
    assert_eq!(output.warnings().count(), 1);
}

#[test]
fn error_limit_caps_collected_errors() {
    let config = SemaConfig {
        diagnostics: DiagnosticConfig {
            error_limit: 2,
            deduplicate: true,
        },
        ..SemaConfig::default()
    };
    let output = analyze_with(&config, |b| {
        let stmts = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                let nope = b.ident("nope");
                b.val(name, None, Some(nope))
            })
            .collect();
        b.module("M", vec![], "void", stmts);
    })
    .unwrap();
    assert_eq!(output.errors().count(), 2);
}

#[test]
fn default_config_keeps_every_error() {
    let output = analyze_with(&SemaConfig::default(), |b| {
        let stmts = (0..150)
            .map(|i| {
                let nope = b.ident("nope");
                b.val(&format!("v{i}"), None, Some(nope))
            })
            .collect();
        b.module("M", vec![], "void", stmts);
    })
    .unwrap();
    assert_eq!(output.errors().count(), 150);
}

#[test]
fn oversized_array_is_fatal() {
    let config = SemaConfig::unlimited().with_max_array_element_count(8);
    let result = analyze_with(&config, |b| {
        let one = b.float(1.0);
        let array = b.array(vec![one]);
        let count = b.int(9);
        let repeated = b.repeat(array, count);
        let decl = b.val("a", None, Some(repeated));
        b.module("M", vec![], "void", vec![decl]);
    });
    let Err(FatalError::ArrayElementCountExceeded { count, limit, span }) = result else {
        panic!("expected a fatal error");
    };
    assert_eq!((count, limit), (9, 8));
    assert_ne!(span, Span::DUMMY);
}
