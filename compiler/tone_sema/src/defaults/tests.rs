use super::*;
use pretty_assertions::assert_eq;
use tone_ir::Span;
use tone_types::{PrimitiveType, RuntimeMutability};

fn site(raw: u32) -> DefaultValueSite {
    DefaultValueSite::Parameter(ParamId::from_raw(raw))
}

fn const_float() -> AstDataType {
    AstDataType::primitive(RuntimeMutability::Constant, PrimitiveType::Float)
}

#[test]
fn sites_resolve_once() {
    let mut resolver = DefaultValueResolver::new();
    assert_eq!(resolver.state(site(0)), ResolutionState::Unresolved);
    assert_eq!(resolver.enter(site(0)), Entered::Build);
    assert_eq!(resolver.state(site(0)), ResolutionState::InProgress);

    let expr = TypedExpr::placeholder(const_float(), Span::DUMMY);
    resolver.complete(site(0), const_float(), expr.clone());
    assert_eq!(resolver.state(site(0)), ResolutionState::Resolved);
    assert_eq!(resolver.enter(site(0)), Entered::Resolved(const_float()));
    assert_eq!(resolver.into_resolved().get(&site(0)), Some(&expr));
}

#[test]
fn reentry_while_in_progress_is_a_cycle_reported_once() {
    let mut resolver = DefaultValueResolver::new();
    assert_eq!(resolver.enter(site(0)), Entered::Build);
    assert_eq!(resolver.enter(site(1)), Entered::Build);
    assert_eq!(resolver.enter(site(0)), Entered::Cycle { report: true });
    assert_eq!(resolver.enter(site(0)), Entered::Cycle { report: false });
    assert_eq!(resolver.cycle_count(), 1);
}

#[test]
fn unfinished_sites_are_not_exported() {
    let mut resolver = DefaultValueResolver::new();
    assert_eq!(resolver.enter(site(0)), Entered::Build);
    assert_eq!(resolver.enter(site(1)), Entered::Build);
    resolver.complete(
        site(1),
        const_float(),
        TypedExpr::placeholder(const_float(), Span::DUMMY),
    );
    let resolved = resolver.into_resolved();
    assert_eq!(resolved.len(), 1);
    assert!(resolved.contains_key(&site(1)));
}

#[test]
fn cycle_ids_per_site_kind() {
    assert_eq!(
        site(0).cycle_diagnostic(),
        DiagnosticId::ModuleParameterDefaultValueCyclicDependency
    );
    assert_eq!(
        DefaultValueSite::StructField {
            structure: StructId::from_raw(0),
            field: 1
        }
        .cycle_diagnostic(),
        DiagnosticId::StructFieldDefaultValueCyclicDependency
    );
    assert_eq!(
        DefaultValueSite::GlobalValue(ValueId::from_raw(0)).cycle_diagnostic(),
        DiagnosticId::GlobalValueCyclicDependency
    );
}
