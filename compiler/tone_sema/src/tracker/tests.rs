use super::*;
use pretty_assertions::assert_eq;

fn v(raw: u32) -> ValueId {
    ValueId::from_raw(raw)
}

fn tracking(values: &[(u32, InitState)]) -> ScopeTracker {
    let mut tracker = ScopeTracker::new();
    for &(raw, state) in values {
        tracker.track_value(v(raw), state);
    }
    tracker
}

#[test]
fn untracked_values_count_as_assigned() {
    let tracker = ScopeTracker::new();
    assert_eq!(tracker.value_state(v(0)), InitState::Yes);
}

#[test]
fn assign_marks_yes_without_touching_clones() {
    let pre = tracking(&[(0, InitState::No)]);
    let mut branch = pre.clone();
    branch.assign(v(0));
    assert_eq!(branch.value_state(v(0)), InitState::Yes);
    assert_eq!(pre.value_state(v(0)), InitState::No);
}

#[test]
fn union_of_both_branches_assigning_is_yes() {
    let pre = tracking(&[(0, InitState::No)]);
    let mut then_branch = pre.clone();
    let mut else_branch = pre.clone();
    then_branch.assign(v(0));
    else_branch.assign(v(0));
    let merged = ScopeTracker::union(&[then_branch, else_branch]);
    assert_eq!(merged.value_state(v(0)), InitState::Yes);
}

#[test]
fn union_of_one_branch_assigning_is_maybe() {
    let pre = tracking(&[(0, InitState::No)]);
    let mut then_branch = pre.clone();
    then_branch.assign(v(0));
    let merged = ScopeTracker::union(&[then_branch, pre]);
    assert_eq!(merged.value_state(v(0)), InitState::Maybe);
}

#[test]
fn union_ignores_branches_that_cannot_complete() {
    let pre = tracking(&[(0, InitState::No)]);
    let mut assigning = pre.clone();
    assigning.assign(v(0));
    let mut returning = pre;
    returning.issue_return();

    let merged = ScopeTracker::union(&[assigning, returning]);
    assert_eq!(merged.value_state(v(0)), InitState::Yes);
    assert_eq!(merged.did_return(), InitState::Maybe);
    assert!(!merged.is_unreachable());
}

#[test]
fn union_is_unreachable_only_when_all_branches_are() {
    let mut a = ScopeTracker::new();
    a.issue_return();
    let mut b = ScopeTracker::new().loop_child();
    assert!(b.issue_break());
    let merged = ScopeTracker::union(&[a, b]);
    assert!(merged.is_unreachable());
    assert_eq!(merged.did_return(), InitState::Maybe);
    assert_eq!(merged.did_break(), InitState::Maybe);
}

#[test]
fn union_identity_and_idempotence() {
    let mut tracker = tracking(&[(0, InitState::No), (1, InitState::Maybe)]);
    tracker.assign(v(0));
    assert_eq!(ScopeTracker::union(std::slice::from_ref(&tracker)), tracker);
    assert_eq!(
        ScopeTracker::union(&[tracker.clone(), tracker.clone()]),
        tracker
    );
}

#[test]
fn child_scope_values_are_dropped_on_integration() {
    let mut outer = tracking(&[(0, InitState::No)]);
    let mut child = outer.child();
    child.track_value(v(1), InitState::No);
    child.assign(v(0));
    assert_eq!(child.value_state(v(1)), InitState::No);
    outer.integrate_child_scope(&child);

    assert_eq!(outer.value_state(v(0)), InitState::Yes);
    // Untracked again, so it reads as assigned.
    assert_eq!(outer.value_state(v(1)), InitState::Yes);
}

#[test]
fn break_and_continue_require_a_loop() {
    let mut tracker = ScopeTracker::new();
    assert!(!tracker.issue_break());
    assert!(!tracker.issue_continue());
    assert!(!tracker.is_unreachable());
    assert_eq!(tracker.did_break(), InitState::No);

    let mut body = tracker.loop_child();
    let mut nested = body.child();
    assert!(nested.in_for_loop());
    assert!(nested.issue_continue());
    body.integrate_child_scope(&nested);
    assert!(body.is_unreachable());
    assert_eq!(body.did_continue(), InitState::Yes);
}

#[test]
fn loop_body_assignment_is_maybe_after_the_loop() {
    let mut tracker = tracking(&[(0, InitState::No)]);
    let mut body = tracker.loop_child();
    body.assign(v(0));
    assert!(body.issue_break());
    tracker.integrate_loop_scope(&body);

    assert_eq!(tracker.value_state(v(0)), InitState::Maybe);
    assert!(!tracker.is_unreachable());
    assert!(!tracker.in_for_loop());
    assert_eq!(tracker.did_break(), InitState::No);
}

#[test]
fn return_inside_loop_is_maybe() {
    let mut tracker = ScopeTracker::new();
    let mut body = tracker.loop_child();
    body.issue_return();
    tracker.integrate_loop_scope(&body);
    assert_eq!(tracker.did_return(), InitState::Maybe);
    assert!(!tracker.is_unreachable());
}

#[test]
fn short_circuit_branches_compose() {
    // `a && F(out y)`: y is only assigned when `a` is true.
    let pre = tracking(&[(0, InitState::No)]);
    let a_true = pre.clone();
    let a_false = pre.clone();
    let mut rhs = a_true;
    rhs.assign(v(0));
    let when_true = rhs.clone();
    let when_false = ScopeTracker::union(&[a_false, rhs]);
    let after = ScopeTracker::union(&[when_true, when_false]);
    assert_eq!(after.value_state(v(0)), InitState::Maybe);
}
