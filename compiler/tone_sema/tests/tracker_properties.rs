//! Property-based tests for definite-assignment merging.
//!
//! Branch trackers are derived from one pre-state that tracks a handful of
//! unassigned values; each branch assigns a random subset and may return.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use proptest::prelude::*;
use tone_sema::{InitState, ScopeTracker, ValueId};

const VALUES: u32 = 8;

/// Assignments performed by one branch, and whether it ends in `return`.
#[derive(Clone, Debug)]
struct Branch {
    assigned: Vec<u32>,
    returns: bool,
}

fn branch_strategy() -> impl Strategy<Value = Branch> {
    (prop::collection::vec(0..VALUES, 0..6), prop::bool::weighted(0.2))
        .prop_map(|(assigned, returns)| Branch { assigned, returns })
}

fn pre_state() -> ScopeTracker {
    let mut tracker = ScopeTracker::new();
    for raw in 0..VALUES {
        tracker.track_value(ValueId::from_raw(raw), InitState::No);
    }
    tracker
}

fn run(base: &ScopeTracker, branch: &Branch) -> ScopeTracker {
    let mut tracker = base.clone();
    for &raw in &branch.assigned {
        tracker.assign(ValueId::from_raw(raw));
    }
    if branch.returns {
        tracker.issue_return();
    }
    tracker
}

fn states(tracker: &ScopeTracker) -> Vec<InitState> {
    (0..VALUES).map(|raw| tracker.value_state(ValueId::from_raw(raw))).collect()
}

fn state_strategy() -> impl Strategy<Value = InitState> {
    prop_oneof![Just(InitState::No), Just(InitState::Maybe), Just(InitState::Yes)]
}

proptest! {
    #[test]
    fn join_is_commutative_and_idempotent(a in state_strategy(), b in state_strategy()) {
        prop_assert_eq!(a.join(b), b.join(a));
        prop_assert_eq!(a.join(a), a);
    }

    #[test]
    fn union_of_one_is_identity(branch in branch_strategy()) {
        let tracker = run(&pre_state(), &branch);
        let merged = ScopeTracker::union(std::slice::from_ref(&tracker));
        prop_assert_eq!(states(&merged), states(&tracker));
        prop_assert_eq!(merged.is_unreachable(), tracker.is_unreachable());
    }

    #[test]
    fn union_is_idempotent(branch in branch_strategy()) {
        let tracker = run(&pre_state(), &branch);
        let merged = ScopeTracker::union(&[tracker.clone(), tracker.clone()]);
        prop_assert_eq!(states(&merged), states(&tracker));
    }

    #[test]
    fn union_is_commutative(left in branch_strategy(), right in branch_strategy()) {
        let base = pre_state();
        let a = run(&base, &left);
        let b = run(&base, &right);
        let ab = ScopeTracker::union(&[a.clone(), b.clone()]);
        let ba = ScopeTracker::union(&[b, a]);
        prop_assert_eq!(states(&ab), states(&ba));
        prop_assert_eq!(ab.did_return(), ba.did_return());
        prop_assert_eq!(ab.is_unreachable(), ba.is_unreachable());
    }

    #[test]
    fn union_follows_reachable_branches(branches in prop::collection::vec(branch_strategy(), 1..5)) {
        let base = pre_state();
        let trackers: Vec<ScopeTracker> = branches.iter().map(|branch| run(&base, branch)).collect();
        let merged = ScopeTracker::union(&trackers);

        let reachable: Vec<&Branch> = if branches.iter().all(|branch| branch.returns) {
            branches.iter().collect()
        } else {
            branches.iter().filter(|branch| !branch.returns).collect()
        };
        for raw in 0..VALUES {
            let assigned = reachable.iter().filter(|branch| branch.assigned.contains(&raw)).count();
            let expected = if assigned == reachable.len() {
                InitState::Yes
            } else if assigned == 0 {
                InitState::No
            } else {
                InitState::Maybe
            };
            prop_assert_eq!(merged.value_state(ValueId::from_raw(raw)), expected);
        }
        prop_assert_eq!(merged.is_unreachable(), branches.iter().all(|branch| branch.returns));
    }
}

#[test]
fn untracked_values_count_as_assigned() {
    let tracker = pre_state();
    assert_eq!(tracker.value_state(ValueId::from_raw(VALUES + 1)), InitState::Yes);
}
