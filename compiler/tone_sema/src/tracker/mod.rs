//! Flow-sensitive definite-assignment tracking.
//!
//! A [`ScopeTracker`] records, for one point in a module body, whether each
//! tracked value has been assigned on every path reaching that point, and
//! whether control has left through `break`, `continue` or `return`.
//!
//! Trackers are persistent: cloning is O(1) and mutation copies the shared
//! state on first write (`Rc::make_mut`). Alternative branches are built from
//! clones of the same pre-state and merged with [`ScopeTracker::union`].

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::decl::ValueId;

/// Three-valued "did this happen on every path" state.
///
/// Used both for value initialization and for the exit signals.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum InitState {
    No,
    Maybe,
    Yes,
}

impl InitState {
    /// Merge the states of two alternative paths.
    #[inline]
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            InitState::Maybe
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct TrackedValue {
    /// Nesting depth of the scope that declared the value.
    depth: u32,
    state: InitState,
}

#[derive(Clone, Eq, PartialEq, Debug)]
struct TrackerState {
    depth: u32,
    values: FxHashMap<ValueId, TrackedValue>,
    did_break: InitState,
    did_continue: InitState,
    did_return: InitState,
    is_unreachable: bool,
    in_for_loop: bool,
}

#[derive(Clone, Debug)]
pub struct ScopeTracker(Rc<TrackerState>);

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ScopeTracker {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl Eq for ScopeTracker {}

impl ScopeTracker {
    /// Tracker for the top of a module body (or a default-value expression).
    pub fn new() -> Self {
        ScopeTracker(Rc::new(TrackerState {
            depth: 0,
            values: FxHashMap::default(),
            did_break: InitState::No,
            did_continue: InitState::No,
            did_return: InitState::No,
            is_unreachable: false,
            in_for_loop: false,
        }))
    }

    fn state_mut(&mut self) -> &mut TrackerState {
        Rc::make_mut(&mut self.0)
    }

    // ── Nesting ─────────────────────────────────────────────────────

    /// Tracker for a nested block. Values tracked in it are dropped again by
    /// [`integrate_child_scope`](Self::integrate_child_scope).
    #[must_use]
    pub fn child(&self) -> Self {
        let mut child = self.clone();
        child.state_mut().depth += 1;
        child
    }

    /// Tracker for a loop body: break/continue become legal and start unset.
    #[must_use]
    pub fn loop_child(&self) -> Self {
        let mut child = self.child();
        let state = child.state_mut();
        state.did_break = InitState::No;
        state.did_continue = InitState::No;
        state.in_for_loop = true;
        child
    }

    /// Take over the final state of a child that ran unconditionally.
    pub fn integrate_child_scope(&mut self, child: &ScopeTracker) {
        let depth = self.0.depth;
        let in_for_loop = self.0.in_for_loop;
        let state = self.state_mut();
        state.values = child
            .0
            .values
            .iter()
            .filter(|(_, tracked)| tracked.depth <= depth)
            .map(|(&id, &tracked)| (id, tracked))
            .collect();
        state.did_break = child.0.did_break;
        state.did_continue = child.0.did_continue;
        state.did_return = child.0.did_return;
        state.is_unreachable = child.0.is_unreachable;
        state.in_for_loop = in_for_loop;
    }

    /// Merge the final state of a loop body that may run zero or more times.
    ///
    /// Break and continue end at the loop; a return inside the body makes the
    /// return signal at most `Maybe`.
    pub fn integrate_loop_scope(&mut self, body: &ScopeTracker) {
        let mut after_body = self.clone();
        after_body.integrate_child_scope(body);
        {
            let state = after_body.state_mut();
            state.did_break = self.0.did_break;
            state.did_continue = self.0.did_continue;
            state.is_unreachable = self.0.is_unreachable;
        }
        *self = ScopeTracker::union(&[self.clone(), after_body]);
    }

    /// Merge trackers of mutually exclusive alternatives.
    ///
    /// A value is `Yes` if it is `Yes` on every alternative that can still
    /// complete normally, `No` if it is `No` on all of them, else `Maybe`.
    /// A value missing from an alternative counts as `No` there. The exit
    /// signals merge over all alternatives, and the result is unreachable
    /// only if every alternative is.
    ///
    /// # Panics
    /// Panics if `trackers` is empty.
    pub fn union(trackers: &[ScopeTracker]) -> ScopeTracker {
        let Some((first, rest)) = trackers.split_first() else {
            panic!("union of zero scope trackers");
        };
        if rest.iter().all(|tracker| tracker == first) {
            return first.clone();
        }

        let all_unreachable = trackers.iter().all(|tracker| tracker.0.is_unreachable);
        let contributing: Vec<&ScopeTracker> = if all_unreachable {
            trackers.iter().collect()
        } else {
            trackers
                .iter()
                .filter(|tracker| !tracker.0.is_unreachable)
                .collect()
        };

        let mut values: FxHashMap<ValueId, TrackedValue> = FxHashMap::default();
        for tracker in trackers {
            for (&id, &tracked) in &tracker.0.values {
                values.entry(id).or_insert(tracked);
            }
        }
        for (id, tracked) in &mut values {
            let mut states = contributing.iter().map(|tracker| {
                tracker
                    .0
                    .values
                    .get(id)
                    .map_or(InitState::No, |value| value.state)
            });
            if let Some(first_state) = states.next() {
                tracked.state = states.fold(first_state, InitState::join);
            }
        }

        ScopeTracker(Rc::new(TrackerState {
            depth: first.0.depth,
            values,
            did_break: join_signal(trackers, |state| state.did_break),
            did_continue: join_signal(trackers, |state| state.did_continue),
            did_return: join_signal(trackers, |state| state.did_return),
            is_unreachable: all_unreachable,
            in_for_loop: first.0.in_for_loop,
        }))
    }

    // ── Values ──────────────────────────────────────────────────────

    /// Start tracking `value` at the current depth.
    pub fn track_value(&mut self, value: ValueId, state: InitState) {
        let depth = self.0.depth;
        self.state_mut()
            .values
            .insert(value, TrackedValue { depth, state });
    }

    /// Mark `value` assigned. Untracked values are ignored.
    pub fn assign(&mut self, value: ValueId) {
        let needs_update = matches!(
            self.0.values.get(&value),
            Some(tracked) if tracked.state != InitState::Yes
        );
        if !needs_update {
            return;
        }
        if let Some(tracked) = self.state_mut().values.get_mut(&value) {
            tracked.state = InitState::Yes;
        }
    }

    /// Initialization state of `value`; untracked values count as assigned.
    pub fn value_state(&self, value: ValueId) -> InitState {
        self.0
            .values
            .get(&value)
            .map_or(InitState::Yes, |tracked| tracked.state)
    }

    // ── Exit signals ────────────────────────────────────────────────

    /// Record a `break`. Returns `false` (and records nothing) outside a loop.
    pub fn issue_break(&mut self) -> bool {
        if !self.0.in_for_loop {
            return false;
        }
        let state = self.state_mut();
        state.did_break = InitState::Yes;
        state.is_unreachable = true;
        true
    }

    /// Record a `continue`. Returns `false` (and records nothing) outside a loop.
    pub fn issue_continue(&mut self) -> bool {
        if !self.0.in_for_loop {
            return false;
        }
        let state = self.state_mut();
        state.did_continue = InitState::Yes;
        state.is_unreachable = true;
        true
    }

    pub fn issue_return(&mut self) {
        let state = self.state_mut();
        state.did_return = InitState::Yes;
        state.is_unreachable = true;
    }

    #[inline]
    pub fn did_break(&self) -> InitState {
        self.0.did_break
    }

    #[inline]
    pub fn did_continue(&self) -> InitState {
        self.0.did_continue
    }

    #[inline]
    pub fn did_return(&self) -> InitState {
        self.0.did_return
    }

    #[inline]
    pub fn is_unreachable(&self) -> bool {
        self.0.is_unreachable
    }

    #[inline]
    pub fn in_for_loop(&self) -> bool {
        self.0.in_for_loop
    }
}

fn join_signal(
    trackers: &[ScopeTracker],
    get: impl Fn(&TrackerState) -> InitState,
) -> InitState {
    trackers
        .iter()
        .map(|tracker| get(&tracker.0))
        .reduce(InitState::join)
        .unwrap_or(InitState::No)
}

#[cfg(test)]
mod tests;
