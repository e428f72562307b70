//! Key-set algebra for peer subscriptions.
//!
//! Pure operations, no I/O, no failure modes. The matcher and the peer
//! registry are built on these two functions.

use std::collections::HashSet;

use crate::protocol::Key;

/// Apply a join/leave update: `(current ∪ join) \ leave`.
///
/// A key appearing in both `join` and `leave` is removed — leave wins.
pub fn apply_join_leave(current: &HashSet<Key>, join: &[Key], leave: &[Key]) -> HashSet<Key> {
    let mut next: HashSet<Key> = current.clone();
    next.extend(join.iter().cloned());
    for key in leave {
        next.remove(key);
    }
    next
}

/// Set intersection. Iteration order is unspecified.
pub fn intersect(a: &HashSet<Key>, b: &HashSet<Key>) -> HashSet<Key> {
    a.intersection(b).cloned().collect()
}
