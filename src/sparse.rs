/*!
A sparse set over small integers with constant time insertion, membership
and clearing.
*/

/// A set of `usize` values bounded by a fixed capacity.
///
/// The trick is the usual sparse/dense pairing: `sparse[v]` names a slot in
/// `dense`, and `v` is a member exactly when that slot is in bounds and
/// points back at `v`. Stale entries in `sparse` are harmless, which is
/// what makes `clear` constant time. Iteration over `dense` yields members
/// in insertion order, which the Pike VM relies on for thread priority.
#[derive(Clone, Debug)]
pub(crate) struct SparseSet {
    dense: Vec<usize>,
    sparse: Vec<usize>,
}

impl SparseSet {
    pub(crate) fn new(capacity: usize) -> SparseSet {
        SparseSet { dense: Vec::with_capacity(capacity), sparse: vec![0; capacity] }
    }

    /// Insert `value` into the set, returning false when it was already
    /// present.
    pub(crate) fn insert(&mut self, value: usize) -> bool {
        if self.contains(value) {
            return false;
        }
        self.sparse[value] = self.dense.len();
        self.dense.push(value);
        true
    }

    pub(crate) fn contains(&self, value: usize) -> bool {
        self.sparse
            .get(value)
            .map_or(false, |&slot| self.dense.get(slot) == Some(&value))
    }

    pub(crate) fn clear(&mut self) {
        self.dense.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut set = SparseSet::new(10);
        assert!(set.insert(3));
        assert!(set.insert(7));
        assert!(!set.insert(3));
        assert!(set.contains(3));
        assert!(set.contains(7));
        assert!(!set.contains(4));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut set = SparseSet::new(4);
        set.insert(0);
        set.insert(3);
        set.clear();
        assert!(!set.contains(0));
        assert!(!set.contains(3));
        assert!(set.insert(3));
    }
}
