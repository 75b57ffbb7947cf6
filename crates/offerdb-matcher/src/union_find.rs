use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint-set forest with path compression, used to resolve soft-merged
/// relations to the live relation they were folded into.
///
/// Unions are directed: [`DisjointSet::union_into`] always keeps the root of
/// its second argument, so the caller controls which relation survives.
#[derive(Debug, Clone)]
pub struct DisjointSet<K> {
    parent: HashMap<K, K>,
}

impl<K: Eq + Hash + Clone> Default for DisjointSet<K> {
    fn default() -> Self {
        Self {
            parent: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> DisjointSet<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` as its own root. No-op if it is already known.
    pub fn make_set(&mut self, key: K) {
        self.parent.entry(key.clone()).or_insert(key);
    }

    /// Root of `key`'s set. Unknown keys are their own root.
    pub fn find(&mut self, key: &K) -> K {
        let mut root = key.clone();
        while let Some(parent) = self.parent.get(&root) {
            if *parent == root {
                break;
            }
            root = parent.clone();
        }

        let mut current = key.clone();
        while current != root {
            match self.parent.insert(current, root.clone()) {
                Some(next) => current = next,
                None => break,
            }
        }
        root
    }

    /// Joins `child`'s set into `root`'s set, keeping `root`'s root.
    /// Returns `false` if they were already joined.
    pub fn union_into(&mut self, child: &K, root: &K) -> bool {
        self.make_set(child.clone());
        self.make_set(root.clone());
        let child_root = self.find(child);
        let survivor = self.find(root);
        if child_root == survivor {
            return false;
        }
        self.parent.insert(child_root, survivor);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_is_own_root() {
        let mut sets: DisjointSet<&str> = DisjointSet::new();
        assert_eq!(sets.find(&"a"), "a");
        assert!(sets.is_empty());
    }

    #[test]
    fn union_keeps_second_root() {
        let mut sets = DisjointSet::new();
        assert!(sets.union_into(&"b", &"a"));
        assert_eq!(sets.find(&"b"), "a");
        assert_eq!(sets.find(&"a"), "a");
    }

    #[test]
    fn chains_resolve_to_final_root() {
        let mut sets = DisjointSet::new();
        sets.union_into(&"c", &"b");
        sets.union_into(&"b", &"a");
        assert_eq!(sets.find(&"c"), "a");
        assert_eq!(sets.len(), 3);
    }

    #[test]
    fn repeated_union_is_noop() {
        let mut sets = DisjointSet::new();
        assert!(sets.union_into(&"b", &"a"));
        assert!(!sets.union_into(&"b", &"a"));
        // A reversed edge would form a cycle; it is ignored instead.
        assert!(!sets.union_into(&"a", &"b"));
        assert_eq!(sets.find(&"a"), "a");
    }

    #[test]
    fn union_of_roots_via_members() {
        let mut sets = DisjointSet::new();
        sets.union_into(&"x1", &"x");
        sets.union_into(&"y1", &"y");
        sets.union_into(&"y1", &"x1");
        assert_eq!(sets.find(&"y"), "x");
    }
}
