//! KeySet - unordered set of target identifiers
//!
//! Tracks dependency lists, fulfilled targets and in-flight targets.
//! Iteration order is unspecified.

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashSet<String>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.keys.remove(key);
    }

    pub fn have(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// New set holding every key of `self` and `other`
    pub fn union(&self, other: &KeySet) -> KeySet {
        let mut ret = self.clone();
        ret.keys.extend(other.keys.iter().cloned());
        ret
    }

    /// Add every key from `keys`
    pub fn absorb<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
    }

    /// True iff every key of `self` is in `other` (vacuously true when empty)
    pub fn is_subset_of(&self, other: &KeySet) -> bool {
        self.keys.iter().all(|k| other.have(k))
    }

    pub fn equal_to(&self, other: &KeySet) -> bool {
        self.is_subset_of(other) && other.is_subset_of(self)
    }

    /// Snapshot of the keys, order unspecified
    pub fn to_vec(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl PartialEq for KeySet {
    fn eq(&self, other: &Self) -> bool {
        self.equal_to(other)
    }
}

impl Eq for KeySet {}

impl<S: Into<String>> FromIterator<S> for KeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeySet::new();
        set.absorb(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for KeySet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.absorb(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> KeySet {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_membership_is_idempotent() {
        let mut s = KeySet::new();
        s.add("a");
        s.add("a");
        assert!(s.have("a"));
        assert_eq!(s.len(), 1);

        s.remove("a");
        s.remove("a");
        assert!(!s.have("a"));
        assert!(s.is_empty());
    }

    #[test]
    fn test_union_does_not_mutate() {
        let a = set(&["a", "b"]);
        let b = set(&["b", "c"]);
        let u = a.union(&b);

        assert_eq!(u, set(&["a", "b", "c"]));
        assert_eq!(a, set(&["a", "b"]));
        assert_eq!(b, set(&["b", "c"]));
    }

    #[test]
    fn test_union_commutative_and_idempotent() {
        let a = set(&["x", "y"]);
        let b = set(&["y", "z"]);
        assert!(a.union(&b).equal_to(&b.union(&a)));
        assert!(a.union(&a).equal_to(&a));
    }

    #[test]
    fn test_absorb() {
        let mut s = set(&["a"]);
        s.absorb(vec!["b".to_string(), "c".to_string()]);
        s.absorb(["a"]);
        let mut keys = s.to_vec();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_subset() {
        let empty = KeySet::new();
        let a = set(&["a"]);
        let ab = set(&["a", "b"]);
        let abc = set(&["a", "b", "c"]);

        assert!(empty.is_subset_of(&empty));
        assert!(empty.is_subset_of(&a));
        assert!(a.is_subset_of(&a));
        assert!(a.is_subset_of(&ab) && ab.is_subset_of(&abc) && a.is_subset_of(&abc));
        assert!(!abc.is_subset_of(&ab));
    }

    #[test]
    fn test_equal_to() {
        assert!(set(&["a", "b"]).equal_to(&set(&["b", "a"])));
        assert!(!set(&["a"]).equal_to(&set(&["a", "b"])));
        assert!(KeySet::new().equal_to(&KeySet::new()));
    }
}
