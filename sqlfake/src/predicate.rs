//! Ordered predicate-keyed lookup.

use std::fmt;

type Predicate<K> = Box<dyn Fn(&K) -> bool + Send + Sync>;

/// An ordered list of `(predicate, value)` pairs.
///
/// [`PredicateMap::find`] returns the value of the first predicate that
/// accepts the key, so registration order decides between overlapping
/// predicates.
pub struct PredicateMap<K: ?Sized, V> {
    entries: Vec<(Predicate<K>, V)>,
}

impl<K: ?Sized, V> PredicateMap<K, V> {
    pub fn new() -> Self {
        Self { entries: vec![] }
    }

    pub fn push(&mut self, predicate: impl Fn(&K) -> bool + Send + Sync + 'static, value: V) {
        self.entries.push((Box::new(predicate), value));
    }

    #[must_use]
    pub fn with(
        mut self,
        predicate: impl Fn(&K) -> bool + Send + Sync + 'static,
        value: V,
    ) -> Self {
        self.push(predicate, value);
        self
    }

    /// Value of the first entry whose predicate accepts `key`.
    pub fn find(&self, key: &K) -> Option<&V> {
        self.entries
            .iter()
            .find(|(predicate, _)| predicate(key))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<K: ?Sized, V> Default for PredicateMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, V: fmt::Debug> fmt::Debug for PredicateMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values()).finish()
    }
}
