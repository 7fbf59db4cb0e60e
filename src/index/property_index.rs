//! B-Tree based property index

use crate::graph::ElementId;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Bound, RangeBounds};

/// Sorted index from a key to the elements carrying it
#[derive(Debug, Clone)]
pub struct PropertyIndex<K: Ord> {
    index: BTreeMap<K, BTreeSet<ElementId>>,
}

impl<K: Ord + Clone> PropertyIndex<K> {
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, element: ElementId) {
        self.index.entry(key).or_default().insert(element);
    }

    pub fn remove(&mut self, key: &K, element: ElementId) {
        if let Some(elements) = self.index.get_mut(key) {
            elements.remove(&element);
            if elements.is_empty() {
                self.index.remove(key);
            }
        }
    }

    pub fn get(&self, key: &K) -> Vec<ElementId> {
        self.index
            .get(key)
            .map(|elements| elements.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether any element other than `except` carries `key`
    pub fn contains_other(&self, key: &K, except: ElementId) -> bool {
        self.index
            .get(key)
            .is_some_and(|elements| elements.iter().any(|e| *e != except))
    }

    pub fn range<R>(&self, range: R) -> Vec<ElementId>
    where
        R: RangeBounds<K>,
    {
        let mut result = Vec::new();
        if is_empty(&range) {
            return result;
        }
        for (_, elements) in self.index.range(range) {
            result.extend(elements.iter().copied());
        }
        result
    }

    pub fn len(&self) -> usize {
        self.index.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }
}

/// Ranges that hold no key, including inverted ones `BTreeMap::range` rejects
fn is_empty<K: Ord, R: RangeBounds<K>>(range: &R) -> bool {
    match (range.start_bound(), range.end_bound()) {
        (Bound::Included(start), Bound::Included(end)) => start > end,
        (Bound::Included(start), Bound::Excluded(end))
        | (Bound::Excluded(start), Bound::Included(end))
        | (Bound::Excluded(start), Bound::Excluded(end)) => start >= end,
        _ => false,
    }
}

impl<K: Ord + Clone> Default for PropertyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PropertyValue, VertexId};
    use std::ops::Bound;

    fn v(id: u64) -> ElementId {
        ElementId::Vertex(VertexId::new(id))
    }

    #[test]
    fn test_property_index_ops() {
        let mut index = PropertyIndex::new();
        let val = PropertyValue::Integer(100);

        index.insert(val.clone(), v(1));
        index.insert(val.clone(), v(2));

        let results = index.get(&val);
        assert_eq!(results, vec![v(1), v(2)]);
        assert!(index.contains_other(&val, v(1)));

        index.remove(&val, v(1));
        assert_eq!(index.get(&val), vec![v(2)]);
        assert!(!index.contains_other(&val, v(2)));

        index.remove(&val, v(2));
        assert!(index.is_empty());
    }

    #[test]
    fn test_property_index_range() {
        let mut index = PropertyIndex::new();
        for i in 1..=10 {
            index.insert(PropertyValue::Integer(i), v(i as u64));
        }

        let range = (
            Bound::Included(PropertyValue::Integer(3)),
            Bound::Included(PropertyValue::Integer(7)),
        );
        let results = index.range(range);

        assert_eq!(results.len(), 5);
        for i in 3..=7 {
            assert!(results.contains(&v(i)));
        }
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_empty_and_inverted_ranges() {
        let mut index = PropertyIndex::new();
        for i in 1..=10 {
            index.insert(PropertyValue::Integer(i), v(i as u64));
        }
        let int = PropertyValue::Integer;

        assert!(index.range(int(7)..int(3)).is_empty());
        assert!(index.range(int(7)..=int(3)).is_empty());
        assert!(index.range(int(5)..int(5)).is_empty());
        assert!(index.range((Bound::Excluded(int(5)), Bound::Excluded(int(5)))).is_empty());
        assert!(index.range((Bound::Excluded(int(5)), Bound::Included(int(5)))).is_empty());
        assert_eq!(index.range(int(5)..=int(5)), vec![v(5)]);

        // floats sort after every integer
        let float = PropertyValue::Float(19.5);
        assert!(index.range((Bound::Included(float), Bound::Excluded(int(30)))).is_empty());
    }

    #[test]
    fn test_composite_keys() {
        let mut index: PropertyIndex<Vec<PropertyValue>> = PropertyIndex::new();
        index.insert(vec!["loves waves".into(), PropertyValue::Integer(1)], v(1));
        assert_eq!(index.get(&vec!["loves waves".into(), PropertyValue::Integer(1)]), vec![v(1)]);
        assert!(index.get(&vec!["loves waves".into()]).is_empty());
    }
}
