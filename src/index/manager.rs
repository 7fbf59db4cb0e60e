//! Manager for composite and mixed indexes
//!
//! Holds the index data for every index declared in the schema and keeps it
//! in step with element writes.

use super::property_index::PropertyIndex;
use crate::graph::{ElementId, PropertyMap, PropertyValue};
use crate::schema::{ElementKind, IndexDefinition, IndexType, Schema};
use indexmap::IndexMap;
use std::ops::Bound;
use thiserror::Error;

/// A write would give two elements the same values in a unique index
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unique index '{index}' already contains {value}")]
pub struct UniqueViolation {
    pub index: String,
    pub value: String,
}

#[derive(Debug, Clone)]
enum IndexData {
    Composite(PropertyIndex<Vec<PropertyValue>>),
    Mixed(IndexMap<String, PropertyIndex<PropertyValue>>),
}

#[derive(Debug, Clone)]
struct ManagedIndex {
    definition: IndexDefinition,
    data: IndexData,
}

impl ManagedIndex {
    fn new(definition: IndexDefinition) -> Self {
        let data = match definition.index_type {
            IndexType::Composite { .. } => IndexData::Composite(PropertyIndex::new()),
            IndexType::Mixed { .. } => IndexData::Mixed(
                definition
                    .keys
                    .iter()
                    .map(|k| (k.clone(), PropertyIndex::new()))
                    .collect(),
            ),
        };
        ManagedIndex { definition, data }
    }

    /// Composite key of an element, present only when every key is set
    fn composite_key(&self, props: &PropertyMap) -> Option<Vec<PropertyValue>> {
        self.definition
            .keys
            .iter()
            .map(|k| props.get(k).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    fn insert(&mut self, element: ElementId, props: &PropertyMap) {
        let key = self.composite_key(props);
        match &mut self.data {
            IndexData::Composite(index) => {
                if let Some(key) = key {
                    index.insert(key, element);
                }
            }
            IndexData::Mixed(per_key) => {
                for (name, index) in per_key.iter_mut() {
                    if let Some(value) = props.get(name).filter(|v| !v.is_null()) {
                        index.insert(value.clone(), element);
                    }
                }
            }
        }
    }

    fn remove(&mut self, element: ElementId, props: &PropertyMap) {
        let key = self.composite_key(props);
        match &mut self.data {
            IndexData::Composite(index) => {
                if let Some(key) = key {
                    index.remove(&key, element);
                }
            }
            IndexData::Mixed(per_key) => {
                for (name, index) in per_key.iter_mut() {
                    if let Some(value) = props.get(name) {
                        index.remove(value, element);
                    }
                }
            }
        }
    }

    fn check_unique(&self, element: ElementId, props: &PropertyMap) -> Result<(), UniqueViolation> {
        if !self.definition.is_unique() {
            return Ok(());
        }
        let (index, key) = match (&self.data, self.composite_key(props)) {
            (IndexData::Composite(index), Some(key)) => (index, key),
            _ => return Ok(()),
        };
        if index.contains_other(&key, element) {
            let value = key.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
            return Err(UniqueViolation {
                index: self.definition.name.clone(),
                value,
            });
        }
        Ok(())
    }
}

/// Manager for all graph indexes
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    indexes: IndexMap<String, ManagedIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty indexes for every definition in the schema
    pub fn from_schema(schema: &Schema) -> Self {
        let indexes = schema
            .indexes
            .values()
            .map(|def| (def.name.clone(), ManagedIndex::new(def.clone())))
            .collect();
        IndexManager { indexes }
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    pub fn index_names(&self) -> Vec<&str> {
        self.indexes.keys().map(|k| k.as_str()).collect()
    }

    /// Number of postings held by an index
    pub fn posting_count(&self, name: &str) -> usize {
        match self.indexes.get(name).map(|idx| &idx.data) {
            Some(IndexData::Composite(index)) => index.len(),
            Some(IndexData::Mixed(per_key)) => per_key.values().map(|i| i.len()).sum(),
            None => 0,
        }
    }

    /// Move an element's postings from `old` to `new` properties
    ///
    /// `old` is `None` for a new element, `new` is `None` for a removed one.
    /// Unique constraints are checked before anything changes.
    pub fn update(
        &mut self,
        kind: ElementKind,
        element: ElementId,
        old: Option<&PropertyMap>,
        new: Option<&PropertyMap>,
    ) -> Result<(), UniqueViolation> {
        if let Some(new) = new {
            for index in self.covering(kind) {
                index.check_unique(element, new)?;
            }
        }
        for index in self.indexes.values_mut().filter(|i| i.definition.element == kind) {
            if let Some(old) = old {
                index.remove(element, old);
            }
            if let Some(new) = new {
                index.insert(element, new);
            }
        }
        Ok(())
    }

    /// Exact-match lookup on a single key, if an index can answer it
    pub fn lookup(
        &self,
        kind: ElementKind,
        key: &str,
        value: &PropertyValue,
    ) -> Option<Vec<ElementId>> {
        let single = self
            .covering(kind)
            .find(|i| matches!(i.data, IndexData::Composite(_)) && i.definition.keys == [key]);
        if let Some(ManagedIndex {
            data: IndexData::Composite(index),
            ..
        }) = single
        {
            return Some(index.get(&vec![value.clone()]));
        }
        self.mixed_for(kind, key).map(|index| index.get(value))
    }

    /// Range lookup on one key, if a mixed index covers it
    pub fn lookup_range(
        &self,
        kind: ElementKind,
        key: &str,
        lower: Bound<&PropertyValue>,
        upper: Bound<&PropertyValue>,
    ) -> Option<Vec<ElementId>> {
        self.mixed_for(kind, key)
            .map(|index| index.range((lower.cloned(), upper.cloned())))
    }

    pub fn supports_range(&self, kind: ElementKind, key: &str) -> bool {
        self.mixed_for(kind, key).is_some()
    }

    pub fn clear(&mut self) {
        for index in self.indexes.values_mut() {
            match &mut index.data {
                IndexData::Composite(i) => i.clear(),
                IndexData::Mixed(per_key) => per_key.values_mut().for_each(|i| i.clear()),
            }
        }
    }

    fn covering(&self, kind: ElementKind) -> impl Iterator<Item = &ManagedIndex> {
        self.indexes.values().filter(move |i| i.definition.element == kind)
    }

    fn mixed_for(&self, kind: ElementKind, key: &str) -> Option<&PropertyIndex<PropertyValue>> {
        self.covering(kind).find_map(|i| match &i.data {
            IndexData::Mixed(per_key) => per_key.get(key),
            IndexData::Composite(_) => None,
        })
    }
}
