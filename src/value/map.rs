use std::hash::{Hash, Hasher};

use codemap::Spanned;
use indexmap::{map::IntoIter, IndexMap};

use crate::common::{Brackets, ListSeparator};

use super::Value;

/// A Sass map.
///
/// Keys preserve insertion order and compare by value equality; both are
/// contractual, so the backing store is an [`IndexMap`].
#[derive(Debug, Clone, Default)]
pub struct ValueMap(IndexMap<MapKey, Value>);

/// A map key: a value plus the span it was written at, hashed and compared
/// by the value alone.
#[derive(Debug, Eq, Clone)]
#[repr(transparent)]
pub struct MapKey(pub Spanned<Value>);

impl MapKey {
    fn wrap_ref(val: &Spanned<Value>) -> &MapKey {
        // Safe because `MapKey` is a repr(transparent) wrapper over
        // `Spanned<Value>`. Avoids cloning keys on every lookup.
        unsafe { &*(val as *const Spanned<Value> as *const MapKey) }
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.node == other.0.node
    }
}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.node.hash(state);
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ValueMap {}

impl ValueMap {
    pub fn new() -> ValueMap {
        ValueMap(IndexMap::new())
    }

    pub fn new_with(elements: Vec<(Spanned<Value>, Value)>) -> ValueMap {
        ValueMap(
            elements
                .into_iter()
                .map(|(k, v)| (MapKey(k), v))
                .collect(),
        )
    }

    pub fn get(&self, key: &Spanned<Value>) -> Option<Value> {
        self.0.get(MapKey::wrap_ref(key)).cloned()
    }

    pub fn key_exists(&self, key: &Spanned<Value>) -> bool {
        self.0.contains_key(MapKey::wrap_ref(key))
    }

    pub fn remove(&mut self, key: &Spanned<Value>) {
        self.0.shift_remove(MapKey::wrap_ref(key));
    }

    /// Merge `other` into `self`. Keys already present keep their position;
    /// new keys append in `other`'s order.
    pub fn merge(&mut self, other: ValueMap) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Spanned<Value>, &Value)> + '_ {
        self.0.iter().map(|(k, v)| (&k.0, v))
    }

    pub fn keys(self) -> Vec<Value> {
        self.0.into_keys().map(|k| k.0.node).collect()
    }

    pub fn values(self) -> Vec<Value> {
        self.0.into_values().collect()
    }

    pub fn as_list(self) -> Vec<Value> {
        self.0
            .into_iter()
            .map(|(k, v)| Value::List(vec![k.0.node, v], ListSeparator::Space, Brackets::None))
            .collect()
    }

    /// Returns `true` if the key was already present.
    pub fn insert(&mut self, key: Spanned<Value>, value: Value) -> bool {
        self.0.insert(MapKey(key), value).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for ValueMap {
    type Item = (MapKey, Value);
    type IntoIter = IntoIter<MapKey, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
