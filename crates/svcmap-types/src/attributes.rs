//! Instance attribute maps
//!
//! Attributes are free-form string pairs. Three keys are reserved for
//! identity and must always carry the desired values after a write.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace name key
pub const NAMESPACE: &str = "namespace";
/// Service name key
pub const SERVICE_NAME: &str = "service_name";
/// Instance name key, also the lookup key for existing instances
pub const INSTANCE_NAME: &str = "instance_name";
/// Service description key, only consulted when creating a service
pub const DESCRIPTION: &str = "description";
/// Instance type key
pub const TYPE: &str = "type";

/// Keys that identify an instance and are re-asserted after every merge
pub const IDENTITY_KEYS: [&str; 3] = [NAMESPACE, SERVICE_NAME, INSTANCE_NAME];

/// Ordered string-to-string attribute map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key` if present and non-empty
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copy every pair of `other` into `self`, overwriting on collision
    pub fn extend_from(&mut self, other: &Attributes) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Attributes {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
