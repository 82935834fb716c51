use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// A sparse vector mapping feature identifiers to real values
///
/// Numeric features are keyed by `u32` uids, symbolic features by their
/// string names. Absent keys have an implicit value of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector<K: Eq + Hash = u32> {
    values: HashMap<K, f64>,
}

impl<K: Eq + Hash> FeatureVector<K> {
    /// Create an empty feature vector
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Number of explicitly stored features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no feature is stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a feature, zero if absent
    pub fn get(&self, key: &K) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Set the value of a feature, returning the previous value if any
    pub fn insert(&mut self, key: K, value: f64) -> Option<f64> {
        self.values.insert(key, value)
    }

    /// Add `by` to the value of a feature
    pub fn increment(&mut self, key: K, by: f64) {
        *self.values.entry(key).or_insert(0.0) += by;
    }

    pub fn remove(&mut self, key: &K) -> Option<f64> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Iterate over all stored (key, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.values.iter().map(|(k, &v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.values.keys()
    }

    /// Drop all features for which `keep` returns `false`
    pub fn retain<F: FnMut(&K, f64) -> bool>(&mut self, mut keep: F) {
        self.values.retain(|k, v| keep(k, *v));
    }

    /// Inner product with another vector
    pub fn dot(&self, other: &FeatureVector<K>) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .values
            .iter()
            .map(|(k, v)| v * large.get(k))
            .sum()
    }

    /// Squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.values().map(|v| v * v).sum()
    }
}

impl<K: Eq + Hash + Clone> FeatureVector<K> {
    /// `self += scale * other`
    pub fn add_scaled(&mut self, other: &FeatureVector<K>, scale: f64) {
        if scale == 0.0 {
            return;
        }
        for (k, v) in &other.values {
            self.increment(k.clone(), scale * v);
        }
    }

    /// Element-wise difference `self - other`
    pub fn difference(&self, other: &FeatureVector<K>) -> FeatureVector<K> {
        let mut diff = self.clone();
        diff.add_scaled(other, -1.0);
        diff.retain(|_, v| v != 0.0);
        diff
    }
}

impl<K: Eq + Hash> Default for FeatureVector<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> FromIterator<(K, f64)> for FeatureVector<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut fv = FeatureVector::new();
        for (k, v) in iter {
            fv.increment(k, v);
        }
        fv
    }
}
