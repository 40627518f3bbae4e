//! Build environment and free-form metadata
//!
//! [`Environment`] is opaque to assets: it is only serialized (for identity
//! and cache keys) and merged (when deriving children and dependencies).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form metadata attached to assets and dependencies
pub type Meta = BTreeMap<String, Value>;

/// Merge two metadata maps, `overrides` winning on key collision
#[must_use]
pub fn merge_meta(base: &Meta, overrides: &Meta) -> Meta {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Build target / environment description
///
/// Field order is canonical (sorted), so serialization is deterministic and
/// safe to feed into identity hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    fields: BTreeMap<String, Value>,
}

impl Environment {
    /// Create empty environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a field set
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Number of fields set
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produce a new environment with `overrides` layered on top
    ///
    /// `self` is never mutated.
    #[must_use]
    pub fn merge(&self, overrides: Option<&Environment>) -> Environment {
        match overrides {
            None => self.clone(),
            Some(overrides) => {
                let mut fields = self.fields.clone();
                fields.extend(
                    overrides
                        .fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
                Environment { fields }
            }
        }
    }

    /// Canonical JSON encoding used by identity and cache-key derivation
    ///
    /// # Errors
    /// Returns error if a field value cannot be serialized
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromIterator<(String, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
