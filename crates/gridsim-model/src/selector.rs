//! Equality-based label selector.
//!
//! The snapshot layer only ever asks "does this workload's label mapping
//! satisfy the selector"; the richer selector grammar of real cluster
//! APIs (set operators, inequality) stays outside the simulator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A predicate over a label mapping.
///
/// An empty selector matches every label mapping, so
/// `Selector::everything()` lists all workloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    requirements: BTreeMap<String, String>,
}

impl Selector {
    /// The selector that matches everything.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Add an equality requirement: the labels must carry `key=value`.
    pub fn require(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    /// Whether the given labels satisfy every requirement.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }

    /// Whether this selector matches all label mappings.
    pub fn is_everything(&self) -> bool {
        self.requirements.is_empty()
    }
}
