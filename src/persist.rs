//! Save/restore of scalar settings through an external key-value tree.
//!
//! The host owns the actual project format. This crate only hands it flat
//! `key → f64` pairs (routing modes, step values, sequencer settings) and
//! reads them back.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A generic key-value state tree supplied by the host.
pub trait StateTree {
    fn get(&self, key: &str) -> Option<f64>;
    fn set(&mut self, key: &str, value: f64);
}

/// In-memory [`StateTree`], ordered by key.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTree {
    values: BTreeMap<String, f64>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl StateTree for MemoryTree {
    fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_tree() {
        let mut tree = MemoryTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.get("seq.rate"), None);

        tree.set("seq.rate", 2.0);
        tree.set("seq.rate", 4.0);
        tree.set("osc.pitch", 440.0);

        assert_eq!(tree.get("seq.rate"), Some(4.0));
        assert_eq!(tree.len(), 2);
        let keys: Vec<_> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["osc.pitch", "seq.rate"]);
    }
}
