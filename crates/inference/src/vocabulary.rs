//! Vocabulary index: surface form -> one-hot position

use crate::normalizer::{normalize, variants};
use std::collections::HashMap;
use tracing::debug;

/// Result of matching one free-text symptom against the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomMatch {
    /// Vocabulary position the symptom resolved to
    pub position: usize,
    /// Index key that produced the hit
    pub key: String,
}

/// Many-to-one map from normalized vocabulary terms (and their variants)
/// to vocabulary positions.
///
/// Built once per artifact bundle and read-only afterwards. On key collisions
/// the earlier vocabulary entry wins.
#[derive(Debug, Clone, Default)]
pub struct VocabularyIndex {
    keys: HashMap<String, usize>,
    size: usize,
}

impl VocabularyIndex {
    /// Build the index from a vocabulary in trained order
    pub fn build<S: AsRef<str>>(vocabulary: &[S]) -> Self {
        let mut keys = HashMap::with_capacity(vocabulary.len() * 2);
        let mut collisions = 0usize;

        for (position, term) in vocabulary.iter().enumerate() {
            let canonical = normalize(term.as_ref());
            for variant in variants(&canonical) {
                if keys.contains_key(variant) {
                    collisions += 1;
                    continue;
                }
                keys.insert(variant.to_string(), position);
            }
        }

        debug!(
            "Built vocabulary index: {} terms, {} keys, {} collisions",
            vocabulary.len(),
            keys.len(),
            collisions
        );

        Self {
            keys,
            size: vocabulary.len(),
        }
    }

    /// Number of vocabulary entries (the one-hot vector length)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of distinct keys in the index
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Resolve an index key directly
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.keys.get(key).copied()
    }

    /// Match a free-text symptom: normalize it, then try its variants in
    /// order; the first variant present in the index decides.
    pub fn match_symptom(&self, text: &str) -> Option<SymptomMatch> {
        let canonical = normalize(text);
        variants(&canonical).into_iter().find_map(|variant| {
            self.keys.get(variant).map(|&position| SymptomMatch {
                position,
                key: variant.to_string(),
            })
        })
    }
}
