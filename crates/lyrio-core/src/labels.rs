//! Canonical genre label ordering.
//!
//! The canonical order defines the index space for every probability vector
//! in the system. Classifiers trained separately may have learned their
//! label sets in a different insertion order, so their outputs must be
//! permuted into canonical order (by label value) before blending.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("label {label:?} missing from the other classifier's label set")]
    MissingLabel { label: String },

    #[error("probability vector has {got} entries, label set has {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Ordered sequence of class labels.
///
/// Serialises as a plain JSON array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Permutation mapping canonical order onto `other`'s order.
    ///
    /// Entry `i` is the index within `other` holding the same label as
    /// canonical index `i`. Fails if any canonical label is absent from
    /// `other` — a model-consistency bug, not a user input problem.
    pub fn alignment(&self, other: &[String]) -> Result<Vec<usize>, AlignError> {
        self.0
            .iter()
            .map(|label| {
                other
                    .iter()
                    .position(|o| o == label)
                    .ok_or_else(|| AlignError::MissingLabel {
                        label: label.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn alignment_identity() {
        let canonical = LabelSet::new(labels(&["pop", "rock", "jazz"]));
        let order = canonical.alignment(&labels(&["pop", "rock", "jazz"])).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn alignment_permutation() {
        let canonical = LabelSet::new(labels(&["pop", "rock", "jazz"]));
        let order = canonical.alignment(&labels(&["rock", "jazz", "pop"])).unwrap();
        // canonical "pop" lives at index 2 of the other order, etc.
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn alignment_missing_label() {
        let canonical = LabelSet::new(labels(&["pop", "rock"]));
        let err = canonical.alignment(&labels(&["pop"])).unwrap_err();
        assert_eq!(
            err,
            AlignError::MissingLabel {
                label: "rock".into()
            }
        );
    }

    #[test]
    fn serialises_as_plain_array() {
        let set = LabelSet::new(labels(&["pop", "rock"]));
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["pop","rock"]"#);

        let parsed: LabelSet = serde_json::from_str(r#"["jazz"]"#).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get(0), Some("jazz"));
    }
}
