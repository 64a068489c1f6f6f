//! Per-request prediction result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::labels::LabelSet;

/// Result of classifying one piece of text: the arg-max label, its score,
/// and the full label → score mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_genre: String,
    pub confidence: f32,
    pub scores: BTreeMap<String, f32>,
}

impl Prediction {
    /// Build a prediction from a probability vector aligned to `labels`.
    ///
    /// Returns `None` when the vector is empty or its length disagrees with
    /// the label set. Ties break toward the lowest canonical index (strict
    /// `>` comparison keeps the first maximum).
    pub fn from_scores(labels: &LabelSet, probs: &[f32]) -> Option<Self> {
        if probs.is_empty() || probs.len() != labels.len() {
            return None;
        }

        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }

        let scores = labels
            .iter()
            .zip(probs)
            .map(|(label, &p)| (label.to_string(), p))
            .collect();

        Some(Self {
            predicted_genre: labels.get(best)?.to_string(),
            confidence: probs[best],
            scores,
        })
    }
}
