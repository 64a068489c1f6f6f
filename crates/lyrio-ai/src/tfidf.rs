//! TF-IDF vectorizer over lowercased word tokens.
//!
//! Mirrors the featurisation the classifier was trained with: tokens are
//! runs of alphanumeric/underscore characters at least two characters long,
//! lowercased, weighted by stored idf values, and L2-normalised.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Fitted TF-IDF vocabulary and idf weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// token → feature index
    pub vocabulary: HashMap<String, usize>,
    /// idf weight per feature index
    pub idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Feature-space dimensionality.
    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    /// Check internal consistency: every vocabulary index must address an
    /// idf weight.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (token, &idx) in &self.vocabulary {
            anyhow::ensure!(
                idx < self.idf.len(),
                "vocabulary entry {token:?} points at feature {idx}, but only {} idf weights are stored",
                self.idf.len()
            );
        }
        Ok(())
    }

    /// Transform text into an L2-normalised tf-idf vector.
    ///
    /// Out-of-vocabulary tokens contribute nothing; text with no known
    /// tokens yields the zero vector.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut features = vec![0.0f32; self.dim()];

        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token)
                && let Some(count) = features.get_mut(idx)
            {
                *count += 1.0;
            }
        }

        for (idx, value) in features.iter_mut().enumerate() {
            *value *= self.idf[idx];
        }

        normalize(&mut features);
        features
    }
}

/// Lowercased word tokens: runs of alphanumerics/underscore, length ≥ 2.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
}

/// L2-normalize a vector in place.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
