//! Dense linear probability model.
//!
//! One coefficient row per class; probabilities come from a softmax over
//! the decision scores. Used directly as the secondary (embedding-space)
//! classifier and as the inner step of [`crate::text_clf::TextClassifier`].

use serde::{Deserialize, Serialize};

/// Fitted linear model: `decision = coef · x + intercept`, row per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    /// Class labels in the model's own training order. May be empty for
    /// inner pipeline steps whose labels live elsewhere in the artifact.
    #[serde(default)]
    pub classes: Vec<String>,
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
}

impl LinearModel {
    pub fn n_classes(&self) -> usize {
        self.coef.len()
    }

    pub fn n_features(&self) -> usize {
        self.coef.first().map(|row| row.len()).unwrap_or(0)
    }

    /// Check shape consistency of the deserialized weights.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.coef.is_empty(), "model has no coefficient rows");
        let n_features = self.n_features();
        for (i, row) in self.coef.iter().enumerate() {
            anyhow::ensure!(
                row.len() == n_features,
                "coefficient row {i} has {} features, row 0 has {n_features}",
                row.len()
            );
        }
        anyhow::ensure!(
            self.intercept.len() == self.coef.len(),
            "{} intercepts for {} coefficient rows",
            self.intercept.len(),
            self.coef.len()
        );
        anyhow::ensure!(
            self.classes.is_empty() || self.classes.len() == self.coef.len(),
            "{} class labels for {} coefficient rows",
            self.classes.len(),
            self.coef.len()
        );
        Ok(())
    }

    /// Raw decision scores, one per class.
    pub fn decision(&self, x: &[f32]) -> anyhow::Result<Vec<f32>> {
        anyhow::ensure!(
            x.len() == self.n_features(),
            "input has {} features, model expects {}",
            x.len(),
            self.n_features()
        );
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, &b)| row.iter().zip(x).map(|(&w, &v)| w * v).sum::<f32>() + b)
            .collect())
    }

    /// Probability distribution over classes (softmax over decision scores).
    pub fn predict_proba(&self, x: &[f32]) -> anyhow::Result<Vec<f32>> {
        let mut scores = self.decision(x)?;
        softmax(&mut scores);
        Ok(scores)
    }
}

/// In-place softmax, shifted by the max score for numerical stability.
pub(crate) fn softmax(z: &mut [f32]) {
    let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in z.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in z.iter_mut() {
            *v /= sum;
        }
    }
}
