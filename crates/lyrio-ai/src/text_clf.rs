//! Primary text classifier: TF-IDF features into a linear model, with
//! optional per-class sigmoid (Platt) calibration.

use serde::{Deserialize, Serialize};

use crate::linear::{LinearModel, softmax};
use crate::tfidf::TfidfVectorizer;

/// Per-class sigmoid calibration fitted on decision scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(default)]
    pub classes: Vec<String>,
    /// Sigmoid slope per class.
    pub a: Vec<f32>,
    /// Sigmoid offset per class.
    pub b: Vec<f32>,
}

impl Calibration {
    /// Map decision scores to a normalised probability distribution.
    pub fn apply(&self, scores: &[f32]) -> anyhow::Result<Vec<f32>> {
        anyhow::ensure!(
            self.a.len() == scores.len() && self.b.len() == scores.len(),
            "calibration has {}/{} parameters for {} classes",
            self.a.len(),
            self.b.len(),
            scores.len()
        );
        let mut probs: Vec<f32> = scores
            .iter()
            .zip(self.a.iter().zip(&self.b))
            .map(|(&z, (&a, &b))| 1.0 / (1.0 + (-(a * z + b)).exp()))
            .collect();
        let sum: f32 = probs.iter().sum();
        if sum > 0.0 {
            for p in &mut probs {
                *p /= sum;
            }
        }
        Ok(probs)
    }
}

/// Serialized text classification pipeline.
///
/// Label ordering can live in three places depending on how the artifact
/// was exported; see [`TextClassifier::labels`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextClassifier {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LinearModel,
    #[serde(default)]
    pub calibration: Option<Calibration>,
    /// Direct label list, last resort for older artifact exports.
    #[serde(default)]
    pub classes: Vec<String>,
}

impl TextClassifier {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.vectorizer.validate()?;
        self.classifier.validate()?;
        anyhow::ensure!(
            self.classifier.n_features() == self.vectorizer.dim(),
            "classifier expects {} features, vectorizer produces {}",
            self.classifier.n_features(),
            self.vectorizer.dim()
        );
        if let Some(cal) = &self.calibration {
            anyhow::ensure!(
                cal.a.len() == self.classifier.n_classes()
                    && cal.b.len() == self.classifier.n_classes(),
                "calibration covers {} classes, classifier has {}",
                cal.a.len(),
                self.classifier.n_classes()
            );
        }
        Ok(())
    }

    /// Probability distribution over this classifier's own label order.
    pub fn predict_proba(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let features = self.vectorizer.transform(text);
        let mut scores = self.classifier.decision(&features)?;
        match &self.calibration {
            Some(cal) => cal.apply(&scores),
            None => {
                softmax(&mut scores);
                Ok(scores)
            }
        }
    }

    /// Class labels, probed through an ordered strategy chain: calibration
    /// labels, then the inner classifier's labels, then the direct
    /// `classes` field. First non-empty list wins; `None` if all fail.
    pub fn labels(&self) -> Option<&[String]> {
        let strategies: [fn(&TextClassifier) -> &[String]; 3] = [
            |c| {
                c.calibration
                    .as_ref()
                    .map(|cal| cal.classes.as_slice())
                    .unwrap_or(&[])
            },
            |c| c.classifier.classes.as_slice(),
            |c| c.classes.as_slice(),
        ];
        strategies
            .iter()
            .map(|probe| probe(self))
            .find(|labels| !labels.is_empty())
    }
}
