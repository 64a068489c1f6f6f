//! Per-request prediction over a resolved model artifact.

use std::sync::Mutex;

use lyrio_core::{AlignError, LabelSet, Prediction};
use thiserror::Error;

use crate::ensemble;
use crate::linear::LinearModel;
use crate::text_clf::TextClassifier;

/// Anything that can turn raw text into a fixed-length embedding vector.
///
/// Implemented by the ONNX [`crate::Embedder`]; test code substitutes
/// lightweight fakes.
pub trait TextEncoder {
    fn encode(&mut self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[derive(Debug, Error)]
pub enum PredictError {
    /// Client-input fault: blank request text. Every other variant is a
    /// per-request computation fault.
    #[error("empty text")]
    EmptyText,

    #[error("primary classifier failed: {0}")]
    Primary(#[source] anyhow::Error),

    #[error("text encoding failed: {0}")]
    Encoding(#[source] anyhow::Error),

    #[error("secondary classifier failed: {0}")]
    Secondary(#[source] anyhow::Error),

    #[error("label alignment failed: {0}")]
    Alignment(#[from] AlignError),

    #[error("classifier returned {got} scores for {expected} classes")]
    ScoreShape { expected: usize, got: usize },
}

impl PredictError {
    /// Whether the fault is the caller's (blank input) rather than a
    /// server-side computation failure.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::EmptyText)
    }
}

enum Engine<E> {
    Single {
        classifier: TextClassifier,
    },
    Ensemble {
        primary: TextClassifier,
        secondary: LinearModel,
        /// ONNX sessions need `&mut` to run, so only the encoder sits
        /// behind a lock; everything else is shared read-only.
        encoder: Mutex<E>,
        weight: f32,
    },
}

/// Loaded genre model: canonical labels plus a single-classifier or
/// ensemble inference engine.
///
/// Constructed once at startup by [`crate::artifact`] and never mutated.
/// `predict` takes `&self`, so concurrent requests share the model
/// without locking; ensemble mode serialises only the encode step.
pub struct GenreModel<E> {
    labels: LabelSet,
    engine: Engine<E>,
}

impl<E: TextEncoder> GenreModel<E> {
    pub fn single(classifier: TextClassifier, labels: LabelSet) -> Self {
        Self {
            labels,
            engine: Engine::Single { classifier },
        }
    }

    pub fn ensemble(
        primary: TextClassifier,
        secondary: LinearModel,
        encoder: E,
        weight: f32,
        labels: LabelSet,
    ) -> Self {
        Self {
            labels,
            engine: Engine::Ensemble {
                primary,
                secondary,
                encoder: Mutex::new(encoder),
                weight,
            },
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn is_ensemble(&self) -> bool {
        matches!(self.engine, Engine::Ensemble { .. })
    }

    /// Classify one piece of text.
    ///
    /// Blank input is rejected before any model is invoked. Failures in the
    /// primary, encoding, secondary, and alignment stages surface as
    /// distinct variants so the HTTP layer can report which stage broke.
    pub fn predict(&self, text: &str) -> Result<Prediction, PredictError> {
        if text.trim().is_empty() {
            return Err(PredictError::EmptyText);
        }

        let probs = match &self.engine {
            Engine::Single { classifier } => classifier
                .predict_proba(text)
                .map_err(PredictError::Primary)?,
            Engine::Ensemble {
                primary,
                secondary,
                encoder,
                weight,
            } => {
                let primary_probs = primary
                    .predict_proba(text)
                    .map_err(PredictError::Primary)?;
                let embedding = {
                    let mut encoder = encoder.lock().map_err(|_| {
                        PredictError::Encoding(anyhow::anyhow!("encoder lock poisoned"))
                    })?;
                    encoder.encode(text).map_err(PredictError::Encoding)?
                };
                let secondary_probs = secondary
                    .predict_proba(&embedding)
                    .map_err(PredictError::Secondary)?;
                ensemble::blend(
                    &primary_probs,
                    &secondary_probs,
                    &secondary.classes,
                    &self.labels,
                    *weight,
                )?
            }
        };

        Prediction::from_scores(&self.labels, &probs).ok_or(PredictError::ScoreShape {
            expected: self.labels.len(),
            got: probs.len(),
        })
    }
}
