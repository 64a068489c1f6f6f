//! Inference layer: TF-IDF text classification, ONNX Runtime sentence
//! embeddings, and probability-ensemble blending.

pub mod artifact;
pub mod ensemble;
pub mod linear;
pub mod predictor;
pub mod text_clf;
pub mod tfidf;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::Embedder;

pub use artifact::{Artifact, ArtifactError, EnsembleBundle};
pub use predictor::{GenreModel, PredictError, TextEncoder};
