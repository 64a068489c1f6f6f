//! ONNX Runtime sentence embedder.
//!
//! Loads a sentence-transformers export (e.g. all-MiniLM-L6-v2) from a
//! directory containing `model.onnx` and `tokenizer.json`, and produces
//! mean-pooled, L2-normalised vectors for single lyrics texts.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::predictor::TextEncoder;
use crate::tfidf::normalize;

/// Sentence embedding generator using ONNX Runtime.
pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

impl Embedder {
    /// Load an embedding model from a directory containing `model.onnx`
    /// and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;

        // Infer embedding dimension from model output shape.
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        // Truncate to the model's max sequence length (256 for MiniLM).
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: 256,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }

    /// Embedding dimensionality (384 for all-MiniLM-L6-v2).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed one text, returning a normalized vector.
    pub fn encode(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encoding.get_ids().len();
        anyhow::ensure!(seq_len > 0, "tokenizer produced no tokens");

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&v| v as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&v| v as i64)
            .collect();
        let type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&v| v as i64).collect();

        let shape = [1i64, seq_len as i64];

        let ids_tensor = Tensor::from_array((shape, ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, mask.clone().into_boxed_slice()))?;
        let type_tensor = Tensor::from_array((shape, type_ids.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_tensor,
        ])?;

        // Token embeddings: [1, seq_len, dim].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] == 1 && dims[2] as usize == self.dim,
            "unexpected output shape: {dims:?}, expected [1, {seq_len}, {}]",
            self.dim
        );

        let actual_seq_len = dims[1] as usize;

        // Mean pooling with attention mask.
        let mut pooled = vec![0.0f32; self.dim];
        let mut token_count = 0.0f32;
        for (j, &mask_val) in mask.iter().enumerate().take(actual_seq_len) {
            if mask_val > 0 {
                let offset = j * self.dim;
                for (d, p) in pooled.iter_mut().enumerate() {
                    *p += output_data[offset + d];
                }
                token_count += mask_val as f32;
            }
        }
        if token_count > 0.0 {
            for p in &mut pooled {
                *p /= token_count;
            }
        }

        normalize(&mut pooled);
        Ok(pooled)
    }
}

impl TextEncoder for Embedder {
    fn encode(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        Embedder::encode(self, text)
    }
}

/// Try to infer the embedding dimension from the ONNX model output type.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            // Last dimension is the embedding dim.
            shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("model")
            .join("all-MiniLM-L6-v2")
    }

    fn require_model() -> PathBuf {
        let dir = model_dir();
        if !dir.join("model.onnx").exists() {
            panic!(
                "Model not found. Download from HuggingFace:\n  \
                 curl -L -o model/all-MiniLM-L6-v2/model.onnx \
                 https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx"
            );
        }
        dir
    }

    #[test]
    #[ignore = "requires a downloaded ONNX model"]
    fn load_model() {
        let dir = require_model();
        let embedder = Embedder::load(&dir).unwrap();
        assert_eq!(embedder.dim(), 384);
    }

    #[test]
    #[ignore = "requires a downloaded ONNX model"]
    fn encode_lyrics() {
        let dir = require_model();
        let mut embedder = Embedder::load(&dir).unwrap();
        let vec = embedder.encode("we danced all night under neon lights").unwrap();
        assert_eq!(vec.len(), 384);

        // Vector should be normalized (L2 norm ≈ 1.0).
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {norm}");
    }

    #[test]
    #[ignore = "requires a downloaded ONNX model"]
    fn similar_lyrics_closer() {
        let dir = require_model();
        let mut embedder = Embedder::load(&dir).unwrap();

        let v_love = embedder.encode("my heart aches for your love").unwrap();
        let v_love2 = embedder.encode("i long for the one i love").unwrap();
        let v_party = embedder.encode("turn the bass up at the club").unwrap();

        let sim_love = cosine_sim(&v_love, &v_love2);
        let sim_party = cosine_sim(&v_love, &v_party);

        assert!(
            sim_love > sim_party,
            "love↔love ({sim_love:.4}) should beat love↔party ({sim_party:.4})"
        );
    }

    fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }
}
