//! Artifact resolution: decide which serialized model is present in the
//! model directory and load it into a ready-to-serve [`GenreModel`].
//!
//! Resolution runs exactly once at process start. A broken or missing
//! artifact is a deployment problem, so every failure here is fatal —
//! the process refuses to start rather than serve with a broken model.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use lyrio_core::LabelSet;

use crate::linear::LinearModel;
use crate::text_clf::TextClassifier;

/// Ensemble bundle filename. Takes priority when both artifacts exist.
pub const ENSEMBLE_FILE: &str = "genre_ensemble.json";
/// Single calibrated classifier filename, the fallback artifact.
pub const SINGLE_FILE: &str = "genre_classifier.json";
/// Embedding model used when the bundle does not name one.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_weight() -> f32 {
    0.5
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(
        "no model found in {dir}: put either {ENSEMBLE_FILE} (ensemble bundle) \
         or {SINGLE_FILE} (single classifier) there"
    )]
    NotFound { dir: PathBuf },

    #[error("failed reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("classifier at {path} exposes no class labels")]
    NoLabels { path: PathBuf },

    #[error("failed loading embedding model {name:?} from {dir}: {source}")]
    Embedder {
        name: String,
        dir: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Deserialized ensemble bundle: two classifiers, an embedding-model
/// identifier, a blend weight, and the canonical label list.
#[derive(Debug, Deserialize)]
pub struct EnsembleBundle {
    pub primary: TextClassifier,
    pub secondary: LinearModel,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    pub classes: LabelSet,
}

/// Parsed artifact, before any embedding model is constructed.
#[derive(Debug)]
pub enum Artifact {
    Single {
        classifier: TextClassifier,
        labels: LabelSet,
    },
    Ensemble(EnsembleBundle),
}

impl Artifact {
    pub fn is_ensemble(&self) -> bool {
        matches!(self, Self::Ensemble(_))
    }

    pub fn labels(&self) -> &LabelSet {
        match self {
            Self::Single { labels, .. } => labels,
            Self::Ensemble(bundle) => &bundle.classes,
        }
    }
}

/// Decide which artifact the model directory holds and parse it.
///
/// The ensemble bundle wins when both files exist; neither existing is a
/// configuration error naming the directory and both expected filenames.
pub fn resolve(dir: &Path) -> Result<Artifact, ArtifactError> {
    let bundle_path = dir.join(ENSEMBLE_FILE);
    if bundle_path.exists() {
        return resolve_bundle(&bundle_path).map(Artifact::Ensemble);
    }

    let single_path = dir.join(SINGLE_FILE);
    if single_path.exists() {
        return resolve_single(&single_path);
    }

    Err(ArtifactError::NotFound {
        dir: dir.to_path_buf(),
    })
}

fn resolve_bundle(path: &Path) -> Result<EnsembleBundle, ArtifactError> {
    let bundle: EnsembleBundle = parse(path)?;

    let invalid = |source: anyhow::Error| ArtifactError::Invalid {
        path: path.to_path_buf(),
        source,
    };

    bundle.primary.validate().map_err(invalid)?;
    bundle.secondary.validate().map_err(invalid)?;
    if !(0.0..=1.0).contains(&bundle.weight) {
        return Err(invalid(anyhow::anyhow!(
            "ensemble weight {} outside [0, 1]",
            bundle.weight
        )));
    }
    if bundle.classes.is_empty() {
        return Err(invalid(anyhow::anyhow!("bundle has an empty class list")));
    }

    // A secondary label set that cannot cover the canonical labels would
    // fail every ensemble request at alignment time, so it fails here.
    bundle
        .classes
        .alignment(&bundle.secondary.classes)
        .map_err(|err| {
            invalid(anyhow::anyhow!(
                "secondary classifier cannot cover the canonical labels: {err}"
            ))
        })?;

    if let Some(primary_labels) = bundle.primary.labels()
        && primary_labels != bundle.classes.as_slice()
    {
        warn!("primary classifier's label order differs from the bundle's canonical order");
    }

    info!(
        path = %path.display(),
        weight = bundle.weight,
        classes = bundle.classes.len(),
        embedding_model = %bundle.embedding_model,
        "resolved ensemble bundle"
    );
    Ok(bundle)
}

fn resolve_single(path: &Path) -> Result<Artifact, ArtifactError> {
    let classifier: TextClassifier = parse(path)?;

    classifier.validate().map_err(|source| ArtifactError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    // An artifact with no extractable labels would make every prediction's
    // arg-max meaningless, so loading fails here instead of at request time.
    let labels = classifier
        .labels()
        .map(|l| LabelSet::new(l.to_vec()))
        .ok_or_else(|| ArtifactError::NoLabels {
            path: path.to_path_buf(),
        })?;

    info!(
        path = %path.display(),
        classes = labels.len(),
        "resolved single classifier"
    );
    Ok(Artifact::Single { classifier, labels })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ArtifactError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the artifact and construct the full model, including the ONNX
/// embedder for ensemble bundles.
///
/// The embedder is loaded from `<dir>/<embedding_model>/`; its failure is
/// fatal — ensemble mode never degrades silently to single-model mode.
#[cfg(feature = "onnx")]
pub fn load(dir: &Path) -> Result<crate::GenreModel<crate::Embedder>, ArtifactError> {
    use crate::{Embedder, GenreModel};

    match resolve(dir)? {
        Artifact::Single { classifier, labels } => Ok(GenreModel::single(classifier, labels)),
        Artifact::Ensemble(bundle) => {
            let encoder_dir = dir.join(&bundle.embedding_model);
            let embedder =
                Embedder::load(&encoder_dir).map_err(|source| ArtifactError::Embedder {
                    name: bundle.embedding_model.clone(),
                    dir: encoder_dir.clone(),
                    source,
                })?;
            Ok(GenreModel::ensemble(
                bundle.primary,
                bundle.secondary,
                embedder,
                bundle.weight,
                bundle.classes,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn classifier_json(classes: &[&str]) -> serde_json::Value {
        json!({
            "vectorizer": { "vocabulary": {"love": 0, "guitar": 1}, "idf": [1.0, 1.2] },
            "classifier": {
                "classes": classes,
                "coef": [[0.5, -0.1], [-0.5, 0.1]],
                "intercept": [0.0, 0.0]
            }
        })
    }

    fn bundle_json() -> serde_json::Value {
        json!({
            "primary": classifier_json(&["pop", "rock"]),
            "secondary": {
                "classes": ["rock", "pop"],
                "coef": [[0.1, 0.2], [-0.1, -0.2]],
                "intercept": [0.0, 0.0]
            },
            "weight": 0.6,
            "classes": ["pop", "rock"]
        })
    }

    fn write(dir: &Path, name: &str, value: &serde_json::Value) {
        fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    #[test]
    fn neither_artifact_names_directory_and_both_files() {
        let dir = TempDir::new().unwrap();
        let err = resolve(dir.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(dir.path().to_str().unwrap()), "{msg}");
        assert!(msg.contains(ENSEMBLE_FILE), "{msg}");
        assert!(msg.contains(SINGLE_FILE), "{msg}");
    }

    #[test]
    fn bundle_takes_priority_over_single() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), SINGLE_FILE, &classifier_json(&["pop", "rock"]));
        write(dir.path(), ENSEMBLE_FILE, &bundle_json());

        let artifact = resolve(dir.path()).unwrap();
        assert!(artifact.is_ensemble());
    }

    #[test]
    fn single_artifact_resolves_with_labels() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), SINGLE_FILE, &classifier_json(&["pop", "rock"]));

        let artifact = resolve(dir.path()).unwrap();
        assert!(!artifact.is_ensemble());
        assert_eq!(artifact.labels().as_slice(), &["pop", "rock"]);
    }

    #[test]
    fn single_label_chain_prefers_calibration() {
        let dir = TempDir::new().unwrap();
        let mut value = classifier_json(&["pop", "rock"]);
        value["calibration"] = json!({
            "classes": ["rock", "pop"],
            "a": [1.0, 1.0],
            "b": [0.0, 0.0]
        });
        write(dir.path(), SINGLE_FILE, &value);

        let artifact = resolve(dir.path()).unwrap();
        assert_eq!(artifact.labels().as_slice(), &["rock", "pop"]);
    }

    #[test]
    fn single_without_any_labels_fails_at_load_time() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), SINGLE_FILE, &classifier_json(&[]));

        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::NoLabels { .. }));
    }

    #[test]
    fn bundle_defaults_for_weight_and_embedding_model() {
        let dir = TempDir::new().unwrap();
        let mut value = bundle_json();
        value.as_object_mut().unwrap().remove("weight");
        write(dir.path(), ENSEMBLE_FILE, &value);

        match resolve(dir.path()).unwrap() {
            Artifact::Ensemble(bundle) => {
                assert_eq!(bundle.weight, 0.5);
                assert_eq!(bundle.embedding_model, DEFAULT_EMBEDDING_MODEL);
            }
            other => panic!("expected ensemble, got {other:?}"),
        }
    }

    #[test]
    fn bundle_missing_required_key_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let mut value = bundle_json();
        value.as_object_mut().unwrap().remove("classes");
        write(dir.path(), ENSEMBLE_FILE, &value);

        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Format { .. }), "{err}");
    }

    #[test]
    fn bundle_weight_outside_unit_interval_is_invalid() {
        let dir = TempDir::new().unwrap();
        let mut value = bundle_json();
        value["weight"] = json!(1.5);
        write(dir.path(), ENSEMBLE_FILE, &value);

        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { .. }), "{err}");
    }

    #[test]
    fn bundle_secondary_missing_canonical_label_is_invalid() {
        let dir = TempDir::new().unwrap();
        let mut value = bundle_json();
        value["secondary"]["classes"] = json!(["rock", "metal"]);
        write(dir.path(), ENSEMBLE_FILE, &value);

        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { .. }), "{err}");
        assert!(err.to_string().contains("canonical"), "{err}");
    }

    #[test]
    fn bundle_with_ragged_weights_is_invalid() {
        let dir = TempDir::new().unwrap();
        let mut value = bundle_json();
        value["secondary"]["coef"] = json!([[0.1], [0.2, 0.3]]);
        write(dir.path(), ENSEMBLE_FILE, &value);

        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { .. }), "{err}");
    }

    #[test]
    fn unreadable_json_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SINGLE_FILE), b"not json at all").unwrap();

        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Format { .. }));
    }
}
