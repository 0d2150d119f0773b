//! Pre-trained classifier adapters and the process-lifetime `ModelBundle`.
//!
//! Three ONNX binary classifiers (URL, email, coordinator) and two TF-IDF
//! vectorizer artifacts are loaded once at startup and never mutated
//! afterward. Inference is the only operation: no retraining, no state.
//!
//! Artifact layout under the model directory:
//! - `url_agent.onnx`, `url_vectorizer.json`
//! - `email_agent.onnx`, `email_vectorizer.json`
//! - `coordinator_agent.onnx`
//!
//! Vectorizer JSON carries `vocabulary` (term -> column) and `idf` (one
//! weight per column); the transform mirrors the training-side TF-IDF:
//! lowercase, word tokens of two or more characters, term counts times idf,
//! l2-normalized.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array2;
use once_cell::sync::Lazy;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::engine::clamp01;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("onnx runtime error: {0}")]
    Onnx(String),
    #[error("vectorizer artifact error: {0}")]
    Vectorizer(String),
    #[error("classifier produced no probability output")]
    EmptyOutput,
}

fn onnx_err(e: impl std::fmt::Display) -> ModelError {
    ModelError::Onnx(e.to_string())
}

/// The single prediction interface every model exposes: positive-class
/// ("phishing") probability for one feature vector.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, features: &[f32]) -> Result<f64, ModelError>;
}

/// ONNX-backed classifier. `Session::run` needs `&mut self`, so the session
/// sits behind a mutex; inference itself is stateless.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(onnx_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(onnx_err)?
            .commit_from_file(path)
            .map_err(onnx_err)?;

        info!(path = %path.display(), "onnx model loaded");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &[f32]) -> Result<f64, ModelError> {
        let array = Array2::<f32>::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(onnx_err)?;
        let input = Value::from_array(array).map_err(onnx_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Onnx("session lock poisoned".to_string()))?;

        // Classifier exports list the probabilities tensor as the last
        // output (after the label output).
        let output_name = session
            .outputs
            .last()
            .map(|o| o.name.clone())
            .ok_or(ModelError::EmptyOutput)?;

        let outputs = session.run(ort::inputs![input]).map_err(onnx_err)?;
        let output = outputs.get(&output_name).ok_or(ModelError::EmptyOutput)?;
        let (_, data) = output.try_extract_tensor::<f32>().map_err(onnx_err)?;

        // One row: either a single positive-class score or a
        // [p_negative, p_positive] pair.
        let p = match data.len() {
            0 => return Err(ModelError::EmptyOutput),
            1 => data[0],
            n => data[n - 1],
        };
        if !p.is_finite() {
            return Err(ModelError::Onnx("non-finite probability".to_string()));
        }
        Ok(clamp01(f64::from(p)))
    }
}

/// On-disk shape of a vectorizer artifact.
#[derive(Debug, Deserialize)]
struct VectorizerArtifact {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

// Word tokens of two or more characters, matching the training tokenizer.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token regex"));

/// TF-IDF transform matching the vectorizer the classifiers were trained
/// with. Pure lookup + arithmetic; unknown terms are ignored.
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn from_parts(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f32>,
    ) -> Result<Self, ModelError> {
        if let Some((term, idx)) = vocabulary.iter().find(|(_, idx)| **idx >= idf.len()) {
            return Err(ModelError::Vectorizer(format!(
                "term '{term}' maps to column {idx} but idf has {} entries",
                idf.len()
            )));
        }
        Ok(Self { vocabulary, idf })
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = fs::read_to_string(path)
            .map_err(|_| ModelError::NotFound(path.to_path_buf()))?;
        let artifact: VectorizerArtifact = serde_json::from_str(&text)
            .map_err(|e| ModelError::Vectorizer(e.to_string()))?;
        Self::from_parts(artifact.vocabulary, artifact.idf)
    }

    /// Number of feature columns.
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut features = vec![0.0f32; self.idf.len()];
        let lowered = text.to_lowercase();
        for token in TOKEN_RE.find_iter(&lowered) {
            if let Some(&idx) = self.vocabulary.get(token.as_str()) {
                features[idx] += 1.0;
            }
        }
        for (value, idf) in features.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = features.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut features {
                *value /= norm;
            }
        }
        features
    }
}

/// A base model together with its matching vectorizer: raw text in,
/// probability out.
pub struct TextClassifier {
    vectorizer: TfidfVectorizer,
    model: Box<dyn Classifier>,
}

impl TextClassifier {
    pub fn new(vectorizer: TfidfVectorizer, model: Box<dyn Classifier>) -> Self {
        Self { vectorizer, model }
    }

    pub fn predict(&self, text: &str) -> Result<f64, ModelError> {
        self.model.predict_proba(&self.vectorizer.transform(text))
    }
}

/// Everything the inference endpoints need, constructed once at process
/// start and injected into every handler. Effectively immutable for the
/// process lifetime; no locking is required around reads.
pub struct ModelBundle {
    pub url: TextClassifier,
    pub email: TextClassifier,
    pub coordinator: Box<dyn Classifier>,
}

impl ModelBundle {
    pub fn new(
        url: TextClassifier,
        email: TextClassifier,
        coordinator: Box<dyn Classifier>,
    ) -> Self {
        Self {
            url,
            email,
            coordinator,
        }
    }

    /// Load all five artifacts from `dir`. Any missing or broken artifact
    /// fails the whole bundle — partial bundles would silently skew scores.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let url = TextClassifier::new(
            TfidfVectorizer::load(&dir.join("url_vectorizer.json"))?,
            Box::new(OnnxClassifier::load(&dir.join("url_agent.onnx"))?),
        );
        let email = TextClassifier::new(
            TfidfVectorizer::load(&dir.join("email_vectorizer.json"))?,
            Box::new(OnnxClassifier::load(&dir.join("email_agent.onnx"))?),
        );
        let coordinator: Box<dyn Classifier> =
            Box::new(OnnxClassifier::load(&dir.join("coordinator_agent.onnx"))?);

        info!(dir = %dir.display(), "model bundle ready");
        Ok(Self::new(url, email, coordinator))
    }
}
