// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod entropy;
pub mod metrics;
pub mod model;
pub mod probe;
pub mod risk;
pub mod rules;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ScoringConfig;
pub use crate::model::{Classifier, ModelBundle, ModelError, TextClassifier, TfidfVectorizer};
pub use crate::probe::{DomainProber, ProbeError, ReputationProber, ReputationSignals};
pub use crate::risk::RiskLevel;
