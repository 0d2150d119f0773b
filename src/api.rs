//! HTTP surface: three inference endpoints plus health, wired the same way
//! for the binary and for tests.
//!
//! Everything here is plumbing around the scoring pipeline: request parsing,
//! the CORS layer, readiness checks, and mapping pipeline errors to status
//! codes. Handlers stay thin; the arithmetic lives in `engine`, `rules`, and
//! `risk`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::ScoringConfig;
use crate::domain;
use crate::engine;
use crate::model::{ModelBundle, ModelError};
use crate::probe::ReputationProber;
use crate::risk::{self, RiskLevel};
use crate::rules;

#[derive(Clone)]
pub struct AppState {
    /// Set exactly once when startup loading finishes; empty means 503.
    pub models: Arc<OnceCell<ModelBundle>>,
    pub prober: Arc<dyn ReputationProber>,
    pub config: Arc<ScoringConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/scan_url", post(scan_url))
        .route("/scan_email", post(scan_email))
        .route("/scan_combined", post(scan_combined))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("models are still loading")]
    ModelUnavailable,
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("inference failed")]
    Inference(#[from] ModelError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(e) => {
                error!(error = %e, "classifier inference failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
struct UrlRequest {
    url: String,
}

#[derive(Deserialize)]
struct EmailRequest {
    content: String,
}

#[derive(Deserialize)]
struct CombinedRequest {
    url: String,
    content: String,
}

#[derive(Serialize)]
struct UrlResponse {
    ml_score: f64,
    domain_score: f64,
    blended_score: f64,
    risk: RiskLevel,
    phishing: bool,
}

#[derive(Serialize)]
struct EmailResponse {
    probability: f64,
    risk: RiskLevel,
    phishing: bool,
}

#[derive(Serialize)]
struct CombinedResponse {
    final_probability: f64,
    risk: RiskLevel,
    phishing: bool,
}

async fn health(State(state): State<AppState>) -> Response {
    if state.models.get().is_some() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "loading models").into_response()
    }
}

/// URL-only path: classifier probability blended with the domain rule score.
async fn scan_url(
    State(state): State<AppState>,
    Json(body): Json<UrlRequest>,
) -> Result<Json<UrlResponse>, ApiError> {
    counter!("scan_requests_total", "endpoint" => "scan_url").increment(1);
    let models = state.models.get().ok_or(ApiError::ModelUnavailable)?;

    let registrable = domain::registrable_from_url(&body.url)
        .map_err(|e| ApiError::MalformedInput(e.to_string()))?;

    let ml_score = models.url.predict(&body.url)?;
    let signals = state.prober.probe(&registrable).await;
    let domain_score = rules::rule_score(&signals);
    let blended = engine::blend_url(ml_score, domain_score, state.config.url_blend);
    let risk = RiskLevel::from_probability(blended, &state.config);

    info!(
        target: "scan",
        id = %anon_hash(&body.url),
        ml = ml_score,
        rule = domain_score,
        blended,
        risk = ?risk,
        "url scored"
    );

    Ok(Json(UrlResponse {
        ml_score,
        domain_score,
        blended_score: blended,
        risk,
        phishing: risk::is_phishing(blended, &state.config),
    }))
}

/// Email-only path: the classifier's probability is final, no blending.
async fn scan_email(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<EmailResponse>, ApiError> {
    counter!("scan_requests_total", "endpoint" => "scan_email").increment(1);
    let models = state.models.get().ok_or(ApiError::ModelUnavailable)?;

    let probability = models.email.predict(&body.content)?;
    let risk = RiskLevel::from_probability(probability, &state.config);

    info!(
        target: "scan",
        id = %anon_hash(&body.content),
        probability,
        risk = ?risk,
        "email scored"
    );

    Ok(Json(EmailResponse {
        probability,
        risk,
        phishing: risk::is_phishing(probability, &state.config),
    }))
}

/// Combined path: both base classifiers feed the coordinator meta-model.
/// The domain rule score is not consulted here, matching how the
/// coordinator was trained.
async fn scan_combined(
    State(state): State<AppState>,
    Json(body): Json<CombinedRequest>,
) -> Result<Json<CombinedResponse>, ApiError> {
    counter!("scan_requests_total", "endpoint" => "scan_combined").increment(1);
    let models = state.models.get().ok_or(ApiError::ModelUnavailable)?;

    let url_ml = models.url.predict(&body.url)?;
    let email_ml = models.email.predict(&body.content)?;

    let features = engine::coordinator_features(url_ml, email_ml);
    let final_probability = models.coordinator.predict_proba(&features)?;
    let risk = RiskLevel::from_probability(final_probability, &state.config);

    info!(
        target: "scan",
        id = %anon_hash(&body.url),
        url_ml,
        email_ml,
        final_probability,
        risk = ?risk,
        "combined scored"
    );

    Ok(Json(CombinedResponse {
        final_probability,
        risk,
        phishing: risk::is_phishing(final_probability, &state.config),
    }))
}

/// Short content digest for logs. Raw URLs and email bodies never reach the
/// log stream.
fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("https://example.com");
        let b = anon_hash("https://example.com");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, anon_hash("https://example.org"));
    }
}
