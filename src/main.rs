//! Phishing Scoring Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! Startup order matters: the model bundle loads in the background so the
//! listener comes up immediately; inference endpoints answer 503 until the
//! bundle is in place.

use std::path::PathBuf;
use std::sync::Arc;

use metrics::gauge;
use once_cell::sync::OnceCell;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use phish_gate::api::{self, AppState};
use phish_gate::config::{
    ScoringConfig, DEFAULT_BIND_ADDR, DEFAULT_MODEL_DIR, ENV_BIND_ADDR, ENV_MODEL_DIR,
};
use phish_gate::metrics::Metrics;
use phish_gate::model::ModelBundle;
use phish_gate::probe::DomainProber;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phish_gate=info,scan=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Arc::new(ScoringConfig::load());
    let metrics = Metrics::init();

    // Models load off the runtime; requests arriving before completion fail
    // fast with 503 instead of blocking.
    let models: Arc<OnceCell<ModelBundle>> = Arc::new(OnceCell::new());
    let model_dir = std::env::var(ENV_MODEL_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_DIR));
    {
        let models = models.clone();
        tokio::task::spawn_blocking(move || match ModelBundle::load(&model_dir) {
            Ok(bundle) => {
                if models.set(bundle).is_ok() {
                    gauge!("model_bundle_loaded").set(1.0);
                    info!("model bundle loaded, inference endpoints ready");
                }
            }
            Err(e) => {
                error!(error = %e, "model bundle failed to load; inference endpoints stay unavailable");
            }
        });
    }

    let prober = Arc::new(DomainProber::new(&config)?);
    let state = AppState {
        models,
        prober,
        config,
    };

    let app = api::router(state).merge(metrics.router());

    let addr = std::env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
