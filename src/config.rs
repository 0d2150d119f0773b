//! Scoring pipeline tunables.
//!
//! Defaults are compiled in; `config/scoring.toml` overrides them; a handful
//! of environment variables override both. The blend weight and the three
//! cut points are deliberately independent knobs — the 0.5 phishing decision
//! and the 0.6 HIGH-risk boundary are different cut points and must stay
//! separate.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/scoring.toml";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

pub const ENV_CONFIG_PATH: &str = "SCORING_CONFIG_PATH";
pub const ENV_MODEL_DIR: &str = "MODEL_DIR";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_URL_BLEND: &str = "URL_BLEND";
pub const ENV_DECISION_THRESHOLD: &str = "DECISION_THRESHOLD";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Weight of the URL classifier in the URL-only blend; the rule score
    /// gets `1 - url_blend`.
    pub url_blend: f64,
    /// Probabilities below this are LOW risk.
    pub risk_medium: f64,
    /// Probabilities at or above this are HIGH risk.
    pub risk_high: f64,
    /// The binary phishing decision: `probability >= decision_threshold`.
    pub decision_threshold: f64,
    /// Per-probe network bounds, seconds.
    pub whois_timeout_secs: u64,
    pub dns_timeout_secs: u64,
    pub tls_timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            url_blend: 0.3,
            risk_medium: 0.3,
            risk_high: 0.6,
            decision_threshold: 0.5,
            whois_timeout_secs: 5,
            dns_timeout_secs: 3,
            tls_timeout_secs: 2,
        }
    }
}

impl ScoringConfig {
    /// Load from the TOML file (path from `SCORING_CONFIG_PATH` or the
    /// default), then apply env overrides. Never fails: a missing or broken
    /// file logs a warning and falls back to defaults.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = match fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<ScoringConfig>(&text) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "bad scoring config, using defaults");
                    ScoringConfig::default()
                }
            },
            Err(_) => ScoringConfig::default(),
        };

        if let Some(v) = parse_unit_env(ENV_URL_BLEND) {
            cfg.url_blend = v;
        }
        if let Some(v) = parse_unit_env(ENV_DECISION_THRESHOLD) {
            cfg.decision_threshold = v;
        }

        cfg.validated()
    }

    /// Clamp weights into [0,1] and restore defaults when the risk cut points
    /// are out of order.
    pub fn validated(mut self) -> Self {
        self.url_blend = self.url_blend.clamp(0.0, 1.0);
        self.decision_threshold = self.decision_threshold.clamp(0.0, 1.0);
        self.risk_medium = self.risk_medium.clamp(0.0, 1.0);
        self.risk_high = self.risk_high.clamp(0.0, 1.0);

        if self.risk_medium > self.risk_high {
            warn!(
                risk_medium = self.risk_medium,
                risk_high = self.risk_high,
                "risk thresholds out of order, using defaults"
            );
            let d = ScoringConfig::default();
            self.risk_medium = d.risk_medium;
            self.risk_high = d.risk_high;
        }
        self
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_unit_env(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}
