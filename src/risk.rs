//! Risk classification: a total, monotonic step function from a probability
//! in [0,1] to a three-tier label, plus the separate binary phishing
//! decision.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;

/// Categorical risk tier. Ordering matters: LOW < MEDIUM < HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `< risk_medium` -> LOW, `[risk_medium, risk_high)` -> MEDIUM,
    /// `>= risk_high` -> HIGH. Total over all finite inputs.
    pub fn from_probability(p: f64, cfg: &ScoringConfig) -> Self {
        if p < cfg.risk_medium {
            RiskLevel::Low
        } else if p < cfg.risk_high {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// The binary decision uses its own cut point (0.5 by default), independent
/// of the HIGH-risk boundary.
pub fn is_phishing(p: f64, cfg: &ScoringConfig) -> bool {
    p >= cfg.decision_threshold
}
