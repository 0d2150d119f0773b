//! Heuristic rule scorer: four boolean sub-checks over the reputation
//! signals, each worth a quarter.

use crate::probe::ReputationSignals;

/// Registrations younger than this count as suspicious.
pub const YOUNG_DOMAIN_MAX_AGE_DAYS: u32 = 30;
/// Labels with more character entropy than this look machine-generated.
pub const HIGH_ENTROPY_BITS: f64 = 3.5;

const RULE_COUNT: u32 = 4;

/// Quarter-increment score in {0, 0.25, 0.5, 0.75, 1.0}.
///
/// An unknown registration age does not trigger the age rule — "we could not
/// find out" is not evidence of youth.
pub fn rule_score(signals: &ReputationSignals) -> f64 {
    let mut hits = 0u32;

    if matches!(signals.registration_age_days, Some(age) if age < YOUNG_DOMAIN_MAX_AGE_DAYS) {
        hits += 1;
    }
    if !signals.dns_resolvable {
        hits += 1;
    }
    if !signals.tls_reachable {
        hits += 1;
    }
    if signals.label_entropy > HIGH_ENTROPY_BITS {
        hits += 1;
    }

    f64::from(hits) / f64::from(RULE_COUNT)
}
