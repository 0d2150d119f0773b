// tests/pipeline.rs
//
// End-to-end properties of the scoring pipeline through the public library
// API, without HTTP. These pin down the arithmetic contracts: quarter
// quantization of the rule score, the fixed blend, the split between the
// risk tiers and the binary decision, and entropy edge cases.

use phish_gate::config::ScoringConfig;
use phish_gate::engine::{blend_url, coordinator_features};
use phish_gate::entropy::shannon_entropy;
use phish_gate::risk::{is_phishing, RiskLevel};
use phish_gate::rules::rule_score;
use phish_gate::ReputationSignals;

fn signals(age: Option<u32>, dns: bool, tls: bool, entropy: f64) -> ReputationSignals {
    ReputationSignals {
        registration_age_days: age,
        dns_resolvable: dns,
        tls_reachable: tls,
        label_entropy: entropy,
    }
}

#[test]
fn rule_scores_are_quarter_quantized_for_all_signal_shapes() {
    let quarters = [0.0, 0.25, 0.5, 0.75, 1.0];
    for age in [None, Some(0), Some(29), Some(30), Some(10_000)] {
        for dns in [false, true] {
            for tls in [false, true] {
                for entropy in [0.0, 3.5, 3.6, 5.0] {
                    let score = rule_score(&signals(age, dns, tls, entropy));
                    assert!(quarters.contains(&score), "score {score} not a quarter");
                }
            }
        }
    }
}

#[test]
fn young_unresolvable_high_entropy_domain_maxes_the_rule_score() {
    assert_eq!(rule_score(&signals(Some(5), false, false, 4.0)), 1.0);
}

#[test]
fn blended_034_is_medium_but_not_phishing() {
    let cfg = ScoringConfig::default();
    let blended = blend_url(0.9, 0.1, cfg.url_blend);
    assert!((blended - 0.34).abs() < 1e-9);
    assert_eq!(RiskLevel::from_probability(blended, &cfg), RiskLevel::Medium);
    assert!(!is_phishing(blended, &cfg));
}

#[test]
fn blend_formula_holds_for_all_probability_pairs() {
    let cfg = ScoringConfig::default();
    for i in 0..=20 {
        for j in 0..=20 {
            let p = i as f64 / 20.0;
            let q = j as f64 / 20.0;
            let blended = blend_url(p, q, cfg.url_blend);
            assert!((blended - (0.3 * p + 0.7 * q)).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&blended));
        }
    }
}

#[test]
fn risk_is_monotonic_and_decision_threshold_is_separate() {
    let cfg = ScoringConfig::default();
    let mut prev = RiskLevel::Low;
    for i in 0..=1000 {
        let p = i as f64 / 1000.0;
        let level = RiskLevel::from_probability(p, &cfg);
        assert!(level >= prev);
        prev = level;
        // phishing iff p >= 0.5, regardless of the risk label
        assert_eq!(is_phishing(p, &cfg), p >= 0.5);
    }
}

#[test]
fn entropy_edge_cases() {
    assert_eq!(shannon_entropy(""), 0.0);
    assert_eq!(shannon_entropy("aaaa"), 0.0);
    assert!(shannon_entropy("xk29fq") > 2.0);
}

#[test]
fn coordinator_input_preserves_placeholder_slots() {
    assert_eq!(coordinator_features(0.8, 0.8), [0.8, 0.8, 1.0, 1.0]);
    assert_eq!(coordinator_features(0.0, 1.0), [0.0, 1.0, 1.0, 1.0]);
}
