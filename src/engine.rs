//! # Blending/Coordinator Engine
//! Pure, testable combination logic — the only place where multiple signals
//! interact. No I/O; classifiers come in as already-computed probabilities
//! or go out as a prepared feature vector.
//!
//! Three paths, selected by endpoint:
//! - URL-only: fixed convex blend of the URL classifier and the rule score.
//! - Combined: both classifier outputs feed the coordinator meta-model; the
//!   rule score is deliberately NOT consulted (consistent with how the
//!   coordinator was trained).
//! - Email-only: the email classifier's probability passes through untouched.

/// Clamp into the unit interval. Every probability and score is clamped
/// before it participates in arithmetic; classifiers remain the only source
/// of probabilities.
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// URL-only blend: `url_blend * ml + (1 - url_blend) * rule`.
///
/// With both inputs in [0,1] and the weights summing to 1 the result is in
/// [0,1] by construction.
pub fn blend_url(url_ml: f64, rule_score: f64, url_blend: f64) -> f64 {
    let w = clamp01(url_blend);
    w * clamp01(url_ml) + (1.0 - w) * clamp01(rule_score)
}

/// Feature vector for the coordinator meta-model:
/// `[url_ml, email_ml, 1, 1]`.
///
/// The two trailing constants are placeholder slots baked into the trained
/// coordinator's input contract; they must be preserved byte-for-byte.
pub fn coordinator_features(url_ml: f64, email_ml: f64) -> [f32; 4] {
    [clamp01(url_ml) as f32, clamp01(email_ml) as f32, 1.0, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn blend_is_the_fixed_convex_combination() {
        let blended = blend_url(0.9, 0.1, 0.3);
        assert!((blended - 0.34).abs() < TOL, "got {blended}");
    }

    #[test]
    fn blend_matches_formula_across_the_grid() {
        for i in 0..=10 {
            for j in 0..=10 {
                let p = i as f64 / 10.0;
                let q = j as f64 / 10.0;
                let expect = 0.3 * p + 0.7 * q;
                assert!((blend_url(p, q, 0.3) - expect).abs() < TOL);
            }
        }
    }

    #[test]
    fn blend_stays_in_unit_interval_for_wild_inputs() {
        for (ml, rule) in [(1.5, -0.2), (-3.0, 7.0), (f64::MAX, 0.0)] {
            let b = blend_url(ml, rule, 0.3);
            assert!((0.0..=1.0).contains(&b), "blend {b} out of range");
        }
    }

    #[test]
    fn coordinator_vector_keeps_placeholder_constants() {
        let features = coordinator_features(0.8, 0.8);
        assert_eq!(features, [0.8, 0.8, 1.0, 1.0]);
    }

    #[test]
    fn coordinator_vector_clamps_probabilities() {
        let features = coordinator_features(1.4, -0.4);
        assert_eq!(features, [1.0, 0.0, 1.0, 1.0]);
    }
}
