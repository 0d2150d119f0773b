//! Lexical signal: Shannon entropy over a domain label's character
//! distribution, in bits. Random-looking labels ("xk29fq") score high,
//! repetitive ones ("aaaa") score zero.

use std::collections::HashMap;

/// Shannon entropy of `label` in bits. Empty input yields 0.0.
///
/// Pure and total; the only input is the first dot-separated component of a
/// registrable domain, but any string works.
pub fn shannon_entropy(label: &str) -> f64 {
    if label.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut len = 0usize;
    for c in label.chars() {
        *counts.entry(c).or_insert(0) += 1;
        len += 1;
    }

    let len = len as f64;
    let entropy: f64 = counts
        .values()
        .map(|&n| {
            let p = n as f64 / len;
            p * p.log2()
        })
        .sum();

    // -0.0 for single-character labels; normalize the sign.
    (-entropy).max(0.0)
}
