//! Bit scores and e-values.

use super::tables::KarlinParams;

/// S' = (lambda * S - ln K) / ln 2
pub fn bit_score(raw_score: i32, params: &KarlinParams) -> f64 {
    (params.lambda * (raw_score as f64) - params.k.ln()) / std::f64::consts::LN_2
}

/// E = space * e^(-lambda * S + ln K)
///
/// `search_space` is the effective search space m' * n' after length
/// adjustment.
pub fn evalue_from_raw_score(raw_score: i32, params: &KarlinParams, search_space: f64) -> f64 {
    search_space * (-params.lambda * (raw_score as f64) + params.k.ln()).exp()
}
