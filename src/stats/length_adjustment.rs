//! Length adjustment for Karlin-Altschul statistics.
//!
//! Finds the fixed point of
//!   ell = alpha/lambda * (ln K + ln((m - ell) * (n - N*ell))) + beta
//! by the bounded iteration NCBI BLAST uses in
//! `BLAST_ComputeLengthAdjustment` (blast_stat.c), so effective query and
//! database lengths match what BLAST would report.

use super::tables::KarlinParams;

const MAX_ITERATIONS: u32 = 20;

/// Compute the length adjustment for one (query, database) pairing.
/// Returns 0 when the inputs admit no adjustment.
pub fn compute_length_adjustment(
    query_length: u64,
    db_length: u64,
    db_num_seqs: u64,
    params: &KarlinParams,
) -> u64 {
    let m = query_length as f64;
    let n = db_length as f64;
    let n_seqs = (db_num_seqs.max(1)) as f64;

    if m <= 0.0 || n <= 0.0 || params.k <= 0.0 || params.lambda <= 0.0 {
        return 0;
    }

    let log_k = params.k.ln();
    let alpha_d_lambda = params.alpha / params.lambda;
    let beta = params.beta;

    // Largest ell satisfying K*(m - ell)*(n - N*ell) > max(m, n), from the
    // quadratic formula written as 2c / (-b + sqrt(b^2 - 4ac)).
    let a = n_seqs;
    let mb = m * n_seqs + n;
    let c = n * m - m.max(n) / params.k;
    if c < 0.0 {
        return 0;
    }
    let discriminant = mb * mb - 4.0 * a * c;
    if discriminant < 0.0 {
        return 0;
    }

    let mut ell_min = 0.0_f64;
    let mut ell_max = 2.0 * c / (mb + discriminant.sqrt());
    let mut ell_next = 0.0_f64;
    let mut converged = false;

    for i in 1..=MAX_ITERATIONS {
        let ell = ell_next;
        let ss = (m - ell) * (n - n_seqs * ell);
        let ell_bar = alpha_d_lambda * (log_k + ss.ln()) + beta;

        if ell_bar >= ell {
            ell_min = ell;
            if ell_bar - ell_min <= 1.0 {
                converged = true;
                break;
            }
            if ell_min == ell_max {
                break;
            }
        } else {
            ell_max = ell;
        }

        ell_next = if ell_min <= ell_bar && ell_bar <= ell_max {
            ell_bar
        } else if i == 1 {
            ell_max
        } else {
            (ell_min + ell_max) / 2.0
        };
    }

    let mut adjustment = ell_min.max(0.0) as u64;
    if converged {
        // prefer ceil(ell_min) when it is still below the fixed point
        let ell_ceil = ell_min.ceil();
        if ell_ceil <= ell_max {
            let ss = (m - ell_ceil) * (n - n_seqs * ell_ceil);
            if alpha_d_lambda * (log_k + ss.ln()) + beta >= ell_ceil {
                adjustment = ell_ceil as u64;
            }
        }
    }
    adjustment
}
