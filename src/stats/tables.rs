//! Statistical parameter tables.
//!
//! Values are the published Karlin-Altschul parameters from NCBI BLAST's
//! blast_stat.c for the supported scoring schemes. The first entry of each
//! table holds the ungapped parameters; the rest are keyed by
//! (gap_open, gap_extend).

/// Karlin-Altschul statistical parameters for one scoring configuration.
#[derive(Debug, Clone, Copy)]
pub struct KarlinParams {
    pub lambda: f64,
    pub k: f64,
    pub h: f64,
    pub alpha: f64,
    pub beta: f64,
}

#[derive(Debug, Clone, Copy)]
struct ParamEntry {
    gap_open: i32,
    gap_extend: i32,
    lambda: f64,
    k: f64,
    h: f64,
    alpha: f64,
    beta: f64,
}

impl ParamEntry {
    const fn new(
        gap_open: i32,
        gap_extend: i32,
        lambda: f64,
        k: f64,
        h: f64,
        alpha: f64,
        beta: f64,
    ) -> Self {
        Self { gap_open, gap_extend, lambda, k, h, alpha, beta }
    }

    fn params(&self) -> KarlinParams {
        KarlinParams {
            lambda: self.lambda,
            k: self.k,
            h: self.h,
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

const BLOSUM62: &[ParamEntry] = &[
    ParamEntry::new(i32::MAX, i32::MAX, 0.3176, 0.134, 0.4012, 0.7916, -3.2),
    ParamEntry::new(11, 2, 0.297, 0.082, 0.27, 1.1, -10.0),
    ParamEntry::new(10, 2, 0.291, 0.075, 0.23, 1.3, -15.0),
    ParamEntry::new(9, 2, 0.279, 0.058, 0.19, 1.5, -19.0),
    ParamEntry::new(13, 1, 0.292, 0.071, 0.23, 1.2, -11.0),
    ParamEntry::new(12, 1, 0.283, 0.059, 0.19, 1.5, -19.0),
    ParamEntry::new(11, 1, 0.267, 0.041, 0.14, 1.9, -30.0),
    ParamEntry::new(10, 1, 0.243, 0.024, 0.10, 2.5, -44.0),
];

const BLASTN_1_2: &[ParamEntry] = &[
    ParamEntry::new(0, 0, 1.28, 0.46, 0.85, 1.5, -2.0),
    ParamEntry::new(2, 2, 1.33, 0.62, 1.1, 1.2, 0.0),
    ParamEntry::new(1, 2, 1.30, 0.52, 0.93, 1.4, -2.0),
    ParamEntry::new(3, 1, 1.32, 0.57, 1.0, 1.3, -1.0),
    ParamEntry::new(2, 1, 1.29, 0.49, 0.92, 1.4, -1.0),
];

const BLASTN_1_3: &[ParamEntry] = &[
    ParamEntry::new(0, 0, 1.374, 0.711, 1.31, 1.05, 0.0),
    ParamEntry::new(2, 2, 1.37, 0.70, 1.2, 1.1, 0.0),
    ParamEntry::new(1, 2, 1.35, 0.64, 1.1, 1.2, -1.0),
    ParamEntry::new(2, 1, 1.34, 0.60, 1.1, 1.2, -1.0),
    ParamEntry::new(1, 1, 1.21, 0.34, 0.71, 1.7, -2.0),
];

const BLASTN_2_3: &[ParamEntry] = &[
    ParamEntry::new(0, 0, 0.55, 0.21, 0.46, 1.2, -5.0),
    ParamEntry::new(4, 4, 0.63, 0.42, 0.84, 0.75, -2.0),
    ParamEntry::new(3, 3, 0.615, 0.37, 0.68, 0.9, -3.0),
    ParamEntry::new(6, 2, 0.63, 0.42, 0.84, 0.75, -2.0),
    ParamEntry::new(5, 2, 0.625, 0.41, 0.78, 0.8, -2.0),
    ParamEntry::new(4, 2, 0.61, 0.35, 0.68, 0.9, -3.0),
];

fn best_entry(table: &[ParamEntry], gap_open: i32, gap_extend: i32) -> KarlinParams {
    table
        .iter()
        .find(|e| e.gap_open == gap_open && e.gap_extend == gap_extend)
        .unwrap_or(&table[0])
        .params()
}

/// Gapped parameters for a protein scheme (BLOSUM62 is the only matrix the
/// search pipeline currently exposes).
pub fn lookup_protein_params(gap_open: i32, gap_extend: i32) -> KarlinParams {
    best_entry(BLOSUM62, gap_open.abs(), gap_extend.abs())
}

/// Ungapped protein parameters.
pub fn protein_ungapped_params() -> KarlinParams {
    BLOSUM62[0].params()
}

/// Gapped parameters for a nucleotide reward/penalty scheme; falls back to
/// the ungapped entry of the nearest family.
pub fn lookup_nucl_params(reward: i32, penalty: i32, gap_open: i32, gap_extend: i32) -> KarlinParams {
    let table: &[ParamEntry] = match (reward, penalty.abs()) {
        (1, 2) => BLASTN_1_2,
        (1, 3) => BLASTN_1_3,
        (2, 3) => BLASTN_2_3,
        _ => BLASTN_1_2,
    };
    best_entry(table, gap_open.abs(), gap_extend.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blosum62_default_gap_costs() {
        let p = lookup_protein_params(11, 1);
        assert!((p.lambda - 0.267).abs() < 1e-9);
        assert!((p.k - 0.041).abs() < 1e-9);
    }

    #[test]
    fn unknown_gap_costs_fall_back_to_ungapped() {
        let p = lookup_protein_params(99, 99);
        assert!((p.lambda - 0.3176).abs() < 1e-9);
    }

    #[test]
    fn blastn_default_task() {
        let p = lookup_nucl_params(2, -3, 5, 2);
        assert!((p.lambda - 0.625).abs() < 1e-9);
    }
}
