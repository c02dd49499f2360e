//! Scoring schemes for gapped extension.
//!
//! Protein scoring uses BLOSUM62 indexed directly by the residue encoding
//! (matrix order `ARNDCQEGHILKMFPSTWYVBJZX*`); nucleotide scoring is
//! reward/penalty with N mismatching everything, including itself.

use anyhow::Result;

use crate::alphabet::{AA_ALPHABET_SIZE, DNA_N};
use crate::errors::SearchError;
use crate::search::args::BlastProgram;
use crate::stats::{lookup_nucl_params, lookup_protein_params, KarlinParams};

/// BLOSUM62 in matrix order, 25x25, row-major.
#[rustfmt::skip]
pub static BLOSUM62: [i8; AA_ALPHABET_SIZE * AA_ALPHABET_SIZE] = [
    //       A,  R,  N,  D,  C,  Q,  E,  G,  H,  I,  L,  K,  M,  F,  P,  S,  T,  W,  Y,  V,  B,  J,  Z,  X,  *
    /*A*/    4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1, -1, -1, -4,
    /*R*/   -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1, -2,  0, -1, -4,
    /*N*/   -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  4, -3,  0, -1, -4,
    /*D*/   -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4, -3,  1, -1, -4,
    /*C*/    0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -1, -3, -1, -4,
    /*Q*/   -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0, -2,  4, -1, -4,
    /*E*/   -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1, -3,  4, -1, -4,
    /*G*/    0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -4, -2, -1, -4,
    /*H*/   -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0, -3,  0, -1, -4,
    /*I*/   -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3,  3, -3, -1, -4,
    /*L*/   -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4,  3, -3, -1, -4,
    /*K*/   -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0, -3,  1, -1, -4,
    /*M*/   -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3,  2, -1, -1, -4,
    /*F*/   -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3,  0, -3, -1, -4,
    /*P*/   -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -3, -1, -1, -4,
    /*S*/    1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0, -2,  0, -1, -4,
    /*T*/    0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1, -1, -1, -4,
    /*W*/   -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -2, -2, -1, -4,
    /*Y*/   -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -1, -2, -1, -4,
    /*V*/    0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3,  2, -2, -1, -4,
    /*B*/   -2, -1,  4,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4, -3,  0, -1, -4,
    /*J*/   -1, -2, -3, -3, -1, -2, -3, -4, -3,  3,  3, -3,  2,  0, -3, -2, -1, -2, -1,  2, -3,  3, -3, -1, -4,
    /*Z*/   -1,  0,  0,  1, -3,  4,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -2, -2, -2,  0, -3,  4, -1, -4,
    /*X*/   -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -4,
    /***/   -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1,
];

#[derive(Debug, Clone)]
pub enum ScoringScheme {
    Protein {
        gap_open: i32,
        gap_extend: i32,
        params: KarlinParams,
    },
    Nucleotide {
        reward: i32,
        penalty: i32,
        gap_open: i32,
        gap_extend: i32,
        params: KarlinParams,
    },
}

impl ScoringScheme {
    /// Build the scheme for a program from the user's scoring flags.
    pub fn for_program(
        program: BlastProgram,
        matrix: &str,
        gap_open: Option<i32>,
        gap_extend: Option<i32>,
        reward: i32,
        penalty: i32,
    ) -> Result<Self> {
        if program == BlastProgram::Blastn {
            let gap_open = gap_open.unwrap_or(5).abs();
            let gap_extend = gap_extend.unwrap_or(2).abs();
            if reward <= 0 || penalty >= 0 {
                return Err(SearchError::config(format!(
                    "nucleotide scoring needs reward > 0 and penalty < 0 (got {reward}/{penalty})"
                ))
                .into());
            }
            Ok(ScoringScheme::Nucleotide {
                reward,
                penalty,
                gap_open,
                gap_extend,
                params: lookup_nucl_params(reward, penalty, gap_open, gap_extend),
            })
        } else {
            if !matrix.eq_ignore_ascii_case("blosum62") {
                return Err(SearchError::config(format!(
                    "unsupported scoring matrix '{matrix}' (only blosum62 is built in)"
                ))
                .into());
            }
            let gap_open = gap_open.unwrap_or(11).abs();
            let gap_extend = gap_extend.unwrap_or(1).abs();
            Ok(ScoringScheme::Protein {
                gap_open,
                gap_extend,
                params: lookup_protein_params(gap_open, gap_extend),
            })
        }
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        match self {
            ScoringScheme::Protein { .. } => {
                BLOSUM62[a as usize * AA_ALPHABET_SIZE + b as usize] as i32
            }
            ScoringScheme::Nucleotide { reward, penalty, .. } => {
                if a == b && a != DNA_N {
                    *reward
                } else {
                    *penalty
                }
            }
        }
    }

    /// Positive-scoring pairs count as "positives" in alignment statistics.
    #[inline]
    pub fn is_positive(&self, a: u8, b: u8) -> bool {
        self.score(a, b) > 0
    }

    pub fn gap_open(&self) -> i32 {
        match self {
            ScoringScheme::Protein { gap_open, .. }
            | ScoringScheme::Nucleotide { gap_open, .. } => *gap_open,
        }
    }

    pub fn gap_extend(&self) -> i32 {
        match self {
            ScoringScheme::Protein { gap_extend, .. }
            | ScoringScheme::Nucleotide { gap_extend, .. } => *gap_extend,
        }
    }

    pub fn params(&self) -> &KarlinParams {
        match self {
            ScoringScheme::Protein { params, .. }
            | ScoringScheme::Nucleotide { params, .. } => params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode_aa;

    #[test]
    fn blosum62_is_symmetric() {
        for a in 0..AA_ALPHABET_SIZE {
            for b in 0..AA_ALPHABET_SIZE {
                assert_eq!(
                    BLOSUM62[a * AA_ALPHABET_SIZE + b],
                    BLOSUM62[b * AA_ALPHABET_SIZE + a]
                );
            }
        }
    }

    #[test]
    fn blosum62_spot_checks() {
        let scheme = ScoringScheme::for_program(
            BlastProgram::Blastp,
            "blosum62",
            None,
            None,
            2,
            -3,
        )
        .unwrap();
        assert_eq!(scheme.score(encode_aa(b'W'), encode_aa(b'W')), 11);
        assert_eq!(scheme.score(encode_aa(b'A'), encode_aa(b'A')), 4);
        assert_eq!(scheme.score(encode_aa(b'A'), encode_aa(b'W')), -3);
        assert_eq!(scheme.gap_open(), 11);
        assert_eq!(scheme.gap_extend(), 1);
    }

    #[test]
    fn nucleotide_n_never_matches() {
        let scheme =
            ScoringScheme::for_program(BlastProgram::Blastn, "blosum62", None, None, 2, -3)
                .unwrap();
        assert_eq!(scheme.score(0, 0), 2);
        assert_eq!(scheme.score(0, 3), -3);
        assert_eq!(scheme.score(DNA_N, DNA_N), -3);
    }

    #[test]
    fn invalid_nucleotide_scheme_is_rejected() {
        assert!(
            ScoringScheme::for_program(BlastProgram::Blastn, "blosum62", None, None, -1, -3)
                .is_err()
        );
    }
}
