//! Genetic-code tables for six-frame translation.
//!
//! Codons are translated on Dna5-encoded input; any codon containing N
//! yields X. Table ids follow the NCBI numbering; the bacterial table (11)
//! differs from the standard one only in start codons, which translation
//! does not consult, so both share the same table.

use anyhow::{bail, Result};

use super::{encode_aa, AA_X, DNA_N};

/// Standard code in TCAG order (NCBI transl_table=1).
const STANDARD: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Dna5 code (ACGT) -> position in the TCAG table axis.
const TO_TCAG: [usize; 4] = [2, 1, 3, 0];

#[derive(Debug, Clone)]
pub struct GeneticCode {
    table: [u8; 64],
    id: u8,
}

impl GeneticCode {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 | 11 => {
                let mut table = [0u8; 64];
                for (i, &c) in STANDARD.iter().enumerate() {
                    table[i] = encode_aa(c);
                }
                Ok(GeneticCode { table, id })
            }
            _ => bail!("unsupported genetic code table: {id}"),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Translate one codon of Dna5 codes.
    #[inline]
    pub fn codon(&self, c0: u8, c1: u8, c2: u8) -> u8 {
        if c0 >= DNA_N || c1 >= DNA_N || c2 >= DNA_N {
            return AA_X;
        }
        self.table[TO_TCAG[c0 as usize] * 16 + TO_TCAG[c1 as usize] * 4 + TO_TCAG[c2 as usize]]
    }

    /// Translate a Dna5-encoded sequence; a trailing partial codon is dropped.
    pub fn translate(&self, seq: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(seq.len() / 3);
        for codon in seq.chunks_exact(3) {
            out.push(self.codon(codon[0], codon[1], codon[2]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{encode_aa, encode_dna_seq, AA_STOP};

    #[test]
    fn standard_code_basics() {
        let code = GeneticCode::from_id(1).unwrap();
        // ATG -> M, TAA -> *, TGG -> W
        assert_eq!(code.translate(&encode_dna_seq(b"ATG")), vec![encode_aa(b'M')]);
        assert_eq!(code.translate(&encode_dna_seq(b"TAA")), vec![AA_STOP]);
        assert_eq!(code.translate(&encode_dna_seq(b"TGG")), vec![encode_aa(b'W')]);
    }

    #[test]
    fn ambiguous_codon_is_x() {
        let code = GeneticCode::from_id(1).unwrap();
        assert_eq!(code.translate(&encode_dna_seq(b"ANG")), vec![AA_X]);
    }

    #[test]
    fn unknown_table_rejected() {
        assert!(GeneticCode::from_id(7).is_err());
    }
}
