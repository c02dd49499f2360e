//! Alphabets, alphabet reduction and reading-frame generation.
//!
//! Sequences are kept in a numeric encoding throughout the pipeline:
//! Dna5 uses `A=0, C=1, G=2, T=3, N=4`; amino acids use the 25-symbol
//! BLOSUM62 matrix order `ARNDCQEGHILKMFPSTWYVBJZX*` so residue codes
//! index the scoring matrix directly. The Murphy10 reduction collapses
//! the 20 standard residues into 10 classes (plus X and stop), which is
//! the view the seed index is built over.

pub mod genetic_code;

use bio::alphabets::dna;
use serde::{Deserialize, Serialize};

use self::genetic_code::GeneticCode;
use crate::search::args::BlastProgram;

/// Symbols in the amino-acid alphabet (BLOSUM62 matrix order).
pub const AA_ALPHABET_SIZE: usize = 25;
/// Symbols in the Dna5 alphabet.
pub const DNA5_ALPHABET_SIZE: usize = 5;
/// Symbols in the Murphy10 reduction (10 classes + X + stop).
pub const MURPHY10_ALPHABET_SIZE: usize = 12;

pub const AA_X: u8 = 23;
pub const AA_STOP: u8 = 24;
pub const DNA_N: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphabetKind {
    Dna5,
    AminoAcid,
    Murphy10,
}

impl AlphabetKind {
    pub fn size(self) -> usize {
        match self {
            AlphabetKind::Dna5 => DNA5_ALPHABET_SIZE,
            AlphabetKind::AminoAcid => AA_ALPHABET_SIZE,
            AlphabetKind::Murphy10 => MURPHY10_ALPHABET_SIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AlphabetKind::Dna5 => "dna5",
            AlphabetKind::AminoAcid => "aminoacid",
            AlphabetKind::Murphy10 => "murphy10",
        }
    }

    pub fn is_nucleotide(self) -> bool {
        matches!(self, AlphabetKind::Dna5)
    }
}

/// Amino-acid symbols in matrix order, used for decoding.
pub const AA_CHARS: &[u8; AA_ALPHABET_SIZE] = b"ARNDCQEGHILKMFPSTWYVBJZX*";
pub const DNA_CHARS: &[u8; DNA5_ALPHABET_SIZE] = b"ACGTN";

/// Encode one IUPAC amino-acid character; anything unknown maps to X.
#[inline]
pub fn encode_aa(c: u8) -> u8 {
    match c.to_ascii_uppercase() {
        b'A' => 0,
        b'R' => 1,
        b'N' => 2,
        b'D' => 3,
        b'C' => 4,
        b'Q' => 5,
        b'E' => 6,
        b'G' => 7,
        b'H' => 8,
        b'I' => 9,
        b'L' => 10,
        b'K' => 11,
        b'M' => 12,
        b'F' => 13,
        b'P' => 14,
        b'S' => 15,
        b'T' => 16,
        b'W' => 17,
        b'Y' => 18,
        b'V' => 19,
        b'B' => 20,
        b'J' => 21,
        b'Z' => 22,
        b'*' => AA_STOP,
        // U (selenocysteine) and O (pyrrolysine) have no matrix column
        _ => AA_X,
    }
}

/// Encode one IUPAC nucleotide; ambiguity codes map to N, U to T.
#[inline]
pub fn encode_dna(c: u8) -> u8 {
    match c.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' | b'U' => 3,
        _ => DNA_N,
    }
}

pub fn encode_aa_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&c| encode_aa(c)).collect()
}

pub fn encode_dna_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&c| encode_dna(c)).collect()
}

#[inline]
pub fn decode(alphabet: AlphabetKind, code: u8) -> u8 {
    match alphabet {
        AlphabetKind::Dna5 => DNA_CHARS[(code as usize).min(DNA5_ALPHABET_SIZE - 1)],
        _ => AA_CHARS[(code as usize).min(AA_ALPHABET_SIZE - 1)],
    }
}

/// Murphy 10-class reduction: LVIM(J), C, A, G, ST, P, FYW, EDNQ(BZ), KR, H.
/// X and the stop symbol keep their own classes so seeds never cross them
/// silently.
const MURPHY10_MAP: [u8; AA_ALPHABET_SIZE] = [
    2,  // A
    8,  // R
    7,  // N
    7,  // D
    1,  // C
    7,  // Q
    7,  // E
    3,  // G
    9,  // H
    0,  // I
    0,  // L
    8,  // K
    0,  // M
    6,  // F
    5,  // P
    4,  // S
    4,  // T
    6,  // W
    6,  // Y
    0,  // V
    7,  // B
    0,  // J
    7,  // Z
    10, // X
    11, // *
];

#[inline]
pub fn reduce_murphy10(code: u8) -> u8 {
    MURPHY10_MAP[(code as usize).min(AA_ALPHABET_SIZE - 1)]
}

pub fn reduce_seq(alphabet: AlphabetKind, seq: &[u8]) -> Vec<u8> {
    match alphabet {
        AlphabetKind::Murphy10 => seq.iter().map(|&c| reduce_murphy10(c)).collect(),
        _ => seq.to_vec(),
    }
}

/// Guess the alphabet of a raw sequence: all-nucleotide content means Dna5.
pub fn detect_alphabet(seq: &[u8]) -> AlphabetKind {
    let nucl = seq
        .iter()
        .all(|&c| matches!(c.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'U' | b'N'));
    if nucl && !seq.is_empty() {
        AlphabetKind::Dna5
    } else {
        AlphabetKind::AminoAcid
    }
}

/// One reading frame of a prepared sequence.
///
/// `frame` follows BLAST conventions: 0 for untranslated protein, ±1 for
/// nucleotide strands, ±1..±3 for translated frames. `seq` is encoded in
/// the frame's target alphabet.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame: i8,
    pub seq: Vec<u8>,
}

/// Generate the query-side frames for a program from the raw ASCII record.
pub fn query_frames(program: BlastProgram, raw: &[u8], code: &GeneticCode) -> Vec<Frame> {
    if program.query_is_translated() {
        six_frames(raw, code)
    } else if program.query_is_nucleotide() {
        vec![
            Frame { frame: 1, seq: encode_dna_seq(raw) },
            Frame { frame: -1, seq: encode_dna_seq(&dna::revcomp(raw)) },
        ]
    } else {
        vec![Frame { frame: 0, seq: encode_aa_seq(raw) }]
    }
}

/// All six translated reading frames (+1,+2,+3,-1,-2,-3) of a DNA record.
pub fn six_frames(raw: &[u8], code: &GeneticCode) -> Vec<Frame> {
    let fwd = encode_dna_seq(raw);
    let rev = encode_dna_seq(&dna::revcomp(raw));
    let mut frames = Vec::with_capacity(6);
    for off in 0..3usize {
        frames.push(Frame {
            frame: (off as i8) + 1,
            seq: code.translate(&fwd[off.min(fwd.len())..]),
        });
    }
    for off in 0..3usize {
        frames.push(Frame {
            frame: -((off as i8) + 1),
            seq: code.translate(&rev[off.min(rev.len())..]),
        });
    }
    frames
}

/// Map a half-open range in frame coordinates back to 1-based coordinates
/// on the original (untranslated, plus-strand) sequence. For minus-strand
/// frames the returned pair has `start > end`, as BLAST reports them.
pub fn frame_to_orig(
    frame: i8,
    orig_len: usize,
    start: usize,
    end: usize,
    translated: bool,
) -> (usize, usize) {
    if frame == 0 {
        return (start + 1, end);
    }
    if translated {
        let off = (frame.unsigned_abs() as usize) - 1;
        if frame > 0 {
            (off + 3 * start + 1, off + 3 * end)
        } else {
            (orig_len - off - 3 * start, orig_len - off - 3 * end + 1)
        }
    } else if frame > 0 {
        (start + 1, end)
    } else {
        (orig_len - start, orig_len - end + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::args::BlastProgram;

    #[test]
    fn encode_roundtrip_aa() {
        for (i, &c) in AA_CHARS.iter().enumerate() {
            assert_eq!(encode_aa(c) as usize, i);
        }
        assert_eq!(encode_aa(b'u'), AA_X);
    }

    #[test]
    fn detect_dna_vs_protein() {
        assert_eq!(detect_alphabet(b"ACGTACGTNN"), AlphabetKind::Dna5);
        assert_eq!(detect_alphabet(b"MKLVWWPQR"), AlphabetKind::AminoAcid);
        // all-ACGT protein sequences are indistinguishable; DNA wins
        assert_eq!(detect_alphabet(b"ACACAC"), AlphabetKind::Dna5);
    }

    #[test]
    fn murphy10_groups() {
        // I, L, V, M collapse; K and R collapse; H stands alone
        assert_eq!(reduce_murphy10(encode_aa(b'I')), reduce_murphy10(encode_aa(b'L')));
        assert_eq!(reduce_murphy10(encode_aa(b'V')), reduce_murphy10(encode_aa(b'M')));
        assert_eq!(reduce_murphy10(encode_aa(b'K')), reduce_murphy10(encode_aa(b'R')));
        assert_ne!(reduce_murphy10(encode_aa(b'H')), reduce_murphy10(encode_aa(b'K')));
        assert_ne!(reduce_murphy10(encode_aa(b'X')), reduce_murphy10(encode_aa(b'A')));
    }

    #[test]
    fn six_frames_of_short_seq() {
        let code = GeneticCode::from_id(1).unwrap();
        let frames = six_frames(b"ATGGCC", &code);
        assert_eq!(frames.len(), 6);
        // frame +1: ATG GCC -> M A
        assert_eq!(frames[0].seq, vec![encode_aa(b'M'), encode_aa(b'A')]);
        // frame +2 and +3 have a single codon; +3 has only 4 bases left -> 1 aa
        assert_eq!(frames[1].seq.len(), 1);
        assert_eq!(frames[2].seq.len(), 1);
    }

    #[test]
    fn blastn_frames_are_both_strands() {
        let code = GeneticCode::from_id(1).unwrap();
        let frames = query_frames(BlastProgram::Blastn, b"ACGT", &code);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].seq, encode_dna_seq(b"ACGT"));
        assert_eq!(frames[1].seq, encode_dna_seq(b"ACGT")); // palindrome
    }

    #[test]
    fn frame_coordinate_mapping() {
        // forward translated frame +2 over a 20nt sequence: aa [1, 3) covers
        // nt offsets 4..9 (1-based 5..10)
        assert_eq!(frame_to_orig(2, 20, 1, 3, true), (5, 10));
        // reverse frame -1: aa [0, 2) maps to plus-strand 20..15
        assert_eq!(frame_to_orig(-1, 20, 0, 2, true), (20, 15));
        // plus/minus strand nucleotide mapping
        assert_eq!(frame_to_orig(1, 10, 2, 6, false), (3, 6));
        assert_eq!(frame_to_orig(-1, 10, 2, 6, false), (8, 5));
    }
}
