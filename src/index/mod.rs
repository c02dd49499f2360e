//! The resident seed index and its on-disk directory format.
//!
//! An index directory holds four bincode files: `meta.bin` (alphabets,
//! frame counts, database sizes), `subjects.bin` (ids and translated
//! sequences), `sa.bin` (the suffix array over the reduced view) and an
//! optional `tax.bin` (taxonomy arrays). The search pipeline only ever
//! sees the loaded [`Index`] value.

pub mod build;
pub mod sa_sort;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::alphabet::{reduce_seq, AlphabetKind};
use crate::errors::SearchError;
use crate::taxonomy::Taxonomy;
use self::sa_sort::SaValue;

pub const INDEX_MAGIC: u64 = 0x5341_4852_4458_0001;
pub const INDEX_VERSION: u32 = 3;

pub const META_FILE: &str = "meta.bin";
pub const SUBJECTS_FILE: &str = "subjects.bin";
pub const SA_FILE: &str = "sa.bin";
pub const TAX_FILE: &str = "tax.bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    SuffixArray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub magic: u64,
    pub version: u32,
    pub index_type: IndexType,
    pub orig_alphabet: AlphabetKind,
    pub trans_alphabet: AlphabetKind,
    pub reduced_alphabet: AlphabetKind,
    pub genetic_code: u8,
    /// Frames per true subject (6 for translated indexes, 1 otherwise).
    pub s_frames: u32,
    /// Total length of the (translated) database.
    pub db_total_length: u64,
    /// Number of true subject sequences.
    pub db_num_seqs: u64,
}

impl IndexMeta {
    pub fn is_translated(&self) -> bool {
        self.orig_alphabet != self.trans_alphabet
    }
}

/// Subject sequences in their translated encoding, one entry per
/// `subj_id = true_subj * s_frames + frame_index`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectStore {
    pub ids: Vec<String>,
    pub orig_lens: Vec<u32>,
    pub seqs: Vec<Vec<u8>>,
    pub frames: Vec<i8>,
}

impl SubjectStore {
    pub fn true_id(&self, subj_id: u32, s_frames: u32) -> u32 {
        subj_id / s_frames
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaxStore {
    pub parents: Vec<u32>,
    pub heights: Vec<u32>,
    /// TaxIds per true subject.
    pub subj_tax_ids: Vec<Vec<u32>>,
}

/// Abstract seed lookup; the search driver depends only on this surface.
pub trait SeedIndex: Sync {
    /// Append up to `max_hits` subject positions whose suffix starts with
    /// `seed`. Exceeding the cap truncates silently.
    fn lookup(&self, seed: &[u8], max_hits: usize, out: &mut Vec<SaValue>);
}

/// Suffix-array index over the reduced subject view.
pub struct SuffixArrayIndex {
    sa: Vec<SaValue>,
    red_seqs: Vec<Vec<u8>>,
}

impl SuffixArrayIndex {
    pub fn new(sa: Vec<SaValue>, red_seqs: Vec<Vec<u8>>) -> Self {
        SuffixArrayIndex { sa, red_seqs }
    }

    pub fn sa(&self) -> &[SaValue] {
        &self.sa
    }

    pub fn reduced_seqs(&self) -> &[Vec<u8>] {
        &self.red_seqs
    }

    /// Order of the suffix at `pos` against a seed, over the seed's length.
    /// A suffix shorter than the seed is a strict prefix and compares less.
    fn cmp_seed(&self, pos: SaValue, seed: &[u8]) -> Ordering {
        let suf = &self.red_seqs[pos.0 as usize][pos.1 as usize..];
        let n = suf.len().min(seed.len());
        for k in 0..n {
            match suf[k].cmp(&seed[k]) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        if suf.len() < seed.len() {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }
}

impl SeedIndex for SuffixArrayIndex {
    fn lookup(&self, seed: &[u8], max_hits: usize, out: &mut Vec<SaValue>) {
        let lo = self.sa.partition_point(|&p| self.cmp_seed(p, seed) == Ordering::Less);
        let len = self.sa[lo..].partition_point(|&p| self.cmp_seed(p, seed) == Ordering::Equal);
        for &p in &self.sa[lo..lo + len.min(max_hits)] {
            out.push(p);
        }
    }
}

/// A fully loaded index directory.
pub struct Index {
    pub meta: IndexMeta,
    pub subjects: SubjectStore,
    pub seed_index: SuffixArrayIndex,
    pub taxonomy: Option<Taxonomy>,
}

fn write_bincode<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    bincode::serialize_into(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn read_bincode<T: for<'de> Deserialize<'de>>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    let file = File::open(&path).map_err(|e| {
        SearchError::index(format!("cannot open '{}': {e}", path.display()))
    })?;
    bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| SearchError::index(format!("cannot read '{}': {e}", path.display())).into())
}

/// Persist an index directory.
pub fn save(
    dir: &Path,
    meta: &IndexMeta,
    subjects: &SubjectStore,
    sa: &Vec<SaValue>,
    tax: Option<&TaxStore>,
) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    write_bincode(dir, META_FILE, meta)?;
    write_bincode(dir, SUBJECTS_FILE, subjects)?;
    write_bincode(dir, SA_FILE, sa)?;
    if let Some(tax) = tax {
        write_bincode(dir, TAX_FILE, tax)?;
    }
    Ok(())
}

/// Load an index directory and rebuild the reduced view the suffix array
/// was sorted over.
pub fn load(dir: &Path) -> Result<Index> {
    if !dir.is_dir() {
        return Err(SearchError::index(format!(
            "'{}' is not a directory",
            dir.display()
        ))
        .into());
    }
    let meta: IndexMeta = read_bincode(dir, META_FILE)?;
    if meta.magic != INDEX_MAGIC {
        return Err(SearchError::index(format!(
            "'{}' does not look like an index directory (bad magic)",
            dir.display()
        ))
        .into());
    }
    if meta.version != INDEX_VERSION {
        return Err(SearchError::index(format!(
            "index version {} is not supported by this build (expected {})",
            meta.version, INDEX_VERSION
        ))
        .into());
    }

    let subjects: SubjectStore = read_bincode(dir, SUBJECTS_FILE)?;
    let sa: Vec<SaValue> = read_bincode(dir, SA_FILE)?;

    let expected: usize = subjects.seqs.iter().map(|s| s.len()).sum();
    if sa.len() != expected {
        return Err(SearchError::index(format!(
            "suffix array length {} does not match the subject store ({expected})",
            sa.len()
        ))
        .into());
    }

    let red_seqs: Vec<Vec<u8>> = subjects
        .seqs
        .iter()
        .map(|s| reduce_seq(meta.reduced_alphabet, s))
        .collect();

    let taxonomy = if dir.join(TAX_FILE).exists() {
        let store: TaxStore = read_bincode(dir, TAX_FILE)?;
        Some(Taxonomy::from_store(store))
    } else {
        None
    };

    Ok(Index {
        meta,
        subjects,
        seed_index: SuffixArrayIndex::new(sa, red_seqs),
        taxonomy,
    })
}

#[cfg(test)]
mod tests {
    use super::sa_sort::create_suffix_array;
    use super::*;

    fn index_over(seqs: &[&[u8]]) -> SuffixArrayIndex {
        let text: Vec<Vec<u8>> = seqs.iter().map(|s| s.to_vec()).collect();
        let sa = create_suffix_array(&text, 26, |_| {}).unwrap();
        SuffixArrayIndex::new(sa, text)
    }

    #[test]
    fn lookup_finds_all_occurrences() {
        let idx = index_over(&[b"abcabcabc", b"xxabcxx"]);
        let mut hits = Vec::new();
        idx.lookup(b"abc", 100, &mut hits);
        hits.sort_unstable();
        assert_eq!(hits, vec![(0, 0), (0, 3), (0, 6), (1, 2)]);
    }

    #[test]
    fn lookup_respects_cap() {
        let idx = index_over(&[b"aaaaaaaa"]);
        let mut hits = Vec::new();
        idx.lookup(b"aa", 3, &mut hits);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn lookup_misses_cleanly() {
        let idx = index_over(&[b"abcabc"]);
        let mut hits = Vec::new();
        idx.lookup(b"zzz", 10, &mut hits);
        assert!(hits.is_empty());
    }
}
