//! Suffix comparison and bucketed parallel suffix-array construction.
//!
//! The suffix array is built over a string-set in two phases: a coarse
//! parallel sort by the first `L` characters of each suffix, then an
//! independent full sort of every bucket of equal `L`-prefixes. Bucket
//! sorts are sequential internally and scheduled across the thread pool,
//! which keeps locality high without oversubscribing threads.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use anyhow::Result;
use rayon::prelude::*;

use crate::errors::SearchError;

/// Suffix position in a string-set: (sequence index, offset).
pub type SaValue = (u32, u32);

/// Total order on suffix positions.
///
/// Compares the suffixes starting `offset` characters past the stored
/// positions (clamped at the sequence end). A strict prefix sorts before
/// its extensions; when both suffixes end while still equal, the higher
/// sequence index sorts first, which makes the order strict over distinct
/// positions and the resulting array reproducible.
pub fn suffix_cmp(text: &[Vec<u8>], a: SaValue, b: SaValue, offset: usize) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let sa = &text[a.0 as usize];
    let sb = &text[b.0 as usize];
    let ra = &sa[(a.1 as usize + offset).min(sa.len())..];
    let rb = &sb[(b.1 as usize + offset).min(sb.len())..];
    let n = ra.len().min(rb.len());
    for k in 0..n {
        match ra[k].cmp(&rb[k]) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    match ra.len().cmp(&rb.len()) {
        Ordering::Equal => b.0.cmp(&a.0),
        ord => ord,
    }
}

#[inline]
pub fn suffix_less(text: &[Vec<u8>], a: SaValue, b: SaValue, offset: usize) -> bool {
    suffix_cmp(text, a, b, offset) == Ordering::Less
}

/// Order on the first `q` characters of two suffixes. Slice comparison
/// already ranks a strict prefix before its extensions; suffixes with
/// identical clamped prefixes compare equal and land in the same bucket.
pub fn qgram_cmp(text: &[Vec<u8>], a: SaValue, b: SaValue, q: usize) -> Ordering {
    let sa = &text[a.0 as usize];
    let sb = &text[b.0 as usize];
    let ra = &sa[a.1 as usize..(a.1 as usize + q).min(sa.len())];
    let rb = &sb[b.1 as usize..(b.1 as usize + q).min(sb.len())];
    ra.cmp(rb)
}

/// Initial prefix length for the coarse sort, from the alphabet size.
pub fn initial_sort_length(alphabet_size: usize) -> usize {
    if alphabet_size <= 5 {
        10
    } else if alphabet_size < 10 {
        3
    } else {
        2
    }
}

/// Build the suffix array of `text`.
///
/// `progress` receives values scaled to 0..100 as refinement buckets
/// complete. The returned array is a permutation of all suffix positions,
/// strictly ordered by [`suffix_cmp`].
pub fn create_suffix_array<F>(
    text: &[Vec<u8>],
    alphabet_size: usize,
    progress: F,
) -> Result<Vec<SaValue>>
where
    F: Fn(u64) + Sync,
{
    let total: usize = text.iter().map(|s| s.len()).sum();
    if text.len() > u32::MAX as usize || text.iter().any(|s| s.len() > u32::MAX as usize) {
        return Err(SearchError::ResourceExhausted.into());
    }

    // 1. identity permutation in row-major (sequence, offset) order
    let mut sa: Vec<SaValue> = Vec::new();
    if sa.try_reserve_exact(total).is_err() {
        return Err(SearchError::ResourceExhausted.into());
    }
    for (j, s) in text.iter().enumerate() {
        for i in 0..s.len() {
            sa.push((j as u32, i as u32));
        }
    }

    // 2. coarse parallel sort by the first q characters
    let q = initial_sort_length(alphabet_size);
    sa.par_sort_unstable_by(|&a, &b| qgram_cmp(text, a, b, q));

    // 3. bucket boundaries wherever the q-prefix changes
    let mut dir: Vec<usize> = vec![0];
    for j in 1..sa.len() {
        if qgram_cmp(text, sa[j - 1], sa[j], q) != Ordering::Equal {
            dir.push(j);
        }
    }
    dir.push(sa.len());

    // 4. refine each bucket past the shared prefix; buckets of size 1 are
    //    already in place
    let n_buckets = (dir.len() - 1) as u64;
    let mut buckets: Vec<&mut [SaValue]> = Vec::with_capacity(dir.len() - 1);
    let mut rest = sa.as_mut_slice();
    let mut prev = 0usize;
    for &bound in &dir[1..] {
        let (head, tail) = rest.split_at_mut(bound - prev);
        buckets.push(head);
        rest = tail;
        prev = bound;
    }

    let completed = AtomicU64::new(0);
    buckets.into_par_iter().for_each(|bucket| {
        if bucket.len() > 1 {
            bucket.sort_unstable_by(|&a, &b| suffix_cmp(text, a, b, q));
        }
        let done = completed.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        progress(done * 100 / n_buckets.max(1));
    });

    Ok(sa)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(seqs: &[&[u8]]) -> Vec<Vec<u8>> {
        seqs.iter().map(|s| s.to_vec()).collect()
    }

    #[test]
    fn sa_of_banana() {
        let text = set(&[b"banana"]);
        let sa = create_suffix_array(&text, 5, |_| {}).unwrap();
        let offsets: Vec<u32> = sa.iter().map(|&(_, o)| o).collect();
        assert_eq!(offsets, vec![5, 3, 1, 0, 4, 2]);
    }

    #[test]
    fn sa_of_identical_pair_breaks_ties_by_descending_seq() {
        let text = set(&[b"ab", b"ab"]);
        let sa = create_suffix_array(&text, 5, |_| {}).unwrap();
        assert_eq!(sa, vec![(1, 0), (0, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn sa_is_a_strictly_ordered_permutation() {
        let text = set(&[b"mississippi", b"missouri", b"ippi"]);
        let sa = create_suffix_array(&text, 26, |_| {}).unwrap();

        let total: usize = text.iter().map(|s| s.len()).sum();
        assert_eq!(sa.len(), total);
        let mut seen = sa.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total, "SA must be a permutation");

        for w in sa.windows(2) {
            assert!(
                suffix_less(&text, w[0], w[1], 0),
                "SA must be strictly ordered: {:?} !< {:?}",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn bucket_prefixes_agree_after_coarse_sort() {
        // indirect check through the final order: adjacent entries sharing a
        // 2-prefix must still be suffix-ordered
        let text = set(&[b"abracadabra", b"cadabra"]);
        let sa = create_suffix_array(&text, 26, |_| {}).unwrap();
        for w in sa.windows(2) {
            assert_ne!(suffix_cmp(&text, w[0], w[1], 0), Ordering::Greater);
        }
    }

    #[test]
    fn offset_skips_shared_prefix() {
        let text = set(&[b"xxab", b"xxac"]);
        // suffixes (0,0) = "xxab", (1,0) = "xxac": skipping 2 chars compares
        // "ab" vs "ac"
        assert!(suffix_less(&text, (0, 0), (1, 0), 2));
        assert!(!suffix_less(&text, (1, 0), (0, 0), 2));
    }

    #[test]
    fn progress_reaches_one_hundred() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let max = AtomicU64::new(0);
        let text = set(&[b"acgtacgtacgt"]);
        create_suffix_array(&text, 5, |p| {
            max.fetch_max(p, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(max.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn empty_text_yields_empty_sa() {
        let text = set(&[b""]);
        let sa = create_suffix_array(&text, 5, |_| {}).unwrap();
        assert!(sa.is_empty());
    }
}
