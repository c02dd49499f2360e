//! Seed match records and the per-chunk sort/filter stages.
//!
//! All operations here are local to one chunk's match vector. The order of
//! operations is sort, dedup, sibling merge, abundance filter; each stage
//! is gated by its option in the driver.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

/// A raw seed hit. `qry_id` and `subj_id` carry the frame in their low
/// digits (`true_id * frames + frame_index`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub qry_id: u32,
    pub subj_id: u32,
    pub qry_start: u32,
    pub subj_start: u32,
    pub length: u32,
}

impl Match {
    #[inline]
    pub fn key(&self) -> (u32, u32, u32, u32) {
        (self.qry_id, self.subj_id, self.subj_start, self.qry_start)
    }

    #[inline]
    pub fn subj_end(&self) -> u32 {
        self.subj_start + self.length
    }

    /// Diagonal of the seed: subject start minus query start.
    #[inline]
    pub fn diagonal(&self) -> i64 {
        self.subj_start as i64 - self.qry_start as i64
    }
}

impl Ord for Match {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Match {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_unstable();
}

/// Remove consecutive matches with identical key tuples (keeps the first).
pub fn dedup_matches(matches: &mut Vec<Match>) {
    matches.dedup_by_key(|m| m.key());
}

/// Merge runs of sibling seeds: same (qry, subj) pair, same diagonal, and
/// a subject gap of at most `max_gap` between one seed's end and the next
/// seed's start. Siblings arise from overlapping seed windows and would
/// otherwise trigger redundant extensions.
pub fn merge_siblings(matches: &mut Vec<Match>, max_gap: u32) {
    if matches.len() < 2 {
        return;
    }
    let mut out: Vec<Match> = Vec::with_capacity(matches.len());
    for &m in matches.iter() {
        if let Some(last) = out.last_mut() {
            let gap = m.subj_start as i64 - last.subj_end() as i64;
            if last.qry_id == m.qry_id
                && last.subj_id == m.subj_id
                && last.diagonal() == m.diagonal()
                && gap.abs() <= max_gap as i64
            {
                let end = last.subj_end().max(m.subj_end());
                last.length = end - last.subj_start;
                continue;
            }
        }
        out.push(m);
    }
    *matches = out;
}

/// Cap the number of matches per (trueQry, trueSubj) pair. With `strict`
/// the whole pair is dropped once it exceeds the threshold; otherwise only
/// the longest `threshold` seeds survive. Relative order is preserved.
pub fn filter_abundant(
    matches: &mut Vec<Match>,
    threshold: usize,
    q_frames: u32,
    s_frames: u32,
    strict: bool,
) {
    if threshold == 0 || matches.is_empty() {
        return;
    }
    let pair = |m: &Match| (m.qry_id / q_frames, m.subj_id / s_frames);

    let mut counts: FxHashMap<(u32, u32), usize> = FxHashMap::default();
    for m in matches.iter() {
        *counts.entry(pair(m)).or_insert(0) += 1;
    }
    counts.retain(|_, c| *c > threshold);
    if counts.is_empty() {
        return;
    }

    if strict {
        matches.retain(|m| !counts.contains_key(&pair(m)));
        return;
    }

    // keep the `threshold` longest seeds per abundant pair; ties resolved
    // in favor of earlier matches
    let mut min_len: FxHashMap<(u32, u32), (u32, usize)> = FxHashMap::default();
    for (&p, _) in counts.iter() {
        let mut lens: Vec<u32> = matches
            .iter()
            .filter(|m| pair(m) == p)
            .map(|m| m.length)
            .collect();
        lens.sort_unstable_by(|a, b| b.cmp(a));
        let cutoff = lens[threshold - 1];
        let at_cutoff_kept = threshold - lens[..threshold].iter().filter(|&&l| l > cutoff).count();
        min_len.insert(p, (cutoff, at_cutoff_kept));
    }
    let mut budgets = min_len;
    matches.retain(|m| {
        let Some((cutoff, at_cutoff_left)) = budgets.get_mut(&pair(m)) else {
            return true;
        };
        if m.length > *cutoff {
            true
        } else if m.length == *cutoff && *at_cutoff_left > 0 {
            *at_cutoff_left -= 1;
            true
        } else {
            false
        }
    });
}

/// Regroup the sorted match vector so every (trueQry, trueSubj) run is
/// contiguous, then reorder those runs by decreasing size (internal order
/// preserved). Scheduling the biggest work items first improves load
/// balance when extension walks the vector.
pub fn hyper_sort(matches: &mut Vec<Match>, q_frames: u32, s_frames: u32) {
    if matches.len() < 2 {
        return;
    }
    matches.sort_unstable();
    let group = |m: &Match| (m.qry_id / q_frames, m.subj_id / s_frames);

    let mut intervals: Vec<(usize, usize)> = Vec::new();
    let mut begin = 0usize;
    for i in 1..=matches.len() {
        if i == matches.len() || group(&matches[i - 1]) != group(&matches[i]) {
            intervals.push((begin, i));
            begin = i;
        }
    }

    intervals.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

    let mut out = Vec::with_capacity(matches.len());
    for (b, e) in intervals {
        out.extend_from_slice(&matches[b..e]);
    }
    *matches = out;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(q: u32, s: u32, ss: u32, qs: u32) -> Match {
        Match { qry_id: q, subj_id: s, qry_start: qs, subj_start: ss, length: 10 }
    }

    #[test]
    fn sort_and_dedup() {
        let mut ms = vec![m(1, 2, 10, 5), m(1, 2, 10, 5), m(1, 1, 0, 0)];
        sort_matches(&mut ms);
        dedup_matches(&mut ms);
        assert_eq!(
            ms.iter().map(Match::key).collect::<Vec<_>>(),
            vec![(1, 1, 0, 0), (1, 2, 10, 5)]
        );
    }

    #[test]
    fn dedup_leaves_distinct_keys_alone() {
        let mut ms = vec![m(1, 1, 0, 0), m(1, 1, 0, 1), m(1, 1, 1, 0)];
        sort_matches(&mut ms);
        dedup_matches(&mut ms);
        assert_eq!(ms.len(), 3);
        for w in ms.windows(2) {
            assert_ne!(w[0].key(), w[1].key());
        }
    }

    #[test]
    fn siblings_merge_on_the_same_diagonal() {
        // seeds at query offsets 0 and 5 on the same diagonal, length 10
        let mut ms = vec![
            Match { qry_id: 1, subj_id: 2, qry_start: 0, subj_start: 40, length: 10 },
            Match { qry_id: 1, subj_id: 2, qry_start: 5, subj_start: 45, length: 10 },
        ];
        merge_siblings(&mut ms, 5);
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].subj_start, 40);
        assert_eq!(ms[0].length, 15);
    }

    #[test]
    fn different_diagonals_do_not_merge() {
        let mut ms = vec![
            Match { qry_id: 1, subj_id: 2, qry_start: 0, subj_start: 40, length: 10 },
            Match { qry_id: 1, subj_id: 2, qry_start: 4, subj_start: 45, length: 10 },
        ];
        merge_siblings(&mut ms, 5);
        assert_eq!(ms.len(), 2);
    }

    #[test]
    fn abundant_pairs_are_dropped_strictly() {
        let mut ms: Vec<Match> = (0..6).map(|i| m(4, 7, i * 20, 0)).collect();
        ms.push(m(4, 8, 0, 0));
        filter_abundant(&mut ms, 5, 1, 1, true);
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].subj_id, 8);
    }

    #[test]
    fn abundant_pairs_keep_longest_seeds() {
        let mut ms: Vec<Match> = (0u32..6)
            .map(|i| Match {
                qry_id: 4,
                subj_id: 7,
                qry_start: 0,
                subj_start: i * 20,
                length: 10 + i,
            })
            .collect();
        filter_abundant(&mut ms, 3, 1, 1, false);
        assert_eq!(ms.len(), 3);
        assert!(ms.iter().all(|m| m.length >= 13));
    }

    #[test]
    fn hyper_sort_puts_biggest_interval_first() {
        // two matches for query 0 / subject 0, one for query 0 / subject 1
        let mut ms = vec![m(0, 0, 0, 0), m(0, 0, 5, 5), m(0, 1, 0, 0)];
        sort_matches(&mut ms);
        let mut reordered = ms.clone();
        hyper_sort(&mut reordered, 1, 1);
        assert_eq!(reordered[0].subj_id, 0);
        assert_eq!(reordered[1].subj_id, 0);
        // swap sizes: make the subject-1 run bigger
        let mut ms2 = vec![m(0, 0, 0, 0), m(0, 1, 5, 5), m(0, 1, 9, 9), m(0, 1, 30, 2)];
        sort_matches(&mut ms2);
        hyper_sort(&mut ms2, 1, 1);
        assert_eq!(ms2[0].subj_id, 1);
        assert_eq!(ms2[3].subj_id, 0);
    }

    #[test]
    fn hyper_sort_collapses_frames_into_one_interval() {
        // same true query (frames 0 and 1 of query 0 with q_frames = 2)
        let mut ms = vec![m(0, 5, 0, 0), m(1, 5, 0, 0), m(2, 5, 0, 0)];
        sort_matches(&mut ms);
        hyper_sort(&mut ms, 2, 1);
        // queries 0 and 1 share true id 0 and form the bigger interval
        assert_eq!(ms[0].qry_id, 0);
        assert_eq!(ms[1].qry_id, 1);
        assert_eq!(ms[2].qry_id, 2);
    }
}
