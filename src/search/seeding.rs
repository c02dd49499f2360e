//! Seed search over the reduced query view.
//!
//! Seeds slide across each query frame at `seed_offset` intervals, with a
//! final seed flush against the frame end so the tail is always covered.
//! Every index hit becomes one raw `Match`; the per-seed hit cap truncates
//! silently by contract.

use crate::index::SeedIndex;
use crate::search::holders::SearchStats;
use crate::search::matches::Match;

pub struct SeedParams {
    pub seed_length: usize,
    pub seed_offset: usize,
    pub max_seed_hits: usize,
}

/// Emit matches for every seed of one reduced query frame. Matches are not
/// sorted on emit.
pub fn search_frame(
    index: &dyn SeedIndex,
    red_frame: &[u8],
    qry_id: u32,
    params: &SeedParams,
    matches: &mut Vec<Match>,
    scratch: &mut Vec<(u32, u32)>,
    stats: &mut SearchStats,
) {
    let len = red_frame.len();
    if len < params.seed_length {
        return;
    }
    let last = len - params.seed_length;
    let mut offsets: Vec<usize> = (0..=last).step_by(params.seed_offset.max(1)).collect();
    if offsets.last() != Some(&last) {
        offsets.push(last);
    }

    for off in offsets {
        let seed = &red_frame[off..off + params.seed_length];
        scratch.clear();
        index.lookup(seed, params.max_seed_hits, scratch);
        stats.hit_count += scratch.len() as u64;
        for &(subj_id, subj_off) in scratch.iter() {
            matches.push(Match {
                qry_id,
                subj_id,
                qry_start: off as u32,
                subj_start: subj_off,
                length: params.seed_length as u32,
            });
        }
    }
}
