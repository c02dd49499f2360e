//! Shared and per-worker search state.
//!
//! `GlobalHolder` is created once per search and read-shared by all
//! workers; the only mutation after startup goes through the output and
//! stats mutexes. `LocalHolder` is exclusively owned by one worker and
//! reused across the blocks that worker claims.

use std::io::Write;
use std::ops::AddAssign;
use std::sync::Mutex;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::alphabet::Frame;
use crate::index::Index;
use crate::report::OutputFormat;
use crate::search::args::{BlastProgram, SearchArgs};
use crate::search::matches::Match;
use crate::search::scoring::ScoringScheme;
use crate::stats::{compute_length_adjustment, evalue_from_raw_score};

#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub hit_count: u64,
    pub extension_count: u64,
    pub successful_extensions: u64,
    pub records_written: u64,
    pub time_search: Duration,
    pub time_sort: Duration,
    pub time_extend: Duration,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.hit_count += rhs.hit_count;
        self.extension_count += rhs.extension_count;
        self.successful_extensions += rhs.successful_extensions;
        self.records_written += rhs.records_written;
        self.time_search += rhs.time_search;
        self.time_sort += rhs.time_sort;
        self.time_extend += rhs.time_extend;
    }
}

/// One query with its prepared frames. `frames` holds the translated
/// encoding used for extension, `red_frames` the reduced view used for
/// seeding; both are indexed by frame number within the program.
pub struct QueryRecord {
    pub id: String,
    pub orig_len: usize,
    pub frames: Vec<Frame>,
    pub red_frames: Vec<Vec<u8>>,
}

pub struct GlobalHolder {
    pub program: BlastProgram,
    pub index: Index,
    pub queries: Vec<QueryRecord>,
    pub scoring: ScoringScheme,
    pub out: Mutex<Box<dyn Write + Send>>,
    pub out_format: OutputFormat,
    /// Classification mode: taxid/lca columns requested.
    pub with_tax_columns: bool,
    pub stats: Mutex<SearchStats>,
}

impl GlobalHolder {
    pub fn q_frames(&self) -> u32 {
        self.program.q_frames()
    }

    pub fn s_frames(&self) -> u32 {
        self.program.s_frames()
    }

    pub fn db_total_length(&self) -> u64 {
        self.index.meta.db_total_length
    }

    /// Resolve a frame-encoded query id.
    pub fn query_frame(&self, qry_id: u32) -> (&QueryRecord, &Frame) {
        let qf = self.q_frames();
        let rec = &self.queries[(qry_id / qf) as usize];
        (rec, &rec.frames[(qry_id % qf) as usize])
    }
}

pub struct LocalHolder<'g> {
    pub gh: &'g GlobalHolder,
    pub args: &'g SearchArgs,
    pub stats: SearchStats,
    pub block: usize,
    pub matches: Vec<Match>,
    /// Band memoization, `sequence length -> band width`.
    pub band_table: FxHashMap<u64, i64>,
    /// Length-adjustment cache, `query length -> adjustment`. Duplicated
    /// across workers instead of synchronized; recomputation is idempotent.
    length_adjustments: FxHashMap<u64, u64>,
    pub seed_scratch: Vec<(u32, u32)>,
}

impl<'g> LocalHolder<'g> {
    pub fn new(gh: &'g GlobalHolder, args: &'g SearchArgs) -> Self {
        LocalHolder {
            gh,
            args,
            stats: SearchStats::default(),
            block: 0,
            matches: Vec::new(),
            band_table: FxHashMap::default(),
            length_adjustments: FxHashMap::default(),
            seed_scratch: Vec::new(),
        }
    }

    /// Reset per-block state; caches survive across blocks.
    pub fn init(&mut self, block: usize) {
        self.block = block;
        self.matches.clear();
    }

    fn cached_length_adjustment(&mut self, query_len: u64) -> u64 {
        if let Some(&adj) = self.length_adjustments.get(&query_len) {
            return adj;
        }
        let adj = compute_length_adjustment(
            query_len,
            self.gh.db_total_length(),
            self.gh.index.meta.db_num_seqs,
            self.gh.scoring.params(),
        );
        self.length_adjustments.insert(query_len, adj);
        adj
    }

    /// E-value of a raw score for a query of the given original length.
    /// Translated query lengths are divided by 3 before the cache lookup.
    pub fn evalue_of(&mut self, raw_score: i32, query_orig_len: usize) -> f64 {
        let ql = if self.gh.program.query_is_translated() {
            (query_orig_len as u64) / 3
        } else {
            query_orig_len as u64
        };
        let adj = self.cached_length_adjustment(ql);
        let eff_q = ql.saturating_sub(adj).max(1) as f64;
        let eff_db = self.gh.db_total_length().saturating_sub(adj).max(1) as f64;
        evalue_from_raw_score(raw_score, self.gh.scoring.params(), eff_q * eff_db)
    }
}
