//! Search options, blast program selection and inference.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, ValueEnum};

use crate::alphabet::AlphabetKind;
use crate::errors::SearchError;
use crate::index::IndexMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlastProgram {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
}

impl BlastProgram {
    pub fn name(self) -> &'static str {
        match self {
            BlastProgram::Blastn => "blastn",
            BlastProgram::Blastp => "blastp",
            BlastProgram::Blastx => "blastx",
            BlastProgram::Tblastn => "tblastn",
            BlastProgram::Tblastx => "tblastx",
        }
    }

    /// Query frames folded into `qry_id` (strands for blastn, reading
    /// frames for translated queries).
    pub fn q_frames(self) -> u32 {
        match self {
            BlastProgram::Blastn => 2,
            BlastProgram::Blastp | BlastProgram::Tblastn => 1,
            BlastProgram::Blastx | BlastProgram::Tblastx => 6,
        }
    }

    /// Subject frames folded into `subj_id`.
    pub fn s_frames(self) -> u32 {
        match self {
            BlastProgram::Tblastn | BlastProgram::Tblastx => 6,
            _ => 1,
        }
    }

    pub fn query_is_translated(self) -> bool {
        matches!(self, BlastProgram::Blastx | BlastProgram::Tblastx)
    }

    pub fn subject_is_translated(self) -> bool {
        matches!(self, BlastProgram::Tblastn | BlastProgram::Tblastx)
    }

    pub fn query_is_nucleotide(self) -> bool {
        matches!(self, BlastProgram::Blastn | BlastProgram::Blastx | BlastProgram::Tblastx)
    }
}

/// Which alphabet the invoked subcommand promises for the query/index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Any,
    Nucleotide,
    Protein,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Query sequences (FASTA or FASTQ)
    #[arg(short, long)]
    pub query: PathBuf,

    /// Index directory created by mkindexn / mkindexp
    #[arg(short, long)]
    pub index: PathBuf,

    /// Output file; format inferred from the extension (.m8/.tsv tabular,
    /// .m0 pairwise). Standard output when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Blast program; inferred from the alphabets when omitted
    #[arg(short, long, value_enum)]
    pub program: Option<BlastProgram>,

    /// E-value cutoff
    #[arg(short, long, default_value_t = 1e-3)]
    pub e_value: f64,

    /// Band: -3 = log, -2 = sqrt, -1 = unbounded, >= 0 fixed width
    #[arg(long, default_value_t = -3, allow_hyphen_values = true)]
    pub band: i64,

    /// Verbosity 0..3
    #[arg(short, long, default_value_t = 1)]
    pub verbosity: u8,

    /// Worker threads; 0 honors SAHARA_NUM_THREADS, then all cores
    #[arg(long, default_value_t = 0)]
    pub num_threads: usize,

    /// Protein scoring matrix
    #[arg(long, default_value = "blosum62")]
    pub scoring_scheme: String,

    /// Gap open cost (matrix-dependent default: 11 protein, 5 nucleotide)
    #[arg(long)]
    pub gap_open: Option<i32>,

    /// Gap extension cost (default: 1 protein, 2 nucleotide)
    #[arg(long)]
    pub gap_extend: Option<i32>,

    /// Nucleotide match reward
    #[arg(long, default_value_t = 2)]
    pub reward: i32,

    /// Nucleotide mismatch penalty
    #[arg(long, default_value_t = -3, allow_hyphen_values = true)]
    pub penalty: i32,

    /// Seed length in the reduced alphabet
    #[arg(long, default_value_t = 10)]
    pub seed_length: usize,

    /// Step between seed start positions
    #[arg(long, default_value_t = 5)]
    pub seed_offset: usize,

    /// Cap on index hits per seed (truncates silently)
    #[arg(long, default_value_t = 256)]
    pub max_seed_hits: usize,

    /// Abundance threshold per (query, subject) pair; 0 disables the filter
    #[arg(long, default_value_t = 500)]
    pub filter_putative_abundant: usize,

    /// Drop abundant pairs entirely instead of keeping the longest seeds
    #[arg(long, action = ArgAction::SetTrue)]
    pub filter_abundant_strict: bool,

    /// Remove seeds with identical coordinates before extension
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub filter_putative_duplicates: bool,

    /// Merge overlapping same-diagonal seeds before extension
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub merge_putative_siblings: bool,

    /// Regroup per-pair match runs largest-first before extension
    #[arg(long, action = ArgAction::SetTrue)]
    pub hyper_sort: bool,

    /// Tabular column set: "std" or "std taxid lca"
    #[arg(long)]
    pub output_columns: Option<String>,

    /// Queries per worker block; 0 sizes blocks from the thread count
    #[arg(long, default_value_t = 0)]
    pub queries_per_block: usize,

    /// Genetic code for query translation; 0 uses the index's code
    #[arg(long, default_value_t = 0)]
    pub genetic_code: u8,
}

impl SearchArgs {
    pub fn any_match_filter(&self) -> bool {
        self.filter_putative_abundant > 0
            || self.filter_putative_duplicates
            || self.merge_putative_siblings
    }

    /// Resolved worker count: flag, then SAHARA_NUM_THREADS, then all cores.
    pub fn resolved_threads(&self) -> usize {
        resolve_threads(self.num_threads)
    }
}

/// 0 defers to the SAHARA_NUM_THREADS environment variable, then to the
/// hardware parallelism.
pub fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    if let Ok(v) = std::env::var("SAHARA_NUM_THREADS") {
        if let Ok(n) = v.parse::<usize>() {
            if n > 0 {
                return n;
            }
        }
    }
    num_cpus::get()
}

/// Decide the blast program from the index alphabets and the detected
/// query alphabet, mirroring the index-vs-query decision table.
pub fn infer_program(meta: &IndexMeta, query_alphabet: AlphabetKind) -> Result<BlastProgram> {
    if meta.trans_alphabet == AlphabetKind::Dna5 {
        if query_alphabet == AlphabetKind::AminoAcid {
            return Err(SearchError::index(
                "query file is protein, but the index is nucleotide. \
                 Recreate the index with 'sahara mkindexp'.",
            )
            .into());
        }
        return Ok(BlastProgram::Blastn);
    }
    if query_alphabet == AlphabetKind::Dna5 {
        // query will be translated
        if meta.orig_alphabet == meta.trans_alphabet {
            Ok(BlastProgram::Blastx)
        } else {
            Ok(BlastProgram::Tblastx)
        }
    } else if meta.orig_alphabet == meta.trans_alphabet {
        Ok(BlastProgram::Blastp)
    } else {
        Ok(BlastProgram::Tblastn)
    }
}

/// Reject combinations the index cannot serve.
pub fn validate_program(meta: &IndexMeta, program: BlastProgram, mode: SearchMode) -> Result<()> {
    if program == BlastProgram::Blastn && meta.reduced_alphabet != AlphabetKind::Dna5 {
        return Err(SearchError::config(
            "you are attempting a nucleotide search on a protein index. \
             Did you want to use 'sahara searchp' instead?",
        )
        .into());
    }
    if program != BlastProgram::Blastn && meta.reduced_alphabet == AlphabetKind::Dna5 {
        return Err(SearchError::config(format!(
            "{} requires a protein index; this index is nucleotide. \
             Did you want to use 'sahara searchn' instead?",
            program.name()
        ))
        .into());
    }
    match mode {
        SearchMode::Nucleotide if program != BlastProgram::Blastn => {
            Err(SearchError::config(format!(
                "'searchn' performs nucleotide searches, but the inputs select {}",
                program.name()
            ))
            .into())
        }
        SearchMode::Protein if program == BlastProgram::Blastn => {
            Err(SearchError::config(
                "'searchp' performs protein searches, but the inputs select blastn",
            )
            .into())
        }
        _ => Ok(()),
    }
}
