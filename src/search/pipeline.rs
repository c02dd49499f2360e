//! The search driver.
//!
//! One call per search: load the index and queries, prepare scoring and
//! frames, then run the parallel chunked pipeline. Workers claim query
//! blocks from a work-stealing pool; each block runs seed search, match
//! filtering, banded extension, statistical scoring and taxonomic
//! annotation, then writes its records under the output critical section.
//! Worker 0 renders the token progress bar; stats are sum-reduced after
//! the pool drains.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::alphabet::{
    decode, detect_alphabet, frame_to_orig, genetic_code::GeneticCode, query_frames, reduce_seq,
    AlphabetKind,
};
use crate::errors::SearchError;
use crate::index;
use crate::report::{self, BlastMatch, OutputFormat};
use crate::search::args::{infer_program, validate_program, BlastProgram, SearchArgs, SearchMode};
use crate::search::extend::{band_size, banded_local_align, GAP_CODE};
use crate::search::holders::{GlobalHolder, LocalHolder, QueryRecord, SearchStats};
use crate::search::matches::{
    dedup_matches, filter_abundant, hyper_sort, merge_siblings, sort_matches, Match,
};
use crate::search::scoring::ScoringScheme;
use crate::search::seeding::{search_frame, SeedParams};
use crate::stats::bit_score;
use crate::taxonomy::Taxonomy;

pub fn run(args: SearchArgs, mode: SearchMode) -> Result<()> {
    let start = Instant::now();
    let verbosity = args.verbosity;

    if verbosity >= 1 {
        eprintln!("SAHARA - suffix-array homology search and rapid alignment");
        eprint!("Reading index properties... ");
    }
    let index = index::load(&args.index)?;
    if verbosity >= 1 {
        eprintln!("done.");
    }
    if verbosity >= 2 {
        eprintln!(
            "Index properties\n  original   alphabet: {}\n  translated alphabet: {}\n  reduced    alphabet: {}",
            index.meta.orig_alphabet.name(),
            index.meta.trans_alphabet.name(),
            index.meta.reduced_alphabet.name(),
        );
    }

    let raw_queries = read_query_records(&args.query)?;
    let query_alphabet = raw_queries
        .first()
        .map(|(_, seq)| detect_alphabet(seq))
        .unwrap_or(AlphabetKind::Dna5);
    if verbosity >= 2 {
        eprintln!("  query      alphabet: {}", query_alphabet.name());
    }

    let program = match args.program {
        Some(p) => p,
        None => infer_program(&index.meta, query_alphabet)?,
    };
    validate_program(&index.meta, program, mode)?;
    if verbosity >= 1 {
        eprintln!("Program: {}", program.name());
    }

    let code_id = if args.genetic_code == 0 { index.meta.genetic_code } else { args.genetic_code };
    if args.genetic_code != 0 && args.genetic_code != index.meta.genetic_code && verbosity >= 1 {
        eprintln!(
            "WARNING: the genetic code used when creating the index ({}) differs from \
             the one selected for the queries ({}).",
            index.meta.genetic_code, args.genetic_code
        );
    }
    let code = GeneticCode::from_id(code_id)?;

    let scoring = ScoringScheme::for_program(
        program,
        &args.scoring_scheme,
        args.gap_open,
        args.gap_extend,
        args.reward,
        args.penalty,
    )?;

    let reduced_alphabet = index.meta.reduced_alphabet;
    let queries: Vec<QueryRecord> = raw_queries
        .into_iter()
        .map(|(id, seq)| {
            let frames = query_frames(program, &seq, &code);
            let red_frames =
                frames.iter().map(|f| reduce_seq(reduced_alphabet, &f.seq)).collect();
            QueryRecord { id, orig_len: seq.len(), frames, red_frames }
        })
        .collect();

    let with_tax_columns = args
        .output_columns
        .as_deref()
        .map(|c| c.contains("taxid") || c.contains("lca"))
        .unwrap_or(false);
    if with_tax_columns && index.taxonomy.is_none() {
        return Err(SearchError::config(
            "taxid/lca columns were requested, but the index carries no taxonomy \
             (rebuild it with --tax-mapping/--tax-tree)",
        )
        .into());
    }

    let out_format = report::infer_format(args.output.as_deref());
    let sink: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let gh = GlobalHolder {
        program,
        index,
        queries,
        scoring,
        out: Mutex::new(sink),
        out_format,
        with_tax_columns,
        stats: Mutex::new(SearchStats::default()),
    };

    let threads = args.resolved_threads();
    let n_queries = gh.queries.len();
    let block_size = if args.queries_per_block > 0 {
        args.queries_per_block
    } else {
        (n_queries.div_ceil(threads * 10)).max(1)
    };
    let n_blocks = n_queries.div_ceil(block_size);

    if verbosity >= 1 {
        eprintln!(
            "Searching and extending hits on-line...progress:\n\
             0%  10%  20%  30%  40%  50%  60%  70%  80%  90%  100%"
        );
        eprint!("|");
    }

    let last_percent = Mutex::new(0u64);
    let blocks_done = AtomicU64::new(0);
    let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build thread pool")?;

    pool.install(|| {
        (0..n_blocks)
            .into_par_iter()
            .fold(
                || LocalHolder::new(&gh, &args),
                |mut lh, block| {
                    if let Err(e) = process_block(&mut lh, block, block_size) {
                        let mut slot = first_error.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                    }
                    let done = blocks_done.fetch_add(1, Ordering::Relaxed) + 1;
                    if verbosity >= 1 && rayon::current_thread_index() == Some(0) {
                        let cur = (done * 50 / n_blocks as u64) * 2;
                        print_progress_bar(&mut last_percent.lock().unwrap(), cur);
                    }
                    lh
                },
            )
            .for_each(|lh| {
                *gh.stats.lock().unwrap() += lh.stats;
            });
    });

    if verbosity >= 1 {
        print_progress_bar(&mut last_percent.lock().unwrap(), 100);
    }

    if let Some(e) = first_error.into_inner().unwrap() {
        return Err(e);
    }

    gh.out.lock().unwrap().flush().context("flushing output")?;

    if verbosity >= 2 {
        let stats = gh.stats.lock().unwrap();
        eprintln!(
            "Seed hits: {}\nExtensions: {} ({} successful)\nRecords written: {}",
            stats.hit_count,
            stats.extension_count,
            stats.successful_extensions,
            stats.records_written,
        );
        eprintln!(
            "Time: search {:.2}s, sort {:.2}s, extend {:.2}s, total {:.2}s",
            stats.time_search.as_secs_f64(),
            stats.time_sort.as_secs_f64(),
            stats.time_extend.as_secs_f64(),
            start.elapsed().as_secs_f64(),
        );
    }
    Ok(())
}

/// Token progress bar: one mark per two percent, ':' at tens, '|' at the
/// end, percentages rounded down to even.
fn print_progress_bar(last_percent: &mut u64, cur_percent: u64) {
    let cur = cur_percent & !1;
    if cur > *last_percent && cur <= 100 {
        let mut i = *last_percent + 2;
        while i <= cur {
            if i == 100 {
                eprintln!("|");
            } else if i % 10 == 0 {
                eprint!(":");
            } else {
                eprint!(".");
            }
            i += 2;
        }
        *last_percent = cur;
    }
}

fn read_query_records(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let is_fastq = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("fq") | Some("fastq")
    );
    let mut records = Vec::new();
    if is_fastq {
        let reader = bio::io::fastq::Reader::from_file(path)
            .map_err(|e| SearchError::query(format!("cannot open '{}': {e}", path.display())))?;
        for rec in reader.records() {
            let rec = rec.map_err(|e| {
                SearchError::query(format!("unparseable FASTQ record in '{}': {e}", path.display()))
            })?;
            records.push((rec.id().to_string(), rec.seq().to_vec()));
        }
    } else {
        let reader = bio::io::fasta::Reader::from_file(path)
            .map_err(|e| SearchError::query(format!("cannot open '{}': {e}", path.display())))?;
        for rec in reader.records() {
            let rec = rec.map_err(|e| {
                SearchError::query(format!("unparseable FASTA record in '{}': {e}", path.display()))
            })?;
            records.push((rec.id().to_string(), rec.seq().to_vec()));
        }
    }
    Ok(records)
}

/// Run the full per-block pipeline: seed, filter, extend, score, annotate,
/// write.
fn process_block(lh: &mut LocalHolder, block: usize, block_size: usize) -> Result<()> {
    let gh = lh.gh;
    let args = lh.args;
    lh.init(block);

    let q_begin = block * block_size;
    let q_end = ((block + 1) * block_size).min(gh.queries.len());
    let qf = gh.q_frames();

    let seed_params = SeedParams {
        seed_length: args.seed_length,
        seed_offset: args.seed_offset,
        max_seed_hits: args.max_seed_hits,
    };

    let t = Instant::now();
    for q in q_begin..q_end {
        let rec = &gh.queries[q];
        for (fi, red) in rec.red_frames.iter().enumerate() {
            let qry_id = q as u32 * qf + fi as u32;
            search_frame(
                &gh.index.seed_index,
                red,
                qry_id,
                &seed_params,
                &mut lh.matches,
                &mut lh.seed_scratch,
                &mut lh.stats,
            );
        }
    }
    lh.stats.time_search += t.elapsed();

    if args.any_match_filter() {
        let t = Instant::now();
        sort_matches(&mut lh.matches);
        if args.filter_putative_duplicates {
            dedup_matches(&mut lh.matches);
        }
        if args.merge_putative_siblings {
            merge_siblings(&mut lh.matches, args.seed_offset as u32);
        }
        if args.filter_putative_abundant > 0 {
            filter_abundant(
                &mut lh.matches,
                args.filter_putative_abundant,
                qf,
                gh.s_frames(),
                args.filter_abundant_strict,
            );
        }
        lh.stats.time_sort += t.elapsed();
    }

    if args.hyper_sort {
        hyper_sort(&mut lh.matches, qf, gh.s_frames());
    }

    let t = Instant::now();
    let matches = std::mem::take(&mut lh.matches);
    let mut records: Vec<BlastMatch> = Vec::new();
    for m in &matches {
        if let Some(rec) = extend_and_score(lh, m)? {
            records.push(rec);
        }
    }
    lh.matches = matches;
    lh.stats.time_extend += t.elapsed();

    if !records.is_empty() {
        lh.stats.records_written += records.len() as u64;
        let mut out = gh.out.lock().unwrap();
        for rec in &records {
            match gh.out_format {
                OutputFormat::Tabular => {
                    report::write_tabular(&mut *out, rec, gh.with_tax_columns)?
                }
                OutputFormat::Pairwise => report::write_pairwise(&mut *out, rec)?,
            }
        }
    }
    Ok(())
}

/// Extend one seed, score it and map it back to original coordinates.
/// Alignments below the e-value cutoff are normal outcomes, not errors.
fn extend_and_score(lh: &mut LocalHolder, m: &Match) -> Result<Option<BlastMatch>> {
    let gh = lh.gh;
    let args = lh.args;
    let (qrec, qframe) = gh.query_frame(m.qry_id);
    let q = &qframe.seq;
    let subj_seq = &gh.index.subjects.seqs[m.subj_id as usize];
    if q.is_empty() || subj_seq.is_empty() {
        return Ok(None);
    }

    lh.stats.extension_count += 1;

    let band = band_size(
        q.len().max(subj_seq.len()) as u64,
        args.band,
        &mut lh.band_table,
    );
    let band = band.clamp(1, (q.len() + subj_seq.len()) as i64);

    // subject window wide enough for the whole query plus the band
    let diag0 = m.subj_start as i64 - m.qry_start as i64;
    let w_start = (diag0 - band).max(0) as usize;
    let w_end = ((diag0 + q.len() as i64 + band).max(0) as usize).min(subj_seq.len());
    if w_start >= w_end {
        return Ok(None);
    }
    let window = &subj_seq[w_start..w_end];

    let Some(aln) =
        banded_local_align(q, window, diag0 - w_start as i64, band, &gh.scoring)
    else {
        return Ok(None);
    };

    let e_value = lh.evalue_of(aln.score, qrec.orig_len);
    if e_value > args.e_value {
        return Ok(None);
    }
    lh.stats.successful_extensions += 1;

    // coordinates back onto the original sequences
    let (q_start, q_end) = frame_to_orig(
        qframe.frame,
        qrec.orig_len,
        aln.q_start,
        aln.q_end,
        gh.program.query_is_translated(),
    );

    let s_frames = gh.s_frames();
    let true_subj = m.subj_id / s_frames;
    let sframe = gh.index.subjects.frames[m.subj_id as usize];
    let s_orig_len = gh.index.subjects.orig_lens[true_subj as usize] as usize;
    let (s_start, s_end) = frame_to_orig(
        sframe,
        s_orig_len,
        w_start + aln.s_start,
        w_start + aln.s_end,
        gh.program.subject_is_translated(),
    );

    // taxonomy annotation; malformed taxonomies are fatal only in
    // classification mode
    let taxonomy: Option<&Taxonomy> = gh.index.taxonomy.as_ref();
    let (tax_ids, lca) = match taxonomy {
        Some(tax) => {
            let ids = tax.tax_ids_of(true_subj).to_vec();
            match tax.lca_of_set(&ids) {
                Ok(l) => (ids, l),
                Err(e) if gh.with_tax_columns => return Err(e.into()),
                Err(_) => (ids, None),
            }
        }
        None => (Vec::new(), None),
    };

    let row_alphabet = if gh.program == BlastProgram::Blastn {
        AlphabetKind::Dna5
    } else {
        AlphabetKind::AminoAcid
    };
    let decode_row = |row: &[u8]| -> String {
        row.iter()
            .map(|&c| if c == GAP_CODE { '-' } else { decode(row_alphabet, c) as char })
            .collect()
    };

    let q_step: i64 = if gh.program.query_is_translated() { 3 } else { 1 };
    let q_unit = if qframe.frame < 0 { -q_step } else { q_step };
    let s_step: i64 = if gh.program.subject_is_translated() { 3 } else { 1 };
    let s_unit = if sframe < 0 { -s_step } else { s_step };

    Ok(Some(BlastMatch {
        query_id: qrec.id.clone(),
        subject_id: gh.index.subjects.ids[true_subj as usize].clone(),
        identity_pct: 100.0 * aln.identities as f64 / aln.length.max(1) as f64,
        length: aln.length,
        mismatch: aln.mismatches,
        gapopen: aln.gap_opens,
        gaps: aln.gaps,
        positives: aln.positives,
        q_start,
        q_end,
        s_start,
        s_end,
        q_frame: qframe.frame,
        s_frame: sframe,
        q_unit,
        s_unit,
        raw_score: aln.score,
        bit_score: bit_score(aln.score, gh.scoring.params()),
        e_value,
        tax_ids,
        lca,
        q_row: decode_row(&aln.q_row),
        s_row: decode_row(&aln.s_row),
    }))
}
