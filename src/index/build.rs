//! Index construction: the mkindexn / mkindexp subcommands.
//!
//! Reads the subject FASTA, optionally translates it into six frames and
//! reduces the alphabet, builds the suffix array over the reduced view and
//! persists the index directory. Taxonomy files are optional; when given,
//! the accession->taxId mapping and the parent tree are folded into the
//! index so searches can annotate matches.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashMap;

use crate::alphabet::{
    detect_alphabet, encode_aa_seq, encode_dna_seq, genetic_code::GeneticCode, reduce_seq,
    six_frames, AlphabetKind,
};
use crate::errors::SearchError;
use crate::index::{
    sa_sort::create_suffix_array, save, IndexMeta, IndexType, SubjectStore, TaxStore,
    INDEX_MAGIC, INDEX_VERSION,
};
use crate::search::args::resolve_threads;

#[derive(Args, Debug, Clone)]
pub struct MkindexArgs {
    /// Subject database (FASTA)
    #[arg(short = 'd', long)]
    pub database: PathBuf,

    /// Output index directory
    #[arg(short = 'i', long)]
    pub index: PathBuf,

    /// Genetic code for subject translation
    #[arg(long, default_value_t = 1)]
    pub genetic_code: u8,

    /// Alphabet reduction for protein indexes: murphy10 or none
    #[arg(long, default_value = "murphy10")]
    pub reduced_alphabet: String,

    /// Accession -> taxId mapping file (tab-separated, one pair per line)
    #[arg(long)]
    pub tax_mapping: Option<PathBuf>,

    /// Taxonomy tree file ("node<TAB>parent" per line; 0 is the root)
    #[arg(long)]
    pub tax_tree: Option<PathBuf>,

    /// Worker threads; 0 honors SAHARA_NUM_THREADS, then all cores
    #[arg(long, default_value_t = 0)]
    pub num_threads: usize,

    /// Verbosity 0..3
    #[arg(short, long, default_value_t = 1)]
    pub verbosity: u8,
}

pub fn run(args: &MkindexArgs, protein_index: bool) -> Result<()> {
    let verbosity = args.verbosity;

    if verbosity >= 1 {
        eprintln!("Reading database sequences...");
    }
    let reader = bio::io::fasta::Reader::from_file(&args.database).map_err(|e| {
        SearchError::index(format!("cannot open '{}': {e}", args.database.display()))
    })?;
    let mut ids: Vec<String> = Vec::new();
    let mut raw_seqs: Vec<Vec<u8>> = Vec::new();
    for rec in reader.records() {
        let rec = rec.map_err(|e| {
            SearchError::index(format!(
                "unparseable FASTA record in '{}': {e}",
                args.database.display()
            ))
        })?;
        ids.push(rec.id().to_string());
        raw_seqs.push(rec.seq().to_vec());
    }
    if raw_seqs.is_empty() {
        return Err(SearchError::index(format!(
            "'{}' contains no sequences",
            args.database.display()
        ))
        .into());
    }

    let db_alphabet = detect_alphabet(&raw_seqs[0]);
    let reduced = parse_reduction(&args.reduced_alphabet, protein_index)?;
    let code = GeneticCode::from_id(args.genetic_code)?;

    let (meta_alphabets, s_frames) = match (protein_index, db_alphabet) {
        (false, AlphabetKind::Dna5) => ((AlphabetKind::Dna5, AlphabetKind::Dna5, AlphabetKind::Dna5), 1u32),
        (false, _) => {
            return Err(SearchError::config(
                "the database looks like protein; nucleotide indexes need nucleotide \
                 input. Did you want 'sahara mkindexp'?",
            )
            .into())
        }
        (true, AlphabetKind::Dna5) => ((AlphabetKind::Dna5, AlphabetKind::AminoAcid, reduced), 6u32),
        (true, _) => ((AlphabetKind::AminoAcid, AlphabetKind::AminoAcid, reduced), 1u32),
    };
    let (orig_alphabet, trans_alphabet, reduced_alphabet) = meta_alphabets;

    if verbosity >= 2 {
        eprintln!(
            "  {} sequences, alphabet {}, {} frame(s) per subject",
            raw_seqs.len(),
            db_alphabet.name(),
            s_frames
        );
    }

    // translated/encoded subject store
    let mut orig_lens: Vec<u32> = Vec::with_capacity(raw_seqs.len());
    let mut seqs: Vec<Vec<u8>> = Vec::with_capacity(raw_seqs.len() * s_frames as usize);
    let mut frames: Vec<i8> = Vec::with_capacity(seqs.capacity());
    for raw in &raw_seqs {
        orig_lens.push(raw.len() as u32);
        if s_frames == 6 {
            for frame in six_frames(raw, &code) {
                frames.push(frame.frame);
                seqs.push(frame.seq);
            }
        } else if trans_alphabet == AlphabetKind::Dna5 {
            frames.push(1);
            seqs.push(encode_dna_seq(raw));
        } else {
            frames.push(0);
            seqs.push(encode_aa_seq(raw));
        }
    }

    let db_total_length: u64 = seqs.iter().map(|s| s.len() as u64).sum();
    let meta = IndexMeta {
        magic: INDEX_MAGIC,
        version: INDEX_VERSION,
        index_type: IndexType::SuffixArray,
        orig_alphabet,
        trans_alphabet,
        reduced_alphabet,
        genetic_code: args.genetic_code,
        s_frames,
        db_total_length,
        db_num_seqs: ids.len() as u64,
    };

    // suffix array over the reduced view
    let red_seqs: Vec<Vec<u8>> = seqs.iter().map(|s| reduce_seq(reduced_alphabet, s)).collect();
    if verbosity >= 1 {
        eprintln!("Building suffix array over {} positions...", db_total_length);
    }
    let bar = if verbosity >= 1 {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
                .unwrap(),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(args.num_threads))
        .build()
        .map_err(|e| SearchError::config(format!("failed to build thread pool: {e}")))?;
    let sa = pool.install(|| {
        create_suffix_array(&red_seqs, reduced_alphabet.size(), |p| bar.set_position(p))
    })?;
    bar.finish();

    let tax = match (&args.tax_mapping, &args.tax_tree) {
        (Some(mapping), Some(tree)) => {
            if verbosity >= 1 {
                eprintln!("Reading taxonomy...");
            }
            let (parents, heights) = parse_tax_tree(tree)?;
            let subj_tax_ids = parse_tax_mapping(mapping, &ids)?;
            Some(TaxStore { parents, heights, subj_tax_ids })
        }
        (None, None) => None,
        _ => {
            return Err(SearchError::config(
                "--tax-mapping and --tax-tree must be given together",
            )
            .into())
        }
    };

    let subjects = SubjectStore { ids, orig_lens, seqs, frames };
    save(&args.index, &meta, &subjects, &sa, tax.as_ref())?;
    if verbosity >= 1 {
        eprintln!("Index written to {}", args.index.display());
    }
    Ok(())
}

fn parse_reduction(name: &str, protein_index: bool) -> Result<AlphabetKind> {
    if !protein_index {
        return Ok(AlphabetKind::Dna5);
    }
    match name.to_ascii_lowercase().as_str() {
        "murphy10" => Ok(AlphabetKind::Murphy10),
        "none" | "aminoacid" => Ok(AlphabetKind::AminoAcid),
        other => Err(SearchError::config(format!(
            "unknown alphabet reduction '{other}' (use murphy10 or none)"
        ))
        .into()),
    }
}

/// Parse "node<TAB>parent" lines into parent and height arrays. Heights
/// are derived by walking every node to the root.
pub fn parse_tax_tree(path: &Path) -> Result<(Vec<u32>, Vec<u32>)> {
    let file = File::open(path)
        .map_err(|e| SearchError::index(format!("cannot open '{}': {e}", path.display())))?;
    let mut parents: Vec<u32> = vec![0];
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            SearchError::index(format!("error reading '{}': {e}", path.display()))
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut cols = line.split_whitespace();
        let (Some(node), Some(parent)) = (cols.next(), cols.next()) else {
            return Err(SearchError::taxonomy(format!(
                "'{}' line {}: expected 'node parent'",
                path.display(),
                lineno + 1
            ))
            .into());
        };
        let node: u32 = node.parse().map_err(|_| {
            SearchError::taxonomy(format!("'{}' line {}: bad node id", path.display(), lineno + 1))
        })?;
        let parent: u32 = parent.parse().map_err(|_| {
            SearchError::taxonomy(format!(
                "'{}' line {}: bad parent id",
                path.display(),
                lineno + 1
            ))
        })?;
        if parents.len() <= node as usize {
            parents.resize(node as usize + 1, 0);
        }
        parents[node as usize] = parent;
    }

    let mut heights = vec![0u32; parents.len()];
    for node in 1..parents.len() {
        let mut n = node as u32;
        let mut steps = 0u32;
        while n != 0 {
            n = parents[n as usize];
            steps += 1;
            if steps as usize > parents.len() {
                return Err(SearchError::taxonomy(format!(
                    "node {node} never reaches the root (cycle in '{}')",
                    path.display()
                ))
                .into());
            }
        }
        heights[node] = steps;
    }
    Ok((parents, heights))
}

/// Parse an accession->taxId mapping; accessions are matched against the
/// subject ids (first header token) and unknown accessions are skipped.
pub fn parse_tax_mapping(path: &Path, ids: &[String]) -> Result<Vec<Vec<u32>>> {
    let rank: FxHashMap<&str, usize> =
        ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    let mut subj_tax_ids: Vec<Vec<u32>> = vec![Vec::new(); ids.len()];

    let file = File::open(path)
        .map_err(|e| SearchError::index(format!("cannot open '{}': {e}", path.display())))?;
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            SearchError::index(format!("error reading '{}': {e}", path.display()))
        })?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut cols = line.split_whitespace();
        let (Some(acc), Some(tax)) = (cols.next(), cols.next()) else {
            continue;
        };
        let Some(&idx) = rank.get(acc) else {
            continue;
        };
        let tax: u32 = tax.parse().map_err(|_| {
            SearchError::taxonomy(format!(
                "'{}' line {}: expected a taxonomical ID, got '{tax}'",
                path.display(),
                lineno + 1
            ))
        })?;
        subj_tax_ids[idx].push(tax);
    }
    Ok(subj_tax_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tax_tree_heights_are_derived() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1\t0\n2\t1\n3\t1\n4\t2\n5\t2").unwrap();
        let (parents, heights) = parse_tax_tree(f.path()).unwrap();
        assert_eq!(parents, vec![0, 0, 1, 1, 2, 2]);
        assert_eq!(heights, vec![0, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn tax_tree_cycle_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1\t2\n2\t1").unwrap();
        assert!(parse_tax_tree(f.path()).is_err());
    }

    #[test]
    fn tax_mapping_matches_known_accessions() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "acc1\t561\nacc1\t562\nunknown\t999").unwrap();
        let ids = vec!["acc1".to_string(), "acc2".to_string()];
        let tax = parse_tax_mapping(f.path(), &ids).unwrap();
        assert_eq!(tax[0], vec![561, 562]);
        assert!(tax[1].is_empty());
    }

    #[test]
    fn reduction_names() {
        assert_eq!(parse_reduction("murphy10", true).unwrap(), AlphabetKind::Murphy10);
        assert_eq!(parse_reduction("none", true).unwrap(), AlphabetKind::AminoAcid);
        assert_eq!(parse_reduction("anything", false).unwrap(), AlphabetKind::Dna5);
        assert!(parse_reduction("bogus", true).is_err());
    }
}
