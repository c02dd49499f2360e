//! End-to-end searches against freshly built index directories.

use std::fs;
use std::path::{Path, PathBuf};

use sahara::index::build::{run as mkindex, MkindexArgs};
use sahara::search::args::{SearchArgs, SearchMode};
use sahara::search::pipeline;

fn mkindex_args(database: PathBuf, index: PathBuf, reduction: &str) -> MkindexArgs {
    MkindexArgs {
        database,
        index,
        genetic_code: 1,
        reduced_alphabet: reduction.to_string(),
        tax_mapping: None,
        tax_tree: None,
        num_threads: 1,
        verbosity: 0,
    }
}

fn search_args(query: PathBuf, index: PathBuf, output: PathBuf) -> SearchArgs {
    SearchArgs {
        query,
        index,
        output: Some(output),
        program: None,
        e_value: 1e-3,
        band: -3,
        verbosity: 0,
        num_threads: 1,
        scoring_scheme: "blosum62".to_string(),
        gap_open: None,
        gap_extend: None,
        reward: 2,
        penalty: -3,
        seed_length: 10,
        seed_offset: 5,
        max_seed_hits: 256,
        filter_putative_abundant: 500,
        filter_abundant_strict: false,
        filter_putative_duplicates: true,
        merge_putative_siblings: true,
        hyper_sort: false,
        output_columns: None,
        queries_per_block: 0,
        genetic_code: 0,
    }
}

fn write_fasta(path: &Path, records: &[(&str, &str)]) {
    let mut text = String::new();
    for (id, seq) in records {
        text.push_str(&format!(">{id}\n{seq}\n"));
    }
    fs::write(path, text).unwrap();
}

/// One query of length 30 against one subject of length 100 with an exact
/// 15-mer embedded at subject offset 42 yields exactly one record with 15
/// identities.
#[test]
fn tiny_protein_search_finds_the_embedded_word() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.fasta");
    let query = dir.path().join("query.fasta");
    let index = dir.path().join("index");
    let out = dir.path().join("out.m8");

    let core = "WCHKMFYREDNAQGT";
    let subject = format!("{}{core}{}", "G".repeat(42), "G".repeat(43));
    let query_seq = format!("PPPPP{core}{}", "P".repeat(10));
    assert_eq!(subject.len(), 100);
    assert_eq!(query_seq.len(), 30);

    write_fasta(&db, &[("subj1 test subject", &subject)]);
    write_fasta(&query, &[("query1", &query_seq)]);

    mkindex(&mkindex_args(db, index.clone(), "none"), true).unwrap();
    pipeline::run(search_args(query, index, out.clone()), SearchMode::Protein).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "expected exactly one record, got: {text}");

    let cols: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(cols[0], "query1");
    assert_eq!(cols[1], "subj1");
    assert_eq!(cols[2], "100.000");
    assert_eq!(cols[3], "15"); // alignment length == identities
    assert_eq!(cols[4], "0");
    assert_eq!(cols[5], "0");
    assert_eq!(cols[6], "6");
    assert_eq!(cols[7], "20");
    assert_eq!(cols[8], "43");
    assert_eq!(cols[9], "57");
    let e_value: f64 = cols[10].parse().unwrap();
    assert!(e_value < 1e-3);
    let bits: f64 = cols[11].parse().unwrap();
    assert!(bits > 20.0);
}

#[test]
fn blastn_search_finds_an_exact_region() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.fasta");
    let query = dir.path().join("query.fasta");
    let index = dir.path().join("index");
    let out = dir.path().join("out.m8");

    let subject = concat!(
        "ATGGCGTACCTTGAAGCGTCAGGCTAGCTAACGATCGTACGGATTCACCAGGTCAAGCTT",
        "GGCTTAACCGGTATCGAGCTTACGGCATTAGCCAGTCCAGATTGCTGCAACGTTAGGCAC",
    );
    let query_seq = &subject[50..80];

    write_fasta(&db, &[("chr1", subject)]);
    write_fasta(&query, &[("read1", query_seq)]);

    mkindex(&mkindex_args(db, index.clone(), "none"), false).unwrap();
    pipeline::run(search_args(query, index, out.clone()), SearchMode::Nucleotide).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let hit = text.lines().find(|line| {
        let cols: Vec<&str> = line.split('\t').collect();
        cols[2] == "100.000" && cols[6] == "1" && cols[7] == "30"
    });
    let hit = hit.unwrap_or_else(|| panic!("no perfect hit in: {text}"));
    let cols: Vec<&str> = hit.split('\t').collect();
    assert_eq!(cols[0], "read1");
    assert_eq!(cols[1], "chr1");
    assert_eq!(cols[8], "51");
    assert_eq!(cols[9], "80");
}

/// Given the same inputs and options, the emitted record sequence is
/// byte-identical across runs; across thread counts the record multiset
/// is preserved (inter-chunk order is unspecified).
#[test]
fn chunk_output_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.fasta");
    let query = dir.path().join("query.fasta");
    let index = dir.path().join("index");

    let core = "WCHKMFYREDNAQGT";
    let subject = format!("{}{core}{}", "G".repeat(42), "G".repeat(43));
    write_fasta(&db, &[("subj1", &subject)]);

    let queries: Vec<(String, String)> = (0..6)
        .map(|i| {
            (format!("q{i}"), format!("PPPPP{core}{}", "P".repeat(10)))
        })
        .collect();
    let query_refs: Vec<(&str, &str)> =
        queries.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    write_fasta(&query, &query_refs);

    mkindex(&mkindex_args(db, index.clone(), "murphy10"), true).unwrap();

    let run_with = |threads: usize, name: &str| -> String {
        let out = dir.path().join(name);
        let mut args = search_args(query.clone(), index.clone(), out.clone());
        args.num_threads = threads;
        pipeline::run(args, SearchMode::Protein).unwrap();
        fs::read_to_string(&out).unwrap()
    };

    let first = run_with(1, "a.m8");
    let second = run_with(1, "b.m8");
    assert_eq!(first, second);

    let parallel = run_with(4, "c.m8");
    let mut sorted_first: Vec<&str> = first.lines().collect();
    let mut sorted_parallel: Vec<&str> = parallel.lines().collect();
    sorted_first.sort_unstable();
    sorted_parallel.sort_unstable();
    assert_eq!(sorted_first, sorted_parallel);
}

/// Taxonomy files flow through the index into the lca column.
#[test]
fn classification_columns_carry_the_lca() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.fasta");
    let query = dir.path().join("query.fasta");
    let index = dir.path().join("index");
    let out = dir.path().join("out.m8");
    let mapping = dir.path().join("acc2tax.tsv");
    let tree = dir.path().join("nodes.tsv");

    let core = "WCHKMFYREDNAQGT";
    let subject = format!("{}{core}{}", "G".repeat(42), "G".repeat(43));
    write_fasta(&db, &[("subj1", &subject)]);
    write_fasta(&query, &[("query1", &format!("PPPPP{core}{}", "P".repeat(10)))]);
    // tree: 1 under 0; 2, 3 under 1 -- subj1 maps to both leaves
    fs::write(&tree, "1\t0\n2\t1\n3\t1\n").unwrap();
    fs::write(&mapping, "subj1\t2\nsubj1\t3\n").unwrap();

    let mut margs = mkindex_args(db, index.clone(), "none");
    margs.tax_mapping = Some(mapping);
    margs.tax_tree = Some(tree);
    mkindex(&margs, true).unwrap();

    let mut args = search_args(query, index, out.clone());
    args.output_columns = Some("std taxid lca".to_string());
    pipeline::run(args, SearchMode::Protein).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let cols: Vec<&str> = text.lines().next().unwrap().split('\t').collect();
    assert_eq!(cols.len(), 14);
    assert_eq!(cols[12], "2;3");
    assert_eq!(cols[13], "1");
}
