use clap::{Parser, Subcommand};

use sahara::errors::{SearchError, BUG_REPORT_URL};
use sahara::index::build::{self, MkindexArgs};
use sahara::search::args::{SearchArgs, SearchMode};
use sahara::search::pipeline;

#[derive(Parser)]
#[command(name = "sahara")]
#[command(version)]
#[command(about = "Suffix-array homology search and rapid alignment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a nucleotide index
    Mkindexn(MkindexArgs),

    /// Build a protein (optionally translated) index
    Mkindexp(MkindexArgs),

    /// Search; the program is inferred from the index and query alphabets
    Search(SearchArgs),

    /// Nucleotide search against a nucleotide index (blastn)
    Searchn(SearchArgs),

    /// Protein or translated search against a protein index
    Searchp(SearchArgs),
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Mkindexn(args) => build::run(&args, false),
        Commands::Mkindexp(args) => build::run(&args, true),
        Commands::Search(args) => pipeline::run(args, SearchMode::Any),
        Commands::Searchn(args) => pipeline::run(args, SearchMode::Nucleotide),
        Commands::Searchp(args) => pipeline::run(args, SearchMode::Protein),
    };
    if let Err(e) = result {
        report_error(&e);
        std::process::exit(-1);
    }
}

fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<SearchError>() {
        Some(SearchError::ResourceExhausted) => {
            eprintln!("\n\nERROR: sahara ran out of memory :(");
            eprintln!(
                "       You need to split your file into smaller segments or search \
                 against a smaller database."
            );
            eprintln!(
                "       If the problem persists, report an issue at {BUG_REPORT_URL} and \
                 include this output, as well as the output of `sahara --version`, thanks!"
            );
        }
        Some(SearchError::Index(msg)) => {
            eprintln!("\n\nERROR: the following problem occurred while reading the index:");
            eprintln!("       \"{msg}\"");
            eprintln!(
                "       Make sure the directory exists and is readable; recreate the \
                 index and try again."
            );
            eprintln!(
                "       If the problem persists, report an issue at {BUG_REPORT_URL} and \
                 include this output, as well as the output of `sahara --version`, thanks!"
            );
        }
        _ => {
            eprintln!("\n\nERROR: the following unspecified error occurred:");
            eprintln!("       \"{e}\"");
            eprintln!(
                "       If the problem persists, report an issue at {BUG_REPORT_URL} and \
                 include this output, as well as the output of `sahara --version`, thanks!"
            );
        }
    }
}
