//! Interactive membership checker over BNF-style grammars.
//!
//! Prompts for a grammar file and a verdict-tagged test file, prepares
//! the grammar for predictive recursive descent and reports every
//! verdict disagreement, until `q` is entered.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fmt::{self, Display},
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use colored::Colorize;

use grammar::first::build_first;

pub mod driver;
pub mod loader;

/// Command line arguments accepted by the checker
#[derive(Clone, PartialEq, Eq, Parser)]
#[command(version, about)]
struct Args {
    /// Display all information
    #[arg(short, long)]
    verbose: bool,
    /// Run a single session over this grammar file and test file pair
    /// instead of prompting
    #[arg(num_args = 2, value_names = ["GRAMMAR", "TESTS"])]
    files: Vec<PathBuf>,
}

/// Any error that ends a checking session.
#[derive(Debug)]
enum SessionError {
    /// The grammar file could not be parsed.
    Grammar(loader::Error),
    /// The test file was malformed.
    Tests(driver::Error),
    /// Errors occurring because of I/O.
    Io(io::Error),
}

impl From<loader::Error> for SessionError {
    fn from(value: loader::Error) -> Self {
        Self::Grammar(value)
    }
}

impl From<driver::Error> for SessionError {
    fn from(value: driver::Error) -> Self {
        Self::Tests(value)
    }
}

impl From<io::Error> for SessionError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Grammar(e) => write!(f, "bad grammar file: {}", e),
            SessionError::Tests(e) => write!(f, "bad test file: {}", e),
            SessionError::Io(e) => write!(f, "i/o error occurred ({:?})", e),
        }
    }
}

fn main() -> ExitCode {
    // parse command line arguments
    let args = Args::parse();

    if let [grammar_file, test_file] = args.files.as_slice() {
        return match session(grammar_file, test_file, args.verbose) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {}", "[ERROR]".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("Input filename with grammar or q to exit");
        let Some(Ok(grammar_file)) = lines.next() else {
            break;
        };
        if grammar_file.trim() == "q" {
            break;
        }
        println!("Input filename with test sequences");
        let Some(Ok(test_file)) = lines.next() else {
            break;
        };
        // a failed session ends with a report, not with the shell
        if let Err(e) = session(
            Path::new(grammar_file.trim()),
            Path::new(test_file.trim()),
            args.verbose,
        ) {
            eprintln!("{} {}", "[ERROR]".red(), e);
        }
    }
    ExitCode::SUCCESS
}

/// Runs one full load-prepare-check session.
fn session(grammar_file: &Path, test_file: &Path, verbose: bool) -> Result<(), SessionError> {
    let file = File::open(grammar_file)?;
    let g = loader::parse_grammar(BufReader::new(file))?;

    println!("Initial grammar.");
    println!("{}", g);

    let prepared = g.prepare_for_checking();
    println!("Preparations.");
    println!("{}", prepared);

    let first = build_first(&prepared);
    if verbose {
        println!("first index: {:#?}", first);
    }

    let tests = File::open(test_file)?;
    let mismatches = driver::run_tests(&prepared, &first, BufReader::new(tests))?;

    if mismatches.is_empty() {
        println!("All cases passed");
    } else {
        for m in &mismatches {
            println!(
                "{} {:?} should be {}",
                "[MISMATCH]".yellow(),
                m.word,
                if m.expected { "accepted" } else { "rejected" }
            );
        }
    }
    Ok(())
}
