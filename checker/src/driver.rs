//! Runs verdict-tagged word sequences against a prepared grammar.
//!
//! A test file is a sequence of lines: `[true]` and `[false]` switch the
//! expected verdict, every other line is a candidate word.

use std::{
    fmt::{self, Display},
    io::{self, BufRead},
};

use grammar::{cfg::Grammar, first::First};

/// Errors raised while running a test file. Fatal for the session.
#[derive(Debug)]
pub enum Error {
    /// A candidate word appeared before any verdict directive.
    MissingDirective,
    /// Errors occurring because of I/O.
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingDirective => {
                write!(f, "test file must declare a verdict before its first word")
            }
            Error::Io(e) => write!(f, "i/o error occurred ({:?})", e),
        }
    }
}

/// A candidate whose verdict disagreed with the expectation.
#[derive(Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// The candidate word.
    pub word: String,
    /// The verdict the test file expected.
    pub expected: bool,
}

/// Checks every candidate in the input and collects the disagreements.
///
/// # Errors
///
/// Fails on I/O errors and when a candidate precedes the first
/// directive.
pub fn run_tests<R: BufRead>(
    g: &Grammar,
    first: &First,
    input: R,
) -> Result<Vec<Mismatch>, Error> {
    let mut expected: Option<bool> = None;
    let mut mismatches = Vec::new();

    for line in input.lines() {
        let line = line?;
        match line.as_str() {
            "[true]" => expected = Some(true),
            "[false]" => expected = Some(false),
            word => {
                let expected = expected.ok_or(Error::MissingDirective)?;
                if g.check_word(word, first) != expected {
                    mismatches.push(Mismatch {
                        word: word.to_string(),
                        expected,
                    });
                }
            }
        }
    }

    Ok(mismatches)
}
