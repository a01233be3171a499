//! Loads a grammar from its textual BNF-style notation.
//!
//! One production per line: `<name>::=rule|...|rule`. Inside a rule,
//! `<...>` references a non-terminal, a backslash escapes the four
//! syntactic markers, and every other character is a terminal. An empty
//! rule is ε.

use std::{
    collections::HashMap,
    fmt::{self, Display},
    io::{self, BufRead},
};

use grammar::cfg::{Derivation, Grammar, NonTerminal, Symbol};

/// Errors raised while reading grammar text. All of them are fatal for
/// the current session.
#[derive(Debug)]
pub enum Error {
    /// A line does not contain exactly one `::=` production sign.
    MissingProductionSign,
    /// The left-hand side is not a single `<name>` reference.
    MalformedNonTerminal,
    /// `<` occurred inside a non-terminal reference.
    NestedBracket,
    /// `>` occurred outside a non-terminal reference.
    UnmatchedClose,
    /// The line ended inside a non-terminal reference.
    UnterminatedNonTerminal,
    /// The line ended right after an escape character.
    UnterminatedEscape,
    /// Something other than `<`, `>`, `|` or `\` was escaped.
    InvalidEscape(char),
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
        let str = match self {
            Error::MissingProductionSign => "production must be of the form <name>::=rule|...|rule",
            Error::MalformedNonTerminal => "non-terminal symbol must be of the form <name>",
            Error::NestedBracket => "'<' cannot appear inside a non-terminal reference",
            Error::UnmatchedClose => "'>' symbol must end a '<', not come on its own",
            Error::UnterminatedNonTerminal => "non-terminal reference must end with '>'",
            Error::UnterminatedEscape => "escape symbol must be followed by something",
            Error::InvalidEscape(c) => {
                return write!(f, "only '<', '>', '|' and '\\' can be escaped, not {:?}", c)
            }
            Error::Io(e) => return write!(f, "i/o error occurred ({:?})", e),
        };

        write!(f, "{}", str)
    }
}

/// Maps non-terminal names to stable ids, counting from zero in order of
/// first appearance.
#[derive(Default)]
struct Names {
    /// Ids assigned so far.
    ids: HashMap<String, NonTerminal>,
}

impl Names {
    /// The id of `name`, assigning the next free one on first sight.
    fn resolve(&mut self, name: &str) -> NonTerminal {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.ids.len() as NonTerminal;
        self.ids.insert(name.to_string(), id);
        id
    }
}

/// Reads one grammar from the input. The first non-terminal encountered
/// becomes the start symbol.
///
/// # Errors
///
/// Any I/O failure or violation of the surface syntax aborts the load.
pub fn parse_grammar<R: BufRead>(input: R) -> Result<Grammar, Error> {
    let mut g = Grammar::new(0);
    let mut names = Names::default();

    for line in input.lines() {
        let line = line?;
        let pieces: Vec<&str> = line.split("::=").collect();
        let [lhs, rhs] = pieces.as_slice() else {
            return Err(Error::MissingProductionSign);
        };

        let name = lhs
            .trim()
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or(Error::MalformedNonTerminal)?;
        if name.contains('<') || name.contains('>') {
            return Err(Error::MalformedNonTerminal);
        }
        let nterm = names.resolve(name);

        for deriv in parse_alternatives(rhs, &mut names)? {
            g.add_rule(nterm, deriv);
        }
    }

    Ok(g)
}

/// Splits a right-hand side on unescaped `|` while decoding symbols.
fn parse_alternatives(rhs: &str, names: &mut Names) -> Result<Vec<Derivation>, Error> {
    let mut alternatives = Vec::new();
    let mut current = Derivation::new();
    let mut reference = String::new();
    let mut in_reference = false;
    let mut escaped = false;

    for symb in rhs.chars() {
        if in_reference {
            match symb {
                '<' => return Err(Error::NestedBracket),
                '>' => {
                    current.push(Symbol::NonTerminal(names.resolve(&reference)));
                    reference.clear();
                    in_reference = false;
                }
                _ => reference.push(symb),
            }
            continue;
        }
        if escaped {
            if !matches!(symb, '<' | '>' | '|' | '\\') {
                return Err(Error::InvalidEscape(symb));
            }
            current.push(Symbol::Terminal(symb));
            escaped = false;
            continue;
        }
        match symb {
            '<' => in_reference = true,
            '>' => return Err(Error::UnmatchedClose),
            '\\' => escaped = true,
            '|' => alternatives.push(std::mem::take(&mut current)),
            _ => current.push(Symbol::Terminal(symb)),
        }
    }

    if escaped {
        return Err(Error::UnterminatedEscape);
    }
    if in_reference {
        return Err(Error::UnterminatedNonTerminal);
    }
    alternatives.push(current);
    Ok(alternatives)
}
