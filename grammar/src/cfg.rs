//! Storage of a context-free grammar over single-character terminals.
//!
//! Non-terminals are bare integer identifiers so that the transformations
//! can mint fresh ones by stepping past the extremes already in use.

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
};

/// Identifier of a non-terminal symbol. Signed, because a fresh start
/// symbol may be allocated below every existing identifier.
pub type NonTerminal = i64;

/// A single symbol in a derivation, which may or may not be terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A terminal symbol: one character of the input alphabet.
    Terminal(char),
    /// A non-terminal symbol, referring to the rules stored under its id.
    NonTerminal(NonTerminal),
}

impl PartialEq<NonTerminal> for Symbol {
    fn eq(&self, other: &NonTerminal) -> bool {
        match self {
            Self::NonTerminal(n) => n == other,
            Self::Terminal(_) => false,
        }
    }
}

/// The right-hand side of one production rule. The empty sequence is ε.
pub type Derivation = Vec<Symbol>;

/// Errors raised by the grammar store.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Attempt to delete a rule the grammar does not contain.
    UnknownRule(NonTerminal, Derivation),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownRule(nterm, deriv) => {
                write!(
                    f,
                    "no rule <{}> -> {} to delete",
                    nterm,
                    format_derivation(deriv)
                )
            }
        }
    }
}

/// A context-free grammar: a designated start symbol plus the set of
/// derivations of every non-terminal that has productions.
///
/// Right-hand sides live in sets, so duplicate rules collapse; the
/// transformations rely on this to not blow up while expanding vanishing
/// symbols or factoring prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// The designated start non-terminal.
    pub(crate) start: NonTerminal,
    /// Right-hand sides per non-terminal. Entries are never empty.
    pub(crate) rules: HashMap<NonTerminal, HashSet<Derivation>>,
}

impl Grammar {
    /// Constructs a grammar with the given start symbol and no rules.
    pub fn new(start: NonTerminal) -> Self {
        Self {
            start,
            rules: HashMap::new(),
        }
    }

    /// The designated start non-terminal.
    pub fn start(&self) -> NonTerminal {
        self.start
    }

    /// True if the grammar has no productions at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Adds one rule. Duplicate right-hand sides collapse.
    pub fn add_rule(&mut self, nterm: NonTerminal, deriv: Derivation) {
        self.rules.entry(nterm).or_default().insert(deriv);
    }

    /// Removes one rule. A non-terminal's entry disappears together with
    /// its last derivation.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnknownRule`] if the rule is not present.
    pub fn del_rule(&mut self, nterm: NonTerminal, deriv: &Derivation) -> Result<(), Error> {
        let set = self
            .rules
            .get_mut(&nterm)
            .ok_or_else(|| Error::UnknownRule(nterm, deriv.clone()))?;
        if !set.remove(deriv) {
            return Err(Error::UnknownRule(nterm, deriv.clone()));
        }
        if set.is_empty() {
            self.rules.remove(&nterm);
        }
        Ok(())
    }

    /// Whether the grammar contains this exact rule.
    pub fn has_rule(&self, nterm: NonTerminal, deriv: &Derivation) -> bool {
        self.rules.get(&nterm).is_some_and(|set| set.contains(deriv))
    }

    /// The derivations of a non-terminal, if it has any.
    pub fn derivations(&self, nterm: NonTerminal) -> Option<&HashSet<Derivation>> {
        self.rules.get(&nterm)
    }

    /// Iterates every (left, right) pair of the grammar. The order is
    /// unspecified but stable within one traversal.
    pub fn iter(&self) -> impl Iterator<Item = (NonTerminal, &Derivation)> {
        self.rules
            .iter()
            .flat_map(|(nterm, set)| set.iter().map(move |deriv| (*nterm, deriv)))
    }

    /// The maximal non-terminal identifier occurring anywhere in the
    /// grammar, the start symbol included.
    pub fn max_nonterminal(&self) -> NonTerminal {
        let mut maximal = self.start;
        for (nterm, deriv) in self.iter() {
            maximal = maximal.max(nterm);
            for symb in deriv {
                if let Symbol::NonTerminal(n) = symb {
                    maximal = maximal.max(*n);
                }
            }
        }
        maximal
    }

    /// The minimal non-terminal identifier occurring anywhere in the
    /// grammar, the start symbol included.
    pub fn min_nonterminal(&self) -> NonTerminal {
        let mut minimal = self.start;
        for (nterm, deriv) in self.iter() {
            minimal = minimal.min(nterm);
            for symb in deriv {
                if let Symbol::NonTerminal(n) = symb {
                    minimal = minimal.min(*n);
                }
            }
        }
        minimal
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initial non-terminal: <{}>", self.start)?;
        let mut nterms: Vec<NonTerminal> = self.rules.keys().copied().collect();
        nterms.sort_unstable();
        for nterm in nterms {
            let mut derivs: Vec<String> =
                self.rules[&nterm].iter().map(format_derivation).collect();
            derivs.sort_unstable();
            writeln!(f, "<{}> -> {}", nterm, derivs.join(" | "))?;
        }
        Ok(())
    }
}

/// Renders one derivation, with `[n]` standing for ε.
fn format_derivation(deriv: &Derivation) -> String {
    if deriv.is_empty() {
        return "[n]".to_string();
    }
    let mut out = String::new();
    for symb in deriv {
        match symb {
            Symbol::Terminal(c) => out.push(*c),
            Symbol::NonTerminal(n) => out.push_str(&format!("<{}>", n)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_rules_collapse() {
        let mut g = Grammar::new(0);
        g.add_rule(0, vec![Symbol::Terminal('a')]);
        g.add_rule(0, vec![Symbol::Terminal('a')]);
        assert_eq!(g.derivations(0).unwrap().len(), 1);
    }

    #[test]
    fn deleting_last_rule_drops_the_entry() {
        let mut g = Grammar::new(0);
        g.add_rule(0, vec![Symbol::Terminal('a')]);
        g.del_rule(0, &vec![Symbol::Terminal('a')]).unwrap();
        assert!(g.derivations(0).is_none());
        assert!(g.is_empty());
    }

    #[test]
    fn deleting_an_absent_rule_fails() {
        let mut g = Grammar::new(0);
        g.add_rule(0, vec![Symbol::Terminal('a')]);
        assert_eq!(
            g.del_rule(0, &vec![Symbol::Terminal('b')]),
            Err(Error::UnknownRule(0, vec![Symbol::Terminal('b')]))
        );
        assert_eq!(
            g.del_rule(7, &Derivation::new()),
            Err(Error::UnknownRule(7, Derivation::new()))
        );
    }

    #[test]
    fn extremes_cover_every_occurrence() {
        let mut g = Grammar::new(0);
        g.add_rule(0, vec![Symbol::NonTerminal(5), Symbol::Terminal('x')]);
        g.add_rule(-3, vec![Symbol::Terminal('y')]);
        assert_eq!(g.max_nonterminal(), 5);
        assert_eq!(g.min_nonterminal(), -3);
    }

    #[test]
    fn symbols_compare_against_bare_ids() {
        assert!(Symbol::NonTerminal(4) == 4);
        assert!(Symbol::NonTerminal(4) != 5);
        assert!(Symbol::Terminal('4') != 4);
    }

    #[test]
    fn structural_equality() {
        let mut a = Grammar::new(0);
        a.add_rule(0, vec![Symbol::Terminal('a')]);
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = b.clone();
        c.add_rule(0, Derivation::new());
        assert_ne!(a, c);
    }
}
