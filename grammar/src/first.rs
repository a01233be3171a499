//! Construction of the predictive FIRST index of a prepared grammar.
//!
//! This is a deliberately weak approximation of classical FIRST sets:
//! a prepared grammar is factored, or ε- and unit-free, so indexing by
//! the literal leading terminal alone already prunes most of the search
//! without a full FIRST/FOLLOW analysis.

use std::collections::{HashMap, HashSet};

use crate::cfg::{Derivation, Grammar, NonTerminal, Symbol};

/// Maps a non-terminal and the literal leading terminal of one of its
/// derivations (`None` standing for ε) to the derivations starting that
/// way. Derivations led by a non-terminal are not indexed; the checker
/// falls back to the full rule set for those.
pub type First = HashMap<(NonTerminal, Option<char>), HashSet<Derivation>>;

/// Builds the FIRST index of a grammar.
pub fn build_first(g: &Grammar) -> First {
    let mut first = First::new();
    for (nterm, deriv) in g.iter() {
        let key = match deriv.first() {
            Some(Symbol::NonTerminal(_)) => continue,
            Some(Symbol::Terminal(c)) => (nterm, Some(*c)),
            None => (nterm, None),
        };
        first.entry(key).or_default().insert(deriv.clone());
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_by_leading_terminal_only() {
        // 0 -> a b | a | 1 c | ε, 1 -> d
        let mut g = Grammar::new(0);
        g.add_rule(0, vec![Symbol::Terminal('a'), Symbol::Terminal('b')]);
        g.add_rule(0, vec![Symbol::Terminal('a')]);
        g.add_rule(0, vec![Symbol::NonTerminal(1), Symbol::Terminal('c')]);
        g.add_rule(0, Derivation::new());
        g.add_rule(1, vec![Symbol::Terminal('d')]);

        let first = build_first(&g);

        let under_a = &first[&(0, Some('a'))];
        assert_eq!(under_a.len(), 2);
        assert!(under_a.contains(&vec![Symbol::Terminal('a')]));

        // ε sits under the sentinel, not under any character
        assert_eq!(first[&(0, None)], [Derivation::new()].into());

        // the rule led by a non-terminal is nowhere in the index
        let indexed: usize = first.values().map(|set| set.len()).sum();
        assert_eq!(indexed, 4);
    }
}
