//! Word membership by recursive descent with bounded backtracking.

use log::trace;

use crate::{
    cfg::{Derivation, Grammar, Symbol},
    first::First,
};

impl Grammar {
    /// Decides whether the word belongs to the language of this grammar.
    ///
    /// The grammar must have gone through
    /// [`prepare_for_checking`](Grammar::prepare_for_checking) and
    /// `first` must be built from the prepared grammar, otherwise the
    /// descent may not terminate.
    pub fn check_word(&self, word: &str, first: &First) -> bool {
        let word: Vec<char> = word.chars().collect();
        self.descend(&word, &[Symbol::NonTerminal(self.start)], first)
    }

    /// Matches the leading characters of `word` against the sequence of
    /// predicted symbols.
    ///
    /// Predicted derivations are tried before the rest of the rule set:
    /// on a well-prepared grammar one of them usually succeeds without
    /// backtracking, while the fallback keeps completeness for rules led
    /// by a non-terminal, which the index does not cover.
    fn descend(&self, word: &[char], predicted: &[Symbol], first: &First) -> bool {
        trace!("matching {:?} against {:?}", word, predicted);
        if predicted.is_empty() {
            return word.is_empty();
        }
        for (i, symb) in predicted.iter().enumerate() {
            match symb {
                Symbol::Terminal(c) => {
                    if word.get(i) != Some(c) {
                        return false;
                    }
                }
                Symbol::NonTerminal(nterm) => {
                    let Some(rules) = self.derivations(*nterm) else {
                        return false;
                    };
                    let prediction = first.get(&(*nterm, word.get(i).copied()));

                    for deriv in prediction.into_iter().flatten() {
                        if self.descend(&word[i..], &splice(deriv, &predicted[i + 1..]), first) {
                            return true;
                        }
                    }
                    for deriv in rules {
                        if prediction.is_some_and(|set| set.contains(deriv)) {
                            continue;
                        }
                        if self.descend(&word[i..], &splice(deriv, &predicted[i + 1..]), first) {
                            return true;
                        }
                    }
                    return false;
                }
            }
        }
        predicted.len() == word.len()
    }
}

/// Concatenates a derivation with the remaining predicted symbols.
fn splice(deriv: &Derivation, rest: &[Symbol]) -> Derivation {
    let mut out = deriv.clone();
    out.extend_from_slice(rest);
    out
}
