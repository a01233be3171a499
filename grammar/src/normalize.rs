//! The transformation pipeline that makes a grammar fit for predictive
//! recursive descent.
//!
//! The steps interlock: ε-elimination must run before chain-production
//! elimination (deleting ε-rules creates new unit rules), useless-symbol
//! removal must run before left-recursion elimination (the ranking walks
//! rule sets that must all exist), and dead-symbol removal must precede
//! unreachable-symbol removal (dropping dead rules orphans symbols).

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    cfg::{Derivation, Grammar, NonTerminal, Symbol},
    prefix_tree::PrefixTree,
};

/// True if every non-terminal of the derivation lies in `property`.
/// Terminal symbols pass through.
fn fully_derivable(property: &HashSet<NonTerminal>, deriv: &Derivation) -> bool {
    deriv.iter().all(|symb| match symb {
        Symbol::Terminal(_) => true,
        Symbol::NonTerminal(n) => property.contains(n),
    })
}

/// True if the whole derivation can vanish: every symbol is a vanishing
/// non-terminal. A terminal anywhere blocks it.
fn fully_vanishing(vanishing: &HashSet<NonTerminal>, deriv: &Derivation) -> bool {
    deriv.iter().all(|symb| match symb {
        Symbol::Terminal(_) => false,
        Symbol::NonTerminal(n) => vanishing.contains(n),
    })
}

impl Grammar {
    /// Rewrites the grammar into an equivalent one that predictive
    /// recursive descent can handle.
    ///
    /// A left-recursive grammar goes through ε-elimination,
    /// chain-production elimination, useless-symbol removal and
    /// left-recursion elimination; if the stripped ε still belongs to the
    /// language it is restored through a fresh start symbol. A grammar
    /// without left recursion is left-factored instead; factoring the
    /// output of recursion removal tends to spoil it, so the branches
    /// stay disjoint. Both finish with a useless-symbol sweep.
    pub fn prepare_for_checking(self) -> Grammar {
        let vanishing = self.vanishing();
        let g = if self.has_left_recursion(&vanishing) {
            debug!("left recursion present, rebuilding");
            let mut g = self
                .rebuild_vanishing(&vanishing)
                .remove_chain_productions()
                .remove_useless()
                .remove_left_recursion();
            if vanishing.contains(&g.start) {
                // ε-elimination stripped the empty word from the
                // language; give it back under a fresh start symbol
                // ranked below every existing id
                let new_start = g.min_nonterminal() - 1;
                g.add_rule(new_start, vec![Symbol::NonTerminal(g.start)]);
                g.add_rule(new_start, Derivation::new());
                g.start = new_start;
            }
            g
        } else {
            debug!("no left recursion, factoring");
            self.factorize()
        };
        g.remove_useless()
    }

    /// The set of non-terminals deriving ε in zero or more steps.
    pub(crate) fn vanishing(&self) -> HashSet<NonTerminal> {
        let mut vanishing: HashSet<NonTerminal> = self
            .iter()
            .filter(|(_, deriv)| deriv.is_empty())
            .map(|(nterm, _)| nterm)
            .collect();

        let mut changes = true;
        while changes {
            changes = false;
            for (nterm, deriv) in self.iter() {
                if !vanishing.contains(&nterm) && fully_vanishing(&vanishing, deriv) {
                    vanishing.insert(nterm);
                    changes = true;
                }
            }
        }
        vanishing
    }

    /// Depth-first search for a cycle in the left-derivation graph.
    ///
    /// Grey nodes sit on the current stack, so reaching one again closes
    /// a left-recursive cycle; black nodes are proven cycle-free. Within
    /// a rule, the walk moves past a symbol only while it can vanish,
    /// because only then is the next symbol exposed in leftmost position.
    fn has_cycle(
        &self,
        v: NonTerminal,
        vanishing: &HashSet<NonTerminal>,
        grey: &mut HashSet<NonTerminal>,
        black: &mut HashSet<NonTerminal>,
    ) -> bool {
        grey.insert(v);
        if let Some(set) = self.rules.get(&v) {
            for deriv in set {
                for symb in deriv {
                    match symb {
                        Symbol::Terminal(_) => break,
                        Symbol::NonTerminal(next) => {
                            if grey.contains(next) {
                                return true;
                            }
                            if !black.contains(next)
                                && self.has_cycle(*next, vanishing, grey, black)
                            {
                                return true;
                            }
                            if !vanishing.contains(next) {
                                break;
                            }
                        }
                    }
                }
            }
        }
        grey.remove(&v);
        black.insert(v);
        false
    }

    /// Whether any left-recursive cycle exists, reachable from the start
    /// symbol or not.
    pub(crate) fn has_left_recursion(&self, vanishing: &HashSet<NonTerminal>) -> bool {
        let mut grey = HashSet::new();
        let mut black = HashSet::new();
        // restart from every unvisited non-terminal; a cycle may sit in
        // a component the start symbol never reaches
        for nterm in self.rules.keys() {
            if !black.contains(nterm) && self.has_cycle(*nterm, vanishing, &mut grey, &mut black) {
                return true;
            }
        }
        false
    }

    /// Deletes direct ε-productions, then closes every rule set over
    /// dropping any subset of vanishing occurrences from its rules.
    fn rebuild_vanishing(mut self, vanishing: &HashSet<NonTerminal>) -> Self {
        let empty = Derivation::new();
        for nterm in vanishing {
            // indirect vanishers have no direct ε-rule to delete
            if self.has_rule(*nterm, &empty) {
                self.del_rule(*nterm, &empty).unwrap();
            }
        }

        // Dropping one occurrence at a time and re-queueing the symbol
        // whenever some rule set grew reaches every subset of
        // occurrences, newly created rules included.
        let mut worklist: Vec<NonTerminal> = vanishing.iter().copied().collect();
        while let Some(v) = worklist.pop() {
            let mut changes = false;
            let nterms: Vec<NonTerminal> = self.rules.keys().copied().collect();
            for nterm in nterms {
                let mut fresh: Vec<Derivation> = Vec::new();
                for deriv in &self.rules[&nterm] {
                    for pos in 0..deriv.len() {
                        if deriv[pos] == v {
                            let mut shorter = deriv.clone();
                            shorter.remove(pos);
                            if !shorter.is_empty() {
                                fresh.push(shorter);
                            }
                        }
                    }
                }
                let set = self.rules.get_mut(&nterm).unwrap();
                let before = set.len();
                set.extend(fresh);
                if set.len() != before {
                    changes = true;
                }
            }
            if changes {
                worklist.push(v);
            }
        }
        self
    }

    /// Eliminates unit productions through the transitive chain closure.
    ///
    /// Can leave previously reachable non-terminals unreachable; the
    /// useless-symbol sweep that follows picks them up.
    fn remove_chain_productions(mut self) -> Self {
        let mut chain: HashMap<NonTerminal, HashSet<NonTerminal>> = HashMap::new();
        for (nterm, deriv) in self.iter() {
            if let [Symbol::NonTerminal(target)] = deriv.as_slice() {
                chain.entry(nterm).or_default().insert(*target);
            }
        }

        // close transitively by iterative union
        let mut changes = true;
        while changes {
            changes = false;
            let lefts: Vec<NonTerminal> = chain.keys().copied().collect();
            for left in lefts {
                let targets: Vec<NonTerminal> = chain[&left].iter().copied().collect();
                for target in targets {
                    if let Some(further) = chain.get(&target) {
                        let further = further.clone();
                        let set = chain.get_mut(&left).unwrap();
                        let before = set.len();
                        set.extend(further);
                        if set.len() != before {
                            changes = true;
                        }
                    }
                }
            }
        }

        // replace each unit rule by the non-unit rules of its target;
        // the snapshot keeps the rewrite independent of visiting order
        let non_unit: HashMap<NonTerminal, Vec<Derivation>> = self
            .rules
            .iter()
            .map(|(nterm, set)| {
                let keep: Vec<Derivation> = set
                    .iter()
                    .filter(|deriv| !matches!(deriv.as_slice(), [Symbol::NonTerminal(_)]))
                    .cloned()
                    .collect();
                (*nterm, keep)
            })
            .collect();

        for (left, targets) in chain {
            for target in targets {
                let unit = vec![Symbol::NonTerminal(target)];
                if self.has_rule(left, &unit) {
                    self.del_rule(left, &unit).unwrap();
                }
                for deriv in non_unit.get(&target).into_iter().flatten() {
                    self.add_rule(left, deriv.clone());
                }
            }
        }
        self
    }

    /// Keeps only non-terminals that can derive a terminal-only string,
    /// and only the rules made exclusively of those.
    fn remove_dead(&self) -> Grammar {
        let mut terminable: HashSet<NonTerminal> = HashSet::new();
        let mut changes = true;
        while changes {
            changes = false;
            for (nterm, deriv) in self.iter() {
                if !terminable.contains(&nterm) && fully_derivable(&terminable, deriv) {
                    terminable.insert(nterm);
                    changes = true;
                }
            }
        }

        let mut g = Grammar::new(self.start);
        for (nterm, deriv) in self.iter() {
            if terminable.contains(&nterm) && fully_derivable(&terminable, deriv) {
                g.add_rule(nterm, deriv.clone());
            }
        }
        g
    }

    /// Keeps only non-terminals reachable from the start symbol.
    fn remove_unreachable(&self) -> Grammar {
        let mut reachable: HashSet<NonTerminal> = [self.start].into();
        let mut stack = vec![self.start];
        while let Some(nterm) = stack.pop() {
            if let Some(set) = self.rules.get(&nterm) {
                for deriv in set {
                    for symb in deriv {
                        if let Symbol::NonTerminal(next) = symb {
                            if reachable.insert(*next) {
                                stack.push(*next);
                            }
                        }
                    }
                }
            }
        }

        let mut g = Grammar::new(self.start);
        for (nterm, deriv) in self.iter() {
            if reachable.contains(&nterm) {
                g.add_rule(nterm, deriv.clone());
            }
        }
        g
    }

    /// Removes dead non-terminals, then unreachable ones. Dead-symbol
    /// removal can orphan otherwise reachable non-terminals, so the
    /// order is fixed.
    fn remove_useless(self) -> Grammar {
        self.remove_dead().remove_unreachable()
    }

    /// Eliminates direct and indirect left recursion.
    ///
    /// Non-terminals are ranked by forward discovery from the start
    /// symbol. In rank order, leading occurrences of lower-ranked
    /// non-terminals are expanded away until none leads; direct
    /// recursion is then split off into a fresh primed non-terminal.
    fn remove_left_recursion(mut self) -> Self {
        let mut rank: HashMap<NonTerminal, usize> = HashMap::new();
        let mut ordered: Vec<NonTerminal> = Vec::new();
        let mut stack = vec![self.start];
        let mut seen: HashSet<NonTerminal> = [self.start].into();
        while let Some(nterm) = stack.pop() {
            rank.insert(nterm, ordered.len());
            ordered.push(nterm);
            if let Some(set) = self.rules.get(&nterm) {
                for deriv in set {
                    for symb in deriv {
                        if let Symbol::NonTerminal(next) = symb {
                            if seen.insert(*next) {
                                stack.push(*next);
                            }
                        }
                    }
                }
            }
        }

        let mut next_nonterm = self.max_nonterminal() + 1;

        for &current in &ordered {
            let current_rank = rank[&current];
            let Some(set) = self.rules.get(&current) else {
                continue;
            };

            // Expand leading lower-ranked non-terminals until none
            // leads. Lower-ranked rule sets are already processed, so
            // each round strictly raises the leading rank and the loop
            // ends.
            let mut expanded: HashSet<Derivation> = set.clone();
            loop {
                let mut next_set: HashSet<Derivation> = HashSet::new();
                let mut expanded_any = false;
                for deriv in &expanded {
                    match deriv.first() {
                        Some(Symbol::NonTerminal(lead))
                            if rank.get(lead).is_some_and(|r| *r < current_rank)
                                && self.rules.contains_key(lead) =>
                        {
                            for sub in &self.rules[lead] {
                                let mut joined = sub.clone();
                                joined.extend_from_slice(&deriv[1..]);
                                next_set.insert(joined);
                            }
                            expanded_any = true;
                        }
                        _ => {
                            next_set.insert(deriv.clone());
                        }
                    }
                }
                expanded = next_set;
                if !expanded_any {
                    break;
                }
            }

            // split direct recursion off into a primed non-terminal
            let mut alphas: Vec<Derivation> = Vec::new();
            let mut betas: Vec<Derivation> = Vec::new();
            for deriv in expanded {
                if deriv.first() == Some(&Symbol::NonTerminal(current)) {
                    alphas.push(deriv[1..].to_vec());
                } else {
                    betas.push(deriv);
                }
            }

            if alphas.is_empty() {
                self.rules.insert(current, betas.into_iter().collect());
                continue;
            }

            let primed = next_nonterm;
            next_nonterm += 1;

            let mut current_set: HashSet<Derivation> = HashSet::new();
            for beta in betas {
                let mut tailed = beta.clone();
                tailed.push(Symbol::NonTerminal(primed));
                current_set.insert(tailed);
                current_set.insert(beta);
            }
            let mut primed_set: HashSet<Derivation> = HashSet::new();
            for alpha in alphas {
                let mut tailed = alpha.clone();
                tailed.push(Symbol::NonTerminal(primed));
                primed_set.insert(tailed);
                primed_set.insert(alpha);
            }

            self.rules.insert(current, current_set);
            self.rules.insert(primed, primed_set);
        }
        self
    }

    /// Left-factors every non-terminal's rules through a prefix tree.
    fn factorize(&self) -> Grammar {
        let mut g = Grammar::new(self.start);
        // one counter across the whole pass keeps fresh ids unique
        let mut seq = self.max_nonterminal() + 1;
        for (nterm, set) in &self.rules {
            let mut tree = PrefixTree::default();
            for deriv in set {
                tree.insert(deriv);
            }
            tree.separate(&mut g, *nterm, Derivation::new(), -1, &mut seq);
        }
        g
    }
}
