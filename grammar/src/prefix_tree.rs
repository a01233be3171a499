//! Prefix tree over the derivations of a single non-terminal.
//!
//! Built and consumed by the factoring pass alone: derivations are laid in
//! symbol by symbol, then the tree is walked back out as factored rules.

use std::collections::{hash_map::Entry, HashMap};

use crate::cfg::{Derivation, Grammar, NonTerminal, Symbol};

/// One edge out of a prefix-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    /// The next symbol of some derivation.
    Symbol(Symbol),
    /// Marks that a derivation ends between its siblings; distinct from
    /// every symbol, so ε and end-of-derivation never collide with input.
    End,
}

/// A prefix-tree node. A child of `None` is a leaf: exactly one
/// derivation ends there.
#[derive(Debug, Default)]
pub(crate) struct PrefixTree {
    /// Fan-out keyed by the next symbol, or by the end marker.
    children: HashMap<Edge, Option<PrefixTree>>,
}

impl PrefixTree {
    /// Lays one derivation into the tree.
    pub(crate) fn insert(&mut self, deriv: &[Symbol]) {
        match deriv {
            [] => {
                self.children.insert(Edge::End, None);
            }
            [symb] => match self.children.entry(Edge::Symbol(*symb)) {
                Entry::Occupied(mut entry) => {
                    // a longer derivation already continues past this
                    // symbol; record the end between its branches
                    if let Some(node) = entry.get_mut() {
                        node.children.insert(Edge::End, None);
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(None);
                }
            },
            [first, rest @ ..] => match self.children.entry(Edge::Symbol(*first)) {
                Entry::Occupied(mut entry) => {
                    let slot = entry.get_mut();
                    match slot {
                        Some(node) => node.insert(rest),
                        None => {
                            // a shorter derivation ends right here; keep
                            // its mark while growing past it
                            let mut node = PrefixTree::default();
                            node.children.insert(Edge::End, None);
                            node.insert(rest);
                            *slot = Some(node);
                        }
                    }
                }
                Entry::Vacant(entry) => {
                    let mut node = PrefixTree::default();
                    node.insert(rest);
                    entry.insert(Some(node));
                }
            },
        }
    }

    /// Walks the tree, emitting factored rules into `g`.
    ///
    /// `layer` is the non-terminal currently emitted under and `prefix`
    /// the symbols accumulated since that layer began. `common_depth`
    /// counts how long the current path has had a single child (`-1` on
    /// the root call); a fork allocates a fresh non-terminal from `seq`,
    /// emits `layer -> prefix·fresh` and restarts the prefix beneath it.
    pub(crate) fn separate(
        &self,
        g: &mut Grammar,
        layer: NonTerminal,
        prefix: Derivation,
        common_depth: i32,
        seq: &mut NonTerminal,
    ) {
        let common_depth = if common_depth == -1 {
            1
        } else if self.children.len() == 1 {
            common_depth + 1
        } else {
            0
        };

        let layer = if common_depth >= 1 {
            layer
        } else {
            let fresh = *seq;
            *seq += 1;
            let mut lead = prefix.clone();
            lead.push(Symbol::NonTerminal(fresh));
            g.add_rule(layer, lead);
            fresh
        };

        for (edge, child) in &self.children {
            let mut next_prefix = if common_depth >= 1 {
                prefix.clone()
            } else {
                Derivation::new()
            };
            if let Edge::Symbol(symb) = edge {
                next_prefix.push(*symb);
            }
            match child {
                Some(node) => node.separate(g, layer, next_prefix, common_depth, seq),
                None => g.add_rule(layer, next_prefix),
            }
        }
    }
}
