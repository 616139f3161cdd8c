//! Per-decision lookahead sets, computed over the ATN.
//!
//! For each parser-rule decision, the lookahead of every alternative is
//! the set of token types its sub-ATN can consume first; optional and
//! loop exits union in the continuation (FOLLOW of the owning rule when
//! closure escapes it). A decision is ambiguous by lookahead when any
//! two alternatives intersect.

use std::collections::HashSet;

use gramspect_atn::{Atn, AtnStateKind, IntervalSet, StateId, Transition};
use gramspect_syntax::model::GrammarSource;

use super::firstfollow::{FirstFollow, complement, token_universe};

/// Lookahead sets of one decision.
#[derive(Debug, Clone)]
pub struct DecisionSets {
    pub decision: u32,
    pub rule: u32,
    /// One set per alternative, in alternative order.
    pub alternatives: Vec<IntervalSet>,
    pub ambiguous_by_lookahead: bool,
}

/// Lookahead sets for every parser-rule decision.
pub fn decision_lookahead(
    grammar: &GrammarSource,
    atn: &Atn,
    ff: &FirstFollow,
) -> Vec<DecisionSets> {
    let mut out = Vec::new();
    for decision in &atn.decisions {
        let rule = atn.rule(decision.rule);
        if rule.is_lexer {
            continue;
        }
        let state = atn.state(decision.state);
        let alternatives: Vec<IntervalSet> = state
            .transitions
            .iter()
            .filter(|t| t.is_epsilon())
            .map(|t| alternative_lookahead(grammar, atn, ff, t.target()))
            .collect();

        let ambiguous_by_lookahead = alternatives
            .iter()
            .enumerate()
            .any(|(i, a)| alternatives[i + 1..].iter().any(|b| a.intersects(b)));

        out.push(DecisionSets {
            decision: decision.id,
            rule: decision.rule,
            alternatives,
            ambiguous_by_lookahead,
        });
    }
    out
}

/// Closure from one alternative's entry, collecting consumable symbols.
fn alternative_lookahead(
    grammar: &GrammarSource,
    atn: &Atn,
    ff: &FirstFollow,
    entry: StateId,
) -> IntervalSet {
    const MAX_DEPTH: usize = 32;

    let mut lookahead = IntervalSet::new();
    let mut visited: HashSet<(StateId, Vec<StateId>)> = HashSet::new();
    let mut work: Vec<(StateId, Vec<StateId>)> = vec![(entry, Vec::new())];

    while let Some((state_id, ctx)) = work.pop() {
        if !visited.insert((state_id, ctx.clone())) {
            continue;
        }
        let state = atn.state(state_id);

        if state.kind == AtnStateKind::RuleStop {
            match ctx.split_last() {
                Some((&follow, rest)) => work.push((follow, rest.to_vec())),
                None => {
                    // Escaped the rule: its FOLLOW is the continuation.
                    let name = &atn.rule(state.rule).name;
                    if let Some(follow) = ff.follow.get(name) {
                        lookahead.union(follow);
                    }
                }
            }
            continue;
        }

        for transition in &state.transitions {
            match transition {
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Action { target, .. }
                | Transition::Precedence { target, .. } => {
                    work.push((*target, ctx.clone()));
                }
                Transition::Rule { target, follow, .. } => {
                    if ctx.len() < MAX_DEPTH {
                        let mut ctx = ctx.clone();
                        ctx.push(*follow);
                        work.push((*target, ctx));
                    }
                }
                Transition::Atom { label, .. } => lookahead.add_value(*label),
                Transition::Range { from, to, .. } => lookahead.add(*from, *to),
                Transition::Set { set, .. } => lookahead.union(set),
                Transition::NotSet { set, .. } => {
                    lookahead.union(&complement(&token_universe(grammar), set));
                }
                Transition::Wildcard { .. } => lookahead.union(&token_universe(grammar)),
            }
        }
    }

    lookahead
}
