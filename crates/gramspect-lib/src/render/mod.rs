//! Renderers: typed graph structure with DOT/Mermaid writers, LISP tree
//! form with a reader, ASCII trees.

mod ascii;
mod graph;
mod lisp;

pub use ascii::render_ascii;
pub use graph::{Digraph, NodeShape};
pub use lisp::{LispValue, read_lisp, render_lisp, to_lisp_value};

use gramspect_atn::{Atn, AtnStateKind, NO_RULE, RuleId, Transition};
use gramspect_syntax::Vocabulary;

/// Builds the graph of one rule's ATN slice (or the whole ATN when
/// `rule` is `None`).
pub fn atn_graph(atn: &Atn, vocab: &Vocabulary, rule: Option<RuleId>) -> Digraph {
    let name = rule
        .map(|r| atn.rule(r).name.clone())
        .unwrap_or_else(|| "atn".to_owned());
    let mut graph = Digraph::new(name);

    let in_scope = |state_rule: RuleId| match rule {
        Some(r) => state_rule == r,
        None => state_rule != NO_RULE,
    };

    for state in &atn.states {
        if !in_scope(state.rule) {
            continue;
        }
        graph.node(
            format!("s{}", state.id),
            state_label(atn, state.id),
            state_shape(state.kind),
        );
        for transition in &state.transitions {
            let target = transition.target();
            // Declare the target even when it belongs to another rule, so
            // every edge endpoint exists.
            graph.node(
                format!("s{target}"),
                state_label(atn, target),
                state_shape(atn.state(target).kind),
            );
            graph.labeled_edge(
                format!("s{}", state.id),
                format!("s{target}"),
                transition_label(atn, vocab, transition),
            );
        }
    }
    graph
}

/// Builds the sub-graph rooted at one decision, up to block/loop ends.
pub fn decision_graph(
    atn: &Atn,
    vocab: &Vocabulary,
    decision: gramspect_atn::DecisionId,
) -> Digraph {
    let info = atn.decision(decision);
    let mut graph = Digraph::new(format!("decision_{}", info.id));
    let mut work = vec![info.state];
    let mut seen = std::collections::HashSet::new();

    while let Some(id) = work.pop() {
        if !seen.insert(id) {
            continue;
        }
        let state = atn.state(id);
        graph.node(
            format!("s{id}"),
            state_label(atn, id),
            state_shape(state.kind),
        );
        // Frontier states are declared but not expanded.
        let is_frontier = id != info.state
            && matches!(
                state.kind,
                AtnStateKind::BlockEnd | AtnStateKind::LoopEnd | AtnStateKind::RuleStop
            );
        if is_frontier {
            continue;
        }
        for transition in &state.transitions {
            let target = transition.target();
            graph.node(
                format!("s{target}"),
                state_label(atn, target),
                state_shape(atn.state(target).kind),
            );
            graph.labeled_edge(
                format!("s{id}"),
                format!("s{target}"),
                transition_label(atn, vocab, transition),
            );
            // Stay within the decision's rule.
            if atn.state(target).rule == info.rule {
                work.push(target);
            }
        }
    }
    graph
}

fn state_label(atn: &Atn, state: gramspect_atn::StateId) -> String {
    let state = atn.state(state);
    match state.decision {
        Some(d) => format!("{} d{}", state.id, d),
        None => state.id.to_string(),
    }
}

fn state_shape(kind: AtnStateKind) -> NodeShape {
    match kind {
        AtnStateKind::RuleStop => NodeShape::DoubleCircle,
        AtnStateKind::BlockStart
        | AtnStateKind::StarLoopEntry
        | AtnStateKind::PlusLoopBack => NodeShape::Diamond,
        _ => NodeShape::Circle,
    }
}

/// Human label for a transition, using the vocabulary for token types.
pub fn transition_label(atn: &Atn, vocab: &Vocabulary, transition: &Transition) -> String {
    match transition {
        Transition::Epsilon { .. } => "ε".to_owned(),
        Transition::Atom { label, .. } => symbol_label(vocab, *label),
        Transition::Range { from, to, .. } => {
            format!(
                "{}..{}",
                symbol_label(vocab, *from),
                symbol_label(vocab, *to)
            )
        }
        Transition::Set { set, .. } => format!("set {set}"),
        Transition::NotSet { set, .. } => format!("~{set}"),
        Transition::Wildcard { .. } => ".".to_owned(),
        Transition::Rule { rule, .. } => atn.rule(*rule).name.clone(),
        Transition::Predicate { pred_index, .. } => format!("pred?{pred_index}"),
        Transition::Action { action_index, .. } => format!("act!{action_index}"),
        Transition::Precedence { level, .. } => format!("prec>={level}"),
    }
}

fn symbol_label(vocab: &Vocabulary, symbol: i32) -> String {
    // Lexer ATN labels are code points; parser labels are token types.
    // Token types are small and code points for printable chars are not,
    // so disambiguate by the vocabulary's range.
    if symbol > vocab.max_type() {
        match char::from_u32(symbol as u32) {
            Some(c) => format!("'{c}'"),
            None => symbol.to_string(),
        }
    } else {
        vocab.display_name(symbol)
    }
}
