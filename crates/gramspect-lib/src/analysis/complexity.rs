//! Per-rule and aggregate complexity metrics.

use gramspect_atn::Atn;
use gramspect_core::reports::{
    ComplexityReport, ComplexityTotals, RuleComplexity, RuleKind,
};
use gramspect_syntax::model::GrammarSource;

use super::callgraph::CallGraph;

pub fn complexity(grammar: &GrammarSource, atn: &Atn, graph: &CallGraph) -> ComplexityReport {
    let rules: Vec<RuleComplexity> = grammar
        .rules
        .values()
        .enumerate()
        .map(|(index, rule)| {
            let node = graph.node(&rule.name);
            RuleComplexity {
                rule: rule.name.clone(),
                kind: rule.kind,
                alternatives: rule.alternatives.len(),
                decision_points: atn.decisions_of_rule(index as u32).count(),
                depth: node.map_or(-1, |n| n.depth),
                fan_in: node.map_or(0, |n| n.called_by.len()),
                fan_out: node.map_or(0, |n| n.calls.len()),
                recursive: node.is_some_and(|n| n.recursive),
            }
        })
        .collect();

    let count = |kind: RuleKind| rules.iter().filter(|r| r.kind == kind).count();
    let total_alternatives: usize = rules.iter().map(|r| r.alternatives).sum();
    let totals = ComplexityTotals {
        parser_rules: count(RuleKind::Parser),
        lexer_rules: count(RuleKind::Lexer),
        fragment_rules: count(RuleKind::Fragment),
        average_alternatives: if rules.is_empty() {
            0.0
        } else {
            total_alternatives as f64 / rules.len() as f64
        },
        max_rule_depth: rules.iter().map(|r| r.depth).max().unwrap_or(0),
        total_decision_points: rules.iter().map(|r| r.decision_points).sum(),
    };

    ComplexityReport { rules, totals }
}
