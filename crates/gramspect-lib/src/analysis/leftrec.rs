//! Left-recursion classification report.

use gramspect_atn::Atn;
use gramspect_core::reports::{LeftRecursionInfo, LeftRecursionReport, RuleKind};
use gramspect_syntax::model::GrammarSource;

use super::callgraph::CallGraph;

/// Assembles the left-recursion report: the transform metadata recorded
/// by the ATN builder plus indirect cycles from the call graph restricted
/// to parser rules.
pub fn left_recursion_report(
    grammar: &GrammarSource,
    atn: &Atn,
    graph: &CallGraph,
) -> LeftRecursionReport {
    let rules = grammar
        .rules
        .values()
        .enumerate()
        .filter(|(_, rule)| rule.kind == RuleKind::Parser)
        .map(|(index, rule)| {
            match &atn.left_recursion[index] {
                Some(info) => LeftRecursionInfo {
                    rule: rule.name.clone(),
                    direct: true,
                    transformed: true,
                    precedence_levels: info.levels.clone(),
                    primary_alternatives: info.primary_alts.clone(),
                    recursive_alternatives: info.recursive_alts.clone(),
                },
                None => LeftRecursionInfo {
                    rule: rule.name.clone(),
                    direct: false,
                    transformed: false,
                    precedence_levels: Vec::new(),
                    primary_alternatives: Vec::new(),
                    recursive_alternatives: Vec::new(),
                },
            }
        })
        .collect();

    // Multi-rule cycles over parser rules only; single-rule cycles are
    // either transformed (direct left recursion) or plain right
    // recursion, neither of which is an indirect cycle.
    let indirect_cycles = graph
        .cycles
        .iter()
        .filter(|cycle| cycle.len() > 1)
        .filter(|cycle| {
            cycle.iter().all(|name| {
                grammar
                    .rule(name)
                    .is_some_and(|r| r.kind == RuleKind::Parser)
            })
        })
        .cloned()
        .collect();

    LeftRecursionReport {
        rules,
        indirect_cycles,
    }
}

#[cfg(test)]
mod tests {
    use gramspect_syntax::parse_grammar;
    use indoc::indoc;

    use super::super::callgraph::call_graph;
    use super::*;

    fn report_for(source: &str) -> LeftRecursionReport {
        let (grammar, diags) = parse_grammar(source);
        assert!(!diags.has_errors(), "{}", diags.printer().render());
        let (atn, build_diags) = gramspect_atn::build(&grammar);
        assert!(!build_diags.has_errors());
        let graph = call_graph(&grammar, None);
        left_recursion_report(&grammar, &atn, &graph)
    }

    #[test]
    fn calc_classification() {
        let report = report_for(indoc! {r"
            grammar Calc;
            expr : expr ('*'|'/') expr | expr ('+'|'-') expr | INT | '(' expr ')' ;
            INT : [0-9]+ ;
        "});
        let expr = report.rules.iter().find(|r| r.rule == "expr").unwrap();
        assert!(expr.direct);
        assert!(expr.transformed);
        assert_eq!(expr.precedence_levels, vec![2, 1]);
        assert_eq!(expr.primary_alternatives, vec![3, 4]);
        assert_eq!(expr.recursive_alternatives, vec![1, 2]);
    }

    #[test]
    fn indirect_cycle_reported_not_transformed() {
        let report = report_for(indoc! {"
            grammar T;
            a : b 'x' | 'z' ;
            b : a 'y' | 'w' ;
        "});
        let a = report.rules.iter().find(|r| r.rule == "a").unwrap();
        assert!(!a.direct);
        assert!(!a.transformed);
        assert_eq!(
            report.indirect_cycles,
            vec![vec!["a".to_owned(), "b".to_owned()]]
        );
    }

    #[test]
    fn right_recursion_is_not_left_recursion() {
        let report = report_for("grammar T; list : ITEM list | ITEM ; ITEM : 'i' ;");
        let list = report.rules.iter().find(|r| r.rule == "list").unwrap();
        assert!(!list.direct);
        assert!(report.indirect_cycles.is_empty());
    }
}
