//! Tests for ATN construction.

use gramspect_syntax::parse_grammar;
use indoc::indoc;

use crate::atn::{Atn, AtnStateKind};
use crate::builder::build;
use crate::dump::AtnPrinter;

fn atn_for(source: &str) -> Atn {
    let (grammar, diags) = parse_grammar(source);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    let (atn, build_diags) = build(&grammar);
    assert!(
        !build_diags.has_errors(),
        "{}",
        build_diags.printer().render()
    );
    atn.check_invariants().expect("invariants");
    atn
}

const CALC: &str = indoc! {r"
    grammar Calc;
    expr : expr ('*'|'/') expr | expr ('+'|'-') expr | INT | '(' expr ')' ;
    INT : [0-9]+ ;
    WS : [ \t\r\n]+ -> skip ;
"};

#[test]
fn single_literal_rule() {
    let atn = atn_for("grammar T; a : 'x' ;");
    insta::assert_snapshot!(AtnPrinter::new(&atn).dump(), @r"
    rule a: start=0 stop=1
    rule 'x': start=2 stop=3 type=1 (implicit)
    s0 RuleStart: ε→4
    s1 RuleStop
    s2 RuleStart: ε→6
    s3 RuleStop
    s4 Basic: atom(1)→5
    s5 Basic: ε→1
    s6 Basic: atom(120)→7
    s7 Basic: ε→3
    s8 TokenStart: ε→2
    ");
}

#[test]
fn multi_alternative_rule_gets_a_decision() {
    let atn = atn_for("grammar T; a : 'x' | 'y' | 'z' ;");
    assert_eq!(atn.decisions.len(), 1);
    assert_eq!(atn.alternative_count(0), 3);
    let state = atn.state(atn.decisions[0].state);
    assert_eq!(state.kind, AtnStateKind::BlockStart);
    assert_eq!(state.decision, Some(0));
}

#[test]
fn star_loop_shape() {
    let atn = atn_for("grammar T; a : 'x'* ;");
    assert_eq!(atn.decisions.len(), 1);
    let decision_state = atn.state(atn.decisions[0].state);
    assert_eq!(decision_state.kind, AtnStateKind::StarLoopEntry);
    // Greedy: loop body first, exit second.
    assert_eq!(atn.alternative_count(0), 2);
    assert!(
        atn.states
            .iter()
            .any(|s| s.kind == AtnStateKind::StarLoopBack)
    );
    assert!(atn.states.iter().any(|s| s.kind == AtnStateKind::LoopEnd));
}

#[test]
fn plus_loop_shape() {
    let atn = atn_for("grammar T; a : 'x'+ ;");
    assert_eq!(atn.decisions.len(), 1);
    let decision_state = atn.state(atn.decisions[0].state);
    assert_eq!(decision_state.kind, AtnStateKind::PlusLoopBack);
    assert!(
        atn.states
            .iter()
            .any(|s| s.kind == AtnStateKind::PlusBlockStart)
    );
}

#[test]
fn optional_block_shape() {
    let atn = atn_for("grammar T; a : 'x'? 'y' ;");
    assert_eq!(atn.decisions.len(), 1);
    assert_eq!(atn.alternative_count(0), 2);
    assert_eq!(
        atn.state(atn.decisions[0].state).kind,
        AtnStateKind::BlockStart
    );
}

#[test]
fn char_set_becomes_set_transition() {
    let atn = atn_for("grammar T; A : [0-9a-f]+ ;");
    let has_set = atn.states.iter().any(|s| {
        s.transitions.iter().any(|t| match t {
            crate::Transition::Set { set, .. } => set.contains('a' as i32) && set.contains('5' as i32),
            _ => false,
        })
    });
    assert!(has_set);
}

#[test]
fn not_set_complements() {
    let atn = atn_for("grammar T; A : ~[\\r\\n]+ ;");
    let not_sets: Vec<_> = atn
        .states
        .iter()
        .flat_map(|s| &s.transitions)
        .filter_map(|t| match t {
            crate::Transition::NotSet { set, .. } => Some(set.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(not_sets.len(), 1);
    assert!(not_sets[0].contains('\n' as i32));
    // The transition itself must not match a newline.
    let matches_newline = atn
        .states
        .iter()
        .flat_map(|s| &s.transitions)
        .any(|t| matches!(t, crate::Transition::NotSet { .. }) && t.matches('\n' as i32));
    assert!(!matches_newline);
}

#[test]
fn rule_reference_has_follow_state() {
    let atn = atn_for("grammar T; a : b 'x' ; b : 'y' ;");
    let rule_transitions: Vec<_> = atn
        .states
        .iter()
        .flat_map(|s| &s.transitions)
        .filter_map(|t| match t {
            crate::Transition::Rule { rule, target, follow, .. } => Some((*rule, *target, *follow)),
            _ => None,
        })
        .collect();
    assert_eq!(rule_transitions.len(), 1);
    let (rule, target, follow) = rule_transitions[0];
    assert_eq!(atn.rule(rule).name, "b");
    assert_eq!(atn.rule(rule).start, target);
    assert!(follow < atn.states.len() as u32);
}

#[test]
fn calc_left_recursion_transform() {
    let atn = atn_for(CALC);
    let expr = atn.rule_by_name("expr").unwrap().id;
    let info = atn.left_recursion[expr as usize]
        .as_ref()
        .expect("expr is transformed");

    assert_eq!(info.primary_alts, vec![3, 4]);
    assert_eq!(info.recursive_alts, vec![1, 2]);
    assert_eq!(info.levels, vec![2, 1]);

    // Loop decision: one alternative per operator group plus the exit.
    assert_eq!(atn.alternative_count(info.loop_decision), 3);
    let loop_state = atn.state(atn.decision(info.loop_decision).state);
    assert_eq!(loop_state.kind, AtnStateKind::StarLoopEntry);

    // Precedence guards in descending level order.
    let levels: Vec<u32> = loop_state
        .transitions
        .iter()
        .filter_map(|t| match t {
            crate::Transition::Precedence { level, .. } => Some(*level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![2, 1]);

    // Primary block has its own decision over INT and '(' expr ')'.
    let primary = info.primary_decision.expect("two primaries");
    assert_eq!(atn.alternative_count(primary), 2);

    // The trailing self-call of each operator alternative uses level+1.
    let call_precedences: Vec<u32> = atn
        .states_of_rule(expr)
        .flat_map(|s| &s.transitions)
        .filter_map(|t| match t {
            crate::Transition::Rule { rule, precedence, .. } if *rule == expr => Some(*precedence),
            _ => None,
        })
        .collect();
    assert!(call_precedences.contains(&3));
    assert!(call_precedences.contains(&2));
}

#[test]
fn whole_rule_recursive_is_an_error() {
    let (grammar, diags) = parse_grammar("grammar T; a : a 'x' ;");
    assert!(!diags.has_errors());
    let (_, build_diags) = build(&grammar);
    assert!(build_diags.has_errors());
    let rendered = build_diags.printer().render();
    assert!(rendered.contains("no primary alternative"), "{rendered}");
}

#[test]
fn predicates_and_actions_become_transitions() {
    let atn = atn_for("grammar T; a : {p()}? 'x' {act();} ;");
    let has_pred = atn
        .states
        .iter()
        .flat_map(|s| &s.transitions)
        .any(|t| matches!(t, crate::Transition::Predicate { .. }));
    let has_action = atn
        .states
        .iter()
        .flat_map(|s| &s.transitions)
        .any(|t| matches!(t, crate::Transition::Action { .. }));
    assert!(has_pred);
    assert!(has_action);
}

#[test]
fn lexer_commands_resolved() {
    let atn = atn_for(indoc! {"
        lexer grammar L;
        channels { DOC }
        WS : [ ]+ -> skip ;
        D : '#' -> channel(DOC) ;
    "});
    let ws = atn.rule_by_name("WS").unwrap();
    assert_eq!(ws.commands[0], vec![crate::ResolvedCommand::Skip]);
    let d = atn.rule_by_name("D").unwrap();
    assert_eq!(d.commands[0], vec![crate::ResolvedCommand::Channel(2)]);
}

#[test]
fn modes_get_their_own_token_start() {
    let atn = atn_for(indoc! {"
        lexer grammar L;
        A : 'a' -> pushMode(STR) ;
        mode STR;
        B : 'b' -> popMode ;
    "});
    assert_eq!(atn.mode_starts.len(), 2);
    let default_start = atn.state(atn.mode_starts[0]);
    let str_start = atn.state(atn.mode_starts[1]);
    assert_eq!(default_start.kind, AtnStateKind::TokenStart);
    assert_eq!(default_start.transitions.len(), 1);
    assert_eq!(str_start.transitions.len(), 1);
}

#[test]
fn construction_is_deterministic() {
    let (grammar, _) = parse_grammar(CALC);
    let (first, _) = build(&grammar);
    let (second, _) = build(&grammar);
    assert_eq!(first.states.len(), second.states.len());
    assert_eq!(
        AtnPrinter::new(&first).dump(),
        AtnPrinter::new(&second).dump()
    );
}

#[test]
fn decision_alternatives_match_epsilon_fanout() {
    let atn = atn_for(CALC);
    for decision in &atn.decisions {
        let state = atn.state(decision.state);
        let epsilon_fanout = state.transitions.iter().filter(|t| t.is_epsilon()).count();
        assert_eq!(atn.alternative_count(decision.id), epsilon_fanout);
        assert!(epsilon_fanout >= 2, "decision with fewer than 2 alternatives");
    }
}

#[test]
fn eof_reference_matches_eof_symbol() {
    let atn = atn_for("grammar T; prog : 'x' EOF ;");
    let has_eof_atom = atn
        .states
        .iter()
        .flat_map(|s| &s.transitions)
        .any(|t| matches!(t, crate::Transition::Atom { label, .. } if *label == crate::EOF_SYMBOL));
    assert!(has_eof_atom);
}
