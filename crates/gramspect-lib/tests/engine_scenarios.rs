//! End-to-end scenarios through the engine façade.

use std::collections::HashMap;

use gramspect_core::reports::TreeNode;
use gramspect_lib::{Engine, EngineConfig, ErrorKind, Request};
use indoc::indoc;

const CALC: &str = indoc! {r"
    grammar Calc;
    expr : expr ('*'|'/') expr | expr ('+'|'-') expr | INT | '(' expr ')' ;
    INT : [0-9]+ ;
    WS : [ \t\r\n]+ -> skip ;
"};

fn engine() -> Engine {
    Engine::with_defaults()
}

/// Depth-first search for a rule node with the given name.
fn find_rule<'t>(node: &'t TreeNode, name: &str) -> Option<&'t TreeNode> {
    match node {
        TreeNode::Rule { rule, children, .. } => {
            if rule == name {
                return Some(node);
            }
            children.iter().find_map(|c| find_rule(c, name))
        }
        _ => None,
    }
}

fn rule_children(node: &TreeNode) -> &[TreeNode] {
    match node {
        TreeNode::Rule { children, .. } => children,
        _ => &[],
    }
}

#[test]
fn scenario_calculator_parse() {
    let report = engine()
        .parse_sample(CALC, "42 + 10 * 3", Some("expr"), &mut Request::default())
        .expect("engine accepts the grammar");
    assert!(report.success, "{:?}", report.errors);

    let tree = report.tree.expect("tree present");
    let TreeNode::Rule { rule, .. } = &tree else {
        panic!("root must be a rule node");
    };
    assert_eq!(rule, "expr");

    // Some expr subtree whose operator terminal is '*'.
    let mut stack = vec![&tree];
    let mut found_mul = false;
    while let Some(node) = stack.pop() {
        if let TreeNode::Rule { rule, children, .. } = node {
            if rule == "expr"
                && children
                    .iter()
                    .any(|c| matches!(c, TreeNode::Terminal { text, .. } if text == "*"))
            {
                found_mul = true;
            }
            stack.extend(children.iter());
        }
    }
    assert!(found_mul, "expected a multiplication subtree");
    assert!(report.lisp.unwrap().starts_with("(expr"));
}

#[test]
fn scenario_json_parse() {
    let json_grammar = indoc! {r#"
        grammar Json;
        json : value ;
        value : object | array | STRING | NUMBER | 'true' | 'false' | 'null' ;
        object : '{' pair (',' pair)* '}' | '{' '}' ;
        pair : STRING ':' value ;
        array : '[' value (',' value)* ']' | '[' ']' ;
        STRING : '"' (~["\\] | '\\' .)* '"' ;
        NUMBER : '-'? [0-9]+ ('.' [0-9]+)? ;
        WS : [ \t\r\n]+ -> skip ;
    "#};
    let report = engine()
        .parse_sample(
            json_grammar,
            r#"{"a":1,"b":[true,null]}"#,
            Some("json"),
            &mut Request::default(),
        )
        .expect("engine accepts the grammar");
    assert!(report.success, "{:?}", report.errors);

    let tree = report.tree.expect("tree present");
    assert!(find_rule(&tree, "object").is_some());
    assert!(find_rule(&tree, "array").is_some());
}

#[test]
fn scenario_left_recursion_classification() {
    let report = engine()
        .analyze_left_recursion(CALC, &mut Request::default())
        .expect("analysis runs");
    let expr = report.rules.iter().find(|r| r.rule == "expr").unwrap();
    assert!(expr.direct);
    assert!(expr.transformed);
    assert_eq!(expr.precedence_levels, vec![2, 1]);
    assert_eq!(expr.primary_alternatives, vec![3, 4]);
    assert_eq!(expr.recursive_alternatives, vec![1, 2]);
}

#[test]
fn scenario_ambiguity_via_profiling() {
    let grammar = indoc! {"
        grammar Cond;
        stat : 'if' expr 'then' stat | 'if' expr 'then' stat 'else' stat | 'print' expr ;
        expr : ID ;
        ID : [a-z]+ ;
        WS : [ ]+ -> skip ;
    "};
    let samples = vec!["if a then if b then print c else print d".to_owned()];
    let report = engine()
        .detect_ambiguity(grammar, Some("stat"), &samples, &mut Request::default())
        .expect("analysis runs");

    assert!(report.has_ambiguities);
    let events: Vec<_> = report
        .samples
        .iter()
        .flat_map(|s| s.events.iter())
        .collect();
    assert!(!events.is_empty());
    let event = events
        .iter()
        .find(|e| e.rule == "stat")
        .expect("ambiguity in rule stat");
    assert!(event.alternatives.contains(&1));
    assert!(event.alternatives.contains(&2));
    assert!(report.rule_counts.contains_key("stat"));
    assert!(report.coverage.decisions_exercised > 0);
    assert!(report.coverage.decisions_exercised <= report.coverage.decisions_total);
}

#[test]
fn scenario_call_graph_unused_detection() {
    let grammar = indoc! {r"
        grammar T;
        prog : expr EOF ;
        expr : INT ;
        unused : 'foo' ;
        INT : [0-9]+ ;
    "};
    let report = engine()
        .analyze_call_graph(grammar, &mut Request::default())
        .expect("analysis runs");

    let node = |name: &str| report.nodes.iter().find(|n| n.rule == name).unwrap();
    assert!(node("unused").unused);
    assert_eq!(node("prog").depth, 0);
    assert_eq!(node("expr").depth, 1);
    assert!(report.mermaid.starts_with("graph LR"));
}

#[test]
fn scenario_import_cycle() {
    let files: HashMap<&str, &str> = HashMap::from([
        ("B", "grammar B; import A; b : 'b' ;"),
        ("A", "grammar A; import B; a : 'a' ;"),
    ]);
    let mut lookup = |name: &str| files.get(name).map(|s| (*s).to_owned());
    let mut request = Request {
        lookup: Some(&mut lookup),
        cancel: Default::default(),
    };
    let error = engine()
        .validate("grammar A; import B; a : 'a' ;", &mut request)
        .expect("validate returns a result")
        .errors;
    // Resolution failed with a circular-import error naming the chain.
    assert!(!error.is_empty());
    let import_error = &error[0];
    assert_eq!(import_error.kind, ErrorKind::ImportError);
    assert!(
        import_error.message.contains("A -> B -> A"),
        "{}",
        import_error.message
    );
}

#[test]
fn boundary_empty_grammar() {
    let error = engine()
        .validate("", &mut Request::default())
        .expect_err("empty grammar is a load error");
    assert_eq!(error.errors[0].kind, ErrorKind::GrammarLoadError);
}

#[test]
fn boundary_lexer_only_grammar() {
    let source = "lexer grammar L; A : 'a' ;";
    let validation = engine()
        .validate(source, &mut Request::default())
        .expect("valid lexer grammar");
    assert!(validation.valid, "{:?}", validation.errors);
    assert_eq!(validation.rule_counts.lexer, 1);

    // No parser rule to start from: parse-error, not a crash.
    let report = engine()
        .parse_sample(source, "a", None, &mut Request::default())
        .expect("request is well-formed");
    assert!(!report.success);
    assert_eq!(report.errors[0].kind, ErrorKind::ParseError);
}

#[test]
fn boundary_import_depth() {
    let files: HashMap<&str, &str> = HashMap::from([
        ("D1", "grammar D1; import D2; r1 : 'a' ;"),
        ("D2", "grammar D2; import D3; r2 : 'b' ;"),
        ("D3", "grammar D3; r3 : 'c' ;"),
    ]);
    let main = "grammar T; import D1; top : r1 r2 r3 ;";

    let mut config = EngineConfig::default();
    config.max_import_depth = 3;
    let mut lookup = |name: &str| files.get(name).map(|s| (*s).to_owned());
    let ok = Engine::new(config.clone())
        .validate(
            main,
            &mut Request {
                lookup: Some(&mut lookup),
                cancel: Default::default(),
            },
        )
        .unwrap();
    assert!(ok.valid, "{:?}", ok.errors);

    config.max_import_depth = 2;
    let mut lookup = |name: &str| files.get(name).map(|s| (*s).to_owned());
    let failed = Engine::new(config)
        .validate(
            main,
            &mut Request {
                lookup: Some(&mut lookup),
                cancel: Default::default(),
            },
        )
        .unwrap();
    assert!(!failed.valid);
    assert_eq!(failed.errors[0].kind, ErrorKind::ImportError);
}

#[test]
fn validate_reports_structure() {
    let source = indoc! {"
        grammar Shapes;
        options { superClass = Base; }
        tokens { EXTRA }
        shape : CIRCLE | SQUARE ;
        CIRCLE : 'circle' ;
        SQUARE : 'square' ;
        WS : [ ]+ -> skip ;
    "};
    let validation = engine()
        .validate(source, &mut Request::default())
        .expect("valid grammar");
    assert!(validation.valid);
    assert_eq!(validation.grammar_name, "Shapes");
    assert_eq!(validation.rule_counts.parser, 1);
    assert_eq!(validation.rule_counts.lexer, 3);
    assert_eq!(validation.declared_tokens, vec!["EXTRA"]);
    assert_eq!(validation.options["superClass"], "Base");
}

#[test]
fn first_follow_over_engine() {
    let report = engine()
        .analyze_first_follow(CALC, None, &mut Request::default())
        .expect("analysis runs");
    let expr = report.rules.iter().find(|r| r.rule == "expr").unwrap();
    assert!(!expr.nullable);
    assert!(expr.first.contains(&"INT".to_owned()));
    assert!(expr.first.contains(&"'('".to_owned()));
    assert!(expr.follow.contains(&"EOF".to_owned()));
}

#[test]
fn complexity_over_engine() {
    let report = engine()
        .analyze_complexity(CALC, &mut Request::default())
        .expect("analysis runs");
    let expr = report.rules.iter().find(|r| r.rule == "expr").unwrap();
    assert_eq!(expr.alternatives, 4);
    assert!(expr.recursive);
    assert!(report.totals.total_decision_points > 0);
}

#[test]
fn atn_visualization_over_engine() {
    let viz = engine()
        .visualize_atn(CALC, "expr", &mut Request::default())
        .expect("rule exists");
    assert!(viz.state_count > 0);
    assert!(viz.dot.starts_with("digraph"));
    assert!(viz.mermaid.starts_with("stateDiagram-v2"));
    assert!(viz.svg.is_none());

    let missing = engine().visualize_atn(CALC, "nope", &mut Request::default());
    assert!(missing.is_err());
}

#[test]
fn decision_visualization_over_engine() {
    let viz = engine()
        .visualize_decision(CALC, "expr", &mut Request::default())
        .expect("rule exists");
    assert!(!viz.decisions.is_empty());
    for decision in &viz.decisions {
        assert!(decision.alternatives >= 2);
        assert!(decision.dot.contains("digraph"));
    }
}

#[test]
fn profile_over_engine() {
    let report = engine()
        .profile(CALC, "1 + 2 * 3", Some("expr"), &mut Request::default())
        .expect("profiling runs");
    assert!(report.parse.success);
    assert!(!report.decisions.is_empty());
    assert!(report.decisions.iter().all(|d| d.invocations > 0));
    assert!(report.ambiguities.is_empty());
}

#[test]
fn generated_inputs_parse_back() {
    let engine = engine();
    let generated = engine
        .generate_test_inputs(CALC, "expr", 5, &mut Request::default())
        .expect("generation runs");
    assert!(!generated.inputs.is_empty());
    for input in &generated.inputs {
        let report = engine
            .parse_sample(CALC, input, Some("expr"), &mut Request::default())
            .expect("request is well-formed");
        assert!(report.success, "generated input {input:?} failed to parse");
    }
}

#[test]
fn codegen_contract_over_engine() {
    let report = engine()
        .generate_code(CALC, "java", &mut Request::default())
        .expect("target supported");
    assert!(report.files.iter().any(|f| f.name == "CalcLexer.java"));
    assert!(report.files.iter().any(|f| f.name == "CalcParser.java"));

    let unsupported = engine().generate_code(CALC, "fortran", &mut Request::default());
    assert!(unsupported.is_err());
}

#[test]
fn embedded_scan_over_engine() {
    let report = engine()
        .scan_embedded("grammar T; @members { int i; } a : {go();}? 'x' ;")
        .expect("scan runs");
    assert!(report.has_actions);
    assert!(report.has_predicates);
    assert_eq!(report.members_blocks, 1);
}

#[test]
fn repeated_requests_hit_the_cache_consistently() {
    let engine = engine();
    let first = engine
        .parse_sample(CALC, "1 + 2", Some("expr"), &mut Request::default())
        .unwrap();
    let second = engine
        .parse_sample(CALC, "1 + 2", Some("expr"), &mut Request::default())
        .unwrap();
    assert_eq!(first.tree, second.tree);
    assert_eq!(first.tokens, second.tokens);
}

#[test]
fn oversized_input_is_rejected() {
    let mut config = EngineConfig::default();
    config.max_input_size_mb = 0;
    let engine = Engine::new(config);
    let error = engine
        .parse_sample(CALC, "1 + 2", Some("expr"), &mut Request::default())
        .expect_err("zero limit rejects everything");
    assert_eq!(error.errors[0].kind, ErrorKind::InvalidInput);
}
