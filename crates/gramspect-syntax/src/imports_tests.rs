//! Tests for import resolution, merging, and cycle detection.

use std::collections::HashMap;

use crate::imports::{self, ImportError};
use crate::parse_grammar;

fn lookup_from<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl FnMut(&str) -> Option<String> + 'a {
    move |name: &str| map.get(name).map(|s| (*s).to_owned())
}

fn resolve(
    main: &str,
    files: &HashMap<&str, &str>,
    max_depth: usize,
) -> Result<imports::ResolvedGrammar, ImportError> {
    let (grammar, diags) = parse_grammar(main);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    let mut lookup = lookup_from(files);
    imports::resolve(grammar, &mut lookup, max_depth)
}

#[test]
fn no_imports_is_a_no_op() {
    let resolved = resolve("grammar T; a : X ; X : 'x' ;", &HashMap::new(), 10).unwrap();
    assert_eq!(resolved.grammar.rules.len(), 2);
    assert!(resolved.order.is_empty());
    assert!(!resolved.diagnostics.has_errors());
}

#[test]
fn imported_rules_merge() {
    let files = HashMap::from([("Common", "grammar Common; INT : [0-9]+ ; WS : [ ]+ -> skip ;")]);
    let resolved = resolve("grammar T; import Common; a : INT ;", &files, 10).unwrap();
    assert!(resolved.grammar.rules.contains_key("INT"));
    assert!(resolved.grammar.rules.contains_key("WS"));
    assert!(!resolved.diagnostics.has_errors());
    assert_eq!(resolved.order, vec!["Common"]);
    // Imported lexer rules join the vocabulary.
    assert!(resolved.grammar.vocabulary.type_of_name("INT").is_some());
}

#[test]
fn host_overrides_imported_rule() {
    let files = HashMap::from([("Base", "grammar Base; a : 'base' ; X : 'x' ;")]);
    let resolved = resolve("grammar T; import Base; a : 'host' X ;", &files, 10).unwrap();
    let rule = &resolved.grammar.rules["a"];
    // The host definition (two elements) survives.
    assert_eq!(rule.alternatives[0].elements.len(), 2);
}

#[test]
fn duplicate_across_sibling_imports_rejected() {
    let files = HashMap::from([
        ("A", "grammar A; x : 'a' ;"),
        ("B", "grammar B; x : 'b' ;"),
    ]);
    let err = resolve("grammar T; import A, B; y : x ;", &files, 10).unwrap_err();
    let ImportError::DuplicateAcrossImports { rule, first, second } = err else {
        panic!("expected duplicate error, got {err}");
    };
    assert_eq!(rule, "x");
    assert_eq!(first, "A");
    assert_eq!(second, "B");
}

#[test]
fn cycle_reports_full_chain() {
    let files = HashMap::from([
        ("A", "grammar A; import B; a : 'a' ;"),
        ("B", "grammar B; import A; b : 'b' ;"),
    ]);
    // Main grammar A imports B, B imports A.
    let (grammar, _) = parse_grammar(files["A"]);
    let mut lookup = lookup_from(&files);
    let err = imports::resolve(grammar, &mut lookup, 10).unwrap_err();
    let ImportError::CircularImport { chain } = err else {
        panic!("expected cycle, got {err}");
    };
    assert_eq!(chain, vec!["A", "B", "A"]);
}

#[test]
fn depth_at_limit_succeeds_and_over_limit_fails() {
    // T -> D1 -> D2 -> D3
    let files = HashMap::from([
        ("D1", "grammar D1; import D2; r1 : 'a' ;"),
        ("D2", "grammar D2; import D3; r2 : 'b' ;"),
        ("D3", "grammar D3; r3 : 'c' ;"),
    ]);
    let main = "grammar T; import D1; top : r1 r2 r3 ;";

    let ok = resolve(main, &files, 3).unwrap();
    assert!(ok.grammar.rules.contains_key("r3"));

    let err = resolve(main, &files, 2).unwrap_err();
    assert!(matches!(err, ImportError::MaxDepthExceeded { max_depth: 2, .. }));
}

#[test]
fn missing_import_reports_name() {
    let err = resolve("grammar T; import Nope; a : 'x' ;", &HashMap::new(), 10).unwrap_err();
    let ImportError::NotFound { name } = err else {
        panic!("expected not-found, got {err}");
    };
    assert_eq!(name, "Nope");
}

#[test]
fn invalid_import_is_rejected() {
    let files = HashMap::from([("Bad", "grammar Bad; broken : ")]);
    let err = resolve("grammar T; import Bad; a : 'x' ;", &files, 10).unwrap_err();
    assert!(matches!(err, ImportError::InvalidImport { .. }));
}

#[test]
fn diamond_import_is_not_a_cycle() {
    // T imports A and B; both import Common. Common is cached, and its
    // single contribution is not a sibling duplicate.
    let files = HashMap::from([
        ("A", "grammar A; import Common; a : c ;"),
        ("B", "grammar B; import Common; b : c ;"),
        ("Common", "grammar Common; c : 'c' ;"),
    ]);
    let resolved = resolve("grammar T; import A, B; t : a b ;", &files, 10).unwrap();
    assert!(resolved.grammar.rules.contains_key("c"));
    assert_eq!(resolved.order, vec!["Common", "A", "B"]);
}

#[test]
fn resolution_is_idempotent() {
    let files = HashMap::from([("Common", "grammar Common; INT : [0-9]+ ;")]);
    let first = resolve("grammar T; import Common; a : INT ;", &files, 10).unwrap();
    let rule_names: Vec<String> = first.grammar.rules.keys().cloned().collect();

    let mut lookup = lookup_from(&files);
    let second = imports::resolve(first.grammar, &mut lookup, 10).unwrap();
    let rule_names_again: Vec<String> = second.grammar.rules.keys().cloned().collect();
    assert_eq!(rule_names, rule_names_again);
    assert!(!second.diagnostics.has_errors());
}

#[test]
fn undefined_reference_after_merge_is_reported() {
    let files = HashMap::from([("Common", "grammar Common; INT : [0-9]+ ;")]);
    let resolved = resolve("grammar T; import Common; a : FLOAT ;", &files, 10).unwrap();
    assert!(resolved.diagnostics.has_errors());
}
