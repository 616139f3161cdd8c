//! Tests for model lowering, vocabulary building, and reference checks.

use gramspect_core::reports::{GrammarKind, RuleKind};
use indoc::indoc;

use crate::diagnostics::Diagnostics;
use crate::model::{self, Element, LexerCommand};
use crate::parse_grammar;

const CALC: &str = indoc! {r"
    grammar Calc;
    expr : expr ('*'|'/') expr | expr ('+'|'-') expr | INT | '(' expr ')' ;
    INT : [0-9]+ ;
    WS : [ \t\r\n]+ -> skip ;
"};

#[test]
fn calc_smoke() {
    let (grammar, diags) = parse_grammar(CALC);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    assert_eq!(grammar.name, "Calc");
    assert_eq!(grammar.kind, GrammarKind::Combined);
    assert_eq!(grammar.rules.len(), 3);
    assert_eq!(grammar.rules["expr"].kind, RuleKind::Parser);
    assert_eq!(grammar.rules["INT"].kind, RuleKind::Lexer);
    assert_eq!(grammar.rules["expr"].alternatives.len(), 4);
    assert_eq!(grammar.default_start_rule(), Some("expr"));
}

#[test]
fn vocabulary_types_and_implicit_literals() {
    let (grammar, _) = parse_grammar(CALC);
    let vocab = &grammar.vocabulary;

    // Lexer rules first, in order.
    assert_eq!(vocab.type_of_name("INT"), Some(1));
    assert_eq!(vocab.type_of_name("WS"), Some(2));

    // Implicit literals from parser rules, in encounter order.
    assert_eq!(vocab.type_of_literal("*"), Some(3));
    assert_eq!(vocab.type_of_literal("/"), Some(4));
    assert_eq!(vocab.type_of_literal("+"), Some(5));
    assert_eq!(vocab.type_of_literal("-"), Some(6));
    assert_eq!(vocab.type_of_literal("("), Some(7));
    assert_eq!(vocab.type_of_literal(")"), Some(8));
    assert_eq!(grammar.implicit_literals.len(), 6);

    assert_eq!(vocab.display_name(1), "INT");
    assert_eq!(vocab.display_name(3), "'*'");
    assert_eq!(vocab.display_name(model::TOKEN_EOF), "EOF");
}

#[test]
fn literal_defining_lexer_rule_binds_literal() {
    let (grammar, diags) =
        parse_grammar("grammar T; a : PLUS | 'x' ; PLUS : '+' ; X : 'x' ;");
    assert!(!diags.has_errors());
    // 'x' is defined by lexer rule X, so no implicit token is created.
    assert_eq!(
        grammar.vocabulary.type_of_literal("x"),
        grammar.vocabulary.type_of_name("X")
    );
    assert!(grammar.implicit_literals.is_empty());
    assert_eq!(
        grammar.vocabulary.type_of_literal("+"),
        grammar.vocabulary.type_of_name("PLUS")
    );
}

#[test]
fn grammar_kind_from_header() {
    let (g, _) = parse_grammar("lexer grammar L; A : 'a' ;");
    assert_eq!(g.kind, GrammarKind::LexerOnly);
    let (g, _) = parse_grammar("parser grammar P; a : B ;");
    assert_eq!(g.kind, GrammarKind::ParserOnly);
}

#[test]
fn parser_rule_in_lexer_grammar_rejected() {
    let (_, diags) = parse_grammar("lexer grammar L; a : 'x' ;");
    assert!(diags.has_errors());
}

#[test]
fn duplicate_rule_rejected() {
    let (_, diags) = parse_grammar("grammar T; a : 'x' ; a : 'y' ;");
    let rendered = diags.printer().render();
    assert!(rendered.contains("duplicate rule 'a'"), "{rendered}");
}

#[test]
fn eof_rule_reserved() {
    let (_, diags) = parse_grammar("grammar T; EOF : 'x' ;");
    let rendered = diags.printer().render();
    assert!(rendered.contains("reserved"), "{rendered}");
}

#[test]
fn options_and_tokens_blocks() {
    let source = indoc! {"
        grammar T;
        options { tokenVocab = CommonLexer; superClass = Base; }
        tokens { A, B }
        channels { COMMENTS, DOCS }
        a : A B ;
    "};
    let (grammar, diags) = parse_grammar(source);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    assert_eq!(grammar.options["tokenVocab"], "CommonLexer");
    assert_eq!(grammar.options["superClass"], "Base");
    assert_eq!(grammar.declared_tokens, vec!["A", "B"]);
    assert_eq!(grammar.declared_channels, vec!["COMMENTS", "DOCS"]);
    assert_eq!(grammar.channel_id("COMMENTS"), Some(2));
    assert_eq!(grammar.channel_id("HIDDEN"), Some(1));
    assert_eq!(grammar.channel_id("7"), Some(7));
}

#[test]
fn named_actions_collected() {
    let source = "grammar T; @header { package x; } @parser::members { int n; } a : 'x' ;";
    let (grammar, diags) = parse_grammar(source);
    assert!(!diags.has_errors());
    assert_eq!(grammar.named_actions.len(), 2);
    assert_eq!(grammar.named_actions[0].name, "header");
    assert_eq!(grammar.named_actions[1].scope.as_deref(), Some("parser"));
    assert!(grammar.has_embedded_code());
}

#[test]
fn lexer_commands_lowered() {
    let source = indoc! {"
        lexer grammar L;
        channels { DOC }
        WS : [ ]+ -> skip ;
        DOCS : '#' -> channel(DOC) ;
        KW : 'kw' -> type(ID), mode(OTHER) ;
        mode OTHER;
        ID : [a-z]+ -> popMode ;
    "};
    let (grammar, diags) = parse_grammar(source);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    assert_eq!(grammar.rules["WS"].alternatives[0].commands, vec![LexerCommand::Skip]);
    assert_eq!(
        grammar.rules["DOCS"].alternatives[0].commands,
        vec![LexerCommand::Channel("DOC".to_owned())]
    );
    assert_eq!(
        grammar.rules["KW"].alternatives[0].commands,
        vec![
            LexerCommand::Type("ID".to_owned()),
            LexerCommand::Mode("OTHER".to_owned())
        ]
    );
    assert_eq!(grammar.modes, vec!["DEFAULT_MODE", "OTHER"]);
    assert_eq!(grammar.rules["ID"].mode, 1);
    assert_eq!(grammar.rules["WS"].mode, 0);
}

#[test]
fn mode_rejected_outside_lexer_grammar() {
    let (_, diags) = parse_grammar("grammar T; a : 'x' ; mode M; B : 'b' ;");
    assert!(diags.has_errors());
}

#[test]
fn commands_rejected_in_parser_rule() {
    let (_, diags) = parse_grammar("grammar T; a : 'x' -> skip ;");
    let rendered = diags.printer().render();
    assert!(rendered.contains("only allowed in lexer rules"), "{rendered}");
}

#[test]
fn char_set_parsing() {
    let (grammar, diags) = parse_grammar(r"grammar T; A : [a-zA-Z0-9_\-]+ ;");
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    let alt = &grammar.rules["A"].alternatives[0];
    let Element::Plus { inner, greedy: true } = &alt.elements[0] else {
        panic!("expected plus element, got {:?}", alt.elements[0]);
    };
    let Element::CharClass { set, .. } = inner.as_ref() else {
        panic!("expected char class");
    };
    assert!(set.contains('q'));
    assert!(set.contains('Z'));
    assert!(set.contains('5'));
    assert!(set.contains('_'));
    assert!(set.contains('-'));
    assert!(!set.contains(' '));
}

#[test]
fn escaped_literals_unescape() {
    let (grammar, diags) = parse_grammar(r"grammar T; NL : '\n' | '\\' | '\'' ;");
    assert!(!diags.has_errors());
    let alts = &grammar.rules["NL"].alternatives;
    let texts: Vec<&str> = alts
        .iter()
        .map(|a| match &a.elements[0] {
            Element::Literal { text, .. } => text.as_str(),
            other => panic!("expected literal, got {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["\n", "\\", "'"]);
}

#[test]
fn lexer_char_range() {
    let (grammar, diags) = parse_grammar("lexer grammar L; LOWER : 'a'..'z' ;");
    assert!(!diags.has_errors());
    let Element::Range { from, to, .. } = &grammar.rules["LOWER"].alternatives[0].elements[0]
    else {
        panic!("expected range");
    };
    assert_eq!((*from, *to), ('a', 'z'));
}

#[test]
fn undefined_reference_detected() {
    let (grammar, diags) = parse_grammar("grammar T; a : missing | UNDEF ; X : 'x' ;");
    assert!(!diags.has_errors(), "lowering alone does not check refs");
    let mut ref_diags = Diagnostics::new();
    model::check_references(&grammar, &mut ref_diags);
    let rendered = ref_diags.printer().render();
    assert!(rendered.contains("undefined rule 'missing'"), "{rendered}");
    assert!(rendered.contains("undefined token 'UNDEF'"), "{rendered}");
}

#[test]
fn fragment_not_usable_from_parser_rule() {
    let (grammar, _) = parse_grammar("grammar T; a : DIGIT ; fragment DIGIT : [0-9] ;");
    let mut diags = Diagnostics::new();
    model::check_references(&grammar, &mut diags);
    let rendered = diags.printer().render();
    assert!(rendered.contains("fragment"), "{rendered}");
}

#[test]
fn eof_reference_is_allowed() {
    let (grammar, _) = parse_grammar("grammar T; prog : expr EOF ; expr : INT ; INT : [0-9]+ ;");
    let mut diags = Diagnostics::new();
    model::check_references(&grammar, &mut diags);
    assert!(!diags.has_errors());
}

#[test]
fn alt_labels_and_element_labels() {
    let source = "grammar T; e : l=INT # Leaf | lhs=e op='+' rhs=e # Add ; INT : [0-9]+ ;";
    let (grammar, diags) = parse_grammar(source);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    let alts = &grammar.rules["e"].alternatives;
    assert_eq!(alts[0].label.as_deref(), Some("Leaf"));
    assert_eq!(alts[1].label.as_deref(), Some("Add"));
    let Element::Labeled { label, is_list, .. } = &alts[0].elements[0] else {
        panic!("expected labeled element");
    };
    assert_eq!(label, "l");
    assert!(!is_list);
}

#[test]
fn empty_source_yields_no_rules() {
    let (grammar, diags) = parse_grammar("");
    assert!(grammar.rules.is_empty());
    assert!(!diags.has_errors());
}

#[test]
fn missing_header_is_an_error() {
    let (_, diags) = parse_grammar("expr : INT ; INT : [0-9]+ ;");
    assert!(diags.has_errors());
}
