//! Tests for the lexer interpreter.

use gramspect_atn::{Atn, build};
use gramspect_syntax::{GrammarSource, parse_grammar};
use indoc::indoc;

use crate::budget::Budget;
use crate::lexer::{LexOutput, lex};
use crate::token::TOKEN_ERROR;

fn setup(source: &str) -> (GrammarSource, Atn) {
    let (grammar, diags) = parse_grammar(source);
    assert!(!diags.has_errors(), "{}", diags.printer().render());
    let (atn, build_diags) = build(&grammar);
    assert!(
        !build_diags.has_errors(),
        "{}",
        build_diags.printer().render()
    );
    (grammar, atn)
}

fn lex_ok<'s>(atn: &Atn, input: &'s str) -> LexOutput<'s> {
    lex(atn, input, &Budget::unlimited()).expect("lexing never aborts")
}

fn display_types(grammar: &GrammarSource, output: &LexOutput<'_>) -> Vec<String> {
    output
        .tokens
        .iter()
        .map(|t| grammar.vocabulary.display_name(t.token_type))
        .collect()
}

const CALC: &str = indoc! {r"
    grammar Calc;
    expr : expr ('*'|'/') expr | expr ('+'|'-') expr | INT | '(' expr ')' ;
    INT : [0-9]+ ;
    WS : [ \t\r\n]+ -> skip ;
"};

#[test]
fn calc_tokens() {
    let (grammar, atn) = setup(CALC);
    let output = lex_ok(&atn, "42 + 1");
    assert!(output.errors.is_empty());
    assert_eq!(
        display_types(&grammar, &output),
        vec!["INT", "'+'", "INT", "EOF"]
    );
    let texts: Vec<&str> = output.tokens.iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["42", "+", "1", ""]);
}

#[test]
fn token_offsets_are_monotone() {
    let (_, atn) = setup(CALC);
    let output = lex_ok(&atn, "1 + 23 * (4)");
    let mut last_start = 0;
    for token in &output.tokens {
        assert!(token.start >= last_start);
        assert!(token.stop >= token.start);
        last_start = token.start;
    }
}

#[test]
fn keyword_literal_beats_identifier_on_tie() {
    let (grammar, atn) = setup(indoc! {"
        grammar T;
        s : 'if' ID ;
        ID : [a-z]+ ;
        WS : [ ]+ -> skip ;
    "});
    let output = lex_ok(&atn, "if ifx");
    assert_eq!(
        display_types(&grammar, &output),
        vec!["'if'", "ID", "EOF"]
    );
    // Longest match still wins over the keyword.
    assert_eq!(output.tokens[1].text, "ifx");
}

#[test]
fn longest_match_wins() {
    let (grammar, atn) = setup(indoc! {"
        lexer grammar Ops;
        EQ : '=' ;
        EQEQ : '==' ;
    "});
    let output = lex_ok(&atn, "===");
    assert_eq!(
        display_types(&grammar, &output),
        vec!["EQEQ", "EQ", "EOF"]
    );
}

#[test]
fn skip_omits_and_channel_reroutes() {
    let (grammar, atn) = setup(indoc! {"
        lexer grammar L;
        ID : [a-z]+ ;
        COMMENT : '#' ~[\\n]* -> channel(HIDDEN) ;
        WS : [ \\n]+ -> skip ;
    "});
    let output = lex_ok(&atn, "ab #note\ncd");
    assert_eq!(
        display_types(&grammar, &output),
        vec!["ID", "COMMENT", "ID", "EOF"]
    );
    assert_eq!(output.tokens[1].channel, 1);
    let default: Vec<&str> = crate::default_channel(&output.tokens)
        .iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(default, vec!["ab", "cd", ""]);
}

#[test]
fn fragments_are_callable_but_produce_no_tokens() {
    let (grammar, atn) = setup(indoc! {"
        lexer grammar L;
        INT : DIGIT+ ;
        fragment DIGIT : [0-9] ;
    "});
    let output = lex_ok(&atn, "123");
    assert_eq!(display_types(&grammar, &output), vec!["INT", "EOF"]);
    assert_eq!(output.tokens[0].text, "123");
}

#[test]
fn unmatchable_character_yields_error_token_and_continues() {
    let (_, atn) = setup(indoc! {"
        lexer grammar L;
        INT : [0-9]+ ;
        WS : [ ]+ -> skip ;
    "});
    let output = lex_ok(&atn, "4 $ 2");
    assert_eq!(output.errors.len(), 1);
    assert!(output.errors[0].message.contains('$'));
    let error_tokens: Vec<_> = output
        .tokens
        .iter()
        .filter(|t| t.token_type == TOKEN_ERROR)
        .collect();
    assert_eq!(error_tokens.len(), 1);
    assert_eq!(error_tokens[0].text, "$");
    // Lexing continued past the bad character.
    assert_eq!(output.tokens.last().unwrap().token_type, gramspect_syntax::TOKEN_EOF);
    assert_eq!(output.tokens.len(), 4); // 4, $, 2, EOF
}

#[test]
fn line_and_column_tracking() {
    let (_, atn) = setup(indoc! {"
        lexer grammar L;
        ID : [a-z]+ ;
        NL : '\\n' -> skip ;
        WS : [ ]+ -> skip ;
    "});
    let output = lex_ok(&atn, "a\nbb cc");
    assert_eq!((output.tokens[0].line, output.tokens[0].column), (1, 0));
    assert_eq!((output.tokens[1].line, output.tokens[1].column), (2, 0));
    assert_eq!((output.tokens[2].line, output.tokens[2].column), (2, 3));
}

#[test]
fn type_command_overrides() {
    let (grammar, atn) = setup(indoc! {"
        lexer grammar L;
        tokens { ID }
        KW : 'kw' -> type(ID) ;
    "});
    let output = lex_ok(&atn, "kw");
    assert_eq!(
        output.tokens[0].token_type,
        grammar.vocabulary.type_of_name("ID").unwrap()
    );
}

#[test]
fn more_extends_the_next_token() {
    let (grammar, atn) = setup(indoc! {"
        lexer grammar L;
        HASH : '#' -> more ;
        WORD : [a-z]+ ;
    "});
    let output = lex_ok(&atn, "#ab");
    assert_eq!(display_types(&grammar, &output), vec!["WORD", "EOF"]);
    assert_eq!(output.tokens[0].text, "#ab");
}

#[test]
fn modes_switch_rule_sets() {
    let (grammar, atn) = setup(indoc! {r#"
        lexer grammar Str;
        OPEN : '"' -> pushMode(IN_STRING) ;
        WS : [ ]+ -> skip ;
        mode IN_STRING;
        TEXT : ~["]+ ;
        CLOSE : '"' -> popMode ;
    "#});
    let output = lex_ok(&atn, r#""ab" "c""#);
    assert_eq!(
        display_types(&grammar, &output),
        vec!["OPEN", "TEXT", "CLOSE", "OPEN", "TEXT", "CLOSE", "EOF"]
    );
    assert_eq!(output.tokens[1].text, "ab");
    assert!(output.errors.is_empty());
}

#[test]
fn char_range_rule() {
    let (grammar, atn) = setup("lexer grammar L; LOW : 'a'..'c' ;");
    let output = lex_ok(&atn, "ba");
    assert_eq!(
        display_types(&grammar, &output),
        vec!["LOW", "LOW", "EOF"]
    );
    let bad = lex_ok(&atn, "d");
    assert_eq!(bad.errors.len(), 1);
}
