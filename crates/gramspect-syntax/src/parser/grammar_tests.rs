//! CST structure tests for the grammar productions.

use std::fmt::Write;

use super::cst::SyntaxNode;
use super::parse;

/// Renders the CST as an indented kind tree, trivia omitted.
fn dump(source: &str) -> String {
    let parse = parse(source);
    let mut out = String::new();
    walk(&parse.syntax(), 0, &mut out);
    out.trim_end().to_owned()
}

fn walk(node: &SyntaxNode, depth: usize, out: &mut String) {
    writeln!(out, "{:indent$}{:?}", "", node.kind(), indent = depth * 2).unwrap();
    for child in node.children_with_tokens() {
        match child {
            rowan::NodeOrToken::Node(n) => walk(&n, depth + 1, out),
            rowan::NodeOrToken::Token(t) => {
                if !t.kind().is_trivia() {
                    writeln!(
                        out,
                        "{:indent$}{:?} {:?}",
                        "",
                        t.kind(),
                        t.text(),
                        indent = (depth + 1) * 2
                    )
                    .unwrap();
                }
            }
        }
    }
}

#[test]
fn header_only() {
    insta::assert_snapshot!(dump("grammar Calc;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "Calc"
        Semi ";"
    "#);
}

#[test]
fn lexer_grammar_header() {
    insta::assert_snapshot!(dump("lexer grammar CalcLexer;"), @r#"
    Root
      GrammarDecl
        KwLexer "lexer"
        KwGrammar "grammar"
        UpperIdent "CalcLexer"
        Semi ";"
    "#);
}

#[test]
fn rule_with_alternatives() {
    insta::assert_snapshot!(dump("grammar T; expr : INT | expr '+' expr ;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        LowerIdent "expr"
        Colon ":"
        AltList
          Alternative
            TokenRef
              UpperIdent "INT"
          Pipe "|"
          Alternative
            RuleRef
              LowerIdent "expr"
            Literal
              StringLit "'+'"
            RuleRef
              LowerIdent "expr"
        Semi ";"
    "#);
}

#[test]
fn quantified_char_set() {
    insta::assert_snapshot!(dump("grammar T; INT : [0-9]+ ;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        UpperIdent "INT"
        Colon ":"
        AltList
          Alternative
            Quantifier
              CharClass
                CharSet "[0-9]"
              Plus "+"
        Semi ";"
    "#);
}

#[test]
fn lexer_commands() {
    insta::assert_snapshot!(dump("grammar T; WS : [ ]+ -> skip ;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        UpperIdent "WS"
        Colon ":"
        AltList
          Alternative
            Quantifier
              CharClass
                CharSet "[ ]"
              Plus "+"
            LexerCommands
              Arrow "->"
              Command
                LowerIdent "skip"
        Semi ";"
    "#);
}

#[test]
fn labeled_element_and_alt_label() {
    insta::assert_snapshot!(dump("grammar T; e : x=INT # Leaf ;"), @r##"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        LowerIdent "e"
        Colon ":"
        AltList
          Alternative
            Labeled
              LowerIdent "x"
              Assign "="
              TokenRef
                UpperIdent "INT"
            AltLabel
              Pound "#"
              UpperIdent "Leaf"
        Semi ";"
    "##);
}

#[test]
fn predicate_and_action() {
    insta::assert_snapshot!(dump("grammar T; a : {p()}? b {act();} ;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        LowerIdent "a"
        Colon ":"
        AltList
          Alternative
            PredicateElement
              ActionBlock "{p()}"
              Question "?"
            RuleRef
              LowerIdent "b"
            ActionElement
              ActionBlock "{act();}"
        Semi ";"
    "#);
}

#[test]
fn empty_alternative() {
    insta::assert_snapshot!(dump("grammar T; a : | b ;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        LowerIdent "a"
        Colon ":"
        AltList
          Alternative
          Pipe "|"
          Alternative
            RuleRef
              LowerIdent "b"
        Semi ";"
    "#);
}

#[test]
fn nested_blocks() {
    insta::assert_snapshot!(dump("grammar T; a : ('x' | 'y')* ;"), @r#"
    Root
      GrammarDecl
        KwGrammar "grammar"
        UpperIdent "T"
        Semi ";"
      RuleDef
        LowerIdent "a"
        Colon ":"
        AltList
          Alternative
            Quantifier
              Block
                ParenOpen "("
                AltList
                  Alternative
                    Literal
                      StringLit "'x'"
                  Pipe "|"
                  Alternative
                    Literal
                      StringLit "'y'"
                ParenClose ")"
              Star "*"
        Semi ";"
    "#);
}

#[test]
fn missing_semi_recovers_at_next_rule() {
    let parse = parse("grammar T; a : b \n c : 'x' ;");
    assert!(parse.diagnostics().has_errors());
    // Both rules still present in the tree.
    let rules: Vec<_> = parse
        .syntax()
        .children()
        .filter(|n| n.kind() == super::cst::SyntaxKind::RuleDef)
        .collect();
    assert_eq!(rules.len(), 2);
}

#[test]
fn tree_text_is_lossless() {
    let source = "grammar T;\n// comment\nexpr : INT | expr '+' expr ; // trailing\n";
    let parse = parse(source);
    assert_eq!(parse.syntax().text().to_string(), source);
}

#[test]
fn unterminated_literal_reports_lexical_error() {
    let parse = parse("grammar T; A : 'oops ;");
    let messages: Vec<_> = parse
        .diagnostics()
        .iter()
        .map(|d| d.message().to_owned())
        .collect();
    assert!(
        messages.iter().any(|m| m.contains("unterminated string")),
        "got: {messages:?}"
    );
}

#[test]
fn empty_input_is_tolerated() {
    let parse = parse("");
    assert!(!parse.diagnostics().has_errors());
    assert_eq!(parse.syntax().children().count(), 0);
}
