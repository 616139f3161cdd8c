//! Lexer for ANTLR4 grammar files.
//!
//! Produces span-based tokens without storing text - text is sliced from source only when needed.
//!
//! ## Error handling
//!
//! The lexer coalesces consecutive error characters into single `Garbage` tokens rather
//! than producing one error per character. Unterminated literals, char sets, and action
//! blocks all land in `Garbage`; the parser inspects the first character of the garbage
//! slice to produce a specific "unterminated ..." diagnostic.

use logos::Logos;
use rowan::TextRange;
use std::ops::Range;

use super::cst::SyntaxKind;

/// Zero-copy token: kind + span, text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: TextRange,
}

impl Token {
    #[inline]
    pub fn new(kind: SyntaxKind, span: TextRange) -> Self {
        Self { kind, span }
    }
}

fn range_to_text_range(range: Range<usize>) -> TextRange {
    TextRange::new((range.start as u32).into(), (range.end as u32).into())
}

/// Tokenizes source into a vector of span-based tokens, coalescing
/// consecutive lexer errors into single `Garbage` tokens.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = SyntaxKind::lexer(source);
    let mut error_start: Option<usize> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some(start) = error_start.take() {
                    let end = lexer.span().start;
                    tokens.push(Token::new(
                        SyntaxKind::Garbage,
                        range_to_text_range(start..end),
                    ));
                }
                tokens.push(Token::new(kind, range_to_text_range(lexer.span())));
            }
            Some(Err(())) => {
                if error_start.is_none() {
                    error_start = Some(lexer.span().start);
                }
            }
            None => {
                if let Some(start) = error_start.take() {
                    tokens.push(Token::new(
                        SyntaxKind::Garbage,
                        range_to_text_range(start..source.len()),
                    ));
                }
                break;
            }
        }
    }

    tokens
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'g>(source: &'g str, token: &Token) -> &'g str {
    &source[std::ops::Range::<usize>::from(token.span)]
}

/// Logos callback for `{`: consumes a whole action/predicate body.
///
/// Counts brace nesting while honoring single- and double-quoted literals
/// (with backslash escapes) and `//` / `/* */` comments, so braces inside
/// embedded target code do not terminate the block. Returns `false` when
/// the block never closes, which routes the rest of the input into the
/// `Garbage` path.
pub fn lex_action_block(lex: &mut logos::Lexer<SyntaxKind>) -> bool {
    let rest = lex.remainder();
    let mut depth = 1usize;
    let mut chars = rest.char_indices();

    #[derive(PartialEq)]
    enum State {
        Normal,
        SingleQuote,
        DoubleQuote,
        LineComment,
        BlockComment,
    }
    let mut state = State::Normal;

    while let Some((i, c)) = chars.next() {
        match state {
            State::Normal => match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        lex.bump(i + 1);
                        return true;
                    }
                }
                '\'' => state = State::SingleQuote,
                '"' => state = State::DoubleQuote,
                '/' => match rest[i + 1..].chars().next() {
                    Some('/') => state = State::LineComment,
                    Some('*') => state = State::BlockComment,
                    _ => {}
                },
                _ => {}
            },
            State::SingleQuote => match c {
                '\\' => {
                    chars.next();
                }
                '\'' | '\n' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuote => match c {
                '\\' => {
                    chars.next();
                }
                '"' | '\n' => state = State::Normal,
                _ => {}
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && rest[i + 1..].starts_with('/') {
                    chars.next();
                    state = State::Normal;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use SyntaxKind::*;

    fn kinds(source: &str) -> Vec<SyntaxKind> {
        lex(source)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn header_tokens() {
        assert_eq!(
            kinds("grammar Calc;"),
            vec![KwGrammar, UpperIdent, Semi],
        );
        assert_eq!(
            kinds("lexer grammar CalcLexer;"),
            vec![KwLexer, KwGrammar, UpperIdent, Semi],
        );
    }

    #[test]
    fn rule_tokens() {
        assert_eq!(
            kinds("expr : expr '*' expr | INT ;"),
            vec![
                LowerIdent, Colon, LowerIdent, StringLit, LowerIdent, Pipe, UpperIdent, Semi
            ],
        );
    }

    #[test]
    fn char_set_and_suffixes() {
        assert_eq!(
            kinds("INT : [0-9]+ ;"),
            vec![UpperIdent, Colon, CharSet, Plus, Semi],
        );
        assert_eq!(
            kinds("WS : [ \\t\\r\\n]+ -> skip ;"),
            vec![UpperIdent, Colon, CharSet, Plus, Arrow, LowerIdent, Semi],
        );
    }

    #[test]
    fn lexer_range() {
        assert_eq!(
            kinds("LETTER : 'a'..'z' ;"),
            vec![UpperIdent, Colon, StringLit, DotDot, StringLit, Semi],
        );
    }

    #[test]
    fn nongreedy_suffixes() {
        assert_eq!(
            kinds("COMMENT : '/*' .*? '*/' ;"),
            vec![UpperIdent, Colon, StringLit, Dot, StarQuestion, StringLit, Semi],
        );
    }

    #[test]
    fn action_block_nesting() {
        let tokens = lex("@members { int f() { return '{'; } } rule : A ;");
        let action = tokens
            .iter()
            .find(|t| t.kind == ActionBlock)
            .expect("action block token");
        let text = token_text("@members { int f() { return '{'; } } rule : A ;", action);
        assert_eq!(text, "{ int f() { return '{'; } }");
    }

    #[test]
    fn action_block_honors_comments() {
        let source = "{ /* } */ x(); // }\n }";
        let tokens = lex(source);
        assert_eq!(tokens[0].kind, ActionBlock);
        assert_eq!(token_text(source, &tokens[0]), source);
    }

    #[test]
    fn predicate_tokens() {
        assert_eq!(
            kinds("a : {cond}? b ;"),
            vec![LowerIdent, Colon, ActionBlock, Question, LowerIdent, Semi],
        );
    }

    #[test]
    fn unterminated_literal_is_garbage() {
        let tokens = lex("A : 'unterminated");
        assert_eq!(tokens.last().unwrap().kind, Garbage);
    }

    #[test]
    fn unterminated_action_is_garbage() {
        let tokens = lex("@members { never closed");
        assert_eq!(tokens.last().unwrap().kind, Garbage);
    }

    #[test]
    fn keywords_beat_identifiers() {
        assert_eq!(kinds("fragment"), vec![KwFragment]);
        assert_eq!(kinds("fragments"), vec![LowerIdent]);
        assert_eq!(kinds("mode grammars"), vec![KwMode, LowerIdent]);
    }

    #[test]
    fn import_list() {
        assert_eq!(
            kinds("import Common, Extra;"),
            vec![KwImport, UpperIdent, Comma, UpperIdent, Semi],
        );
    }
}
