//! Embedded-code detection.
//!
//! A fast scan over raw grammar text, independent of the full parser:
//! counts named action blocks (`@header`, `@members`, `@init`, `@after`),
//! inline actions, and semantic predicates, using the same nesting-aware
//! brace scanning the lexer uses. The detected-language label is a
//! substring heuristic; callers must treat it as advisory only.

use serde::Serialize;

/// What a scan over the grammar text found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedCodeReport {
    pub has_actions: bool,
    pub has_predicates: bool,
    pub header_blocks: usize,
    pub members_blocks: usize,
    pub init_blocks: usize,
    pub after_blocks: usize,
    pub other_named_blocks: usize,
    pub inline_actions: usize,
    pub predicates: usize,
    /// Best-effort guess at the embedded code's language. Advisory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
}

/// Scans grammar text for embedded code without parsing it.
pub fn scan(text: &str) -> EmbeddedCodeReport {
    let mut report = EmbeddedCodeReport::default();
    let bytes = text.as_bytes();
    let mut bodies = String::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_line_comment(text, i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(text, i);
            }
            b'\'' => {
                i = skip_quoted(text, i, b'\'');
            }
            b'[' => {
                i = skip_char_set(text, i);
            }
            b'@' => {
                let (name, brace) = named_action_at(text, i);
                match brace {
                    Some(open) => {
                        classify_named(&name, &mut report);
                        let end = block_end(text, open);
                        bodies.push_str(&text[open..end]);
                        bodies.push('\n');
                        i = end;
                    }
                    None => i += 1,
                }
            }
            b'{' => {
                let end = block_end(text, i);
                if bytes.get(end) == Some(&b'?') {
                    report.predicates += 1;
                } else {
                    report.inline_actions += 1;
                }
                bodies.push_str(&text[i..end]);
                bodies.push('\n');
                i = end;
            }
            _ => i += 1,
        }
    }

    report.has_actions = report.inline_actions > 0
        || report.header_blocks > 0
        || report.members_blocks > 0
        || report.init_blocks > 0
        || report.after_blocks > 0
        || report.other_named_blocks > 0;
    report.has_predicates = report.predicates > 0;
    report.language_hint = guess_language(&bodies);
    report
}

fn classify_named(name: &str, report: &mut EmbeddedCodeReport) {
    match name {
        "header" => report.header_blocks += 1,
        "members" => report.members_blocks += 1,
        "init" => report.init_blocks += 1,
        "after" => report.after_blocks += 1,
        _ => report.other_named_blocks += 1,
    }
}

/// Reads `@name` or `@scope::name` at `at`, returning the final name part
/// and the offset of the following `{` if one is present.
fn named_action_at(text: &str, at: usize) -> (String, Option<usize>) {
    let rest = &text[at + 1..];
    let mut name = String::new();
    let mut consumed = 0;
    for part in rest.splitn(2, "::") {
        let ident: String = part
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if ident.is_empty() {
            break;
        }
        consumed = rest.find(&ident).map_or(consumed, |p| p + ident.len());
        name = ident;
        if !rest[consumed..].starts_with("::") {
            break;
        }
    }
    if name.is_empty() {
        return (name, None);
    }
    let after = &text[at + 1 + consumed..];
    let trimmed = after.trim_start();
    if trimmed.starts_with('{') {
        let brace = at + 1 + consumed + (after.len() - trimmed.len());
        (name, Some(brace))
    } else {
        (name, None)
    }
}

/// Returns the offset just past the matching `}` for the `{` at `open`,
/// honoring quotes and comments. Unterminated blocks run to end of input.
fn block_end(text: &str, open: usize) -> usize {
    debug_assert_eq!(text.as_bytes()[open], b'{');
    let mut depth = 0usize;
    let bytes = text.as_bytes();
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'\'' => i = skip_quoted(text, i, b'\''),
            b'"' => i = skip_quoted(text, i, b'"'),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line_comment(text, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(text, i),
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_line_comment(text: &str, at: usize) -> usize {
    text[at..]
        .find('\n')
        .map_or(text.len(), |p| at + p + 1)
}

fn skip_block_comment(text: &str, at: usize) -> usize {
    text[at + 2..]
        .find("*/")
        .map_or(text.len(), |p| at + 2 + p + 2)
}

fn skip_quoted(text: &str, at: usize, quote: u8) -> usize {
    let bytes = text.as_bytes();
    let mut i = at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i, // unterminated; don't swallow the line
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_char_set(text: &str, at: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b']' => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn guess_language(bodies: &str) -> Option<String> {
    if bodies.trim().is_empty() {
        return None;
    }
    let hint = if bodies.contains("System.out") || bodies.contains("import java") {
        "java"
    } else if bodies.contains("#include") || bodies.contains("std::") {
        "cpp"
    } else if bodies.contains("self.") || bodies.contains("def ") {
        "python"
    } else if bodies.contains("console.log") || bodies.contains("function ") {
        "javascript"
    } else {
        return None;
    };
    Some(hint.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_grammar_has_nothing() {
        let report = scan("grammar T; a : 'x' | B ; B : [b]+ ;");
        assert!(!report.has_actions);
        assert!(!report.has_predicates);
        assert_eq!(report.language_hint, None);
    }

    #[test]
    fn counts_named_blocks() {
        let report = scan(
            "grammar T;\n@header { package p; }\n@members { int x; }\n@init {x=0;}\na : 'x' ;",
        );
        assert_eq!(report.header_blocks, 1);
        assert_eq!(report.members_blocks, 1);
        assert_eq!(report.init_blocks, 1);
        assert!(report.has_actions);
    }

    #[test]
    fn distinguishes_predicates_from_actions() {
        let report = scan("grammar T; a : {ok()}? b {go();} ;");
        assert_eq!(report.predicates, 1);
        assert_eq!(report.inline_actions, 1);
        assert!(report.has_predicates);
    }

    #[test]
    fn braces_in_literals_do_not_count() {
        let report = scan("grammar T; a : '{' b '}' ; B : [{}] ;");
        assert_eq!(report.inline_actions, 0);
        assert!(!report.has_actions);
    }

    #[test]
    fn nested_braces_are_one_action() {
        let report = scan("grammar T; a : { if (x) { y(); } } b ;");
        assert_eq!(report.inline_actions, 1);
    }

    #[test]
    fn language_hint_java() {
        let report = scan("@members { System.out.println(\"hi\"); }");
        assert_eq!(report.language_hint.as_deref(), Some("java"));
    }

    #[test]
    fn qualified_named_action() {
        let report = scan("@parser::members { int i; }");
        assert_eq!(report.members_blocks, 1);
    }

    #[test]
    fn comment_braces_ignored() {
        let report = scan("grammar T; // { not an action }\na : 'x' ;");
        assert_eq!(report.inline_actions, 0);
    }
}
