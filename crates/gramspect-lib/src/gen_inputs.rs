//! Deterministic sample-input generation.
//!
//! Walks rule derivations without randomness: the variant counter steers
//! alternative and optional choices, so successive variants explore
//! different branches while staying reproducible. Depth limits force
//! termination on recursive rules by falling back to an alternative free
//! of parser-rule references.

use gramspect_core::reports::RuleKind;
use gramspect_syntax::model::{Alternative, Element, GrammarSource, Rule};

/// Maximum rule-derivation nesting before forcing a terminal alternative.
const MAX_DEPTH: usize = 10;
/// Variants tried per requested input (duplicates are discarded).
const OVERSAMPLE: usize = 4;

/// Generates up to `max_count` distinct sample inputs for `rule`.
pub fn generate_inputs(grammar: &GrammarSource, rule: &str, max_count: usize) -> Vec<String> {
    let Some(rule) = grammar.rule(rule) else {
        return Vec::new();
    };
    let mut outputs: Vec<String> = Vec::new();
    for seed in 0..max_count.saturating_mul(OVERSAMPLE) {
        if outputs.len() >= max_count {
            break;
        }
        let Some(tokens) = derive_rule(grammar, rule, seed, 0) else {
            continue;
        };
        let text = tokens.join(" ");
        if !outputs.contains(&text) {
            outputs.push(text);
        }
    }
    outputs
}

fn derive_rule(
    grammar: &GrammarSource,
    rule: &Rule,
    seed: usize,
    depth: usize,
) -> Option<Vec<String>> {
    if rule.kind != RuleKind::Parser {
        return derive_token_text(grammar, rule, depth).map(|t| vec![t]);
    }
    let alts = &rule.alternatives;
    if alts.is_empty() {
        return Some(Vec::new());
    }
    let alt = if depth >= MAX_DEPTH {
        // Force termination: take an alternative without rule references.
        alts.iter().find(|a| !alt_has_rule_refs(a))?
    } else {
        &alts[seed % alts.len()]
    };
    derive_seq(grammar, &alt.elements, seed / alts.len().max(1), depth)
}

fn derive_seq(
    grammar: &GrammarSource,
    elements: &[Element],
    seed: usize,
    depth: usize,
) -> Option<Vec<String>> {
    let mut out = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        out.extend(derive_element(grammar, element, seed.wrapping_add(i), depth)?);
    }
    Some(out)
}

fn derive_element(
    grammar: &GrammarSource,
    element: &Element,
    seed: usize,
    depth: usize,
) -> Option<Vec<String>> {
    match element {
        Element::Literal { text, .. } => Some(vec![text.clone()]),
        Element::TokenRef { name, .. } => {
            if name == "EOF" {
                return Some(Vec::new());
            }
            let rule = grammar.rule(name)?;
            derive_token_text(grammar, rule, depth).map(|t| vec![t])
        }
        Element::RuleRef { name, .. } => {
            let rule = grammar.rule(name)?;
            derive_rule(grammar, rule, seed, depth + 1)
        }
        Element::Block { alternatives, .. } => {
            if alternatives.is_empty() {
                return Some(Vec::new());
            }
            let alt = &alternatives[seed % alternatives.len()];
            derive_seq(grammar, &alt.elements, seed / alternatives.len(), depth)
        }
        Element::Optional { inner, .. } => {
            if seed & 1 == 0 {
                Some(Vec::new())
            } else {
                derive_element(grammar, inner, seed >> 1, depth)
            }
        }
        Element::Star { inner, .. } => {
            if seed & 1 == 0 {
                Some(Vec::new())
            } else {
                derive_element(grammar, inner, seed >> 1, depth)
            }
        }
        Element::Plus { inner, .. } => derive_element(grammar, inner, seed >> 1, depth),
        Element::Labeled { inner, .. } => derive_element(grammar, inner, seed, depth),
        Element::Predicate { .. } | Element::Action { .. } => Some(Vec::new()),
        Element::Wildcard { .. } => {
            // Any token: take the first lexer rule's representative.
            let rule = grammar.lexer_rules().find(|r| r.kind == RuleKind::Lexer)?;
            derive_token_text(grammar, rule, depth).map(|t| vec![t])
        }
        Element::Not { .. } | Element::CharClass { .. } | Element::Range { .. } => None,
    }
}

/// Shortest representative text matched by a lexer rule.
fn derive_token_text(grammar: &GrammarSource, rule: &Rule, depth: usize) -> Option<String> {
    if depth >= MAX_DEPTH {
        return None;
    }
    let alt = rule.alternatives.first()?;
    let mut out = String::new();
    if !derive_chars(grammar, &alt.elements, depth, &mut out) {
        return None;
    }
    (!out.is_empty()).then_some(out)
}

fn derive_chars(
    grammar: &GrammarSource,
    elements: &[Element],
    depth: usize,
    out: &mut String,
) -> bool {
    for element in elements {
        if !derive_char_element(grammar, element, depth, out) {
            return false;
        }
    }
    true
}

fn derive_char_element(
    grammar: &GrammarSource,
    element: &Element,
    depth: usize,
    out: &mut String,
) -> bool {
    match element {
        Element::Literal { text, .. } => {
            out.push_str(text);
            true
        }
        Element::CharClass { set, .. } => match set.ranges.first() {
            Some(&(lo, _)) => {
                out.push(lo);
                true
            }
            None => false,
        },
        Element::Range { from, .. } => {
            out.push(*from);
            true
        }
        Element::TokenRef { name, .. } => match grammar.rule(name) {
            Some(rule) => match derive_token_text(grammar, rule, depth + 1) {
                Some(text) => {
                    out.push_str(&text);
                    true
                }
                None => false,
            },
            None => false,
        },
        Element::Not { inner, .. } => {
            // First printable character the complement accepts.
            let excluded = |c: char| match inner.as_ref() {
                Element::CharClass { set, .. } => set.contains(c),
                Element::Literal { text, .. } => text.chars().next() == Some(c),
                _ => false,
            };
            for candidate in ('a'..='z').chain('0'..='9').chain([' ', '.']) {
                if !excluded(candidate) {
                    out.push(candidate);
                    return true;
                }
            }
            false
        }
        Element::Wildcard { .. } => {
            out.push('x');
            true
        }
        Element::Block { alternatives, .. } => match alternatives.first() {
            Some(alt) => derive_chars(grammar, &alt.elements, depth, out),
            None => true,
        },
        Element::Optional { .. } | Element::Star { .. } => true,
        Element::Plus { inner, .. } | Element::Labeled { inner, .. } => {
            derive_char_element(grammar, inner, depth, out)
        }
        Element::Predicate { .. } | Element::Action { .. } => true,
        Element::RuleRef { .. } => false,
    }
}

fn alt_has_rule_refs(alt: &Alternative) -> bool {
    alt.elements.iter().any(element_has_rule_refs)
}

fn element_has_rule_refs(element: &Element) -> bool {
    match element {
        Element::RuleRef { .. } => true,
        Element::Block { alternatives, .. } => alternatives.iter().any(alt_has_rule_refs),
        Element::Optional { inner, .. }
        | Element::Star { inner, .. }
        | Element::Plus { inner, .. }
        | Element::Not { inner, .. }
        | Element::Labeled { inner, .. } => element_has_rule_refs(inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use gramspect_syntax::parse_grammar;
    use indoc::indoc;

    use super::*;

    fn inputs_for(source: &str, rule: &str, count: usize) -> Vec<String> {
        let (grammar, diags) = parse_grammar(source);
        assert!(!diags.has_errors(), "{}", diags.printer().render());
        generate_inputs(&grammar, rule, count)
    }

    const CALC: &str = indoc! {r"
        grammar Calc;
        expr : expr ('*'|'/') expr | expr ('+'|'-') expr | INT | '(' expr ')' ;
        INT : [0-9]+ ;
        WS : [ \t\r\n]+ -> skip ;
    "};

    #[test]
    fn generates_distinct_inputs() {
        let inputs = inputs_for(CALC, "expr", 4);
        assert!(!inputs.is_empty());
        let mut unique = inputs.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), inputs.len());
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(inputs_for(CALC, "expr", 5), inputs_for(CALC, "expr", 5));
    }

    #[test]
    fn representative_token_texts() {
        let inputs = inputs_for(
            "grammar T; s : INT ID ; INT : [0-9]+ ; ID : [a-z]+ ;",
            "s",
            1,
        );
        assert_eq!(inputs, vec!["0 a"]);
    }

    #[test]
    fn unknown_rule_yields_nothing() {
        assert!(inputs_for(CALC, "nope", 3).is_empty());
    }

    #[test]
    fn literal_keywords_survive_verbatim() {
        let inputs = inputs_for(
            "grammar T; s : 'if' COND 'then' ; COND : [a-z]+ ;",
            "s",
            1,
        );
        assert_eq!(inputs, vec!["if a then"]);
    }
}
