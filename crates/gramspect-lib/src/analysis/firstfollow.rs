//! FIRST/FOLLOW sets over parser rules.
//!
//! Standard fixpoint iteration with an auxiliary nullable bit. Sets are
//! over token types; EOF is `-1`.

use gramspect_atn::IntervalSet;
use gramspect_syntax::TOKEN_EOF;
use gramspect_syntax::model::{Element, GrammarSource};
use indexmap::IndexMap;

/// FIRST, FOLLOW, and nullable per parser rule.
#[derive(Debug, Clone, Default)]
pub struct FirstFollow {
    pub nullable: IndexMap<String, bool>,
    pub first: IndexMap<String, IntervalSet>,
    pub follow: IndexMap<String, IntervalSet>,
}

pub fn first_follow(grammar: &GrammarSource) -> FirstFollow {
    let mut ff = FirstFollow::default();
    for rule in grammar.parser_rules() {
        ff.nullable.insert(rule.name.clone(), false);
        ff.first.insert(rule.name.clone(), IntervalSet::new());
        ff.follow.insert(rule.name.clone(), IntervalSet::new());
    }

    // FIRST + nullable fixpoint.
    loop {
        let mut changed = false;
        for rule in grammar.parser_rules() {
            let mut first = IntervalSet::new();
            let mut nullable = false;
            for alt in &rule.alternatives {
                let (alt_first, alt_nullable) = seq_first(&alt.elements, grammar, &ff);
                first.union(&alt_first);
                nullable |= alt_nullable;
            }
            changed |= merge_set(ff.first.get_mut(&rule.name).expect("init"), &first);
            let entry = ff.nullable.get_mut(&rule.name).expect("init");
            if nullable && !*entry {
                *entry = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // FOLLOW fixpoint. EOF follows the start rule.
    if let Some(start) = grammar.default_start_rule() {
        if let Some(set) = ff.follow.get_mut(start) {
            set.add_value(TOKEN_EOF);
        }
    }
    loop {
        let mut changed = false;
        for rule in grammar.parser_rules() {
            let owner_follow = ff.follow.get(&rule.name).cloned().unwrap_or_default();
            for alt in &rule.alternatives {
                changed |= apply_seq(
                    &alt.elements,
                    &owner_follow,
                    &IntervalSet::new(),
                    true,
                    grammar,
                    &mut ff,
                );
            }
        }
        if !changed {
            break;
        }
    }

    ff
}

/// FIRST of a sequence plus whether the whole sequence is nullable.
fn seq_first(
    elements: &[Element],
    grammar: &GrammarSource,
    ff: &FirstFollow,
) -> (IntervalSet, bool) {
    let mut out = IntervalSet::new();
    for element in elements {
        let (first, nullable) = element_first(element, grammar, ff);
        out.union(&first);
        if !nullable {
            return (out, false);
        }
    }
    (out, true)
}

fn element_first(
    element: &Element,
    grammar: &GrammarSource,
    ff: &FirstFollow,
) -> (IntervalSet, bool) {
    match element {
        Element::Literal { text, .. } => (
            grammar
                .vocabulary
                .type_of_literal(text)
                .map(IntervalSet::of)
                .unwrap_or_default(),
            false,
        ),
        Element::TokenRef { name, .. } => {
            if name == "EOF" {
                return (IntervalSet::of(TOKEN_EOF), false);
            }
            (
                grammar
                    .vocabulary
                    .type_of_name(name)
                    .map(IntervalSet::of)
                    .unwrap_or_default(),
                false,
            )
        }
        Element::RuleRef { name, .. } => (
            ff.first.get(name).cloned().unwrap_or_default(),
            ff.nullable.get(name).copied().unwrap_or(false),
        ),
        Element::Wildcard { .. } => (token_universe(grammar), false),
        Element::Not { inner, .. } => {
            let (inner_first, _) = element_first(inner, grammar, ff);
            (complement(&token_universe(grammar), &inner_first), false)
        }
        Element::Block { alternatives, .. } => {
            let mut out = IntervalSet::new();
            let mut nullable = false;
            for alt in alternatives {
                let (first, alt_nullable) = seq_first(&alt.elements, grammar, ff);
                out.union(&first);
                nullable |= alt_nullable;
            }
            (out, nullable)
        }
        Element::Optional { inner, .. } | Element::Star { inner, .. } => {
            let (first, _) = element_first(inner, grammar, ff);
            (first, true)
        }
        Element::Plus { inner, .. } | Element::Labeled { inner, .. } => {
            element_first(inner, grammar, ff)
        }
        Element::Predicate { .. } | Element::Action { .. } => (IntervalSet::new(), true),
        // Char classes and ranges are lexer-only; they contribute nothing
        // to parser-rule sets.
        Element::CharClass { .. } | Element::Range { .. } => (IntervalSet::new(), false),
    }
}

/// Feeds FOLLOW contributions for every rule reference inside a
/// sequence. `cont` is FIRST of what comes after the whole sequence;
/// `inherits` marks that the owner's FOLLOW applies when everything
/// after a reference is nullable.
fn apply_seq(
    elements: &[Element],
    owner_follow: &IntervalSet,
    cont: &IntervalSet,
    inherits: bool,
    grammar: &GrammarSource,
    ff: &mut FirstFollow,
) -> bool {
    let mut changed = false;
    for (i, element) in elements.iter().enumerate() {
        let (rest_first, rest_nullable) = seq_first(&elements[i + 1..], grammar, ff);
        let mut local_cont = rest_first;
        let local_inherits = if rest_nullable {
            local_cont.union(cont);
            inherits
        } else {
            false
        };
        changed |= apply_element(
            element,
            owner_follow,
            &local_cont,
            local_inherits,
            grammar,
            ff,
        );
    }
    changed
}

fn apply_element(
    element: &Element,
    owner_follow: &IntervalSet,
    cont: &IntervalSet,
    inherits: bool,
    grammar: &GrammarSource,
    ff: &mut FirstFollow,
) -> bool {
    match element {
        Element::RuleRef { name, .. } => {
            let Some(set) = ff.follow.get_mut(name) else {
                return false;
            };
            let mut addition = cont.clone();
            if inherits {
                addition.union(owner_follow);
            }
            merge_set(set, &addition)
        }
        Element::Block { alternatives, .. } => {
            let mut changed = false;
            for alt in alternatives {
                changed |= apply_seq(&alt.elements, owner_follow, cont, inherits, grammar, ff);
            }
            changed
        }
        Element::Optional { inner, .. } => {
            apply_element(inner, owner_follow, cont, inherits, grammar, ff)
        }
        Element::Star { inner, .. } | Element::Plus { inner, .. } => {
            // The loop body can be followed by another iteration.
            let (inner_first, _) = element_first(inner, grammar, ff);
            let mut looped = cont.clone();
            looped.union(&inner_first);
            apply_element(inner, owner_follow, &looped, inherits, grammar, ff)
        }
        Element::Labeled { inner, .. } | Element::Not { inner, .. } => {
            apply_element(inner, owner_follow, cont, inherits, grammar, ff)
        }
        _ => false,
    }
}

/// All real token types of the grammar.
pub fn token_universe(grammar: &GrammarSource) -> IntervalSet {
    let max = grammar.vocabulary.max_type();
    if max < 1 {
        IntervalSet::new()
    } else {
        IntervalSet::range(1, max)
    }
}

/// `universe \ set`.
pub fn complement(universe: &IntervalSet, set: &IntervalSet) -> IntervalSet {
    universe.values().filter(|v| !set.contains(*v)).collect()
}

/// Unions `addition` into `target`, reporting whether it grew.
fn merge_set(target: &mut IntervalSet, addition: &IntervalSet) -> bool {
    let before = target.len();
    target.union(addition);
    target.len() != before
}

#[cfg(test)]
mod tests {
    use gramspect_syntax::parse_grammar;
    use indoc::indoc;

    use super::*;

    fn ff_for(source: &str) -> (GrammarSource, FirstFollow) {
        let (grammar, diags) = parse_grammar(source);
        assert!(!diags.has_errors(), "{}", diags.printer().render());
        let ff = first_follow(&grammar);
        (grammar, ff)
    }

    fn names(grammar: &GrammarSource, set: &IntervalSet) -> Vec<String> {
        set.values()
            .map(|t| grammar.vocabulary.display_name(t))
            .collect()
    }

    #[test]
    fn simple_first_sets() {
        let (grammar, ff) = ff_for(indoc! {r"
            grammar T;
            s : a B ;
            a : A | ;
            A : 'a' ;
            B : 'b' ;
        "});
        // FIRST(s) includes both A (via a) and B (a is nullable).
        assert_eq!(names(&grammar, &ff.first["s"]), vec!["A", "B"]);
        assert_eq!(names(&grammar, &ff.first["a"]), vec!["A"]);
        assert!(ff.nullable["a"]);
        assert!(!ff.nullable["s"]);
    }

    #[test]
    fn follow_propagates_continuations() {
        let (grammar, ff) = ff_for(indoc! {r"
            grammar T;
            s : a B ;
            a : A ;
            A : 'a' ;
            B : 'b' ;
        "});
        assert_eq!(names(&grammar, &ff.follow["a"]), vec!["B"]);
        assert_eq!(names(&grammar, &ff.follow["s"]), vec!["EOF"]);
    }

    #[test]
    fn follow_inherits_through_nullable_tail() {
        let (grammar, ff) = ff_for(indoc! {r"
            grammar T;
            s : a b? C ;
            a : A ;
            b : B ;
            A : 'a' ;
            B : 'b' ;
            C : 'c' ;
        "});
        // After a: b (optional) or C.
        assert_eq!(names(&grammar, &ff.follow["a"]), vec!["B", "C"]);
        assert_eq!(names(&grammar, &ff.follow["b"]), vec!["C"]);
    }

    #[test]
    fn recursive_rule_first_terminates() {
        let (grammar, ff) = ff_for(indoc! {r"
            grammar T;
            list : '(' list ')' | ITEM ;
            ITEM : 'i' ;
        "});
        let first = names(&grammar, &ff.first["list"]);
        assert!(first.contains(&"ITEM".to_owned()));
        assert!(first.contains(&"'('".to_owned()));
        // FOLLOW includes ')' from the recursive call and EOF at the start.
        let follow = names(&grammar, &ff.follow["list"]);
        assert!(follow.contains(&"')'".to_owned()));
        assert!(follow.contains(&"EOF".to_owned()));
    }

    #[test]
    fn star_loop_feeds_its_own_first_into_follow() {
        let (grammar, ff) = ff_for(indoc! {r"
            grammar T;
            s : item* END ;
            item : A ;
            A : 'a' ;
            END : 'e' ;
        "});
        let follow = names(&grammar, &ff.follow["item"]);
        assert!(follow.contains(&"A".to_owned()));
        assert!(follow.contains(&"END".to_owned()));
    }
}
