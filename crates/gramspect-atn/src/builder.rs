//! ATN construction from the grammar model.
//!
//! Every element compiles to a fragment with single entry and exit
//! states; combinators wire fragments together. Decision states are
//! emitted for multi-alternative blocks and for `? * +` loops, with the
//! invariant that a decision's alternative count equals its outgoing
//! epsilon-kind transitions.

use gramspect_core::reports::RuleKind;
use gramspect_syntax::TOKEN_EOF;
use gramspect_syntax::diagnostics::Diagnostics;
use gramspect_syntax::model::{Alternative, Element, GrammarSource, LexerCommand, Rule};
use rowan::TextRange;

use crate::atn::{
    Atn, AtnState, AtnStateKind, DecisionId, DecisionInfo, LeftRecursion, NO_RULE,
    ResolvedCommand, RuleId, RuleInfo, StateId, Transition,
};
use crate::interval::IntervalSet;

/// A sub-graph with single entry and exit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frag {
    entry: StateId,
    exit: StateId,
}

/// Builds the ATN for a resolved grammar. Structural problems that only
/// surface during construction (complement of a non-set element, char set
/// in a parser rule) are reported as diagnostics.
pub fn build(grammar: &GrammarSource) -> (Atn, Diagnostics) {
    let mut builder = Builder {
        grammar,
        atn: Atn::default(),
        diags: Diagnostics::new(),
        pred_index: 0,
        action_index: 0,
    };
    builder.build_all();
    (builder.atn, builder.diags)
}

struct Builder<'g> {
    grammar: &'g GrammarSource,
    atn: Atn,
    diags: Diagnostics,
    pred_index: u32,
    action_index: u32,
}

impl<'g> Builder<'g> {
    fn build_all(&mut self) {
        let grammar = self.grammar;
        self.atn.grammar_rule_count = grammar.rules.len();

        // Pass 1: rule entry pairs, so rule references can resolve forward.
        for (index, rule) in grammar.rules.values().enumerate() {
            let id = index as RuleId;
            let start = self.add_state(AtnStateKind::RuleStart, id);
            let stop = self.add_state(AtnStateKind::RuleStop, id);
            let token_type = (rule.kind == RuleKind::Lexer)
                .then(|| grammar.vocabulary.type_of_name(&rule.name))
                .flatten();
            let commands = rule
                .alternatives
                .iter()
                .map(|alt| self.resolve_commands(alt))
                .collect();
            self.atn.rules.push(RuleInfo {
                id,
                name: rule.name.clone(),
                start,
                stop,
                is_lexer: rule.kind != RuleKind::Parser,
                is_fragment: rule.kind == RuleKind::Fragment,
                token_type,
                commands,
                mode: rule.mode,
                is_implicit: false,
            });
        }
        for (text, token_type) in &grammar.implicit_literals {
            let id = self.atn.rules.len() as RuleId;
            let start = self.add_state(AtnStateKind::RuleStart, id);
            let stop = self.add_state(AtnStateKind::RuleStop, id);
            self.atn.rules.push(RuleInfo {
                id,
                name: format!("'{text}'"),
                start,
                stop,
                is_lexer: true,
                is_fragment: false,
                token_type: Some(*token_type),
                commands: vec![Vec::new()],
                mode: 0,
                is_implicit: true,
            });
        }
        self.atn.left_recursion = vec![None; self.atn.rules.len()];

        // Pass 2: rule bodies.
        for (index, rule) in grammar.rules.values().enumerate() {
            self.build_rule(index as RuleId, rule);
        }
        for (index, (text, _)) in grammar.implicit_literals.iter().enumerate() {
            let id = (grammar.rules.len() + index) as RuleId;
            let frag = self.literal_chars_frag(id, text);
            let (start, stop) = self.entry_pair(id);
            self.connect_eps(start, frag.entry);
            self.connect_eps(frag.exit, stop);
        }

        self.build_mode_starts();
    }

    fn entry_pair(&self, rule: RuleId) -> (StateId, StateId) {
        let info = &self.atn.rules[rule as usize];
        (info.start, info.stop)
    }

    fn resolve_commands(&mut self, alt: &Alternative) -> Vec<ResolvedCommand> {
        let mut resolved = Vec::with_capacity(alt.commands.len());
        for command in &alt.commands {
            match command {
                LexerCommand::Skip => resolved.push(ResolvedCommand::Skip),
                LexerCommand::More => resolved.push(ResolvedCommand::More),
                LexerCommand::PopMode => resolved.push(ResolvedCommand::PopMode),
                LexerCommand::Channel(name) => match self.grammar.channel_id(name) {
                    Some(id) => resolved.push(ResolvedCommand::Channel(id)),
                    None => self.command_error(&format!("unknown channel '{name}'")),
                },
                LexerCommand::Type(name) => {
                    match self.grammar.vocabulary.type_of_name(name) {
                        Some(t) => resolved.push(ResolvedCommand::Type(t)),
                        None => self.command_error(&format!("unknown token type '{name}'")),
                    }
                }
                LexerCommand::Mode(name) => match self.grammar.mode_id(name) {
                    Some(id) => resolved.push(ResolvedCommand::Mode(id)),
                    None => self.command_error(&format!("unknown mode '{name}'")),
                },
                LexerCommand::PushMode(name) => match self.grammar.mode_id(name) {
                    Some(id) => resolved.push(ResolvedCommand::PushMode(id)),
                    None => self.command_error(&format!("unknown mode '{name}'")),
                },
            }
        }
        resolved
    }

    fn command_error(&mut self, message: &str) {
        self.diags
            .error(message.to_owned(), TextRange::empty(0.into()))
            .emit();
    }

    fn build_rule(&mut self, id: RuleId, rule: &Rule) {
        let (start, stop) = self.entry_pair(id);
        let is_lexer = rule.kind != RuleKind::Parser;

        if !is_lexer {
            if let Some(plan) = plan_left_recursion(&rule.name, &rule.alternatives) {
                if plan.primary.is_empty() {
                    self.diags
                        .error(
                            format!(
                                "rule '{}' is left-recursive with no primary alternative",
                                rule.name
                            ),
                            rule.span,
                        )
                        .emit();
                    // Degenerate; emit an empty body so the ATN stays valid.
                    self.connect_eps(start, stop);
                    return;
                }
                self.build_left_recursive(id, rule, plan);
                return;
            }
        }

        let frag = self.build_alt_list(id, is_lexer, &rule.alternatives);
        self.connect_eps(start, frag.entry);
        self.connect_eps(frag.exit, stop);
    }

    // =====================================================================
    // Fragment combinators
    // =====================================================================

    fn add_state(&mut self, kind: AtnStateKind, rule: RuleId) -> StateId {
        let id = self.atn.states.len() as StateId;
        self.atn.states.push(AtnState {
            id,
            kind,
            rule,
            transitions: Vec::new(),
            decision: None,
        });
        id
    }

    fn connect_eps(&mut self, from: StateId, to: StateId) {
        self.atn.states[from as usize]
            .transitions
            .push(Transition::Epsilon { target: to });
    }

    fn push_transition(&mut self, from: StateId, transition: Transition) {
        self.atn.states[from as usize].transitions.push(transition);
    }

    fn add_decision(&mut self, state: StateId) -> DecisionId {
        let id = self.atn.decisions.len() as DecisionId;
        let rule = self.atn.states[state as usize].rule;
        self.atn.decisions.push(DecisionInfo { id, state, rule });
        self.atn.states[state as usize].decision = Some(id);
        id
    }

    /// Single consuming transition between two fresh basic states.
    fn transition_frag(&mut self, rule: RuleId, make: impl FnOnce(StateId) -> Transition) -> Frag {
        let entry = self.add_state(AtnStateKind::Basic, rule);
        let exit = self.add_state(AtnStateKind::Basic, rule);
        let transition = make(exit);
        self.push_transition(entry, transition);
        Frag { entry, exit }
    }

    fn epsilon_frag(&mut self, rule: RuleId) -> Frag {
        let state = self.add_state(AtnStateKind::Basic, rule);
        Frag {
            entry: state,
            exit: state,
        }
    }

    fn build_alt_list(&mut self, rule: RuleId, is_lexer: bool, alts: &[Alternative]) -> Frag {
        match alts.len() {
            0 => self.epsilon_frag(rule),
            1 => self.build_alternative(rule, is_lexer, &alts[0]),
            _ => {
                let start = self.add_state(AtnStateKind::BlockStart, rule);
                let end = self.add_state(AtnStateKind::BlockEnd, rule);
                self.add_decision(start);
                for alt in alts {
                    let frag = self.build_alternative(rule, is_lexer, alt);
                    self.connect_eps(start, frag.entry);
                    self.connect_eps(frag.exit, end);
                }
                Frag { entry: start, exit: end }
            }
        }
    }

    fn build_alternative(&mut self, rule: RuleId, is_lexer: bool, alt: &Alternative) -> Frag {
        let mut frags: Vec<Frag> = Vec::with_capacity(alt.elements.len());
        for element in &alt.elements {
            if let Some(frag) = self.build_element(rule, is_lexer, element) {
                frags.push(frag);
            }
        }
        self.sequence(rule, &frags)
    }

    fn sequence(&mut self, rule: RuleId, frags: &[Frag]) -> Frag {
        match frags.len() {
            0 => self.epsilon_frag(rule),
            1 => frags[0],
            _ => {
                for window in frags.windows(2) {
                    self.connect_eps(window[0].exit, window[1].entry);
                }
                Frag {
                    entry: frags[0].entry,
                    exit: frags[frags.len() - 1].exit,
                }
            }
        }
    }

    fn build_element(&mut self, rule: RuleId, is_lexer: bool, element: &Element) -> Option<Frag> {
        match element {
            Element::Literal { text, span } => {
                if is_lexer {
                    Some(self.literal_chars_frag(rule, text))
                } else {
                    match self.grammar.vocabulary.type_of_literal(text) {
                        Some(t) => Some(self.transition_frag(rule, |target| Transition::Atom {
                            label: t,
                            target,
                        })),
                        None => {
                            self.diags
                                .error(format!("literal '{text}' has no token type"), *span)
                                .emit();
                            None
                        }
                    }
                }
            }
            Element::TokenRef { name, span } => {
                if name == "EOF" {
                    return Some(self.transition_frag(rule, |target| Transition::Atom {
                        label: TOKEN_EOF,
                        target,
                    }));
                }
                if is_lexer {
                    match self.grammar.rule_index(name) {
                        Some(target) => Some(self.rule_call_frag(rule, target as RuleId, 0)),
                        None => {
                            self.diags
                                .error(
                                    format!("token '{name}' has no lexer rule to invoke"),
                                    *span,
                                )
                                .emit();
                            None
                        }
                    }
                } else {
                    let t = self.grammar.vocabulary.type_of_name(name)?;
                    Some(self.transition_frag(rule, |target| Transition::Atom {
                        label: t,
                        target,
                    }))
                }
            }
            Element::RuleRef { name, .. } => {
                let target = self.grammar.rule_index(name)? as RuleId;
                Some(self.rule_call_frag(rule, target, 0))
            }
            Element::CharClass { set, span } => {
                if !is_lexer {
                    self.diags
                        .error("character sets are only valid in lexer rules", *span)
                        .emit();
                    return None;
                }
                let intervals = char_class_to_intervals(set);
                Some(self.transition_frag(rule, |target| Transition::Set {
                    set: intervals,
                    target,
                }))
            }
            Element::Range { from, to, span } => {
                if !is_lexer {
                    self.diags
                        .error("character ranges are only valid in lexer rules", *span)
                        .emit();
                    return None;
                }
                let (from, to) = (*from as i32, *to as i32);
                Some(self.transition_frag(rule, |target| Transition::Range { from, to, target }))
            }
            Element::Wildcard { .. } => {
                Some(self.transition_frag(rule, |target| Transition::Wildcard { target }))
            }
            Element::Block { alternatives, .. } => {
                Some(self.build_alt_list(rule, is_lexer, alternatives))
            }
            Element::Optional { inner, greedy } => {
                let frag = self.build_element(rule, is_lexer, inner)?;
                let start = self.add_state(AtnStateKind::BlockStart, rule);
                let end = self.add_state(AtnStateKind::BlockEnd, rule);
                self.add_decision(start);
                if *greedy {
                    self.connect_eps(start, frag.entry);
                    self.connect_eps(start, end);
                } else {
                    self.connect_eps(start, end);
                    self.connect_eps(start, frag.entry);
                }
                self.connect_eps(frag.exit, end);
                Some(Frag { entry: start, exit: end })
            }
            Element::Star { inner, greedy } => {
                let frag = self.build_element(rule, is_lexer, inner)?;
                let entry = self.add_state(AtnStateKind::StarLoopEntry, rule);
                let loop_back = self.add_state(AtnStateKind::StarLoopBack, rule);
                let end = self.add_state(AtnStateKind::LoopEnd, rule);
                self.add_decision(entry);
                if *greedy {
                    self.connect_eps(entry, frag.entry);
                    self.connect_eps(entry, end);
                } else {
                    self.connect_eps(entry, end);
                    self.connect_eps(entry, frag.entry);
                }
                self.connect_eps(frag.exit, loop_back);
                self.connect_eps(loop_back, entry);
                Some(Frag { entry, exit: end })
            }
            Element::Plus { inner, greedy } => {
                let frag = self.build_element(rule, is_lexer, inner)?;
                let block = self.add_state(AtnStateKind::PlusBlockStart, rule);
                let loop_back = self.add_state(AtnStateKind::PlusLoopBack, rule);
                let end = self.add_state(AtnStateKind::LoopEnd, rule);
                self.add_decision(loop_back);
                self.connect_eps(block, frag.entry);
                self.connect_eps(frag.exit, loop_back);
                if *greedy {
                    self.connect_eps(loop_back, block);
                    self.connect_eps(loop_back, end);
                } else {
                    self.connect_eps(loop_back, end);
                    self.connect_eps(loop_back, block);
                }
                Some(Frag { entry: block, exit: end })
            }
            Element::Not { inner, span } => match self.element_symbol_set(is_lexer, inner) {
                Some(set) => Some(self.transition_frag(rule, |target| Transition::NotSet {
                    set,
                    target,
                })),
                None => {
                    self.diags
                        .error("'~' needs a set, literal, or token reference", *span)
                        .emit();
                    self.build_element(rule, is_lexer, inner)
                }
            },
            Element::Predicate { .. } => {
                let index = self.pred_index;
                self.pred_index += 1;
                Some(self.transition_frag(rule, |target| Transition::Predicate {
                    rule,
                    pred_index: index,
                    is_ctx_dependent: false,
                    target,
                }))
            }
            Element::Action { .. } => {
                let index = self.action_index;
                self.action_index += 1;
                Some(self.transition_frag(rule, |target| Transition::Action {
                    rule,
                    action_index: index,
                    is_ctx_dependent: false,
                    target,
                }))
            }
            Element::Labeled { inner, .. } => self.build_element(rule, is_lexer, inner),
        }
    }

    /// A literal in a lexer rule matches its characters in sequence.
    fn literal_chars_frag(&mut self, rule: RuleId, text: &str) -> Frag {
        let frags: Vec<Frag> = text
            .chars()
            .map(|c| {
                self.transition_frag(rule, |target| Transition::Atom {
                    label: c as i32,
                    target,
                })
            })
            .collect();
        self.sequence(rule, &frags)
    }

    fn rule_call_frag(&mut self, rule: RuleId, target_rule: RuleId, precedence: u32) -> Frag {
        let entry = self.add_state(AtnStateKind::Basic, rule);
        let follow = self.add_state(AtnStateKind::Basic, rule);
        let target = self.atn.rules[target_rule as usize].start;
        self.push_transition(
            entry,
            Transition::Rule {
                rule: target_rule,
                target,
                follow,
                precedence,
            },
        );
        Frag {
            entry,
            exit: follow,
        }
    }

    /// The symbol set an element denotes, for `~` complements and set
    /// unions. `None` when the element is not set-shaped.
    fn element_symbol_set(&self, is_lexer: bool, element: &Element) -> Option<IntervalSet> {
        match element {
            Element::CharClass { set, .. } if is_lexer => Some(char_class_to_intervals(set)),
            Element::Range { from, to, .. } if is_lexer => {
                Some(IntervalSet::range(*from as i32, *to as i32))
            }
            Element::Literal { text, .. } => {
                if is_lexer {
                    let mut chars = text.chars();
                    let c = chars.next()?;
                    chars.next().is_none().then(|| IntervalSet::of(c as i32))
                } else {
                    self.grammar
                        .vocabulary
                        .type_of_literal(text)
                        .map(IntervalSet::of)
                }
            }
            Element::TokenRef { name, .. } if !is_lexer => self
                .grammar
                .vocabulary
                .type_of_name(name)
                .map(IntervalSet::of),
            Element::Block { alternatives, .. } => {
                let mut union = IntervalSet::new();
                for alt in alternatives {
                    match alt.elements.as_slice() {
                        [single] => union.union(&self.element_symbol_set(is_lexer, single)?),
                        _ => return None,
                    }
                }
                (!union.is_empty()).then_some(union)
            }
            Element::Labeled { inner, .. } => self.element_symbol_set(is_lexer, inner),
            _ => None,
        }
    }

    // =====================================================================
    // Left recursion
    // =====================================================================

    /// Precedence-climbing rewrite: primary alternatives feed an unbounded
    /// loop over the operator alternatives, each guarded by its precedence
    /// level. Original alternative indices are preserved for reporting and
    /// tree labeling.
    fn build_left_recursive(&mut self, id: RuleId, rule: &Rule, plan: LeftRecPlan) {
        let (start, stop) = self.entry_pair(id);

        let primary_alts: Vec<&Alternative> = plan
            .primary
            .iter()
            .map(|&i| &rule.alternatives[i])
            .collect();
        let primary_frag = match primary_alts.len() {
            1 => self.build_alternative(id, false, primary_alts[0]),
            _ => {
                let block_start = self.add_state(AtnStateKind::BlockStart, id);
                let block_end = self.add_state(AtnStateKind::BlockEnd, id);
                self.add_decision(block_start);
                for alt in &primary_alts {
                    let frag = self.build_alternative(id, false, alt);
                    self.connect_eps(block_start, frag.entry);
                    self.connect_eps(frag.exit, block_end);
                }
                Frag {
                    entry: block_start,
                    exit: block_end,
                }
            }
        };
        let primary_decision = self.atn.states[primary_frag.entry as usize].decision;

        let loop_entry = self.add_state(AtnStateKind::StarLoopEntry, id);
        let loop_back = self.add_state(AtnStateKind::StarLoopBack, id);
        let loop_end = self.add_state(AtnStateKind::LoopEnd, id);
        let loop_decision = self.add_decision(loop_entry);

        self.connect_eps(start, primary_frag.entry);
        self.connect_eps(primary_frag.exit, loop_entry);

        let recursive_count = plan.recursive.len() as u32;
        let mut levels = Vec::with_capacity(plan.recursive.len());
        for (position, &alt_index) in plan.recursive.iter().enumerate() {
            let level = recursive_count - position as u32;
            levels.push(level);

            let alt = &rule.alternatives[alt_index];
            let frag = self.build_operator_tail(id, &rule.name, alt, level);

            let guard = self.add_state(AtnStateKind::Basic, id);
            self.push_transition(
                loop_entry,
                Transition::Precedence {
                    level,
                    target: guard,
                },
            );
            self.connect_eps(guard, frag.entry);
            self.connect_eps(frag.exit, loop_back);
        }
        self.push_transition(
            loop_entry,
            Transition::Epsilon { target: loop_end },
        );
        self.connect_eps(loop_back, loop_entry);
        self.connect_eps(loop_end, stop);

        self.atn.left_recursion[id as usize] = Some(LeftRecursion {
            rule: id,
            primary_alts: plan.primary.iter().map(|&i| i as u32 + 1).collect(),
            recursive_alts: plan.recursive.iter().map(|&i| i as u32 + 1).collect(),
            levels,
            loop_decision,
            primary_decision,
            loop_entry,
            loop_back,
        });
    }

    /// Builds the tail of a recursive alternative: everything after the
    /// leading self-reference. A trailing self-reference is invoked with
    /// `level + 1` (left associativity); interior ones with 0.
    fn build_operator_tail(
        &mut self,
        id: RuleId,
        rule_name: &str,
        alt: &Alternative,
        level: u32,
    ) -> Frag {
        let tail = &alt.elements[1..];
        let mut frags: Vec<Frag> = Vec::with_capacity(tail.len());
        for (position, element) in tail.iter().enumerate() {
            let is_last = position + 1 == tail.len();
            let frag = if is_last && references_rule(element, rule_name) {
                let target = self.grammar.rule_index(rule_name).expect("own rule") as RuleId;
                Some(self.rule_call_frag(id, target, level + 1))
            } else {
                self.build_element(id, false, element)
            };
            if let Some(frag) = frag {
                frags.push(frag);
            }
        }
        self.sequence(id, &frags)
    }

    // =====================================================================
    // Lexer mode entry points
    // =====================================================================

    fn build_mode_starts(&mut self) {
        let mode_count = self.grammar.modes.len().max(1);
        for mode in 0..mode_count {
            let start = self.add_state(AtnStateKind::TokenStart, NO_RULE);
            // Implicit literal rules match first, then declared lexer
            // rules in source order; ties in the simulator resolve to the
            // earlier entry.
            let mut members: Vec<StateId> = Vec::new();
            members.extend(
                self.atn
                    .rules
                    .iter()
                    .filter(|r| r.is_implicit && r.mode == mode)
                    .map(|r| r.start),
            );
            members.extend(
                self.atn
                    .rules
                    .iter()
                    .filter(|r| !r.is_implicit && r.is_lexer && !r.is_fragment && r.mode == mode)
                    .map(|r| r.start),
            );
            for member in members {
                self.connect_eps(start, member);
            }
            self.atn.mode_starts.push(start);
        }
    }
}

/// Alternative indices (0-based) split into primary and left-recursive.
struct LeftRecPlan {
    primary: Vec<usize>,
    recursive: Vec<usize>,
}

/// Detects immediate left recursion: an alternative whose leftmost
/// element (after unwrapping labels) is a reference to the rule itself.
fn plan_left_recursion(rule_name: &str, alternatives: &[Alternative]) -> Option<LeftRecPlan> {
    let mut primary = Vec::new();
    let mut recursive = Vec::new();
    for (index, alt) in alternatives.iter().enumerate() {
        if alt
            .elements
            .first()
            .is_some_and(|e| references_rule(e, rule_name))
        {
            recursive.push(index);
        } else {
            primary.push(index);
        }
    }
    (!recursive.is_empty()).then_some(LeftRecPlan { primary, recursive })
}

fn references_rule(element: &Element, rule_name: &str) -> bool {
    match element {
        Element::RuleRef { name, .. } => name == rule_name,
        Element::Labeled { inner, .. } => references_rule(inner, rule_name),
        _ => false,
    }
}

fn char_class_to_intervals(set: &gramspect_syntax::CharClassSet) -> IntervalSet {
    let mut intervals = IntervalSet::new();
    for &(lo, hi) in &set.ranges {
        intervals.add(lo as i32, hi as i32);
    }
    intervals
}
