//! Parser interpreter: walks the parser ATN from a start rule, calling
//! the prediction engine at every decision state.
//!
//! Syntax errors in the sample recover via single-token deletion or
//! insertion and accumulate in the outcome; only timeouts, cancellation,
//! and invariant breaks abort the parse.

use gramspect_atn::{Atn, AtnState, LeftRecursion, RuleId, StateId, Transition};
use gramspect_syntax::Vocabulary;

use crate::budget::Budget;
use crate::error::RuntimeError;
use crate::prediction::{Predicted, Predictor};
use crate::profiler::ProfileSink;
use crate::token::Token;
use crate::tree::{ErrorNode, ParseTree, RuleNode, TerminalNode};

/// Hard cap on accumulated syntax errors; a sample this broken aborts.
const MAX_SYNTAX_ERRORS: usize = 100;

/// One recovered syntax error in the sample input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    /// Index into the parser's (default-channel) token stream.
    pub token_index: usize,
}

/// Result of an interpreter parse.
#[derive(Debug)]
pub struct ParseOutcome {
    pub tree: ParseTree,
    pub errors: Vec<SyntaxError>,
    /// DFA states built per decision during this parse.
    pub dfa_sizes: Vec<(u32, usize)>,
}

/// Parses `tokens` (default-channel stream ending in EOF) from
/// `start_rule`, reporting prediction events to `sink`.
pub fn parse<'s, S: ProfileSink>(
    atn: &Atn,
    vocab: &Vocabulary,
    tokens: &[Token<'s>],
    start_rule: RuleId,
    budget: Budget,
    sink: &mut S,
) -> Result<ParseOutcome, RuntimeError> {
    let mut interp = Interp {
        atn,
        vocab,
        tokens,
        pos: 0,
        predictor: Predictor::new(atn),
        budget,
        errors: Vec::new(),
        ctx_stack: Vec::new(),
        sink,
    };
    let tree = interp.parse_rule(start_rule, 0)?;
    let dfa_sizes = atn
        .decisions
        .iter()
        .map(|d| (d.id, interp.predictor.dfa_size(d.id)))
        .collect();
    Ok(ParseOutcome {
        tree,
        errors: interp.errors,
        dfa_sizes,
    })
}

struct Interp<'a, 's, S: ProfileSink> {
    atn: &'a Atn,
    vocab: &'a Vocabulary,
    tokens: &'a [Token<'s>],
    pos: usize,
    predictor: Predictor<'a>,
    budget: Budget,
    errors: Vec<SyntaxError>,
    /// Follow states of the active rule invocations, outermost first.
    ctx_stack: Vec<StateId>,
    sink: &'a mut S,
}

impl<'a, 's, S: ProfileSink> Interp<'a, 's, S> {
    fn parse_rule(&mut self, rule: RuleId, precedence: u32) -> Result<ParseTree, RuntimeError> {
        self.budget.check()?;

        if let Some(info) = &self.atn.left_recursion[rule as usize] {
            let info = info.clone();
            return self.parse_left_recursive(rule, &info, precedence);
        }

        let rule_info = self.atn.rule(rule);
        let (start, stop) = (rule_info.start, rule_info.stop);
        let start_token = self.pos;
        let mut children = Vec::new();
        let mut alt = 1u32;
        let capture = self.atn.entry_decision(rule);
        self.walk(start, stop, &mut children, precedence, capture, &mut alt)?;

        Ok(ParseTree::Rule(RuleNode {
            rule,
            name: self.atn.rule(rule).name.clone(),
            alt,
            children,
            start_token,
            stop_token: self.pos,
        }))
    }

    /// Precedence-climbing interpretation of a transformed rule: parse a
    /// primary, then wrap it once per loop iteration, re-parenting the
    /// previous node as the first child of the operator node.
    fn parse_left_recursive(
        &mut self,
        rule: RuleId,
        info: &LeftRecursion,
        precedence: u32,
    ) -> Result<ParseTree, RuntimeError> {
        let rule_info = self.atn.rule(rule);
        let (rule_start, name) = (rule_info.start, rule_info.name.clone());
        let start_token = self.pos;

        let mut children = Vec::new();
        let mut captured = 1u32;
        self.walk(
            rule_start,
            info.loop_entry,
            &mut children,
            precedence,
            info.primary_decision,
            &mut captured,
        )?;
        let primary_alt = info
            .primary_alts
            .get(captured as usize - 1)
            .copied()
            .unwrap_or_else(|| info.primary_alts.first().copied().unwrap_or(1));
        let mut node = RuleNode {
            rule,
            name: name.clone(),
            alt: primary_alt,
            children,
            start_token,
            stop_token: self.pos,
        };

        let recursive_count = info.recursive_alts.len() as u32;
        loop {
            self.budget.check()?;
            let predicted = self.predictor.predict(
                info.loop_decision,
                self.tokens,
                self.pos,
                &self.ctx_stack,
                precedence,
                self.sink,
                &self.budget,
            )?;
            let chosen = match predicted {
                Predicted::Alt(alt) => alt,
                Predicted::NoViableAlt => break,
            };
            if chosen > recursive_count {
                break; // exit alternative
            }

            let loop_state = self.atn.state(info.loop_entry);
            let transition = nth_alternative(loop_state, chosen)
                .ok_or_else(|| RuntimeError::Internal("loop alternative out of range".into()))?;
            let mut tail_children = vec![ParseTree::Rule(node)];
            let mut unused = 0u32;
            self.walk(
                transition.target(),
                info.loop_back,
                &mut tail_children,
                precedence,
                None,
                &mut unused,
            )?;
            node = RuleNode {
                rule,
                name: name.clone(),
                alt: info.recursive_alts[chosen as usize - 1],
                children: tail_children,
                start_token,
                stop_token: self.pos,
            };
        }

        Ok(ParseTree::Rule(node))
    }

    /// Walks the ATN from `from` until reaching `until`, consuming tokens
    /// and recursing into rule invocations.
    fn walk(
        &mut self,
        from: StateId,
        until: StateId,
        children: &mut Vec<ParseTree>,
        precedence: u32,
        capture: Option<u32>,
        captured_alt: &mut u32,
    ) -> Result<(), RuntimeError> {
        let mut state = from;
        while state != until {
            let current = self.atn.state(state);

            if let Some(decision) = current.decision {
                let predicted = self.predictor.predict(
                    decision,
                    self.tokens,
                    self.pos,
                    &self.ctx_stack,
                    precedence,
                    self.sink,
                    &self.budget,
                )?;
                let alt = match predicted {
                    Predicted::Alt(alt) => alt,
                    Predicted::NoViableAlt => {
                        self.no_viable_error(current)?;
                        recovery_alternative(current)
                    }
                };
                if capture == Some(decision) {
                    *captured_alt = alt;
                }
                let transition = nth_alternative(current, alt).ok_or_else(|| {
                    RuntimeError::Internal("predicted alternative out of range".into())
                })?;
                state = transition.target();
                continue;
            }

            let Some(transition) = current.transitions.first() else {
                return Err(RuntimeError::Internal(format!(
                    "walk stuck in state {state} with no transitions"
                )));
            };
            match transition {
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Action { target, .. }
                | Transition::Precedence { target, .. } => state = *target,
                Transition::Rule {
                    rule,
                    follow,
                    precedence: call_precedence,
                    ..
                } => {
                    let (rule, follow, call_precedence) = (*rule, *follow, *call_precedence);
                    self.ctx_stack.push(follow);
                    let child = self.parse_rule(rule, call_precedence)?;
                    self.ctx_stack.pop();
                    children.push(child);
                    state = follow;
                }
                consuming => {
                    self.budget.check()?;
                    let target = consuming.target();
                    let token = self.current_token();
                    if consuming.matches(token.token_type) {
                        self.consume(children);
                    } else {
                        self.recover(consuming, children)?;
                    }
                    state = target;
                }
            }
        }
        Ok(())
    }

    fn current_token(&self) -> Token<'s> {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn consume(&mut self, children: &mut Vec<ParseTree>) {
        let token = self.current_token();
        children.push(ParseTree::Terminal(TerminalNode {
            token_type: token.token_type,
            text: token.text.to_owned(),
            line: token.line,
            column: token.column,
            start: token.start,
            stop: token.stop,
            token_index: self.pos,
        }));
        if !token.is_eof() {
            self.pos += 1;
        }
    }

    /// Single-token recovery: delete when the next token would match,
    /// otherwise synthesize the expected token and continue.
    fn recover(
        &mut self,
        expected: &Transition,
        children: &mut Vec<ParseTree>,
    ) -> Result<(), RuntimeError> {
        let token = self.current_token();
        let expected_text = self.describe_expectation(expected);
        self.syntax_error(format!(
            "mismatched input '{}' expecting {expected_text}",
            token.text
        ))?;

        let next_matches = self
            .tokens
            .get(self.pos + 1)
            .is_some_and(|next| expected.matches(next.token_type));
        if next_matches {
            // Delete the offending token.
            children.push(ParseTree::Error(ErrorNode {
                text: token.text.to_owned(),
                token_index: self.pos,
            }));
            self.pos += 1;
            self.consume(children);
        } else {
            // Insert the missing token.
            children.push(ParseTree::Error(ErrorNode {
                text: format!("<missing {expected_text}>"),
                token_index: self.pos,
            }));
        }
        Ok(())
    }

    fn no_viable_error(&mut self, state: &AtnState) -> Result<(), RuntimeError> {
        let token = self.current_token();
        let rule = &self.atn.rule(state.rule).name;
        self.syntax_error(format!(
            "no viable alternative at input '{}' in rule '{rule}'",
            token.text
        ))
    }

    fn syntax_error(&mut self, message: String) -> Result<(), RuntimeError> {
        let token = self.current_token();
        self.errors.push(SyntaxError {
            message,
            line: token.line,
            column: token.column,
            token_index: self.pos,
        });
        if self.errors.len() > MAX_SYNTAX_ERRORS {
            return Err(RuntimeError::Internal(
                "too many syntax errors; giving up on this sample".into(),
            ));
        }
        Ok(())
    }

    fn describe_expectation(&self, transition: &Transition) -> String {
        match transition {
            Transition::Atom { label, .. } => self.vocab.display_name(*label),
            Transition::Range { from, to, .. } => format!("{from}..{to}"),
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => {
                let names: Vec<String> = set
                    .values()
                    .take(4)
                    .map(|v| self.vocab.display_name(v))
                    .collect();
                format!("{{{}}}", names.join(", "))
            }
            Transition::Wildcard { .. } => "any token".to_owned(),
            _ => "<unknown>".to_owned(),
        }
    }
}

/// The `alt`-th (1-based) epsilon-kind transition of a decision state.
fn nth_alternative(state: &AtnState, alt: u32) -> Option<&Transition> {
    state
        .transitions
        .iter()
        .filter(|t| t.is_epsilon())
        .nth(alt as usize - 1)
}

/// Alternative to take when prediction finds nothing viable: the exit
/// branch for loop decisions (so loops terminate), the first alternative
/// otherwise.
fn recovery_alternative(state: &AtnState) -> u32 {
    use gramspect_atn::AtnStateKind;
    let count = state.transitions.iter().filter(|t| t.is_epsilon()).count() as u32;
    match state.kind {
        AtnStateKind::StarLoopEntry | AtnStateKind::PlusLoopBack => count,
        _ => 1,
    }
}
