//! Lexer interpreter: drives the lexer ATN over a character stream.
//!
//! Longest match wins; ties go to the earlier rule (implicit literal
//! rules first, then declared rules in source order). Commands from the
//! matched alternative are applied: `skip` drops the token, `channel`
//! reroutes it, `type` overrides the type, and the mode commands operate
//! a mode stack. An unmatchable character yields an error token and the
//! lexer advances one character.

use std::collections::{HashMap, HashSet};

use gramspect_atn::{Atn, AtnStateKind, ResolvedCommand, RuleId, StateId, Transition};
use gramspect_syntax::TOKEN_EOF;

use crate::budget::Budget;
use crate::error::RuntimeError;
use crate::token::{TOKEN_ERROR, Token};

/// Fragment-call stacks deeper than this indicate mutually recursive
/// fragments; such threads are dropped.
const MAX_FRAGMENT_DEPTH: usize = 64;

/// One lexical error, recoverable: lexing continues after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

/// All tokens of a sample plus accumulated errors. Skipped tokens are
/// omitted; off-channel tokens are present with their channel set. The
/// stream always ends with an EOF token.
#[derive(Debug, Clone)]
pub struct LexOutput<'s> {
    pub tokens: Vec<Token<'s>>,
    pub errors: Vec<LexError>,
}

/// One simulation thread: position in the ATN, owning lexer rule, the
/// rule's matched alternative, and the fragment-call stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LexConfig {
    state: StateId,
    rule: RuleId,
    alt: u32,
    stack: Vec<StateId>,
}

/// A candidate acceptance: end offset, tie-break priority, rule, alt.
#[derive(Debug, Clone, Copy)]
struct Accept {
    end: usize,
    priority: u32,
    rule: RuleId,
    alt: u32,
}

/// Tokenizes `input` against the grammar's lexer ATN.
pub fn lex<'s>(atn: &Atn, input: &'s str, budget: &Budget) -> Result<LexOutput<'s>, RuntimeError> {
    LexerSim::new(atn).run(input, budget)
}

struct LexerSim<'a> {
    atn: &'a Atn,
    /// Entry decision state per multi-alternative lexer rule, used to tag
    /// threads with the alternative they entered through.
    entry_decisions: HashMap<RuleId, StateId>,
}

impl<'a> LexerSim<'a> {
    fn new(atn: &'a Atn) -> Self {
        let mut entry_decisions = HashMap::new();
        for rule in &atn.rules {
            if !rule.is_lexer {
                continue;
            }
            if let Some(decision) = atn.entry_decision(rule.id) {
                entry_decisions.insert(rule.id, atn.decision(decision).state);
            }
        }
        Self {
            atn,
            entry_decisions,
        }
    }

    fn run<'s>(&self, input: &'s str, budget: &Budget) -> Result<LexOutput<'s>, RuntimeError> {
        let mut tokens: Vec<Token<'s>> = Vec::new();
        let mut errors: Vec<LexError> = Vec::new();
        let mut mode_stack: Vec<usize> = vec![0];
        let mut pos = 0usize;
        let mut line = 1u32;
        let mut column = 0u32;
        // Set while a `more` command extends the token being assembled.
        let mut pending: Option<(usize, u32, u32)> = None;

        while pos < input.len() {
            budget.check()?;

            let (token_start, token_line, token_column) =
                pending.take().unwrap_or((pos, line, column));
            let mode = *mode_stack.last().expect("mode stack never empty");

            let Some(accept) = self.longest_match(input, pos, mode) else {
                let bad = input[pos..].chars().next().expect("pos < len");
                let end = pos + bad.len_utf8();
                errors.push(LexError {
                    message: format!("token recognition error at '{bad}'"),
                    line,
                    column,
                    offset: pos,
                });
                tokens.push(Token {
                    index: tokens.len(),
                    token_type: TOKEN_ERROR,
                    text: &input[pos..end],
                    line,
                    column,
                    start: pos,
                    stop: end,
                    channel: 0,
                });
                advance_position(&input[pos..end], &mut line, &mut column);
                pos = end;
                continue;
            };

            let info = self.atn.rule(accept.rule);
            let commands = info
                .commands
                .get(accept.alt.saturating_sub(1) as usize)
                .or_else(|| info.commands.first())
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let mut token_type = info.token_type.unwrap_or(TOKEN_ERROR);
            let mut channel = 0u32;
            let mut skip = false;
            let mut more = false;
            for command in commands {
                match command {
                    ResolvedCommand::Skip => skip = true,
                    ResolvedCommand::More => more = true,
                    ResolvedCommand::Channel(n) => channel = *n,
                    ResolvedCommand::Type(t) => token_type = *t,
                    ResolvedCommand::Mode(m) => {
                        *mode_stack.last_mut().expect("mode stack never empty") = *m;
                    }
                    ResolvedCommand::PushMode(m) => mode_stack.push(*m),
                    ResolvedCommand::PopMode => {
                        if mode_stack.len() > 1 {
                            mode_stack.pop();
                        }
                    }
                }
            }

            advance_position(&input[pos..accept.end], &mut line, &mut column);
            pos = accept.end;

            if more {
                pending = Some((token_start, token_line, token_column));
                continue;
            }
            if !skip {
                tokens.push(Token {
                    index: tokens.len(),
                    token_type,
                    text: &input[token_start..pos],
                    line: token_line,
                    column: token_column,
                    start: token_start,
                    stop: pos,
                    channel,
                });
            }
        }

        tokens.push(Token {
            index: tokens.len(),
            token_type: TOKEN_EOF,
            text: "",
            line,
            column,
            start: input.len(),
            stop: input.len(),
            channel: 0,
        });

        Ok(LexOutput { tokens, errors })
    }

    /// Runs all lexer rules of `mode` in parallel from `start`, tracking
    /// the longest (then highest-priority, then lowest-alternative)
    /// acceptance.
    fn longest_match(&self, input: &str, start: usize, mode: usize) -> Option<Accept> {
        let mode_start = self.atn.state(self.atn.mode_starts[mode]);
        let seeds: Vec<LexConfig> = mode_start
            .transitions
            .iter()
            .map(|t| {
                let target = t.target();
                LexConfig {
                    state: target,
                    rule: self.atn.state(target).rule,
                    alt: 0,
                    stack: Vec::new(),
                }
            })
            .collect();
        let mut configs = self.closure(seeds);
        let mut best: Option<Accept> = None;

        for (offset, c) in input[start..].char_indices() {
            let moved = self.step(&configs, c as i32);
            if moved.is_empty() {
                break;
            }
            let end = start + offset + c.len_utf8();
            for config in &moved {
                if self.is_accepting(config) {
                    let candidate = Accept {
                        end,
                        priority: self.atn.lexer_priority(config.rule),
                        rule: config.rule,
                        alt: config.alt.max(1),
                    };
                    best = Some(match best {
                        None => candidate,
                        Some(current) if better(candidate, current) => candidate,
                        Some(current) => current,
                    });
                }
            }
            configs = moved;
        }

        best
    }

    fn is_accepting(&self, config: &LexConfig) -> bool {
        config.stack.is_empty()
            && self.atn.state(config.state).kind == AtnStateKind::RuleStop
            && self.atn.state(config.state).rule == config.rule
    }

    fn step(&self, configs: &[LexConfig], symbol: i32) -> Vec<LexConfig> {
        let mut moved = Vec::new();
        for config in configs {
            let state = self.atn.state(config.state);
            for transition in &state.transitions {
                if !transition.is_epsilon()
                    && !matches!(transition, Transition::Rule { .. })
                    && transition.matches(symbol)
                {
                    moved.push(LexConfig {
                        state: transition.target(),
                        rule: config.rule,
                        alt: config.alt,
                        stack: config.stack.clone(),
                    });
                }
            }
        }
        self.closure(moved)
    }

    fn closure(&self, seeds: Vec<LexConfig>) -> Vec<LexConfig> {
        let mut out = Vec::new();
        let mut visited: HashSet<LexConfig> = HashSet::new();
        let mut work = seeds;

        while let Some(config) = work.pop() {
            if !visited.insert(config.clone()) {
                continue;
            }
            let state = self.atn.state(config.state);

            if state.kind == AtnStateKind::RuleStop {
                match config.stack.split_last() {
                    Some((&follow, rest)) => {
                        work.push(LexConfig {
                            state: follow,
                            rule: config.rule,
                            alt: config.alt,
                            stack: rest.to_vec(),
                        });
                        continue;
                    }
                    None => {
                        out.push(config);
                        continue;
                    }
                }
            }

            // Tag the thread with its alternative when it crosses the
            // rule's entry decision.
            let entry_decision = self.entry_decisions.get(&config.rule).copied();
            let mut alt_counter = 0u32;

            out.push(config.clone());
            for transition in &state.transitions {
                if transition.is_epsilon() {
                    alt_counter += 1;
                }
                match transition {
                    Transition::Epsilon { target }
                    | Transition::Predicate { target, .. }
                    | Transition::Action { target, .. }
                    | Transition::Precedence { target, .. } => {
                        let alt = if config.alt == 0 && entry_decision == Some(config.state) {
                            alt_counter
                        } else {
                            config.alt
                        };
                        work.push(LexConfig {
                            state: *target,
                            rule: config.rule,
                            alt,
                            stack: config.stack.clone(),
                        });
                    }
                    Transition::Rule { target, follow, .. } => {
                        if config.stack.len() < MAX_FRAGMENT_DEPTH {
                            let mut stack = config.stack.clone();
                            stack.push(*follow);
                            work.push(LexConfig {
                                state: *target,
                                rule: config.rule,
                                alt: config.alt,
                                stack,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        out
    }
}

fn better(candidate: Accept, current: Accept) -> bool {
    (candidate.end, current.priority, current.alt) > (current.end, candidate.priority, candidate.alt)
}

fn advance_position(text: &str, line: &mut u32, column: &mut u32) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *column = 0;
        } else {
            *column += 1;
        }
    }
}
