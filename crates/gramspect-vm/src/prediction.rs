//! Adaptive prediction: SLL with on-demand DFA construction, LL fallback.
//!
//! SLL prediction ignores the caller context (rule stops fan out to every
//! call site), which lets DFA states be shared across invocations. When
//! SLL cannot decide, prediction re-runs with the parser's actual rule
//! stack; if full context still leaves two or more viable alternatives at
//! end of input, an ambiguity is reported and the lowest-numbered
//! surviving alternative wins.
//!
//! # Precedence guards
//!
//! Precedence transitions exist only in rewritten left-recursive rules.
//! A guard is evaluated against the precedence of the frame the
//! configuration is in: the prediction's own precedence at depth 0, the
//! invoking transition's precedence inside frames entered during closure,
//! and - for configurations that escaped into an outer invocation of the
//! same rule - only levels the inner loop cannot take. That last rule is
//! the precedence filter: any operator the outer frame could consume at
//! an equal-or-tighter level is also consumable by continuing the inner
//! loop, and exploring both would make every left-recursive parse look
//! ambiguous.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use gramspect_atn::{Atn, AtnStateKind, DecisionId, EOF_SYMBOL, RuleId, StateId, Transition};

use crate::budget::Budget;
use crate::dfa::{Config, ConfigSet, CtxFrame, Dfa};
use crate::error::RuntimeError;
use crate::profiler::{AmbiguityEvent, DecisionEvent, ProfileSink};
use crate::token::Token;

/// Call stacks deeper than this during closure indicate unbounded
/// epsilon recursion (indirect left recursion); such configs are dropped.
const MAX_CLOSURE_DEPTH: usize = 64;

/// Outcome of one prediction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicted {
    Alt(u32),
    /// No alternative can match the lookahead; the caller recovers.
    NoViableAlt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sll,
    Ll,
}

enum PhaseOutcome {
    Alt(u32),
    NoViable,
    /// Still >= 2 viable alternatives when lookahead ran dry; carries the
    /// surviving set and the index of the last consumed token.
    Stuck { alts: Vec<u32>, stop_index: usize },
}

#[derive(Default)]
struct Counters {
    atn_transitions: u64,
    dfa_transitions: u64,
    sll_lookahead: u64,
    ll_lookahead: u64,
}

/// Prediction engine with per-decision DFAs, owned by one parse.
pub struct Predictor<'a> {
    atn: &'a Atn,
    /// Follow states of every call site, per callee rule. Used by SLL
    /// closure when a rule stop is reached with an empty stack.
    callers: HashMap<RuleId, Vec<StateId>>,
    dfas: HashMap<DecisionId, Dfa>,
}

impl<'a> Predictor<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        let mut callers: HashMap<RuleId, Vec<StateId>> = HashMap::new();
        for state in &atn.states {
            for transition in &state.transitions {
                if let Transition::Rule { rule, follow, .. } = transition {
                    callers.entry(*rule).or_default().push(*follow);
                }
            }
        }
        Self {
            atn,
            callers,
            dfas: HashMap::new(),
        }
    }

    /// DFA state count for a decision after the run.
    pub fn dfa_size(&self, decision: DecisionId) -> usize {
        self.dfas.get(&decision).map_or(0, Dfa::len)
    }

    /// Predicts the alternative to take at `decision` with lookahead
    /// starting at `tokens[start]`.
    ///
    /// `outer_ctx` is the parser's stack of follow states (outermost
    /// first); `precedence` the current frame's precedence argument.
    pub fn predict<S: ProfileSink>(
        &mut self,
        decision: DecisionId,
        tokens: &[Token<'_>],
        start: usize,
        outer_ctx: &[StateId],
        precedence: u32,
        sink: &mut S,
        budget: &Budget,
    ) -> Result<Predicted, RuntimeError> {
        budget.check()?;
        let begun = Instant::now();
        let rule = self.atn.decision(decision).rule;
        let mut counters = Counters::default();

        let sll = self.run_phase(
            decision,
            tokens,
            start,
            Mode::Sll,
            &[],
            precedence,
            &mut counters,
            budget,
        )?;

        let (outcome, ll_fallback, ambiguity) = match sll {
            PhaseOutcome::Alt(alt) => (Predicted::Alt(alt), false, None),
            PhaseOutcome::NoViable => (Predicted::NoViableAlt, false, None),
            PhaseOutcome::Stuck { .. } => {
                let ll = self.run_phase(
                    decision,
                    tokens,
                    start,
                    Mode::Ll,
                    outer_ctx,
                    precedence,
                    &mut counters,
                    budget,
                )?;
                match ll {
                    PhaseOutcome::Alt(alt) => (Predicted::Alt(alt), true, None),
                    PhaseOutcome::NoViable => (Predicted::NoViableAlt, true, None),
                    PhaseOutcome::Stuck { alts, stop_index } => {
                        let event = AmbiguityEvent {
                            decision,
                            rule,
                            start_index: start,
                            stop_index,
                            alternatives: alts.clone(),
                            full_context: true,
                        };
                        (Predicted::Alt(alts[0]), true, Some(event))
                    }
                }
            }
        };

        sink.record_decision(&DecisionEvent {
            decision,
            rule,
            sll_lookahead: counters.sll_lookahead,
            ll_lookahead: counters.ll_lookahead,
            ll_fallback,
            atn_transitions: counters.atn_transitions,
            dfa_transitions: counters.dfa_transitions,
            elapsed_us: begun.elapsed().as_micros() as u64,
            error: outcome == Predicted::NoViableAlt,
        });
        match ambiguity {
            Some(event) => sink.record_ambiguity(&event),
            None if ll_fallback && matches!(outcome, Predicted::Alt(_)) => {
                sink.record_context_sensitivity(decision);
            }
            None => {}
        }

        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_phase(
        &mut self,
        decision: DecisionId,
        tokens: &[Token<'_>],
        start: usize,
        mode: Mode,
        outer_ctx: &[StateId],
        precedence: u32,
        counters: &mut Counters,
        budget: &Budget,
    ) -> Result<PhaseOutcome, RuntimeError> {
        let info = *self.atn.decision(decision);
        // Precedence guards make configurations depend on the caller's
        // precedence, so those decisions are simulated without the cache.
        let cacheable = mode == Mode::Sll
            && !self
                .atn
                .state(info.state)
                .transitions
                .iter()
                .any(|t| matches!(t, Transition::Precedence { .. }));

        let walker = Walker {
            atn: self.atn,
            callers: &self.callers,
            mode,
            decision_rule: info.rule,
            precedence,
        };

        let mut configs = walker.start_configs(info.state, outer_ctx, counters);
        let mut dfa_state = if cacheable {
            let dfa = self
                .dfas
                .entry(decision)
                .or_insert_with(|| Dfa::new(decision));
            let (id, _) = dfa.intern(configs.clone());
            dfa.start = Some(id);
            Some(id)
        } else {
            None
        };

        let mut cursor = start;
        let mut consumed_eof = false;
        loop {
            budget.check()?;

            let alts = configs.alts();
            if alts.is_empty() {
                return Ok(PhaseOutcome::NoViable);
            }
            if alts.len() == 1 {
                if let (Some(id), Some(dfa)) = (dfa_state, self.dfas.get_mut(&decision)) {
                    dfa.state_mut(id).accept = Some(alts[0]);
                }
                return Ok(PhaseOutcome::Alt(alts[0]));
            }
            if consumed_eof {
                if let (Some(id), Some(dfa)) = (dfa_state, self.dfas.get_mut(&decision)) {
                    dfa.state_mut(id).requires_full_context = true;
                }
                return Ok(PhaseOutcome::Stuck {
                    alts,
                    stop_index: last_consumed(start, cursor),
                });
            }

            let symbol_index = cursor.min(tokens.len().saturating_sub(1));
            let symbol = tokens
                .get(symbol_index)
                .map_or(EOF_SYMBOL, |t| t.token_type);

            // Cached edge first.
            if let Some(id) = dfa_state {
                let dfa = self.dfas.get(&decision).expect("dfa exists");
                if let Some(&next) = dfa.state(id).edges.get(&symbol) {
                    counters.dfa_transitions += 1;
                    counters.sll_lookahead += 1;
                    let next_state = dfa.state(next);
                    if let Some(alt) = next_state.accept {
                        return Ok(PhaseOutcome::Alt(alt));
                    }
                    if next_state.requires_full_context {
                        return Ok(PhaseOutcome::Stuck {
                            alts: next_state.configs.alts(),
                            stop_index: last_consumed(start, cursor + 1),
                        });
                    }
                    configs = next_state.configs.clone();
                    dfa_state = Some(next);
                    if symbol == EOF_SYMBOL {
                        consumed_eof = true;
                    }
                    cursor += 1;
                    continue;
                }
            }

            let next = walker.step(&configs, symbol, counters);
            match mode {
                Mode::Sll => counters.sll_lookahead += 1,
                Mode::Ll => counters.ll_lookahead += 1,
            }

            // No alternative consumes the lookahead. If some alternative
            // already completed the decision's rule (escaped into a
            // caller), commit to it and let the parser surface the error
            // where it actually is; otherwise nothing is viable here.
            // (Ambiguity is different: it needs >= 2 alternatives
            // surviving through end of input.)
            if next.is_empty() {
                if let Some(alt) = configs.iter().filter(|c| c.depth < 0).map(|c| c.alt).min() {
                    return Ok(PhaseOutcome::Alt(alt));
                }
                return Ok(PhaseOutcome::NoViable);
            }

            if let Some(id) = dfa_state {
                let dfa = self.dfas.get_mut(&decision).expect("dfa exists");
                let (next_id, _) = dfa.intern(next.clone());
                dfa.state_mut(id).edges.insert(symbol, next_id);
                dfa_state = Some(next_id);
            }

            configs = next;
            if symbol == EOF_SYMBOL {
                consumed_eof = true;
            }
            cursor += 1;
        }
    }
}

/// Closure/move logic for one prediction phase.
struct Walker<'a> {
    atn: &'a Atn,
    callers: &'a HashMap<RuleId, Vec<StateId>>,
    mode: Mode,
    decision_rule: RuleId,
    precedence: u32,
}

impl Walker<'_> {
    /// Seeds one configuration set per alternative of the decision and
    /// closes it. Precedence guards that fail contribute nothing.
    fn start_configs(
        &self,
        decision_state: StateId,
        outer_ctx: &[StateId],
        counters: &mut Counters,
    ) -> ConfigSet {
        let state = self.atn.state(decision_state);
        let mut seeds = Vec::new();
        let mut alt = 0u32;
        for transition in &state.transitions {
            if !transition.is_epsilon() {
                continue;
            }
            alt += 1;
            if let Transition::Precedence { level, .. } = transition {
                if *level < self.precedence {
                    continue;
                }
            }
            let ctx = match self.mode {
                Mode::Sll => Vec::new(),
                Mode::Ll => outer_ctx
                    .iter()
                    .map(|&follow| CtxFrame { follow, prec: 0 })
                    .collect(),
            };
            seeds.push(Config::seed(
                transition.target(),
                alt,
                ctx,
                self.precedence,
            ));
        }
        self.closure(seeds, counters)
    }

    /// move(symbol) over every configuration, then closure.
    fn step(&self, configs: &ConfigSet, symbol: i32, counters: &mut Counters) -> ConfigSet {
        let mut moved = Vec::new();
        for config in configs.iter() {
            let state = self.atn.state(config.state);
            // A configuration resting at a rule stop with no context left
            // is viable exactly at end of input.
            if state.kind == AtnStateKind::RuleStop
                && config.ctx.is_empty()
                && symbol == EOF_SYMBOL
            {
                moved.push(config.clone());
                continue;
            }
            for transition in &state.transitions {
                if !transition.is_epsilon()
                    && !matches!(transition, Transition::Rule { .. })
                    && transition.matches(symbol)
                {
                    moved.push(config.at(transition.target()));
                }
            }
        }
        self.closure(moved, counters)
    }

    /// Epsilon closure with rule-call push/pop. In SLL mode a rule stop
    /// with an empty stack fans out to every call site of the rule.
    fn closure(&self, seeds: Vec<Config>, counters: &mut Counters) -> ConfigSet {
        let mut out: Vec<Config> = Vec::new();
        let mut visited: HashSet<Config> = HashSet::new();
        let mut work = seeds;

        while let Some(config) = work.pop() {
            if !visited.insert(config.clone()) {
                continue;
            }
            counters.atn_transitions += 1;

            let state = self.atn.state(config.state);
            if state.kind == AtnStateKind::RuleStop {
                match config.ctx.split_last() {
                    Some((frame, rest)) => {
                        work.push(Config {
                            state: frame.follow,
                            alt: config.alt,
                            ctx: rest.to_vec(),
                            prec: frame.prec,
                            depth: config.depth - 1,
                        });
                        continue;
                    }
                    None => {
                        if self.mode == Mode::Sll {
                            if let Some(follows) = self.callers.get(&state.rule) {
                                for &follow in follows {
                                    work.push(Config {
                                        state: follow,
                                        alt: config.alt,
                                        ctx: Vec::new(),
                                        prec: 0,
                                        depth: config.depth - 1,
                                    });
                                }
                            }
                        }
                        // Keep the stop configuration: it marks "viable
                        // at end of input".
                        out.push(config);
                        continue;
                    }
                }
            }

            out.push(config.clone());

            for transition in &state.transitions {
                match transition {
                    Transition::Epsilon { target }
                    | Transition::Predicate { target, .. }
                    | Transition::Action { target, .. } => {
                        work.push(config.at(*target));
                    }
                    Transition::Precedence { level, target } => {
                        if self.guard_passes(&config, state.rule, *level) {
                            work.push(config.at(*target));
                        }
                    }
                    Transition::Rule {
                        target,
                        follow,
                        precedence,
                        ..
                    } => {
                        if config.ctx.len() < MAX_CLOSURE_DEPTH {
                            let mut ctx = config.ctx.clone();
                            ctx.push(CtxFrame {
                                follow: *follow,
                                prec: config.prec,
                            });
                            work.push(Config {
                                state: *target,
                                alt: config.alt,
                                ctx,
                                prec: *precedence,
                                depth: config.depth + 1,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        ConfigSet::from_vec(out)
    }

    /// See the module docs: frame-relative precedence evaluation with the
    /// precedence filter for outer frames of the decision's own rule.
    fn guard_passes(&self, config: &Config, guard_rule: RuleId, level: u32) -> bool {
        if config.depth >= 0 {
            level >= config.prec
        } else if guard_rule == self.decision_rule {
            level < self.precedence
        } else {
            true
        }
    }
}

fn last_consumed(start: usize, cursor: usize) -> usize {
    if cursor > start { cursor - 1 } else { start }
}
