//! Profiling sink for the prediction engine.
//!
//! The engine writes events to a trait-shaped sink; `NoopSink` is the
//! default and keeps the non-profiling path free of bookkeeping. The
//! aggregating `ProfileRecorder` owns all profiling state, so nothing
//! profiling-related leaks into the prediction structures.

use gramspect_atn::DecisionId;

/// One ambiguity (or full-context resolution) observed during prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityEvent {
    pub decision: DecisionId,
    pub rule: u32,
    /// Token index where the ambiguous span starts.
    pub start_index: usize,
    /// Token index where the ambiguous span stops, inclusive.
    pub stop_index: usize,
    /// Conflicting alternatives, ascending, length >= 2.
    pub alternatives: Vec<u32>,
    pub full_context: bool,
}

/// Aggregate payload emitted once per prediction call.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEvent {
    pub decision: DecisionId,
    pub rule: u32,
    /// Tokens of lookahead the SLL phase consumed.
    pub sll_lookahead: u64,
    /// Tokens of lookahead the LL phase consumed (0 without fallback).
    pub ll_lookahead: u64,
    pub ll_fallback: bool,
    /// ATN configurations computed.
    pub atn_transitions: u64,
    /// Cached DFA edges taken.
    pub dfa_transitions: u64,
    pub elapsed_us: u64,
    /// Parse errors attributed to this decision (no viable alternative).
    pub error: bool,
}

/// Event sink the prediction engine writes to.
pub trait ProfileSink {
    fn record_decision(&mut self, event: &DecisionEvent);
    fn record_ambiguity(&mut self, event: &AmbiguityEvent);
    /// SLL conflicted but full context resolved to a single alternative.
    fn record_context_sensitivity(&mut self, decision: DecisionId);
}

/// Default sink; every call compiles to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProfileSink for NoopSink {
    #[inline(always)]
    fn record_decision(&mut self, _event: &DecisionEvent) {}

    #[inline(always)]
    fn record_ambiguity(&mut self, _event: &AmbiguityEvent) {}

    #[inline(always)]
    fn record_context_sensitivity(&mut self, _decision: DecisionId) {}
}

/// Per-decision aggregate counters.
#[derive(Debug, Clone, Default)]
pub struct DecisionStats {
    pub decision: DecisionId,
    pub rule: u32,
    pub invocations: u64,
    pub time_us: u64,
    pub sll_lookahead_total: u64,
    pub sll_lookahead_min: u64,
    pub sll_lookahead_max: u64,
    pub ll_fallbacks: u64,
    pub ll_lookahead_total: u64,
    pub atn_transitions: u64,
    pub dfa_transitions: u64,
    pub ambiguities: u64,
    pub context_sensitivities: u64,
    pub errors: u64,
}

/// Aggregating sink used by `profile` and `detectAmbiguity`.
#[derive(Debug, Default)]
pub struct ProfileRecorder {
    stats: Vec<DecisionStats>,
    ambiguities: Vec<AmbiguityEvent>,
}

impl ProfileRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn stats_mut(&mut self, decision: DecisionId, rule: u32) -> &mut DecisionStats {
        if let Some(pos) = self.stats.iter().position(|s| s.decision == decision) {
            return &mut self.stats[pos];
        }
        self.stats.push(DecisionStats {
            decision,
            rule,
            sll_lookahead_min: u64::MAX,
            ..DecisionStats::default()
        });
        self.stats.last_mut().expect("just pushed")
    }

    /// Aggregates in decision order of first use.
    pub fn decisions(&self) -> &[DecisionStats] {
        &self.stats
    }

    /// Events in the order the engine encountered them.
    pub fn ambiguities(&self) -> &[AmbiguityEvent] {
        &self.ambiguities
    }

    pub fn into_ambiguities(self) -> Vec<AmbiguityEvent> {
        self.ambiguities
    }
}

impl ProfileSink for ProfileRecorder {
    fn record_decision(&mut self, event: &DecisionEvent) {
        let stats = self.stats_mut(event.decision, event.rule);
        stats.invocations += 1;
        stats.time_us += event.elapsed_us;
        stats.sll_lookahead_total += event.sll_lookahead;
        stats.sll_lookahead_min = stats.sll_lookahead_min.min(event.sll_lookahead);
        stats.sll_lookahead_max = stats.sll_lookahead_max.max(event.sll_lookahead);
        if event.ll_fallback {
            stats.ll_fallbacks += 1;
        }
        stats.ll_lookahead_total += event.ll_lookahead;
        stats.atn_transitions += event.atn_transitions;
        stats.dfa_transitions += event.dfa_transitions;
        if event.error {
            stats.errors += 1;
        }
    }

    fn record_ambiguity(&mut self, event: &AmbiguityEvent) {
        let stats = self.stats_mut(event.decision, event.rule);
        stats.ambiguities += 1;
        self.ambiguities.push(event.clone());
    }

    fn record_context_sensitivity(&mut self, decision: DecisionId) {
        if let Some(pos) = self.stats.iter().position(|s| s.decision == decision) {
            self.stats[pos].context_sensitivities += 1;
        }
    }
}
