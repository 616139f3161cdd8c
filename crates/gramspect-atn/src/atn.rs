//! ATN core types.
//!
//! States live in a single arena vector indexed by dense `StateId`;
//! transitions store only ids, so the cyclic graph (loop-backs, recursive
//! rule calls) needs no shared ownership and is freed as a unit.

use gramspect_syntax::TokenType;

use crate::interval::IntervalSet;

/// Index into [`Atn::states`].
pub type StateId = u32;
/// Index into [`Atn::rules`]. Ids past the grammar's rule count are
/// synthesized rules for implicit literal tokens.
pub type RuleId = u32;
/// Index into [`Atn::decisions`].
pub type DecisionId = u32;

/// Sentinel rule id for states owned by no rule (mode entry points).
pub const NO_RULE: RuleId = RuleId::MAX;

/// Closed set of ATN state kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtnStateKind {
    Basic,
    RuleStart,
    RuleStop,
    BlockStart,
    BlockEnd,
    PlusBlockStart,
    PlusLoopBack,
    StarBlockStart,
    StarLoopBack,
    StarLoopEntry,
    LoopEnd,
    /// Per-mode entry point of the lexer ATN.
    TokenStart,
}

/// One ATN state: kind, owning rule, ordered outgoing transitions.
#[derive(Debug, Clone)]
pub struct AtnState {
    pub id: StateId,
    pub kind: AtnStateKind,
    pub rule: RuleId,
    pub transitions: Vec<Transition>,
    /// Set when this state heads a decision.
    pub decision: Option<DecisionId>,
}

/// Closed set of transition kinds. Every variant names its target state.
#[derive(Debug, Clone)]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    /// Match one symbol (token type or code point).
    Atom {
        label: i32,
        target: StateId,
    },
    Range {
        from: i32,
        to: i32,
        target: StateId,
    },
    Set {
        set: IntervalSet,
        target: StateId,
    },
    /// Match anything not in the set (and not EOF).
    NotSet {
        set: IntervalSet,
        target: StateId,
    },
    /// Match any symbol except EOF.
    Wildcard {
        target: StateId,
    },
    /// Rule invocation: enter `target` (the rule's start state), continue
    /// at `follow` after its stop state.
    Rule {
        rule: RuleId,
        target: StateId,
        follow: StateId,
        precedence: u32,
    },
    /// Semantic predicate; always true in interpreter mode.
    Predicate {
        rule: RuleId,
        pred_index: u32,
        is_ctx_dependent: bool,
        target: StateId,
    },
    /// Embedded action; a no-op in interpreter mode.
    Action {
        rule: RuleId,
        action_index: u32,
        is_ctx_dependent: bool,
        target: StateId,
    },
    /// Precedence guard on recursive entry: passes when `level` is at
    /// least the current precedence.
    Precedence {
        level: u32,
        target: StateId,
    },
}

impl Transition {
    pub fn target(&self) -> StateId {
        match *self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Action { target, .. }
            | Transition::Precedence { target, .. } => target,
        }
    }

    /// True for transitions that consume no input symbol. Rule transitions
    /// are excluded: they change the context.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Predicate { .. }
                | Transition::Action { .. }
                | Transition::Precedence { .. }
        )
    }

    /// Whether a consuming transition matches `symbol`.
    pub fn matches(&self, symbol: i32) -> bool {
        match self {
            Transition::Atom { label, .. } => *label == symbol,
            Transition::Range { from, to, .. } => *from <= symbol && symbol <= *to,
            Transition::Set { set, .. } => set.contains(symbol),
            Transition::NotSet { set, .. } => {
                symbol != crate::EOF_SYMBOL && !set.contains(symbol)
            }
            Transition::Wildcard { .. } => symbol != crate::EOF_SYMBOL,
            _ => false,
        }
    }

    /// Symbols a consuming transition can match, when enumerable.
    pub fn label_set(&self) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::of(*label)),
            Transition::Range { from, to, .. } => Some(IntervalSet::range(*from, *to)),
            Transition::Set { set, .. } => Some(set.clone()),
            _ => None,
        }
    }
}

/// A lexer `->` command with names resolved to ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCommand {
    Skip,
    More,
    PopMode,
    Channel(u32),
    Type(TokenType),
    Mode(usize),
    PushMode(usize),
}

/// Per-rule entry in the ATN.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub id: RuleId,
    pub name: String,
    pub start: StateId,
    pub stop: StateId,
    pub is_lexer: bool,
    pub is_fragment: bool,
    /// Token type produced on match (non-fragment lexer rules and
    /// implicit literal rules).
    pub token_type: Option<TokenType>,
    /// Lexer commands per alternative, in source order.
    pub commands: Vec<Vec<ResolvedCommand>>,
    /// Owning lexer mode.
    pub mode: usize,
    /// Synthesized from a literal in a parser rule; not user-visible.
    pub is_implicit: bool,
}

/// One decision point.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInfo {
    pub id: DecisionId,
    pub state: StateId,
    pub rule: RuleId,
}

/// Left-recursion transform metadata for one rule.
#[derive(Debug, Clone)]
pub struct LeftRecursion {
    pub rule: RuleId,
    /// 1-based original indices of non-recursive alternatives.
    pub primary_alts: Vec<u32>,
    /// 1-based original indices of left-recursive alternatives.
    pub recursive_alts: Vec<u32>,
    /// Precedence level per recursive alternative, descending by source
    /// order (higher binds tighter).
    pub levels: Vec<u32>,
    /// The loop decision choosing between operator alternatives and exit.
    pub loop_decision: DecisionId,
    /// The decision over primary alternatives, when there is more than one.
    pub primary_decision: Option<DecisionId>,
    /// State of the loop decision.
    pub loop_entry: StateId,
    /// Loop-back state every operator alternative ends at.
    pub loop_back: StateId,
}

/// The augmented transition network for one grammar.
#[derive(Debug, Clone, Default)]
pub struct Atn {
    pub states: Vec<AtnState>,
    pub rules: Vec<RuleInfo>,
    pub decisions: Vec<DecisionInfo>,
    /// Per-mode lexer entry states (`TokenStart`).
    pub mode_starts: Vec<StateId>,
    /// Indexed by rule id; `Some` for transformed left-recursive rules.
    pub left_recursion: Vec<Option<LeftRecursion>>,
    /// Rules beyond this count are synthesized implicit-literal rules.
    pub grammar_rule_count: usize,
}

impl Atn {
    pub fn state(&self, id: StateId) -> &AtnState {
        &self.states[id as usize]
    }

    pub fn rule(&self, id: RuleId) -> &RuleInfo {
        &self.rules[id as usize]
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&RuleInfo> {
        self.rules.iter().find(|r| !r.is_implicit && r.name == name)
    }

    pub fn decision(&self, id: DecisionId) -> &DecisionInfo {
        &self.decisions[id as usize]
    }

    /// Decisions owned by `rule`, in creation order.
    pub fn decisions_of_rule(&self, rule: RuleId) -> impl Iterator<Item = &DecisionInfo> {
        self.decisions.iter().filter(move |d| d.rule == rule)
    }

    /// Number of alternatives of a decision: its outgoing epsilon-kind
    /// transitions.
    pub fn alternative_count(&self, decision: DecisionId) -> usize {
        let state = self.state(self.decisions[decision as usize].state);
        state.transitions.iter().filter(|t| t.is_epsilon()).count()
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// States owned by `rule`, ascending by id.
    pub fn states_of_rule(&self, rule: RuleId) -> impl Iterator<Item = &AtnState> {
        self.states.iter().filter(move |s| s.rule == rule)
    }

    /// The decision heading a rule's top-level alternative block, if the
    /// rule has more than one alternative.
    pub fn entry_decision(&self, rule: RuleId) -> Option<DecisionId> {
        let start = self.state(self.rules[rule as usize].start);
        let first = start.transitions.first()?;
        if let Transition::Epsilon { target } = first {
            return self.state(*target).decision;
        }
        None
    }

    /// Tie-break priority among lexer rules: lower wins. Implicit literal
    /// rules precede declared rules, which keep source order.
    pub fn lexer_priority(&self, rule: RuleId) -> u32 {
        let info = &self.rules[rule as usize];
        if info.is_implicit {
            rule - self.grammar_rule_count as u32
        } else {
            (self.rules.len() - self.grammar_rule_count) as u32 + rule
        }
    }

    /// Validates the structural invariants: transition targets in range,
    /// decision alternative counts consistent, rule entry pairs valid.
    /// Returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let n = self.states.len() as u32;
        for state in &self.states {
            for transition in &state.transitions {
                if transition.target() >= n {
                    return Err(format!(
                        "state {} has a transition to nonexistent state {}",
                        state.id,
                        transition.target()
                    ));
                }
                if let Transition::Rule { follow, .. } = transition {
                    if *follow >= n {
                        return Err(format!(
                            "state {} has a rule transition with bad follow state {follow}",
                            state.id
                        ));
                    }
                }
            }
        }
        for decision in &self.decisions {
            let state = self.state(decision.state);
            if state.decision != Some(decision.id) {
                return Err(format!(
                    "decision {} not linked from its state {}",
                    decision.id, decision.state
                ));
            }
            if self.alternative_count(decision.id) == 0 {
                return Err(format!("decision {} has no alternatives", decision.id));
            }
        }
        for rule in &self.rules {
            if rule.start >= n || rule.stop >= n {
                return Err(format!("rule '{}' has bad entry states", rule.name));
            }
            if self.state(rule.start).kind != AtnStateKind::RuleStart {
                return Err(format!("rule '{}' start state has wrong kind", rule.name));
            }
        }
        Ok(())
    }
}
