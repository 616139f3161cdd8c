//! Serializable results for every engine operation.
//!
//! These are the wire shapes: each façade operation returns one of these
//! by value, and the transport serializes it with serde_json. Nothing in
//! here borrows from engine-internal state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ErrorDetail;

/// Grammar kind as declared by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrammarKind {
    Combined,
    ParserOnly,
    LexerOnly,
}

impl std::fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarKind::Combined => write!(f, "combined"),
            GrammarKind::ParserOnly => write!(f, "parser-only"),
            GrammarKind::LexerOnly => write!(f, "lexer-only"),
        }
    }
}

/// Rule kind classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Parser,
    Lexer,
    Fragment,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Parser => write!(f, "parser"),
            RuleKind::Lexer => write!(f, "lexer"),
            RuleKind::Fragment => write!(f, "fragment"),
        }
    }
}

/// Result of `validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub grammar_name: String,
    pub kind: GrammarKind,
    pub valid: bool,
    pub rule_counts: RuleCounts,
    /// Tokens declared via `tokens { ... }`.
    pub declared_tokens: Vec<String>,
    /// Channels declared via `channels { ... }`.
    pub channels: Vec<String>,
    pub options: IndexMap<String, String>,
    pub errors: Vec<ErrorDetail>,
    pub warnings: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleCounts {
    pub parser: usize,
    pub lexer: usize,
    pub fragment: usize,
}

impl RuleCounts {
    pub fn total(&self) -> usize {
        self.parser + self.lexer + self.fragment
    }
}

/// One token of a lexed sample, as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub index: usize,
    /// Symbolic token name, or the literal text for implicit tokens.
    pub token_type: String,
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub start: usize,
    pub stop: usize,
    pub channel: u32,
}

/// Serialized parse-tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum TreeNode {
    Rule {
        rule: String,
        alt: u32,
        children: Vec<TreeNode>,
        start: usize,
        stop: usize,
    },
    Terminal {
        token_type: String,
        text: String,
        line: u32,
        column: u32,
    },
    Error {
        text: String,
    },
}

/// Wall-clock timings for a parse request, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingInfo {
    pub lex_ms: f64,
    pub parse_ms: f64,
    pub total_ms: f64,
}

/// Result of `parseSample` and the parse half of `profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub success: bool,
    pub start_rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeNode>,
    /// LISP rendering of `tree`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lisp: Option<String>,
    pub tokens: Vec<TokenInfo>,
    pub errors: Vec<ErrorDetail>,
    pub warnings: Vec<ErrorDetail>,
    pub timing: TimingInfo,
}

/// One ambiguity observed by the prediction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguityEventInfo {
    pub decision: usize,
    pub rule: String,
    /// Token index where the ambiguous span starts.
    pub start_index: usize,
    /// Token index where the ambiguous span stops (inclusive).
    pub stop_index: usize,
    /// Conflicting alternative numbers, ascending, length >= 2.
    pub alternatives: Vec<u32>,
    pub full_context: bool,
    /// Input text covered by the ambiguous span.
    pub text: String,
}

/// Per-sample slice of an ambiguity report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleAmbiguities {
    pub sample_index: usize,
    pub input: String,
    pub events: Vec<AmbiguityEventInfo>,
    /// Set when this sample failed (timeout, parse abort); other samples
    /// are unaffected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Result of `detectAmbiguity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguityReport {
    pub has_ambiguities: bool,
    pub samples: Vec<SampleAmbiguities>,
    /// Ambiguity event count per rule, insertion-ordered by first event.
    pub rule_counts: IndexMap<String, usize>,
    pub coverage: DecisionCoverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionCoverage {
    pub decisions_total: usize,
    pub decisions_exercised: usize,
}

/// One node of the rule call graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphNode {
    pub rule: String,
    pub kind: RuleKind,
    /// Outgoing calls, ordered, unique.
    pub calls: Vec<String>,
    /// Incoming calls, ordered, unique.
    pub called_by: Vec<String>,
    pub recursive: bool,
    /// BFS distance from the start rule; -1 if unreachable.
    pub depth: i32,
    pub unused: bool,
}

/// Result of `analyzeCallGraph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphReport {
    pub start_rule: String,
    pub nodes: Vec<CallGraphNode>,
    /// Cycles, each normalized to its canonical rotation.
    pub cycles: Vec<Vec<String>>,
    pub mermaid: String,
}

/// Per-rule complexity measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleComplexity {
    pub rule: String,
    pub kind: RuleKind,
    pub alternatives: usize,
    pub decision_points: usize,
    pub depth: i32,
    pub fan_in: usize,
    pub fan_out: usize,
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityTotals {
    pub parser_rules: usize,
    pub lexer_rules: usize,
    pub fragment_rules: usize,
    pub average_alternatives: f64,
    pub max_rule_depth: i32,
    pub total_decision_points: usize,
}

/// Result of `analyzeComplexity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub rules: Vec<RuleComplexity>,
    pub totals: ComplexityTotals,
}

/// Per-rule slice of the left-recursion report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftRecursionInfo {
    pub rule: String,
    /// Rule refers to itself as the leftmost element of some alternative.
    pub direct: bool,
    /// The ATN builder rewrote the rule to precedence-climbing form.
    pub transformed: bool,
    /// Precedence level per operator alternative, descending by source
    /// order of the alternative (higher binds tighter).
    pub precedence_levels: Vec<u32>,
    /// 1-based indices of non-recursive alternatives.
    pub primary_alternatives: Vec<u32>,
    /// 1-based indices of left-recursive alternatives.
    pub recursive_alternatives: Vec<u32>,
}

/// Result of `analyzeLeftRecursion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftRecursionReport {
    pub rules: Vec<LeftRecursionInfo>,
    /// Indirect recursion cycles over parser rules, canonical rotation.
    pub indirect_cycles: Vec<Vec<String>>,
}

/// FIRST/FOLLOW sets for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSets {
    pub rule: String,
    pub nullable: bool,
    pub first: Vec<String>,
    pub follow: Vec<String>,
}

/// Lookahead sets of one decision's alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionLookahead {
    pub decision: usize,
    pub rule: String,
    /// Lookahead token names per alternative, in source order.
    pub alternatives: Vec<Vec<String>>,
    /// True when any two alternatives' lookahead sets intersect.
    pub ambiguous_by_lookahead: bool,
}

/// Result of `analyzeFirstFollow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstFollowReport {
    pub rules: Vec<RuleSets>,
    pub decisions: Vec<DecisionLookahead>,
}

/// Result of `visualizeATN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtnVisualization {
    pub rule: String,
    pub state_count: usize,
    pub transition_count: usize,
    pub decision_count: usize,
    pub dot: String,
    pub mermaid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
}

/// One decision of `visualizeDecision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionViz {
    pub decision: usize,
    pub state: usize,
    pub alternatives: usize,
    pub dot: String,
}

/// Result of `visualizeDecision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionVisualization {
    pub rule: String,
    pub decisions: Vec<DecisionViz>,
}

/// Per-decision profiling aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionProfileInfo {
    pub decision: usize,
    pub rule: String,
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
    pub dfa_states: usize,
}

/// Result of `profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReport {
    pub parse: ParseReport,
    pub decisions: Vec<DecisionProfileInfo>,
    pub ambiguities: Vec<AmbiguityEventInfo>,
}

/// Result of `generateTestInputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTestInputs {
    pub rule: String,
    pub inputs: Vec<String>,
}

/// A named artifact of the code-generation contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    pub name: String,
    /// What the artifact is for (lexer, parser, listener, ...).
    pub role: String,
}

/// Result of the code-generation contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodegenReport {
    pub target: String,
    pub files: Vec<GeneratedFile>,
}
