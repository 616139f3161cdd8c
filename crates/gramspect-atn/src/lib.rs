//! ATN construction for gramspect.
//!
//! Converts the semantic grammar model into an augmented transition
//! network: an arena of states with tagged transitions, decision states
//! for every choice point, and a precedence-climbing rewrite for
//! left-recursive parser rules.
//!
//! - `interval` - sorted interval sets over symbol values
//! - `atn` - state/transition/decision types and invariant checks
//! - `builder` - model-to-ATN construction via fragment combinators
//! - `dump` - text rendering for inspection and snapshot tests

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod atn;
pub mod builder;
pub mod dump;
pub mod interval;

#[cfg(test)]
mod builder_tests;

pub use atn::{
    Atn, AtnState, AtnStateKind, DecisionId, DecisionInfo, LeftRecursion, NO_RULE,
    ResolvedCommand, RuleId, RuleInfo, StateId, Transition,
};
pub use builder::build;
pub use dump::AtnPrinter;
pub use interval::IntervalSet;

/// EOF as a symbol value, shared by token types and code points.
pub const EOF_SYMBOL: i32 = gramspect_syntax::TOKEN_EOF;
