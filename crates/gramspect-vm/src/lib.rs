//! Grammar interpreter for gramspect.
//!
//! Drives the in-memory ATN against sample inputs: the lexer simulation
//! produces a token stream, the parser interpreter walks the parser ATN
//! calling the adaptive prediction engine at every decision, and the
//! profiling sink observes prediction events.
//!
//! - `lexer` - longest-match lexer simulation with modes and commands
//! - `prediction` - SLL with per-decision DFAs, LL fallback, ambiguity events
//! - `parser` - ATN walker with single-token error recovery
//! - `profiler` - event sink trait, no-op default, aggregating recorder
//! - `token` / `tree` - tokens and parse trees
//! - `budget` - per-sample deadline and cancellation

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod budget;
pub mod dfa;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod prediction;
pub mod profiler;
pub mod token;
pub mod tree;

#[cfg(test)]
mod lexer_tests;

pub use budget::Budget;
pub use error::RuntimeError;
pub use lexer::{LexError, LexOutput, lex};
pub use parser::{ParseOutcome, SyntaxError, parse};
pub use prediction::{Predicted, Predictor};
pub use profiler::{
    AmbiguityEvent, DecisionEvent, DecisionStats, NoopSink, ProfileRecorder, ProfileSink,
};
pub use token::{TOKEN_ERROR, Token};
pub use tree::{ErrorNode, ParseTree, RuleNode, TerminalNode};

/// Default-channel tokens only, the stream the parser consumes.
pub fn default_channel<'a, 's>(tokens: &'a [Token<'s>]) -> Vec<Token<'s>> {
    tokens
        .iter()
        .filter(|t| t.channel == 0 && !t.is_error())
        .copied()
        .collect()
}
