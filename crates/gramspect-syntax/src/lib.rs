//! ANTLR4 grammar front end for gramspect.
//!
//! The pipeline:
//!
//! ```text
//! .g4 text → parser (lossless CST) → model (GrammarSource) → imports (merge)
//!                 ↓                       ↓                       ↓
//!              Diagnostics            Diagnostics           Diagnostics
//! ```
//!
//! - `parser` - logos lexer and resilient Rowan CST parser
//! - `model` - semantic model: rules, elements, vocabulary
//! - `imports` - DFS import resolution with cycle detection
//! - `embedded` - embedded-code scan over raw text
//! - `diagnostics` - message collection and rendering
//! - `line_index` - offset to line/column conversion

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod diagnostics;
pub mod embedded;
pub mod imports;
pub mod line_index;
pub mod model;
pub mod parser;

#[cfg(test)]
mod imports_tests;
#[cfg(test)]
mod model_tests;

pub use diagnostics::{DiagnosticMessage, Diagnostics, DiagnosticsPrinter};
pub use imports::{ImportError, ResolvedGrammar};
pub use line_index::LineIndex;
pub use model::{
    Alternative, CharClassSet, Element, GrammarSource, LexerCommand, Rule, TOKEN_EOF, TokenType,
    Vocabulary,
};
pub use parser::{Parse, parse};

/// Parses grammar text and lowers it into the semantic model.
///
/// Diagnostics from the lexer/parser and from model validation are merged
/// in that order. The model is structurally complete even when diagnostics
/// carry errors; callers decide whether to proceed.
pub fn parse_grammar(source: &str) -> (GrammarSource, Diagnostics) {
    let parse = parser::parse(source);
    let root = parser::ast::Root::cast(parse.syntax()).expect("parser always produces Root");
    let (grammar, model_diags) = model::lower(&root, source);
    let mut diagnostics = parse.into_diagnostics();
    diagnostics.extend(model_diags);
    (grammar, diagnostics)
}
