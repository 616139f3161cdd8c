//! ANTLR4 grammar lexer, parser, and syntax types.
//!
//! This module provides a resilient parser for `.g4` grammar syntax,
//! producing a lossless concrete syntax tree using [Rowan](https://docs.rs/rowan).
//!
//! # Architecture
//!
//! ```text
//! Source text → Lexer → Tokens → Parser → GreenNode → SyntaxNode
//!                                              ↓
//!                                        Diagnostics
//! ```
//!
//! - [`lexer`]: Logos-based tokenizer producing `Token { kind, span }` pairs.
//!   Tokens are zero-copy - text is sliced from source only when building the
//!   tree. Action blocks are captured whole by a nesting-aware callback.
//!
//! - [`cst`]: `SyntaxKind` enum covering all tokens and nodes, plus
//!   `TokenSet` bitset for O(1) membership testing.
//!
//! - [`ast`]: typed wrappers over CST nodes, consumed by the model layer.
//!
//! # Error Handling
//!
//! The parser is designed to never fail outright. On invalid input:
//! 1. A diagnostic is recorded with span and message
//! 2. Unexpected tokens are wrapped in `Error` nodes
//! 3. Parsing continues at the nearest recovery point
//!
//! This ensures the model layer always has a tree to work with.

pub mod ast;
pub mod cst;
pub mod lexer;

mod core;
mod grammar;

pub use core::{Parse, parse};

#[cfg(test)]
mod grammar_tests;
