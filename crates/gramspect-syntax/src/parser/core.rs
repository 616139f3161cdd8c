//! Parser state machine and low-level operations.
//!
//! The token stream is processed left-to-right. Trivia tokens (whitespace,
//! comments) are buffered separately and flushed as leading trivia when
//! starting a new node. This gives predictable trivia attachment without
//! backtracking.

use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

use super::cst::{SyntaxKind, SyntaxNode, TokenSet};
use super::lexer::{Token, token_text};
use crate::diagnostics::Diagnostics;

/// Nesting limit for parenthesized blocks. Grammars nest shallowly in
/// practice; the limit exists to keep malicious input from overflowing
/// the stack.
pub(super) const MAX_DEPTH: u32 = 256;

/// Debug-mode progress detector. Decremented on lookahead, reset on
/// `bump()`. Catches productions that loop without consuming input.
#[cfg(debug_assertions)]
const DEFAULT_FUEL: u32 = 256;

/// Parse result: the green tree plus accumulated diagnostics.
///
/// The tree is always complete - errors are recorded separately and also
/// represented as `Error` nodes in the tree itself.
#[derive(Debug, Clone)]
pub struct Parse {
    green: GreenNode,
    diagnostics: Diagnostics,
}

impl Parse {
    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    /// Creates a typed view over the immutable green tree. Cheap -
    /// `SyntaxNode` is a thin wrapper with parent pointers.
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Main entry point. Always succeeds - errors embedded in the returned tree.
pub fn parse(source: &str) -> Parse {
    let tokens = super::lexer::lex(source);
    let mut parser = Parser::new(source, tokens);
    parser.parse_root();
    parser.finish()
}

pub(super) struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) trivia_buffer: Vec<Token>,
    pub(super) builder: GreenNodeBuilder<'static>,
    pub(super) diagnostics: Diagnostics,
    pub(super) depth: u32,
    pub(super) last_diagnostic_pos: Option<TextSize>,
    #[cfg(debug_assertions)]
    debug_fuel: std::cell::Cell<u32>,
}

impl<'src> Parser<'src> {
    pub(super) fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            trivia_buffer: Vec::with_capacity(4),
            builder: GreenNodeBuilder::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            last_diagnostic_pos: None,
            #[cfg(debug_assertions)]
            debug_fuel: std::cell::Cell::new(DEFAULT_FUEL),
        }
    }

    pub(super) fn finish(mut self) -> Parse {
        self.drain_trivia();
        Parse {
            green: self.builder.finish(),
            diagnostics: self.diagnostics,
        }
    }

    // =========================================================================
    // Token access - raw position based, includes trivia
    // =========================================================================

    /// Current token kind. Returns `Error` at EOF (acts as sentinel).
    pub(super) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(super) fn nth(&self, lookahead: usize) -> SyntaxKind {
        #[cfg(debug_assertions)]
        {
            let fuel = self.debug_fuel.get();
            assert!(fuel > 0, "parser is stuck: no progress for {DEFAULT_FUEL} lookaheads");
            self.debug_fuel.set(fuel - 1);
        }
        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::Error, |t| t.kind)
    }

    fn reset_debug_fuel(&self) {
        #[cfg(debug_assertions)]
        self.debug_fuel.set(DEFAULT_FUEL);
    }

    pub(super) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    pub(super) fn current_text(&self) -> &'src str {
        self.tokens
            .get(self.pos)
            .map_or("", |t| token_text(self.source, t))
    }

    fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn at_set(&self, set: TokenSet) -> bool {
        set.contains(self.current())
    }

    /// Current non-trivia kind; buffers skipped trivia.
    pub(super) fn peek(&mut self) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        self.current()
    }

    /// LL(k) lookahead past trivia (0 = current non-trivia token).
    pub(super) fn peek_nth(&mut self, n: usize) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        let mut count = 0;
        let mut pos = self.pos;
        while pos < self.tokens.len() {
            let kind = self.tokens[pos].kind;
            if !kind.is_trivia() {
                if count == n {
                    return kind;
                }
                count += 1;
            }
            pos += 1;
        }
        SyntaxKind::Error
    }

    // =========================================================================
    // Trivia handling
    // =========================================================================

    pub(super) fn skip_trivia_to_buffer(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.trivia_buffer.push(self.tokens[self.pos]);
            self.pos += 1;
        }
    }

    pub(super) fn drain_trivia(&mut self) {
        for token in self.trivia_buffer.drain(..) {
            let text = token_text(self.source, &token);
            self.builder.token(token.kind.into(), text);
        }
    }

    pub(super) fn eat_trivia(&mut self) {
        self.skip_trivia_to_buffer();
        self.drain_trivia();
    }

    // =========================================================================
    // Tree building
    // =========================================================================

    pub(super) fn start_node(&mut self, kind: SyntaxKind) {
        self.drain_trivia();
        self.builder.start_node(kind.into());
    }

    /// Wrap previously-parsed content using checkpoint.
    pub(super) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    pub(super) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(super) fn checkpoint(&mut self) -> Checkpoint {
        self.drain_trivia();
        self.builder.checkpoint()
    }

    pub(super) fn bump(&mut self) {
        assert!(!self.eof(), "bump called at EOF");
        self.reset_debug_fuel();
        // Flush buffered trivia first so tree text stays in source order.
        self.drain_trivia();
        let token = self.tokens[self.pos];
        let text = token_text(self.source, &token);
        self.builder.token(token.kind.into(), text);
        self.pos += 1;
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    /// On mismatch: emit diagnostic but don't consume (allows parent recovery).
    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected {what}"));
        false
    }

    // =========================================================================
    // Errors and recovery
    // =========================================================================

    /// Emit a diagnostic at the current token. Deduplicates by position so
    /// cascading failures at one spot produce one message.
    pub(super) fn error(&mut self, message: impl Into<String>) {
        let range = self.current_span();
        let pos = range.start();
        if self.last_diagnostic_pos == Some(pos) {
            return;
        }
        self.last_diagnostic_pos = Some(pos);
        self.diagnostics.error(message, range).emit();
    }

    /// Emit a diagnostic, then consume the offending token into an `Error` node.
    pub(super) fn error_and_bump(&mut self, message: impl Into<String>) {
        self.error(message);
        if !self.eof() {
            self.start_node(SyntaxKind::Error);
            self.bump();
            self.finish_node();
        }
    }

    /// Consume tokens into an `Error` node until one in `recovery` (or EOF).
    pub(super) fn recover_until(&mut self, recovery: TokenSet) {
        if self.at_set(recovery) || self.eof() {
            return;
        }
        self.start_node(SyntaxKind::Error);
        while !self.eof() && !self.at_set(recovery) {
            self.bump();
            self.skip_trivia_to_buffer();
        }
        self.finish_node();
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            self.error("grammar nests too deeply");
            return false;
        }
        self.depth += 1;
        self.reset_debug_fuel();
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.reset_debug_fuel();
    }
}
