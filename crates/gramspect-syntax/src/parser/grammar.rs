//! Grammar productions for ANTLR4 `.g4` files.
//!
//! This module implements all `parse_*` methods as an extension of `Parser`.
//! The accepted subset covers the grammar header, options/imports/tokens/
//! channels declarations, named actions, mode sections, and parser/lexer
//! rules with alternatives, labels, char sets, ranges, embedded actions and
//! predicates, and `->` lexer commands.

use super::core::Parser;
use super::cst::SyntaxKind;
use super::cst::token_sets::{BLOCK_RECOVERY, SUFFIXES};

impl Parser<'_> {
    pub(super) fn parse_root(&mut self) {
        self.start_node(SyntaxKind::Root);

        match self.peek() {
            SyntaxKind::KwGrammar | SyntaxKind::KwLexer | SyntaxKind::KwParser => {
                self.parse_grammar_decl();
            }
            SyntaxKind::Error if self.eof() => {
                // Empty input; the model layer reports the load error.
            }
            _ => self.error("expected grammar declaration"),
        }

        loop {
            match self.peek() {
                SyntaxKind::KwOptions => self.parse_options_spec(),
                SyntaxKind::KwImport => self.parse_import_decl(),
                SyntaxKind::KwTokens => self.parse_tokens_spec(),
                SyntaxKind::KwChannels => self.parse_channels_spec(),
                SyntaxKind::At => self.parse_named_action(),
                SyntaxKind::KwMode => self.parse_mode_decl(),
                SyntaxKind::KwFragment | SyntaxKind::UpperIdent | SyntaxKind::LowerIdent => {
                    self.parse_rule()
                }
                SyntaxKind::Garbage => {
                    let message = garbage_message(self.current_text());
                    self.error_and_bump(message);
                }
                SyntaxKind::Error => break, // EOF sentinel; `Error` is never lexed
                _ => self.error_and_bump("expected a rule or declaration"),
            }
        }

        self.eat_trivia();
        self.finish_node();
    }

    /// `(lexer | parser)? grammar Name ;`
    fn parse_grammar_decl(&mut self) {
        self.start_node(SyntaxKind::GrammarDecl);
        if !self.eat(SyntaxKind::KwLexer) {
            self.eat(SyntaxKind::KwParser);
        }
        self.expect(SyntaxKind::KwGrammar, "'grammar' keyword");
        if !self.eat(SyntaxKind::UpperIdent) && !self.eat(SyntaxKind::LowerIdent) {
            self.error("expected grammar name");
        }
        self.expect(SyntaxKind::Semi, "';' after grammar name");
        self.finish_node();
    }

    /// `options { key = value ; ... }` - the block is captured whole and
    /// split into key/value pairs by the model layer.
    fn parse_options_spec(&mut self) {
        self.start_node(SyntaxKind::OptionsSpec);
        self.bump(); // 'options'
        if !self.eat(SyntaxKind::ActionBlock) {
            self.error("expected '{ ... }' after 'options'");
        }
        self.finish_node();
    }

    /// `import Name (, Name)* ;`
    fn parse_import_decl(&mut self) {
        self.start_node(SyntaxKind::ImportDecl);
        self.bump(); // 'import'
        if !self.eat(SyntaxKind::UpperIdent) && !self.eat(SyntaxKind::LowerIdent) {
            self.error("expected imported grammar name");
        }
        while self.eat(SyntaxKind::Comma) {
            if !self.eat(SyntaxKind::UpperIdent) && !self.eat(SyntaxKind::LowerIdent) {
                self.error("expected imported grammar name after ','");
                break;
            }
        }
        self.expect(SyntaxKind::Semi, "';' after import list");
        self.finish_node();
    }

    fn parse_tokens_spec(&mut self) {
        self.start_node(SyntaxKind::TokensSpec);
        self.bump(); // 'tokens'
        if !self.eat(SyntaxKind::ActionBlock) {
            self.error("expected '{ ... }' after 'tokens'");
        }
        self.finish_node();
    }

    fn parse_channels_spec(&mut self) {
        self.start_node(SyntaxKind::ChannelsSpec);
        self.bump(); // 'channels'
        if !self.eat(SyntaxKind::ActionBlock) {
            self.error("expected '{ ... }' after 'channels'");
        }
        self.finish_node();
    }

    /// `@name { ... }` | `@scope::name { ... }`
    fn parse_named_action(&mut self) {
        self.start_node(SyntaxKind::NamedAction);
        self.bump(); // '@'
        if !self.eat(SyntaxKind::LowerIdent) && !self.eat(SyntaxKind::UpperIdent) {
            self.error("expected action name after '@'");
        }
        if self.eat(SyntaxKind::ColonColon)
            && !self.eat(SyntaxKind::LowerIdent)
            && !self.eat(SyntaxKind::UpperIdent)
        {
            self.error("expected action name after '::'");
        }
        if !self.eat(SyntaxKind::ActionBlock) {
            self.error("expected '{ ... }' action body");
        }
        self.finish_node();
    }

    /// `mode Name ;` - following lexer rules belong to this mode.
    fn parse_mode_decl(&mut self) {
        self.start_node(SyntaxKind::ModeDecl);
        self.bump(); // 'mode'
        if !self.eat(SyntaxKind::UpperIdent) && !self.eat(SyntaxKind::LowerIdent) {
            self.error("expected mode name");
        }
        self.expect(SyntaxKind::Semi, "';' after mode name");
        self.finish_node();
    }

    /// `fragment? Name : alternatives ;`
    fn parse_rule(&mut self) {
        self.start_node(SyntaxKind::RuleDef);
        self.eat(SyntaxKind::KwFragment);
        if !self.eat(SyntaxKind::UpperIdent) && !self.eat(SyntaxKind::LowerIdent) {
            self.error("expected rule name");
        }
        self.expect(SyntaxKind::Colon, "':' after rule name");
        self.parse_alt_list();
        if !self.eat(SyntaxKind::Semi) {
            // Leave the stray token for the root loop: it may be the next
            // rule's name, which should not be swallowed by recovery.
            self.error("expected ';' to end the rule");
        }
        self.finish_node();
    }

    /// `alternative (| alternative)*` - alternatives may be empty (epsilon).
    fn parse_alt_list(&mut self) {
        self.start_node(SyntaxKind::AltList);
        self.parse_alternative();
        while self.eat(SyntaxKind::Pipe) {
            self.parse_alternative();
        }
        self.finish_node();
    }

    fn parse_alternative(&mut self) {
        self.start_node(SyntaxKind::Alternative);
        loop {
            let kind = self.peek();
            if kind == SyntaxKind::Garbage {
                let message = garbage_message(self.current_text());
                self.error_and_bump(message);
                continue;
            }
            if !kind.is_element_start() {
                break;
            }
            // An identifier followed by ':' is the next rule's header, not
            // an element; stop so the missing-';' error lands on the rule.
            if matches!(kind, SyntaxKind::UpperIdent | SyntaxKind::LowerIdent)
                && self.peek_nth(1) == SyntaxKind::Colon
            {
                break;
            }
            self.parse_element();
        }
        if self.peek() == SyntaxKind::Arrow {
            self.parse_lexer_commands();
        }
        if self.peek() == SyntaxKind::Pound {
            self.parse_alt_label();
        }
        self.finish_node();
    }

    /// One element: optionally labeled primary with an optional EBNF suffix.
    fn parse_element(&mut self) {
        let checkpoint = self.checkpoint();

        if matches!(self.peek(), SyntaxKind::UpperIdent | SyntaxKind::LowerIdent)
            && matches!(self.peek_nth(1), SyntaxKind::Assign | SyntaxKind::PlusAssign)
        {
            self.start_node(SyntaxKind::Labeled);
            self.bump(); // label
            self.bump(); // '=' or '+='
            self.parse_primary();
            self.finish_node();
        } else {
            self.parse_primary();
        }

        if self.at_set(SUFFIXES) {
            self.start_node_at(checkpoint, SyntaxKind::Quantifier);
            self.bump();
            self.finish_node();
        }
    }

    fn parse_primary(&mut self) {
        match self.peek() {
            SyntaxKind::LowerIdent => {
                self.start_node(SyntaxKind::RuleRef);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::UpperIdent => {
                self.start_node(SyntaxKind::TokenRef);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::StringLit => {
                if self.peek_nth(1) == SyntaxKind::DotDot {
                    self.start_node(SyntaxKind::RangeExpr);
                    self.bump(); // left bound
                    self.bump(); // '..'
                    if !self.eat(SyntaxKind::StringLit) {
                        self.error("expected right bound of character range");
                    }
                    self.finish_node();
                } else {
                    self.start_node(SyntaxKind::Literal);
                    self.bump();
                    self.finish_node();
                }
            }
            SyntaxKind::CharSet => {
                self.start_node(SyntaxKind::CharClass);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::Dot => {
                self.start_node(SyntaxKind::Wildcard);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::Tilde => {
                self.start_node(SyntaxKind::NotExpr);
                self.bump();
                self.parse_primary();
                self.finish_node();
            }
            SyntaxKind::ParenOpen => self.parse_block(),
            SyntaxKind::ActionBlock => {
                if self.peek_nth(1) == SyntaxKind::Question {
                    self.start_node(SyntaxKind::PredicateElement);
                    self.bump(); // '{...}'
                    self.bump(); // '?'
                    self.finish_node();
                } else {
                    self.start_node(SyntaxKind::ActionElement);
                    self.bump();
                    self.finish_node();
                }
            }
            _ => self.error_and_bump("expected a rule element"),
        }
    }

    /// `( alternatives )`
    fn parse_block(&mut self) {
        if !self.enter_recursion() {
            self.error_and_bump("block ignored");
            return;
        }
        self.start_node(SyntaxKind::Block);
        self.bump(); // '('
        self.parse_alt_list();
        if !self.eat(SyntaxKind::ParenClose) {
            self.error("expected ')' to close the block");
            self.recover_until(BLOCK_RECOVERY);
            self.eat(SyntaxKind::ParenClose);
        }
        self.finish_node();
        self.exit_recursion();
    }

    /// `-> command (, command)*`
    fn parse_lexer_commands(&mut self) {
        self.start_node(SyntaxKind::LexerCommands);
        self.bump(); // '->'
        self.parse_command();
        while self.eat(SyntaxKind::Comma) {
            self.parse_command();
        }
        self.finish_node();
    }

    /// `skip` | `channel(HIDDEN)` | `type(T)` | `mode(M)` | `pushMode(M)` | `popMode`
    fn parse_command(&mut self) {
        self.start_node(SyntaxKind::Command);
        if !self.eat(SyntaxKind::LowerIdent) && !self.eat(SyntaxKind::UpperIdent) {
            self.error("expected lexer command after '->'");
            self.finish_node();
            return;
        }
        if self.eat(SyntaxKind::ParenOpen) {
            if !self.eat(SyntaxKind::UpperIdent)
                && !self.eat(SyntaxKind::LowerIdent)
                && !self.eat(SyntaxKind::Int)
            {
                self.error("expected command argument");
            }
            self.expect(SyntaxKind::ParenClose, "')' after command argument");
        }
        self.finish_node();
    }

    /// `# Label`
    fn parse_alt_label(&mut self) {
        self.start_node(SyntaxKind::AltLabel);
        self.bump(); // '#'
        if !self.eat(SyntaxKind::UpperIdent) && !self.eat(SyntaxKind::LowerIdent) {
            self.error("expected alternative label after '#'");
        }
        self.finish_node();
    }
}

/// Chooses a message for a garbage slice based on what it starts with.
fn garbage_message(text: &str) -> &'static str {
    match text.chars().next() {
        Some('\'') => "unterminated string literal",
        Some('[') => "unterminated character set",
        Some('{') => "unterminated action block",
        _ => "unexpected characters",
    }
}
