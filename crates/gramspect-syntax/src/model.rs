//! Semantic grammar model.
//!
//! Lowers the typed AST into an owned [`GrammarSource`]: classified rules,
//! alternatives and elements, option/token/channel tables, and the token
//! [`Vocabulary`]. The model is what the ATN builder and the analyses
//! consume; nothing downstream touches the CST.

use gramspect_core::reports::{GrammarKind, RuleKind};
use indexmap::IndexMap;
use rowan::{TextRange, TextSize};

use crate::diagnostics::Diagnostics;
use crate::parser::ast;
use crate::parser::cst::SyntaxKind;

/// Token type id. Real tokens are `1..=max`; [`TOKEN_EOF`] is `-1`.
pub type TokenType = i32;

/// The reserved end-of-input token type.
pub const TOKEN_EOF: TokenType = -1;

/// Default token channel.
pub const CHANNEL_DEFAULT: u32 = 0;
/// The builtin `HIDDEN` channel.
pub const CHANNEL_HIDDEN: u32 = 1;

/// A parsed grammar: rules, declarations, and the token vocabulary.
#[derive(Debug, Clone)]
pub struct GrammarSource {
    pub name: String,
    pub kind: GrammarKind,
    /// Rules in source order. Name uniqueness is an invariant.
    pub rules: IndexMap<String, Rule>,
    pub imports: Vec<String>,
    pub options: IndexMap<String, String>,
    pub named_actions: Vec<NamedActionBlock>,
    /// Names declared in `tokens { ... }`.
    pub declared_tokens: Vec<String>,
    /// Names declared in `channels { ... }`.
    pub declared_channels: Vec<String>,
    /// Lexer mode names; index 0 is the default mode.
    pub modes: Vec<String>,
    /// Literals appearing in parser rules with no defining lexer rule.
    /// They still lex (an implicit rule each) but are not exposed as rules.
    pub implicit_literals: Vec<(String, TokenType)>,
    pub vocabulary: Vocabulary,
}

impl GrammarSource {
    /// The start rule: the first parser rule, or the only rule if unique.
    pub fn default_start_rule(&self) -> Option<&str> {
        self.rules
            .values()
            .find(|r| r.kind == RuleKind::Parser)
            .map(|r| r.name.as_str())
            .or_else(|| {
                (self.rules.len() == 1).then(|| self.rules.values().next().unwrap().name.as_str())
            })
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.get_index_of(name)
    }

    pub fn parser_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().filter(|r| r.kind == RuleKind::Parser)
    }

    pub fn lexer_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().filter(|r| r.kind != RuleKind::Parser)
    }

    /// Resolves a channel argument (`HIDDEN`, a declared name, or a number)
    /// to its numeric id.
    pub fn channel_id(&self, arg: &str) -> Option<u32> {
        if let Ok(n) = arg.parse::<u32>() {
            return Some(n);
        }
        match arg {
            "DEFAULT_TOKEN_CHANNEL" => Some(CHANNEL_DEFAULT),
            "HIDDEN" => Some(CHANNEL_HIDDEN),
            _ => self
                .declared_channels
                .iter()
                .position(|c| c == arg)
                .map(|i| CHANNEL_HIDDEN + 1 + i as u32),
        }
    }

    pub fn mode_id(&self, name: &str) -> Option<usize> {
        self.modes.iter().position(|m| m == name)
    }

    /// True when any rule carries an inline action or predicate, or the
    /// grammar has named action blocks.
    pub fn has_embedded_code(&self) -> bool {
        !self.named_actions.is_empty()
            || self
                .rules
                .values()
                .flat_map(|r| r.alternatives.iter())
                .any(|alt| alt.elements.iter().any(element_has_code))
    }
}

fn element_has_code(element: &Element) -> bool {
    match element {
        Element::Predicate { .. } | Element::Action { .. } => true,
        Element::Block { alternatives, .. } => alternatives
            .iter()
            .any(|alt| alt.elements.iter().any(element_has_code)),
        Element::Optional { inner, .. }
        | Element::Star { inner, .. }
        | Element::Plus { inner, .. }
        | Element::Not { inner, .. }
        | Element::Labeled { inner, .. } => element_has_code(inner),
        _ => false,
    }
}

/// A named action block (`@header`, `@members`, `@parser::members`, ...).
#[derive(Debug, Clone)]
pub struct NamedActionBlock {
    /// Optional scope (`parser` in `@parser::members`).
    pub scope: Option<String>,
    pub name: String,
    /// Body text including braces, kept opaque.
    pub code: String,
    pub span: TextRange,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    pub alternatives: Vec<Alternative>,
    pub span: TextRange,
    /// Owning lexer mode (0 for the default mode and all parser rules).
    pub mode: usize,
    /// Name of the grammar that defined this rule; differs from the host
    /// grammar's name for imported rules.
    pub origin: String,
}

#[derive(Debug, Clone, Default)]
pub struct Alternative {
    pub elements: Vec<Element>,
    /// `# Label` alternative label.
    pub label: Option<String>,
    /// `->` lexer commands (lexer rules only).
    pub commands: Vec<LexerCommand>,
}

/// A `->` command on a lexer alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerCommand {
    Skip,
    More,
    PopMode,
    Channel(String),
    Type(String),
    Mode(String),
    PushMode(String),
}

/// Sorted character ranges parsed from a `[...]` char set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharClassSet {
    pub ranges: Vec<(char, char)>,
}

impl CharClassSet {
    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }
}

/// One element of an alternative, fully owned.
#[derive(Debug, Clone)]
pub enum Element {
    /// `'text'` terminal literal, unescaped.
    Literal { text: String, span: TextRange },
    /// Uppercase token reference. `EOF` resolves to [`TOKEN_EOF`].
    TokenRef { name: String, span: TextRange },
    /// Lowercase rule reference.
    RuleRef { name: String, span: TextRange },
    /// `[...]` character set.
    CharClass { set: CharClassSet, span: TextRange },
    /// `'a'..'z'` lexer character range.
    Range {
        from: char,
        to: char,
        span: TextRange,
    },
    /// `.` wildcard.
    Wildcard { span: TextRange },
    /// `( ... | ... )` sub-block.
    Block {
        alternatives: Vec<Alternative>,
        span: TextRange,
    },
    /// `e?`
    Optional { inner: Box<Element>, greedy: bool },
    /// `e*`
    Star { inner: Box<Element>, greedy: bool },
    /// `e+`
    Plus { inner: Box<Element>, greedy: bool },
    /// `~e` complement.
    Not { inner: Box<Element>, span: TextRange },
    /// `{...}?` semantic predicate, opaque.
    Predicate { code: String, span: TextRange },
    /// `{...}` action, opaque.
    Action { code: String, span: TextRange },
    /// `label=e` or `label+=e`.
    Labeled {
        label: String,
        is_list: bool,
        inner: Box<Element>,
    },
}

impl Element {
    pub fn span(&self) -> TextRange {
        match self {
            Element::Literal { span, .. }
            | Element::TokenRef { span, .. }
            | Element::RuleRef { span, .. }
            | Element::CharClass { span, .. }
            | Element::Range { span, .. }
            | Element::Wildcard { span }
            | Element::Block { span, .. }
            | Element::Not { span, .. }
            | Element::Predicate { span, .. }
            | Element::Action { span, .. } => *span,
            Element::Optional { inner, .. }
            | Element::Star { inner, .. }
            | Element::Plus { inner, .. }
            | Element::Labeled { inner, .. } => inner.span(),
        }
    }
}

/// Token name/literal <-> type tables.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    types_by_name: IndexMap<String, TokenType>,
    types_by_literal: IndexMap<String, TokenType>,
}

impl Vocabulary {
    pub fn type_of_name(&self, name: &str) -> Option<TokenType> {
        self.types_by_name.get(name).copied()
    }

    pub fn type_of_literal(&self, text: &str) -> Option<TokenType> {
        self.types_by_literal.get(text).copied()
    }

    /// Display name: symbolic name, quoted literal, or `EOF`.
    pub fn display_name(&self, token_type: TokenType) -> String {
        if token_type == TOKEN_EOF {
            return "EOF".to_owned();
        }
        if let Some((name, _)) = self
            .types_by_name
            .iter()
            .find(|(_, t)| **t == token_type)
        {
            return name.clone();
        }
        if let Some((lit, _)) = self
            .types_by_literal
            .iter()
            .find(|(_, t)| **t == token_type)
        {
            return format!("'{lit}'");
        }
        format!("<{token_type}>")
    }

    /// Highest assigned token type.
    pub fn max_type(&self) -> TokenType {
        self.types_by_name
            .values()
            .chain(self.types_by_literal.values())
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn symbolic_names(&self) -> impl Iterator<Item = (&str, TokenType)> {
        self.types_by_name.iter().map(|(n, t)| (n.as_str(), *t))
    }

    fn add_name(&mut self, name: &str) -> TokenType {
        if let Some(t) = self.types_by_name.get(name) {
            return *t;
        }
        let t = self.next_type();
        self.types_by_name.insert(name.to_owned(), t);
        t
    }

    fn bind_literal(&mut self, text: &str, token_type: TokenType) {
        self.types_by_literal
            .entry(text.to_owned())
            .or_insert(token_type);
    }

    fn add_literal(&mut self, text: &str) -> TokenType {
        if let Some(t) = self.types_by_literal.get(text) {
            return *t;
        }
        let t = self.next_type();
        self.types_by_literal.insert(text.to_owned(), t);
        t
    }

    fn next_type(&self) -> TokenType {
        self.max_type() + 1
    }
}

/// Lowers a parsed CST into the semantic model, accumulating diagnostics.
///
/// The returned grammar is structurally complete even when diagnostics
/// carry errors; callers decide whether to proceed.
pub fn lower(root: &ast::Root, source: &str) -> (GrammarSource, Diagnostics) {
    let mut diags = Diagnostics::new();

    let (name, kind) = match root.grammar_decl() {
        Some(decl) => {
            let name = decl
                .name()
                .map(|t| t.text().to_owned())
                .unwrap_or_else(|| "<unnamed>".to_owned());
            let kind = if decl.is_lexer() {
                GrammarKind::LexerOnly
            } else if decl.is_parser() {
                GrammarKind::ParserOnly
            } else {
                GrammarKind::Combined
            };
            (name, kind)
        }
        None => {
            if !source.trim().is_empty() {
                diags
                    .error(
                        "missing grammar declaration",
                        TextRange::empty(TextSize::from(0)),
                    )
                    .emit();
            }
            ("<unnamed>".to_owned(), GrammarKind::Combined)
        }
    };

    let mut grammar = GrammarSource {
        name,
        kind,
        rules: IndexMap::new(),
        imports: Vec::new(),
        options: IndexMap::new(),
        named_actions: Vec::new(),
        declared_tokens: Vec::new(),
        declared_channels: Vec::new(),
        modes: vec!["DEFAULT_MODE".to_owned()],
        implicit_literals: Vec::new(),
        vocabulary: Vocabulary::default(),
    };

    let mut current_mode = 0usize;

    for item in root.items() {
        match item {
            ast::Item::Options(spec) => {
                if let Some(block) = spec.block() {
                    for (key, value) in split_key_values(block.text()) {
                        grammar.options.insert(key, value);
                    }
                }
            }
            ast::Item::Import(decl) => {
                for name in decl.names() {
                    grammar.imports.push(name.text().to_owned());
                }
            }
            ast::Item::Tokens(spec) => {
                if let Some(block) = spec.block() {
                    grammar
                        .declared_tokens
                        .extend(split_name_list(block.text()));
                }
            }
            ast::Item::Channels(spec) => {
                if let Some(block) = spec.block() {
                    grammar
                        .declared_channels
                        .extend(split_name_list(block.text()));
                }
            }
            ast::Item::NamedAction(action) => {
                let parts = action.name_parts();
                let (scope, name) = match parts.as_slice() {
                    [name] => (None, name.text().to_owned()),
                    [scope, name] => (Some(scope.text().to_owned()), name.text().to_owned()),
                    _ => (None, String::new()),
                };
                grammar.named_actions.push(NamedActionBlock {
                    scope,
                    name,
                    code: action.block().map(|b| b.text().to_owned()).unwrap_or_default(),
                    span: action.syntax().text_range(),
                });
            }
            ast::Item::Mode(decl) => {
                let span = decl.syntax().text_range();
                if grammar.kind != GrammarKind::LexerOnly {
                    diags
                        .error("'mode' sections are only allowed in lexer grammars", span)
                        .emit();
                }
                if let Some(name) = decl.name() {
                    match grammar.mode_id(name.text()) {
                        Some(_) => diags
                            .error(format!("duplicate mode '{}'", name.text()), span)
                            .emit(),
                        None => {
                            grammar.modes.push(name.text().to_owned());
                            current_mode = grammar.modes.len() - 1;
                        }
                    }
                }
            }
            ast::Item::Rule(rule_def) => {
                lower_rule(&rule_def, current_mode, &mut grammar, &mut diags);
            }
        }
    }

    build_vocabulary(&mut grammar);
    validate_rule_kinds(&grammar, &mut diags);

    (grammar, diags)
}

fn lower_rule(
    rule_def: &ast::RuleDef,
    mode: usize,
    grammar: &mut GrammarSource,
    diags: &mut Diagnostics,
) {
    let span = rule_def.syntax().text_range();
    let Some(name_token) = rule_def.name() else {
        return; // parser already reported the malformed header
    };
    let name = name_token.text().to_owned();
    let name_span = name_token.text_range();

    if name == "EOF" {
        diags
            .error("'EOF' is reserved and cannot be defined as a rule", name_span)
            .emit();
        return;
    }

    let starts_upper = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let kind = if rule_def.is_fragment() {
        if !starts_upper {
            diags
                .error(
                    format!("fragment rule '{name}' must start with an uppercase letter"),
                    name_span,
                )
                .emit();
        }
        RuleKind::Fragment
    } else if starts_upper {
        RuleKind::Lexer
    } else {
        RuleKind::Parser
    };

    if let Some(existing) = grammar.rules.get(&name) {
        diags
            .error(format!("duplicate rule '{name}'"), name_span)
            .related_to("first defined here", existing.span)
            .emit();
        return;
    }

    let alternatives = rule_def
        .alt_list()
        .map(|list| {
            list.alternatives()
                .map(|alt| lower_alternative(&alt, kind, diags))
                .collect()
        })
        .unwrap_or_default();

    let origin = grammar.name.clone();
    grammar.rules.insert(
        name.clone(),
        Rule {
            name,
            kind,
            alternatives,
            span,
            mode,
            origin,
        },
    );
}

fn lower_alternative(
    alt: &ast::Alternative,
    rule_kind: RuleKind,
    diags: &mut Diagnostics,
) -> Alternative {
    let elements = alt
        .elements()
        .filter_map(|e| lower_element(&e, diags))
        .collect();

    let label = alt
        .label()
        .and_then(|l| l.name())
        .map(|t| t.text().to_owned());

    let mut commands = Vec::new();
    if let Some(cmds) = alt.commands() {
        if rule_kind == RuleKind::Parser {
            diags
                .error(
                    "'->' commands are only allowed in lexer rules",
                    cmds.syntax().text_range(),
                )
                .emit();
        } else {
            for cmd in cmds.commands() {
                if let Some(parsed) = lower_command(&cmd, diags) {
                    commands.push(parsed);
                }
            }
        }
    }

    Alternative {
        elements,
        label,
        commands,
    }
}

fn lower_command(cmd: &ast::Command, diags: &mut Diagnostics) -> Option<LexerCommand> {
    let span = cmd.syntax().text_range();
    let name = cmd.name()?;
    let arg = cmd.arg().map(|t| t.text().to_owned());

    let parsed = match (name.text(), arg) {
        ("skip", None) => LexerCommand::Skip,
        ("more", None) => LexerCommand::More,
        ("popMode", None) => LexerCommand::PopMode,
        ("channel", Some(arg)) => LexerCommand::Channel(arg),
        ("type", Some(arg)) => LexerCommand::Type(arg),
        ("mode", Some(arg)) => LexerCommand::Mode(arg),
        ("pushMode", Some(arg)) => LexerCommand::PushMode(arg),
        (other, _) => {
            diags
                .error(format!("unknown or malformed lexer command '{other}'"), span)
                .emit();
            return None;
        }
    };
    Some(parsed)
}

fn lower_element(element: &ast::Element, diags: &mut Diagnostics) -> Option<Element> {
    let span = element.syntax().text_range();
    let lowered = match element {
        ast::Element::RuleRef(node) => Element::RuleRef {
            name: node.name()?.text().to_owned(),
            span,
        },
        ast::Element::TokenRef(node) => Element::TokenRef {
            name: node.name()?.text().to_owned(),
            span,
        },
        ast::Element::Literal(node) => {
            let token = node.token()?;
            let text = unescape_literal(token.text(), token.text_range(), diags);
            if text.is_empty() {
                diags
                    .error("empty literal is not a valid token", span)
                    .emit();
                return None;
            }
            Element::Literal { text, span }
        }
        ast::Element::CharClass(node) => {
            let token = node.token()?;
            let set = parse_char_set(token.text(), token.text_range(), diags);
            Element::CharClass { set, span }
        }
        ast::Element::Wildcard(_) => Element::Wildcard { span },
        ast::Element::Range(node) => {
            let (left, right) = node.bounds();
            let left = left?;
            let right = right?;
            let from = single_char(&unescape_literal(left.text(), left.text_range(), diags));
            let to = single_char(&unescape_literal(right.text(), right.text_range(), diags));
            match (from, to) {
                (Some(from), Some(to)) if from <= to => Element::Range { from, to, span },
                _ => {
                    diags
                        .error("range bounds must be single characters in order", span)
                        .emit();
                    return None;
                }
            }
        }
        ast::Element::Not(node) => Element::Not {
            inner: Box::new(lower_element(&node.inner()?, diags)?),
            span,
        },
        ast::Element::Block(node) => {
            let alternatives = node
                .alt_list()
                .map(|list| {
                    list.alternatives()
                        // Nested blocks never carry lexer commands.
                        .map(|alt| lower_alternative(&alt, RuleKind::Fragment, diags))
                        .collect()
                })
                .unwrap_or_default();
            Element::Block { alternatives, span }
        }
        ast::Element::Quantifier(node) => {
            let inner = Box::new(lower_element(&node.inner()?, diags)?);
            let suffix = node.suffix()?;
            match suffix.kind() {
                SyntaxKind::Question => Element::Optional {
                    inner,
                    greedy: true,
                },
                SyntaxKind::QuestionQuestion => Element::Optional {
                    inner,
                    greedy: false,
                },
                SyntaxKind::Star => Element::Star {
                    inner,
                    greedy: true,
                },
                SyntaxKind::StarQuestion => Element::Star {
                    inner,
                    greedy: false,
                },
                SyntaxKind::Plus => Element::Plus {
                    inner,
                    greedy: true,
                },
                SyntaxKind::PlusQuestion => Element::Plus {
                    inner,
                    greedy: false,
                },
                _ => return None,
            }
        }
        ast::Element::Labeled(node) => Element::Labeled {
            label: node.label()?.text().to_owned(),
            is_list: node.is_list(),
            inner: Box::new(lower_element(&node.inner()?, diags)?),
        },
        ast::Element::Predicate(node) => Element::Predicate {
            code: node.body()?.text().to_owned(),
            span,
        },
        ast::Element::Action(node) => Element::Action {
            code: node.body()?.text().to_owned(),
            span,
        },
    };
    Some(lowered)
}

/// Assigns token types: non-fragment lexer rules in source order, then
/// `tokens {}` declarations, then implicit literals from parser rules.
pub fn build_vocabulary(grammar: &mut GrammarSource) {
    let mut vocab = Vocabulary::default();

    // Lexer rules first, in declaration order.
    let lexer_rules: Vec<String> = grammar
        .rules
        .values()
        .filter(|r| r.kind == RuleKind::Lexer)
        .map(|r| r.name.clone())
        .collect();
    for name in &lexer_rules {
        let t = vocab.add_name(name);
        // A rule of the shape `PLUS : '+' ;` also defines the literal.
        if let Some(text) = single_literal_definition(&grammar.rules[name]) {
            vocab.bind_literal(&text, t);
        }
    }

    for name in &grammar.declared_tokens {
        vocab.add_name(name);
    }

    // Implicit tokens from literals in parser rules, in encounter order.
    let mut implicit = Vec::new();
    for rule in grammar.rules.values() {
        if rule.kind != RuleKind::Parser {
            continue;
        }
        for alt in &rule.alternatives {
            for element in &alt.elements {
                collect_implicit_literals(element, &mut vocab, &mut implicit);
            }
        }
    }

    grammar.implicit_literals = implicit;
    grammar.vocabulary = vocab;
}

/// `RULE : 'literal' ;` (single alternative, single literal element,
/// commands permitted) defines the literal's token type.
fn single_literal_definition(rule: &Rule) -> Option<String> {
    if rule.alternatives.len() != 1 {
        return None;
    }
    match rule.alternatives[0].elements.as_slice() {
        [Element::Literal { text, .. }] => Some(text.clone()),
        _ => None,
    }
}

fn collect_implicit_literals(
    element: &Element,
    vocab: &mut Vocabulary,
    implicit: &mut Vec<(String, TokenType)>,
) {
    match element {
        Element::Literal { text, .. } => {
            if vocab.type_of_literal(text).is_none() {
                let t = vocab.add_literal(text);
                implicit.push((text.clone(), t));
            }
        }
        Element::Block { alternatives, .. } => {
            for alt in alternatives {
                for e in &alt.elements {
                    collect_implicit_literals(e, vocab, implicit);
                }
            }
        }
        Element::Optional { inner, .. }
        | Element::Star { inner, .. }
        | Element::Plus { inner, .. }
        | Element::Not { inner, .. }
        | Element::Labeled { inner, .. } => collect_implicit_literals(inner, vocab, implicit),
        _ => {}
    }
}

/// Grammar-kind vs rule-kind consistency.
fn validate_rule_kinds(grammar: &GrammarSource, diags: &mut Diagnostics) {
    for rule in grammar.rules.values() {
        match (grammar.kind, rule.kind) {
            (GrammarKind::LexerOnly, RuleKind::Parser) => {
                diags
                    .error(
                        format!("parser rule '{}' not allowed in a lexer grammar", rule.name),
                        rule.span,
                    )
                    .emit();
            }
            (GrammarKind::ParserOnly, RuleKind::Lexer | RuleKind::Fragment) => {
                diags
                    .error(
                        format!("lexer rule '{}' not allowed in a parser grammar", rule.name),
                        rule.span,
                    )
                    .emit();
            }
            _ => {}
        }
    }
}

/// Checks that every reference resolves to a defined rule. Runs after
/// import merging so host/imported rules are all visible.
pub fn check_references(grammar: &GrammarSource, diags: &mut Diagnostics) {
    for rule in grammar.rules.values() {
        for alt in &rule.alternatives {
            for element in &alt.elements {
                check_element_refs(element, rule, grammar, diags);
            }
        }
    }
}

fn check_element_refs(
    element: &Element,
    rule: &Rule,
    grammar: &GrammarSource,
    diags: &mut Diagnostics,
) {
    match element {
        Element::RuleRef { name, span } => {
            if rule.kind != RuleKind::Parser {
                diags
                    .error(
                        format!("lexer rule '{}' cannot reference parser rule '{name}'", rule.name),
                        *span,
                    )
                    .emit();
            } else if !grammar.rules.contains_key(name) {
                diags
                    .error(format!("reference to undefined rule '{name}'"), *span)
                    .emit();
            }
        }
        Element::TokenRef { name, span } => {
            if name == "EOF" {
                return;
            }
            let defined = match grammar.rules.get(name) {
                Some(target) => {
                    if rule.kind == RuleKind::Parser && target.kind == RuleKind::Fragment {
                        diags
                            .error(
                                format!("fragment rule '{name}' cannot be used in a parser rule"),
                                *span,
                            )
                            .emit();
                    }
                    true
                }
                None => grammar.declared_tokens.iter().any(|t| t == name),
            };
            if !defined {
                diags
                    .error(format!("reference to undefined token '{name}'"), *span)
                    .emit();
            }
        }
        Element::Block { alternatives, .. } => {
            for alt in alternatives {
                for e in &alt.elements {
                    check_element_refs(e, rule, grammar, diags);
                }
            }
        }
        Element::Optional { inner, .. }
        | Element::Star { inner, .. }
        | Element::Plus { inner, .. }
        | Element::Not { inner, .. }
        | Element::Labeled { inner, .. } => check_element_refs(inner, rule, grammar, diags),
        _ => {}
    }
}

/// Splits an `options`-style block `{ k = v ; ... }` into pairs.
fn split_key_values(block: &str) -> Vec<(String, String)> {
    let inner = block.trim_start_matches('{').trim_end_matches('}');
    inner
        .split(';')
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let key = key.trim();
            let value = value.trim().trim_matches('\'');
            (!key.is_empty()).then(|| (key.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Splits a `tokens`/`channels` block `{ A, B }` into names.
fn split_name_list(block: &str) -> Vec<String> {
    let inner = block.trim_start_matches('{').trim_end_matches('}');
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Unescapes a quoted `'...'` literal.
fn unescape_literal(raw: &str, span: TextRange, diags: &mut Diagnostics) -> String {
    let inner = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{000C}'),
            Some('b') => out.push('\u{0008}'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('u') => match parse_unicode_escape(&mut chars) {
                Some(c) => out.push(c),
                None => diags.error("invalid unicode escape", span).emit(),
            },
            Some(other) => out.push(other),
            None => diags.error("dangling escape in literal", span).emit(),
        }
    }
    out
}

fn parse_unicode_escape(chars: &mut std::str::Chars<'_>) -> Option<char> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Parses `[...]` char-set syntax into sorted ranges.
fn parse_char_set(raw: &str, span: TextRange, diags: &mut Diagnostics) -> CharClassSet {
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(raw);

    // First decode escapes into a flat char list.
    let mut decoded: Vec<char> = Vec::new();
    let mut chars = inner.chars();
    // Positions in `decoded` that came from an escape (so `\-` is literal).
    let mut escaped: Vec<bool> = Vec::new();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            escaped.push(false);
            continue;
        }
        let decoded_char = match chars.next() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('f') => '\u{000C}',
            Some('b') => '\u{0008}',
            Some('u') => match parse_unicode_escape(&mut chars) {
                Some(c) => c,
                None => {
                    diags.error("invalid unicode escape in char set", span).emit();
                    continue;
                }
            },
            Some(other) => other, // \] \\ \- \' and friends
            None => {
                diags.error("dangling escape in char set", span).emit();
                continue;
            }
        };
        decoded.push(decoded_char);
        escaped.push(true);
    }

    // Then fold `a-z` triples into ranges.
    let mut ranges: Vec<(char, char)> = Vec::new();
    let mut i = 0;
    while i < decoded.len() {
        let lo = decoded[i];
        if i + 2 < decoded.len() && decoded[i + 1] == '-' && !escaped[i + 1] {
            let hi = decoded[i + 2];
            if lo <= hi {
                ranges.push((lo, hi));
            } else {
                diags
                    .error(format!("invalid char range '{lo}-{hi}'"), span)
                    .emit();
            }
            i += 3;
        } else {
            ranges.push((lo, lo));
            i += 1;
        }
    }

    ranges.sort_unstable();
    CharClassSet { ranges }
}
