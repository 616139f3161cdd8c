//! Typed AST wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors.
//! Cast is infallible for correct `SyntaxKind` - validation happens in the
//! model layer.

use super::cst::{SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

ast_node!(Root, Root);
ast_node!(GrammarDecl, GrammarDecl);
ast_node!(OptionsSpec, OptionsSpec);
ast_node!(ImportDecl, ImportDecl);
ast_node!(TokensSpec, TokensSpec);
ast_node!(ChannelsSpec, ChannelsSpec);
ast_node!(NamedAction, NamedAction);
ast_node!(ModeDecl, ModeDecl);
ast_node!(RuleDef, RuleDef);
ast_node!(AltList, AltList);
ast_node!(Alternative, Alternative);
ast_node!(AltLabel, AltLabel);
ast_node!(LexerCommands, LexerCommands);
ast_node!(Command, Command);
ast_node!(Labeled, Labeled);
ast_node!(Quantifier, Quantifier);
ast_node!(Block, Block);
ast_node!(NotExpr, NotExpr);
ast_node!(RangeExpr, RangeExpr);
ast_node!(RuleRef, RuleRef);
ast_node!(TokenRef, TokenRef);
ast_node!(Literal, Literal);
ast_node!(CharClass, CharClass);
ast_node!(Wildcard, Wildcard);
ast_node!(PredicateElement, PredicateElement);
ast_node!(ActionElement, ActionElement);

/// A top-level declaration following the grammar header, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Options(OptionsSpec),
    Import(ImportDecl),
    Tokens(TokensSpec),
    Channels(ChannelsSpec),
    NamedAction(NamedAction),
    Mode(ModeDecl),
    Rule(RuleDef),
}

impl Item {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::OptionsSpec => OptionsSpec::cast(node).map(Item::Options),
            SyntaxKind::ImportDecl => ImportDecl::cast(node).map(Item::Import),
            SyntaxKind::TokensSpec => TokensSpec::cast(node).map(Item::Tokens),
            SyntaxKind::ChannelsSpec => ChannelsSpec::cast(node).map(Item::Channels),
            SyntaxKind::NamedAction => NamedAction::cast(node).map(Item::NamedAction),
            SyntaxKind::ModeDecl => ModeDecl::cast(node).map(Item::Mode),
            SyntaxKind::RuleDef => RuleDef::cast(node).map(Item::Rule),
            _ => None,
        }
    }
}

/// One rule element: a primary, possibly labeled or quantified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    RuleRef(RuleRef),
    TokenRef(TokenRef),
    Literal(Literal),
    CharClass(CharClass),
    Wildcard(Wildcard),
    Range(RangeExpr),
    Not(NotExpr),
    Block(Block),
    Quantifier(Quantifier),
    Labeled(Labeled),
    Predicate(PredicateElement),
    Action(ActionElement),
}

impl Element {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::RuleRef => RuleRef::cast(node).map(Element::RuleRef),
            SyntaxKind::TokenRef => TokenRef::cast(node).map(Element::TokenRef),
            SyntaxKind::Literal => Literal::cast(node).map(Element::Literal),
            SyntaxKind::CharClass => CharClass::cast(node).map(Element::CharClass),
            SyntaxKind::Wildcard => Wildcard::cast(node).map(Element::Wildcard),
            SyntaxKind::RangeExpr => RangeExpr::cast(node).map(Element::Range),
            SyntaxKind::NotExpr => NotExpr::cast(node).map(Element::Not),
            SyntaxKind::Block => Block::cast(node).map(Element::Block),
            SyntaxKind::Quantifier => Quantifier::cast(node).map(Element::Quantifier),
            SyntaxKind::Labeled => Labeled::cast(node).map(Element::Labeled),
            SyntaxKind::PredicateElement => PredicateElement::cast(node).map(Element::Predicate),
            SyntaxKind::ActionElement => ActionElement::cast(node).map(Element::Action),
            _ => None,
        }
    }

    pub fn syntax(&self) -> &SyntaxNode {
        match self {
            Element::RuleRef(n) => n.syntax(),
            Element::TokenRef(n) => n.syntax(),
            Element::Literal(n) => n.syntax(),
            Element::CharClass(n) => n.syntax(),
            Element::Wildcard(n) => n.syntax(),
            Element::Range(n) => n.syntax(),
            Element::Not(n) => n.syntax(),
            Element::Block(n) => n.syntax(),
            Element::Quantifier(n) => n.syntax(),
            Element::Labeled(n) => n.syntax(),
            Element::Predicate(n) => n.syntax(),
            Element::Action(n) => n.syntax(),
        }
    }
}

fn first_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|t| t.kind() == kind)
}

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    first_token(node, kind).is_some()
}

fn name_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|t| matches!(t.kind(), SyntaxKind::UpperIdent | SyntaxKind::LowerIdent))
}

// --- Accessors ---

impl Root {
    pub fn grammar_decl(&self) -> Option<GrammarDecl> {
        self.0.children().find_map(GrammarDecl::cast)
    }

    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.0.children().filter_map(Item::cast)
    }

    pub fn rules(&self) -> impl Iterator<Item = RuleDef> + '_ {
        self.0.children().filter_map(RuleDef::cast)
    }
}

impl GrammarDecl {
    pub fn is_lexer(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwLexer)
    }

    pub fn is_parser(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwParser)
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }
}

impl OptionsSpec {
    pub fn block(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::ActionBlock)
    }
}

impl ImportDecl {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| matches!(t.kind(), SyntaxKind::UpperIdent | SyntaxKind::LowerIdent))
    }
}

impl TokensSpec {
    pub fn block(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::ActionBlock)
    }
}

impl ChannelsSpec {
    pub fn block(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::ActionBlock)
    }
}

impl NamedAction {
    /// Name parts: `@members` yields `["members"]`, `@parser::members`
    /// yields `["parser", "members"]`.
    pub fn name_parts(&self) -> Vec<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| matches!(t.kind(), SyntaxKind::UpperIdent | SyntaxKind::LowerIdent))
            .collect()
    }

    pub fn block(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::ActionBlock)
    }
}

impl ModeDecl {
    pub fn name(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }
}

impl RuleDef {
    pub fn is_fragment(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwFragment)
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }

    pub fn alt_list(&self) -> Option<AltList> {
        self.0.children().find_map(AltList::cast)
    }
}

impl AltList {
    pub fn alternatives(&self) -> impl Iterator<Item = Alternative> + '_ {
        self.0.children().filter_map(Alternative::cast)
    }
}

impl Alternative {
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        self.0.children().filter_map(Element::cast)
    }

    pub fn commands(&self) -> Option<LexerCommands> {
        self.0.children().find_map(LexerCommands::cast)
    }

    pub fn label(&self) -> Option<AltLabel> {
        self.0.children().find_map(AltLabel::cast)
    }
}

impl AltLabel {
    pub fn name(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }
}

impl LexerCommands {
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.0.children().filter_map(Command::cast)
    }
}

impl Command {
    pub fn name(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }

    pub fn arg(&self) -> Option<SyntaxToken> {
        let mut idents = self
            .0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::UpperIdent | SyntaxKind::LowerIdent | SyntaxKind::Int
                )
            });
        idents.next(); // command name
        idents.next()
    }
}

impl Labeled {
    pub fn label(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }

    /// True for `label += element` list labels.
    pub fn is_list(&self) -> bool {
        has_token(&self.0, SyntaxKind::PlusAssign)
    }

    pub fn inner(&self) -> Option<Element> {
        self.0.children().find_map(Element::cast)
    }
}

impl Quantifier {
    pub fn inner(&self) -> Option<Element> {
        self.0.children().find_map(Element::cast)
    }

    pub fn suffix(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::Question
                        | SyntaxKind::Star
                        | SyntaxKind::Plus
                        | SyntaxKind::QuestionQuestion
                        | SyntaxKind::StarQuestion
                        | SyntaxKind::PlusQuestion
                )
            })
    }
}

impl Block {
    pub fn alt_list(&self) -> Option<AltList> {
        self.0.children().find_map(AltList::cast)
    }
}

impl NotExpr {
    pub fn inner(&self) -> Option<Element> {
        self.0.children().find_map(Element::cast)
    }
}

impl RangeExpr {
    /// The two literal bounds, left then right.
    pub fn bounds(&self) -> (Option<SyntaxToken>, Option<SyntaxToken>) {
        let mut lits = self
            .0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| t.kind() == SyntaxKind::StringLit);
        (lits.next(), lits.next())
    }
}

impl RuleRef {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::LowerIdent)
    }
}

impl TokenRef {
    pub fn name(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::UpperIdent)
    }
}

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::StringLit)
    }
}

impl CharClass {
    pub fn token(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::CharSet)
    }
}

impl PredicateElement {
    pub fn body(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::ActionBlock)
    }
}

impl ActionElement {
    pub fn body(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::ActionBlock)
    }
}
