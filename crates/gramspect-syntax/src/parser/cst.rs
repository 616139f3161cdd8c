//! Syntax kinds for ANTLR4 grammar files.
//!
//! `SyntaxKind` serves dual roles: token kinds (from lexer) and node kinds (from parser).
//! Logos derives token recognition; node kinds lack token/regex attributes.
//! `G4Lang` implements Rowan's `Language` trait for tree construction.

use logos::Logos;
use rowan::Language;

use super::lexer::lex_action_block;

/// All token and node kinds. Tokens first, then nodes, then `__LAST` sentinel.
/// `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    #[token(";")]
    Semi = 0,

    /// `::` in qualified action names (`@parser::members`). Defined before
    /// `Colon` for correct precedence.
    #[token("::")]
    ColonColon,

    #[token(":")]
    Colon,

    #[token("|")]
    Pipe,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token("=")]
    Assign,

    #[token("+=")]
    PlusAssign,

    #[token("->")]
    Arrow,

    /// `..` in lexer char ranges (`'a'..'z'`)
    #[token("..")]
    DotDot,

    #[token(".")]
    Dot,

    #[token("~")]
    Tilde,

    #[token(",")]
    Comma,

    #[token("@")]
    At,

    #[token("#")]
    Pound,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    /// Non-greedy `*?` suffix
    #[token("*?")]
    StarQuestion,

    /// Non-greedy `+?` suffix
    #[token("+?")]
    PlusQuestion,

    /// Non-greedy `??` suffix
    #[token("??")]
    QuestionQuestion,

    #[token("grammar")]
    KwGrammar,

    #[token("lexer")]
    KwLexer,

    #[token("parser")]
    KwParser,

    #[token("fragment")]
    KwFragment,

    #[token("import")]
    KwImport,

    #[token("options")]
    KwOptions,

    #[token("tokens")]
    KwTokens,

    #[token("channels")]
    KwChannels,

    #[token("mode")]
    KwMode,

    /// Token or lexer-rule name. Defined after keywords so they take precedence.
    #[regex(r"[A-Z][a-zA-Z0-9_]*")]
    UpperIdent,

    /// Parser-rule name, label, or lexer command.
    #[regex(r"[a-z][a-zA-Z0-9_]*")]
    LowerIdent,

    /// Channel number argument.
    #[regex(r"[0-9]+")]
    Int,

    /// Single-quoted literal with escapes. Unterminated literals fail to
    /// match and fall into `Garbage`.
    #[regex(r"'(?:[^'\\\r\n]|\\.)*'")]
    StringLit,

    /// Character set `[...]` with escapes.
    #[regex(r"\[(?:[^\]\\\r\n]|\\.)*\]")]
    CharSet,

    /// `{...}` action or predicate body, captured whole by a nesting-aware
    /// callback (honors string/char literals and comments inside).
    #[token("{", lex_action_block)]
    ActionBlock,

    #[regex(r"[ \t]+")]
    Whitespace,

    #[token("\n")]
    #[token("\r\n")]
    Newline,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*[^/])*\*/")]
    BlockComment,

    /// Coalesced unrecognized characters
    Garbage,
    Error,

    // --- Node kinds (non-terminals) ---
    Root,
    GrammarDecl,
    OptionsSpec,
    ImportDecl,
    TokensSpec,
    ChannelsSpec,
    NamedAction,
    ModeDecl,
    RuleDef,
    AltList,
    Alternative,
    AltLabel,
    LexerCommands,
    Command,
    Labeled,
    Quantifier,
    Block,
    NotExpr,
    RangeExpr,
    RuleRef,
    TokenRef,
    Literal,
    CharClass,
    Wildcard,
    PredicateElement,
    ActionElement,

    // Must be last - used for bounds checking in `kind_from_raw`
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Newline | LineComment | BlockComment)
    }

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Error | Garbage)
    }

    /// Token can start a rule element.
    #[inline]
    pub fn is_element_start(self) -> bool {
        token_sets::ELEMENT_FIRST.contains(self)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum G4Lang {}

impl Language for G4Lang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: We've verified the value is in bounds, and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for Rowan types parameterized by our language.
pub type SyntaxNode = rowan::SyntaxNode<G4Lang>;
pub type SyntaxToken = rowan::SyntaxToken<G4Lang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// 64-bit bitset of `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u64);

impl TokenSet {
    /// Creates an empty token set.
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 64.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn single(kind: SyntaxKind) -> Self {
        let kind = kind as u16;
        assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
        TokenSet(1 << kind)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 64 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..64u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute::<u16, SyntaxKind>(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    /// FIRST set of a rule element.
    pub const ELEMENT_FIRST: TokenSet = TokenSet::new(&[
        UpperIdent,
        LowerIdent,
        StringLit,
        CharSet,
        Dot,
        Tilde,
        ParenOpen,
        ActionBlock,
    ]);

    /// EBNF suffixes that can follow an element.
    pub const SUFFIXES: TokenSet = TokenSet::new(&[
        Question,
        Star,
        Plus,
        StarQuestion,
        PlusQuestion,
        QuestionQuestion,
    ]);

    pub const TRIVIA: TokenSet = TokenSet::new(&[Whitespace, Newline, LineComment, BlockComment]);

    /// Tokens that can begin a top-level declaration.
    pub const DECL_FIRST: TokenSet = TokenSet::new(&[
        KwOptions, KwImport, KwTokens, KwChannels, KwMode, KwFragment, At, UpperIdent, LowerIdent,
    ]);

    /// Recovery inside a parenthesized block.
    pub const BLOCK_RECOVERY: TokenSet = TokenSet::new(&[ParenClose, Semi]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_set_contains() {
        let set = TokenSet::new(&[ParenOpen, ParenClose, Star]);
        assert!(set.contains(ParenOpen));
        assert!(set.contains(ParenClose));
        assert!(set.contains(Star));
        assert!(!set.contains(Plus));
        assert!(!set.contains(Colon));
    }

    #[test]
    fn token_set_union() {
        let a = TokenSet::new(&[Semi, Colon]);
        let b = TokenSet::new(&[Star, Plus]);
        let c = a.union(b);
        assert!(c.contains(Semi));
        assert!(c.contains(Plus));
        assert!(!c.contains(Pipe));
    }

    #[test]
    fn trivia_classification() {
        assert!(Whitespace.is_trivia());
        assert!(Newline.is_trivia());
        assert!(LineComment.is_trivia());
        assert!(BlockComment.is_trivia());
        assert!(!Semi.is_trivia());
        assert!(!Garbage.is_trivia());
    }

    #[test]
    fn element_first() {
        assert!(UpperIdent.is_element_start());
        assert!(ActionBlock.is_element_start());
        assert!(Tilde.is_element_start());
        assert!(!Pipe.is_element_start());
        assert!(!Semi.is_element_start());
    }
}
