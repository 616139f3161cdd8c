//! Error taxonomy for engine results.
//!
//! Every failure surfaced to a client is an [`ErrorDetail`]: a kind from
//! a closed set, a category, a human message, and static enrichment
//! (suggestion, example, documentation link) keyed by the kind. The
//! enrichment tables are total functions over [`ErrorKind`], so adding a
//! kind without its metadata fails to compile.

use serde::{Deserialize, Serialize};

/// Closed set of error kinds surfaced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    LeftRecursion,
    SyntaxError,
    UndefinedRule,
    TokenConflict,
    Ambiguity,
    SemanticError,
    ParseTimeout,
    ParseError,
    GrammarLoadError,
    ImportError,
    InvalidInput,
    InternalError,
    Cancelled,
}

/// Broad grouping used by clients to route errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Grammar,
    Parsing,
    Input,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A position in grammar or sample-input text. Lines are 1-based,
/// columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::LeftRecursion => "E001",
            ErrorKind::SyntaxError => "E002",
            ErrorKind::UndefinedRule => "E003",
            ErrorKind::TokenConflict => "E004",
            ErrorKind::Ambiguity => "E005",
            ErrorKind::SemanticError => "E006",
            ErrorKind::ParseTimeout => "E007",
            ErrorKind::ParseError => "E008",
            ErrorKind::GrammarLoadError => "E009",
            ErrorKind::ImportError => "E010",
            ErrorKind::InvalidInput => "E011",
            ErrorKind::InternalError => "E012",
            ErrorKind::Cancelled => "E013",
        }
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::LeftRecursion
            | ErrorKind::UndefinedRule
            | ErrorKind::TokenConflict
            | ErrorKind::SemanticError
            | ErrorKind::GrammarLoadError
            | ErrorKind::ImportError => ErrorCategory::Grammar,
            ErrorKind::SyntaxError => ErrorCategory::Grammar,
            ErrorKind::Ambiguity | ErrorKind::ParseTimeout | ErrorKind::ParseError => {
                ErrorCategory::Parsing
            }
            ErrorKind::InvalidInput => ErrorCategory::Input,
            ErrorKind::InternalError | ErrorKind::Cancelled => ErrorCategory::Internal,
        }
    }

    /// Static fix suggestion, when one exists for the kind.
    pub fn suggestion(self) -> Option<&'static str> {
        match self {
            ErrorKind::LeftRecursion => Some(
                "rewrite the rule using precedence climbing: list operator alternatives \
                 first (tightest binding first), then primary alternatives",
            ),
            ErrorKind::SyntaxError => {
                Some("check for a missing ';' at the end of the previous rule")
            }
            ErrorKind::UndefinedRule => Some(
                "define the referenced rule, fix its spelling, or import the grammar \
                 that defines it",
            ),
            ErrorKind::TokenConflict => Some(
                "reorder the lexer rules: the lexer resolves ties by source order, \
                 earlier rules win",
            ),
            ErrorKind::Ambiguity => Some(
                "refactor the conflicting alternatives so their lookahead sets do not \
                 overlap, or merge them into one alternative with optional parts",
            ),
            ErrorKind::ParseTimeout => Some(
                "reduce the sample input size or raise parseTimeoutSeconds; check the \
                 grammar for non-terminating token loops",
            ),
            ErrorKind::ParseError => {
                Some("compare the sample input against the start rule's expected tokens")
            }
            ErrorKind::ImportError => {
                Some("break the import cycle or reduce the import chain depth")
            }
            ErrorKind::InvalidInput => Some("reduce the input below the configured size limit"),
            ErrorKind::SemanticError
            | ErrorKind::GrammarLoadError
            | ErrorKind::InternalError
            | ErrorKind::Cancelled => None,
        }
    }

    /// Static example illustrating the fix.
    pub fn example(self) -> Option<&'static str> {
        match self {
            ErrorKind::LeftRecursion => {
                Some("expr : expr '*' expr | expr '+' expr | INT ; // transformed automatically")
            }
            ErrorKind::SyntaxError => Some("rule : alternative ; // note the trailing semicolon"),
            ErrorKind::UndefinedRule => Some("import Common; // or: missingRule : 'literal' ;"),
            ErrorKind::TokenConflict => Some("KEYWORD : 'if' ; ID : [a-z]+ ; // KEYWORD first"),
            _ => None,
        }
    }

    /// Static documentation reference.
    pub fn doc_link(self) -> &'static str {
        match self {
            ErrorKind::LeftRecursion => "https://gramspect.dev/docs/errors#left-recursion",
            ErrorKind::SyntaxError => "https://gramspect.dev/docs/errors#syntax-error",
            ErrorKind::UndefinedRule => "https://gramspect.dev/docs/errors#undefined-rule",
            ErrorKind::TokenConflict => "https://gramspect.dev/docs/errors#token-conflict",
            ErrorKind::Ambiguity => "https://gramspect.dev/docs/errors#ambiguity",
            ErrorKind::SemanticError => "https://gramspect.dev/docs/errors#semantic-error",
            ErrorKind::ParseTimeout => "https://gramspect.dev/docs/errors#parse-timeout",
            ErrorKind::ParseError => "https://gramspect.dev/docs/errors#parse-error",
            ErrorKind::GrammarLoadError => "https://gramspect.dev/docs/errors#grammar-load-error",
            ErrorKind::ImportError => "https://gramspect.dev/docs/errors#import-error",
            ErrorKind::InvalidInput => "https://gramspect.dev/docs/errors#invalid-input",
            ErrorKind::InternalError => "https://gramspect.dev/docs/errors#internal-error",
            ErrorKind::Cancelled => "https://gramspect.dev/docs/errors#cancelled",
        }
    }
}

/// A fully enriched error entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub code: String,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub documentation: String,
    pub severity: Severity,
}

impl ErrorDetail {
    /// Build an error-severity entry with the kind's static enrichment.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_owned(),
            category: kind.category(),
            message: message.into(),
            location: None,
            suggestion: kind.suggestion().map(str::to_owned),
            example: kind.example().map(str::to_owned),
            documentation: kind.doc_link().to_owned(),
            severity: Severity::Error,
        }
    }

    pub fn warning(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::new(kind, message)
        }
    }

    pub fn info(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::new(kind, message)
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if let Some(loc) = self.location {
            write!(f, " at {loc}")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ErrorDetail {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let kinds = [
            ErrorKind::LeftRecursion,
            ErrorKind::SyntaxError,
            ErrorKind::UndefinedRule,
            ErrorKind::TokenConflict,
            ErrorKind::Ambiguity,
            ErrorKind::SemanticError,
            ErrorKind::ParseTimeout,
            ErrorKind::ParseError,
            ErrorKind::GrammarLoadError,
            ErrorKind::ImportError,
            ErrorKind::InvalidInput,
            ErrorKind::InternalError,
            ErrorKind::Cancelled,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn new_fills_enrichment() {
        let detail = ErrorDetail::new(ErrorKind::LeftRecursion, "rule 'expr' is left-recursive");
        assert_eq!(detail.code, "E001");
        assert_eq!(detail.category, ErrorCategory::Grammar);
        assert!(detail.suggestion.as_deref().unwrap().contains("precedence"));
        assert!(detail.example.is_some());
        assert!(detail.documentation.ends_with("#left-recursion"));
        assert_eq!(detail.severity, Severity::Error);
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorKind::GrammarLoadError).unwrap();
        assert_eq!(json, r#""grammar-load-error""#);
    }

    #[test]
    fn display_includes_location() {
        let detail = ErrorDetail::new(ErrorKind::SyntaxError, "missing ';'")
            .at(SourceLocation::new(3, 14));
        assert_eq!(detail.to_string(), "error [E002] at 3:14: missing ';'");
    }
}
