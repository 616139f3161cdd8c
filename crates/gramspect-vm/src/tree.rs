//! Parse trees produced by the parser interpreter.

use gramspect_syntax::TokenType;

/// A parse-tree node. Rule nodes own their children; terminals own their
/// text so the tree outlives the sample input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    Rule(RuleNode),
    Terminal(TerminalNode),
    /// Inserted or deleted token from error recovery.
    Error(ErrorNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNode {
    pub rule: u32,
    pub name: String,
    /// 1-based alternative number; original index for transformed
    /// left-recursive rules.
    pub alt: u32,
    pub children: Vec<ParseTree>,
    /// First token index covered.
    pub start_token: usize,
    /// One past the last token index covered; equals `start_token` for an
    /// empty match.
    pub stop_token: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalNode {
    pub token_type: TokenType,
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub start: usize,
    pub stop: usize,
    pub token_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub text: String,
    pub token_index: usize,
}

impl ParseTree {
    /// The rule node, when this is one.
    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            ParseTree::Rule(node) => Some(node),
            _ => None,
        }
    }

    /// Depth-first search for a rule node by name.
    pub fn find_rule(&self, name: &str) -> Option<&RuleNode> {
        match self {
            ParseTree::Rule(node) => {
                if node.name == name {
                    return Some(node);
                }
                node.children.iter().find_map(|c| c.find_rule(name))
            }
            _ => None,
        }
    }

    /// All rule nodes with the given name, pre-order.
    pub fn rules_named<'t>(&'t self, name: &str, out: &mut Vec<&'t RuleNode>) {
        if let ParseTree::Rule(node) = self {
            if node.name == name {
                out.push(node);
            }
            for child in &node.children {
                child.rules_named(name, out);
            }
        }
    }

    /// Concatenated terminal texts in pre-order, error nodes excluded.
    pub fn leaf_text(&self) -> String {
        let mut out = String::new();
        self.collect_leaf_text(&mut out);
        out
    }

    fn collect_leaf_text(&self, out: &mut String) {
        match self {
            ParseTree::Rule(node) => {
                for child in &node.children {
                    child.collect_leaf_text(out);
                }
            }
            ParseTree::Terminal(t) => {
                if t.token_type != gramspect_syntax::TOKEN_EOF {
                    out.push_str(&t.text);
                }
            }
            ParseTree::Error(_) => {}
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            ParseTree::Rule(node) => 1 + node.children.iter().map(ParseTree::size).sum::<usize>(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str, index: usize) -> ParseTree {
        ParseTree::Terminal(TerminalNode {
            token_type: 1,
            text: text.to_owned(),
            line: 1,
            column: 0,
            start: 0,
            stop: text.len(),
            token_index: index,
        })
    }

    #[test]
    fn find_and_collect() {
        let tree = ParseTree::Rule(RuleNode {
            rule: 0,
            name: "expr".into(),
            alt: 1,
            children: vec![
                leaf("1", 0),
                ParseTree::Rule(RuleNode {
                    rule: 0,
                    name: "expr".into(),
                    alt: 2,
                    children: vec![leaf("2", 1)],
                    start_token: 1,
                    stop_token: 2,
                }),
            ],
            start_token: 0,
            stop_token: 2,
        });

        assert_eq!(tree.leaf_text(), "12");
        assert_eq!(tree.size(), 4);
        let mut found = Vec::new();
        tree.rules_named("expr", &mut found);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].alt, 1);
    }
}
