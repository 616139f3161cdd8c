//! ASCII tree rendering of parse trees.

use gramspect_vm::ParseTree;

/// Renders a parse tree as an indented ASCII tree.
pub fn render_ascii(tree: &ParseTree) -> String {
    let mut out = String::new();
    write_node(tree, "", true, true, &mut out);
    out
}

fn write_node(tree: &ParseTree, prefix: &str, is_last: bool, is_root: bool, out: &mut String) {
    let (connector, child_prefix) = if is_root {
        ("", String::new())
    } else if is_last {
        ("└── ", format!("{prefix}    "))
    } else {
        ("├── ", format!("{prefix}│   "))
    };

    out.push_str(prefix);
    out.push_str(connector);
    match tree {
        ParseTree::Rule(node) => {
            out.push_str(&node.name);
            out.push('\n');
            let count = node.children.len();
            for (i, child) in node.children.iter().enumerate() {
                write_node(child, &child_prefix, i + 1 == count, false, out);
            }
        }
        ParseTree::Terminal(terminal) => {
            if terminal.token_type == gramspect_syntax::TOKEN_EOF {
                out.push_str("<EOF>");
            } else {
                out.push('\'');
                out.push_str(&terminal.text);
                out.push('\'');
            }
            out.push('\n');
        }
        ParseTree::Error(error) => {
            out.push_str("<error: ");
            out.push_str(&error.text);
            out.push_str(">\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use gramspect_vm::{RuleNode, TerminalNode};

    use super::*;

    #[test]
    fn renders_branches() {
        let tree = ParseTree::Rule(RuleNode {
            rule: 0,
            name: "expr".to_owned(),
            alt: 1,
            children: vec![
                ParseTree::Terminal(TerminalNode {
                    token_type: 1,
                    text: "1".to_owned(),
                    line: 1,
                    column: 0,
                    start: 0,
                    stop: 1,
                    token_index: 0,
                }),
                ParseTree::Terminal(TerminalNode {
                    token_type: 2,
                    text: "+".to_owned(),
                    line: 1,
                    column: 1,
                    start: 1,
                    stop: 2,
                    token_index: 1,
                }),
            ],
            start_token: 0,
            stop_token: 2,
        });
        insta::assert_snapshot!(render_ascii(&tree), @r"
        expr
        ├── '1'
        └── '+'
        ");
    }
}
