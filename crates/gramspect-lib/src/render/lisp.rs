//! LISP-form rendering of parse trees, plus a small reader for
//! round-trip checks.
//!
//! `(ruleName child1 child2 ...)`; terminals render as their literal
//! text, quote-escaped when they contain whitespace, parentheses, or
//! quotes; EOF renders as `<EOF>`. With rule indices enabled the head
//! becomes `ruleName:index`.

use gramspect_vm::{ParseTree, TerminalNode};

/// Renders a parse tree in LISP form.
pub fn render_lisp(tree: &ParseTree, with_rule_index: bool) -> String {
    let mut out = String::new();
    write_tree(tree, with_rule_index, &mut out);
    out
}

fn write_tree(tree: &ParseTree, with_rule_index: bool, out: &mut String) {
    match tree {
        ParseTree::Rule(node) => {
            out.push('(');
            out.push_str(&node.name);
            if with_rule_index {
                out.push(':');
                out.push_str(&node.rule.to_string());
            }
            for child in &node.children {
                out.push(' ');
                write_tree(child, with_rule_index, out);
            }
            out.push(')');
        }
        ParseTree::Terminal(terminal) => out.push_str(&render_terminal(terminal)),
        ParseTree::Error(error) => {
            out.push_str(&quote(&error.text));
        }
    }
}

fn render_terminal(terminal: &TerminalNode) -> String {
    if terminal.token_type == gramspect_syntax::TOKEN_EOF {
        return "<EOF>".to_owned();
    }
    if needs_quoting(&terminal.text) {
        quote(&terminal.text)
    } else {
        terminal.text.clone()
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"'))
}

fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// A value read back from LISP text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LispValue {
    /// `(head children...)`
    List {
        head: String,
        children: Vec<LispValue>,
    },
    Atom(String),
}

/// Converts a parse tree to the value its rendering reads back as.
pub fn to_lisp_value(tree: &ParseTree) -> LispValue {
    match tree {
        ParseTree::Rule(node) => LispValue::List {
            head: node.name.clone(),
            children: node.children.iter().map(to_lisp_value).collect(),
        },
        ParseTree::Terminal(terminal) => {
            if terminal.token_type == gramspect_syntax::TOKEN_EOF {
                LispValue::Atom("<EOF>".to_owned())
            } else {
                LispValue::Atom(terminal.text.clone())
            }
        }
        ParseTree::Error(error) => LispValue::Atom(error.text.clone()),
    }
}

/// Reads one LISP value. Fails on trailing garbage or malformed input.
pub fn read_lisp(text: &str) -> Result<LispValue, String> {
    let mut reader = Reader {
        chars: text.char_indices().peekable(),
        text,
    };
    let value = reader.read_value()?;
    reader.skip_whitespace();
    if reader.chars.peek().is_some() {
        return Err("trailing input after expression".to_owned());
    }
    Ok(value)
}

struct Reader<'t> {
    chars: std::iter::Peekable<std::str::CharIndices<'t>>,
    text: &'t str,
}

impl Reader<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn read_value(&mut self) -> Result<LispValue, String> {
        self.skip_whitespace();
        match self.chars.peek() {
            Some((_, '(')) => self.read_list(),
            Some((_, '"')) => self.read_quoted(),
            Some(_) => self.read_atom(),
            None => Err("unexpected end of input".to_owned()),
        }
    }

    fn read_list(&mut self) -> Result<LispValue, String> {
        self.chars.next(); // '('
        let head = match self.read_value()? {
            LispValue::Atom(head) => head,
            LispValue::List { .. } => return Err("list head must be an atom".to_owned()),
        };
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some((_, ')')) => {
                    self.chars.next();
                    return Ok(LispValue::List { head, children });
                }
                Some(_) => children.push(self.read_value()?),
                None => return Err("unterminated list".to_owned()),
            }
        }
    }

    fn read_quoted(&mut self) -> Result<LispValue, String> {
        self.chars.next(); // '"'
        let mut out = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => out.push(c),
                    None => return Err("dangling escape".to_owned()),
                },
                Some((_, '"')) => return Ok(LispValue::Atom(out)),
                Some((_, c)) => out.push(c),
                None => return Err("unterminated string".to_owned()),
            }
        }
    }

    fn read_atom(&mut self) -> Result<LispValue, String> {
        let start = match self.chars.peek() {
            Some(&(i, _)) => i,
            None => return Err("unexpected end of input".to_owned()),
        };
        let mut end = self.text.len();
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                end = i;
                break;
            }
            self.chars.next();
        }
        if self.chars.peek().is_none() {
            end = self.text.len();
        }
        Ok(LispValue::Atom(self.text[start..end].to_owned()))
    }
}
