//! Typed directed-graph structure with DOT and Mermaid writers.
//!
//! Renderers build a `Digraph` and serialize it, instead of concatenating
//! strings ad hoc: every node is declared before any edge references it,
//! node ids are unique, and all labels pass through one escape path.

use indexmap::IndexMap;
use std::fmt::Write;

/// Visual shape hint for DOT output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeShape {
    #[default]
    Circle,
    DoubleCircle,
    Box,
    Diamond,
}

impl NodeShape {
    fn dot_name(self) -> &'static str {
        match self {
            NodeShape::Circle => "circle",
            NodeShape::DoubleCircle => "doublecircle",
            NodeShape::Box => "box",
            NodeShape::Diamond => "diamond",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub label: String,
    pub shape: NodeShape,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// A directed graph with stable node order.
#[derive(Debug, Clone, Default)]
pub struct Digraph {
    pub name: String,
    /// Nodes keyed by id; insertion order is declaration order.
    nodes: IndexMap<String, Node>,
    edges: Vec<Edge>,
}

impl Digraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a node; the first declaration of an id wins.
    pub fn node(&mut self, id: impl Into<String>, label: impl Into<String>, shape: NodeShape) {
        self.nodes.entry(id.into()).or_insert_with(|| Node {
            label: label.into(),
            shape,
        });
    }

    pub fn edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            label: None,
        });
    }

    pub fn labeled_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            label: Some(label.into()),
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// DOT serialization: all nodes first, then edges.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        writeln!(out, "digraph {} {{", sanitize_id(&self.name)).unwrap();
        writeln!(out, "  rankdir=LR;").unwrap();
        for (id, node) in &self.nodes {
            writeln!(
                out,
                "  {} [label=\"{}\", shape={}];",
                sanitize_id(id),
                escape_dot(&node.label),
                node.shape.dot_name()
            )
            .unwrap();
        }
        for edge in &self.edges {
            match &edge.label {
                Some(label) => writeln!(
                    out,
                    "  {} -> {} [label=\"{}\"];",
                    sanitize_id(&edge.from),
                    sanitize_id(&edge.to),
                    escape_dot(label)
                )
                .unwrap(),
                None => writeln!(
                    out,
                    "  {} -> {};",
                    sanitize_id(&edge.from),
                    sanitize_id(&edge.to)
                )
                .unwrap(),
            }
        }
        out.push_str("}\n");
        out
    }

    /// Mermaid `stateDiagram-v2` serialization, used for ATN renderings.
    pub fn to_mermaid_states(&self) -> String {
        let mut out = String::from("stateDiagram-v2\n");
        for (id, node) in &self.nodes {
            writeln!(
                out,
                "    {}: {}",
                sanitize_id(id),
                escape_mermaid(&node.label)
            )
            .unwrap();
        }
        for edge in &self.edges {
            match &edge.label {
                Some(label) => writeln!(
                    out,
                    "    {} --> {}: {}",
                    sanitize_id(&edge.from),
                    sanitize_id(&edge.to),
                    escape_mermaid(label)
                )
                .unwrap(),
                None => writeln!(
                    out,
                    "    {} --> {}",
                    sanitize_id(&edge.from),
                    sanitize_id(&edge.to)
                )
                .unwrap(),
            }
        }
        out
    }

    /// Mermaid `graph LR` serialization, used for call graphs.
    pub fn to_mermaid_flow(&self) -> String {
        let mut out = String::from("graph LR\n");
        for (id, node) in &self.nodes {
            writeln!(
                out,
                "    {}[\"{}\"]",
                sanitize_id(id),
                escape_mermaid(&node.label)
            )
            .unwrap();
        }
        for edge in &self.edges {
            writeln!(
                out,
                "    {} --> {}",
                sanitize_id(&edge.from),
                sanitize_id(&edge.to)
            )
            .unwrap();
        }
        out
    }
}

/// Restricts an id to DOT/Mermaid-safe characters.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn escape_dot(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_mermaid(label: &str) -> String {
    label
        .replace('"', "#quot;")
        .replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_precede_edges_in_dot() {
        let mut graph = Digraph::new("t");
        graph.node("a", "start", NodeShape::Circle);
        graph.node("b", "end", NodeShape::DoubleCircle);
        graph.labeled_edge("a", "b", "go");
        let dot = graph.to_dot();
        let node_pos = dot.find("a [label").unwrap();
        let edge_pos = dot.find("a -> b").unwrap();
        assert!(node_pos < edge_pos);
        assert!(dot.contains("shape=doublecircle"));
    }

    #[test]
    fn labels_are_escaped() {
        let mut graph = Digraph::new("t");
        graph.node("n0", "say \"hi\"\nnow", NodeShape::Box);
        let dot = graph.to_dot();
        assert!(dot.contains("say \\\"hi\\\"\\nnow"));
    }

    #[test]
    fn duplicate_node_ids_collapse() {
        let mut graph = Digraph::new("t");
        graph.node("x", "first", NodeShape::Circle);
        graph.node("x", "second", NodeShape::Circle);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.to_dot().contains("first"));
    }

    #[test]
    fn mermaid_flavors() {
        let mut graph = Digraph::new("calls");
        graph.node("expr", "expr", NodeShape::Box);
        graph.node("term", "term", NodeShape::Box);
        graph.edge("expr", "term");
        assert!(graph.to_mermaid_flow().starts_with("graph LR"));
        assert!(graph.to_mermaid_states().starts_with("stateDiagram-v2"));
        assert!(graph.to_mermaid_flow().contains("expr --> term"));
    }
}
