//! Rule call graph: edges, cycles, reachability.

use gramspect_core::reports::CallGraphNode;
use gramspect_syntax::model::{Element, GrammarSource};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Call graph over all rules of a resolved grammar.
#[derive(Debug, Clone)]
pub struct CallGraph {
    pub start_rule: String,
    pub nodes: Vec<CallGraphNode>,
    /// Cycles normalized to their canonical rotation (smallest rule name
    /// first), deduplicated.
    pub cycles: Vec<Vec<String>>,
}

impl CallGraph {
    pub fn node(&self, rule: &str) -> Option<&CallGraphNode> {
        self.nodes.iter().find(|n| n.rule == rule)
    }
}

/// Builds the call graph. `start` defaults to the grammar's start rule.
pub fn call_graph(grammar: &GrammarSource, start: Option<&str>) -> CallGraph {
    let start_rule = start
        .map(str::to_owned)
        .or_else(|| grammar.default_start_rule().map(str::to_owned))
        .unwrap_or_default();

    // Outgoing edges, ordered and unique.
    let mut calls: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
    for rule in grammar.rules.values() {
        let entry = calls.entry(rule.name.as_str()).or_default();
        for alt in &rule.alternatives {
            for element in &alt.elements {
                collect_refs(element, grammar, entry);
            }
        }
    }

    let mut called_by: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
    for name in grammar.rules.keys() {
        called_by.entry(name.as_str()).or_default();
    }
    for (caller, callees) in &calls {
        for callee in callees {
            called_by.entry(callee).or_default().insert(caller);
        }
    }

    let cycles = find_cycles(grammar, &calls);
    let depths = bfs_depths(grammar, &calls, &start_rule);

    let in_cycle = |name: &str| cycles.iter().any(|c| c.iter().any(|r| r == name));

    let nodes = grammar
        .rules
        .values()
        .map(|rule| {
            let name = rule.name.as_str();
            let depth = depths.get(name).copied().unwrap_or(-1);
            CallGraphNode {
                rule: rule.name.clone(),
                kind: rule.kind,
                calls: calls[name].iter().map(|s| (*s).to_owned()).collect(),
                called_by: called_by[name].iter().map(|s| (*s).to_owned()).collect(),
                recursive: in_cycle(name),
                depth,
                unused: depth < 0,
            }
        })
        .collect();

    CallGraph {
        start_rule,
        nodes,
        cycles,
    }
}

fn collect_refs<'g>(
    element: &'g Element,
    grammar: &GrammarSource,
    out: &mut IndexSet<&'g str>,
) {
    match element {
        Element::RuleRef { name, .. } => {
            if grammar.rules.contains_key(name) {
                out.insert(name.as_str());
            }
        }
        Element::TokenRef { name, .. } => {
            if grammar.rules.contains_key(name) {
                out.insert(name.as_str());
            }
        }
        Element::Block { alternatives, .. } => {
            for alt in alternatives {
                for e in &alt.elements {
                    collect_refs(e, grammar, out);
                }
            }
        }
        Element::Optional { inner, .. }
        | Element::Star { inner, .. }
        | Element::Plus { inner, .. }
        | Element::Not { inner, .. }
        | Element::Labeled { inner, .. } => collect_refs(inner, grammar, out),
        _ => {}
    }
}

/// Iterative DFS with an explicit stack; every back edge yields a cycle.
fn find_cycles(
    grammar: &GrammarSource,
    calls: &IndexMap<&str, IndexSet<&str>>,
) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let names: Vec<&str> = grammar.rules.keys().map(String::as_str).collect();
    let mut color: IndexMap<&str, Color> =
        names.iter().map(|&n| (n, Color::White)).collect();
    let mut cycles: IndexSet<Vec<String>> = IndexSet::new();

    for &root in &names {
        if color[root] != Color::White {
            continue;
        }
        // (node, next child index to visit)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        let mut path: Vec<&str> = vec![root];
        color[root] = Color::Gray;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let child_index = frame.1;
            frame.1 += 1;
            let children = &calls[node];
            if let Some(&child) = children.get_index(child_index) {
                match color[child] {
                    Color::White => {
                        color[child] = Color::Gray;
                        stack.push((child, 0));
                        path.push(child);
                    }
                    Color::Gray => {
                        let from = path.iter().position(|&n| n == child).unwrap_or(0);
                        let cycle: Vec<String> =
                            path[from..].iter().map(|&n| n.to_owned()).collect();
                        cycles.insert(canonical_rotation(cycle));
                    }
                    Color::Black => {}
                }
            } else {
                color[node] = Color::Black;
                stack.pop();
                path.pop();
            }
        }
    }

    cycles.into_iter().collect()
}

/// Rotates a cycle so the lexicographically smallest rule comes first.
fn canonical_rotation(cycle: Vec<String>) -> Vec<String> {
    let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| name.as_str())
        .map(|(i, _)| i)
    else {
        return cycle;
    };
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[min_pos..]);
    rotated.extend_from_slice(&cycle[..min_pos]);
    rotated
}

/// BFS distance from the start rule; unreached rules stay at -1.
fn bfs_depths<'g>(
    grammar: &'g GrammarSource,
    calls: &IndexMap<&str, IndexSet<&str>>,
    start: &str,
) -> IndexMap<&'g str, i32> {
    let mut depths: IndexMap<&str, i32> = grammar
        .rules
        .keys()
        .map(|n| (n.as_str(), -1))
        .collect();
    let Some((_, &start, _)) = depths.get_full(start) else {
        return depths;
    };
    depths[start] = 0;
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        let next_depth = depths[node] + 1;
        for &callee in &calls[node] {
            if depths[callee] < 0 {
                depths[callee] = next_depth;
                queue.push_back(callee);
            }
        }
    }
    depths
}
