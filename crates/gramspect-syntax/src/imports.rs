//! Import resolution with cycle detection.
//!
//! Follows `import X, Y;` declarations depth-first through a caller-supplied
//! lookup. Each node is in exactly one of {unvisited, on-stack, done};
//! entering an on-stack node is a cycle. Depth exhaustion and cycles are
//! distinct error kinds.
//!
//! Merging follows the ANTLR rule: a rule defined in the host grammar
//! overrides the same-named imported rule. Duplicate rule names across
//! sibling imports are rejected.

use indexmap::IndexMap;

use crate::diagnostics::Diagnostics;
use crate::model::{self, GrammarSource};
use crate::parser;

/// Errors that can abort import resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ImportError {
    /// The import graph closes a cycle. The chain starts at the main
    /// grammar and ends with the repeated name.
    #[error("circular import: {}", chain.join(" -> "))]
    CircularImport { chain: Vec<String> },

    #[error("import chain exceeds maximum depth {max_depth}")]
    MaxDepthExceeded {
        max_depth: usize,
        chain: Vec<String>,
    },

    #[error("imported grammar '{name}' not found")]
    NotFound { name: String },

    #[error("imported grammar '{name}' has {errors} errors")]
    InvalidImport { name: String, errors: usize },

    #[error("rule '{rule}' defined by both imported grammars '{first}' and '{second}'")]
    DuplicateAcrossImports {
        rule: String,
        first: String,
        second: String,
    },
}

/// A grammar with all imports merged in.
#[derive(Debug)]
pub struct ResolvedGrammar {
    pub grammar: GrammarSource,
    /// Reference-check diagnostics over the merged rule namespace.
    pub diagnostics: Diagnostics,
    /// Imported grammar names in topological order (dependencies first).
    pub order: Vec<String>,
}

/// Resolves all imports of `main` and merges them into its namespace.
///
/// `lookup` maps a grammar name to its source text; returning `None`
/// fails resolution with [`ImportError::NotFound`]. Resolution is
/// idempotent: re-resolving a merged grammar changes nothing, because
/// host rules override imported ones.
pub fn resolve(
    main: GrammarSource,
    lookup: &mut dyn FnMut(&str) -> Option<String>,
    max_depth: usize,
) -> Result<ResolvedGrammar, ImportError> {
    let mut resolver = Resolver {
        lookup,
        max_depth,
        done: IndexMap::new(),
        stack: vec![main.name.clone()],
        order: Vec::new(),
    };

    let mut host = main;
    resolver.resolve_into(&mut host, 1)?;

    model::build_vocabulary(&mut host);
    let mut diagnostics = Diagnostics::new();
    model::check_references(&host, &mut diagnostics);

    Ok(ResolvedGrammar {
        grammar: host,
        diagnostics,
        order: resolver.order,
    })
}

struct Resolver<'a> {
    lookup: &'a mut dyn FnMut(&str) -> Option<String>,
    max_depth: usize,
    /// Fully resolved imports, cached per request scope.
    done: IndexMap<String, GrammarSource>,
    /// DFS chain, main grammar first.
    stack: Vec<String>,
    /// Post-order reversal of the DFS: dependencies before dependents.
    order: Vec<String>,
}

impl Resolver<'_> {
    /// Resolves `host`'s imports (at `depth` edges from the main grammar)
    /// and merges them into `host`.
    fn resolve_into(&mut self, host: &mut GrammarSource, depth: usize) -> Result<(), ImportError> {
        for import_name in host.imports.clone() {
            let imported = self.visit(&import_name, depth)?;
            merge(host, &imported)?;
        }
        Ok(())
    }

    fn visit(&mut self, name: &str, depth: usize) -> Result<GrammarSource, ImportError> {
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut chain: Vec<String> = self.stack[pos..].to_vec();
            chain.push(name.to_owned());
            return Err(ImportError::CircularImport { chain });
        }
        if let Some(done) = self.done.get(name) {
            return Ok(done.clone());
        }
        if depth > self.max_depth {
            let mut chain = self.stack.clone();
            chain.push(name.to_owned());
            return Err(ImportError::MaxDepthExceeded {
                max_depth: self.max_depth,
                chain,
            });
        }

        let text = (self.lookup)(name).ok_or_else(|| ImportError::NotFound {
            name: name.to_owned(),
        })?;
        let (mut grammar, diagnostics) = crate::parse_grammar(&text);
        if diagnostics.has_errors() {
            return Err(ImportError::InvalidImport {
                name: name.to_owned(),
                errors: diagnostics.error_count(),
            });
        }

        self.stack.push(name.to_owned());
        self.resolve_into(&mut grammar, depth + 1)?;
        self.stack.pop();

        self.order.push(name.to_owned());
        self.done.insert(name.to_owned(), grammar.clone());
        Ok(grammar)
    }
}

/// Merges `imported` into `host`. Host rules win; two distinct imported
/// definitions of the same rule are an error. Rules keep their `origin`,
/// so the same rule arriving twice through a diamond is not a collision.
fn merge(host: &mut GrammarSource, imported: &GrammarSource) -> Result<(), ImportError> {
    // Merge modes first; imported rules carry mode indices that must be
    // remapped into the host's table.
    let mut mode_remap = Vec::with_capacity(imported.modes.len());
    for mode in &imported.modes {
        let id = match host.modes.iter().position(|m| m == mode) {
            Some(id) => id,
            None => {
                host.modes.push(mode.clone());
                host.modes.len() - 1
            }
        };
        mode_remap.push(id);
    }

    for (name, rule) in &imported.rules {
        if let Some(existing) = host.rules.get(name) {
            // Host's own rule overrides; an identical-origin rule arrived
            // through another path of the import graph.
            if existing.origin == host.name || existing.origin == rule.origin {
                continue;
            }
            return Err(ImportError::DuplicateAcrossImports {
                rule: name.clone(),
                first: existing.origin.clone(),
                second: rule.origin.clone(),
            });
        }
        let mut rule = rule.clone();
        rule.mode = mode_remap.get(rule.mode).copied().unwrap_or(0);
        host.rules.insert(name.clone(), rule);
    }

    for token in &imported.declared_tokens {
        if !host.declared_tokens.contains(token) {
            host.declared_tokens.push(token.clone());
        }
    }
    for channel in &imported.declared_channels {
        if !host.declared_channels.contains(channel) {
            host.declared_channels.push(channel.clone());
        }
    }
    Ok(())
}
