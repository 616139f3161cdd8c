//! File-system grammar lookup for the import resolver.
//!
//! Import resolution only sees a name-to-text callback; this module
//! supplies one restricted to `resources.allowedPaths`. Without
//! `autoDiscovery` (or with no allowed paths) the lookup denies
//! everything and imports fail with a not-found error.

use std::path::{Path, PathBuf};

use gramspect_core::ResourceConfig;

/// Builds the lookup closure for one request.
pub fn grammar_lookup(resources: &ResourceConfig) -> impl FnMut(&str) -> Option<String> + '_ {
    move |name: &str| {
        if !resources.auto_discovery || !valid_grammar_name(name) {
            return None;
        }
        for root in &resources.allowed_paths {
            let candidate = root.join(format!("{name}.g4"));
            if let Some(text) = read_inside(root, &candidate) {
                return Some(text);
            }
        }
        None
    }
}

/// Imported names come from grammar text; keep them from smuggling path
/// separators or traversal segments.
fn valid_grammar_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reads `candidate` only when its canonical form stays under `root`.
fn read_inside(root: &Path, candidate: &PathBuf) -> Option<String> {
    let canonical_root = root.canonicalize().ok()?;
    let canonical = candidate.canonicalize().ok()?;
    if !canonical.starts_with(&canonical_root) {
        return None;
    }
    std::fs::read_to_string(canonical).ok()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn resources(dir: &Path, auto: bool) -> ResourceConfig {
        ResourceConfig {
            allowed_paths: vec![dir.to_path_buf()],
            auto_discovery: auto,
        }
    }

    #[test]
    fn finds_grammar_in_allowed_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Common.g4"), "grammar Common; x : 'x' ;").unwrap();
        let config = resources(dir.path(), true);
        let mut lookup = grammar_lookup(&config);
        assert!(lookup("Common").is_some());
        assert!(lookup("Missing").is_none());
    }

    #[test]
    fn discovery_disabled_denies_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Common.g4"), "grammar Common; x : 'x' ;").unwrap();
        let config = resources(dir.path(), false);
        let mut lookup = grammar_lookup(&config);
        assert!(lookup("Common").is_none());
    }

    #[test]
    fn traversal_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = resources(dir.path(), true);
        let mut lookup = grammar_lookup(&config);
        assert!(lookup("../etc/passwd").is_none());
        assert!(lookup("a/b").is_none());
        assert!(lookup("").is_none());
    }
}
