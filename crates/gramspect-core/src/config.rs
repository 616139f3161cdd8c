//! Engine configuration.
//!
//! All fields carry serde defaults so a partial JSON config (or none at
//! all) yields a working engine. Key names follow the wire convention
//! (camelCase) used by the transport.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum accepted grammar text size, in megabytes.
    pub max_grammar_size_mb: u64,
    /// Maximum accepted sample input size, in megabytes.
    pub max_input_size_mb: u64,
    /// Wall-clock budget for grammar compilation (parse + ATN build).
    pub compilation_timeout_seconds: u64,
    /// Per-sample wall-clock budget for interpreter parses.
    pub parse_timeout_seconds: u64,
    /// Maximum depth of the `import` chain.
    pub max_import_depth: usize,
    pub cache: CacheConfig,
    pub resources: ResourceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_grammar_size_mb: 10,
            max_input_size_mb: 1,
            compilation_timeout_seconds: 30,
            parse_timeout_seconds: 5,
            max_import_depth: 10,
            cache: CacheConfig::default(),
            resources: ResourceConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Maximum grammar size in bytes.
    pub fn max_grammar_size_bytes(&self) -> usize {
        (self.max_grammar_size_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Maximum sample input size in bytes.
    pub fn max_input_size_bytes(&self) -> usize {
        (self.max_input_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

/// Content-addressed cache limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum entries per namespace before LRU eviction.
    pub max_size: usize,
    /// Per-entry time to live, in seconds.
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 128,
            ttl_seconds: 600,
        }
    }
}

/// File-system access policy for the import resolver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceConfig {
    /// Directories the grammar lookup may read from. Empty means no
    /// file-system access.
    pub allowed_paths: Vec<PathBuf>,
    /// Whether the lookup may search allowed paths for `<Name>.g4`
    /// without an explicit path argument.
    pub auto_discovery: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_grammar_size_mb, 10);
        assert_eq!(config.max_input_size_mb, 1);
        assert_eq!(config.compilation_timeout_seconds, 30);
        assert_eq!(config.parse_timeout_seconds, 5);
        assert_eq!(config.max_import_depth, 10);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_size, 128);
        assert_eq!(config.cache.ttl_seconds, 600);
        assert!(config.resources.allowed_paths.is_empty());
        assert!(!config.resources.auto_discovery);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"maxGrammarSizeMb": 2, "cache": {"enabled": false}}"#)
                .unwrap();
        assert_eq!(config.max_grammar_size_mb, 2);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_size, 128);
        assert_eq!(config.parse_timeout_seconds, 5);
    }

    #[test]
    fn size_limits_in_bytes() {
        let config = EngineConfig::default();
        assert_eq!(config.max_grammar_size_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.max_input_size_bytes(), 1024 * 1024);
    }
}
