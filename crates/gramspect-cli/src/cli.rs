//! Command-line definition. The binary takes no positional arguments:
//! it serves the JSON-RPC loop until stdin closes. The only flag points
//! at an optional JSON configuration file.

use clap::{Arg, Command};
use gramspect_lib::EngineConfig;

pub fn build_cli() -> Command {
    Command::new("gramspect")
        .about("ANTLR4 grammar analysis service over line-delimited JSON-RPC on stdio")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file (all keys optional)"),
        )
}

/// Loads the engine configuration, defaulting every missing key.
pub fn load_config(path: Option<&String>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config file '{path}': {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config file '{path}': {e}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_without_config() {
        let config = load_config(None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn reads_partial_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"parseTimeoutSeconds": 2}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.parse_timeout_seconds, 2);
        assert_eq!(config.max_import_depth, 10);
    }

    #[test]
    fn rejects_malformed_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn cli_accepts_no_positional_arguments() {
        assert!(
            build_cli()
                .try_get_matches_from(["gramspect", "stray"])
                .is_err()
        );
    }
}
