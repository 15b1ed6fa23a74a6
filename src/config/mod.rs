use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::core::NestedLimits;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    /// Remote databases in priority order ("openchain", "4byte")
    pub sources: Vec<String>,
    /// Persisted lookups older than this are dropped and queried again
    pub max_age_days: Option<u32>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 3,
            sources: vec!["openchain".to_string(), "4byte".to_string()],
            max_age_days: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub structural_fallback: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            structural_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub abi_paths: Vec<String>,

    #[serde(default)]
    pub decoder_paths: Vec<String>,

    #[serde(default)]
    pub signatures: SignatureConfig,

    #[serde(default)]
    pub nested: NestedLimits,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Config {
    /// Configured ABI roots with `~/` expanded
    pub fn abi_roots(&self) -> Vec<PathBuf> {
        self.abi_paths.iter().filter_map(|p| expand_home(p)).collect()
    }

    pub fn decoder_roots(&self) -> Vec<PathBuf> {
        self.decoder_paths.iter().filter_map(|p| expand_home(p)).collect()
    }
}

/// Load the config file; a missing file yields defaults, a broken one is logged and ignored
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    parse(&content).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "ignoring unreadable config");
        Config::default()
    })
}

pub fn parse(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(content)
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("TXINSPECT_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

pub fn config_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("txinspect"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("txinspect"));
    }
    directories::ProjectDirs::from("io", "txinspect", "txinspect")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("txinspect"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("txinspect"));
    }
    directories::ProjectDirs::from("io", "txinspect", "txinspect")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn selector_cache_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("selectors.sqlite3"))
}

pub fn labels_db_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("labels.sqlite3"))
}

pub fn user_decoders_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("decoders"))
}

pub fn project_decoders_dir() -> PathBuf {
    PathBuf::from(".txinspect").join("decoders")
}

fn expand_home(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        let home = std::env::var_os("HOME").map(PathBuf::from)?;
        return Some(home.join(rest));
    }
    Some(PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = parse("").unwrap();
        assert!(config.signatures.enabled);
        assert_eq!(config.signatures.timeout_secs, 3);
        assert_eq!(config.signatures.sources, vec!["openchain", "4byte"]);
        assert_eq!(config.signatures.max_age_days, None);
        assert_eq!(config.nested, NestedLimits::default());
        assert!(config.catalog.structural_fallback);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse(
            r#"
abi_paths = ["./out", "  "]

[signatures]
enabled = false
max_age_days = 30

[nested]
max_depth = 2
"#,
        )
        .unwrap();

        assert!(!config.signatures.enabled);
        assert_eq!(config.signatures.max_age_days, Some(30));
        assert_eq!(config.signatures.timeout_secs, 3);
        assert_eq!(config.nested.max_depth, 2);
        assert_eq!(config.nested.max_nodes, 64);
        assert_eq!(config.abi_roots(), vec![PathBuf::from("./out")]);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(parse("abi_paths = 3").is_err());
    }
}
