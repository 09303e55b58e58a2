//! Layered configuration.
//!
//! Defaults → `semgraph.toml` → environment variables. Environment
//! variables are prefixed with `SEMGRAPH_` and use double underscores for
//! nesting: `SEMGRAPH_INDEXING__MAX_CALL_DEPTH=20` sets
//! `indexing.max_call_depth`.

use crate::error::{IndexError, IndexResult};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Per-language overrides keyed by language config key.
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Worker threads for the per-file phase.
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Hard bound on call-chain DFS depth.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,

    /// Bound on re-export chain following during name resolution.
    #[serde(default = "default_max_export_chain_depth")]
    pub max_export_chain_depth: usize,

    /// Follow `export ... from` re-export chains across files.
    #[serde(default = "default_true")]
    pub follow_reexports: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extra file extensions mapped to this language.
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_max_call_depth() -> usize {
    10
}
fn default_max_export_chain_depth() -> usize {
    10
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            indexing: IndexingConfig::default(),
            languages: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            max_call_depth: default_max_call_depth(),
            max_export_chain_depth: default_max_export_chain_depth(),
            follow_reexports: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional `semgraph.toml`, and the
    /// environment.
    pub fn load() -> IndexResult<Self> {
        Self::load_from(Path::new("semgraph.toml"))
    }

    pub fn load_from(config_path: &Path) -> IndexResult<Self> {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SEMGRAPH_").split("__"))
            .extract()
            .map_err(|e| IndexError::ConfigError {
                reason: e.to_string(),
            })
    }

    /// Whether a language is enabled (enabled by default unless a config
    /// entry turns it off).
    pub fn language_enabled(&self, key: &str) -> bool {
        self.languages.get(key).map(|c| c.enabled).unwrap_or(true)
    }
}
