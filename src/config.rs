//! Configuration loading and resolution.
//!
//! [`Config`] is the file structure; [`Settings`] is the resolved runtime
//! form with defaults applied and paths expanded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::llm::LlmConfig;
use crate::ocr::DEFAULT_OCR_TIMEOUT;
use crate::store::{StoreTag, TagId};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "docinbox.yaml";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
pub const DEFAULT_WORKERS: usize = 2;

/// Keys the UI binds to its own actions.
const RESERVED_KEYS: &[(&str, &str)] = &[
    ("1", "recent tag set 1"),
    ("2", "recent tag set 2"),
    ("3", "recent tag set 3"),
    ("d", "done/next"),
    ("u", "undo"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config: {message}")]
    Parse { format: &'static str, message: String },

    #[error("godocs_server must be set")]
    MissingServer,

    #[error("Invalid godocs_server URL '{url}': {message}")]
    InvalidServer { url: String, message: String },

    #[error("At least one tag shortcut must be configured")]
    NoShortcuts,

    #[error("Shortcut key '{0}' is defined more than once")]
    DuplicateKey(String),

    #[error("tag_id {tag_id} (key '{key}') not found on server")]
    UnknownTag { key: String, tag_id: TagId },

    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    #[error("Failed to write config: {0}")]
    Write(String),
}

/// A keyboard shortcut bound to a store tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutConfig {
    pub key: String,
    pub tag_id: TagId,
    /// Filled from the server at startup.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the godocs server.
    #[serde(default)]
    pub godocs_server: String,
    /// Listen address for the web server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    /// Tag shortcuts.
    #[serde(default, rename = "tags")]
    pub shortcuts: Vec<ShortcutConfig>,
    /// Ollama endpoint for date inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
    /// Ollama model for date inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama_model: Option<String>,
    /// Hi-res preview cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_dir: Option<String>,
    /// Directory for transient downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,
    /// Per-process OCR timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_timeout_secs: Option<u64>,
    /// Maximum queued background jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    /// Number of background workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file. The format follows the extension:
    /// TOML, YAML, or JSON (the fallback).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Checks that need no network access.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = self.godocs_server.trim();
        if server.is_empty() {
            return Err(ConfigError::MissingServer);
        }
        url::Url::parse(server).map_err(|e| ConfigError::InvalidServer {
            url: server.to_string(),
            message: e.to_string(),
        })?;

        if self.shortcuts.is_empty() {
            return Err(ConfigError::NoShortcuts);
        }
        for (i, s) in self.shortcuts.iter().enumerate() {
            if self.shortcuts[..i].iter().any(|prev| prev.key == s.key) {
                return Err(ConfigError::DuplicateKey(s.key.clone()));
            }
        }
        Ok(())
    }

    /// Example configuration written by `init`.
    pub fn example() -> Self {
        let shortcut = |key: &str, tag_id| ShortcutConfig {
            key: key.to_string(),
            tag_id,
            name: String::new(),
            color: String::new(),
        };
        Self {
            godocs_server: "http://localhost:8000".to_string(),
            addr: Some(DEFAULT_ADDR.to_string()),
            shortcuts: vec![
                shortcut("l", 18),
                shortcut("m", 20),
                shortcut("h", 13),
                shortcut("c", 10),
            ],
            ..Default::default()
        }
    }

    /// Write the example configuration to `path`. Never overwrites.
    pub fn write_example(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let body = serde_yaml::to_string(&Self::example())
            .map_err(|e| ConfigError::Write(e.to_string()))?;
        let header = "# docinbox configuration\n# Tag IDs come from your godocs server: GET /api/tags\n\n";
        std::fs::write(path, format!("{}{}", header, body))
            .map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Directory relative paths are resolved against: the config file's
    /// directory, or the working directory.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Expand `~` and resolve a relative path against `base_dir`.
pub fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Default hi-res preview cache directory.
pub fn default_thumb_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("docinbox")
        .join("thumbs")
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub godocs_server: String,
    pub addr: String,
    pub shortcuts: Vec<ShortcutConfig>,
    pub llm: LlmConfig,
    pub thumb_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub ocr_timeout: Duration,
    pub queue_capacity: usize,
    pub workers: usize,
    /// File the settings were loaded from, if any.
    pub config_source: Option<PathBuf>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        let base_dir = config.base_dir();
        let path_or = |value: &Option<String>, default: PathBuf| {
            value
                .as_deref()
                .map(|p| resolve_path(p, &base_dir))
                .unwrap_or(default)
        };

        Self {
            godocs_server: config.godocs_server.trim().trim_end_matches('/').to_string(),
            addr: config.addr.clone().unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            shortcuts: config.shortcuts.clone(),
            llm: LlmConfig {
                endpoint: config.ollama_url.clone(),
                model: config.ollama_model.clone(),
            },
            thumb_dir: path_or(&config.thumb_dir, default_thumb_dir()),
            scratch_dir: path_or(&config.scratch_dir, std::env::temp_dir()),
            ocr_timeout: config
                .ocr_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_OCR_TIMEOUT),
            queue_capacity: config.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1),
            workers: config.workers.unwrap_or(DEFAULT_WORKERS).max(1),
            config_source: config.source_path.clone(),
        }
    }
}

/// Fill shortcut names and colors from the server's tags.
pub fn resolve_shortcuts(
    shortcuts: &mut [ShortcutConfig],
    server_tags: &[StoreTag],
) -> Result<(), ConfigError> {
    for shortcut in shortcuts.iter_mut() {
        let tag = server_tags
            .iter()
            .find(|t| t.id == shortcut.tag_id)
            .ok_or_else(|| ConfigError::UnknownTag {
                key: shortcut.key.clone(),
                tag_id: shortcut.tag_id,
            })?;
        shortcut.name = tag.name.clone();
        shortcut.color = tag.color.clone();
    }
    Ok(())
}

/// Describe every shortcut bound to a key the UI reserves.
pub fn reserved_key_collisions(shortcuts: &[ShortcutConfig]) -> Vec<String> {
    shortcuts
        .iter()
        .filter_map(|s| {
            RESERVED_KEYS
                .iter()
                .find(|(key, _)| *key == s.key)
                .map(|(_, action)| {
                    format!(
                        "shortcut key '{}' ({}) collides with reserved key for {}",
                        s.key, s.name, action
                    )
                })
        })
        .collect()
}

/// Log a warning for each reserved-key collision.
pub fn warn_reserved_keys(shortcuts: &[ShortcutConfig]) {
    for collision in reserved_key_collisions(shortcuts) {
        warn!("{}", collision);
    }
}
