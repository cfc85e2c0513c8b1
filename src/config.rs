use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::DEFAULT_KEY;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub sync: SyncConfig,
}

/// Connection settings for the remote record collection.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Project base URL (e.g. "https://abc.supabase.co")
  #[serde(default)]
  pub url: String,
  /// Table holding the directory records
  #[serde(default = "default_table")]
  pub table: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      url: String::new(),
      table: default_table(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// SQLite file for the local cache (default: $XDG_DATA_HOME/recruitdir/storage.db)
  pub path: Option<PathBuf>,
  /// Storage key the record collection lives under
  #[serde(default = "default_cache_key")]
  pub key: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      key: default_cache_key(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Seconds between full re-fetches of the collection
  #[serde(default = "default_poll_interval_secs")]
  pub poll_interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      poll_interval_secs: default_poll_interval_secs(),
    }
  }
}

impl SyncConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs.max(1))
  }
}

fn default_table() -> String {
  "recruiters".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_cache_key() -> String {
  DEFAULT_KEY.to_string()
}

fn default_poll_interval_secs() -> u64 {
  30
}

/// Values shipped in templates that mean "nobody filled this in".
const PLACEHOLDER_MARKERS: &[&str] = &[
  "your-project",
  "your_project",
  "placeholder",
  "example.",
  "your-anon-key",
  "changeme",
];

fn is_placeholder(value: &str) -> bool {
  let value = value.trim().to_lowercase();
  value.is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m))
}

impl RemoteConfig {
  /// Whether the remote store can be used at all.
  ///
  /// Missing or placeholder credentials count as unconfigured, which callers
  /// treat exactly like an unreachable store.
  pub fn is_configured(&self, api_key: Option<&str>) -> bool {
    if is_placeholder(&self.url) || self.table.trim().is_empty() {
      return false;
    }
    if Url::parse(self.url.trim()).is_err() {
      return false;
    }
    matches!(api_key, Some(key) if !is_placeholder(key))
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs.max(1))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./recruitdir.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/recruitdir/config.yaml
  ///
  /// Having no configuration file is fine: the defaults leave the remote
  /// store unconfigured and everything is served from the local cache.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("recruitdir.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("recruitdir").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Get the remote API key from environment variables.
  ///
  /// Checks RECRUITDIR_API_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_api_key() -> Option<String> {
    std::env::var("RECRUITDIR_API_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .ok()
  }
}
