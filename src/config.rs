use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_BASE_URL: &str = "https://fakestoreapi.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Prefix used when rendering prices
  #[serde(default = "default_currency")]
  pub currency: String,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Request timeout; the transport default applies when unset
  pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a loaded query is trusted before the next read refetches it
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  pub dir: Option<PathBuf>,
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_currency() -> String {
  "$".to_string()
}

fn default_stale_secs() -> u64 {
  60
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: None,
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
    }
  }
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      title: None,
      currency: default_currency(),
      cache: CacheConfig::default(),
      log: LogConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./shelf.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shelf/config.yaml
  ///
  /// Falls back to defaults when no file is found. `SHELF_API_URL` overrides
  /// the configured base URL.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var("SHELF_API_URL") {
      config.api.base_url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("shelf.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shelf").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null rather than an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Title shown in the header
  pub fn header_title(&self) -> String {
    match &self.title {
      Some(title) => title.clone(),
      None => url::Url::parse(&self.api.base_url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| self.api.base_url.clone()),
    }
  }
}

impl LogConfig {
  /// Directory for log files, defaulting to $XDG_DATA_HOME/shelf/logs
  pub fn resolved_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("shelf").join("logs"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.base_url, "https://fakestoreapi.com");
    assert_eq!(config.api.timeout_secs, None);
    assert_eq!(config.currency, "$");
    assert_eq!(config.cache.stale_secs, 60);
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_partial_config() {
    let yaml = r#"
api:
  base_url: http://localhost:3000
  timeout_secs: 10
currency: "R$ "
cache:
  stale_secs: 5
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:3000");
    assert_eq!(config.api.timeout_secs, Some(10));
    assert_eq!(config.currency, "R$ ");
    assert_eq!(config.cache.stale_secs, 5);
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_header_title() {
    let mut config = Config::default();
    assert_eq!(config.header_title(), "fakestoreapi.com");

    config.title = Some("My Store".to_string());
    assert_eq!(config.header_title(), "My Store");
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let result = Config::load(Some(Path::new("/nonexistent/shelf.yaml")));
    assert!(result.is_err());
  }

  #[test]
  fn test_load_from_path() {
    let path = std::env::temp_dir().join(format!("shelf-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "title: Test Shop\nlog:\n  level: debug\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.title.as_deref(), Some("Test Shop"));
    assert_eq!(config.log.level, "debug");
  }
}
