//! Configuration management for apigen
//!
//! Loads configuration with priority:
//! 1. Specified config file
//! 2. apigen.toml in the current directory or a parent
//! 3. Defaults

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "apigen.toml";

/// apigen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiGenConfig {
    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Web crawl settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Upper bound on pages fetched per run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Minimum delay between successive fetches, in milliseconds
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_sitemap_path")]
    pub sitemap_path: String,
}

/// Endpoint extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Characters of page or file text handed to the language model
    #[serde(default = "default_llm_content_limit")]
    pub llm_content_limit: usize,
}

/// Tool generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_display_name_max_len")]
    pub display_name_max_len: usize,

    /// Version tag used when a path carries no version segment
    #[serde(default = "default_version_tag")]
    pub default_version_tag: String,
}

/// Checkpoint storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_provider")]
    pub provider: String,

    pub connection_string: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub service_name: Option<String>,

    #[serde(default)]
    pub json_logs: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            throttle_ms: default_throttle_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            sitemap_path: default_sitemap_path(),
        }
    }
}

impl CrawlConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            llm_content_limit: default_llm_content_limit(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            display_name_max_len: default_display_name_max_len(),
            default_version_tag: default_version_tag(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            provider: default_checkpoint_provider(),
            connection_string: None,
        }
    }
}

impl ApiGenConfig {
    /// Load configuration from apigen.toml, searching upward from the
    /// current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            Self::find_config_file()?
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    /// Parse configuration from TOML text and resolve `${VAR}` references.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: ApiGenConfig = toml::from_str(contents)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Defaults suited to tests: no politeness delay, small crawl budget.
    pub fn test_defaults() -> Self {
        Self {
            crawl: CrawlConfig {
                max_pages: 5,
                throttle_ms: 0,
                ..CrawlConfig::default()
            },
            ..Self::default()
        }
    }

    fn find_config_file() -> Result<PathBuf> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        Err(anyhow!("{} not found", CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        if self.crawl.max_pages == 0 {
            return Err(anyhow!("crawl.max_pages must be at least 1"));
        }
        if self.extraction.llm_content_limit == 0 {
            return Err(anyhow!("extraction.llm_content_limit must be at least 1"));
        }
        match self.checkpoint.provider.as_str() {
            "in-memory" => Ok(()),
            "sqlite" if self.checkpoint.connection_string.is_some() => Ok(()),
            "sqlite" => Err(anyhow!(
                "checkpoint.connection_string is required for the sqlite provider"
            )),
            other => Err(anyhow!("unknown checkpoint provider '{}'", other)),
        }
    }

    fn resolve_env_vars(&mut self) {
        if let Some(ref conn) = self.checkpoint.connection_string {
            self.checkpoint.connection_string = Self::resolve_env_var(conn);
        }
        if let Some(ref name) = self.observability.service_name {
            self.observability.service_name = Self::resolve_env_var(name);
        }
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }
}

fn default_max_pages() -> usize {
    20
}

fn default_throttle_ms() -> u64 {
    500
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; apigen/0.1.0)".to_string()
}

fn default_sitemap_path() -> String {
    "/sitemap.xml".to_string()
}

fn default_llm_content_limit() -> usize {
    8000
}

fn default_display_name_max_len() -> usize {
    50
}

fn default_version_tag() -> String {
    "latest".to_string()
}

fn default_checkpoint_provider() -> String {
    "in-memory".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ApiGenConfig::default();
        assert_eq!(config.crawl.max_pages, 20);
        assert_eq!(config.crawl.throttle(), Duration::from_millis(500));
        assert_eq!(config.extraction.llm_content_limit, 8000);
        assert_eq!(config.checkpoint.provider, "in-memory");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ApiGenConfig::from_toml(
            r#"
            [crawl]
            max_pages = 3

            [generation]
            default_version_tag = "v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.crawl.max_pages, 3);
        assert_eq!(config.crawl.throttle_ms, 500);
        assert_eq!(config.generation.default_version_tag, "v1");
        assert_eq!(config.generation.display_name_max_len, 50);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(ApiGenConfig::from_toml("[crawl]\nmax_pages = 0").is_err());
        assert!(ApiGenConfig::from_toml("[checkpoint]\nprovider = \"sqlite\"").is_err());
        assert!(ApiGenConfig::from_toml("[checkpoint]\nprovider = \"redis\"").is_err());
    }

    #[test]
    fn test_resolve_env_var() {
        unsafe {
            env::set_var("APIGEN_TEST_DB", "sqlite::memory:");
        }

        let config = ApiGenConfig::from_toml(
            "[checkpoint]\nprovider = \"sqlite\"\nconnection_string = \"${APIGEN_TEST_DB}\"",
        )
        .unwrap();
        assert_eq!(
            config.checkpoint.connection_string.as_deref(),
            Some("sqlite::memory:")
        );

        let plain = ApiGenConfig::resolve_env_var("plain_value");
        assert_eq!(plain, Some("plain_value".to_string()));

        unsafe {
            env::remove_var("APIGEN_TEST_DB");
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[crawl]\nthrottle_ms = 0").unwrap();

        let config = ApiGenConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.crawl.throttle_ms, 0);
    }
}
