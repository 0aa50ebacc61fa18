use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const ENV_CONFIG: &str = "KOLSCOPE_CONFIG";
pub const ENV_NCBI_API_KEY: &str = "KOLSCOPE_NCBI_API_KEY";
pub const ENV_DATABASE: &str = "KOLSCOPE_DATABASE";

/// Root application configuration, loaded from `~/.config/kolscope/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pubmed: PubMedConfig,
    pub ai: AiConfig,
    pub images: ImageConfig,
    pub batch: BatchConfig,
    pub storage: StorageConfig,
}

/// NCBI E-utilities access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub max_results: u32,
    pub min_interval_ms: u64,
    pub max_attempts: u32,
    pub backoff_unit_ms: u64,
    pub user_agent: String,
}

/// Generative completion service (OpenAI-compatible chat endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub system_prompt: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub enabled: bool,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            api_key: None,
            max_results: 10,
            min_interval_ms: 340,
            max_attempts: 5,
            backoff_unit_ms: 1000,
            user_agent: "kolscope/0.1".to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://models.inference.ai.azure.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 1.0,
            max_tokens: 4000,
            top_p: 1.0,
            system_prompt: "You are a helpful assistant generating structured JSON metadata."
                .to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            concurrency: 1,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("kolscope");
        Self {
            database_path: data_dir.join("kol_profiles.db").to_string_lossy().to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/kolscope/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kolscope")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    /// Environment overrides are applied on top.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(key) = env_var_non_empty(ENV_NCBI_API_KEY) {
            self.pubmed.api_key = Some(key);
        }
        if let Some(path) = env_var_non_empty(ENV_DATABASE) {
            self.storage.database_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.batch_size == 0 {
            return Err(CoreError::ConfigError("batch.batch_size must be at least 1".into()));
        }
        if self.batch.concurrency == 0 {
            return Err(CoreError::ConfigError("batch.concurrency must be at least 1".into()));
        }
        if self.pubmed.max_attempts == 0 {
            return Err(CoreError::ConfigError("pubmed.max_attempts must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(CoreError::ConfigError(format!(
                "ai.temperature must be within 0..=2, got {}",
                self.ai.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.ai.top_p) {
            return Err(CoreError::ConfigError(format!(
                "ai.top_p must be within 0..=1, got {}",
                self.ai.top_p
            )));
        }
        Ok(())
    }

    /// API key for the completion service, read from the env var named in `ai.api_key_env`.
    pub fn ai_api_key(&self) -> Option<String> {
        env_var_non_empty(&self.ai.api_key_env)
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.database_path)
    }
}

fn env_var_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
