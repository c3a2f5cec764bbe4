//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_VECTOR__DIMENSION=768`).
//! Typed settings come out of [`Config::settings`]; every field has a default
//! so an empty environment still yields a usable development setup.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    /// Build from an explicit figment (tests, embedding applications).
    pub fn from_figment(figment: Figment, env_name: &str) -> Result<Self> {
        let config = Self { figment, env_name: env_name.to_string() };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to extract settings: {}", e)))
    }

    fn validate_for_env(&self) -> Result<()> {
        let settings = self.settings()?;
        settings.validate()?;
        match self.env_name.as_str() {
            "prod" | "production" if settings.oracle.api_key.trim().is_empty() => Err(
                Error::InvalidConfig("oracle.api_key is required in production".into()),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub vector: VectorSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.vector.dimension == 0 {
            return Err(Error::InvalidConfig("vector.dimension must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.vector.default_threshold) {
            return Err(Error::InvalidConfig("vector.default_threshold must lie in [0, 1]".into()));
        }
        if self.vector.chars_per_token == 0 {
            return Err(Error::InvalidConfig("vector.chars_per_token must be positive".into()));
        }
        if self.agent.history_window == 0 {
            return Err(Error::InvalidConfig("agent.history_window must be positive".into()));
        }
        if self.agent.allowed_entities.is_empty() {
            return Err(Error::InvalidConfig("agent.allowed_entities must not be empty".into()));
        }
        Ok(())
    }
}

/// Text-generation and embedding oracle endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub uri: String,
    pub table: String,
    pub dimension: usize,
    pub default_limit: usize,
    pub default_threshold: f32,
    pub context_limit: usize,
    pub context_token_budget: usize,
    pub chars_per_token: usize,
    /// Candidates fetched per requested result before threshold filtering.
    pub overfetch: usize,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            uri: "data/lancedb".to_string(),
            table: "vector_documents".to_string(),
            dimension: 1536,
            default_limit: 5,
            default_threshold: 0.7,
            context_limit: 10,
            context_token_budget: 2000,
            chars_per_token: 4,
            overfetch: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub history_window: usize,
    pub translator_turns: usize,
    pub row_limit: usize,
    pub summary_sample_rows: usize,
    pub max_query_chars: usize,
    pub allowed_entities: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_window: 10,
            translator_turns: 4,
            row_limit: 100,
            summary_sample_rows: 20,
            max_query_chars: 4000,
            allowed_entities: ["leads", "customers", "campaigns", "sales_records", "users"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { sqlite_path: "data/sales.db".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str, env_name: &str) -> Result<Config> {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml));
        Config::from_figment(figment, env_name)
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = from_toml("[vector]\ndimension = 8\n", "dev").expect("config");
        let s = cfg.settings().expect("settings");
        assert_eq!(s.vector.dimension, 8);
        assert_eq!(s.vector.table, "vector_documents");
        assert_eq!(s.agent.history_window, 10);
        assert_eq!(s.agent.row_limit, 100);
        assert!(s.agent.allowed_entities.iter().any(|e| e == "leads"));
    }

    #[test]
    fn get_reads_nested_keys() {
        let cfg = from_toml("[oracle]\nchat_model = \"gpt-test\"\n", "dev").expect("config");
        let model: String = cfg.get("oracle.chat_model").expect("model");
        assert_eq!(model, "gpt-test");
        assert!(cfg.get::<String>("oracle.nope").is_err());
    }

    #[test]
    fn production_requires_api_key() {
        assert!(from_toml("", "prod").is_err());
        assert!(from_toml("[oracle]\napi_key = \"sk-test\"\n", "prod").is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(from_toml("[vector]\ndefault_threshold = 1.5\n", "dev").is_err());
    }

    #[test]
    fn resolve_keeps_absolute_and_joins_relative() {
        let tmp = tempfile::tempdir().expect("tmp");
        let rel = resolve_with_base(tmp.path(), "db/lance");
        assert_eq!(rel, tmp.path().join("db/lance"));
        let abs = resolve_with_base(tmp.path(), "/var/lib/lance");
        assert_eq!(abs, PathBuf::from("/var/lib/lance"));
    }
}
