//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting levels, e.g. `APP_CHUNKING__CHUNK_SIZE`). Typed
//! sections fall back to their defaults when absent.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkerConfig;
use crate::{Error, Result};

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
    /// Replaces the built-in grounding prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self { Self { top_k: DEFAULT_TOP_K, system_prompt: None } }
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { model: DEFAULT_MODEL.to_string(), max_tokens: DEFAULT_MAX_TOKENS, base_url: DEFAULT_BASE_URL.to_string(), api_key: None }
    }
}

impl GenerationConfig {
    /// The configured key, else `ANTHROPIC_API_KEY`. Missing or blank is a configuration error.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("{API_KEY_ENV} not found in configuration or environment")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::InvalidConfig("generation.model must not be empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(Error::InvalidConfig("generation.max_tokens must be greater than 0".to_string()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!("generation.base_url is not an http(s) URL: {}", self.base_url)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub docs_dir: String,
    pub index_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self { Self { docs_dir: "./docs".to_string(), index_dir: "./index".to_string() } }
}

impl DataConfig {
    pub fn docs_dir(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.docs_dir) }
    pub fn index_dir(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.index_dir) }
}

/// All sections with their defaults; the base layer under every file and env provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub chunking: ChunkerConfig,
    pub rag: RagConfig,
    pub generation: GenerationConfig,
    pub data: DataConfig,
}

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current directory for the environment named by `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(&env::current_dir()?, &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Self::files(dir, env_name);
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    /// Same layering without the environment provider.
    pub fn load_files_only(dir: &Path, env_name: &str) -> Result<Self> {
        let config = Self { figment: Self::files(dir, env_name), base_dir: dir.to_path_buf() };
        config.validate()?;
        Ok(config)
    }

    fn files(dir: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment
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
        self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn chunking(&self) -> Result<ChunkerConfig> { self.get("chunking") }
    pub fn rag(&self) -> Result<RagConfig> { self.get("rag") }
    pub fn generation(&self) -> Result<GenerationConfig> { self.get("generation") }
    pub fn data(&self) -> Result<DataConfig> { self.get("data") }

    /// Directory that relative data paths are resolved against.
    pub fn base_dir(&self) -> &Path { &self.base_dir }

    fn validate(&self) -> Result<()> {
        let settings = self.settings()?;
        settings.chunking.validate()?;
        settings.rag.validate()?;
        settings.generation.validate()
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
    use std::fs;

    #[test]
    fn defaults_apply_without_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = Config::load_files_only(tmp.path(), "dev").expect("load");
        assert_eq!(config.chunking().expect("chunking"), ChunkerConfig::default());
        assert_eq!(config.rag().expect("rag").top_k, 4);
        assert_eq!(config.generation().expect("generation").model, DEFAULT_MODEL);
    }

    #[test]
    fn env_file_overrides_base_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("config.toml"), "[chunking]\nchunk_size = 500\nchunk_overlap = 50\n\n[rag]\ntop_k = 6\n").expect("write");
        fs::write(tmp.path().join("config.prod.toml"), "[chunking]\nchunk_size = 800\n").expect("write");

        let dev = Config::load_files_only(tmp.path(), "dev").expect("dev");
        assert_eq!(dev.chunking().expect("chunking").chunk_size, 500);

        let prod = Config::load_files_only(tmp.path(), "production").expect("prod");
        let chunking = prod.chunking().expect("chunking");
        assert_eq!(chunking.chunk_size, 800);
        assert_eq!(chunking.chunk_overlap, 50);
        assert_eq!(prod.rag().expect("rag").top_k, 6);
    }

    #[test]
    fn invalid_overlap_fails_at_load() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("config.toml"), "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").expect("write");
        assert!(matches!(Config::load_files_only(tmp.path(), "dev"), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_top_k_fails_at_load() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(tmp.path().join("config.toml"), "[rag]\ntop_k = 0\n").expect("write");
        assert!(Config::load_files_only(tmp.path(), "dev").is_err());
    }

    #[test]
    fn configured_api_key_wins() {
        let generation = GenerationConfig { api_key: Some("sk-test".to_string()), ..GenerationConfig::default() };
        assert_eq!(generation.resolve_api_key().expect("key"), "sk-test");
        let blank = GenerationConfig { api_key: Some("  ".to_string()), ..GenerationConfig::default() };
        assert!(blank.resolve_api_key().is_err());
    }

    #[test]
    fn relative_data_paths_resolve_against_base() {
        let data = DataConfig { docs_dir: "docs".to_string(), index_dir: "/abs/index".to_string() };
        let base = Path::new("/srv/app");
        assert_eq!(data.docs_dir(base), PathBuf::from("/srv/app/docs"));
        assert_eq!(data.index_dir(base), PathBuf::from("/abs/index"));
    }
}
