//! Configuration loader, typed settings sections and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed from the environment with `__`, e.g.
//! `APP_RETRIEVAL__TOP_K=8`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build from an in-memory TOML document; environment is not consulted.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::string(toml)) };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed section, defaulted when the key is absent.
    pub fn section<T>(&self, key: &str) -> Result<T, Error>
    where
        T: DeserializeOwned + Default,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(T::default());
        }
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("section '{}': {}", key, e)))
    }

    fn validate(&self) -> Result<(), Error> {
        let retrieval: RetrievalSettings = self.section("retrieval")?;
        retrieval.validate()?;
        let lexical: LexicalSettings = self.section("lexical")?;
        lexical.validate()?;
        let chunking: ChunkingSettings = self.section("chunking")?;
        chunking.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Reciprocal-rank smoothing constant.
    pub rrf_k: usize,
    /// Candidates requested from each index per result slot.
    pub overfetch: usize,
    pub hybrid: bool,
    /// Fall back to a content hash when a result has neither identifier nor path.
    pub content_hash_keys: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 6, rrf_k: 60, overfetch: 2, hybrid: false, content_hash_keys: false }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.overfetch == 0 {
            return Err(Error::InvalidConfig("retrieval.overfetch must be at least 1".into()));
        }
        Ok(())
    }
}

/// Smallest per-thread indexing heap tantivy accepts.
pub const MIN_WRITER_MEMORY_BYTES: usize = 15_000_000;
const MAX_WRITER_MEMORY_BYTES: usize = 4_000_000_000;

/// In-memory BM25 index settings. Scoring uses tantivy's fixed `k1 = 1.2`,
/// `b = 0.75`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    pub writer_memory_bytes: usize,
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self { writer_memory_bytes: 50_000_000 }
    }
}

impl LexicalSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if !(MIN_WRITER_MEMORY_BYTES..MAX_WRITER_MEMORY_BYTES).contains(&self.writer_memory_bytes) {
            return Err(Error::InvalidConfig(format!(
                "lexical.writer_memory_bytes must lie in [{}, {}), got {}",
                MIN_WRITER_MEMORY_BYTES, MAX_WRITER_MEMORY_BYTES, self.writer_memory_bytes
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Full URL of an OpenAI-compatible `/embeddings` endpoint.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: Option<usize>,
    pub timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1/embeddings".to_string(),
            model: "text-embedding-v4".to_string(),
            api_key: None,
            dimensions: None,
            timeout_secs: 30,
            batch_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: String,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: "./vector_db".to_string(), table: "course_materials".to_string() }
    }
}

impl StoreSettings {
    pub fn resolved_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 200, chunk_overlap: 50 }
    }
}

impl ChunkingSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
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
