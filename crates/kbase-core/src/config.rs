use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;

use crate::error::Error;

/// Chunking defaults: 480-token chunks with an 80-token overlap carried
/// from each chunk into the next.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { max_tokens: 480, overlap_tokens: 80 }
    }
}

/// Per-query retrieval settings. `candidates` is requested from each
/// retriever; `context_passages` survive reranking and feed generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub candidates: usize,
    pub context_passages: usize,
    /// Bound on each individual retriever call; expiry degrades that
    /// retriever for the query instead of failing it.
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { candidates: 5, context_passages: 3, timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Hard deadline on the completion call. On expiry the answer falls
    /// back to the extractive format; the caller never sees the timeout.
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// Layered configuration loader.
///
/// Merges `config.toml`, then `config.<env>.toml` selected by `RUST_ENV`,
/// then `APP_*` environment variables.
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

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn chunking(&self) -> ChunkingSettings {
        self.figment.extract_inner("chunking").unwrap_or_default()
    }

    pub fn retrieval(&self) -> RetrievalSettings {
        self.figment.extract_inner("retrieval").unwrap_or_default()
    }

    pub fn generation(&self) -> GenerationSettings {
        self.figment.extract_inner("generation").unwrap_or_default()
    }

    fn validate(&self) -> anyhow::Result<()> {
        let chunking = self.chunking();
        if chunking.max_tokens == 0 {
            return Err(Error::InvalidConfig("chunking.max_tokens must be positive".into()).into());
        }
        if chunking.overlap_tokens >= chunking.max_tokens {
            return Err(Error::InvalidConfig(
                "chunking.overlap_tokens must be smaller than chunking.max_tokens".into(),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_defaults() {
        let c = ChunkingSettings::default();
        assert_eq!(c.max_tokens, 480);
        assert_eq!(c.overlap_tokens, 80);
    }

    #[test]
    fn retrieval_defaults() {
        let r = RetrievalSettings::default();
        assert_eq!(r.candidates, 5);
        assert_eq!(r.context_passages, 3);
    }

    #[test]
    fn generation_deadline_defaults_to_a_minute() {
        assert_eq!(GenerationSettings::default().timeout_secs, 60);
    }
}
