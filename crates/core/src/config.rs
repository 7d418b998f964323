use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_MAX_CHUNKS: usize = 3;

/// Word-window sizing for the chunker.
///
/// Only constructible with `overlap < chunk_size`, so the window step
/// `chunk_size - overlap` is always at least one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub max_chunks: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LecternConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub database_url: Option<String>,
    pub api_key: String,
    pub bind: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl LecternConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; numeric values that fail to
    /// parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: usize| {
            lookup(key)
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        let chunking = ChunkingConfig::new(
            number("LECTERN_CHUNK_SIZE", DEFAULT_CHUNK_SIZE),
            number("LECTERN_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP),
        )?;

        Ok(Self {
            chunking,
            retrieval: RetrievalConfig {
                max_chunks: number("LECTERN_MAX_CHUNKS", DEFAULT_MAX_CHUNKS),
            },
            database_url: lookup("LECTERN_DATABASE_URL")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            api_key: lookup("LECTERN_API_KEY").unwrap_or_else(|| "dev-lectern-key".to_string()),
            bind: lookup("LECTERN_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            rate_limit_window: Duration::from_secs(
                number("LECTERN_RATE_LIMIT_WINDOW_SECONDS", 60) as u64,
            ),
            rate_limit_max: number("LECTERN_RATE_LIMIT_MAX", 120),
        })
    }
}

impl Default for LecternConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            database_url: None,
            api_key: "dev-lectern-key".to_string(),
            bind: "0.0.0.0:8080".to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
        }
    }
}
