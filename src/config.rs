use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SamvadError};

// Defaults for fields added after the first config revision
fn default_max_retries() -> u32 {
    2
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub detect: DetectConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Inference endpoint URL
    pub endpoint: String,
    /// Model to use for translation
    pub model: String,
    /// Request timeout in seconds for a single inference call
    pub request_timeout_secs: u64,
    /// Timeout in seconds for the initial model pull
    pub pull_timeout_secs: u64,
    /// Maximum retries for failed translation calls
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory for the durable cache tiers
    pub root_dir: String,
    /// Maximum number of entries held by the in-memory tier
    pub memory_capacity: usize,
    /// TTL in seconds for the in-memory tier
    pub memory_ttl_secs: u64,
    /// TTL in seconds for the session tier
    pub session_ttl_secs: u64,
    /// TTL in seconds for the long-term store tier
    pub store_ttl_secs: u64,
    /// Enable the session-scoped durable tier
    pub session_tier: bool,
    /// Enable the long-term durable tier
    pub store_tier: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Minimum share of native-script characters required before a
    /// language guess is reported alongside the script class
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Debounce window for typing previews, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                request_timeout_secs: 30,
                pull_timeout_secs: 600,
                max_retries: 2,
            },
            cache: CacheConfig {
                root_dir: ".samvad/cache".to_string(),
                memory_capacity: 256,
                memory_ttl_secs: 5 * 60,
                session_ttl_secs: 60 * 60,
                store_ttl_secs: 30 * 24 * 60 * 60,
                session_tier: true,
                store_tier: true,
            },
            detect: DetectConfig {
                min_confidence: 0.3,
            },
            preview: PreviewConfig {
                debounce_ms: 300,
            },
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SamvadError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SamvadError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SamvadError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SamvadError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = PipelineConfig::default();
        let toml_text = toml::to_string_pretty(&config).unwrap();
        let parsed: PipelineConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(parsed.model.endpoint, config.model.endpoint);
        assert_eq!(parsed.cache.memory_capacity, config.cache.memory_capacity);
        assert_eq!(parsed.preview.debounce_ms, 300);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let toml_text = r#"
            [model]
            endpoint = "http://localhost:11434"
            model = "llama3.2:3b"
            request_timeout_secs = 10
            pull_timeout_secs = 60

            [cache]
            root_dir = "/tmp/samvad"
            memory_capacity = 16
            memory_ttl_secs = 60
            session_ttl_secs = 120
            store_ttl_secs = 240
            session_tier = true
            store_tier = false

            [detect]

            [preview]
        "#;
        let parsed: PipelineConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(parsed.model.max_retries, 2);
        assert!((parsed.detect.min_confidence - 0.3).abs() < f64::EPSILON);
        assert_eq!(parsed.preview.debounce_ms, 300);
    }
}
