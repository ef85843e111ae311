use anyhow::Result;
use honor_pricing::PricingConfig;
use honor_settlement::{EngineSettings, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub store: StoreConfig,
    pub pricing: PricingConfig,
    pub review: ReviewConfig,
    pub enforcement: EnforcementConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub data_dir: PathBuf,
    pub name: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            name: "honor-node".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// "memory" or "rocksdb" (the latter needs the rocksdb build feature).
    pub backend: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// How long a skip hides an item from the reviewer queue. 0 means
    /// skips never expire.
    pub skip_ttl_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            skip_ttl_secs: 604_800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            max_attempts: retry.max_attempts,
            backoff_ms: retry.backoff.as_millis() as u64,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        // Env overrides are applied by the caller so precedence stays in
        // one place
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = env::var("HONOR_DATA_DIR") {
            self.node.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(name) = env::var("HONOR_NODE_NAME") {
            if !name.is_empty() {
                self.node.name = name;
            }
        }
        if let Ok(backend) = env::var("HONOR_STORE_BACKEND") {
            if !backend.is_empty() {
                self.store.backend = backend;
            }
        }
        if let Ok(rate) = env::var("HONOR_HONORS_PER_USD") {
            if let Ok(val) = rate.parse() {
                self.pricing.honors_per_usd = val;
            }
        }
        if let Ok(ttl) = env::var("HONOR_SKIP_TTL_SECS") {
            if let Ok(val) = ttl.parse() {
                self.review.skip_ttl_secs = val;
            }
        }
        if let Ok(attempts) = env::var("HONOR_MAX_ATTEMPTS") {
            if let Ok(val) = attempts.parse() {
                self.enforcement.max_attempts = val;
            }
        }
        if let Ok(backoff) = env::var("HONOR_BACKOFF_MS") {
            if let Ok(val) = backoff.parse() {
                self.enforcement.backoff_ms = val;
            }
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let skip_ttl = if self.review.skip_ttl_secs == 0 {
            None
        } else {
            Some(chrono::Duration::seconds(self.review.skip_ttl_secs as i64))
        };
        EngineSettings {
            retry: RetryPolicy {
                max_attempts: self.enforcement.max_attempts,
                backoff: Duration::from_millis(self.enforcement.backoff_ms),
            },
            skip_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_env_overrides() {
        env::set_var("HONOR_DATA_DIR", "/test/data");
        env::set_var("HONOR_STORE_BACKEND", "rocksdb");
        env::set_var("HONOR_HONORS_PER_USD", "500");
        env::set_var("HONOR_SKIP_TTL_SECS", "3600");
        env::set_var("HONOR_MAX_ATTEMPTS", "9");

        let mut config = NodeConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.node.data_dir, PathBuf::from("/test/data"));
        assert_eq!(config.store.backend, "rocksdb");
        assert_eq!(config.pricing.honors_per_usd, 500);
        assert_eq!(config.review.skip_ttl_secs, 3600);
        assert_eq!(config.enforcement.max_attempts, 9);

        env::remove_var("HONOR_DATA_DIR");
        env::remove_var("HONOR_STORE_BACKEND");
        env::remove_var("HONOR_HONORS_PER_USD");
        env::remove_var("HONOR_SKIP_TTL_SECS");
        env::remove_var("HONOR_MAX_ATTEMPTS");
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("honor-config.toml");

        let mut config = NodeConfig::default();
        config.pricing.honors_per_usd = 600;
        config.save_to_file(&path).unwrap();

        let loaded = NodeConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pricing.honors_per_usd, 600);
        assert_eq!(loaded.review.skip_ttl_secs, 604_800);
        assert_eq!(loaded.store.backend, "memory");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            [store]
            backend = "rocksdb"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, "rocksdb");
        assert_eq!(config.node.name, "honor-node");
        assert_eq!(config.pricing.honors_per_usd, 450);
    }
}
