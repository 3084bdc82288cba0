// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! memory_budget = "64M"
//! num_pools = 1
//! lifetime_strategy = "offset"
//! num_threads = 4
//! share_memory_manager = true
//! ```

use crate::RuntimeError;
use memory_manager::{LifetimeStrategy, MemoryBudget};
use std::path::Path;

/// Configuration for the compute runtime.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Cap on live allocator bytes (human-readable, e.g. `"64M"`). Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_budget: Option<String>,
    /// Pools created up front. `0` lets the first acquiring group populate lazily.
    #[serde(default = "default_num_pools")]
    pub num_pools: usize,
    #[serde(default)]
    pub lifetime_strategy: LifetimeStrategy,
    /// Worker threads (defaults to the number of online CPU cores).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,
    /// Whether functions share one memory manager or each get their own.
    #[serde(default = "default_true")]
    pub share_memory_manager: bool,
}

fn default_num_pools() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("cannot read config '{}': {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the memory budget string, if one is set.
    pub fn parse_budget(&self) -> Result<Option<MemoryBudget>, RuntimeError> {
        self.memory_budget
            .as_deref()
            .map(|s| MemoryBudget::parse(s).map_err(|e| RuntimeError::Config(format!("invalid budget: {e}"))))
            .transpose()
    }

    /// Resolves the number of worker threads.
    pub fn resolve_threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.num_threads == Some(0) {
            return Err(RuntimeError::Config("num_threads must be at least 1".into()));
        }
        self.parse_budget()?;
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_budget: None,
            num_pools: default_num_pools(),
            lifetime_strategy: LifetimeStrategy::Offset,
            num_threads: None,
            share_memory_manager: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.num_pools, 1);
        assert_eq!(c.lifetime_strategy, LifetimeStrategy::Offset);
        assert!(c.share_memory_manager);
        assert!(c.parse_budget().unwrap().is_none());
    }

    #[test]
    fn test_parse_budget() {
        let c = RuntimeConfig {
            memory_budget: Some("256M".into()),
            ..Default::default()
        };
        assert_eq!(c.parse_budget().unwrap().unwrap().as_mb(), 256);

        let bad = RuntimeConfig {
            memory_budget: Some("lots".into()),
            ..Default::default()
        };
        assert!(matches!(bad.parse_budget(), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
memory_budget = "1G"
num_pools = 2
lifetime_strategy = "blob"
num_threads = 2
share_memory_manager = false
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.memory_budget.as_deref(), Some("1G"));
        assert_eq!(c.num_pools, 2);
        assert_eq!(c.lifetime_strategy, LifetimeStrategy::Blob);
        assert_eq!(c.num_threads, Some(2));
        assert!(!c.share_memory_manager);
    }

    #[test]
    fn test_from_toml_uses_defaults() {
        let c = RuntimeConfig::from_toml("").unwrap();
        assert_eq!(c, RuntimeConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        assert!(RuntimeConfig::from_toml("num_threads = 0").is_err());
        assert!(RuntimeConfig::from_toml("lifetime_strategy = \"greedy\"").is_err());
        assert!(RuntimeConfig::from_toml("memory_budget = \"12Q\"").is_err());
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            memory_budget: Some("8M".into()),
            num_threads: Some(3),
            ..Default::default()
        };
        let back = RuntimeConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_pools = 3").unwrap();
        let c = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(c.num_pools, 3);

        let missing = RuntimeConfig::from_file(Path::new("/nonexistent/compute-rt.toml"));
        assert!(matches!(missing, Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_resolve_threads() {
        let c = RuntimeConfig {
            num_threads: Some(8),
            ..Default::default()
        };
        assert_eq!(c.resolve_threads(), 8);
        assert!(RuntimeConfig::default().resolve_threads() >= 1);
    }
}
