/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Configuration file for `mql-render`.
//!
//! ```toml
//! [tags]
//! limit = "10"
//! ```
//!
//! Tag values given on the command line override the `[tags]` table.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Settings loaded from `--config`.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Default values for value tags, keyed by tag name without brackets.
    pub tags: Vec<(String, String)>,
}

impl RenderConfig {
    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(
            path = %path.display(),
            tags = config.tags.len(),
            "loaded render config"
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        let tags = raw
            .tags
            .into_iter()
            .map(|(name, value)| match value {
                toml::Value::String(s) => (name, s),
                other => (name, other.to_string()),
            })
            .collect();
        Ok(Self { tags })
    }
}

/// On-disk shape. Non-string tag values are written out as TOML literals.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    tags: toml::Table,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = RenderConfig::parse(
            r#"
            [tags]
            limit = "10"
            active = true
            "#,
        )
        .unwrap();

        assert!(config.tags.contains(&("limit".to_string(), "10".to_string())));
        assert!(config.tags.contains(&("active".to_string(), "true".to_string())));
    }

    #[test]
    fn test_empty_config() {
        let config = RenderConfig::parse("").unwrap();
        assert!(config.tags.is_empty());
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(RenderConfig::parse("[database]\nurl = \"x\"").is_err());
        assert!(RenderConfig::parse("[cache]\ncapacity = 8").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tags]\nname = \"Dune\"").unwrap();

        let config = RenderConfig::load(file.path()).unwrap();
        assert_eq!(config.tags, vec![("name".to_string(), "Dune".to_string())]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RenderConfig::load(Path::new("/nonexistent/mql-render.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
