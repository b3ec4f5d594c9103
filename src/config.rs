// Configuration file parsing for Tova projects (tova.toml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Project configuration (tova.toml), all sections optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TovaConfig {
    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub build: BuildSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildSection {
    /// Source directory, default "src"
    #[serde(default)]
    pub src: Option<String>,
    /// Output directory, default "build"
    #[serde(default)]
    pub out: Option<String>,
    /// Promote every warning to an error
    #[serde(default)]
    pub strict: bool,
}

impl TovaConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    /// Look for tova.toml in the given directory.
    pub fn discover(dir: &Path) -> Option<Self> {
        let path = dir.join("tova.toml");
        if path.exists() {
            Self::load_from_file(&path).ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: TovaConfig = toml::from_str(
            r#"
[package]
name = "shop"
version = "0.1.0"

[build]
src = "app"
out = "dist"
strict = true
"#,
        )
        .unwrap();
        assert_eq!(config.package.name, "shop");
        assert_eq!(config.build.src.as_deref(), Some("app"));
        assert_eq!(config.build.out.as_deref(), Some("dist"));
        assert!(config.build.strict);
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: TovaConfig = toml::from_str("").unwrap();
        assert!(config.package.name.is_empty());
        assert!(!config.build.strict);
        assert!(config.build.src.is_none());
    }
}
