//! Configuration module

use crate::stream::DEFAULT_READ_SIZE;
use crate::uri::{Scheme, DEFAULT_SCHEME};
use crate::{FsError, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem facade settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Address scheme token, e.g. `gs`
    pub scheme: String,
    /// Display name of the store root in listings
    pub root_label: String,
    /// Default read length for `BlobFileSystem::read_chunk`
    #[serde(deserialize_with = "deserialize_size")]
    pub read_chunk_size: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            root_label: "GCS".to_string(),
            read_chunk_size: DEFAULT_READ_SIZE as u64,
        }
    }
}

/// Size given either as bytes or as a string like `"4MiB"`
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(u64),
    Text(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Bytes(bytes) => Ok(bytes),
        SizeValue::Text(text) => parse_size(&text)
            .map_err(|e| D::Error::custom(format!("Failed to parse size: {}", e))),
    }
}

const SIZE_UNITS: &[(&str, u64)] = &[
    ("", 1),
    ("b", 1),
    ("kb", 1_000),
    ("kib", 1 << 10),
    ("mb", 1_000_000),
    ("mib", 1 << 20),
    ("gb", 1_000_000_000),
    ("gib", 1 << 30),
];

/// Parse a whole-number size with an optional unit, e.g. `"4MiB"` or `"512"`
pub fn parse_size(size_str: &str) -> Result<u64> {
    let text = size_str.trim();
    let digits = text.len() - text.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let (number, unit) = text.split_at(digits);

    let number: u64 = number
        .parse()
        .map_err(|_| FsError::Config(format!("Invalid size format: {}", size_str)))?;
    let unit = unit.trim().to_ascii_lowercase();
    let multiplier = SIZE_UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, multiplier)| *multiplier)
        .ok_or_else(|| FsError::Config(format!("Unknown size unit: {}", unit)))?;

    number
        .checked_mul(multiplier)
        .ok_or_else(|| FsError::Config(format!("Size out of range: {}", size_str)))
}

impl FsConfig {
    /// The scheme bound to this configuration
    pub fn scheme(&self) -> Scheme {
        Scheme::new(self.scheme.as_str())
    }

    /// Default location: `<config dir>/blobfs/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            FsError::Config("Unable to determine config directory".to_string())
        })?;
        Ok(config_dir.join("blobfs").join("config.toml"))
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: FsConfig = toml::from_str(contents)
            .map_err(|e| FsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load from the default location, falling back to defaults when the file
    /// does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FsError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() || !self.scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FsError::Config(format!(
                "Invalid scheme: '{}'",
                self.scheme
            )));
        }
        if self.read_chunk_size == 0 {
            return Err(FsError::Config(
                "read_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FsConfig::default();
        assert_eq!(config.scheme, "gs");
        assert_eq!(config.root_label, "GCS");
        assert_eq!(config.read_chunk_size, 1024 * 1024);
        assert_eq!(config.scheme().root(), "gs://");
    }

    #[test]
    fn test_from_toml_partial() {
        let config = FsConfig::from_toml_str(
            r#"
scheme = "s3a"
read_chunk_size = "4MiB"
"#,
        )
        .unwrap();
        assert_eq!(config.scheme, "s3a");
        assert_eq!(config.root_label, "GCS");
        assert_eq!(config.read_chunk_size, 4 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_config() {
        assert!(FsConfig::from_toml_str("scheme = \"\"").is_err());
        assert!(FsConfig::from_toml_str("scheme = \"g:s\"").is_err());
        assert!(FsConfig::from_toml_str("read_chunk_size = 0").is_err());
        assert!(FsConfig::from_toml_str("read_chunk_size = \"lots\"").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("1KiB").unwrap(), 1024);
        assert_eq!(parse_size(" 2 MiB ").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("4kb").unwrap(), 4_000);
        assert!(parse_size("1.5MiB").is_err());
        assert!(parse_size("MiB").is_err());
        assert!(parse_size("3 parsecs").is_err());
        assert!(parse_size("99999999999GiB").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = FsConfig {
            root_label: "Cloud".to_string(),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(FsConfig::load_from(&path).unwrap(), config);
    }
}
