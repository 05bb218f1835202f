//! Cloud provider configuration

use crate::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Backend that serves the buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Process-local `object_store::memory::InMemory` buckets
    Memory,
    /// Google Cloud Storage
    #[default]
    Gcs,
    /// Amazon S3 and compatible services
    S3,
    /// Azure Blob Storage
    Azure,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Memory => "memory",
            Provider::Gcs => "gcs",
            Provider::S3 => "s3",
            Provider::Azure => "azure",
        };
        f.write_str(name)
    }
}

/// Configuration for cloud storage access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Backend serving the buckets
    pub provider: Provider,
    /// Buckets visible at the store root, given as a list or a CSV string
    #[serde(deserialize_with = "deserialize_buckets")]
    pub buckets: Vec<String>,
    /// Pick up credentials from the environment (default: true)
    pub allow_environment_credentials: bool,
    /// Service account key file for GCS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_path: Option<PathBuf>,
    /// Region for S3
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            buckets: Vec::new(),
            allow_environment_credentials: true,
            service_account_path: None,
            region: None,
            endpoint: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BucketList {
    Csv(String),
    List(Vec<String>),
}

fn deserialize_buckets<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match BucketList::deserialize(deserializer)? {
        BucketList::Csv(csv) => parse_bucket_list(&csv),
        BucketList::List(list) => list
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
    })
}

/// Split a comma separated bucket list, ignoring blanks
pub fn parse_bucket_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl CloudConfig {
    /// In-memory configuration exposing `buckets`
    pub fn memory<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider: Provider::Memory,
            buckets: buckets.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CloudConfig = toml::from_str(contents)
            .map_err(|e| CloudError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CloudError::Config(format!("Failed to serialize config: {}", e)))
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = self.buckets.iter().find(|name| name.contains('/')) {
            return Err(CloudError::Config(format!(
                "Bucket name must not contain '/': {}",
                name
            )));
        }
        if self.service_account_path.is_some() && self.provider != Provider::Gcs {
            return Err(CloudError::Config(format!(
                "service_account_path only applies to gcs, not {}",
                self.provider
            )));
        }
        Ok(())
    }
}
