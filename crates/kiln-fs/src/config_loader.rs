//! Config file discovery
//!
//! Walks up from the asset's directory and returns the first candidate file
//! found, nearest directory first and candidate order within a directory.

use async_trait::async_trait;
use kiln_asset::{ConfigError, ConfigLoader, ConfigOptions, File, LoadedConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Config formats understood by [`FsConfigLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.json` files and extension-less rc files (`.babelrc`)
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Format implied by a config file's name
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") | None => Some(Self::Json),
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            Some(_) => None,
        }
    }

    /// Parse config text in this format
    ///
    /// # Errors
    /// Returns a parse error naming `path` if the text is malformed
    pub fn parse(self, path: &Path, text: &str) -> Result<Value, ConfigError> {
        let parsed = match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::parse_error(path, message))
    }
}

/// Searches the filesystem upwards from an asset for config files
#[derive(Debug, Clone, Default)]
pub struct FsConfigLoader {
    root: Option<PathBuf>,
}

impl FsConfigLoader {
    /// Loader that searches up to the filesystem root
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop searching once `root` has been checked
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// First existing candidate, nearest directory first
    ///
    /// # Errors
    /// Returns error on any I/O failure other than a missing file
    pub async fn resolve(
        &self,
        asset_path: &Path,
        filenames: &[String],
    ) -> Result<Option<PathBuf>, ConfigError> {
        let mut dir = asset_path.parent();
        while let Some(current) = dir {
            for name in filenames {
                let candidate = current.join(name);
                match tokio::fs::metadata(&candidate).await {
                    Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(ConfigError::io_error(candidate, e)),
                }
            }
            if self.root.as_deref() == Some(current) {
                break;
            }
            dir = current.parent();
        }
        Ok(None)
    }
}

#[async_trait]
impl ConfigLoader for FsConfigLoader {
    async fn load(
        &self,
        asset_path: &Path,
        filenames: &[String],
        options: &ConfigOptions,
    ) -> Result<Option<LoadedConfig>, ConfigError> {
        let Some(path) = self.resolve(asset_path, filenames).await? else {
            tracing::trace!(asset = %asset_path.display(), ?filenames, "no config found");
            return Ok(None);
        };

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ConfigError::io_error(&path, e))?;

        let config = if options.parse {
            ConfigFormat::from_path(&path)
                .ok_or_else(|| ConfigError::UnsupportedFormat(path.clone()))?
                .parse(&path, &text)?
        } else {
            Value::String(text)
        };

        tracing::debug!(asset = %asset_path.display(), config = %path.display(), "loaded config");
        Ok(Some(LoadedConfig {
            config,
            files: vec![File::new(path)],
        }))
    }
}
