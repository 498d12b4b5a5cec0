//! Pipeline configuration
//!
//! Every field has a default, so a JSON file only needs to name what it
//! changes:
//!
//! ```json
//! { "surface": { "headless": false }, "compress": { "enabled": true } }
//! ```

use crate::blank::BlankFilterConfig;
use crate::compress::CompressConfig;
use crate::materialize::MaterializeConfig;
use crate::sanitize::SanitizeConfig;
use crate::{CaptureOptions, Error, Result, SurfaceConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_EMBED_URL_TEMPLATE: &str = "https://www.scribd.com/embeds/{id}/content";
pub const DEFAULT_METADATA_URL_TEMPLATE: &str =
    "https://www.scribd.com/services/oembed/?format=json&url=https://www.scribd.com/document/{id}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub surface: SurfaceConfig,
    pub materialize: MaterializeConfig,
    pub sanitize: SanitizeConfig,
    pub capture: CaptureOptions,
    pub blank_filter: BlankFilterConfig,
    pub compress: CompressConfig,
    /// Viewer URL; `{id}` is replaced with the document ID
    pub embed_url_template: String,
    /// Metadata endpoint; `{id}` is replaced with the document ID
    pub metadata_url_template: String,
    /// Directory receiving finished PDFs
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig::default(),
            materialize: MaterializeConfig::default(),
            sanitize: SanitizeConfig::default(),
            capture: CaptureOptions::default(),
            blank_filter: BlankFilterConfig::default(),
            compress: CompressConfig::default(),
            embed_url_template: DEFAULT_EMBED_URL_TEMPLATE.to_string(),
            metadata_url_template: DEFAULT_METADATA_URL_TEMPLATE.to_string(),
            output_dir: PathBuf::from("downloads"),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.embed_url_template.contains("{id}") {
            return Err(Error::ConfigError("embed_url_template must contain '{id}'".into()));
        }
        if self.materialize.page_selector.trim().is_empty() {
            return Err(Error::ConfigError("materialize.page_selector must not be empty".into()));
        }
        if self.surface.timeout_ms == 0 || self.surface.capture_timeout_ms == 0 {
            return Err(Error::ConfigError("surface timeouts must be greater than zero".into()));
        }
        if !(0.0..=1.0).contains(&self.blank_filter.white_threshold) {
            return Err(Error::ConfigError("blank_filter.white_threshold must be within 0.0..=1.0".into()));
        }
        Ok(())
    }
}
