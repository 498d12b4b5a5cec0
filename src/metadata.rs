//! Document metadata lookup
//!
//! The pipeline only uses the title (for naming the output) and the page count
//! (for logging). Neither is validated against the captured PDF.

use crate::document::{embed_url, DocumentId};
use crate::{Error, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: String,
    pub page_count: Option<u32>,
}

impl DocumentMetadata {
    /// Placeholder used when the lookup fails
    pub fn fallback(id: &DocumentId) -> Self {
        Self { title: format!("scribd_document_{}", id), page_count: None }
    }
}

pub trait MetadataSource {
    fn fetch(&self, id: &DocumentId) -> Result<DocumentMetadata>;

    /// Fetch, falling back to [`DocumentMetadata::fallback`] on any failure.
    fn fetch_or_fallback(&self, id: &DocumentId) -> DocumentMetadata {
        match self.fetch(id) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Could not fetch metadata for {}: {}", id, e);
                DocumentMetadata::fallback(id)
            }
        }
    }
}

/// Response body of the metadata endpoint (oEmbed shaped)
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    title: Option<String>,
    page_count: Option<u32>,
}

/// Fetches metadata as JSON over HTTP.
pub struct HttpMetadata {
    client: Client,
    url_template: String,
}

impl HttpMetadata {
    pub fn new(url_template: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::MetadataError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url_template: url_template.into() })
    }
}

impl MetadataSource for HttpMetadata {
    fn fetch(&self, id: &DocumentId) -> Result<DocumentMetadata> {
        let url = embed_url(&self.url_template, id);
        debug!("Fetching metadata from {}", url);

        let response = self.client.get(&url).send()?.error_for_status()?;
        let body: MetadataResponse = response.json()?;

        let title = body
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MetadataError("response has no title".into()))?;

        Ok(DocumentMetadata { title, page_count: body.page_count })
    }
}
