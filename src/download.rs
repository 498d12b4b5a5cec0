//! End-to-end download of one document

use crate::document::{embed_url, resolve_document_id, sanitize_filename, DocumentId};
use crate::metadata::{DocumentMetadata, MetadataSource};
use crate::output::{save_pdf, SavedFile};
use crate::pipeline::{RenderPipeline, RunReport};
use crate::{PipelineConfig, RenderSurface, Result, SurfaceConfig};
use log::info;

/// A finished download
#[derive(Debug, Clone)]
pub struct Download {
    pub id: DocumentId,
    pub metadata: DocumentMetadata,
    pub saved: SavedFile,
    pub report: RunReport,
}

/// Resolves the input, fetches metadata, renders and saves the PDF.
pub struct Downloader {
    pipeline: RenderPipeline,
}

impl Downloader {
    pub fn new(config: PipelineConfig) -> Self {
        Self { pipeline: RenderPipeline::new(config) }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    /// Download using headless Chrome and the configured metadata endpoint.
    #[cfg(feature = "cdp")]
    pub fn run(&self, input: &str) -> Result<Download> {
        use crate::metadata::HttpMetadata;

        let config = self.config();
        match HttpMetadata::new(&config.metadata_url_template, config.surface.timeout_ms) {
            Ok(metadata) => self.run_with(input, &metadata, crate::launch_surface),
            Err(e) => {
                log::warn!("Metadata lookups disabled: {}", e);
                self.run_with(input, &NoMetadata, crate::launch_surface)
            }
        }
    }

    /// Download with explicit metadata and render-surface providers.
    ///
    /// Nothing is written unless the pipeline succeeds.
    pub fn run_with<S, F>(&self, input: &str, metadata: &dyn MetadataSource, launch: F) -> Result<Download>
    where
        S: RenderSurface,
        F: FnOnce(&SurfaceConfig) -> Result<S>,
    {
        let config = self.config();
        info!("Starting document download");

        let id = resolve_document_id(input)?;
        info!("Document ID: {}", id);

        let metadata = metadata.fetch_or_fallback(&id);
        info!("Title: {}", metadata.title);
        match metadata.page_count {
            Some(pages) => info!("Page count: {}", pages),
            None => info!("Page count: N/A"),
        }

        let url = embed_url(&config.embed_url_template, &id);
        let rendered = self.pipeline.run(&url, launch)?;
        info!("PDF generated from browser");

        let saved = save_pdf(&config.output_dir, &sanitize_filename(&metadata.title), &rendered.pdf)?;
        info!("Saved to: {}", saved.path.display());
        info!("File size: {:.2} MB", saved.size_mb());

        Ok(Download { id, metadata, saved, report: rendered.report })
    }
}

/// Metadata source that always falls back
#[cfg(feature = "cdp")]
struct NoMetadata;

#[cfg(feature = "cdp")]
impl MetadataSource for NoMetadata {
    fn fetch(&self, _id: &DocumentId) -> Result<DocumentMetadata> {
        Err(crate::Error::MetadataError("no metadata source".into()))
    }
}
