//! embedprint
//!
//! Renders a paginated document from a remote viewer embed inside a controlled
//! Chrome instance, captures it as a single PDF and cleans the result up.
//!
//! The pipeline runs strictly in sequence on one render surface:
//!
//! 1. **RenderSurface** launches the browser with print-to-PDF defaults.
//! 2. **Materialization** scrolls every page element into view so lazily
//!    rendered pages mount their real content.
//! 3. **Sanitization** strips viewer chrome (toolbars, scroll containers).
//! 4. **Capture** prints the document to PDF bytes.
//! 5. **Blank-page filter** drops pages with no visible ink.
//! 6. **Compression** shrinks the result, falling back to the input.
//!
//! # Example
//!
//! ```no_run
//! use embedprint::{PipelineConfig, RenderPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = RenderPipeline::new(PipelineConfig::default());
//! let rendered = pipeline.run_cdp("https://www.scribd.com/embeds/123456789/content")?;
//! std::fs::write("out.pdf", &rendered.pdf)?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod blank;
pub mod capture;
pub mod compress;
pub mod config;
pub mod document;
pub mod download;
pub mod materialize;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod sanitize;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use capture::CaptureOptions;
pub use config::PipelineConfig;
pub use download::Downloader;
pub use pipeline::{RenderPipeline, RenderedDocument, RunReport, Stage, Warning};

/// Attribute stamped onto matched page elements so later calls can find them
/// again without re-running the page selector.
pub const PAGE_MARKER_ATTR: &str = "data-embedprint-page";

/// Configuration for the render surface
///
/// Defaults mirror the flags the viewer is known to work with: GPU off,
/// shared-memory workaround on, Chrome sandbox off, and "Save as PDF" registered
/// as the print destination so nothing can prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Keep Chrome's process sandbox enabled
    pub sandbox: bool,
    /// Window dimensions
    pub viewport: Viewport,
    /// Optional user agent override
    pub user_agent: Option<String>,
    /// Explicit Chrome/Chromium binary; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Extra command-line switches passed to Chrome
    pub args: Vec<String>,
    /// Default timeout for navigation and other CDP calls in milliseconds
    pub timeout_ms: u64,
    /// Timeout for `Page.printToPDF`; long documents print slowly
    pub capture_timeout_ms: u64,
    /// How long the browser may stay silent before the driver gives up on it
    pub idle_timeout_ms: u64,
    /// Sticky print destination written into the profile preferences
    pub print_destination: Option<String>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: false,
            viewport: Viewport::default(),
            user_agent: None,
            chrome_path: None,
            args: vec![
                "--disable-gpu".to_string(),
                "--start-maximized".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--kiosk-printing".to_string(),
            ],
            timeout_ms: 30000,
            capture_timeout_ms: 180000,
            idle_timeout_ms: 120000,
            print_destination: Some("Save as PDF".to_string()),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Lifecycle of a render session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No browser yet
    Uninitialized,
    /// Browser launched, nothing loaded yet
    Ready,
    Navigated,
    Captured,
    /// Browser released; the surface is gone
    Closed,
}

/// A transient reference to a page element in the navigated document.
///
/// Only valid for the navigation it was found in. The element is addressed
/// through [`PAGE_MARKER_ATTR`], so a re-render that drops the attribute makes
/// the reference dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageElement {
    /// Zero-based position in DOM order at query time
    pub index: usize,
}

impl PageElement {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// CSS selector addressing exactly this element
    pub fn selector(&self) -> String {
        format!("[{}=\"{}\"]", PAGE_MARKER_ATTR, self.index)
    }
}

/// Result of JavaScript execution
///
/// `value` is the serialized result of the evaluation (usually a JSON-like
/// string). `is_error` indicates whether the script threw an exception.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Serialized result value
    pub value: String,
    /// Whether the script threw an error
    pub is_error: bool,
}

/// A browser session the pipeline drives.
///
/// Implementations own exactly one browser process or context. The pipeline
/// never shares a surface between runs.
pub trait RenderSurface {
    /// Navigate to `url` and wait for the load to finish
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Evaluate JavaScript in the page's global context
    fn evaluate(&mut self, script: &str) -> Result<ScriptResult>;

    /// Print the current document to PDF and return the decoded bytes
    fn print_to_pdf(&mut self, options: &CaptureOptions) -> Result<Vec<u8>>;

    /// Current lifecycle state
    fn state(&self) -> SessionState;

    /// Close the session and release the browser
    fn close(self) -> Result<()>
    where
        Self: Sized;

    // --- Higher-level helpers (default implementations) ---

    /// Query every element matching `selector`, in DOM order, and tag each
    /// one so it can be addressed later.
    fn find_pages(&mut self, selector: &str) -> Result<Vec<PageElement>> {
        let result = self.evaluate(&materialize::mark_pages_script(selector))?;
        if result.is_error {
            return Err(Error::ScriptError(result.value));
        }
        let count = result
            .value
            .trim()
            .trim_matches('"')
            .parse::<usize>()
            .map_err(|e| Error::ScriptError(format!("Unexpected page count '{}': {}", result.value, e)))?;
        Ok((0..count).map(PageElement::new).collect())
    }

    /// Scroll a previously found page element into the viewport
    fn scroll_into_view(&mut self, page: &PageElement) -> Result<()> {
        let result = self.evaluate(&materialize::scroll_into_view_script(page))?;
        if result.is_error || result.value.trim() != "true" {
            return Err(Error::ScriptError(format!(
                "page element {} is no longer attached",
                page.index
            )));
        }
        Ok(())
    }
}

/// Launch the default render surface (headless Chrome over CDP)
#[cfg(feature = "cdp")]
pub fn launch_surface(config: &SurfaceConfig) -> Result<cdp::CdpSurface> {
    cdp::CdpSurface::launch(config)
}
