//! Render pipeline orchestration
//!
//! ```text
//! Idle -> SessionReady -> Navigated -> Materialized -> Sanitized -> Captured
//!      -> Filtered -> Compressed -> Done
//! ```
//!
//! Any fatal error moves the run to `Failed`. The browser session is closed on
//! every path out of the browser phase, including panics.

use crate::blank::{self, FilterOutcome};
use crate::compress::{compressor_for, Compressor};
use crate::config::PipelineConfig;
use crate::materialize::materialize;
use crate::sanitize::sanitize;
use crate::{capture, Error, RenderSurface, Result, SessionState, SurfaceConfig};
use log::{debug, error, info, warn};
use std::fmt;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    SessionReady,
    Navigated,
    Materialized,
    Sanitized,
    Captured,
    Filtered,
    Compressed,
    Done,
    Failed,
}

/// A degraded condition the run recovered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The page selector matched nothing; the PDF is likely incomplete
    NoPageElements,
    /// One page element could not be scrolled into view (zero-based index)
    ScrollFailed { index: usize },
    /// A viewer cleanup step failed
    SanitizeStepFailed { step: String },
    /// The captured PDF could not be parsed for blank-page detection
    FilterSkipped { reason: String },
    /// Every captured page was blank
    AllPagesBlank { pages: usize },
    /// Compression did not apply; the output is uncompressed
    CompressionSkipped { reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NoPageElements => write!(f, "no page elements found; output may be incomplete"),
            Warning::ScrollFailed { index } => write!(f, "could not scroll to page element {}", index + 1),
            Warning::SanitizeStepFailed { step } => write!(f, "viewer cleanup step '{}' failed", step),
            Warning::FilterSkipped { reason } => write!(f, "blank-page filter skipped: {}", reason),
            Warning::AllPagesBlank { pages } => write!(f, "all {} captured pages were blank", pages),
            Warning::CompressionSkipped { reason } => write!(f, "compression skipped: {}", reason),
        }
    }
}

/// What happened during a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stage: Stage,
    /// Last observed state of the browser session
    pub session: SessionState,
    /// Page elements matched during materialization
    pub page_elements: usize,
    /// Pages in the captured PDF, when it could be parsed
    pub captured_pages: Option<usize>,
    /// One-based numbers of pages dropped as blank
    pub removed_pages: Vec<u32>,
    pub compressed: bool,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            session: SessionState::Uninitialized,
            page_elements: 0,
            captured_pages: None,
            removed_pages: Vec::new(),
            compressed: false,
            warnings: Vec::new(),
        }
    }

    fn advance(&mut self, stage: Stage) {
        debug!("Pipeline stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    /// Pages in the final PDF, when known
    pub fn final_pages(&self) -> Option<usize> {
        self.captured_pages.map(|n| n - self.removed_pages.len())
    }
}

/// A finished PDF and the report of the run that produced it
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pdf: Vec<u8>,
    pub report: RunReport,
}

/// Exclusive owner of one render surface. Closes it when dropped.
struct Session<S: RenderSurface> {
    surface: Option<S>,
}

impl<S: RenderSurface> Session<S> {
    fn new(surface: S) -> Self {
        Self { surface: Some(surface) }
    }

    fn state(&self) -> SessionState {
        self.surface.as_ref().map_or(SessionState::Closed, |s| s.state())
    }

    fn surface(&mut self) -> Result<&mut S> {
        self.surface
            .as_mut()
            .ok_or_else(|| Error::Other("render session already closed".into()))
    }

    fn close(&mut self) {
        if let Some(surface) = self.surface.take() {
            debug!("Closing browser session ({:?})", surface.state());
            if let Err(e) = surface.close() {
                warn!("Browser did not close cleanly: {}", e);
            }
        }
    }
}

impl<S: RenderSurface> Drop for Session<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drives one document from URL to finished PDF bytes.
pub struct RenderPipeline {
    config: PipelineConfig,
}

impl RenderPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run against headless Chrome.
    #[cfg(feature = "cdp")]
    pub fn run_cdp(&self, url: &str) -> Result<RenderedDocument> {
        self.run(url, crate::launch_surface)
    }

    /// Run with a surface produced by `launch` and the configured compressor.
    pub fn run<S, F>(&self, url: &str, launch: F) -> Result<RenderedDocument>
    where
        S: RenderSurface,
        F: FnOnce(&SurfaceConfig) -> Result<S>,
    {
        let compressor = compressor_for(&self.config.compress);
        self.run_with(url, launch, compressor.as_ref())
    }

    /// Run with an explicit compressor.
    pub fn run_with<S, F>(&self, url: &str, launch: F, compressor: &dyn Compressor) -> Result<RenderedDocument>
    where
        S: RenderSurface,
        F: FnOnce(&SurfaceConfig) -> Result<S>,
    {
        let mut report = RunReport::new();
        match self.execute(url, launch, compressor, &mut report) {
            Ok(pdf) => {
                report.advance(Stage::Done);
                for warning in &report.warnings {
                    debug!("Run warning: {}", warning);
                }
                Ok(RenderedDocument { pdf, report })
            }
            Err(e) => {
                error!("Pipeline failed after stage {:?}: {}", report.stage, e);
                report.advance(Stage::Failed);
                Err(e)
            }
        }
    }

    fn execute<S, F>(&self, url: &str, launch: F, compressor: &dyn Compressor, report: &mut RunReport) -> Result<Vec<u8>>
    where
        S: RenderSurface,
        F: FnOnce(&SurfaceConfig) -> Result<S>,
    {
        let surface = launch(&self.config.surface).map_err(|e| {
            error!("Failed to start the browser. Check that Chrome is installed and compatible.");
            match e {
                Error::InitializationError(_) => e,
                other => Error::InitializationError(other.to_string()),
            }
        })?;
        report.advance(Stage::SessionReady);

        let mut session = Session::new(surface);
        report.session = session.state();
        let captured = self.browse(&mut session, url, report);
        session.close();
        report.session = session.state();
        let mut pdf = captured?;

        report.captured_pages = capture::page_count(&pdf).ok();
        if let Some(pages) = report.captured_pages {
            info!("Captured PDF has {} pages", pages);
        }

        if self.config.blank_filter.enabled {
            info!("Removing blank pages");
            pdf = self.filter(pdf, report);
        } else {
            info!("Skipping blank page removal");
        }
        report.advance(Stage::Filtered);

        if self.config.compress.enabled {
            info!("Compressing PDF");
            let compressed = compressor.compress(&pdf);
            report.compressed = compressed.applied;
            if let Some(reason) = compressed.skipped {
                report.warnings.push(Warning::CompressionSkipped { reason });
            }
            pdf = compressed.pdf;
        } else {
            info!("Skipping PDF compression");
        }
        report.advance(Stage::Compressed);

        Ok(pdf)
    }

    /// Navigate, materialize, sanitize and capture. Only navigation and capture
    /// can fail the run.
    fn browse<S: RenderSurface>(&self, session: &mut Session<S>, url: &str, report: &mut RunReport) -> Result<Vec<u8>> {
        let surface = session.surface()?;

        info!("Opening URL: {}", url);
        surface.navigate(url)?;
        if surface.state() != SessionState::Navigated {
            return Err(Error::LoadError(format!(
                "navigation to {} returned but the session is {:?}",
                url,
                surface.state()
            )));
        }
        report.session = surface.state();
        report.advance(Stage::Navigated);

        let materialized = materialize(surface, &self.config.materialize);
        report.page_elements = materialized.found;
        if materialized.is_empty() {
            report.warnings.push(Warning::NoPageElements);
        }
        report
            .warnings
            .extend(materialized.failed.iter().map(|&index| Warning::ScrollFailed { index }));
        report.advance(Stage::Materialized);

        let failed_steps = sanitize(surface, &self.config.sanitize);
        report
            .warnings
            .extend(failed_steps.into_iter().map(|step| Warning::SanitizeStepFailed { step }));
        report.advance(Stage::Sanitized);

        let pdf = capture::capture(surface, &self.config.capture)?;
        report.session = surface.state();
        report.advance(Stage::Captured);
        Ok(pdf)
    }

    fn filter(&self, pdf: Vec<u8>, report: &mut RunReport) -> Vec<u8> {
        match blank::filter(&pdf, &self.config.blank_filter) {
            Ok(outcome) => {
                if outcome.all_blank() {
                    report.warnings.push(Warning::AllPagesBlank { pages: outcome.total });
                }
                let FilterOutcome { pdf, total, removed } = outcome;
                report.captured_pages = Some(total);
                report.removed_pages = removed;
                pdf
            }
            Err(e) => {
                warn!("Blank page detection skipped: {}", e);
                report.warnings.push(Warning::FilterSkipped { reason: e.to_string() });
                pdf
            }
        }
    }
}
