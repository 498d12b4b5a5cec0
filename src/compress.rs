//! Best-effort PDF compression
//!
//! Compression never fails a run. Whatever goes wrong, the caller gets the
//! input back unchanged.

use crate::{Error, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionBackend {
    /// External Ghostscript `pdfwrite` pass
    Ghostscript,
    /// In-process Flate compression of uncompressed streams
    Streams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    pub enabled: bool,
    pub backend: CompressionBackend,
    /// Ghostscript executable name or path
    pub program: String,
    /// Value for `-dPDFSETTINGS=/<preset>`: screen, ebook, printer or prepress
    pub preset: String,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CompressionBackend::Ghostscript,
            program: "gs".to_string(),
            preset: "ebook".to_string(),
        }
    }
}

/// Outcome of a compression attempt
#[derive(Debug, Clone)]
pub struct Compressed {
    pub pdf: Vec<u8>,
    /// `false` when the input came back unchanged
    pub applied: bool,
    /// Why compression was skipped, if it was
    pub skipped: Option<String>,
}

pub trait Compressor {
    /// Compress `pdf`, reporting any failure.
    fn try_compress(&self, pdf: &[u8]) -> Result<Vec<u8>>;

    /// Compress `pdf`, falling back to the input on failure or when the result
    /// would be larger.
    fn compress(&self, pdf: &[u8]) -> Compressed {
        let unchanged = |reason: String| Compressed { pdf: pdf.to_vec(), applied: false, skipped: Some(reason) };
        match self.try_compress(pdf) {
            Ok(out) if out.len() < pdf.len() => {
                info!(
                    "Compressed PDF from {} to {} bytes ({:.1}% smaller)",
                    pdf.len(),
                    out.len(),
                    100.0 * (pdf.len() - out.len()) as f64 / pdf.len() as f64
                );
                Compressed { pdf: out, applied: true, skipped: None }
            }
            Ok(out) => {
                info!("Compression did not shrink the PDF ({} -> {} bytes); keeping original", pdf.len(), out.len());
                unchanged("compressed output was not smaller".to_string())
            }
            Err(e) => {
                warn!("Compression failed, keeping uncompressed PDF: {}", e);
                unchanged(e.to_string())
            }
        }
    }
}

/// Compressor selected by configuration
pub fn compressor_for(config: &CompressConfig) -> Box<dyn Compressor> {
    match config.backend {
        CompressionBackend::Ghostscript => Box::new(Ghostscript::new(&config.program, &config.preset)),
        CompressionBackend::Streams => Box::new(StreamCompressor),
    }
}

/// Rewrites the PDF through Ghostscript's `pdfwrite` device.
#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: String,
    preset: String,
}

impl Ghostscript {
    pub fn new(program: impl Into<String>, preset: impl Into<String>) -> Self {
        Self { program: program.into(), preset: preset.into() }
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|e| {
            Error::CompressionError(format!("'{}' not found; is Ghostscript installed? ({})", self.program, e))
        })
    }
}

impl Compressor for Ghostscript {
    fn try_compress(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        let program = self.locate()?;
        debug!("Using Ghostscript at {}", program.display());

        let mut input = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        input.write_all(pdf)?;
        input.flush()?;
        let output = tempfile::Builder::new().suffix(".pdf").tempfile()?;

        let status = Command::new(&program)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS=/{}", self.preset))
            .args(["-dNOPAUSE", "-dQUIET", "-dBATCH"])
            .arg(format!("-sOutputFile={}", output.path().display()))
            .arg(input.path())
            .output()
            .map_err(|e| Error::CompressionError(format!("failed to run {}: {}", program.display(), e)))?;

        if !status.status.success() {
            let stderr = String::from_utf8_lossy(&status.stderr);
            return Err(Error::CompressionError(format!(
                "{} exited with {}: {}",
                program.display(),
                status.status,
                stderr.trim()
            )));
        }

        let bytes = std::fs::read(output.path())?;
        if bytes.is_empty() {
            return Err(Error::CompressionError("Ghostscript produced an empty file".into()));
        }
        Ok(bytes)
    }
}

/// Flate-compresses every uncompressed stream with lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamCompressor;

impl Compressor for StreamCompressor {
    fn try_compress(&self, pdf: &[u8]) -> Result<Vec<u8>> {
        let mut doc = lopdf::Document::load_mem(pdf)
            .map_err(|e| Error::CompressionError(format!("Failed to parse PDF for compression: {}", e)))?;
        doc.compress();
        let mut out = Vec::with_capacity(pdf.len());
        doc.save_to(&mut out)
            .map_err(|e| Error::CompressionError(format!("Failed to save compressed PDF: {}", e)))?;
        Ok(out)
    }
}
