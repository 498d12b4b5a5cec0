//! Error types for the render pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering and post-processing a document
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to start or configure the render surface
    #[error("Render surface initialization failed: {0}")]
    InitializationError(String),

    /// Failed to navigate to the embed URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to execute JavaScript in the page
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// The print-to-PDF primitive failed or returned nothing usable
    #[error("PDF capture failed: {0}")]
    CaptureError(String),

    /// PDF bytes could not be parsed or written
    #[error("PDF processing failed: {0}")]
    PdfError(String),

    /// External or in-process compression failed
    #[error("Compression failed: {0}")]
    CompressionError(String),

    /// The user input does not resolve to a document identifier
    #[error("Invalid URL or document ID: '{0}'")]
    InvalidDocument(String),

    /// Document metadata could not be fetched or decoded
    #[error("Metadata lookup failed: {0}")]
    MetadataError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` if this error ends a pipeline run.
    ///
    /// Everything else is handled where it is detected and the run carries on
    /// with best-effort output.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::InitializationError(_)
            | Error::LoadError(_)
            | Error::CaptureError(_)
            | Error::InvalidDocument(_)
            | Error::ConfigError(_)
            | Error::Io(_) => true,
            #[cfg(feature = "cdp")]
            Error::CdpError(_) => true,
            Error::ScriptError(_)
            | Error::PdfError(_)
            | Error::CompressionError(_)
            | Error::MetadataError(_)
            | Error::Other(_) => false,
        }
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::PdfError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::MetadataError(err.to_string())
    }
}
