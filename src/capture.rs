//! PDF capture through the browser's native print-to-PDF

use crate::{Error, RenderSurface, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};

/// Options handed to the print-to-PDF primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    pub landscape: bool,
    pub display_header_footer: bool,
    pub print_background: bool,
    /// Let the document's own `@page` rules decide the paper size
    pub prefer_css_page_size: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            landscape: false,
            display_header_footer: false,
            print_background: true,
            prefer_css_page_size: true,
        }
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Print the sanitized document. Any failure is final for the run.
pub fn capture<S: RenderSurface>(surface: &mut S, options: &CaptureOptions) -> Result<Vec<u8>> {
    info!("Generating PDF from browser content");
    let bytes = surface.print_to_pdf(options).map_err(|e| {
        error!("Page.printToPDF failed: {}", e);
        match e {
            Error::CaptureError(_) => e,
            other => Error::CaptureError(other.to_string()),
        }
    })?;

    if bytes.is_empty() {
        error!("Page.printToPDF returned no data");
        return Err(Error::CaptureError("print-to-PDF returned an empty document".into()));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        error!("Page.printToPDF returned {} bytes that are not a PDF", bytes.len());
        return Err(Error::CaptureError("print-to-PDF output lacks a PDF header".into()));
    }

    info!("Captured {} bytes of PDF", bytes.len());
    Ok(bytes)
}

/// Number of pages in a PDF byte stream.
pub fn page_count(pdf: &[u8]) -> Result<usize> {
    let doc = lopdf::Document::load_mem(pdf)?;
    Ok(doc.get_pages().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptResult, SessionState};

    struct Printer(Result<Vec<u8>>);

    impl RenderSurface for Printer {
        fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        fn evaluate(&mut self, _script: &str) -> Result<ScriptResult> {
            Ok(ScriptResult { value: "null".into(), is_error: false })
        }

        fn print_to_pdf(&mut self, _options: &CaptureOptions) -> Result<Vec<u8>> {
            std::mem::replace(&mut self.0, Ok(Vec::new()))
        }

        fn state(&self) -> SessionState {
            SessionState::Navigated
        }

        fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn default_options_are_portrait_with_background() {
        let opts = CaptureOptions::default();
        assert!(!opts.landscape);
        assert!(!opts.display_header_footer);
        assert!(opts.print_background);
        assert!(opts.prefer_css_page_size);
    }

    #[test]
    fn returns_pdf_bytes() {
        let mut printer = Printer(Ok(b"%PDF-1.4\n%%EOF".to_vec()));
        let bytes = capture(&mut printer, &CaptureOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn surface_failure_becomes_capture_error() {
        let mut printer = Printer(Err(Error::Other("renderer unresponsive".into())));
        let err = capture(&mut printer, &CaptureOptions::default()).unwrap_err();
        assert!(matches!(err, Error::CaptureError(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn page_count_rejects_garbage() {
        assert!(matches!(page_count(b"%PDF-1.4 truncated"), Err(Error::PdfError(_))));
    }

    #[test]
    fn empty_output_is_rejected() {
        let mut printer = Printer(Ok(Vec::new()));
        assert!(capture(&mut printer, &CaptureOptions::default()).is_err());
    }
}
