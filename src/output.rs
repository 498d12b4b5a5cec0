//! Writing finished PDFs to disk

use crate::Result;
use log::info;
use std::path::{Path, PathBuf};

/// A PDF written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub size: u64,
}

impl SavedFile {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// Write `pdf` to `<dir>/<stem>.pdf`, creating `dir` if needed.
pub fn save_pdf(dir: &Path, stem: &str, pdf: &[u8]) -> Result<SavedFile> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        info!("Created directory '{}'", dir.display());
    }
    let path = dir.join(format!("{}.pdf", stem));
    std::fs::write(&path, pdf)?;
    let size = std::fs::metadata(&path)?.len();
    Ok(SavedFile { path, size })
}
