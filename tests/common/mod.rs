//! Shared helpers for pipeline integration tests

#![allow(dead_code)]

use embedprint::{
    CaptureOptions, Error, PageElement, PipelineConfig, RenderSurface, Result, ScriptResult, SessionState,
};
use lopdf::{dictionary, Document, Object, Stream};
use std::cell::RefCell;
use std::rc::Rc;

/// Content stream of a page that only paints a white background
pub const BLANK_PAGE: &str = "1 1 1 rg 0 0 595 842 re f";

/// Content stream of a page with visible text
pub fn text_page(label: &str) -> String {
    format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", label)
}

/// Build a PDF with one page per content stream.
pub fn pdf_with_pages(pages: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for content in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Decoded content of every page, in page order
pub fn page_contents(pdf: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|id| doc.get_page_content(*id).unwrap())
        .collect()
}

/// Calls a [`ScriptedSurface`] received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    FindPages,
    Scroll(usize),
    Evaluate,
    Print,
    Close,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// In-memory render surface with scripted answers
pub struct ScriptedSurface {
    pub log: CallLog,
    pub pages: usize,
    pub detached: Vec<usize>,
    pub failing_scripts: Vec<&'static str>,
    pub navigation_fails: bool,
    /// Navigation returns `Ok` without the session leaving `Ready`
    pub navigation_stalls: bool,
    /// `None` makes capture fail
    pub pdf: Option<Vec<u8>>,
    state: SessionState,
}

impl ScriptedSurface {
    pub fn new(log: &CallLog, pages: usize, pdf: Option<Vec<u8>>) -> Self {
        Self {
            log: Rc::clone(log),
            pages,
            detached: Vec::new(),
            failing_scripts: Vec::new(),
            navigation_fails: false,
            navigation_stalls: false,
            pdf,
            state: SessionState::Ready,
        }
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl RenderSurface for ScriptedSurface {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.record(Call::Navigate(url.to_string()));
        if self.navigation_fails {
            return Err(Error::LoadError("net::ERR_NAME_NOT_RESOLVED".into()));
        }
        if !self.navigation_stalls {
            self.state = SessionState::Navigated;
        }
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> Result<ScriptResult> {
        self.record(Call::Evaluate);
        if self.failing_scripts.iter().any(|needle| script.contains(needle)) {
            return Err(Error::ScriptError("Cannot read properties of null".into()));
        }
        Ok(ScriptResult { value: "null".into(), is_error: false })
    }

    fn print_to_pdf(&mut self, _options: &CaptureOptions) -> Result<Vec<u8>> {
        self.record(Call::Print);
        let pdf = self
            .pdf
            .clone()
            .ok_or_else(|| Error::CaptureError("Printing failed (renderer unresponsive)".into()))?;
        self.state = SessionState::Captured;
        Ok(pdf)
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn close(self) -> Result<()> {
        self.record(Call::Close);
        Ok(())
    }

    fn find_pages(&mut self, _selector: &str) -> Result<Vec<PageElement>> {
        self.record(Call::FindPages);
        Ok((0..self.pages).map(PageElement::new).collect())
    }

    fn scroll_into_view(&mut self, page: &PageElement) -> Result<()> {
        self.record(Call::Scroll(page.index));
        if self.detached.contains(&page.index) {
            return Err(Error::ScriptError(format!("page element {} is no longer attached", page.index)));
        }
        Ok(())
    }
}

/// Default configuration with every settle delay removed
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.materialize.initial_settle_ms = 0;
    config.materialize.page_settle_ms = 0;
    config.sanitize.settle_ms = 0;
    config
}

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}
