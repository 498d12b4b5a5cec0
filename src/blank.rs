//! Blank page removal
//!
//! A page is blank when its content streams put no visible ink on the paper.
//! Classification looks at one page at a time and never at its neighbours.
//!
//! Ink is anything that could change a pixel on white paper:
//!
//! - text shown with a visible rendering mode and a non-white colour
//! - path fills or strokes painted in a non-white colour
//! - any colour set in a space other than DeviceGray, DeviceRGB or DeviceCMYK
//! - shadings, inline images and image XObjects
//! - form XObjects whose own content contains ink
//!
//! Anything the scanner cannot resolve counts as ink. Dropping a real page is
//! worse than keeping an empty one.

use crate::Result;
use log::{debug, info, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankFilterConfig {
    /// Drop blank pages at all
    pub enabled: bool,
    /// Colour components at or above this level (0.0..=1.0) count as white
    pub white_threshold: f32,
    /// Nested form XObjects deeper than this are assumed to carry ink
    pub max_form_depth: usize,
}

impl Default for BlankFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            white_threshold: 0.98,
            max_form_depth: 8,
        }
    }
}

/// Per-page classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlanknessVerdict {
    Blank,
    NonBlank,
}

/// What a `Do` operand names
pub enum XObject<'a> {
    Image,
    Form {
        operations: Vec<Operation>,
        resources: Box<dyn XObjectResolver + 'a>,
    },
    Missing,
}

/// Lookup of named XObjects in the resources active for a content stream
pub trait XObjectResolver {
    fn resolve(&self, name: &[u8]) -> XObject<'_>;
}

/// Resolver for content with no XObject resources
pub struct NoXObjects;

impl XObjectResolver for NoXObjects {
    fn resolve(&self, _name: &[u8]) -> XObject<'_> {
        XObject::Missing
    }
}

/// Colour space a `sc`/`scn` operand list is read in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Separation, DeviceN, Indexed, Pattern, ICCBased or a named resource.
    /// Whiteness cannot be judged from the operands alone.
    Opaque,
}

impl ColorSpace {
    fn from_operand(operand: Option<&Object>) -> Self {
        match operand {
            Some(Object::Name(name)) => match name.as_slice() {
                b"DeviceGray" | b"G" => ColorSpace::Gray,
                b"DeviceRGB" | b"RGB" => ColorSpace::Rgb,
                b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
                _ => ColorSpace::Opaque,
            },
            _ => ColorSpace::Opaque,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    fill_space: ColorSpace,
    stroke_space: ColorSpace,
    fill_white: bool,
    stroke_white: bool,
    text_mode: i64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        // Initial colour in every device space is black
        Self {
            fill_space: ColorSpace::Gray,
            stroke_space: ColorSpace::Gray,
            fill_white: false,
            stroke_white: false,
            text_mode: 0,
        }
    }
}

impl GraphicsState {
    fn text_visible(&self) -> bool {
        match self.text_mode {
            0 | 4 => !self.fill_white,
            1 | 5 => !self.stroke_white,
            2 | 6 => !(self.fill_white && self.stroke_white),
            _ => false,
        }
    }
}

/// Stateless ink scanner over decoded content operations
#[derive(Debug, Clone, Copy)]
pub struct BlankClassifier {
    white_threshold: f32,
    max_form_depth: usize,
}

impl Default for BlankClassifier {
    fn default() -> Self {
        Self::from(&BlankFilterConfig::default())
    }
}

impl From<&BlankFilterConfig> for BlankClassifier {
    fn from(config: &BlankFilterConfig) -> Self {
        Self {
            white_threshold: config.white_threshold,
            max_form_depth: config.max_form_depth,
        }
    }
}

impl BlankClassifier {
    pub fn classify(&self, operations: &[Operation], resources: &dyn XObjectResolver) -> BlanknessVerdict {
        if self.has_ink(operations, resources, GraphicsState::default(), 0) {
            BlanknessVerdict::NonBlank
        } else {
            BlanknessVerdict::Blank
        }
    }

    fn has_ink(
        &self,
        operations: &[Operation],
        resources: &dyn XObjectResolver,
        initial: GraphicsState,
        depth: usize,
    ) -> bool {
        let mut state = initial;
        let mut saved: Vec<GraphicsState> = Vec::new();

        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => saved.push(state),
                "Q" => state = saved.pop().unwrap_or(initial),

                "g" => {
                    state.fill_space = ColorSpace::Gray;
                    state.fill_white = self.is_white_gray(operands);
                }
                "G" => {
                    state.stroke_space = ColorSpace::Gray;
                    state.stroke_white = self.is_white_gray(operands);
                }
                "rg" => {
                    state.fill_space = ColorSpace::Rgb;
                    state.fill_white = self.is_white_rgb(operands);
                }
                "RG" => {
                    state.stroke_space = ColorSpace::Rgb;
                    state.stroke_white = self.is_white_rgb(operands);
                }
                "k" => {
                    state.fill_space = ColorSpace::Cmyk;
                    state.fill_white = self.is_white_cmyk(operands);
                }
                "K" => {
                    state.stroke_space = ColorSpace::Cmyk;
                    state.stroke_white = self.is_white_cmyk(operands);
                }
                "sc" | "scn" => state.fill_white = self.is_white_in(state.fill_space, operands),
                "SC" | "SCN" => state.stroke_white = self.is_white_in(state.stroke_space, operands),
                "cs" => {
                    state.fill_space = ColorSpace::from_operand(operands.first());
                    state.fill_white = false;
                }
                "CS" => {
                    state.stroke_space = ColorSpace::from_operand(operands.first());
                    state.stroke_white = false;
                }
                "Tr" => state.text_mode = operands.first().and_then(number).map(|m| m as i64).unwrap_or(0),

                "Tj" | "'" | "\"" => {
                    if state.text_visible() && operands.last().is_some_and(shows_glyphs) {
                        return true;
                    }
                }
                "TJ" => {
                    let shown = match operands.first() {
                        Some(Object::Array(items)) => items.iter().any(shows_glyphs),
                        _ => false,
                    };
                    if state.text_visible() && shown {
                        return true;
                    }
                }

                "f" | "F" | "f*" => {
                    if !state.fill_white {
                        return true;
                    }
                }
                "S" | "s" => {
                    if !state.stroke_white {
                        return true;
                    }
                }
                "B" | "B*" | "b" | "b*" => {
                    if !(state.fill_white && state.stroke_white) {
                        return true;
                    }
                }

                "sh" | "BI" | "ID" | "EI" => return true,

                "Do" => {
                    let Some(Object::Name(name)) = operands.first() else {
                        return true;
                    };
                    match resources.resolve(name) {
                        XObject::Image | XObject::Missing => return true,
                        XObject::Form { operations, resources } => {
                            if depth >= self.max_form_depth {
                                return true;
                            }
                            if self.has_ink(&operations, resources.as_ref(), state, depth + 1) {
                                return true;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn is_white_gray(&self, operands: &[Object]) -> bool {
        match operands {
            [gray] => number(gray).is_some_and(|v| v >= self.white_threshold),
            _ => false,
        }
    }

    fn is_white_rgb(&self, operands: &[Object]) -> bool {
        operands.len() == 3
            && operands.iter().all(|c| number(c).is_some_and(|v| v >= self.white_threshold))
    }

    fn is_white_cmyk(&self, operands: &[Object]) -> bool {
        let max_ink = 1.0 - self.white_threshold;
        operands.len() == 4 && operands.iter().all(|c| number(c).is_some_and(|v| v <= max_ink))
    }

    /// `sc`/`scn` operands read in the active colour space. Only the device
    /// spaces can be white; a spot tint or palette index is always ink.
    fn is_white_in(&self, space: ColorSpace, operands: &[Object]) -> bool {
        match space {
            ColorSpace::Gray => self.is_white_gray(operands),
            ColorSpace::Rgb => self.is_white_rgb(operands),
            ColorSpace::Cmyk => self.is_white_cmyk(operands),
            ColorSpace::Opaque => false,
        }
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn shows_glyphs(obj: &Object) -> bool {
    match obj {
        Object::String(bytes, _) => bytes.iter().any(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0c)),
        _ => false,
    }
}

/// XObject lookups backed by a parsed document
struct DocumentResources<'a> {
    doc: &'a Document,
    xobjects: Option<Dictionary>,
}

impl<'a> DocumentResources<'a> {
    fn new(doc: &'a Document, resources: Option<&Dictionary>) -> Self {
        let xobjects = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| as_dictionary(doc, obj))
            .cloned();
        Self { doc, xobjects }
    }
}

impl XObjectResolver for DocumentResources<'_> {
    fn resolve(&self, name: &[u8]) -> XObject<'_> {
        let Some(entry) = self.xobjects.as_ref().and_then(|x| x.get(name).ok()) else {
            return XObject::Missing;
        };
        let stream = match entry {
            Object::Reference(id) => self.doc.get_object(*id).and_then(Object::as_stream),
            other => other.as_stream(),
        };
        let Ok(stream) = stream else {
            return XObject::Missing;
        };

        match stream.dict.get(b"Subtype") {
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Image" => XObject::Image,
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Form" => {
                let raw = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
                let Ok(content) = Content::decode(&raw) else {
                    return XObject::Missing;
                };
                // Forms without their own resources inherit the caller's
                let resources = match stream.dict.get(b"Resources").ok().and_then(|r| as_dictionary(self.doc, r)) {
                    Some(own) => DocumentResources::new(self.doc, Some(own)),
                    None => DocumentResources { doc: self.doc, xobjects: self.xobjects.clone() },
                };
                XObject::Form { operations: content.operations, resources: Box::new(resources) }
            }
            _ => XObject::Missing,
        }
    }
}

fn as_dictionary<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

/// Resources of a page, following the `Parent` chain for inherited entries.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    loop {
        if let Ok(res) = node.get(b"Resources") {
            return as_dictionary(doc, res);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent).ok()?.as_dict().ok()?;
    }
}

/// Classify one page of a parsed document.
pub fn classify_page(doc: &Document, page_id: ObjectId, classifier: &BlankClassifier) -> BlanknessVerdict {
    let content = match doc.get_page_content(page_id).and_then(|raw| Content::decode(&raw)) {
        Ok(content) => content,
        Err(e) => {
            debug!("Page {:?} content unreadable ({}); keeping it", page_id, e);
            return BlanknessVerdict::NonBlank;
        }
    };
    let resources = DocumentResources::new(doc, inherited_resources(doc, page_id));
    classifier.classify(&content.operations, &resources)
}

/// Result of a filter pass
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub pdf: Vec<u8>,
    /// Page count before filtering
    pub total: usize,
    /// One-based numbers of the dropped pages, ascending
    pub removed: Vec<u32>,
}

impl FilterOutcome {
    pub fn kept(&self) -> usize {
        self.total - self.removed.len()
    }

    /// Every page was blank. Usually means materialization did not work.
    pub fn all_blank(&self) -> bool {
        self.total > 0 && self.removed.len() == self.total
    }
}

/// Remove every blank page, keeping the rest in their original order.
///
/// Kept pages are not re-encoded. When nothing is removed the input bytes are
/// returned untouched.
pub fn filter(pdf: &[u8], config: &BlankFilterConfig) -> Result<FilterOutcome> {
    let mut doc = Document::load_mem(pdf)?;
    let pages = doc.get_pages();
    let total = pages.len();
    let unchanged = |total| FilterOutcome { pdf: pdf.to_vec(), total, removed: Vec::new() };

    if total == 0 {
        debug!("PDF has no pages; nothing to filter");
        return Ok(unchanged(0));
    }

    let classifier = BlankClassifier::from(config);
    let removed: Vec<u32> = pages
        .iter()
        .filter(|(_, id)| classify_page(&doc, **id, &classifier) == BlanknessVerdict::Blank)
        .map(|(number, _)| *number)
        .collect();

    if removed.is_empty() {
        info!("No blank pages found in {} pages", total);
        return Ok(unchanged(total));
    }

    doc.delete_pages(&removed);
    doc.prune_objects();
    let mut out = Vec::with_capacity(pdf.len());
    doc.save_to(&mut out)?;

    if removed.len() == total {
        warn!("All {} pages were blank; the page content probably never rendered", total);
    } else {
        info!("Removed {} blank pages of {}", removed.len(), total);
    }
    Ok(FilterOutcome { pdf: out, total, removed })
}
