//! Page materialization
//!
//! Viewer embeds mount page content lazily: a page only swaps its placeholder
//! for real content once it nears the viewport. Materialization walks every
//! page element in DOM order, scrolls it into view and waits for it to settle.

use crate::{PageElement, RenderSurface, PAGE_MARKER_ATTR};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Matches anything whose class mentions "page".
pub const DEFAULT_PAGE_SELECTOR: &str = "[class*='page']";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializeConfig {
    /// Selector for elements that look like document pages
    pub page_selector: String,
    /// Pause after navigation before querying page elements
    pub initial_settle_ms: u64,
    /// Pause after scrolling each page element into view
    pub page_settle_ms: u64,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            page_selector: DEFAULT_PAGE_SELECTOR.to_string(),
            initial_settle_ms: 5000,
            page_settle_ms: 3000,
        }
    }
}

/// Outcome of a materialization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materialized {
    /// Number of page elements matched by the selector
    pub found: usize,
    /// Zero-based indices of elements that could not be scrolled to
    pub failed: Vec<usize>,
}

impl Materialized {
    pub fn is_empty(&self) -> bool {
        self.found == 0
    }

    pub fn scrolled(&self) -> usize {
        self.found - self.failed.len()
    }
}

/// Force every page element of the navigated document to render.
///
/// Never fails: a failed query is treated like zero matches, and a failed
/// scroll only skips that one element.
pub fn materialize<S: RenderSurface>(surface: &mut S, config: &MaterializeConfig) -> Materialized {
    info!("Scrolling through document pages");
    debug!("Waiting {}ms for the document to initialize", config.initial_settle_ms);
    std::thread::sleep(Duration::from_millis(config.initial_settle_ms));

    let pages = match surface.find_pages(&config.page_selector) {
        Ok(pages) => pages,
        Err(e) => {
            warn!("Page query for '{}' failed: {}", config.page_selector, e);
            Vec::new()
        }
    };

    if pages.is_empty() {
        error!(
            "CRITICAL: no page elements found with selector '{}'; the download will be incomplete",
            config.page_selector
        );
        return Materialized::default();
    }

    let total = pages.len();
    info!("Found {} page elements, scrolling", total);

    let mut failed = Vec::new();
    for page in &pages {
        match surface.scroll_into_view(page) {
            Ok(()) => {
                debug!("Scrolled to page {}/{}", page.index + 1, total);
                std::thread::sleep(Duration::from_millis(config.page_settle_ms));
            }
            Err(e) => {
                warn!("Failed to scroll to page element {}: {}", page.index + 1, e);
                failed.push(page.index);
            }
        }
    }

    info!("Finished scrolling {} of {} pages", total - failed.len(), total);
    Materialized { found: total, failed }
}

/// Script that tags each selector match with its DOM-order index and returns
/// the number of matches.
pub fn mark_pages_script(selector: &str) -> String {
    // serde_json string encoding doubles as JS string literal escaping
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(function() {{
    var els = document.querySelectorAll({literal});
    for (var i = 0; i < els.length; i++) {{
        els[i].setAttribute('{attr}', String(i));
    }}
    return els.length;
}})()"#,
        literal = literal,
        attr = PAGE_MARKER_ATTR,
    )
}

/// Script that scrolls one tagged element into view. Returns `false` when the
/// element is gone.
pub fn scroll_into_view_script(page: &PageElement) -> String {
    let literal = serde_json::to_string(&page.selector()).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(function() {{
    var el = document.querySelector({literal});
    if (!el) return false;
    el.scrollIntoView();
    return true;
}})()"#,
        literal = literal,
    )
}
