//! Viewer chrome removal
//!
//! Runs an ordered list of DOM mutations before capture so the printed PDF only
//! holds document content. Every step is guarded on its own.

use crate::{RenderSurface, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One named DOM mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeStep {
    pub name: String,
    pub script: String,
}

impl SanitizeStep {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self { name: name.into(), script: script.into() }
    }

    /// Remove the first element matching `selector`, if there is one.
    pub fn remove_element(name: impl Into<String>, selector: &str) -> Self {
        let literal = js_literal(selector);
        Self::new(
            name,
            format!("var el = document.querySelector({}); if (el) el.parentNode.removeChild(el);", literal),
        )
    }

    /// Clear the class attribute of every element matching `selector`.
    pub fn strip_class(name: impl Into<String>, selector: &str) -> Self {
        let literal = js_literal(selector);
        Self::new(
            name,
            format!(
                "var els = document.querySelectorAll({}); for (var i = 0; i < els.length; i++) {{ els[i].setAttribute('class', ''); }}",
                literal
            ),
        )
    }
}

fn js_literal(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Mutations, run in order
    pub steps: Vec<SanitizeStep>,
    /// Pause after the last step so layout can reflow before capture
    pub settle_ms: u64,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                SanitizeStep::remove_element("toolbar_top", ".toolbar_top"),
                SanitizeStep::remove_element("toolbar_bottom", ".toolbar_bottom"),
                SanitizeStep::strip_class("document_scroller", ".document_scroller"),
            ],
            settle_ms: 1000,
        }
    }
}

/// Run every sanitization step. Returns the names of the steps that failed.
pub fn sanitize<S: RenderSurface>(surface: &mut S, config: &SanitizeConfig) -> Vec<String> {
    debug!("Removing viewer UI elements (toolbars, scroll containers)");
    let mut failed = Vec::new();
    for step in &config.steps {
        if let Err(e) = run_step(surface, step) {
            warn!("Cleanup step '{}' failed: {}", step.name, e);
            failed.push(step.name.clone());
        }
    }
    std::thread::sleep(Duration::from_millis(config.settle_ms));
    failed
}

fn run_step<S: RenderSurface>(surface: &mut S, step: &SanitizeStep) -> Result<()> {
    let result = surface.evaluate(&step.script)?;
    if result.is_error {
        return Err(crate::Error::ScriptError(result.value));
    }
    debug!("Cleanup step '{}' applied", step.name);
    Ok(())
}
