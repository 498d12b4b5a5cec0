//! Chrome DevTools Protocol render surface

use crate::{CaptureOptions, Error, RenderSurface, Result, ScriptResult, SessionState, SurfaceConfig};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Runtime::RemoteObjectSubtype;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use serde_json::json;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Headless Chrome session driven over CDP (uses the `headless_chrome` crate)
///
/// Launches one Chrome process with a throwaway profile, manages a single tab
/// and implements [`RenderSurface`] over it.
pub struct CdpSurface {
    // Field order matters: the browser must be gone before the profile
    // directory is removed.
    browser: Browser,
    tab: Arc<Tab>,
    state: SessionState,
    timeout: Duration,
    capture_timeout: Duration,
    _profile: TempDir,
}

impl CdpSurface {
    pub fn launch(config: &SurfaceConfig) -> Result<Self> {
        let profile = tempfile::Builder::new()
            .prefix("embedprint-profile-")
            .tempdir()
            .map_err(|e| Error::InitializationError(format!("Failed to create browser profile: {}", e)))?;
        if let Some(destination) = &config.print_destination {
            write_preferences(profile.path(), destination)?;
        }

        let args: Vec<&OsStr> = config.args.iter().map(OsStr::new).collect();
        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .user_data_dir(Some(profile.path().to_path_buf()))
            .args(args)
            .idle_browser_timeout(idle_timeout(config))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        debug!("Launching Chrome (headless: {}, sandbox: {})", config.headless, config.sandbox);
        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        let timeout = Duration::from_millis(config.timeout_ms);
        tab.set_default_timeout(timeout);

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;
        }

        Ok(Self {
            browser,
            tab,
            state: SessionState::Ready,
            timeout,
            capture_timeout: Duration::from_millis(config.capture_timeout_ms),
            _profile: profile,
        })
    }
}

impl RenderSurface for CdpSurface {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        self.state = SessionState::Navigated;
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> Result<ScriptResult> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        if matches!(result.subtype, Some(RemoteObjectSubtype::Error)) {
            let value = result.description.unwrap_or_else(|| "uncaught exception".to_string());
            return Ok(ScriptResult { value, is_error: true });
        }

        let value = result
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "null".to_string());

        Ok(ScriptResult { value, is_error: false })
    }

    fn print_to_pdf(&mut self, options: &CaptureOptions) -> Result<Vec<u8>> {
        let pdf_options = PrintToPdfOptions {
            landscape: Some(options.landscape),
            display_header_footer: Some(options.display_header_footer),
            print_background: Some(options.print_background),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            ..Default::default()
        };

        debug!("Printing with a {:?} timeout", self.capture_timeout);
        self.tab.set_default_timeout(self.capture_timeout);
        let printed = self.tab.print_to_pdf(Some(pdf_options));
        self.tab.set_default_timeout(self.timeout);
        let data = printed.map_err(|e| Error::CaptureError(format!("Page.printToPDF failed: {}", e)))?;

        self.state = SessionState::Captured;
        Ok(data)
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn close(self) -> Result<()> {
        if let Err(e) = self.tab.close(false) {
            debug!("Tab close failed: {}", e);
        }
        // Dropping the browser terminates the Chrome child process; the
        // profile directory goes right after it.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}

/// The driver drops a browser that stays silent for this long, and a long
/// print sends no events, so it never undercuts the capture timeout.
fn idle_timeout(config: &SurfaceConfig) -> Duration {
    Duration::from_millis(config.idle_timeout_ms.max(config.capture_timeout_ms))
}

/// Profile preferences registering `destination` as the sticky print target.
pub fn print_preferences(destination: &str) -> serde_json::Value {
    let app_state = json!({
        "recentDestinations": [{ "id": destination, "origin": "local", "account": "" }],
        "selectedDestinationId": destination,
        "version": 2,
    });
    json!({
        "printing": {
            "print_preview_sticky_settings": {
                "appState": app_state.to_string(),
            }
        }
    })
}

fn write_preferences(profile: &Path, destination: &str) -> Result<()> {
    let default_dir = profile.join("Default");
    std::fs::create_dir_all(&default_dir)
        .map_err(|e| Error::InitializationError(format!("Failed to prepare browser profile: {}", e)))?;
    let prefs = serde_json::to_vec(&print_preferences(destination))
        .map_err(|e| Error::InitializationError(format!("Failed to encode preferences: {}", e)))?;
    std::fs::write(default_dir.join("Preferences"), prefs)
        .map_err(|e| Error::InitializationError(format!("Failed to write preferences: {}", e)))?;
    Ok(())
}
