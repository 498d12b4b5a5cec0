//! Pipeline runs against a scripted render surface

mod common;

use common::{fast_config, new_log, page_contents, pdf_with_pages, text_page, Call, ScriptedSurface, BLANK_PAGE};
use embedprint::compress::StreamCompressor;
use embedprint::{Error, RenderPipeline, SessionState, Stage, Warning};

const URL: &str = "https://viewer.test/embeds/42/content";

fn three_pages() -> Vec<u8> {
    pdf_with_pages(&[text_page("1"), text_page("2"), text_page("3")])
}

#[test]
fn test_happy_path_order_of_calls() {
    let log = new_log();
    let pipeline = RenderPipeline::new(fast_config());
    let surface = ScriptedSurface::new(&log, 3, Some(three_pages()));

    let rendered = pipeline.run(URL, |_| Ok(surface)).unwrap();

    let calls = log.borrow().clone();
    assert_eq!(calls[0], Call::Navigate(URL.to_string()));
    assert_eq!(calls[1], Call::FindPages);
    assert_eq!(&calls[2..5], &[Call::Scroll(0), Call::Scroll(1), Call::Scroll(2)]);
    let print_at = calls.iter().position(|c| *c == Call::Print).unwrap();
    let last_evaluate = calls.iter().rposition(|c| *c == Call::Evaluate).unwrap();
    assert!(last_evaluate < print_at, "sanitization runs before capture");
    assert_eq!(calls.last(), Some(&Call::Close));

    assert_eq!(rendered.report.stage, Stage::Done);
    assert_eq!(rendered.report.session, SessionState::Closed);
    assert_eq!(rendered.report.page_elements, 3);
    assert_eq!(rendered.report.captured_pages, Some(3));
    assert!(rendered.report.warnings.is_empty());
    assert_eq!(page_contents(&rendered.pdf).len(), 3);
}

#[test]
fn test_launch_failure_is_initialization_error() {
    let pipeline = RenderPipeline::new(fast_config());
    let result = pipeline.run(URL, |_| -> embedprint::Result<ScriptedSurface> {
        Err(Error::InitializationError("no chrome binary".into()))
    });
    assert!(matches!(result, Err(Error::InitializationError(_))));
}

#[test]
fn test_other_launch_errors_are_mapped_to_initialization() {
    let pipeline = RenderPipeline::new(fast_config());
    let result = pipeline.run(URL, |_| -> embedprint::Result<ScriptedSurface> {
        Err(Error::Other("websocket handshake failed".into()))
    });
    match result {
        Err(Error::InitializationError(msg)) => assert!(msg.contains("websocket handshake failed")),
        other => panic!("expected InitializationError, got {:?}", other.map(|r| r.report)),
    }
}

#[test]
fn test_navigation_failure_is_fatal_and_closes() {
    let log = new_log();
    let mut surface = ScriptedSurface::new(&log, 3, Some(three_pages()));
    surface.navigation_fails = true;

    let result = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface));

    assert!(matches!(result, Err(Error::LoadError(_))));
    let calls = log.borrow();
    assert!(!calls.contains(&Call::Print));
    assert_eq!(calls.last(), Some(&Call::Close));
}

#[test]
fn test_navigation_without_load_is_fatal() {
    let log = new_log();
    let mut surface = ScriptedSurface::new(&log, 3, Some(three_pages()));
    surface.navigation_stalls = true;

    let result = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface));

    match result {
        Err(Error::LoadError(msg)) => assert!(msg.contains("Ready")),
        other => panic!("expected LoadError, got {:?}", other.map(|r| r.report)),
    }
    let calls = log.borrow();
    assert!(!calls.contains(&Call::FindPages));
    assert_eq!(calls.last(), Some(&Call::Close));
}

#[test]
fn test_zero_page_elements_still_captures() {
    let log = new_log();
    let surface = ScriptedSurface::new(&log, 0, Some(three_pages()));

    let rendered = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface)).unwrap();

    assert_eq!(rendered.report.page_elements, 0);
    assert!(rendered.report.warnings.contains(&Warning::NoPageElements));
    assert!(log.borrow().contains(&Call::Print));
    assert_eq!(page_contents(&rendered.pdf).len(), 3);
}

#[test]
fn test_capture_failure_is_fatal_and_closes() {
    let log = new_log();
    let surface = ScriptedSurface::new(&log, 3, None);

    let result = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface));

    assert!(matches!(result, Err(Error::CaptureError(_))));
    assert_eq!(log.borrow().last(), Some(&Call::Close));
    assert_eq!(log.borrow().iter().filter(|c| **c == Call::Close).count(), 1);
}

#[test]
fn test_non_pdf_capture_is_rejected() {
    let log = new_log();
    let surface = ScriptedSurface::new(&log, 1, Some(b"<html>error page</html>".to_vec()));

    let result = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface));
    assert!(matches!(result, Err(Error::CaptureError(_))));
}

#[test]
fn test_detached_page_element_is_a_warning() {
    let log = new_log();
    let mut surface = ScriptedSurface::new(&log, 4, Some(three_pages()));
    surface.detached = vec![2];

    let rendered = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface)).unwrap();

    assert!(rendered.report.warnings.contains(&Warning::ScrollFailed { index: 2 }));
    // Later pages are still visited
    assert!(log.borrow().contains(&Call::Scroll(3)));
}

#[test]
fn test_failed_sanitize_step_is_a_warning() {
    let log = new_log();
    let mut surface = ScriptedSurface::new(&log, 3, Some(three_pages()));
    surface.failing_scripts = vec![".toolbar_top"];

    let rendered = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface)).unwrap();

    assert_eq!(
        rendered.report.warnings,
        vec![Warning::SanitizeStepFailed { step: "toolbar_top".into() }]
    );
    assert!(log.borrow().contains(&Call::Print));
}

#[test]
fn test_blank_pages_removed_and_kept_pages_untouched() {
    let log = new_log();
    let pages = vec![text_page("1"), BLANK_PAGE.to_string(), text_page("3"), String::new()];
    let captured = pdf_with_pages(&pages);
    let before = page_contents(&captured);
    let surface = ScriptedSurface::new(&log, 4, Some(captured));

    let rendered = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface)).unwrap();

    assert_eq!(rendered.report.removed_pages, vec![2, 4]);
    assert_eq!(rendered.report.final_pages(), Some(2));
    let after = page_contents(&rendered.pdf);
    assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
}

#[test]
fn test_all_pages_blank_is_a_warning_not_a_failure() {
    let log = new_log();
    let captured = pdf_with_pages(&[BLANK_PAGE.to_string(), BLANK_PAGE.to_string()]);
    let surface = ScriptedSurface::new(&log, 2, Some(captured));

    let rendered = RenderPipeline::new(fast_config()).run(URL, |_| Ok(surface)).unwrap();

    assert!(rendered.report.warnings.contains(&Warning::AllPagesBlank { pages: 2 }));
    assert_eq!(rendered.report.final_pages(), Some(0));
    assert!(rendered.pdf.starts_with(b"%PDF-"));
}

#[test]
fn test_filter_disabled_returns_capture_bytes() {
    let log = new_log();
    let captured = pdf_with_pages(&[text_page("1"), BLANK_PAGE.to_string()]);
    let surface = ScriptedSurface::new(&log, 2, Some(captured.clone()));
    let mut config = fast_config();
    config.blank_filter.enabled = false;

    let rendered = RenderPipeline::new(config).run(URL, |_| Ok(surface)).unwrap();

    assert_eq!(rendered.pdf, captured);
    assert!(rendered.report.removed_pages.is_empty());
}

#[test]
fn test_compression_applies_when_enabled() {
    let log = new_log();
    let filler = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", "repeated line ".repeat(400));
    let captured = pdf_with_pages(&[filler.clone(), filler]);
    let surface = ScriptedSurface::new(&log, 2, Some(captured.clone()));
    let mut config = fast_config();
    config.compress.enabled = true;

    let rendered = RenderPipeline::new(config)
        .run_with(URL, |_| Ok(surface), &StreamCompressor)
        .unwrap();

    assert!(rendered.report.compressed);
    assert!(rendered.pdf.len() < captured.len());
    assert_eq!(page_contents(&rendered.pdf).len(), 2);
}
