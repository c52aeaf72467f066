//! Turn uncaught errors and panics into error dialogs.

use crate::config::{DialogOptions, FireOptions};
use crate::runtime::AlertRuntime;
use crate::session::Alert;
use std::fmt::Write as _;
use std::panic;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Frames from these paths say nothing about the application
const NOISE: [&str; 6] = [
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "rust_begin_unwind",
    "__rust",
];

const FALLBACK_TITLE: &str = "Error";

/// An error as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            message: message.into(),
            stack,
        }
    }

    /// The error's source chain becomes the trace.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            let _ = writeln!(stack, "caused by: {}", cause);
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            stack: (!stack.is_empty()).then_some(stack),
        }
    }

    pub fn from_panic(info: &panic::PanicHookInfo) -> Self {
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic payload".to_string()
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        let backtrace = backtrace::Backtrace::new();

        Self {
            message,
            stack: Some(format!("panicked at {}\n{:?}", location, backtrace)),
        }
    }

    /// Trace text used for display: the stack, or the message when there is
    /// none.
    fn trace(&self, clean: bool) -> String {
        match &self.stack {
            Some(stack) if clean => clean_stack(stack),
            Some(stack) => stack.clone(),
            None => self.message.clone(),
        }
    }
}

/// Drop runtime and unwinding frames from a backtrace.
///
/// A frame's `at <file>` line goes with it.
pub fn clean_stack(stack: &str) -> String {
    let mut kept = Vec::new();
    let mut skipping = false;
    for line in stack.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("at ") {
            if !skipping {
                kept.push(line);
            }
            continue;
        }
        skipping = NOISE.iter().any(|noise| trimmed.contains(noise));
        if !skipping {
            kept.push(line);
        }
    }
    kept.join("\n")
}

/// Escaped, inline-styled HTML for a report.
pub fn format_report_html(message: &str, trace: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<div style=\"color:#c0392b;font-weight:bold;margin-bottom:8px\">{}</div>",
        html_escape::encode_text(message)
    );
    if trace != message {
        let _ = write!(
            html,
            "<pre style=\"text-align:left;font-size:12px;white-space:pre-wrap;margin:0\">{}</pre>",
            html_escape::encode_text(trace)
        );
    }
    html
}

/// Forward every panic as an [`ErrorReport`], then run the previous hook.
pub fn install_panic_hook() -> mpsc::UnboundedReceiver<ErrorReport> {
    let (tx, rx) = mpsc::unbounded_channel();
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = tx.send(ErrorReport::from_panic(info));
        default_hook(info);
    }));
    rx
}

/// Shows framed error dialogs for reports.
pub struct ExceptionHandler {
    runtime: AlertRuntime,
    hide_trace: bool,
    closure: Option<Rc<dyn Fn(&ErrorReport)>>,
    always_on_top: bool,
    clean_stack: bool,
}

impl ExceptionHandler {
    pub(crate) fn new(
        runtime: AlertRuntime,
        hide_trace: bool,
        closure: Option<Rc<dyn Fn(&ErrorReport)>>,
        always_on_top: bool,
        clean_stack: bool,
    ) -> Self {
        Self {
            runtime,
            hide_trace,
            closure,
            always_on_top,
            clean_stack,
        }
    }

    /// Dialog options for `report`.
    pub fn options(&self, report: &ErrorReport) -> DialogOptions {
        let mut options = DialogOptions::new().icon("error");
        if self.hide_trace {
            let title = if report.message.is_empty() {
                FALLBACK_TITLE
            } else {
                report.message.as_str()
            };
            options = options.title(title);
        } else {
            let html = format_report_html(&report.message, &report.trace(self.clean_stack));
            options = options.html(format!(
                "<div contenteditable=\"false\" style=\"overflow:auto\">{}</div>",
                html
            ));
        }

        if let Some(closure) = &self.closure {
            let closure = closure.clone();
            let report = report.clone();
            options = options.did_close(move || closure(&report));
        }
        options
    }

    /// Show `report`. Failures are logged, never raised.
    pub fn handle(&self, report: &ErrorReport) -> Option<Alert> {
        let alert = self.runtime.alert_with_head(Vec::new(), false);
        let fire = FireOptions {
            always_on_top: self.always_on_top,
            ..Default::default()
        };
        match alert.fire_with_frame(self.options(report), None, fire) {
            Ok(_) => Some(alert),
            Err(e) => {
                tracing::error!(error = %e, message = %report.message, "failed to show error dialog");
                None
            }
        }
    }

    /// Show every queued report. Returns how many were handled.
    pub fn drain(&self, rx: &mut mpsc::UnboundedReceiver<ErrorReport>) -> usize {
        let mut handled = 0;
        while let Ok(report) = rx.try_recv() {
            self.handle(&report);
            handled += 1;
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{SurfaceEvent, SurfaceHost};
    use crate::testing::fixture;
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Debug, thiserror::Error)]
    #[error("load failed")]
    struct LoadError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_hide_trace_uses_message_as_title() {
        let fx = fixture();
        let handler = fx.runtime.uncaught_exception(true, None, false, false);
        let alert = handler.handle(&ErrorReport::new("boom", None)).unwrap();

        let config = alert.config();
        assert_eq!(config.get("title"), Some(&json!("boom")));
        assert_eq!(config.get("icon"), Some(&json!("error")));
        assert!(!config.contains_key("html"));

        let surface = alert.surface_config().unwrap();
        assert_eq!(surface.frame, Some(true));
        assert_eq!(surface.title.as_deref(), Some("boom"));
        assert_eq!(surface.parent, None);
    }

    #[test]
    fn test_empty_message_title() {
        let fx = fixture();
        let handler = fx.runtime.uncaught_exception(true, None, false, false);
        let options = handler.options(&ErrorReport::new("", None));
        assert_eq!(options.get("title"), Some(&json!("Error")));
    }

    #[test]
    fn test_trace_panel_is_escaped() {
        let fx = fixture();
        let handler = fx.runtime.uncaught_exception(false, None, true, false);
        let report = ErrorReport::new("<b>bad</b>", Some("frame <one>\n".to_string()));
        let alert = handler.handle(&report).unwrap();

        let config = alert.config();
        let html = config["html"].as_str().unwrap();
        assert!(html.starts_with("<div contenteditable=\"false\" style=\"overflow:auto\">"));
        assert!(html.contains("&lt;b&gt;bad&lt;/b&gt;"));
        assert!(html.contains("frame &lt;one&gt;"));
        assert!(!config.contains_key("title"));
        assert_eq!(alert.surface_config().unwrap().always_on_top, Some(true));
    }

    #[test]
    fn test_closure_runs_after_close() {
        let fx = fixture();
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let s = seen.clone();
        let closure: Rc<dyn Fn(&ErrorReport)> = Rc::new(move |r| s.borrow_mut().push(r.message.clone()));
        let handler = fx.runtime.uncaught_exception(true, Some(closure), false, false);

        let alert = handler.handle(&ErrorReport::new("boom", None)).unwrap();
        assert!(seen.borrow().is_empty());

        let surface = alert.surface().unwrap();
        fx.runtime.handle_surface_event(surface, SurfaceEvent::Close);
        fx.host.destroy(surface);
        fx.runtime.handle_surface_event(surface, SurfaceEvent::Closed);
        assert_eq!(*seen.borrow(), vec!["boom"]);
    }

    #[test]
    fn test_fire_failure_is_swallowed() {
        let fx = fixture();
        fx.host.fail_create.set(true);
        let handler = fx.runtime.uncaught_exception(true, None, false, false);
        assert!(handler.handle(&ErrorReport::new("boom", None)).is_none());
    }

    #[test]
    fn test_from_error_source_chain() {
        let err = LoadError {
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "settings.toml"),
        };
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.message, "load failed");
        assert_eq!(report.stack.as_deref(), Some("caused by: settings.toml\n"));

        let plain = std::io::Error::new(std::io::ErrorKind::Other, "plain");
        assert_eq!(ErrorReport::from_error(&plain).stack, None);
    }

    #[test]
    fn test_clean_stack() {
        let stack = "\
   0: std::panicking::begin_panic
             at /rustc/abc/library/std/src/panicking.rs:10
   1: notes::save
             at src/save.rs:42
   2: core::ops::function::FnOnce::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250";
        let cleaned = clean_stack(stack);
        assert_eq!(
            cleaned,
            "   1: notes::save\n             at src/save.rs:42"
        );
    }

    #[test]
    fn test_drain_handles_queued_reports() {
        let fx = fixture();
        let handler = fx.runtime.uncaught_exception(true, None, false, false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ErrorReport::new("one", None)).unwrap();
        tx.send(ErrorReport::new("two", None)).unwrap();

        assert_eq!(handler.drain(&mut rx), 2);
        assert_eq!(fx.host.created(), 2);
        assert_eq!(handler.drain(&mut rx), 0);
    }
}
