//! The bootstrap document loaded into every dialog surface, and where it is
//! stored while the dialog is open.

use crate::session::SessionId;
use crate::sound::Sound;
use crate::{AlertError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Driver script relaying the dialog lifecycle back to the host
const RENDERER_JS: &str = include_str!("../assets/renderer.js");
/// Base styles every dialog document carries
const BASE_CSS: &str = include_str!("../assets/alert.css");

/// Suggested file name for bootstrap documents
pub const DOCUMENT_NAME: &str = "alert.html";

/// Storage for bootstrap documents.
pub trait DocumentStore {
    /// Persist `content` and return its path. Failure aborts the fire.
    fn write(&self, content: &str, suggested_name: &str) -> Result<PathBuf>;

    /// Best-effort removal; implementations swallow errors.
    fn remove(&self, path: &Path);
}

/// Writes documents as persisted temp files.
#[derive(Debug, Clone, Default)]
pub struct TempDocumentStore {
    dir: Option<PathBuf>,
}

impl TempDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store documents in `dir` instead of the system temp directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl DocumentStore for TempDocumentStore {
    fn write(&self, content: &str, suggested_name: &str) -> Result<PathBuf> {
        let suffix = format!("-{}", suggested_name);
        let mut builder = tempfile::Builder::new();
        builder.prefix("alert-").suffix(&suffix);

        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| AlertError::document_write(e.to_string()))?;

        file.write_all(content.as_bytes())
            .map_err(|e| AlertError::document_write(e.to_string()))?;

        // Keep the file past the handle; it is removed when the dialog closes.
        let (_, path) = file
            .keep()
            .map_err(|e| AlertError::document_write(e.to_string()))?;

        tracing::debug!(path = %path.display(), "alert.document.write");
        Ok(path)
    }

    fn remove(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %e, "alert.document.remove failed");
        }
    }
}

/// `file://` URI for a local document path.
pub fn file_uri(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{}", text)
    } else {
        format!("file:///{}", text)
    }
}

#[derive(Serialize)]
struct BootstrapPayload<'a> {
    session: &'a SessionId,
    config: &'a Map<String, Value>,
    sound: Option<&'a Sound>,
}

/// Inputs for one bootstrap document.
pub struct BootstrapDocument<'a> {
    pub session: &'a SessionId,
    /// Dialog library source, inlined
    pub library: &'a str,
    /// Extra `<head>` lines
    pub head: &'a [String],
    pub draggable: bool,
    pub config: &'a Map<String, Value>,
    pub sound: Option<&'a Sound>,
}

impl BootstrapDocument<'_> {
    pub fn render(&self) -> Result<String> {
        let payload = serde_json::to_string(&BootstrapPayload {
            session: self.session,
            config: self.config,
            sound: self.sound,
        })
        .map_err(|e| AlertError::invalid_options(format!("dialog options: {}", e)))?;

        let body_style = if self.draggable {
            " style=\"-webkit-app-region:drag\""
        } else {
            ""
        };

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <script type="text/javascript">{library}</script>
    <style>{css}</style>
    {head}
  </head>
  <body draggable="false" class="noselect"{body_style}>
    <script type="application/json" id="alert-bootstrap">{payload}</script>
    <script type="text/javascript">{renderer}</script>
  </body>
</html>
"#,
            library = escape_script(self.library),
            css = BASE_CSS,
            head = self.head.join("\n    "),
            body_style = body_style,
            payload = escape_script(&payload),
            renderer = RENDERER_JS,
        ))
    }
}

/// Keep inline script content from closing its `<script>` element.
fn escape_script(text: &str) -> String {
    text.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(config: Value, draggable: bool) -> String {
        let session = SessionId::from("abc");
        let Value::Object(config) = config else {
            panic!("object expected")
        };
        BootstrapDocument {
            session: &session,
            library: "window.Swal = {};",
            head: &["<link rel=\"stylesheet\" href=\"theme.css\">".to_string()],
            draggable,
            config: &config,
            sound: None,
        }
        .render()
        .unwrap()
    }

    fn payload_of(document: &str) -> Value {
        let start = document.find("id=\"alert-bootstrap\">").unwrap() + "id=\"alert-bootstrap\">".len();
        let end = start + document[start..].find("</script>").unwrap();
        serde_json::from_str(&document[start..end]).unwrap()
    }

    #[test]
    fn test_render_embeds_payload() {
        let document = render(json!({"title": "Hi"}), false);
        let payload = payload_of(&document);
        assert_eq!(payload["session"], "abc");
        assert_eq!(payload["config"]["title"], "Hi");
        assert_eq!(payload["sound"], Value::Null);
        assert!(document.contains("theme.css"));
        assert!(document.contains("window.Swal = {};"));
        assert!(!document.contains("-webkit-app-region:drag\""));
    }

    #[test]
    fn test_render_cannot_break_out_of_script() {
        let document = render(json!({"html": "</script><script>alert(1)</script>"}), false);
        assert!(!document.contains("</script><script>alert(1)"));
        let payload = payload_of(&document);
        assert_eq!(payload["config"]["html"], "</script><script>alert(1)</script>");
    }

    #[test]
    fn test_render_draggable_body() {
        let document = render(json!({}), true);
        assert!(document.contains("<body draggable=\"false\" class=\"noselect\" style=\"-webkit-app-region:drag\">"));
    }

    #[test]
    fn test_file_uri() {
        assert_eq!(file_uri(Path::new("/tmp/alert.html")), "file:///tmp/alert.html");
        assert_eq!(
            file_uri(Path::new("C:\\Temp\\alert.html")),
            "file:///C:/Temp/alert.html"
        );
    }

    #[test]
    fn test_temp_store_write_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempDocumentStore::in_dir(dir.path());

        let path = store.write("<html></html>", DOCUMENT_NAME).unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().ends_with("-alert.html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");

        store.remove(&path);
        assert!(!path.exists());
        // second removal is swallowed
        store.remove(&path);
    }

    #[test]
    fn test_temp_store_write_failure() {
        let store = TempDocumentStore::in_dir("/nonexistent/alert/dir");
        let err = store.write("x", DOCUMENT_NAME).unwrap_err();
        assert_eq!(err.code(), 8003);
    }
}
