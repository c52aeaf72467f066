//! Application-level alert settings, read from the `[alert]` table of a
//! TOML manifest.

use crate::config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::host::Platform;
use crate::{AlertError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Fallback title for framed dialogs
    pub app_name: String,
    pub dev_tools: bool,
    /// Dialog library script inlined into every document
    pub library_path: Option<PathBuf>,
    /// Extra `<head>` lines for every alert
    pub head: Vec<String>,
    /// Where bootstrap documents are written (system temp dir when unset)
    pub document_dir: Option<PathBuf>,
    /// Override the detected platform
    pub platform: Option<Platform>,
    pub default_width: u32,
    pub default_height: u32,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            app_name: "Forge App".to_string(),
            dev_tools: false,
            library_path: None,
            head: Vec::new(),
            document_dir: None,
            platform: None,
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    alert: AlertSettings,
}

impl AlertSettings {
    /// Parse a manifest. A missing `[alert]` table yields the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: SettingsFile =
            toml::from_str(text).map_err(|e| AlertError::config(e.to_string()))?;
        Ok(file.alert)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AlertError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// Read the dialog library source inlined into every document.
    pub fn load_library(&self) -> Result<String> {
        let Some(path) = &self.library_path else {
            return Err(AlertError::config(
                "alert.library_path is not set; alerts need the dialog library",
            ));
        };
        let source = std::fs::read_to_string(path).map_err(|e| AlertError::io(path, e))?;
        if source.trim().is_empty() {
            return Err(AlertError::config(format!(
                "dialog library {} is empty",
                path.display()
            )));
        }
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_table_missing() {
        let settings = AlertSettings::from_toml_str("[app]\nname = \"x\"\n").unwrap();
        assert_eq!(settings, AlertSettings::default());
        assert_eq!(settings.default_width, 800);
        assert_eq!(settings.default_height, 600);
    }

    #[test]
    fn test_partial_table() {
        let settings = AlertSettings::from_toml_str(
            r#"
[alert]
app_name = "Notes"
dev_tools = true
head = ["<link rel=\"stylesheet\" href=\"dark.css\">"]
platform = "macos"
default_width = 500
"#,
        )
        .unwrap();
        assert_eq!(settings.app_name, "Notes");
        assert!(settings.dev_tools);
        assert_eq!(settings.head.len(), 1);
        assert_eq!(settings.platform(), Platform::Macos);
        assert_eq!(settings.default_width, 500);
        assert_eq!(settings.default_height, 600);
    }

    #[test]
    fn test_invalid_toml() {
        let err = AlertSettings::from_toml_str("[alert]\ndev_tools = \"yes\"\n").unwrap_err();
        assert_eq!(err.code(), 8005);
    }

    #[test]
    fn test_load_and_library() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("sweetalert2.js");
        std::fs::write(&library, "window.Swal = {};").unwrap();

        let manifest = dir.path().join("manifest.toml");
        let mut file = std::fs::File::create(&manifest).unwrap();
        writeln!(file, "[alert]\nlibrary_path = {:?}", library.to_string_lossy()).unwrap();

        let settings = AlertSettings::load(&manifest).unwrap();
        assert_eq!(settings.load_library().unwrap(), "window.Swal = {};");

        let err = AlertSettings::load(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.code(), 8006);
    }

    #[test]
    fn test_library_is_required() {
        let err = AlertSettings::default().load_library().unwrap_err();
        assert_eq!(err.code(), 8005);

        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.js");
        std::fs::write(&blank, "\n  \n").unwrap();
        let settings = AlertSettings {
            library_path: Some(blank),
            ..AlertSettings::default()
        };
        assert_eq!(settings.load_library().unwrap_err().code(), 8005);

        let settings = AlertSettings {
            library_path: Some(dir.path().join("absent.js")),
            ..AlertSettings::default()
        };
        assert_eq!(settings.load_library().unwrap_err().code(), 8006);
    }
}
