//! Alert dialogs for Forge-style desktop shells.
//!
//! An [`Alert`] owns one dialog window: it merges the window configuration,
//! creates the surface through a [`SurfaceHost`], writes a bootstrap document
//! that drives the dialog library inside the webview, and then follows the
//! renderer handshake (`willOpen`, `didOpen`, `willClose`, `didClose`,
//! `reposition`, `returnPromise`) until the surface is gone and a single
//! [`Outcome`] has been delivered.
//!
//! The windowing layer is abstract. Host drivers push renderer IPC and native
//! surface events into [`AlertRuntime`], which routes them to the owning
//! session over a per-session [`ChannelBus`].

use std::path::PathBuf;

pub mod bus;
pub mod config;
pub mod document;
pub mod exception;
pub mod host;
pub mod outcome;
pub mod position;
pub mod registry;
pub mod remote;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod sound;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{Channel, ChannelBus, Topic};
pub use config::{DialogOptions, FireOptions, LifecycleCallbacks, SizeHint, SurfaceConfig, WebPreferences};
pub use document::{DocumentStore, TempDocumentStore};
pub use exception::{install_panic_hook, ErrorReport, ExceptionHandler};
pub use host::{HostMessage, Platform, ScriptReply, SurfaceEvent, SurfaceHost, SurfaceId};
pub use outcome::{DismissReason, Outcome, OutcomeReceiver};
pub use position::{Anchor, Point, Rect, Size};
pub use registry::{Admission, SingletonRegistry};
pub use remote::RemoteCall;
pub use runtime::{AlertRuntime, RendererEvent, RendererMessage};
pub use session::{Alert, SessionId};
pub use settings::AlertSettings;
pub use sound::{Sound, SoundType};

// ============================================================================
// Error Types (8000+ range - ext_ipc uses 7000)
// ============================================================================

/// Error codes for alert operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AlertErrorCode {
    /// Generic alert error
    Generic = 8000,
    /// Dialog or surface options could not be interpreted
    InvalidOptions = 8001,
    /// The host failed to create a surface
    CreateFailed = 8002,
    /// The bootstrap document could not be written
    DocumentWrite = 8003,
    /// The session was already fired
    AlreadyFired = 8004,
    /// Settings file could not be parsed
    Config = 8005,
    /// Filesystem error
    Io = 8006,
}

/// Custom error type for alert operations
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("[{code}] {message}")]
    Generic { code: u32, message: String },

    #[error("[{code}] Invalid options: {message}")]
    InvalidOptions { code: u32, message: String },

    #[error("[{code}] Failed to create surface: {message}")]
    CreateFailed { code: u32, message: String },

    #[error("[{code}] Failed to write bootstrap document: {message}")]
    DocumentWrite { code: u32, message: String },

    #[error("[{code}] Alert already fired: {session_id}")]
    AlreadyFired { code: u32, session_id: String },

    #[error("[{code}] Invalid settings: {message}")]
    Config { code: u32, message: String },

    #[error("[{code}] I/O error at {}: {source}", path.display())]
    Io {
        code: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AlertError {
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            code: AlertErrorCode::Generic as u32,
            message: message.into(),
        }
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            code: AlertErrorCode::InvalidOptions as u32,
            message: message.into(),
        }
    }

    pub fn create_failed(message: impl Into<String>) -> Self {
        Self::CreateFailed {
            code: AlertErrorCode::CreateFailed as u32,
            message: message.into(),
        }
    }

    pub fn document_write(message: impl Into<String>) -> Self {
        Self::DocumentWrite {
            code: AlertErrorCode::DocumentWrite as u32,
            message: message.into(),
        }
    }

    pub fn already_fired(session_id: impl Into<String>) -> Self {
        Self::AlreadyFired {
            code: AlertErrorCode::AlreadyFired as u32,
            session_id: session_id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: AlertErrorCode::Config as u32,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            code: AlertErrorCode::Io as u32,
            path: path.into(),
            source,
        }
    }

    /// Numeric code carried by every variant
    pub fn code(&self) -> u32 {
        match self {
            Self::Generic { code, .. }
            | Self::InvalidOptions { code, .. }
            | Self::CreateFailed { code, .. }
            | Self::DocumentWrite { code, .. }
            | Self::AlreadyFired { code, .. }
            | Self::Config { code, .. }
            | Self::Io { code, .. } => *code,
        }
    }
}

/// Result type for alert operations
pub type Result<T> = std::result::Result<T, AlertError>;

// ============================================================================
// Tests
// ============================================================================
