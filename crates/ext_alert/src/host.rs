//! The windowing capabilities an alert needs from its host.
//!
//! A host creates isolated surfaces (a native window with a webview), loads
//! documents into them and evaluates script. Lifecycle events flow the other
//! way: the host driver reports them to
//! [`AlertRuntime::handle_surface_event`](crate::AlertRuntime::handle_surface_event).

use crate::config::SurfaceConfig;
use crate::position::{Anchor, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Opaque handle to a host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Native surface lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceEvent {
    /// The document finished loading and the surface can be shown
    ReadyToShow,
    Focus,
    Blur,
    /// A close was requested (user or programmatic); the surface still exists
    Close,
    /// The surface is gone
    Closed,
}

/// Messages the host pushes into a surface's renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostMessage {
    /// Ask the renderer to measure the popup and request a resize after `delay` ms
    ResizeToFit { delay: u64 },
}

/// Platform rules that change how a surface is managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Macos,
    Windows,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Child surfaces are placed by the window system relative to their parent.
    pub fn positions_child_natively(&self) -> bool {
        matches!(self, Platform::Macos)
    }

    /// The platform binds a global reload shortcut (Cmd+R) that would reload
    /// the dialog document.
    pub fn has_global_reload_shortcut(&self) -> bool {
        matches!(self, Platform::Macos)
    }
}

/// Result of evaluating script in a surface.
///
/// Resolves to `None` when there was no surface to evaluate in, or when the
/// host dropped the request.
#[derive(Debug)]
pub struct ScriptReply {
    inner: ReplyState,
}

#[derive(Debug)]
enum ReplyState {
    Ready(Option<Value>),
    Pending(oneshot::Receiver<Value>),
}

impl ScriptReply {
    /// A reply with no value, used for dead surfaces.
    pub fn empty() -> Self {
        Self {
            inner: ReplyState::Ready(None),
        }
    }

    pub fn ready(value: Value) -> Self {
        Self {
            inner: ReplyState::Ready(Some(value)),
        }
    }

    pub fn pending(rx: oneshot::Receiver<Value>) -> Self {
        Self {
            inner: ReplyState::Pending(rx),
        }
    }
}

impl Future for ScriptReply {
    type Output = Option<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            ReplyState::Ready(value) => Poll::Ready(value.take()),
            ReplyState::Pending(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(result) => Poll::Ready(result.ok()),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// Windowing capability interface.
///
/// Every method is called on the control thread. Calls naming a surface
/// that no longer exists must be ignored.
pub trait SurfaceHost {
    /// Create a hidden surface configured by `config`.
    fn create_surface(&self, config: &SurfaceConfig) -> crate::Result<SurfaceId>;

    fn show(&self, surface: SurfaceId);

    /// Destroy without emitting [`SurfaceEvent::Close`]; the host still
    /// reports [`SurfaceEvent::Closed`] afterwards.
    fn destroy(&self, surface: SurfaceId);

    fn is_destroyed(&self, surface: SurfaceId) -> bool;

    /// Move the surface to `anchor` within its screen work area.
    fn position(&self, surface: SurfaceId, anchor: Anchor);

    fn resize(&self, surface: SurfaceId, size: Size);

    fn load_document(&self, surface: SurfaceId, uri: &str);

    /// Remove the native menu (and with it the menu's reload accelerators).
    fn remove_menu(&self, surface: SurfaceId);

    fn register_shortcut(&self, accelerator: &str, handler: Rc<dyn Fn()>);

    fn unregister_shortcut(&self, accelerator: &str);

    fn execute_script(&self, surface: SurfaceId, code: &str) -> ScriptReply;

    fn send(&self, surface: SurfaceId, message: &HostMessage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_rules() {
        assert!(Platform::Macos.positions_child_natively());
        assert!(Platform::Macos.has_global_reload_shortcut());
        assert!(!Platform::Linux.positions_child_natively());
        assert!(!Platform::Windows.has_global_reload_shortcut());
    }

    #[test]
    fn test_host_message_serialization() {
        let json = serde_json::to_value(HostMessage::ResizeToFit { delay: 25 }).unwrap();
        assert_eq!(json, json!({"event": "resizeToFit", "delay": 25}));
    }

    #[tokio::test]
    async fn test_script_reply_states() {
        assert_eq!(ScriptReply::empty().await, None);
        assert_eq!(ScriptReply::ready(json!(3)).await, Some(json!(3)));

        let (tx, rx) = oneshot::channel();
        tx.send(json!(true)).unwrap();
        assert_eq!(ScriptReply::pending(rx).await, Some(json!(true)));

        let (tx, rx) = oneshot::channel::<Value>();
        drop(tx);
        assert_eq!(ScriptReply::pending(rx).await, None);
    }
}
