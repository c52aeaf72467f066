//! `SurfaceHost` over tao windows.
//!
//! Windows can only be created from inside the event loop, so every call
//! that touches a window is queued and applied by the
//! [`SurfaceManager`](crate::manager::SurfaceManager) on the next pump.
//! Surface ids are allocated up front so callers get them synchronously.

use ext_alert::{Anchor, HostMessage, ScriptReply, Size, SurfaceConfig, SurfaceHost, SurfaceId};
use global_hotkey::hotkey::HotKey;
use global_hotkey::GlobalHotKeyManager;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tokio::sync::oneshot;

/// Window operations waiting for the event loop
#[derive(Debug)]
pub enum HostCmd {
    Create {
        surface: SurfaceId,
        config: SurfaceConfig,
    },
    Show(SurfaceId),
    Destroy(SurfaceId),
    Position(SurfaceId, Anchor),
    Resize(SurfaceId, Size),
    Load(SurfaceId, String),
    Eval {
        surface: SurfaceId,
        code: String,
        reply: Option<oneshot::Sender<Value>>,
    },
}

struct Shortcut {
    hotkey: HotKey,
    handler: Rc<dyn Fn()>,
}

pub struct WryHost {
    next_id: Cell<u64>,
    queue: RefCell<VecDeque<HostCmd>>,
    live: RefCell<HashSet<SurfaceId>>,
    hotkeys: Option<GlobalHotKeyManager>,
    shortcuts: RefCell<HashMap<String, Shortcut>>,
}

impl WryHost {
    /// Must be called on the event loop thread.
    pub fn new() -> Self {
        let hotkeys = match GlobalHotKeyManager::new() {
            Ok(manager) => Some(manager),
            Err(e) => {
                tracing::warn!(error = %e, "global shortcuts unavailable");
                None
            }
        };
        Self {
            next_id: Cell::new(0),
            queue: RefCell::new(VecDeque::new()),
            live: RefCell::new(HashSet::new()),
            hotkeys,
            shortcuts: RefCell::new(HashMap::new()),
        }
    }

    fn push(&self, cmd: HostCmd) {
        self.queue.borrow_mut().push_back(cmd);
    }

    /// Take everything queued so far.
    pub fn take_commands(&self) -> Vec<HostCmd> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    /// The window is gone (closed by the user or failed to build).
    pub fn mark_closed(&self, surface: SurfaceId) {
        self.live.borrow_mut().remove(&surface);
    }

    /// Run the handler registered for a pressed hotkey.
    pub fn dispatch_hotkey(&self, id: u32) {
        let handler = self
            .shortcuts
            .borrow()
            .values()
            .find(|s| s.hotkey.id() == id)
            .map(|s| s.handler.clone());
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl Default for WryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceHost for WryHost {
    fn create_surface(&self, config: &SurfaceConfig) -> ext_alert::Result<SurfaceId> {
        let surface = SurfaceId(self.next_id.get() + 1);
        self.next_id.set(surface.0);
        self.live.borrow_mut().insert(surface);
        self.push(HostCmd::Create {
            surface,
            config: config.clone(),
        });
        Ok(surface)
    }

    fn show(&self, surface: SurfaceId) {
        self.push(HostCmd::Show(surface));
    }

    fn destroy(&self, surface: SurfaceId) {
        if self.live.borrow_mut().remove(&surface) {
            self.push(HostCmd::Destroy(surface));
        }
    }

    fn is_destroyed(&self, surface: SurfaceId) -> bool {
        !self.live.borrow().contains(&surface)
    }

    fn position(&self, surface: SurfaceId, anchor: Anchor) {
        self.push(HostCmd::Position(surface, anchor));
    }

    fn resize(&self, surface: SurfaceId, size: Size) {
        self.push(HostCmd::Resize(surface, size));
    }

    fn load_document(&self, surface: SurfaceId, uri: &str) {
        self.push(HostCmd::Load(surface, uri.to_string()));
    }

    fn remove_menu(&self, surface: SurfaceId) {
        // tao windows carry no menu unless one is attached
        tracing::trace!(%surface, "no native menu to remove");
    }

    fn register_shortcut(&self, accelerator: &str, handler: Rc<dyn Fn()>) {
        let Some(manager) = &self.hotkeys else {
            return;
        };
        let hotkey: HotKey = match accelerator.parse() {
            Ok(hotkey) => hotkey,
            Err(e) => {
                tracing::warn!(accelerator, error = %e, "invalid accelerator");
                return;
            }
        };
        if self.shortcuts.borrow().contains_key(accelerator) {
            return;
        }
        if let Err(e) = manager.register(hotkey) {
            tracing::warn!(accelerator, error = %e, "failed to register shortcut");
            return;
        }
        tracing::debug!(accelerator, "shortcut registered");
        self.shortcuts
            .borrow_mut()
            .insert(accelerator.to_string(), Shortcut { hotkey, handler });
    }

    fn unregister_shortcut(&self, accelerator: &str) {
        let Some(shortcut) = self.shortcuts.borrow_mut().remove(accelerator) else {
            return;
        };
        if let Some(manager) = &self.hotkeys {
            if let Err(e) = manager.unregister(shortcut.hotkey) {
                tracing::debug!(accelerator, error = %e, "failed to unregister shortcut");
            }
        }
    }

    fn execute_script(&self, surface: SurfaceId, code: &str) -> ScriptReply {
        if self.is_destroyed(surface) {
            return ScriptReply::empty();
        }
        let (tx, rx) = oneshot::channel();
        self.push(HostCmd::Eval {
            surface,
            code: code.to_string(),
            reply: Some(tx),
        });
        ScriptReply::pending(rx)
    }

    fn send(&self, surface: SurfaceId, message: &HostMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%surface, error = %e, "failed to encode host message");
                return;
            }
        };
        self.push(HostCmd::Eval {
            surface,
            code: format!(
                "window.__alert_dispatch && window.__alert_dispatch({});",
                payload
            ),
            reply: None,
        });
    }
}
