//! Native driver for `ext_alert`: tao windows, wry webviews and global
//! shortcuts.
//!
//! The event loop owns an [`AlertDriver`]. Every loop iteration hands it the
//! tao event; the driver routes renderer IPC and window events into the
//! [`AlertRuntime`] and applies whatever window commands the runtime queued
//! on the [`WryHost`].

pub mod host;
pub mod manager;

pub use host::{HostCmd, WryHost};
pub use manager::SurfaceManager;

use ext_alert::{AlertRuntime, SurfaceEvent, SurfaceId};
use std::rc::Rc;
use tao::event::Event;
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};

/// Events sent to the event loop from webview callbacks
#[derive(Debug, Clone)]
pub enum AlertUserEvent {
    /// Raw message posted by a dialog renderer
    Ipc { surface: SurfaceId, body: String },
    /// The alert document finished loading
    PageLoaded(SurfaceId),
    /// A registered global shortcut was pressed
    HotKey(u32),
}

pub struct AlertDriver {
    runtime: AlertRuntime,
    host: Rc<WryHost>,
    manager: SurfaceManager,
}

impl AlertDriver {
    pub fn new(runtime: AlertRuntime, host: Rc<WryHost>, proxy: EventLoopProxy<AlertUserEvent>) -> Self {
        Self {
            runtime,
            host,
            manager: SurfaceManager::new(proxy),
        }
    }

    pub fn runtime(&self) -> &AlertRuntime {
        &self.runtime
    }

    /// No surface exists and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.manager.is_empty() && !self.host.has_pending()
    }

    pub fn handle_event(
        &mut self,
        event: &Event<'_, AlertUserEvent>,
        target: &EventLoopWindowTarget<AlertUserEvent>,
    ) {
        match event {
            Event::UserEvent(AlertUserEvent::Ipc { surface, body }) => {
                self.runtime.handle_ipc(*surface, body);
            }
            Event::UserEvent(AlertUserEvent::PageLoaded(surface)) => {
                self.route(*surface, SurfaceEvent::ReadyToShow);
            }
            Event::UserEvent(AlertUserEvent::HotKey(id)) => {
                self.host.dispatch_hotkey(*id);
            }
            Event::WindowEvent {
                event, window_id, ..
            } => {
                for (surface, event) in self.manager.window_event(*window_id, event) {
                    self.route(surface, event);
                }
            }
            _ => {}
        }
        self.pump(target);
    }

    /// Apply queued commands until the host is quiet. Routed events may
    /// queue more.
    pub fn pump(&mut self, target: &EventLoopWindowTarget<AlertUserEvent>) {
        loop {
            let commands = self.host.take_commands();
            if commands.is_empty() {
                break;
            }
            for cmd in commands {
                for (surface, event) in self.manager.apply(cmd, target) {
                    self.route(surface, event);
                }
            }
        }
    }

    fn route(&self, surface: SurfaceId, event: SurfaceEvent) {
        if event == SurfaceEvent::Closed {
            self.host.mark_closed(surface);
        }
        self.runtime.handle_surface_event(surface, event);
    }
}
