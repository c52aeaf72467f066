//! SurfaceManager - owns the tao windows and wry webviews of alert surfaces.
//!
//! Lives on the event loop and applies the commands [`WryHost`](crate::WryHost)
//! queued. Every method returns the surface events the caller must route
//! back into the alert runtime.

use crate::host::HostCmd;
use crate::AlertUserEvent;
use ext_alert::{Anchor, Rect, Size, SurfaceConfig, SurfaceEvent, SurfaceId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tao::dpi::{LogicalSize, PhysicalPosition};
use tao::event::WindowEvent;
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use tao::window::{Fullscreen, Window, WindowBuilder, WindowId};
use wry::{PageLoadEvent, WebView};

pub type Routed = Vec<(SurfaceId, SurfaceEvent)>;

struct Surface {
    // dropped before the window
    webview: WebView,
    window: Window,
    parent: Option<SurfaceId>,
    modal: bool,
}

pub struct SurfaceManager {
    proxy: EventLoopProxy<AlertUserEvent>,
    windows: HashMap<WindowId, SurfaceId>,
    surfaces: HashMap<SurfaceId, Surface>,
}

impl SurfaceManager {
    pub fn new(proxy: EventLoopProxy<AlertUserEvent>) -> Self {
        Self {
            proxy,
            windows: HashMap::new(),
            surfaces: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn surface_of(&self, window_id: &WindowId) -> Option<SurfaceId> {
        self.windows.get(window_id).copied()
    }

    pub fn apply(&mut self, cmd: HostCmd, target: &EventLoopWindowTarget<AlertUserEvent>) -> Routed {
        match cmd {
            HostCmd::Create { surface, config } => match self.create(target, surface, &config) {
                Ok(()) => Vec::new(),
                Err(e) => {
                    // the session only learns about it through the close
                    tracing::error!(%surface, error = %e, "failed to create alert surface");
                    vec![(surface, SurfaceEvent::Closed)]
                }
            },
            HostCmd::Show(surface) => {
                if let Some(entry) = self.surfaces.get(&surface) {
                    entry.window.set_visible(true);
                    entry.window.set_focus();
                }
                Vec::new()
            }
            HostCmd::Destroy(surface) => self.remove(surface),
            HostCmd::Position(surface, anchor) => {
                self.position(surface, anchor);
                Vec::new()
            }
            HostCmd::Resize(surface, size) => {
                if let Some(entry) = self.surfaces.get(&surface) {
                    entry
                        .window
                        .set_inner_size(LogicalSize::new(size.width, size.height));
                }
                Vec::new()
            }
            HostCmd::Load(surface, uri) => {
                if let Some(entry) = self.surfaces.get(&surface) {
                    if let Err(e) = entry.webview.load_url(&uri) {
                        tracing::warn!(%surface, error = %e, "failed to load alert document");
                    }
                }
                Vec::new()
            }
            HostCmd::Eval {
                surface,
                code,
                reply,
            } => {
                self.eval(surface, &code, reply);
                Vec::new()
            }
        }
    }

    /// Translate a native window event.
    pub fn window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> Routed {
        let Some(surface) = self.surface_of(&window_id) else {
            return Vec::new();
        };
        match event {
            WindowEvent::CloseRequested => {
                let mut routed = vec![(surface, SurfaceEvent::Close)];
                routed.extend(self.remove(surface));
                routed
            }
            WindowEvent::Focused(true) => vec![(surface, SurfaceEvent::Focus)],
            WindowEvent::Focused(false) => vec![(surface, SurfaceEvent::Blur)],
            _ => Vec::new(),
        }
    }

    fn create(
        &mut self,
        target: &EventLoopWindowTarget<AlertUserEvent>,
        surface: SurfaceId,
        config: &SurfaceConfig,
    ) -> Result<(), String> {
        tracing::debug!(%surface, ?config, "creating alert surface");
        let width = config.width.unwrap_or(ext_alert::config::DEFAULT_WIDTH);
        let height = config.height.unwrap_or(ext_alert::config::DEFAULT_HEIGHT);
        let transparent = config.transparent.unwrap_or(false);

        let mut win_builder = WindowBuilder::new()
            .with_title(config.title.clone().unwrap_or_default())
            .with_inner_size(LogicalSize::new(width, height))
            .with_visible(config.show.unwrap_or(false))
            .with_transparent(transparent);

        if let Some(resizable) = config.resizable {
            win_builder = win_builder.with_resizable(resizable);
        }
        if let Some(minimizable) = config.minimizable {
            win_builder = win_builder.with_minimizable(minimizable);
        }
        if let Some(maximizable) = config.maximizable {
            win_builder = win_builder.with_maximizable(maximizable);
        }
        if let Some(closable) = config.closable {
            win_builder = win_builder.with_closable(closable);
        }
        if let Some(frame) = config.frame {
            win_builder = win_builder.with_decorations(frame);
        }
        if let Some(always_on_top) = config.always_on_top {
            win_builder = win_builder.with_always_on_top(always_on_top);
        }
        if config.fullscreen == Some(true) {
            win_builder = win_builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        #[cfg(target_os = "windows")]
        {
            use tao::platform::windows::WindowBuilderExtWindows;
            if let Some(skip) = config.skip_taskbar {
                win_builder = win_builder.with_skip_taskbar(skip);
            }
        }
        #[cfg(target_os = "linux")]
        {
            use tao::platform::unix::WindowBuilderExtUnix;
            if let Some(skip) = config.skip_taskbar {
                win_builder = win_builder.with_skip_taskbar(skip);
            }
        }

        let owner = config.parent.and_then(|p| self.surfaces.get(&p));
        if config.parent.is_some() && owner.is_none() {
            tracing::debug!(%surface, parent = ?config.parent, "parent is not an alert surface");
        }
        if let Some(owner) = owner {
            win_builder = attach_to_owner(win_builder, &owner.window);
        }

        let window = win_builder
            .build(target)
            .map_err(|e| format!("Failed to create window: {}", e))?;

        let mut wv_builder = wry::WebViewBuilder::new()
            .with_transparent(transparent)
            .with_devtools(config.web_preferences.dev_tools.unwrap_or(false));

        if config.web_preferences.ipc_bridge.unwrap_or(false) {
            let proxy = self.proxy.clone();
            wv_builder = wv_builder.with_ipc_handler(move |msg| {
                let _ = proxy.send_event(AlertUserEvent::Ipc {
                    surface,
                    body: msg.body().clone(),
                });
            });
        }

        let proxy = self.proxy.clone();
        wv_builder = wv_builder.with_on_page_load_handler(move |event, _url| {
            if matches!(event, PageLoadEvent::Finished) {
                let _ = proxy.send_event(AlertUserEvent::PageLoaded(surface));
            }
        });

        let webview = wv_builder
            .build(&window)
            .map_err(|e| format!("Failed to build webview: {}", e))?;

        let modal = modal_owner(config).is_some();
        if modal {
            self.set_modal(&window, config.parent, true);
        }

        self.windows.insert(window.id(), surface);
        self.surfaces.insert(
            surface,
            Surface {
                webview,
                window,
                parent: config.parent,
                modal,
            },
        );
        tracing::debug!(%surface, width, height, "alert surface ready");
        Ok(())
    }

    fn remove(&mut self, surface: SurfaceId) -> Routed {
        match self.surfaces.remove(&surface) {
            Some(entry) => {
                self.windows.remove(&entry.window.id());
                if entry.modal {
                    self.set_modal(&entry.window, entry.parent, false);
                }
                drop(entry);
                tracing::debug!(%surface, "alert surface closed");
                vec![(surface, SurfaceEvent::Closed)]
            }
            None => Vec::new(),
        }
    }

    /// Block input to the owner while a modal surface is open.
    #[allow(unused_variables)]
    fn set_modal(&self, window: &Window, parent: Option<SurfaceId>, modal: bool) {
        #[cfg(target_os = "windows")]
        {
            use tao::platform::windows::WindowExtWindows;
            if let Some(owner) = parent.and_then(|p| self.surfaces.get(&p)) {
                owner.window.set_enable(!modal);
            }
        }
        #[cfg(target_os = "linux")]
        {
            use gtk::prelude::*;
            use tao::platform::unix::WindowExtUnix;
            window.gtk_window().set_modal(modal);
        }
    }

    /// Area the surface is anchored in: its parent window if we own it,
    /// else the monitor it is on.
    fn area(&self, entry: &Surface) -> Option<Rect> {
        let parent = entry
            .parent
            .and_then(|p| self.surfaces.get(&p))
            .and_then(|p| {
                let position = p.window.outer_position().ok()?;
                let size = p.window.outer_size();
                Some(Rect {
                    x: position.x,
                    y: position.y,
                    width: size.width,
                    height: size.height,
                })
            });
        parent.or_else(|| {
            let monitor = entry.window.current_monitor()?;
            let position = monitor.position();
            let size = monitor.size();
            Some(Rect {
                x: position.x,
                y: position.y,
                width: size.width,
                height: size.height,
            })
        })
    }

    fn position(&self, surface: SurfaceId, anchor: Anchor) {
        let Some(entry) = self.surfaces.get(&surface) else {
            return;
        };
        let Some(area) = self.area(entry) else {
            tracing::debug!(%surface, "no monitor to position against");
            return;
        };
        let outer = entry.window.outer_size();
        let point = anchor.place(
            area,
            Size {
                width: outer.width,
                height: outer.height,
            },
        );
        entry
            .window
            .set_outer_position(PhysicalPosition::new(point.x, point.y));
    }

    fn eval(&self, surface: SurfaceId, code: &str, reply: Option<tokio::sync::oneshot::Sender<Value>>) {
        let Some(entry) = self.surfaces.get(&surface) else {
            // dropping the sender resolves the reply to None
            return;
        };
        let result = match reply {
            Some(tx) => {
                let tx = Mutex::new(Some(tx));
                entry.webview.evaluate_script_with_callback(code, move |result| {
                    let Some(tx) = tx.lock().ok().and_then(|mut slot| slot.take()) else {
                        return;
                    };
                    let value = serde_json::from_str(&result).unwrap_or(Value::String(result));
                    let _ = tx.send(value);
                })
            }
            None => entry.webview.evaluate_script(code),
        };
        if let Err(e) = result {
            tracing::warn!(%surface, error = %e, "failed to evaluate script");
        }
    }
}

/// The surface a modal dialog blocks. `modal` without a parent is ignored.
fn modal_owner(config: &SurfaceConfig) -> Option<SurfaceId> {
    match config.modal {
        Some(true) => config.parent,
        _ => None,
    }
}

/// Keep the surface above its owner and minimized with it.
#[cfg(target_os = "windows")]
fn attach_to_owner(builder: WindowBuilder, owner: &Window) -> WindowBuilder {
    use tao::platform::windows::{WindowBuilderExtWindows, WindowExtWindows};
    builder.with_owner_window(owner.hwnd() as _)
}

#[cfg(target_os = "macos")]
fn attach_to_owner(builder: WindowBuilder, owner: &Window) -> WindowBuilder {
    use tao::platform::macos::{WindowBuilderExtMacOS, WindowExtMacOS};
    builder.with_parent_window(owner.ns_window())
}

#[cfg(target_os = "linux")]
fn attach_to_owner(builder: WindowBuilder, owner: &Window) -> WindowBuilder {
    use tao::platform::unix::{WindowBuilderExtUnix, WindowExtUnix};
    builder.with_transient_for(owner.gtk_window())
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn attach_to_owner(builder: WindowBuilder, _owner: &Window) -> WindowBuilder {
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_owner_needs_parent() {
        let mut config = SurfaceConfig {
            modal: Some(true),
            ..SurfaceConfig::default()
        };
        assert_eq!(modal_owner(&config), None);

        config.parent = Some(SurfaceId(4));
        assert_eq!(modal_owner(&config), Some(SurfaceId(4)));

        config.modal = Some(false);
        assert_eq!(modal_owner(&config), None);
    }
}
