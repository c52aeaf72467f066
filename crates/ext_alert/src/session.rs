//! One dialog: fire, handshake, teardown.

use crate::bus::{Channel, Topic};
use crate::config::{self, DialogOptions, FireOptions, LifecycleCallbacks, SurfaceConfig};
use crate::document::{file_uri, BootstrapDocument, DOCUMENT_NAME};
use crate::host::{HostMessage, ScriptReply, SurfaceId};
use crate::outcome::{DismissReason, Outcome, OutcomeReceiver};
use crate::position::{Anchor, Size};
use crate::registry::Admission;
use crate::remote::RemoteCall;
use crate::runtime::RuntimeInner;
use crate::{AlertError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::oneshot;

/// Accelerators that would reload the dialog document
const RELOAD_SHORTCUTS: [&str; 2] = ["CommandOrControl+R", "CommandOrControl+Shift+R"];

/// Delay the renderer waits before measuring after a validation change
const RESIZE_DELAY_MS: u64 = 25;

/// Unique id of one alert session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Surface a live session owns
struct LiveSurface {
    id: SurfaceId,
    document: Option<PathBuf>,
    /// Parent given at fire time; disables positioning where the window
    /// system places children itself
    has_parent: bool,
    guard_reload: bool,
}

enum SessionState {
    Idle,
    Live(LiveSurface),
    /// Finished, rejected, or failed. Never leaves this state.
    Inert,
}

struct SessionCore {
    id: SessionId,
    head: Vec<String>,
    dev_tools: bool,
    state: SessionState,
    anchor: Anchor,
    visible: bool,
    dialog: Map<String, Value>,
    surface_config: Option<SurfaceConfig>,
    callbacks: LifecycleCallbacks,
    singleton: Option<String>,
    will_open_ran: bool,
    will_close_ran: bool,
    close_signalled: bool,
    shortcuts_registered: bool,
    recorded: Option<Outcome>,
    outcome_tx: Option<oneshot::Sender<Outcome>>,
}

/// One dialog session.
///
/// Cheap to clone; clones share the same session. A session fires at most
/// once.
#[derive(Clone)]
pub struct Alert {
    runtime: Rc<RuntimeInner>,
    core: Rc<RefCell<SessionCore>>,
}

impl fmt::Debug for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Alert")
            .field("id", &core.id)
            .field("surface", &self.surface())
            .field("anchor", &core.anchor)
            .field("visible", &core.visible)
            .finish()
    }
}

impl Alert {
    pub(crate) fn new(runtime: Rc<RuntimeInner>, head: Vec<String>, dev_tools: bool) -> Self {
        let core = SessionCore {
            id: SessionId::generate(),
            head,
            dev_tools,
            state: SessionState::Idle,
            anchor: Anchor::default(),
            visible: false,
            dialog: Map::new(),
            surface_config: None,
            callbacks: LifecycleCallbacks::default(),
            singleton: None,
            will_open_ran: false,
            will_close_ran: false,
            close_signalled: false,
            shortcuts_registered: false,
            recorded: None,
            outcome_tx: None,
        };
        Self {
            runtime,
            core: Rc::new(RefCell::new(core)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.core.borrow().id.clone()
    }

    pub fn anchor(&self) -> Anchor {
        self.core.borrow().anchor
    }

    pub fn is_visible(&self) -> bool {
        self.core.borrow().visible
    }

    pub fn head(&self) -> Vec<String> {
        self.core.borrow().head.clone()
    }

    /// The surface, while the session is live.
    pub fn surface(&self) -> Option<SurfaceId> {
        match &self.core.borrow().state {
            SessionState::Live(live) => Some(live.id),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.core.borrow().state, SessionState::Live(_))
    }

    /// Dialog configuration handed to the renderer
    pub fn config(&self) -> Map<String, Value> {
        self.core.borrow().dialog.clone()
    }

    /// Final surface configuration, once fired
    pub fn surface_config(&self) -> Option<SurfaceConfig> {
        self.core.borrow().surface_config.clone()
    }

    // ========================================================================
    // Fire
    // ========================================================================

    /// Borderless transparent dialog.
    pub fn fire_frameless(&self, mut options: DialogOptions, fire: FireOptions) -> Result<OutcomeReceiver> {
        let overrides = config::frameless(&mut options)?;
        self.fire(options, overrides, fire)
    }

    /// Native titled dialog. Framed dialogs are never draggable.
    pub fn fire_with_frame(
        &self,
        mut options: DialogOptions,
        title: Option<&str>,
        fire: FireOptions,
    ) -> Result<OutcomeReceiver> {
        let overrides = config::framed(&mut options, title, &self.runtime.settings.app_name)?;
        let fire = FireOptions {
            draggable: false,
            ..fire
        };
        self.fire(options, overrides, fire)
    }

    /// Open the dialog. `overrides` is applied over the base surface
    /// defaults, usually the output of [`config::frameless`] or
    /// [`config::framed`].
    pub fn fire(
        &self,
        options: DialogOptions,
        overrides: SurfaceConfig,
        fire: FireOptions,
    ) -> Result<OutcomeReceiver> {
        let rt = self.runtime.clone();
        let (id, dev_tools, head) = {
            let core = self.core.borrow();
            if !matches!(core.state, SessionState::Idle) {
                return Err(AlertError::already_fired(core.id.to_string()));
            }
            (core.id.clone(), core.dev_tools, core.head.clone())
        };

        let base = SurfaceConfig::base(rt.settings.default_width, rt.settings.default_height);
        let done = config::finalize(options, overrides, base, &fire, dev_tools);

        let key = match rt.singletons.admit(done.singleton.as_deref(), &*rt.host) {
            Admission::Showing => {
                tracing::debug!(session = %id, singleton = ?done.singleton, "alert rejected, already showing");
                self.core.borrow_mut().state = SessionState::Inert;
                return Ok(OutcomeReceiver::ready(Outcome::Dismissed(DismissReason::Showing)));
            }
            Admission::Admitted(key) => Some(key),
            Admission::Unkeyed => None,
        };

        let surface = match rt.host.create_surface(&done.surface) {
            Ok(surface) => surface,
            Err(e) => {
                if let Some(key) = &key {
                    rt.singletons.release(key);
                }
                self.core.borrow_mut().state = SessionState::Inert;
                return Err(e);
            }
        };
        if let Some(key) = &key {
            rt.singletons.bind(key, surface);
        }
        rt.surfaces.borrow_mut().insert(surface, id.clone());
        tracing::info!(session = %id, %surface, anchor = %done.anchor, "alert surface created");

        let has_parent = done.surface.parent.is_some();
        let guard_reload = rt.platform.has_global_reload_shortcut()
            && !done.surface.no_global_shortcut.unwrap_or(false);

        let (tx, rx) = oneshot::channel();
        {
            let mut core = self.core.borrow_mut();
            core.state = SessionState::Live(LiveSurface {
                id: surface,
                document: None,
                has_parent,
                guard_reload,
            });
            core.anchor = done.anchor;
            core.singleton = key;
            core.callbacks = done.callbacks;
            core.surface_config = Some(done.surface);
            core.outcome_tx = Some(tx);
        }

        self.reposition();

        let rendered = BootstrapDocument {
            session: &id,
            library: &rt.library,
            head: &head,
            draggable: fire.draggable,
            config: &done.dialog,
            sound: fire.sound.as_ref(),
        }
        .render();
        let written = rendered.and_then(|html| rt.documents.write(&html, DOCUMENT_NAME));
        let path = match written {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(session = %id, %surface, error = %e, "alert document write failed");
                self.abort(surface);
                return Err(e);
            }
        };

        self.core.borrow_mut().dialog = done.dialog;
        if let SessionState::Live(live) = &mut self.core.borrow_mut().state {
            live.document = Some(path.clone());
        }

        self.wire(&id);
        rt.host.load_document(surface, &file_uri(&path));
        rt.host.remove_menu(surface);

        Ok(OutcomeReceiver::new(rx))
    }

    /// Undo a half-finished fire.
    fn abort(&self, surface: SurfaceId) {
        let rt = &self.runtime;
        rt.surfaces.borrow_mut().remove(&surface);
        rt.host.destroy(surface);
        let key = {
            let mut core = self.core.borrow_mut();
            core.state = SessionState::Inert;
            core.outcome_tx = None;
            core.singleton.take()
        };
        if let Some(key) = key {
            rt.singletons.release(&key);
        }
    }

    fn subscribe(&self, id: &SessionId, topic: Topic, handler: fn(&Alert, &Value) -> Option<Value>) {
        // The bus keeps the session alive until teardown removes its
        // channels; the runtime is only borrowed.
        let runtime = Rc::downgrade(&self.runtime);
        let core = self.core.clone();
        self.runtime.bus.on(Channel::new(id, topic), move |payload| {
            let alert = Alert {
                runtime: runtime.upgrade()?,
                core: core.clone(),
            };
            handler(&alert, payload)
        });
    }

    /// Subscribe every channel of this session.
    fn wire(&self, id: &SessionId) {
        self.subscribe(id, Topic::Log, |alert, payload| {
            tracing::debug!(session = %alert.id(), %payload, "renderer log");
            None
        });
        self.subscribe(id, Topic::Reposition, Alert::on_reposition);
        self.subscribe(id, Topic::WillOpen, |alert, payload| {
            alert.on_will_open(payload);
            None
        });
        self.subscribe(id, Topic::DidOpen, |alert, payload| {
            alert.on_did_open(payload);
            None
        });
        self.subscribe(id, Topic::WillClose, |alert, payload| {
            alert.on_will_close(payload);
            None
        });
        self.subscribe(id, Topic::DidClose, |alert, _| {
            alert.on_did_close();
            None
        });
        self.subscribe(id, Topic::ReturnPromise, |alert, payload| {
            alert.on_return(payload);
            None
        });
        self.subscribe(id, Topic::ReadyToShow, |alert, _| {
            alert.reposition();
            None
        });
        self.subscribe(id, Topic::Focus, |alert, _| {
            alert.guard_reload(true);
            None
        });
        self.subscribe(id, Topic::Blur, |alert, _| {
            alert.guard_reload(false);
            None
        });
        self.subscribe(id, Topic::Close, |alert, _| {
            alert.on_close();
            None
        });
        self.subscribe(id, Topic::Closed, |alert, _| {
            alert.teardown();
            None
        });
    }

    // ========================================================================
    // Handshake
    // ========================================================================

    fn live_surface(&self) -> Option<(SurfaceId, bool)> {
        match &self.core.borrow().state {
            SessionState::Live(live) => Some((live.id, live.has_parent)),
            _ => None,
        }
    }

    fn reposition(&self) {
        let Some((surface, has_parent)) = self.live_surface() else {
            return;
        };
        if has_parent && self.runtime.platform.positions_child_natively() {
            return;
        }
        self.runtime.host.position(surface, self.anchor());
    }

    fn on_reposition(&self, payload: &Value) -> Option<Value> {
        let (surface, _) = self.live_surface()?;
        let host = &self.runtime.host;

        let width = payload.get("width").and_then(Value::as_u64);
        let height = payload.get("height").and_then(Value::as_u64);
        if let (Some(width), Some(height)) = (width, height) {
            let size = Size {
                width: u32::try_from(width).unwrap_or(u32::MAX),
                height: u32::try_from(height).unwrap_or(u32::MAX),
            };
            host.resize(surface, size);
        }

        self.reposition();

        let show = payload.as_str() == Some("show")
            || payload.get("show").and_then(Value::as_bool).unwrap_or(false);
        if show {
            host.show(surface);
        }
        Some(json!("repositioned"))
    }

    fn on_will_open(&self, payload: &Value) {
        let callback = {
            let mut core = self.core.borrow_mut();
            if core.will_open_ran {
                return;
            }
            core.will_open_ran = true;
            core.callbacks.resolved_will_open()
        };
        if let Some(callback) = callback {
            callback(payload);
        }
    }

    fn on_did_open(&self, payload: &Value) {
        self.on_will_open(payload);
        let callback = {
            let mut core = self.core.borrow_mut();
            core.visible = true;
            core.callbacks.resolved_did_open()
        };
        if let Some(callback) = callback {
            callback(payload);
        }
    }

    fn on_will_close(&self, payload: &Value) {
        {
            let mut core = self.core.borrow_mut();
            core.visible = false;
            core.close_signalled = true;
        }
        self.run_will_close(payload);
    }

    fn run_will_close(&self, payload: &Value) {
        let callback = {
            let mut core = self.core.borrow_mut();
            if core.will_close_ran {
                return;
            }
            core.will_close_ran = true;
            core.callbacks.resolved_will_close()
        };
        if let Some(callback) = callback {
            callback(payload);
        }
    }

    fn on_did_close(&self) {
        if let Some((surface, _)) = self.live_surface() {
            if !self.runtime.host.is_destroyed(surface) {
                self.runtime.host.destroy(surface);
            }
        }
    }

    fn on_return(&self, payload: &Value) {
        let mut core = self.core.borrow_mut();
        if core.recorded.is_none() {
            core.recorded = Some(Outcome::from_payload(payload.clone()));
        }
    }

    /// Native close request, before the surface is gone.
    fn on_close(&self) {
        let signalled = {
            let mut core = self.core.borrow_mut();
            let signalled = core.close_signalled;
            core.close_signalled = true;
            core.visible = false;
            signalled
        };
        if !signalled {
            self.run_will_close(&json!({}));
        }
    }

    fn guard_reload(&self, focused: bool) {
        let guard = match &self.core.borrow().state {
            SessionState::Live(live) => live.guard_reload,
            _ => false,
        };
        if !guard {
            return;
        }
        let host = &self.runtime.host;
        if focused {
            for accelerator in RELOAD_SHORTCUTS {
                host.register_shortcut(accelerator, Rc::new(|| {}));
            }
        } else {
            for accelerator in RELOAD_SHORTCUTS {
                host.unregister_shortcut(accelerator);
            }
        }
        self.core.borrow_mut().shortcuts_registered = focused;
    }

    /// The surface is gone: settle everything exactly once.
    fn teardown(&self) {
        let rt = self.runtime.clone();
        let (id, live) = {
            let mut core = self.core.borrow_mut();
            let live = match std::mem::replace(&mut core.state, SessionState::Inert) {
                SessionState::Live(live) => live,
                other => {
                    core.state = other;
                    return;
                }
            };
            (core.id.clone(), live)
        };

        if let Some(path) = &live.document {
            rt.documents.remove(path);
        }
        if !rt.host.is_destroyed(live.id) {
            rt.host.destroy(live.id);
        }

        let (tx, outcome) = {
            let mut core = self.core.borrow_mut();
            core.visible = false;
            let outcome = core
                .recorded
                .clone()
                .unwrap_or(Outcome::Dismissed(DismissReason::Close));
            (core.outcome_tx.take(), outcome)
        };
        tracing::debug!(session = %id, surface = %live.id, outcome = %outcome.to_json(), "alert closed");
        if let Some(tx) = tx {
            let _ = tx.send(outcome);
        }

        self.run_will_close(&json!({}));
        let did_close = self.core.borrow().callbacks.resolved_did_close();
        if let Some(callback) = did_close {
            callback();
        }

        let registered = std::mem::take(&mut self.core.borrow_mut().shortcuts_registered);
        if registered {
            for accelerator in RELOAD_SHORTCUTS {
                rt.host.unregister_shortcut(accelerator);
            }
        }

        rt.bus.remove_session(&id);
        let key = self.core.borrow_mut().singleton.take();
        if let Some(key) = key {
            rt.singletons.release(&key);
        }
        rt.surfaces.borrow_mut().remove(&live.id);
        // callbacks may capture this session; drop them with the surface
        self.core.borrow_mut().callbacks = LifecycleCallbacks::default();
    }

    // ========================================================================
    // Script bridge
    // ========================================================================

    /// Evaluate `code` in the dialog. Resolves to `None` once the session is
    /// no longer live.
    pub fn exec_js(&self, code: &str) -> ScriptReply {
        match self.live_surface() {
            Some((surface, _)) if !self.runtime.host.is_destroyed(surface) => {
                self.runtime.host.execute_script(surface, code)
            }
            _ => ScriptReply::empty(),
        }
    }

    fn script(&self, call: RemoteCall) -> ScriptReply {
        self.exec_js(&call.to_script())
    }

    /// Run any remote call. Calls that change the popup height also ask the
    /// renderer to refit the surface once the call returned.
    pub async fn call(&self, call: RemoteCall) -> Option<Value> {
        let refit = call.resizes_popup();
        let value = self.script(call).await;
        if refit {
            if let Some((surface, _)) = self.live_surface() {
                self.runtime.host.send(
                    surface,
                    &HostMessage::ResizeToFit {
                        delay: RESIZE_DELAY_MS,
                    },
                );
            }
        }
        value
    }

    pub fn enable_buttons(&self) -> ScriptReply {
        self.script(RemoteCall::EnableButtons)
    }

    pub fn disable_buttons(&self) -> ScriptReply {
        self.script(RemoteCall::DisableButtons)
    }

    pub fn show_loading(&self) -> ScriptReply {
        self.script(RemoteCall::ShowLoading)
    }

    pub fn hide_loading(&self) -> ScriptReply {
        self.script(RemoteCall::HideLoading)
    }

    pub fn enable_loading(&self) -> ScriptReply {
        self.show_loading()
    }

    pub fn disable_loading(&self) -> ScriptReply {
        self.hide_loading()
    }

    pub fn is_loading(&self) -> ScriptReply {
        self.script(RemoteCall::IsLoading)
    }

    pub fn click_confirm(&self) -> ScriptReply {
        self.script(RemoteCall::ClickConfirm)
    }

    pub fn click_cancel(&self) -> ScriptReply {
        self.script(RemoteCall::ClickCancel)
    }

    pub fn click_deny(&self) -> ScriptReply {
        self.script(RemoteCall::ClickDeny)
    }

    pub async fn show_validation_message(&self, message: impl Into<String>) -> Option<Value> {
        self.call(RemoteCall::ShowValidationMessage(message.into())).await
    }

    pub async fn reset_validation_message(&self) -> Option<Value> {
        self.call(RemoteCall::ResetValidationMessage).await
    }

    pub fn disable_input(&self) -> ScriptReply {
        self.script(RemoteCall::DisableInput)
    }

    pub fn enable_input(&self) -> ScriptReply {
        self.script(RemoteCall::EnableInput)
    }

    pub fn get_timer_left(&self) -> ScriptReply {
        self.script(RemoteCall::GetTimerLeft)
    }

    pub fn stop_timer(&self) -> ScriptReply {
        self.script(RemoteCall::StopTimer)
    }

    pub fn resume_timer(&self) -> ScriptReply {
        self.script(RemoteCall::ResumeTimer)
    }

    pub fn toggle_timer(&self) -> ScriptReply {
        self.script(RemoteCall::ToggleTimer)
    }

    pub fn is_timer_running(&self) -> ScriptReply {
        self.script(RemoteCall::IsTimerRunning)
    }

    pub fn increase_timer(&self, millis: i64) -> ScriptReply {
        self.script(RemoteCall::IncreaseTimer(millis))
    }

    pub fn is_valid_parameter(&self, name: impl Into<String>) -> ScriptReply {
        self.script(RemoteCall::IsValidParameter(name.into()))
    }

    pub fn is_updatable_parameter(&self, name: impl Into<String>) -> ScriptReply {
        self.script(RemoteCall::IsUpdatableParameter(name.into()))
    }
}
