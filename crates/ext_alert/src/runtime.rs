//! Application-scoped owner of everything alerts share, and the entry point
//! host drivers push renderer IPC and surface events into.

use crate::bus::{Channel, ChannelBus, Topic};
use crate::config::{DialogOptions, FireOptions, SizeHint};
use crate::document::{DocumentStore, TempDocumentStore};
use crate::exception::{ErrorReport, ExceptionHandler};
use crate::host::{Platform, SurfaceEvent, SurfaceHost, SurfaceId};
use crate::outcome::OutcomeReceiver;
use crate::registry::SingletonRegistry;
use crate::session::{Alert, SessionId};
use crate::settings::AlertSettings;
use crate::sound::Sound;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Renderer -> host events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RendererEvent {
    Log,
    Reposition,
    WillOpen,
    DidOpen,
    WillClose,
    DidClose,
    ReturnPromise,
}

impl RendererEvent {
    pub fn topic(&self) -> Topic {
        match self {
            RendererEvent::Log => Topic::Log,
            RendererEvent::Reposition => Topic::Reposition,
            RendererEvent::WillOpen => Topic::WillOpen,
            RendererEvent::DidOpen => Topic::DidOpen,
            RendererEvent::WillClose => Topic::WillClose,
            RendererEvent::DidClose => Topic::DidClose,
            RendererEvent::ReturnPromise => Topic::ReturnPromise,
        }
    }
}

/// One message posted by the renderer driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererMessage {
    pub session: SessionId,
    pub event: RendererEvent,
    #[serde(default)]
    pub payload: Value,
}

impl SurfaceEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SurfaceEvent::ReadyToShow => Topic::ReadyToShow,
            SurfaceEvent::Focus => Topic::Focus,
            SurfaceEvent::Blur => Topic::Blur,
            SurfaceEvent::Close => Topic::Close,
            SurfaceEvent::Closed => Topic::Closed,
        }
    }
}

pub(crate) struct RuntimeInner {
    pub(crate) host: Rc<dyn SurfaceHost>,
    pub(crate) documents: Rc<dyn DocumentStore>,
    pub(crate) bus: ChannelBus,
    pub(crate) singletons: SingletonRegistry,
    /// Routing only; sessions own their surfaces
    pub(crate) surfaces: RefCell<HashMap<SurfaceId, SessionId>>,
    pub(crate) settings: AlertSettings,
    pub(crate) platform: Platform,
    pub(crate) library: String,
}

impl RuntimeInner {
    pub(crate) fn session_for(&self, surface: SurfaceId) -> Option<SessionId> {
        self.surfaces.borrow().get(&surface).cloned()
    }
}

/// Creates alerts and routes everything the host reports back to them.
#[derive(Clone)]
pub struct AlertRuntime {
    inner: Rc<RuntimeInner>,
}

impl AlertRuntime {
    /// Runtime writing documents as temp files and inlining the library
    /// named by `settings.library_path`.
    pub fn new(host: Rc<dyn SurfaceHost>, settings: AlertSettings) -> Result<Self> {
        let library = settings.load_library()?;
        let documents: Rc<dyn DocumentStore> = match &settings.document_dir {
            Some(dir) => Rc::new(TempDocumentStore::in_dir(dir)),
            None => Rc::new(TempDocumentStore::new()),
        };
        Ok(Self::with_parts(host, documents, settings, library))
    }

    pub fn with_parts(
        host: Rc<dyn SurfaceHost>,
        documents: Rc<dyn DocumentStore>,
        settings: AlertSettings,
        library: String,
    ) -> Self {
        let platform = settings.platform();
        tracing::debug!(?platform, library_len = library.len(), "alert runtime created");
        Self {
            inner: Rc::new(RuntimeInner {
                host,
                documents,
                bus: ChannelBus::new(),
                singletons: SingletonRegistry::new(),
                surfaces: RefCell::new(HashMap::new()),
                settings,
                platform,
                library,
            }),
        }
    }

    /// New session with the configured head lines and devtools flag.
    pub fn alert(&self) -> Alert {
        let settings = &self.inner.settings;
        Alert::new(self.inner.clone(), settings.head.clone(), settings.dev_tools)
    }

    pub fn alert_with_head(&self, head: Vec<String>, dev_tools: bool) -> Alert {
        Alert::new(self.inner.clone(), head, dev_tools)
    }

    /// Frameless, always-on-top toast with no parent. Position defaults to
    /// `top-end`.
    pub fn fire_toast(
        &self,
        options: DialogOptions,
        sound: Option<Sound>,
        size: Option<SizeHint>,
    ) -> Result<OutcomeReceiver> {
        let options = options.toast(true);
        let fire = FireOptions {
            parent: None,
            always_on_top: true,
            draggable: false,
            sound,
            size,
        };
        self.alert().fire_frameless(options, fire)
    }

    /// Handler turning error reports into framed error dialogs.
    pub fn uncaught_exception(
        &self,
        hide_trace: bool,
        closure: Option<Rc<dyn Fn(&ErrorReport)>>,
        always_on_top: bool,
        clean_stack: bool,
    ) -> ExceptionHandler {
        ExceptionHandler::new(self.clone(), hide_trace, closure, always_on_top, clean_stack)
    }

    /// Parse and route a raw IPC body posted by `surface`.
    ///
    /// Returns the synchronous reply, if any (`"repositioned"`).
    pub fn handle_ipc(&self, surface: SurfaceId, body: &str) -> Option<Value> {
        let message: RendererMessage = match serde_json::from_str(body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(%surface, error = %e, "malformed renderer message");
                return None;
            }
        };

        match self.inner.session_for(surface) {
            Some(owner) if owner == message.session => self.handle_message(message),
            owner => {
                tracing::warn!(
                    %surface,
                    session = %message.session,
                    owner = ?owner,
                    "renderer message from a surface the session does not own"
                );
                None
            }
        }
    }

    /// Route an already-validated renderer message.
    pub fn handle_message(&self, message: RendererMessage) -> Option<Value> {
        tracing::debug!(session = %message.session, event = ?message.event, "renderer message");
        let channel = Channel::new(&message.session, message.event.topic());
        self.inner.bus.emit(&channel, &message.payload)
    }

    /// Route a native lifecycle event of `surface`. Unknown surfaces are ignored.
    pub fn handle_surface_event(&self, surface: SurfaceId, event: SurfaceEvent) {
        let Some(session) = self.inner.session_for(surface) else {
            tracing::trace!(%surface, ?event, "event for unrouted surface");
            return;
        };
        tracing::debug!(%session, %surface, ?event, "surface event");
        self.inner
            .bus
            .emit(&Channel::new(&session, event.topic()), &Value::Null);
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.inner.settings
    }

    pub fn platform(&self) -> Platform {
        self.inner.platform
    }

    pub fn singletons(&self) -> &SingletonRegistry {
        &self.inner.singletons
    }

    pub fn bus(&self) -> &ChannelBus {
        &self.inner.bus
    }

    /// Number of surfaces with a live session
    pub fn live_surfaces(&self) -> usize {
        self.inner.surfaces.borrow().len()
    }
}
