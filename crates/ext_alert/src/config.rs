//! Dialog options, surface configuration, and the merge rules that combine
//! them for the frameless and framed modes.
//!
//! Dialog options are an opaque JSON object handed to the dialog library.
//! The only keys read here are `bw` (surface overrides), `singletonId`,
//! `type`/`icon`, `title`, `toast`, `position`, and the class maps the
//! modes force.

use crate::host::SurfaceId;
use crate::position::Anchor;
use crate::sound::Sound;
use crate::{AlertError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

/// Dialog option key carrying caller surface overrides
pub const SURFACE_OVERRIDES_KEY: &str = "bw";
/// Dialog option key carrying the singleton id
pub const SINGLETON_KEY: &str = "singletonId";

/// Default surface width when neither settings nor caller give one
pub const DEFAULT_WIDTH: u32 = 800;
/// Default surface height when neither settings nor caller give one
pub const DEFAULT_HEIGHT: u32 = 600;

const FRAMELESS_BACKDROP: &str = "rgba(0,0,0,0.0)";
const TRANSPARENT_BACKGROUND: &str = "#00000000";

// ============================================================================
// Lifecycle callbacks
// ============================================================================

/// Callback receiving the renderer payload of a lifecycle event
pub type PayloadCallback = Rc<dyn Fn(&Value)>;
/// Callback run after the surface is gone
pub type CloseCallback = Rc<dyn Fn()>;

/// Optional lifecycle callbacks.
///
/// The `on_*` slots are the legacy names (`onBeforeOpen`, `onOpen`,
/// `onClose`, `onAfterClose`); each is used only when its current
/// counterpart is unset.
#[derive(Clone, Default)]
pub struct LifecycleCallbacks {
    pub will_open: Option<PayloadCallback>,
    pub did_open: Option<PayloadCallback>,
    pub will_close: Option<PayloadCallback>,
    pub did_close: Option<CloseCallback>,
    pub on_before_open: Option<PayloadCallback>,
    pub on_open: Option<PayloadCallback>,
    pub on_close: Option<PayloadCallback>,
    pub on_after_close: Option<CloseCallback>,
}

impl LifecycleCallbacks {
    pub fn resolved_will_open(&self) -> Option<PayloadCallback> {
        self.will_open.clone().or_else(|| self.on_before_open.clone())
    }

    pub fn resolved_did_open(&self) -> Option<PayloadCallback> {
        self.did_open.clone().or_else(|| self.on_open.clone())
    }

    pub fn resolved_will_close(&self) -> Option<PayloadCallback> {
        self.will_close.clone().or_else(|| self.on_close.clone())
    }

    pub fn resolved_did_close(&self) -> Option<CloseCallback> {
        self.did_close.clone().or_else(|| self.on_after_close.clone())
    }
}

impl fmt::Debug for LifecycleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallbacks")
            .field("will_open", &self.will_open.is_some())
            .field("did_open", &self.did_open.is_some())
            .field("will_close", &self.will_close.is_some())
            .field("did_close", &self.did_close.is_some())
            .field("on_before_open", &self.on_before_open.is_some())
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_after_close", &self.on_after_close.is_some())
            .finish()
    }
}

// ============================================================================
// Dialog options
// ============================================================================

/// Options for one dialog: the library configuration plus host callbacks.
#[derive(Debug, Clone, Default)]
pub struct DialogOptions {
    config: Map<String, Value>,
    callbacks: LifecycleCallbacks,
}

impl DialogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object. Anything other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(config) => Ok(Self {
                config,
                callbacks: LifecycleCallbacks::default(),
            }),
            other => Err(AlertError::invalid_options(format!(
                "dialog options must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.config.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.config.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.config.remove(key)
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.with("title", title.into())
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.with("text", text.into())
    }

    pub fn html(self, html: impl Into<String>) -> Self {
        self.with("html", html.into())
    }

    pub fn icon(self, icon: impl Into<String>) -> Self {
        self.with("icon", icon.into())
    }

    pub fn toast(self, toast: bool) -> Self {
        self.with("toast", toast)
    }

    pub fn position(self, position: impl Into<String>) -> Self {
        self.with("position", position.into())
    }

    pub fn timer(self, millis: u64) -> Self {
        self.with("timer", millis)
    }

    pub fn singleton_id(self, id: impl Into<String>) -> Self {
        self.with(SINGLETON_KEY, id.into())
    }

    /// Surface overrides merged under the mode-forced fields.
    pub fn surface_overrides(self, overrides: Value) -> Self {
        self.with(SURFACE_OVERRIDES_KEY, overrides)
    }

    pub fn will_open(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.callbacks.will_open = Some(Rc::new(f));
        self
    }

    pub fn did_open(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.callbacks.did_open = Some(Rc::new(f));
        self
    }

    pub fn will_close(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.callbacks.will_close = Some(Rc::new(f));
        self
    }

    pub fn did_close(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.did_close = Some(Rc::new(f));
        self
    }

    pub fn on_before_open(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.callbacks.on_before_open = Some(Rc::new(f));
        self
    }

    pub fn on_open(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.callbacks.on_open = Some(Rc::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn(&Value) + 'static) -> Self {
        self.callbacks.on_close = Some(Rc::new(f));
        self
    }

    pub fn on_after_close(mut self, f: impl Fn() + 'static) -> Self {
        self.callbacks.on_after_close = Some(Rc::new(f));
        self
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn callbacks(&self) -> &LifecycleCallbacks {
        &self.callbacks
    }

    pub fn is_toast(&self) -> bool {
        self.config.get("toast").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Singleton key, if any. Non-string ids are keyed by their JSON text.
    pub fn singleton_key(&self) -> Option<String> {
        match self.config.get(SINGLETON_KEY)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Merge `entries` into the object stored at `key`, replacing it when it
    /// is missing or not an object.
    pub(crate) fn merge_class(&mut self, key: &str, entries: &[(&str, &str)]) {
        let slot = self
            .config
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(map) = slot {
            for (k, v) in entries {
                map.insert((*k).to_string(), Value::String((*v).to_string()));
            }
        }
    }

    fn surface_override_config(&self) -> Result<SurfaceConfig> {
        SurfaceConfig::from_overrides(self.config.get(SURFACE_OVERRIDES_KEY))
    }
}

// ============================================================================
// Surface configuration
// ============================================================================

/// Renderer capabilities of a surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebPreferences {
    /// Renderer may post messages to the host
    pub ipc_bridge: Option<bool>,
    pub context_isolation: Option<bool>,
    pub dev_tools: Option<bool>,
}

/// Options for creating a dialog surface.
///
/// Unknown keys given by callers are kept in `extra` and passed to the host
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resizable: Option<bool>,
    pub minimizable: Option<bool>,
    pub maximizable: Option<bool>,
    pub fullscreen: Option<bool>,
    pub fullscreenable: Option<bool>,
    pub frame: Option<bool>,
    pub transparent: Option<bool>,
    pub thick_frame: Option<bool>,
    pub closable: Option<bool>,
    pub has_shadow: Option<bool>,
    pub background_color: Option<String>,
    pub title: Option<String>,
    pub show: Option<bool>,
    pub modal: Option<bool>,
    pub parent: Option<SurfaceId>,
    pub always_on_top: Option<bool>,
    pub skip_taskbar: Option<bool>,
    pub excluded_from_shown_windows_menu: Option<bool>,
    /// Skip the reload-shortcut guard on platforms that need one
    pub no_global_shortcut: Option<bool>,
    #[serde(default)]
    pub web_preferences: WebPreferences,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

macro_rules! overlay_fields {
    ($dst:expr, $src:expr; $($field:ident),* $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field;
            }
        )*
    };
}

impl SurfaceConfig {
    /// Defaults every dialog surface starts from.
    pub fn base(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            resizable: Some(false),
            minimizable: Some(false),
            maximizable: Some(false),
            fullscreen: Some(false),
            fullscreenable: Some(false),
            ..Default::default()
        }
    }

    /// Parse caller overrides (the `bw` dialog option).
    pub fn from_overrides(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .map_err(|e| AlertError::invalid_options(format!("surface overrides: {}", e))),
            Some(other) => Err(AlertError::invalid_options(format!(
                "surface overrides must be an object, got {}",
                other
            ))),
        }
    }

    /// Apply every field `other` sets on top of `self`.
    pub fn overlay(&mut self, other: SurfaceConfig) {
        overlay_fields!(self, other;
            width, height, resizable, minimizable, maximizable, fullscreen,
            fullscreenable, frame, transparent, thick_frame, closable, has_shadow,
            background_color, title, show, modal, parent, always_on_top,
            skip_taskbar, excluded_from_shown_windows_menu, no_global_shortcut,
        );
        overlay_fields!(self.web_preferences, other.web_preferences;
            ipc_bridge, context_isolation, dev_tools,
        );
        self.extra.extend(other.extra);
    }

    pub fn apply_size(&mut self, size: SizeHint) {
        if let Some(width) = size.width {
            self.width = Some(width);
        }
        if let Some(height) = size.height {
            self.height = Some(height);
        }
    }
}

/// Caller size hints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHint {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl SizeHint {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Per-fire options shared by every entry point
#[derive(Debug, Clone, Default)]
pub struct FireOptions {
    /// Make the dialog modal to this surface
    pub parent: Option<SurfaceId>,
    pub always_on_top: bool,
    /// Let the user drag the dialog by its body
    pub draggable: bool,
    pub sound: Option<Sound>,
    pub size: Option<SizeHint>,
}

// ============================================================================
// Merge rules
// ============================================================================

/// Borderless, transparent, non-closable surface with an invisible backdrop.
pub fn frameless(options: &mut DialogOptions) -> Result<SurfaceConfig> {
    let mut surface = options.surface_override_config()?;
    surface.frame = Some(false);
    surface.transparent = Some(true);
    surface.thick_frame = Some(false);
    surface.closable = Some(false);
    surface.background_color = Some(TRANSPARENT_BACKGROUND.to_string());
    surface.has_shadow = Some(false);

    options.set("backdrop", FRAMELESS_BACKDROP);
    options.set("allowOutsideClick", false);

    Ok(surface)
}

/// Titled, closable, opaque surface with square corners and no animation.
///
/// The title is `title`, else the dialog's own string title, else
/// `app_name`.
pub fn framed(options: &mut DialogOptions, title: Option<&str>, app_name: &str) -> Result<SurfaceConfig> {
    let mut surface = options.surface_override_config()?;
    let title = title
        .map(str::to_string)
        .or_else(|| options.get("title").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| app_name.to_string());

    surface.frame = Some(true);
    surface.transparent = Some(false);
    surface.thick_frame = Some(true);
    surface.closable = Some(true);
    surface.title = Some(title);

    options.set("allowOutsideClick", false);
    options.merge_class("customClass", &[("popup", "border-radius-0")]);
    options.merge_class(
        "showClass",
        &[("backdrop", "swal2-noanimation"), ("popup", ""), ("icon", "")],
    );
    options.merge_class("hideClass", &[("popup", "")]);

    Ok(surface)
}

/// Everything `fire` needs after merging.
pub(crate) struct Finalized {
    pub surface: SurfaceConfig,
    pub dialog: Map<String, Value>,
    pub callbacks: LifecycleCallbacks,
    pub anchor: Anchor,
    pub singleton: Option<String>,
}

/// Combine base defaults, caller/mode surface options and the forced
/// session settings, and finish the dialog payload.
pub(crate) fn finalize(
    mut options: DialogOptions,
    overrides: SurfaceConfig,
    base: SurfaceConfig,
    fire: &FireOptions,
    dev_tools: bool,
) -> Finalized {
    let mut surface = base;
    surface.overlay(overrides);
    if let Some(size) = fire.size {
        surface.apply_size(size);
    }
    surface.show = Some(false);
    if let Some(parent) = fire.parent {
        surface.parent = Some(parent);
        surface.modal = Some(true);
    }
    surface.web_preferences.ipc_bridge = Some(true);
    surface.web_preferences.context_isolation = Some(false);
    surface.web_preferences.dev_tools = Some(dev_tools);
    surface.skip_taskbar = Some(true);
    surface.excluded_from_shown_windows_menu = Some(true);
    if fire.always_on_top {
        surface.always_on_top = Some(true);
    }

    if fire.draggable {
        options.merge_class(
            "customClass",
            &[
                ("closeButton", "no-drag"),
                ("confirmButton", "no-drag"),
                ("cancelButton", "no-drag"),
                ("denyButton", "no-drag"),
                ("input", "no-drag"),
            ],
        );
    }
    options.merge_class("customClass", &[("container", "noscrollbar")]);

    if !options.contains("icon") {
        if let Some(kind) = options.get("type").cloned() {
            options.set("icon", kind);
        }
    }

    let anchor = Anchor::resolve(
        options.get("position").and_then(Value::as_str),
        options.is_toast(),
    );
    let singleton = options.singleton_key();

    let DialogOptions {
        mut config,
        callbacks,
    } = options;
    config.remove(SURFACE_OVERRIDES_KEY);
    config.remove(SINGLETON_KEY);

    Finalized {
        surface,
        dialog: config,
        callbacks,
        anchor,
        singleton,
    }
}
