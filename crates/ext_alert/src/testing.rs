//! In-memory host and document store for unit tests.

use crate::config::SurfaceConfig;
use crate::document::DocumentStore;
use crate::host::{HostMessage, ScriptReply, SurfaceHost, SurfaceId};
use crate::position::{Anchor, Size};
use crate::runtime::AlertRuntime;
use crate::settings::AlertSettings;
use crate::{AlertError, Result};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Records every call; never emits events on its own.
#[derive(Default)]
pub struct RecordingHost {
    next_id: Cell<u64>,
    pub surfaces: RefCell<Vec<(SurfaceId, SurfaceConfig)>>,
    pub destroyed: RefCell<HashSet<SurfaceId>>,
    pub shown: RefCell<Vec<SurfaceId>>,
    pub positioned: RefCell<Vec<(SurfaceId, Anchor)>>,
    pub resized: RefCell<Vec<(SurfaceId, Size)>>,
    pub loaded: RefCell<Vec<(SurfaceId, String)>>,
    pub menus_removed: RefCell<Vec<SurfaceId>>,
    pub shortcuts: RefCell<HashMap<String, Rc<dyn Fn()>>>,
    pub scripts: RefCell<Vec<(SurfaceId, String)>>,
    pub sent: RefCell<Vec<(SurfaceId, HostMessage)>>,
    /// Value every script evaluates to
    pub script_result: RefCell<Option<Value>>,
    pub fail_create: Cell<bool>,
}

impl RecordingHost {
    pub fn created(&self) -> usize {
        self.surfaces.borrow().len()
    }

    pub fn config_of(&self, surface: SurfaceId) -> Option<SurfaceConfig> {
        self.surfaces
            .borrow()
            .iter()
            .find(|(id, _)| *id == surface)
            .map(|(_, config)| config.clone())
    }

    pub fn last_surface(&self) -> Option<SurfaceId> {
        self.surfaces.borrow().last().map(|(id, _)| *id)
    }

    pub fn has_shortcut(&self, accelerator: &str) -> bool {
        self.shortcuts.borrow().contains_key(accelerator)
    }
}

impl SurfaceHost for RecordingHost {
    fn create_surface(&self, config: &SurfaceConfig) -> Result<SurfaceId> {
        if self.fail_create.get() {
            return Err(AlertError::create_failed("recording host refused"));
        }
        let id = SurfaceId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.surfaces.borrow_mut().push((id, config.clone()));
        Ok(id)
    }

    fn show(&self, surface: SurfaceId) {
        self.shown.borrow_mut().push(surface);
    }

    fn destroy(&self, surface: SurfaceId) {
        self.destroyed.borrow_mut().insert(surface);
    }

    fn is_destroyed(&self, surface: SurfaceId) -> bool {
        self.destroyed.borrow().contains(&surface)
    }

    fn position(&self, surface: SurfaceId, anchor: Anchor) {
        self.positioned.borrow_mut().push((surface, anchor));
    }

    fn resize(&self, surface: SurfaceId, size: Size) {
        self.resized.borrow_mut().push((surface, size));
    }

    fn load_document(&self, surface: SurfaceId, uri: &str) {
        self.loaded.borrow_mut().push((surface, uri.to_string()));
    }

    fn remove_menu(&self, surface: SurfaceId) {
        self.menus_removed.borrow_mut().push(surface);
    }

    fn register_shortcut(&self, accelerator: &str, handler: Rc<dyn Fn()>) {
        self.shortcuts
            .borrow_mut()
            .insert(accelerator.to_string(), handler);
    }

    fn unregister_shortcut(&self, accelerator: &str) {
        self.shortcuts.borrow_mut().remove(accelerator);
    }

    fn execute_script(&self, surface: SurfaceId, code: &str) -> ScriptReply {
        self.scripts.borrow_mut().push((surface, code.to_string()));
        match self.script_result.borrow().clone() {
            Some(value) => ScriptReply::ready(value),
            None => ScriptReply::empty(),
        }
    }

    fn send(&self, surface: SurfaceId, message: &HostMessage) {
        self.sent.borrow_mut().push((surface, message.clone()));
    }
}

/// Keeps documents in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    next: Cell<u32>,
    pub docs: RefCell<HashMap<PathBuf, String>>,
    pub removed: RefCell<Vec<PathBuf>>,
    pub fail_write: Cell<bool>,
}

impl MemoryDocumentStore {
    pub fn only_document(&self) -> Option<String> {
        let docs = self.docs.borrow();
        if docs.len() == 1 {
            docs.values().next().cloned()
        } else {
            None
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn write(&self, content: &str, suggested_name: &str) -> Result<PathBuf> {
        if self.fail_write.get() {
            return Err(AlertError::document_write("disk full"));
        }
        let n = self.next.get() + 1;
        self.next.set(n);
        let path = PathBuf::from(format!("/mem/{}-{}", n, suggested_name));
        self.docs.borrow_mut().insert(path.clone(), content.to_string());
        Ok(path)
    }

    fn remove(&self, path: &Path) {
        self.docs.borrow_mut().remove(path);
        self.removed.borrow_mut().push(path.to_path_buf());
    }
}

pub struct Fixture {
    pub host: Rc<RecordingHost>,
    pub documents: Rc<MemoryDocumentStore>,
    pub runtime: AlertRuntime,
}

pub fn fixture() -> Fixture {
    fixture_with(AlertSettings::default())
}

pub fn fixture_with(settings: AlertSettings) -> Fixture {
    let host = Rc::new(RecordingHost::default());
    let documents = Rc::new(MemoryDocumentStore::default());
    let runtime = AlertRuntime::with_parts(
        host.clone(),
        documents.clone(),
        settings,
        "window.Swal = {};".to_string(),
    );
    Fixture {
        host,
        documents,
        runtime,
    }
}
