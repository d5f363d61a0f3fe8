// Add-on library registry.
//
// An add-on library is a named bundle of macros and resources published by
// the GM; the bundle itself travels as an asset. The registry records which
// libraries the session has announced and whether their asset has arrived.
// Registration runs on the client's background path, so the registry is
// internally locked.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::types::AssetId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnLibrary {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub asset_id: AssetId,
}

#[derive(Debug)]
struct Registered {
    library: AddOnLibrary,
    loaded: bool,
}

#[derive(Debug, Default)]
pub struct LibraryRegistry {
    libraries: Mutex<BTreeMap<String, Registered>>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Registered>> {
        self.libraries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register (or replace) a library. `loaded` says whether its asset is
    /// already available locally.
    pub fn register(&self, library: AddOnLibrary, loaded: bool) {
        self.lock()
            .insert(library.namespace.clone(), Registered { library, loaded });
    }

    pub fn remove(&self, namespace: &str) -> bool {
        self.lock().remove(namespace).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn get(&self, namespace: &str) -> Option<AddOnLibrary> {
        self.lock().get(namespace).map(|r| r.library.clone())
    }

    pub fn is_loaded(&self, namespace: &str) -> bool {
        self.lock().get(namespace).is_some_and(|r| r.loaded)
    }

    /// Mark every library backed by `asset` as loaded. Returns the
    /// namespaces that changed state.
    pub fn mark_loaded(&self, asset: &AssetId) -> Vec<String> {
        let mut changed = Vec::new();
        for (namespace, registered) in self.lock().iter_mut() {
            if !registered.loaded && &registered.library.asset_id == asset {
                registered.loaded = true;
                changed.push(namespace.clone());
            }
        }
        changed
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}
