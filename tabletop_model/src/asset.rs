// Content-addressed binary assets and the store that holds them.
//
// An `Asset`'s id is the MD5 digest of its bytes, so two peers holding the
// same id hold the same bytes. The `AssetStore` is an explicitly owned,
// shareable service (wrap it in an `Arc`) rather than a process-global. It is
// internally locked because the client's background path writes completed
// transfers into it while other threads read.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::types::AssetId;

/// Name given to the placeholder sent in place of an unknown asset.
pub const BROKEN_ASSET_NAME: &str = "broken";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub data: Vec<u8>,
}

impl Asset {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: AssetId::digest(&data),
            name: name.into(),
            data,
        }
    }

    /// Stand-in for an asset the server does not have. Keeps the requested
    /// id so the requester can stop waiting for it.
    pub fn placeholder(id: AssetId) -> Self {
        Self {
            id,
            name: BROKEN_ASSET_NAME.into(),
            data: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == BROKEN_ASSET_NAME && self.data.is_empty()
    }

    /// True if the bytes hash to the id.
    pub fn verify(&self) -> bool {
        AssetId::digest(&self.data) == self.id
    }
}

#[derive(Debug, Default)]
pub struct AssetStore {
    assets: Mutex<BTreeMap<AssetId, Arc<Asset>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AssetId, Arc<Asset>>> {
        self.assets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put(&self, asset: Asset) -> Arc<Asset> {
        let asset = Arc::new(asset);
        self.lock().insert(asset.id.clone(), Arc::clone(&asset));
        asset
    }

    pub fn get(&self, id: &AssetId) -> Option<Arc<Asset>> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn remove(&self, id: &AssetId) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
