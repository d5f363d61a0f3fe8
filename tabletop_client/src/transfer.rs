// Receiving side of chunked asset transfers.
//
// One `AssetConsumer` per asset id, created by `startAssetTransfer` and
// fed by `updateAssetTransfer`. When the last byte range lands the consumer
// is finished (content hash checked against the asset id), the asset goes
// into the shared `AssetStore`, and the buffer is discarded. A zero-byte
// asset is complete on its header alone. A chunk for an
// asset with no open transfer is dropped with a warning and never
// allocates a buffer. This runs on the receive thread; the consumer map has
// its own lock so it never touches model state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tabletop_model::{Asset, AssetId, AssetStore};
use tabletop_protocol::{AssetChunk, AssetConsumer, AssetHeader};
use tracing::{debug, warn};

pub struct TransferManager {
    consumers: Mutex<BTreeMap<AssetId, AssetConsumer>>,
    assets: Arc<AssetStore>,
}

impl TransferManager {
    pub fn new(assets: Arc<AssetStore>) -> Self {
        Self {
            consumers: Mutex::new(BTreeMap::new()),
            assets,
        }
    }

    /// Open (or restart) the transfer described by `header`. An empty asset
    /// has no chunks to wait for, so it is finished and stored at once and
    /// returned here.
    pub fn start(&self, header: AssetHeader) -> Option<Arc<Asset>> {
        let id = header.asset_id.clone();
        let consumer = match AssetConsumer::new(header) {
            Ok(consumer) => consumer,
            Err(e) => {
                warn!("refusing transfer of {id}: {e}");
                return None;
            }
        };
        if consumer.is_complete() {
            self.lock().remove(&id);
            return self.finish(consumer);
        }
        debug!("receiving asset {id}");
        self.lock().insert(id, consumer);
        None
    }

    /// Write one chunk. Returns the stored asset when this chunk completed
    /// the transfer.
    pub fn receive(&self, chunk: &AssetChunk) -> Option<Arc<Asset>> {
        let mut consumers = self.lock();
        let Some(consumer) = consumers.get_mut(&chunk.asset_id) else {
            warn!("chunk for unknown transfer {} dropped", chunk.asset_id);
            return None;
        };
        if let Err(e) = consumer.write(chunk) {
            warn!("bad chunk for {}: {e}", chunk.asset_id);
            return None;
        }
        if !consumer.is_complete() {
            return None;
        }
        let consumer = consumers.remove(&chunk.asset_id)?;
        drop(consumers);
        self.finish(consumer)
    }

    fn finish(&self, consumer: AssetConsumer) -> Option<Arc<Asset>> {
        let id = consumer.header().asset_id.clone();
        match consumer.finish() {
            Ok(asset) => Some(self.assets.put(asset)),
            Err(e) => {
                warn!("transfer of {id} abandoned: {e}");
                None
            }
        }
    }

    pub fn in_progress(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<AssetId, AssetConsumer>> {
        self.consumers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use tabletop_protocol::AssetProducer;

    use super::*;

    fn chunks_of(asset: Asset, size: usize) -> (AssetHeader, Vec<AssetChunk>) {
        let mut producer = AssetProducer::new(Arc::new(asset), size);
        let header = producer.header();
        let mut chunks = Vec::new();
        while let Some(chunk) = producer.next_chunk() {
            chunks.push(chunk);
        }
        (header, chunks)
    }

    #[test]
    fn reassembles_out_of_order_chunks_into_the_store() {
        let store = Arc::new(AssetStore::new());
        let manager = TransferManager::new(Arc::clone(&store));
        let asset = Asset::new("map", (0..=250u8).collect());
        let (header, mut chunks) = chunks_of(asset.clone(), 64);
        chunks.reverse();
        manager.start(header);

        let last = chunks.pop().unwrap();
        for chunk in &chunks {
            assert!(manager.receive(chunk).is_none());
            // Duplicates are harmless.
            assert!(manager.receive(chunk).is_none());
        }
        let stored = manager.receive(&last).unwrap();
        assert_eq!(stored.data, asset.data);
        assert!(store.contains(&asset.id));
        assert_eq!(manager.in_progress(), 0);
    }

    #[test]
    fn chunk_without_header_is_dropped() {
        let store = Arc::new(AssetStore::new());
        let manager = TransferManager::new(Arc::clone(&store));
        let (_, chunks) = chunks_of(Asset::new("x", vec![1, 2, 3]), 8);
        assert!(manager.receive(&chunks[0]).is_none());
        assert_eq!(manager.in_progress(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn corrupted_transfer_is_not_stored() {
        let store = Arc::new(AssetStore::new());
        let manager = TransferManager::new(Arc::clone(&store));
        let (header, mut chunks) = chunks_of(Asset::new("x", vec![9; 10]), 16);
        chunks[0].bytes[0] = 0;
        manager.start(header);
        assert!(manager.receive(&chunks[0]).is_none());
        assert!(store.is_empty());
        assert_eq!(manager.in_progress(), 0);
    }

    #[test]
    fn empty_asset_is_stored_from_its_header() {
        let store = Arc::new(AssetStore::new());
        let manager = TransferManager::new(Arc::clone(&store));
        let asset = Asset::new("empty", Vec::new());
        let (header, chunks) = chunks_of(asset.clone(), 8);
        assert!(chunks.is_empty());

        let stored = manager.start(header).unwrap();
        assert_eq!(stored.id, asset.id);
        assert!(store.contains(&asset.id));
        assert_eq!(manager.in_progress(), 0);
    }
}
