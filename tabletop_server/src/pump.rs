// Server side of chunked asset transfer.
//
// `getAsset` registers a producer against the requesting connection; the
// server loop calls `tick` once per pump interval, which hands out the next
// chunk of every active producer and forgets producers that have sent their
// last byte. Transfers to one connection run concurrently, each advancing one
// chunk per tick. Dropping a connection discards its producers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tabletop_model::Asset;
use tabletop_protocol::{AssetChunk, AssetHeader, AssetProducer, ConnectionId};
use tracing::debug;

#[derive(Debug)]
pub struct TransferPump {
    chunk_size: usize,
    active: Mutex<BTreeMap<ConnectionId, Vec<AssetProducer>>>,
}

impl TransferPump {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            active: Mutex::new(BTreeMap::new()),
        }
    }

    fn active(&self) -> MutexGuard<'_, BTreeMap<ConnectionId, Vec<AssetProducer>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start sending `asset` to `connection`. Returns the header to send
    /// ahead of the first chunk.
    pub fn register(&self, connection: ConnectionId, asset: Arc<Asset>) -> AssetHeader {
        let producer = AssetProducer::new(asset, self.chunk_size);
        let header = producer.header();
        self.active().entry(connection).or_default().push(producer);
        header
    }

    /// Next chunk of every active transfer.
    pub fn tick(&self) -> Vec<(ConnectionId, AssetChunk)> {
        let mut active = self.active();
        let mut chunks = Vec::new();
        for (connection, producers) in active.iter_mut() {
            for producer in producers.iter_mut() {
                if let Some(chunk) = producer.next_chunk() {
                    chunks.push((connection.clone(), chunk));
                }
            }
            producers.retain(|p| !p.is_complete());
        }
        active.retain(|_, producers| !producers.is_empty());
        chunks
    }

    /// Discard every transfer to `connection`. Returns how many were dropped.
    pub fn drop_connection(&self, connection: &ConnectionId) -> usize {
        let dropped = self.active().remove(connection).map_or(0, |p| p.len());
        if dropped > 0 {
            debug!("dropped {dropped} pending transfers to {connection}");
        }
        dropped
    }

    pub fn pending(&self) -> usize {
        self.active().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(len: usize) -> Arc<Asset> {
        Arc::new(Asset::new("tiles", vec![7; len]))
    }

    #[test]
    fn one_chunk_per_transfer_per_tick() {
        let pump = TransferPump::new(4);
        let a = ConnectionId::new("a");
        let header = pump.register(a.clone(), asset(10));
        assert_eq!(header.total_size, 10);
        pump.register(a.clone(), asset(3));

        let first = pump.tick();
        assert_eq!(first.len(), 2);
        assert_eq!(pump.pending(), 1);

        let sizes: Vec<usize> = std::iter::from_fn(|| {
            let chunks = pump.tick();
            (!chunks.is_empty()).then(|| chunks[0].1.bytes.len())
        })
        .collect();
        assert_eq!(sizes, vec![4, 2]);
        assert_eq!(pump.pending(), 0);
    }

    #[test]
    fn dropping_connection_discards_transfers() {
        let pump = TransferPump::new(4);
        let a = ConnectionId::new("a");
        let b = ConnectionId::new("b");
        pump.register(a.clone(), asset(100));
        pump.register(b.clone(), asset(100));
        assert_eq!(pump.drop_connection(&a), 1);
        assert!(pump.tick().iter().all(|(conn, _)| conn == &b));
    }

    #[test]
    fn empty_asset_sends_no_chunks() {
        let pump = TransferPump::new(4);
        pump.register(ConnectionId::new("a"), asset(0));
        assert!(pump.tick().is_empty());
        assert_eq!(pump.pending(), 0);
    }
}
