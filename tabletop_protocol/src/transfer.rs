// Chunked asset transfer.
//
// A producer splits one asset into a header (id, display name, total size)
// followed by chunks of at most `chunk_size` bytes, each carrying its byte
// offset. A consumer allocates a buffer of the declared size from the header
// and writes every chunk at its offset. Writes are idempotent, so duplicated
// and reordered chunks reassemble to the same bytes. The consumer tracks the
// byte ranges it has seen as a sorted list of disjoint half-open intervals;
// the transfer is complete when one interval covers `0..total_size`.
//
// Finishing a transfer re-derives the content hash of the reassembled bytes
// and refuses the asset if it does not match the id it was announced under.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tabletop_model::{Asset, AssetId};

use crate::error::ProtocolError;

/// Default payload size of one chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Largest asset a consumer will allocate a buffer for (64 MB).
pub const MAX_ASSET_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHeader {
    pub asset_id: AssetId,
    pub name: String,
    pub total_size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetChunk {
    pub asset_id: AssetId,
    pub offset: u64,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Sending side of one transfer. Emits chunks in offset order.
#[derive(Debug)]
pub struct AssetProducer {
    asset: Arc<Asset>,
    offset: usize,
    chunk_size: usize,
}

impl AssetProducer {
    pub fn new(asset: Arc<Asset>, chunk_size: usize) -> Self {
        Self {
            asset,
            offset: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset.id
    }

    pub fn header(&self) -> AssetHeader {
        AssetHeader {
            asset_id: self.asset.id.clone(),
            name: self.asset.name.clone(),
            total_size: self.asset.data.len() as u64,
        }
    }

    /// The next chunk, or `None` once every byte has been handed out.
    pub fn next_chunk(&mut self) -> Option<AssetChunk> {
        let data = &self.asset.data;
        if self.offset >= data.len() {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(data.len());
        let chunk = AssetChunk {
            asset_id: self.asset.id.clone(),
            offset: self.offset as u64,
            bytes: data[self.offset..end].to_vec(),
        };
        self.offset = end;
        Some(chunk)
    }

    pub fn is_complete(&self) -> bool {
        self.offset >= self.asset.data.len()
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Receiving side of one transfer.
#[derive(Debug)]
pub struct AssetConsumer {
    header: AssetHeader,
    buffer: Vec<u8>,
    received: Vec<(u64, u64)>,
}

impl AssetConsumer {
    pub fn new(header: AssetHeader) -> Result<Self, ProtocolError> {
        if header.total_size > MAX_ASSET_SIZE {
            return Err(ProtocolError::AssetTooLarge {
                asset: header.asset_id,
                total: header.total_size,
                limit: MAX_ASSET_SIZE,
            });
        }
        let size = usize::try_from(header.total_size).map_err(|_| ProtocolError::AssetTooLarge {
            asset: header.asset_id.clone(),
            total: header.total_size,
            limit: MAX_ASSET_SIZE,
        })?;
        Ok(Self {
            header,
            buffer: vec![0; size],
            received: Vec::new(),
        })
    }

    pub fn header(&self) -> &AssetHeader {
        &self.header
    }

    /// Write one chunk at its offset.
    pub fn write(&mut self, chunk: &AssetChunk) -> Result<(), ProtocolError> {
        if chunk.asset_id != self.header.asset_id {
            return Err(ProtocolError::UnknownTransfer(chunk.asset_id.clone()));
        }
        let out_of_range = || ProtocolError::ChunkOutOfRange {
            asset: chunk.asset_id.clone(),
            offset: chunk.offset,
            len: chunk.bytes.len(),
            total: self.header.total_size,
        };
        let end = chunk
            .offset
            .checked_add(chunk.bytes.len() as u64)
            .filter(|&end| end <= self.header.total_size)
            .ok_or_else(out_of_range)?;
        if chunk.bytes.is_empty() {
            return Ok(());
        }
        let start = usize::try_from(chunk.offset).map_err(|_| out_of_range())?;
        self.buffer[start..start + chunk.bytes.len()].copy_from_slice(&chunk.bytes);
        self.mark(chunk.offset, end);
        Ok(())
    }

    fn mark(&mut self, start: u64, end: u64) {
        let mut merged = Vec::with_capacity(self.received.len() + 1);
        let (mut lo, mut hi) = (start, end);
        for &(a, b) in &self.received {
            if b < lo || a > hi {
                merged.push((a, b));
            } else {
                lo = lo.min(a);
                hi = hi.max(b);
            }
        }
        merged.push((lo, hi));
        merged.sort_unstable();
        self.received = merged;
    }

    /// Bytes received so far, counting overlapping chunks once.
    pub fn received_bytes(&self) -> u64 {
        self.received.iter().map(|(a, b)| b - a).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.received_bytes() == self.header.total_size
    }

    /// Consume the buffer and produce the verified asset.
    pub fn finish(self) -> Result<Asset, ProtocolError> {
        if !self.is_complete() {
            return Err(ProtocolError::IncompleteTransfer(self.header.asset_id));
        }
        let actual = AssetId::digest(&self.buffer);
        if actual != self.header.asset_id {
            return Err(ProtocolError::HashMismatch {
                expected: self.header.asset_id,
                actual,
            });
        }
        Ok(Asset {
            id: actual,
            name: self.header.name,
            data: self.buffer,
        })
    }
}
