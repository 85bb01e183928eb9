//! Reference-counted data buffers and their per-pin pool.
//!
//! `Data` wraps a `BytesMut` allocation behind an `Arc`. While the
//! `Arc` has exactly one owner, `data_mut` hands back exclusive
//! mutable access (enforced by `Arc::get_mut`, no locking needed).
//! Once a clone of the `Data` escapes onto a signal, it is shared and
//! therefore treated as immutable from then on — `data_mut` simply
//! returns `None`. When the last clone drops, the backing allocation
//! is returned to the `BufferPool` it was acquired from, if any.

use std::sync::Arc;

use bytes::BytesMut;
use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// The kind of elementary stream a buffer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

/// Metadata carried alongside every `Data` payload.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: StreamKind,
    /// Presentation timestamp, in `Clock` ticks.
    pub timestamp: u64,
    /// Opaque format descriptor (e.g. "h264", "pcm_s16le"); the core
    /// never interprets this, it only carries it between modules.
    pub format: String,
}

impl Metadata {
    pub fn new(kind: StreamKind, timestamp: u64, format: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp,
            format: format.into(),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            kind: StreamKind::Other,
            timestamp: 0,
            format: String::new(),
        }
    }
}

/// Where a buffer's storage should be returned to when its last
/// reference drops. Buffers acquired outside a pool (e.g. built with
/// `Data::from_bytes`) have no origin and are simply freed.
struct Reclaim {
    // Sending here hands the allocation's capacity back to the pool's
    // free list. A full channel (pool already at its outstanding cap)
    // can't happen: we only ever send back what we took out.
    back: Sender<BytesMut>,
}

struct Inner {
    bytes: BytesMut,
    meta: Metadata,
    reclaim: Option<Reclaim>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(reclaim) = self.reclaim.take() {
            let mut storage = std::mem::take(&mut self.bytes);
            storage.clear();
            let _ = reclaim.back.send(storage);
        }
    }
}

/// A reference-counted, resizable byte buffer with attached metadata.
///
/// A default-constructed empty `Data` (`Data::eos()`) is the
/// end-of-stream sentinel that flows through the graph instead of a
/// null pointer.
#[derive(Clone)]
pub struct Data(Option<Arc<Inner>>);

impl Data {
    /// The end-of-stream sentinel: an empty reference.
    pub fn eos() -> Self {
        Data(None)
    }

    /// True if this is the end-of-stream sentinel.
    pub fn is_eos(&self) -> bool {
        self.0.is_none()
    }

    /// Builds a `Data` from owned bytes with no pool affiliation.
    pub fn from_bytes(bytes: BytesMut, meta: Metadata) -> Self {
        Data(Some(Arc::new(Inner {
            bytes,
            meta,
            reclaim: None,
        })))
    }

    fn origin(bytes: BytesMut, meta: Metadata, back: Sender<BytesMut>) -> Self {
        Data(Some(Arc::new(Inner {
            bytes,
            meta,
            reclaim: Some(Reclaim { back }),
        })))
    }

    /// Size in bytes. `0` for the end-of-stream sentinel.
    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |inner| inner.bytes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.0.as_ref().map(|inner| &inner.meta)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref().map_or(&[], |inner| &inner.bytes[..])
    }

    /// Exclusive mutable access, available only while this is the sole
    /// owner — i.e. before the buffer has been published to a signal.
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        let inner = self.0.as_mut()?;
        Arc::get_mut(inner).map(|inner| &mut inner.bytes[..])
    }

    /// Shrinks the logical length without releasing capacity, used
    /// after a short read (see `FileSource`).
    pub fn truncate(&mut self, len: usize) {
        if let Some(inner) = self.0.as_mut().and_then(Arc::get_mut) {
            inner.bytes.truncate(len);
        }
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_eos() {
            write!(f, "Data(EOS)")
        } else {
            write!(f, "Data({} bytes)", self.len())
        }
    }
}

/// A bounded, per-output-pin free list of reusable buffer storage.
///
/// `acquire` blocks while the pool has no free storage and the caller
/// already has `capacity` buffers outstanding; returning a `Data` to
/// zero references replenishes the free list automatically via
/// `Drop`.
pub struct BufferPool {
    capacity: usize,
    free: (Sender<BytesMut>, Receiver<BytesMut>),
}

/// Default maximum number of buffers a pin may have outstanding at
/// once, matching common small defaults for bounded media buffer pools.
pub const DEFAULT_POOL_CAPACITY: usize = 10;

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be positive");
        let free = crossbeam_channel::bounded(capacity);
        for _ in 0..capacity {
            // ignore error: channel has exactly `capacity` room
            let _ = free.0.send(BytesMut::new());
        }
        Self { capacity, free }
    }

    /// Number of outstanding-buffer slots this pool was configured
    /// with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffers currently sitting in the free list (i.e. not
    /// checked out). At pipeline teardown this should equal
    /// `capacity()` — the "no buffer leak" property.
    pub fn free_count(&self) -> usize {
        self.free.1.len()
    }

    /// Acquires a buffer with at least `size` bytes of capacity,
    /// blocking until one is available if the pool is exhausted.
    pub fn acquire(&self, size: usize) -> Data {
        // blocks: this is intentional backpressure, never an error.
        let mut storage = self.free.1.recv().expect("pool sender never dropped while pool alive");
        storage.clear();
        if storage.capacity() < size {
            storage.reserve(size - storage.capacity());
        }
        storage.resize(size, 0);
        Data::origin(storage, Metadata::default(), self.free.0.clone())
    }

    /// Non-blocking variant: returns `None` if the pool is exhausted
    /// instead of blocking.
    pub fn try_acquire(&self, size: usize) -> Option<Data> {
        let mut storage = match self.free.1.try_recv() {
            Ok(storage) => storage,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => unreachable!("pool sender kept alive by self"),
        };
        storage.clear();
        if storage.capacity() < size {
            storage.reserve(size - storage.capacity());
        }
        storage.resize(size, 0);
        Some(Data::origin(storage, Metadata::default(), self.free.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eos_is_empty_and_marked() {
        let eos = Data::eos();
        assert!(eos.is_eos());
        assert_eq!(eos.len(), 0);
    }

    #[test]
    fn acquire_then_drop_replenishes_pool() {
        let pool = BufferPool::new(4);
        assert_eq!(pool.free_count(), 4);
        let data = pool.acquire(16);
        assert_eq!(pool.free_count(), 3);
        assert_eq!(data.len(), 16);
        drop(data);
        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn try_acquire_fails_when_exhausted() {
        let pool = BufferPool::new(1);
        let _held = pool.acquire(8);
        assert!(pool.try_acquire(8).is_none());
    }

    #[test]
    fn mutation_only_while_sole_owner() {
        let pool = BufferPool::new(1);
        let mut data = pool.acquire(4);
        {
            let slice = data.as_mut_slice().expect("sole owner can mutate");
            slice.copy_from_slice(&[1, 2, 3, 4]);
        }
        let shared = data.clone();
        let mut data = data;
        assert!(data.as_mut_slice().is_none(), "shared buffer must not be mutable");
        assert_eq!(shared.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn truncate_shrinks_short_reads() {
        let pool = BufferPool::new(1);
        let mut data = pool.acquire(64);
        data.truncate(10);
        assert_eq!(data.len(), 10);
    }
}
