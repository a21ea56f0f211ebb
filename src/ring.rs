//! The SPSC ring core: memory layout, index arithmetic, wraparound.
//!
//! # Memory layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Shared region: (capacity + 1) cells of cell_size bytes  │
//! │    cell 0 │ cell 1 │ ... │ cell capacity                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! One cell more than `capacity` is mapped so the two indices alone
//! disambiguate full from empty: `head == tail` means empty, head one
//! slot behind tail (mod `capacity + 1`) means full. A shared occupancy
//! counter would otherwise be needed, and it would have to be atomically
//! maintained by both roles.
//!
//! The producer is the sole mutator of `head`, the consumer the sole
//! mutator of `tail`. Each publishes its index with a release store only
//! after the cell encode/decode completes, and reads the opposite index
//! with an acquire load. That handshake is the only synchronization.

use tracing::debug;

use crate::error::ConfigError;
use crate::marshal::{Marshal, MarshalError, RawBytes};
use crate::region::SharedRegion;
use crate::sync::{AtomicU32, Ordering};

/// Cache-line padded index pair shared between the two roles.
#[repr(C)]
struct IndexPair {
    /// Next slot the producer will write. In `[0, capacity]`.
    head: AtomicU32,
    _pad1: [u8; 60],
    /// Next slot the consumer will read. In `[0, capacity]`.
    tail: AtomicU32,
    _pad2: [u8; 60],
}

#[cfg(not(feature = "loom"))]
const _: () = assert!(core::mem::size_of::<IndexPair>() == 128);

impl IndexPair {
    fn new() -> Self {
        Self {
            head: AtomicU32::new(0),
            _pad1: [0; 60],
            tail: AtomicU32::new(0),
            _pad2: [0; 60],
        }
    }
}

/// A lock-free SPSC ring buffer over an anonymous shared memory mapping.
///
/// `capacity` usable slots of `strategy.cell_size()` bytes each. All
/// operations are non-blocking: a full ring reports
/// [`PushResult::WouldBlock`], an empty ring reports `None`.
///
/// For concurrent use, [`split`](Self::split) the ring into its two role
/// handles. The contract is exactly one producer and one consumer; the
/// ring does not detect violations.
pub struct RingBuffer<S: Marshal> {
    region: SharedRegion,
    indices: IndexPair,
    capacity: u32,
    cell_size: usize,
    strategy: S,
}

impl RingBuffer<RawBytes> {
    /// Ring carrying fixed-length byte strings of `cell_size` bytes.
    pub fn new(capacity: u32, cell_size: usize) -> Result<Self, ConfigError> {
        Self::with_strategy(capacity, RawBytes::new(cell_size))
    }
}

impl<S: Marshal> RingBuffer<S> {
    /// Create a ring with `capacity` usable slots and the given strategy.
    ///
    /// Maps `(capacity + 1) * cell_size` bytes of anonymous shared memory;
    /// the mapping is released when the ring is dropped. `head` and `tail`
    /// start at 0 and are never reset independently of teardown.
    pub fn with_strategy(capacity: u32, strategy: S) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let cell_size = strategy.cell_size();
        if cell_size == 0 {
            return Err(ConfigError::ZeroCellSize);
        }
        let region_len = (capacity as usize)
            .checked_add(1)
            .and_then(|slots| slots.checked_mul(cell_size))
            .ok_or(ConfigError::RegionSize {
                capacity,
                cell_size,
            })?;
        let region = SharedRegion::anonymous(region_len).map_err(ConfigError::Map)?;

        debug!(capacity, cell_size, region_len, "created ring");
        Ok(Self {
            region,
            indices: IndexPair::new(),
            capacity,
            cell_size,
            strategy,
        })
    }

    /// Number of usable slots.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Byte length of one cell.
    #[inline]
    pub fn cell_size(&self) -> usize {
        self.cell_size
    }

    /// Index after `idx`, wrapping over the `capacity + 1` ring slots.
    #[inline]
    fn next_index(&self, idx: u32) -> u32 {
        if idx == self.capacity { 0 } else { idx + 1 }
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        let tail = self.indices.tail.load(Ordering::Acquire);
        let head = self.indices.head.load(Ordering::Acquire);
        head == tail
    }

    /// Returns true if every usable slot is occupied.
    pub fn is_full(&self) -> bool {
        let tail = self.indices.tail.load(Ordering::Acquire);
        let head = self.indices.head.load(Ordering::Acquire);
        self.next_index(head) == tail
    }

    /// Number of occupied slots, in `[0, capacity]`.
    pub fn len(&self) -> u32 {
        let tail = self.indices.tail.load(Ordering::Acquire);
        let head = self.indices.head.load(Ordering::Acquire);
        self.occupied(head, tail)
    }

    /// Occupied slots for a head/tail snapshot.
    ///
    /// Two explicit cases: the indices wrap at capacity + 1, so plain
    /// subtraction would underflow once head has wrapped past tail.
    fn occupied(&self, head: u32, tail: u32) -> u32 {
        if head >= tail {
            head - tail
        } else {
            // Widened so capacity + 1 cannot overflow; the result is back
            // in [0, capacity].
            (head as u64 + self.capacity as u64 + 1 - tail as u64) as u32
        }
    }

    /// Try to push an element (single-threaded convenience).
    ///
    /// `Ok(PushResult::WouldBlock)` means the ring is full and the element
    /// was dropped; `Err` means the element does not fit the strategy. In
    /// both cases nothing is mutated.
    pub fn try_push(&mut self, element: &S::Element) -> Result<PushResult, MarshalError> {
        self.push_impl(element)
    }

    /// Try to pop the oldest element (single-threaded convenience).
    pub fn try_pop(&mut self) -> Option<S::Element> {
        self.pop_impl()
    }

    /// Split into the producer and consumer role handles.
    ///
    /// Each handle must be used by exactly one thread of control. Creating
    /// a second handle for the same role breaks the SPSC contract.
    pub fn split(&self) -> (Producer<'_, S>, Consumer<'_, S>) {
        (Producer { ring: self }, Consumer { ring: self })
    }

    /// Snapshot of head/tail for diagnostics.
    pub fn status(&self) -> RingStatus {
        let head = self.indices.head.load(Ordering::Acquire);
        let tail = self.indices.tail.load(Ordering::Acquire);
        RingStatus {
            head,
            tail,
            capacity: self.capacity,
            len: self.occupied(head, tail),
        }
    }

    fn push_impl(&self, element: &S::Element) -> Result<PushResult, MarshalError> {
        // The producer owns head; relaxed is enough for its own index.
        let head = self.indices.head.load(Ordering::Relaxed);
        let tail = self.indices.tail.load(Ordering::Acquire);
        if self.next_index(head) == tail {
            return Ok(PushResult::WouldBlock);
        }

        let offset = head as usize * self.cell_size;
        // SAFETY: head is in [0, capacity], so the cell lies within the
        // region, and the consumer does not touch this slot until the head
        // advance below publishes it.
        let cell = unsafe { self.region.slice_mut_at(offset, self.cell_size) };
        self.strategy.encode(element, cell)?;

        // Release pairs with the consumer's acquire load of head: the cell
        // bytes must be visible before the advanced index is.
        self.indices.head.store(self.next_index(head), Ordering::Release);
        Ok(PushResult::Ok)
    }

    fn pop_impl(&self) -> Option<S::Element> {
        // The consumer owns tail; relaxed is enough for its own index.
        let tail = self.indices.tail.load(Ordering::Relaxed);
        let head = self.indices.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        let offset = tail as usize * self.cell_size;
        // SAFETY: tail is in [0, capacity]; the producer does not reuse
        // this slot until the tail advance below releases it.
        let cell = unsafe { self.region.slice_at(offset, self.cell_size) };
        let element = self.strategy.decode(cell);

        // Release pairs with the producer's acquire load of tail: the slot
        // only becomes writable once the decode has finished.
        self.indices.tail.store(self.next_index(tail), Ordering::Release);
        Some(element)
    }
}

/// Producer-role handle. The sole mutator of `head`.
pub struct Producer<'a, S: Marshal> {
    ring: &'a RingBuffer<S>,
}

impl<'a, S: Marshal> Producer<'a, S> {
    /// Try to push an element to the ring.
    pub fn try_push(&mut self, element: &S::Element) -> Result<PushResult, MarshalError> {
        self.ring.push_impl(element)
    }

    /// Returns true if the ring appears full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }
}

/// Consumer-role handle. The sole mutator of `tail`.
pub struct Consumer<'a, S: Marshal> {
    ring: &'a RingBuffer<S>,
}

impl<'a, S: Marshal> Consumer<'a, S> {
    /// Try to pop the oldest element from the ring.
    pub fn try_pop(&mut self) -> Option<S::Element> {
        self.ring.pop_impl()
    }

    /// Returns true if the ring appears empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of elements available to pop (approximate under concurrency).
    #[inline]
    pub fn len(&self) -> u32 {
        self.ring.len()
    }
}

/// Result of a push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    Ok,
    WouldBlock,
}

impl PushResult {
    #[inline]
    pub fn is_would_block(self) -> bool {
        matches!(self, PushResult::WouldBlock)
    }
}

/// Status snapshot of a ring.
#[derive(Debug, Clone, Copy)]
pub struct RingStatus {
    pub head: u32,
    pub tail: u32,
    pub capacity: u32,
    pub len: u32,
}

impl std::fmt::Display for RingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "head={} tail={} len={}/{}",
            self.head, self.tail, self.len, self.capacity
        )
    }
}
