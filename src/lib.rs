//! Lock-free single-producer single-consumer ring buffer backed by an
//! anonymous shared memory mapping.
//!
//! The ring divides its mapping into `capacity + 1` fixed-size cells and
//! coordinates the two roles with nothing but a pair of acquire/release
//! indices: the producer publishes `head` after encoding a cell, the
//! consumer publishes `tail` after decoding one. Allocating one cell more
//! than the capacity keeps full and empty distinguishable without a
//! shared occupancy counter.
//!
//! How an element becomes cell bytes is a strategy seam ([`Marshal`]):
//!
//! - [`RawBytes`] copies fixed-length byte strings verbatim
//! - [`StructLayout`] packs an ordered tuple of fixed-width numeric
//!   fields, little-endian
//!
//! `try_push` and `try_pop` never block: a full ring reports
//! [`PushResult::WouldBlock`] and an empty ring reports `None`, neither of
//! which is an error. Malformed elements are rejected with a
//! [`MarshalError`] before any byte is written.
//!
//! # Loom
//!
//! Enable the `loom` feature to verify the index handshake across all
//! interleavings:
//!
//! ```text
//! cargo test --features loom
//! ```

pub mod error;
pub mod marshal;
pub mod region;
pub mod ring;
pub mod sync;

pub use error::ConfigError;
pub use marshal::{FieldKind, Marshal, MarshalError, RawBytes, StructLayout, Value};
pub use region::SharedRegion;
pub use ring::{Consumer, Producer, PushResult, RingBuffer, RingStatus};
