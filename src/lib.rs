//! Opaque connection identifiers for packet demultiplexing
//!
//! A connection ID is a short, variable-length byte string carried in packet
//! headers so that an endpoint can route each datagram to the connection it
//! belongs to. This crate provides the value type itself: construction from
//! raw bytes, in-place resizing, and the equality/ordering/hashing contracts
//! that connection lookup tables rely on. Wire framing of IDs (length
//! prefixes, header layout) is the packet codec's business, not this crate's.
//!
//! Because an ID is consulted on every inbound and outbound packet, storage
//! matters: [`StorageStrategy`] selects between a fixed full-capacity inline
//! buffer and a small-buffer layout that only touches the heap for IDs longer
//! than [`SHORT_CID_CAPACITY`] bytes.

mod cid_generator;
mod connection_id;

pub use crate::cid_generator::{ConnectionIdGenerator, RandomConnectionIdGenerator};
pub use crate::connection_id::{CidLengthExceeded, ConnectionId, StorageStrategy};

/// Maximum number of bytes in a connection ID
pub const MAX_CID_SIZE: usize = 20;
/// Inline capacity of the small-buffer storage strategy
pub const SHORT_CID_CAPACITY: usize = 16;
/// Length of locally issued connection IDs by default; also folded into the
/// stable hash so 8-byte IDs digest to their own word value
pub const DEFAULT_CID_LENGTH: usize = 8;
