use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops;

use bytes::Buf;
use thiserror::Error;
use tracing::error;

use crate::{DEFAULT_CID_LENGTH, MAX_CID_SIZE, SHORT_CID_CAPACITY};

/// Number of 64-bit words the stable hash folds the ID into
const HASH_WORDS: usize = 3;

const _: () = assert!(MAX_CID_SIZE <= u8::MAX as usize);
const _: () = assert!(MAX_CID_SIZE <= HASH_WORDS * 8);
const _: () = assert!(SHORT_CID_CAPACITY < MAX_CID_SIZE);

/// Storage layout used for connection ID bytes
///
/// Chosen once by the subsystem that issues or parses IDs and passed to every
/// constructor; it is not a per-call decision. Each value remembers the
/// layout it was built under, so IDs from differently configured subsystems
/// can coexist in the same process and still compare, order and hash by
/// content alone.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum StorageStrategy {
    /// Always embed a full [`MAX_CID_SIZE`] buffer in the value
    ///
    /// Never allocates, but every instance carries the full-capacity
    /// footprint no matter how short the ID is.
    FixedInline,
    /// Keep up to [`SHORT_CID_CAPACITY`] bytes inline, spill longer IDs to a
    /// heap buffer sized to the ID
    #[default]
    SmallBuffer,
}

/// Protocol-level identifier for a connection
///
/// An opaque string of up to [`MAX_CID_SIZE`] bytes used to route packets to
/// the connection they belong to. The bytes carry no meaning to this type.
///
/// `ConnectionId` behaves as a plain value: cloning duplicates the bytes into
/// independent storage, and equality, ordering and hashing depend only on the
/// length and content, never on the storage layout. Shared access from
/// multiple threads is fine; mutating ([`set_len`](Self::set_len),
/// [`as_mut_slice`](Self::as_mut_slice)) concurrently with reads requires
/// external synchronization, as resizing may replace the underlying buffer.
#[derive(Clone)]
pub struct ConnectionId {
    /// Length of the ID in bytes
    len: u8,
    /// ID bytes, laid out per the strategy the value was constructed under
    storage: Storage,
}

#[derive(Clone)]
enum Storage {
    /// Full-capacity inline buffer, [`StorageStrategy::FixedInline`]
    Fixed([u8; MAX_CID_SIZE]),
    /// Short inline buffer, [`StorageStrategy::SmallBuffer`] with
    /// `len <= SHORT_CID_CAPACITY`
    Short([u8; SHORT_CID_CAPACITY]),
    /// Heap buffer, [`StorageStrategy::SmallBuffer`] with
    /// `len > SHORT_CID_CAPACITY`
    ///
    /// Invariant: the vector's length equals `ConnectionId::len`.
    Long(Vec<u8>),
}

impl ConnectionId {
    /// Constructs an ID holding a copy of `bytes`
    ///
    /// More than [`MAX_CID_SIZE`] bytes is a protocol integrity violation:
    /// the ID is clamped to the first [`MAX_CID_SIZE`] bytes and a single
    /// error event is emitted on the telemetry path. Use
    /// [`try_new`](Self::try_new) to surface the violation to the caller
    /// instead. Never panics.
    pub fn new(bytes: &[u8], strategy: StorageStrategy) -> Self {
        let bytes = if bytes.len() > MAX_CID_SIZE {
            error!(
                requested = bytes.len(),
                max = MAX_CID_SIZE,
                "attempted to create an over-length connection ID; clamping"
            );
            &bytes[..MAX_CID_SIZE]
        } else {
            bytes
        };
        Self::from_clamped(bytes, strategy)
    }

    /// Constructs an ID holding a copy of `bytes`, rejecting over-length input
    pub fn try_new(bytes: &[u8], strategy: StorageStrategy) -> Result<Self, CidLengthExceeded> {
        if bytes.len() > MAX_CID_SIZE {
            return Err(CidLengthExceeded(bytes.len()));
        }
        Ok(Self::from_clamped(bytes, strategy))
    }

    /// Constructs an ID by consuming `len` bytes from a codec buffer
    ///
    /// The length is determined externally, by protocol version and header
    /// parsing; the ID itself is not framed or length-prefixed on the wire.
    /// Over-length input is clamped and reported as in [`new`](Self::new),
    /// though the full `len` bytes are consumed from `buf` either way.
    pub fn from_buf(buf: &mut impl Buf, len: usize, strategy: StorageStrategy) -> Self {
        Self::new(&buf.copy_to_bytes(len), strategy)
    }

    /// `bytes.len() <= MAX_CID_SIZE` already established by the caller
    fn from_clamped(bytes: &[u8], strategy: StorageStrategy) -> Self {
        debug_assert!(bytes.len() <= MAX_CID_SIZE);
        let storage = match strategy {
            StorageStrategy::FixedInline => {
                let mut buf = [0; MAX_CID_SIZE];
                buf[..bytes.len()].copy_from_slice(bytes);
                Storage::Fixed(buf)
            }
            StorageStrategy::SmallBuffer if bytes.len() <= SHORT_CID_CAPACITY => {
                let mut buf = [0; SHORT_CID_CAPACITY];
                buf[..bytes.len()].copy_from_slice(bytes);
                Storage::Short(buf)
            }
            StorageStrategy::SmallBuffer => Storage::Long(bytes.to_vec()),
        };
        Self {
            len: bytes.len() as u8,
            storage,
        }
    }

    /// Length of the ID in bytes
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is the empty identifier
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The storage strategy governing this value's layout
    pub fn strategy(&self) -> StorageStrategy {
        match self.storage {
            Storage::Fixed(_) => StorageStrategy::FixedInline,
            Storage::Short(_) | Storage::Long(_) => StorageStrategy::SmallBuffer,
        }
    }

    /// Resizes the ID in place, preserving the first `min(old, new)` bytes
    ///
    /// Under [`StorageStrategy::SmallBuffer`] this migrates the bytes between
    /// the inline and heap layouts as the length crosses
    /// [`SHORT_CID_CAPACITY`]; under [`StorageStrategy::FixedInline`] only
    /// the length changes, since the buffer is always at full capacity.
    /// Bytes beyond the old length are unspecified until written through
    /// [`as_mut_slice`](Self::as_mut_slice). A length above [`MAX_CID_SIZE`]
    /// is clamped and reported as in [`new`](Self::new).
    pub fn set_len(&mut self, new_len: usize) {
        let new_len = if new_len > MAX_CID_SIZE {
            error!(
                requested = new_len,
                max = MAX_CID_SIZE,
                "attempted to resize connection ID past the maximum; clamping"
            );
            MAX_CID_SIZE
        } else {
            new_len
        };
        let old_len = self.len();
        match &mut self.storage {
            Storage::Fixed(_) => {}
            Storage::Short(_) if new_len <= SHORT_CID_CAPACITY => {}
            Storage::Short(buf) => {
                // Stage the inline bytes, then adopt a heap buffer.
                let mut heap = vec![0; new_len];
                heap[..old_len].copy_from_slice(&buf[..old_len]);
                self.storage = Storage::Long(heap);
            }
            Storage::Long(buf) if new_len > SHORT_CID_CAPACITY => {
                buf.resize(new_len, 0);
            }
            Storage::Long(buf) => {
                // Stage the surviving prefix, then drop the heap buffer.
                let mut inline = [0; SHORT_CID_CAPACITY];
                inline[..new_len].copy_from_slice(&buf[..new_len]);
                self.storage = Storage::Short(inline);
            }
        }
        self.len = new_len as u8;
    }

    /// Mutable access to the ID bytes
    ///
    /// This is the only way to fill the unspecified bytes exposed by growing
    /// via [`set_len`](Self::set_len).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let len = self.len();
        match &mut self.storage {
            Storage::Fixed(buf) => &mut buf[..len],
            Storage::Short(buf) => &mut buf[..len],
            Storage::Long(buf) => buf,
        }
    }

    /// Content-only 64-bit digest, identical across processes and host byte
    /// orders
    ///
    /// The bytes are zero-padded into three 64-bit words which are
    /// read in little-endian order regardless of the host, then folded
    /// together with the length and [`DEFAULT_CID_LENGTH`] by XOR. An 8-byte
    /// ID therefore digests to the little-endian word value of its content.
    /// Cost is a fixed number of word operations for any length.
    pub fn stable_hash(&self) -> u64 {
        let mut padded = [0; HASH_WORDS * 8];
        padded[..self.len()].copy_from_slice(self.data());
        let mut acc = (DEFAULT_CID_LENGTH ^ self.len()) as u64;
        for word in padded.chunks_exact(8) {
            acc ^= u64::from_le_bytes(word.try_into().unwrap());
        }
        acc
    }

    fn data(&self) -> &[u8] {
        match &self.storage {
            Storage::Fixed(buf) => &buf[..self.len()],
            Storage::Short(buf) => &buf[..self.len()],
            Storage::Long(buf) => buf,
        }
    }
}

/// The empty identifier
impl Default for ConnectionId {
    fn default() -> Self {
        Self::from_clamped(&[], StorageStrategy::SmallBuffer)
    }
}

impl PartialEq for ConnectionId {
    fn eq(&self, other: &Self) -> bool {
        // Slice equality covers both length and content.
        self.data() == other.data()
    }
}

impl Eq for ConnectionId {}

impl Ord for ConnectionId {
    /// Shorter IDs sort before longer ones regardless of content; equal
    /// lengths compare lexicographically
    fn cmp(&self, other: &Self) -> Ordering {
        self.len
            .cmp(&other.len)
            .then_with(|| self.data().cmp(other.data()))
    }
}

impl PartialOrd for ConnectionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for ConnectionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.stable_hash());
    }
}

impl ops::Deref for ConnectionId {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The empty ID renders as `0`, anything else as lowercase hex
///
/// A diagnostic aid for logs and tooling, not a wire format.
impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }
        for byte in self.data() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Error returned when constructing or resizing a connection ID past
/// [`MAX_CID_SIZE`] bytes
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("connection ID length {0} exceeds the maximum of {MAX_CID_SIZE} bytes")]
pub struct CidLengthExceeded(pub usize);
