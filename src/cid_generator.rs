use rand::RngCore;

use crate::{ConnectionId, StorageStrategy, DEFAULT_CID_LENGTH, MAX_CID_SIZE};

/// Generates connection IDs for locally issued connections
pub trait ConnectionIdGenerator: Send {
    /// Generates a new CID
    ///
    /// Connection IDs MUST NOT contain any information that can be used by
    /// an external observer (that is, one that does not cooperate with the
    /// issuer) to correlate them with other connection IDs for the same
    /// connection.
    fn generate_cid(&mut self) -> ConnectionId;
    /// Returns the length of a CID for connections created by this generator
    fn cid_len(&self) -> usize;
}

/// Generates purely random connection IDs of a certain length
///
/// The storage strategy is fixed when the generator is built; every ID it
/// issues is constructed under that strategy.
#[derive(Debug, Clone, Copy)]
pub struct RandomConnectionIdGenerator {
    cid_len: usize,
    strategy: StorageStrategy,
}

impl Default for RandomConnectionIdGenerator {
    fn default() -> Self {
        Self {
            cid_len: DEFAULT_CID_LENGTH,
            strategy: StorageStrategy::default(),
        }
    }
}

impl RandomConnectionIdGenerator {
    /// Initialize a random CID generator with a fixed CID length
    ///
    /// The given length must be less than or equal to MAX_CID_SIZE.
    pub fn new(cid_len: usize) -> Self {
        debug_assert!(cid_len <= MAX_CID_SIZE);
        Self {
            cid_len,
            ..Self::default()
        }
    }

    /// Select the storage strategy for IDs issued by this generator
    pub fn set_strategy(&mut self, strategy: StorageStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }
}

impl ConnectionIdGenerator for RandomConnectionIdGenerator {
    fn generate_cid(&mut self) -> ConnectionId {
        let mut bytes_arr = [0; MAX_CID_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes_arr[..self.cid_len]);

        ConnectionId::new(&bytes_arr[..self.cid_len], self.strategy)
    }

    fn cid_len(&self) -> usize {
        self.cid_len
    }
}
