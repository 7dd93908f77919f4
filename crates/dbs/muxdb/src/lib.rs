// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Multiplexed database: named byte-store namespaces and secure tries over a
//! single key/value backend.
//!
//! Every consumer-facing handle (`Store`, `SecureTrie`) is scoped to a
//! namespace name, so tries and stores with distinct names never observe
//! each other's keys. Namespacing keeps each storage trie in its own
//! keyspace prefix, which in turn keeps the backend's IO hot sets separate.

mod store;
mod trie;

use std::io;
use std::sync::Arc;

use kvdb::KeyValueDB;
use thiserror::Error;
use vetra_types::Bytes32;

pub use store::{Batch, Store};
pub use trie::SecureTrie;

/// Common abstraction over key/value backends used by the node.
pub trait KeyValueStore: KeyValueDB + Send + Sync {}

impl<T> KeyValueStore for T where T: KeyValueDB + Send + Sync {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("database access failed: {0}")]
    Database(#[from] io::Error),

    #[error("trie node not found: {0:?}")]
    MissingNode(Bytes32),

    #[error("malformed trie node: {0}")]
    Decoder(#[from] rlp::DecoderError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Handle to the multiplexed database. Cheap to clone.
#[derive(Clone)]
pub struct MuxDb {
    db: Arc<dyn KeyValueStore>,
}

impl MuxDb {
    /// Wraps an existing key/value backend. All namespaces share column 0.
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        MuxDb { db }
    }

    /// Creates an instance backed by an in-memory database.
    pub fn new_mem() -> Self {
        MuxDb {
            db: Arc::new(kvdb_memorydb::create(1)),
        }
    }

    /// Returns the byte store bound to the given namespace name.
    pub fn store(&self, name: &[u8]) -> Store {
        Store::new(self.db.clone(), name)
    }

    /// Opens a secure trie of the given name at `root`.
    ///
    /// The zero root denotes the empty trie. Any root previously returned by
    /// [`SecureTrie::commit`] on the same name opens that exact revision.
    pub fn new_secure_trie(&self, name: &[u8], root: Bytes32) -> SecureTrie {
        SecureTrie::new(self.store(name), root)
    }
}
