// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Deferred commit artifact.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use vetra_muxdb::{MuxDb, SecureTrie};
use vetra_types::Bytes32;

use crate::state::CODE_STORE_NAME;
use crate::Result;

/// Holds all changes staged against the accounts trie: the accounts-trie
/// writer itself, one writer per touched storage trie, and pending code
/// blobs. Created by [`crate::State::stage`]; single-use.
pub struct Stage {
    db: MuxDb,
    account_trie: SecureTrie,
    storage_tries: Vec<SecureTrie>,
    codes: HashMap<Bytes32, Arc<Vec<u8>>>,
}

impl Stage {
    pub(crate) fn new(
        db: MuxDb,
        account_trie: SecureTrie,
        storage_tries: Vec<SecureTrie>,
        codes: HashMap<Bytes32, Arc<Vec<u8>>>,
    ) -> Self {
        Stage {
            db,
            account_trie,
            storage_tries,
            codes,
        }
    }

    /// Computes the post-change accounts-trie root without writing anything.
    /// May be called repeatedly.
    pub fn hash(&self) -> Bytes32 {
        self.account_trie.hash()
    }

    /// Commits all changes: code blobs first, then every storage trie, then
    /// the accounts trie. Returns the new root. A failure at any step leaves
    /// the previously committed root untouched; orphan code blobs are
    /// content-addressed and harmless.
    pub fn commit(mut self) -> Result<Bytes32> {
        debug!(
            "state commit: {} code blob(s), {} storage trie(s)",
            self.codes.len(),
            self.storage_tries.len()
        );

        if !self.codes.is_empty() {
            self.db.store(CODE_STORE_NAME).batch(|b| {
                for (hash, code) in &self.codes {
                    b.put(hash.as_bytes(), code.as_slice());
                }
                Ok(())
            })?;
        }

        for trie in &mut self.storage_tries {
            trie.commit()?;
        }

        Ok(self.account_trie.commit()?)
    }
}
