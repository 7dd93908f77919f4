// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Per-account read-side cache.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lazy_static::lazy_static;
use lru::LruCache;
use parking_lot::Mutex;
use vetra_muxdb::{MuxDb, SecureTrie};
use vetra_types::{blake2b, Address, Bytes32};

use crate::account::{load_storage, Account};
use crate::state::{storage_trie_name, CODE_STORE_NAME};
use crate::{Result, StateError};

const CODE_CACHE_CAPACITY: usize = 512;

lazy_static! {
    /// Process-wide cache of contract code, shared by all state instances.
    /// Entries are content-addressed and immutable, so concurrent inserts
    /// for the same hash are benign.
    static ref CODE_CACHE: Mutex<LruCache<Bytes32, Arc<Vec<u8>>>> =
        Mutex::new(LruCache::new(
            NonZeroUsize::new(CODE_CACHE_CAPACITY).expect("nonzero capacity"),
        ));
}

/// Publishes freshly written code so subsequent reads are cache-hot.
pub(crate) fn cache_code(hash: Bytes32, code: Arc<Vec<u8>>) {
    CODE_CACHE.lock().put(hash, code);
}

/// Caches code and storage of an account.
///
/// The account data is never mutated here; the state journal owns all
/// pending changes and refreshes accounts by copy.
pub(crate) struct CachedObject {
    db: MuxDb,
    addr: Address,
    pub(crate) data: Account,

    code: Option<Arc<Vec<u8>>>,
    storage_trie: Option<SecureTrie>,
    storage: HashMap<Bytes32, Vec<u8>>,
}

impl CachedObject {
    pub fn new(db: MuxDb, addr: Address, data: Account) -> Self {
        CachedObject {
            db,
            addr,
            data,
            code: None,
            storage_trie: None,
            storage: HashMap::new(),
        }
    }

    /// Idempotent opener for the account's storage trie at its stored root.
    fn storage_trie(&mut self) -> &SecureTrie {
        let Self {
            db,
            addr,
            data,
            storage_trie,
            ..
        } = self;
        storage_trie.get_or_insert_with(|| {
            db.new_secure_trie(
                &storage_trie_name(&blake2b(addr.as_bytes())),
                data.storage_root,
            )
        })
    }

    /// Returns the raw storage value for `key`. Absent slots read as empty.
    pub fn get_storage(&mut self, key: &Bytes32) -> Result<Vec<u8>> {
        if let Some(value) = self.storage.get(key) {
            return Ok(value.clone());
        }
        let value = load_storage(self.storage_trie(), key)?;
        self.storage.insert(*key, value.clone());
        Ok(value)
    }

    /// Returns the account's code, consulting the process-wide cache before
    /// the code store. Accounts without code read as empty.
    pub fn get_code(&mut self) -> Result<Arc<Vec<u8>>> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        let hash = match self.data.code_hash {
            Some(hash) => hash,
            None => return Ok(Arc::new(Vec::new())),
        };
        if let Some(code) = CODE_CACHE.lock().get(&hash) {
            self.code = Some(code.clone());
            return Ok(code.clone());
        }
        let code = self
            .db
            .store(CODE_STORE_NAME)
            .get(hash.as_bytes())?
            .ok_or(StateError::MissingCode(hash))?;
        let code = Arc::new(code);
        CODE_CACHE.lock().put(hash, code.clone());
        self.code = Some(code.clone());
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::save_storage;
    use vetra_types::{bytes_to_bytes32, keccak};

    #[test]
    fn reads_through_committed_trie_and_code_store() {
        let db = MuxDb::new_mem();
        let addr = Address::zero();

        let mut storage_trie = db.new_secure_trie(
            &storage_trie_name(&blake2b(addr.as_bytes())),
            Bytes32::zero(),
        );
        let slots = [
            (bytes_to_bytes32(b"key1"), b"value1".to_vec()),
            (bytes_to_bytes32(b"key2"), b"value2".to_vec()),
            (bytes_to_bytes32(b"key3"), b"value3".to_vec()),
            (bytes_to_bytes32(b"key4"), b"value4".to_vec()),
        ];
        for (key, value) in &slots {
            save_storage(&mut storage_trie, key, value).unwrap();
        }
        let storage_root = storage_trie.commit().unwrap();

        let code: Vec<u8> = (0u8..100).collect();
        let code_hash = keccak(&code);
        db.store(CODE_STORE_NAME)
            .put(code_hash.as_bytes(), &code)
            .unwrap();

        let account = Account {
            code_hash: Some(code_hash),
            storage_root,
            ..Default::default()
        };
        let mut obj = CachedObject::new(db, addr, account);

        assert_eq!(obj.get_code().unwrap().as_slice(), code.as_slice());
        for (key, value) in &slots {
            assert_eq!(&obj.get_storage(key).unwrap(), value);
            // second read hits the slot cache
            assert_eq!(&obj.get_storage(key).unwrap(), value);
        }
        assert_eq!(
            obj.get_storage(&bytes_to_bytes32(b"unset")).unwrap(),
            Vec::<u8>::new()
        );
    }

    #[test]
    fn codeless_account_reads_empty() {
        let db = MuxDb::new_mem();
        let mut obj =
            CachedObject::new(db, Address::zero(), Account::default());
        assert!(obj.get_code().unwrap().is_empty());
    }
}
