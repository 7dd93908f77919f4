// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! The state facade.

use std::collections::hash_map;
use std::collections::HashMap;
use std::sync::Arc;

use rlp::Rlp;
use vetra_muxdb::{MuxDb, SecureTrie};
use vetra_types::{
    blake2b, bytes_to_bytes32, keccak, Address, Bytes32, U256,
};

use crate::account::{load_account, save_account, save_storage, Account};
use crate::cached_object::{cache_code, CachedObject};
use crate::stacked_map::{Loader, StackedMap};
use crate::stage::Stage;
use crate::{Result, StateError};

/// Name of the accounts trie.
pub const ACCOUNT_TRIE_NAME: &[u8] = b"a";

pub(crate) const CODE_STORE_NAME: &[u8] = b"state.code";

/// Returns the name of the storage trie of the account whose address hashes
/// to `address_hash`.
///
/// Each storage trie has a unique name, which keeps its nodes in a distinct
/// keyspace prefix and improves IO performance.
pub fn storage_trie_name(address_hash: &Bytes32) -> Vec<u8> {
    let mut name = Vec::with_capacity(17);
    name.push(b's');
    name.extend_from_slice(&address_hash.as_bytes()[..16]);
    name
}

/// Journal keys, one variant per kind of state entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    Account(Address),
    Code(Address),
    Storage(Address, Bytes32),
}

/// Journal values. The variant always matches the key kind; a mismatch is a
/// programming error.
#[derive(Clone, Debug)]
pub(crate) enum Value {
    Account(Account),
    Code(Arc<Vec<u8>>),
    Storage(Vec<u8>),
}

impl Value {
    fn into_account(self) -> Account {
        match self {
            Value::Account(account) => account,
            _ => unreachable!("journal value kind mismatch: want account"),
        }
    }

    fn into_code(self) -> Arc<Vec<u8>> {
        match self {
            Value::Code(code) => code,
            _ => unreachable!("journal value kind mismatch: want code"),
        }
    }

    fn into_storage(self) -> Vec<u8> {
        match self {
            Value::Storage(raw) => raw,
            _ => unreachable!("journal value kind mismatch: want storage"),
        }
    }
}

/// Resolves journal misses from the cached objects, which in turn read the
/// tries and the code store.
pub(crate) struct CacheLoader {
    db: MuxDb,
    /// The accounts trie reader at the base root. Never written.
    trie: SecureTrie,
    cache: HashMap<Address, CachedObject>,
}

impl CacheLoader {
    pub(crate) fn cached_object(
        &mut self,
        addr: &Address,
    ) -> Result<&mut CachedObject> {
        let Self { db, trie, cache } = self;
        match cache.entry(*addr) {
            hash_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            hash_map::Entry::Vacant(entry) => {
                let account = load_account(trie, addr)?;
                Ok(entry
                    .insert(CachedObject::new(db.clone(), *addr, account)))
            }
        }
    }
}

impl Loader<Key, Value> for CacheLoader {
    fn load(&mut self, key: &Key) -> Result<(Value, bool)> {
        match key {
            Key::Account(addr) => {
                let obj = self.cached_object(addr)?;
                Ok((Value::Account(obj.data.clone()), true))
            }
            Key::Code(addr) => {
                let code = self.cached_object(addr)?.get_code()?;
                Ok((Value::Code(code), true))
            }
            Key::Storage(addr, key) => {
                let raw = self.cached_object(addr)?.get_storage(key)?;
                Ok((Value::Storage(raw), true))
            }
        }
    }
}

/// Manages the world state.
///
/// Reads fall through the journal to per-account cached objects and the
/// tries; writes are journaled copy-on-write and only reach the database
/// through [`State::stage`].
pub struct State {
    sm: StackedMap<Key, Value, CacheLoader>,
}

impl State {
    /// Creates a state over `db`, reading from the revision at `root`.
    pub fn new(db: MuxDb, root: Bytes32) -> Self {
        let trie = db.new_secure_trie(ACCOUNT_TRIE_NAME, root);
        State {
            sm: StackedMap::new(CacheLoader {
                db,
                trie,
                cache: HashMap::new(),
            }),
        }
    }

    fn get_account(&mut self, addr: &Address) -> Result<Account> {
        let (value, _) = self.sm.get(&Key::Account(*addr))?;
        Ok(value.into_account())
    }

    fn update_account(&mut self, addr: &Address, account: Account) {
        self.sm.put(Key::Account(*addr), Value::Account(account));
    }

    /// Returns balance for the given address.
    pub fn get_balance(&mut self, addr: &Address) -> Result<U256> {
        Ok(self.get_account(addr)?.balance)
    }

    /// Sets balance for the given address.
    pub fn set_balance(&mut self, addr: &Address, balance: U256) -> Result<()> {
        let mut cpy = self.get_account(addr)?;
        cpy.balance = balance;
        self.update_account(addr, cpy);
        Ok(())
    }

    /// Returns energy for the given address, grown to `block_time`.
    pub fn get_energy(
        &mut self,
        addr: &Address,
        block_time: u64,
    ) -> Result<U256> {
        Ok(self.get_account(addr)?.calc_energy(block_time))
    }

    /// Sets the stored energy sample for the given address.
    pub fn set_energy(
        &mut self,
        addr: &Address,
        energy: U256,
        block_time: u64,
    ) -> Result<()> {
        let mut cpy = self.get_account(addr)?;
        cpy.energy = energy;
        cpy.block_time = block_time;
        self.update_account(addr, cpy);
        Ok(())
    }

    /// Returns the master of the given address, zero when absent.
    ///
    /// The master can move energy, manage users...
    pub fn get_master(&mut self, addr: &Address) -> Result<Address> {
        Ok(self.get_account(addr)?.master.unwrap_or_default())
    }

    /// Sets the master for the given address. Zero clears it.
    pub fn set_master(
        &mut self,
        addr: &Address,
        master: Address,
    ) -> Result<()> {
        let mut cpy = self.get_account(addr)?;
        cpy.master = if master.is_zero() { None } else { Some(master) };
        self.update_account(addr, cpy);
        Ok(())
    }

    /// Returns the decoded 32-byte storage value for the given key.
    pub fn get_storage(
        &mut self,
        addr: &Address,
        key: &Bytes32,
    ) -> Result<Bytes32> {
        let raw = self.get_raw_storage(addr, key)?;
        if raw.is_empty() {
            return Ok(Bytes32::zero());
        }
        let rlp = Rlp::new(&raw);
        if rlp.is_list() {
            // customized compound value: its identity is the hash of the raw
            return Ok(blake2b(&raw));
        }
        Ok(bytes_to_bytes32(rlp.data()?))
    }

    /// Sets the 32-byte storage value for the given key. Zero clears the
    /// slot; other values are stored with leading zero bytes stripped.
    pub fn set_storage(&mut self, addr: &Address, key: &Bytes32, value: &Bytes32) {
        if value.is_zero() {
            self.set_raw_storage(addr, key, Vec::new());
            return;
        }
        let bytes = value.as_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        self.set_raw_storage(addr, key, rlp::encode(&bytes[start..].to_vec()).to_vec());
    }

    /// Returns the raw storage value for the given key. Absent slots read
    /// as empty.
    pub fn get_raw_storage(
        &mut self,
        addr: &Address,
        key: &Bytes32,
    ) -> Result<Vec<u8>> {
        let (value, _) = self.sm.get(&Key::Storage(*addr, *key))?;
        Ok(value.into_storage())
    }

    /// Sets the raw storage value for the given key. Empty deletes.
    pub fn set_raw_storage(
        &mut self,
        addr: &Address,
        key: &Bytes32,
        raw: Vec<u8>,
    ) {
        self.sm.put(Key::Storage(*addr, *key), Value::Storage(raw));
    }

    /// Stores the value produced by `enc` as raw storage. An error from
    /// `enc` is wrapped and returned.
    pub fn encode_storage<F, E>(
        &mut self,
        addr: &Address,
        key: &Bytes32,
        enc: F,
    ) -> Result<()>
    where
        F: FnOnce() -> std::result::Result<Vec<u8>, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let raw = enc().map_err(|e| StateError::Caller(e.into()))?;
        self.set_raw_storage(addr, key, raw);
        Ok(())
    }

    /// Reads raw storage and hands it to `dec`. An error from `dec` is
    /// wrapped and returned.
    pub fn decode_storage<F, E>(
        &mut self,
        addr: &Address,
        key: &Bytes32,
        dec: F,
    ) -> Result<()>
    where
        F: FnOnce(&[u8]) -> std::result::Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let raw = self.get_raw_storage(addr, key)?;
        dec(&raw).map_err(|e| StateError::Caller(e.into()))
    }

    /// Returns the code of the given address, empty when it has none.
    pub fn get_code(&mut self, addr: &Address) -> Result<Arc<Vec<u8>>> {
        let (value, _) = self.sm.get(&Key::Code(*addr))?;
        Ok(value.into_code())
    }

    /// Returns the code hash of the given address, zero when it has none.
    pub fn get_code_hash(&mut self, addr: &Address) -> Result<Bytes32> {
        Ok(self.get_account(addr)?.code_hash.unwrap_or_default())
    }

    /// Sets the code of the given address. Empty input clears it.
    pub fn set_code(&mut self, addr: &Address, code: Vec<u8>) -> Result<()> {
        let mut cpy = self.get_account(addr)?;
        if code.is_empty() {
            self.sm.put(Key::Code(*addr), Value::Code(Arc::new(Vec::new())));
            cpy.code_hash = None;
        } else {
            let code = Arc::new(code);
            let hash = keccak(code.as_slice());
            self.sm.put(Key::Code(*addr), Value::Code(code.clone()));
            // publish immediately so reads within this state are cache-hot
            cache_code(hash, code);
            cpy.code_hash = Some(hash);
        }
        self.update_account(addr, cpy);
        Ok(())
    }

    /// Returns whether an account exists at the given address.
    /// See [`Account::is_empty`].
    pub fn exists(&mut self, addr: &Address) -> Result<bool> {
        Ok(!self.get_account(addr)?.is_empty())
    }

    /// Deletes the account at the given address: balance, energy, master
    /// and code are all reset. Its storage is implicitly dropped at commit.
    pub fn delete(&mut self, addr: &Address) {
        self.sm.put(Key::Code(*addr), Value::Code(Arc::new(Vec::new())));
        self.update_account(addr, Account::default());
    }

    /// Makes a checkpoint of the current state and returns its revision.
    pub fn new_checkpoint(&mut self) -> usize {
        self.sm.push()
    }

    /// Reverts to the checkpoint identified by `revision`.
    pub fn revert_to(&mut self, revision: usize) {
        self.sm.pop_to(revision);
    }

    /// Builds the storage trie of the given address with all journaled
    /// storage changes applied. Nothing is committed.
    pub fn build_storage_trie(&mut self, addr: &Address) -> Result<SecureTrie> {
        let account = self.get_account(addr)?;
        let db = self.sm.loader().db.clone();
        let mut trie = db.new_secure_trie(
            &storage_trie_name(&blake2b(addr.as_bytes())),
            account.storage_root,
        );

        // filter the journal for this address's storage writes
        let mut writes = Vec::new();
        self.sm.journal(|key, value| {
            if let Key::Storage(a, k) = key {
                if a == addr {
                    writes.push((*k, value.clone().into_storage()));
                }
            }
            true
        });
        for (key, raw) in writes {
            save_storage(&mut trie, &key, &raw)?;
        }
        Ok(trie)
    }

    /// Projects the journal into a [`Stage`], ready to compute the new root
    /// hash or commit all changes.
    pub fn stage(&mut self) -> Result<Stage> {
        struct Changed {
            data: Account,
            storage: HashMap<Bytes32, Vec<u8>>,
        }

        // snapshot the journal in insertion order, so the latest write for
        // a key wins regardless of its frame
        let mut entries = Vec::new();
        self.sm.journal(|key, value| {
            entries.push((key.clone(), value.clone()));
            true
        });

        let loader = self.sm.loader_mut();
        let mut changes: HashMap<Address, Changed> = HashMap::new();
        let mut codes: HashMap<Bytes32, Arc<Vec<u8>>> = HashMap::new();

        for (key, value) in entries {
            match key {
                Key::Account(addr) => {
                    let data = value.into_account();
                    match changes.entry(addr) {
                        hash_map::Entry::Occupied(mut entry) => {
                            entry.get_mut().data = data;
                        }
                        hash_map::Entry::Vacant(entry) => {
                            entry.insert(Changed {
                                data,
                                storage: HashMap::new(),
                            });
                        }
                    }
                }
                Key::Code(_) => {
                    let code = value.into_code();
                    if !code.is_empty() {
                        codes.insert(keccak(code.as_slice()), code);
                    }
                }
                Key::Storage(addr, skey) => {
                    let changed = match changes.entry(addr) {
                        hash_map::Entry::Occupied(entry) => entry.into_mut(),
                        hash_map::Entry::Vacant(entry) => {
                            // storage touched before any account write:
                            // start from the loaded account
                            let data =
                                loader.cached_object(&addr)?.data.clone();
                            entry.insert(Changed {
                                data,
                                storage: HashMap::new(),
                            })
                        }
                    };
                    changed.storage.insert(skey, value.into_storage());
                }
            }
        }

        let db = loader.db.clone();
        let mut account_trie =
            db.new_secure_trie(ACCOUNT_TRIE_NAME, loader.trie.hash());
        let mut storage_tries = Vec::new();

        for (addr, mut changed) in changes {
            // an empty account contributes no storage writes, even when
            // transient slot writes sit in the journal
            if !changed.data.is_empty() && !changed.storage.is_empty() {
                let mut storage_trie = db.new_secure_trie(
                    &storage_trie_name(&blake2b(addr.as_bytes())),
                    changed.data.storage_root,
                );
                for (key, raw) in &changed.storage {
                    save_storage(&mut storage_trie, key, raw)?;
                }
                changed.data.storage_root = storage_trie.hash();
                storage_tries.push(storage_trie);
            }
            save_account(&mut account_trie, &addr, &changed.data)?;
        }

        Ok(Stage::new(db, account_trie, storage_tries, codes))
    }
}
