// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Named byte-store namespaces.

use std::sync::Arc;

use kvdb::DBTransaction;

use crate::{KeyValueStore, Result};

const COL: u32 = 0;

/// A byte store scoped to one namespace.
///
/// Keys are prefixed with the namespace name length and bytes, so names of
/// different lengths or contents can never produce colliding backend keys.
#[derive(Clone)]
pub struct Store {
    db: Arc<dyn KeyValueStore>,
    prefix: Vec<u8>,
}

impl Store {
    pub(crate) fn new(db: Arc<dyn KeyValueStore>, name: &[u8]) -> Self {
        debug_assert!(name.len() <= u8::MAX as usize);
        let mut prefix = Vec::with_capacity(1 + name.len());
        prefix.push(name.len() as u8);
        prefix.extend_from_slice(name);
        Store { db, prefix }
    }

    fn make_key(&self, key: &[u8]) -> Vec<u8> {
        let mut k = Vec::with_capacity(self.prefix.len() + key.len());
        k.extend_from_slice(&self.prefix);
        k.extend_from_slice(key);
        k
    }

    /// Reads the value of `key`. Absent keys yield `Ok(None)`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(COL, &self.make_key(key))?)
    }

    /// Writes a single key/value pair.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut tx = self.db.transaction();
        tx.put(COL, &self.make_key(key), value);
        Ok(self.db.write(tx)?)
    }

    /// Runs `f` with a write batch, flushing it atomically when `f` returns
    /// without error.
    pub fn batch<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Batch<'_>) -> Result<()>,
    {
        let mut batch = Batch {
            store: self,
            tx: self.db.transaction(),
        };
        f(&mut batch)?;
        Ok(self.db.write(batch.tx)?)
    }
}

/// Accumulates writes for [`Store::batch`].
pub struct Batch<'a> {
    store: &'a Store,
    tx: DBTransaction,
}

impl Batch<'_> {
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.tx.put(COL, &self.store.make_key(key), value);
    }
}
