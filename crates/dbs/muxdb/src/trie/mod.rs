// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Secure Merkle-Patricia trie.
//!
//! Keys are obfuscated with blake2b before traversal, so adversarial key
//! distributions cannot degenerate the trie shape. Node hashing uses keccak.
//! Nodes are content-addressed in the trie's namespace, which makes every
//! committed root an immutable, reopenable version of the trie.

mod node;

use std::collections::HashMap;

use log::trace;
use vetra_types::{blake2b, keccak, Bytes32};

use self::node::{common_prefix, to_nibbles, Node};
use crate::{store::Store, Error, Result};

/// A secure trie view rooted at a specific revision.
///
/// Updates accumulate in memory; [`SecureTrie::hash`] reflects them without
/// touching the database and [`SecureTrie::commit`] persists them.
pub struct SecureTrie {
    store: Store,
    root: Option<Bytes32>,
    dirty: HashMap<Bytes32, Vec<u8>>,
}

impl SecureTrie {
    pub(crate) fn new(store: Store, root: Bytes32) -> Self {
        SecureTrie {
            store,
            root: if root.is_zero() { None } else { Some(root) },
            dirty: HashMap::new(),
        }
    }

    /// Reads the value stored under `key`. Absent keys yield `Ok(None)`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let path = to_nibbles(blake2b(key).as_bytes());
        match &self.root {
            None => Ok(None),
            Some(root) => self.lookup(root, &path),
        }
    }

    /// Writes `value` under `key`, in memory. An empty value deletes.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let path = to_nibbles(blake2b(key).as_bytes());
        if value.is_empty() {
            if let Some(root) = self.root {
                self.root = self.remove_at(&root, &path)?;
            }
        } else {
            let new_root = self.insert_at(self.root, &path, value.to_vec())?;
            self.root = Some(new_root);
        }
        Ok(())
    }

    /// Current root hash, including uncommitted updates. The empty trie
    /// hashes to zero.
    pub fn hash(&self) -> Bytes32 {
        self.root.unwrap_or_default()
    }

    /// Persists all dirtied nodes and returns the root hash.
    pub fn commit(&mut self) -> Result<Bytes32> {
        if !self.dirty.is_empty() {
            let dirty = std::mem::take(&mut self.dirty);
            trace!("committing {} trie nodes", dirty.len());
            self.store.batch(|b| {
                for (hash, encoded) in &dirty {
                    b.put(hash.as_bytes(), encoded);
                }
                Ok(())
            })?;
        }
        Ok(self.hash())
    }

    fn resolve(&self, hash: &Bytes32) -> Result<Node> {
        let encoded = match self.dirty.get(hash) {
            Some(encoded) => encoded.clone(),
            None => self
                .store
                .get(hash.as_bytes())?
                .ok_or(Error::MissingNode(*hash))?,
        };
        Ok(Node::decode(&encoded)?)
    }

    fn save(&mut self, node: Node) -> Bytes32 {
        let encoded = node.encode();
        let hash = keccak(&encoded);
        self.dirty.insert(hash, encoded);
        hash
    }

    fn lookup(&self, hash: &Bytes32, path: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.resolve(hash)? {
            Node::Leaf { path: lp, value } => {
                Ok(if lp == path { Some(value) } else { None })
            }
            Node::Extension { path: ep, child } => {
                if path.starts_with(&ep) {
                    self.lookup(&child, &path[ep.len()..])
                } else {
                    Ok(None)
                }
            }
            Node::Branch { children, value } => {
                if path.is_empty() {
                    return Ok(value);
                }
                match &children[path[0] as usize] {
                    Some(child) => self.lookup(child, &path[1..]),
                    None => Ok(None),
                }
            }
        }
    }

    fn insert_at(
        &mut self,
        node: Option<Bytes32>,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<Bytes32> {
        let node = match node {
            None => {
                return Ok(self.save(Node::Leaf {
                    path: path.to_vec(),
                    value,
                }))
            }
            Some(hash) => self.resolve(&hash)?,
        };
        match node {
            Node::Leaf {
                path: lp,
                value: lv,
            } => {
                if lp == path {
                    return Ok(self.save(Node::Leaf { path: lp, value }));
                }
                // fixed-length keys: both remainders keep at least one nibble
                let cp = common_prefix(&lp, path);
                let mut children: [Option<Bytes32>; 16] = Default::default();
                let old = self.save(Node::Leaf {
                    path: lp[cp + 1..].to_vec(),
                    value: lv,
                });
                children[lp[cp] as usize] = Some(old);
                let new = self.save(Node::Leaf {
                    path: path[cp + 1..].to_vec(),
                    value,
                });
                children[path[cp] as usize] = Some(new);
                let mut hash = self.save(Node::Branch {
                    children: Box::new(children),
                    value: None,
                });
                if cp > 0 {
                    hash = self.save(Node::Extension {
                        path: path[..cp].to_vec(),
                        child: hash,
                    });
                }
                Ok(hash)
            }
            Node::Extension { path: ep, child } => {
                let cp = common_prefix(&ep, path);
                if cp == ep.len() {
                    let new_child =
                        self.insert_at(Some(child), &path[cp..], value)?;
                    return Ok(self.save(Node::Extension {
                        path: ep,
                        child: new_child,
                    }));
                }
                let mut children: [Option<Bytes32>; 16] = Default::default();
                let er = &ep[cp..];
                let sub = if er.len() == 1 {
                    child
                } else {
                    self.save(Node::Extension {
                        path: er[1..].to_vec(),
                        child,
                    })
                };
                children[er[0] as usize] = Some(sub);
                let pr = &path[cp..];
                let leaf = self.save(Node::Leaf {
                    path: pr[1..].to_vec(),
                    value,
                });
                children[pr[0] as usize] = Some(leaf);
                let mut hash = self.save(Node::Branch {
                    children: Box::new(children),
                    value: None,
                });
                if cp > 0 {
                    hash = self.save(Node::Extension {
                        path: path[..cp].to_vec(),
                        child: hash,
                    });
                }
                Ok(hash)
            }
            Node::Branch { mut children, value: bv } => {
                let idx = path[0] as usize;
                let new_child =
                    self.insert_at(children[idx], &path[1..], value)?;
                children[idx] = Some(new_child);
                Ok(self.save(Node::Branch {
                    children,
                    value: bv,
                }))
            }
        }
    }

    fn remove_at(
        &mut self,
        node_hash: &Bytes32,
        path: &[u8],
    ) -> Result<Option<Bytes32>> {
        match self.resolve(node_hash)? {
            Node::Leaf { path: lp, .. } => Ok(if lp == path {
                None
            } else {
                Some(*node_hash)
            }),
            Node::Extension { path: ep, child } => {
                if !path.starts_with(&ep) {
                    return Ok(Some(*node_hash));
                }
                match self.remove_at(&child, &path[ep.len()..])? {
                    None => Ok(None),
                    Some(h) if h == child => Ok(Some(*node_hash)),
                    Some(h) => Ok(Some(self.splice_extension(ep, h)?)),
                }
            }
            Node::Branch { mut children, value } => {
                let idx = match path.first() {
                    Some(nibble) => *nibble as usize,
                    None => return Ok(Some(*node_hash)),
                };
                let child = match children[idx] {
                    Some(child) => child,
                    None => return Ok(Some(*node_hash)),
                };
                let new_child = self.remove_at(&child, &path[1..])?;
                if new_child == Some(child) {
                    return Ok(Some(*node_hash));
                }
                children[idx] = new_child;
                self.collapse_branch(children, value)
            }
        }
    }

    /// Re-forms a branch after a child was removed, collapsing single-child
    /// branches per MPT rules.
    fn collapse_branch(
        &mut self,
        children: Box<[Option<Bytes32>; 16]>,
        value: Option<Vec<u8>>,
    ) -> Result<Option<Bytes32>> {
        let occupied: Vec<(usize, Bytes32)> = children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|hash| (i, hash)))
            .collect();
        match (occupied.as_slice(), value) {
            ([], None) => Ok(None),
            ([], Some(v)) => Ok(Some(self.save(Node::Leaf {
                path: Vec::new(),
                value: v,
            }))),
            ([(idx, child)], None) => {
                Ok(Some(self.splice_extension(vec![*idx as u8], *child)?))
            }
            (_, value) => Ok(Some(self.save(Node::Branch { children, value }))),
        }
    }

    /// Joins `prefix` onto the node referenced by `child`, merging paths so
    /// no extension ever points at another extension or a leaf.
    fn splice_extension(
        &mut self,
        mut prefix: Vec<u8>,
        child: Bytes32,
    ) -> Result<Bytes32> {
        match self.resolve(&child)? {
            Node::Leaf { path, value } => {
                prefix.extend_from_slice(&path);
                Ok(self.save(Node::Leaf {
                    path: prefix,
                    value,
                }))
            }
            Node::Extension { path, child } => {
                prefix.extend_from_slice(&path);
                Ok(self.save(Node::Extension {
                    path: prefix,
                    child,
                }))
            }
            Node::Branch { .. } => Ok(self.save(Node::Extension {
                path: prefix,
                child,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::MuxDb;
    use vetra_types::Bytes32;

    #[test]
    fn get_update_round_trip() {
        let db = MuxDb::new_mem();
        let mut trie = db.new_secure_trie(b"t", Bytes32::zero());

        assert_eq!(trie.get(b"missing").unwrap(), None);
        assert_eq!(trie.hash(), Bytes32::zero());

        trie.update(b"key1", b"value1").unwrap();
        trie.update(b"key2", b"value2").unwrap();
        assert_eq!(trie.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(trie.get(b"key2").unwrap(), Some(b"value2".to_vec()));

        trie.update(b"key1", b"patched").unwrap();
        assert_eq!(trie.get(b"key1").unwrap(), Some(b"patched".to_vec()));
    }

    #[test]
    fn commit_then_reopen() {
        let db = MuxDb::new_mem();
        let mut trie = db.new_secure_trie(b"t", Bytes32::zero());
        for i in 0u8..64 {
            trie.update(&[i], &[0xA0, i]).unwrap();
        }
        let root = trie.commit().unwrap();
        assert_ne!(root, Bytes32::zero());

        let reopened = db.new_secure_trie(b"t", root);
        for i in 0u8..64 {
            assert_eq!(reopened.get(&[i]).unwrap(), Some(vec![0xA0, i]));
        }
        assert_eq!(reopened.get(&[64]).unwrap(), None);
    }

    #[test]
    fn roots_are_content_deterministic() {
        let db = MuxDb::new_mem();
        let mut forward = db.new_secure_trie(b"x", Bytes32::zero());
        let mut backward = db.new_secure_trie(b"y", Bytes32::zero());

        for i in 0u8..32 {
            forward.update(&[i], &[i + 1]).unwrap();
        }
        for i in (0u8..32).rev() {
            backward.update(&[i], &[i + 1]).unwrap();
        }
        assert_eq!(forward.hash(), backward.hash());

        // an insert-then-delete detour must land on the same root
        let mut detoured = db.new_secure_trie(b"z", Bytes32::zero());
        for i in 0u8..32 {
            detoured.update(&[i], &[i + 1]).unwrap();
        }
        detoured.update(b"transient", b"gone soon").unwrap();
        detoured.update(b"transient", b"").unwrap();
        assert_eq!(detoured.hash(), forward.hash());
    }

    #[test]
    fn delete_to_empty_restores_zero_root() {
        let db = MuxDb::new_mem();
        let mut trie = db.new_secure_trie(b"t", Bytes32::zero());
        trie.update(b"a", b"1").unwrap();
        trie.update(b"b", b"2").unwrap();
        trie.update(b"c", b"3").unwrap();

        trie.update(b"a", b"").unwrap();
        trie.update(b"b", b"").unwrap();
        trie.update(b"c", b"").unwrap();
        assert_eq!(trie.hash(), Bytes32::zero());
        assert_eq!(trie.get(b"a").unwrap(), None);
    }

    #[test]
    fn deleting_absent_key_is_noop() {
        let db = MuxDb::new_mem();
        let mut trie = db.new_secure_trie(b"t", Bytes32::zero());
        trie.update(b"present", b"v").unwrap();
        let root = trie.hash();
        trie.update(b"absent", b"").unwrap();
        assert_eq!(trie.hash(), root);
    }

    #[test]
    fn uncommitted_updates_do_not_leak_into_reopened_views() {
        let db = MuxDb::new_mem();
        let mut trie = db.new_secure_trie(b"t", Bytes32::zero());
        trie.update(b"k", b"v").unwrap();
        let root = trie.commit().unwrap();

        let mut writer = db.new_secure_trie(b"t", root);
        writer.update(b"k", b"other").unwrap();

        // the committed revision is unaffected by the writer's dirty state
        let reader = db.new_secure_trie(b"t", root);
        assert_eq!(reader.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
