// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Primitive types shared across the node: addresses, 32-byte hashes and the
//! hashing helpers the state layer is built on.

use blake2::{digest::consts::U32, Blake2b, Digest};

pub use ethereum_types::{H160, H256, U256};
pub use keccak_hash::keccak;

pub mod params;

/// 20-byte account address.
pub type Address = H160;

/// 32-byte value, used for hashes, trie roots and storage keys.
pub type Bytes32 = H256;

type Blake2b256 = Blake2b<U32>;

/// Computes the blake2b-256 digest of `data`.
///
/// Blake2b is the node's key-obfuscation hash: secure tries hash their keys
/// with it, and per-account storage-trie names are derived from it.
pub fn blake2b(data: &[u8]) -> Bytes32 {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    Bytes32::from_slice(hasher.finalize().as_slice())
}

/// Right-aligns up to 32 trailing bytes of `data` into a `Bytes32`.
///
/// Mirrors the truncating set-bytes semantics used for decoded storage
/// values: shorter inputs are left-padded with zeros, longer inputs keep
/// their last 32 bytes.
pub fn bytes_to_bytes32(data: &[u8]) -> Bytes32 {
    let mut out = Bytes32::zero();
    if data.len() >= 32 {
        out.as_bytes_mut().copy_from_slice(&data[data.len() - 32..]);
    } else {
        out.as_bytes_mut()[32 - data.len()..].copy_from_slice(data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_is_stable() {
        // digest must not drift between releases; trie names depend on it
        assert_eq!(blake2b(b""), blake2b(b""));
        assert_ne!(blake2b(b"a"), blake2b(b"b"));
        assert_eq!(blake2b(b"vetra").as_bytes().len(), 32);
    }

    #[test]
    fn bytes32_alignment() {
        let v = bytes_to_bytes32(b"v1");
        assert_eq!(&v.as_bytes()[30..], b"v1");
        assert!(v.as_bytes()[..30].iter().all(|b| *b == 0));

        let long = [0xffu8; 40];
        assert_eq!(bytes_to_bytes32(&long), Bytes32::from_slice(&[0xff; 32]));
    }
}
