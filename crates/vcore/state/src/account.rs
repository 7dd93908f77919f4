// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Account record and its trie persistence helpers.

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use vetra_muxdb::SecureTrie;
use vetra_types::{params, Address, Bytes32, U256};

use crate::Result;

/// The value stored in the accounts trie, keyed by address.
///
/// `energy` is the fee-token amount sampled at `block_time`; reads grow it
/// on the fly via [`Account::calc_energy`] without touching the stored pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: U256,
    pub energy: U256,
    pub block_time: u64,
    /// Privileged controller of the account. Absent encodes as zero.
    pub master: Option<Address>,
    /// keccak256 of the contract code; absent means no contract.
    pub code_hash: Option<Bytes32>,
    /// Root of the account's storage trie. Zero means empty storage.
    pub storage_root: Bytes32,
}

impl Account {
    /// An account is empty when balance and energy are zero and it has
    /// neither master nor code. The storage root is deliberately ignored:
    /// deleting an account resets the other fields and leaves storage to be
    /// dropped at commit.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero()
            && self.energy.is_zero()
            && self.master.is_none()
            && self.code_hash.is_none()
    }

    /// Energy grown to `block_time`.
    pub fn calc_energy(&self, block_time: u64) -> U256 {
        if self.block_time == 0
            || block_time <= self.block_time
            || self.balance.is_zero()
        {
            return self.energy;
        }
        let dt = U256::from(block_time - self.block_time);
        self.energy
            + self.balance * *params::ENERGY_GROWTH_RATE * dt
                / *params::TOKEN_DECIMALS_FACTOR
    }
}

impl Encodable for Account {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.balance);
        s.append(&self.energy);
        s.append(&self.block_time);
        s.append(&self.master.map_or(Vec::new(), |m| m.as_bytes().to_vec()));
        s.append(&self.code_hash.map_or(Vec::new(), |h| h.as_bytes().to_vec()));
        let storage_root = if self.storage_root.is_zero() {
            Vec::new()
        } else {
            self.storage_root.as_bytes().to_vec()
        };
        s.append(&storage_root);
    }
}

impl Decodable for Account {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        let master: Vec<u8> = rlp.val_at(3)?;
        let code_hash: Vec<u8> = rlp.val_at(4)?;
        let storage_root: Vec<u8> = rlp.val_at(5)?;
        Ok(Account {
            balance: rlp.val_at(0)?,
            energy: rlp.val_at(1)?,
            block_time: rlp.val_at(2)?,
            master: match master.len() {
                0 => None,
                20 => Some(Address::from_slice(&master)),
                _ => return Err(DecoderError::Custom("invalid master length")),
            },
            code_hash: match code_hash.len() {
                0 => None,
                32 => Some(Bytes32::from_slice(&code_hash)),
                _ => {
                    return Err(DecoderError::Custom("invalid code hash length"))
                }
            },
            storage_root: match storage_root.len() {
                0 => Bytes32::zero(),
                32 => Bytes32::from_slice(&storage_root),
                _ => {
                    return Err(DecoderError::Custom(
                        "invalid storage root length",
                    ))
                }
            },
        })
    }
}

/// Loads the account at `addr`, defaulting to an empty record when the trie
/// has no entry.
pub(crate) fn load_account(
    trie: &SecureTrie,
    addr: &Address,
) -> Result<Account> {
    match trie.get(addr.as_bytes())? {
        Some(raw) => Ok(rlp::decode(&raw)?),
        None => Ok(Account::default()),
    }
}

/// Saves `account` under `addr`. Empty accounts are written as deletions,
/// so a deleted account is indistinguishable from one that never existed.
pub(crate) fn save_account(
    trie: &mut SecureTrie,
    addr: &Address,
    account: &Account,
) -> Result<()> {
    if account.is_empty() {
        trie.update(addr.as_bytes(), &[])?;
    } else {
        trie.update(addr.as_bytes(), &rlp::encode(account))?;
    }
    Ok(())
}

/// Reads a raw storage value. Absent slots read as empty.
pub(crate) fn load_storage(trie: &SecureTrie, key: &Bytes32) -> Result<Vec<u8>> {
    Ok(trie.get(key.as_bytes())?.unwrap_or_default())
}

/// Writes a raw storage value. Empty deletes the slot.
pub(crate) fn save_storage(
    trie: &mut SecureTrie,
    key: &Bytes32,
    value: &[u8],
) -> Result<()> {
    Ok(trie.update(key.as_bytes(), value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_ignores_storage_root() {
        let mut account = Account::default();
        assert!(account.is_empty());

        account.storage_root = Bytes32::repeat_byte(9);
        assert!(account.is_empty());

        account.balance = 1.into();
        assert!(!account.is_empty());

        let with_master = Account {
            master: Some(Address::repeat_byte(1)),
            ..Default::default()
        };
        assert!(!with_master.is_empty());
    }

    #[test]
    fn energy_growth() {
        let account = Account {
            balance: *params::TOKEN_DECIMALS_FACTOR,
            energy: U256::zero(),
            block_time: 10,
            ..Default::default()
        };
        // 1e18 balance generates the full growth rate per second
        assert_eq!(
            account.calc_energy(1000),
            *params::ENERGY_GROWTH_RATE * U256::from(990)
        );
    }

    #[test]
    fn energy_growth_guards() {
        let account = Account {
            balance: 1_000_000.into(),
            energy: 7.into(),
            block_time: 0,
            ..Default::default()
        };
        // never sampled: stored energy is returned as-is
        assert_eq!(account.calc_energy(100), 7.into());

        let sampled = Account {
            block_time: 50,
            ..account.clone()
        };
        assert_eq!(sampled.calc_energy(50), 7.into());
        assert_eq!(sampled.calc_energy(10), 7.into());

        let broke = Account {
            balance: U256::zero(),
            block_time: 50,
            energy: 7.into(),
            ..Default::default()
        };
        assert_eq!(broke.calc_energy(100), 7.into());
    }

    #[test]
    fn codec_round_trip() {
        let account = Account {
            balance: 12345.into(),
            energy: 67890.into(),
            block_time: 42,
            master: Some(Address::repeat_byte(0xaa)),
            code_hash: Some(Bytes32::repeat_byte(0xbb)),
            storage_root: Bytes32::repeat_byte(0xcc),
        };
        let decoded: Account = rlp::decode(&rlp::encode(&account)).unwrap();
        assert_eq!(decoded, account);

        let sparse = Account {
            balance: 1.into(),
            ..Default::default()
        };
        let decoded: Account = rlp::decode(&rlp::encode(&sparse)).unwrap();
        assert_eq!(decoded, sparse);
        assert_eq!(decoded.master, None);
        assert_eq!(decoded.storage_root, Bytes32::zero());
    }
}
