// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! The world-state layer.
//!
//! [`State`] is a caching and checkpoint layer over the accounts trie and
//! the per-account storage tries. Mutations accumulate in a revision-stacked
//! journal; [`State::stage`] projects the journal into a [`Stage`], which
//! computes the post-change root hash and commits code blobs and tries in a
//! fixed order.

mod account;
mod cached_object;
mod stacked_map;
mod stage;
mod state;


use thiserror::Error;
use vetra_types::Bytes32;

pub use crate::account::Account;
pub use crate::stage::Stage;
pub use crate::state::{storage_trie_name, State, ACCOUNT_TRIE_NAME};

/// Error caused by state access failure.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state: {0}")]
    Database(#[from] vetra_muxdb::Error),

    #[error("state: {0}")]
    Codec(#[from] rlp::DecoderError),

    /// The code store has no blob for a code hash referenced by an account.
    #[error("state: code {0:?} missing from store")]
    MissingCode(Bytes32),

    /// An error returned by a caller-supplied storage codec closure.
    #[error("state: {0}")]
    Caller(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, StateError>;
