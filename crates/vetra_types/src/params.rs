// Copyright 2026 Vetra Foundation. All rights reserved.
// Vetra is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Chain-wide constants.

use ethereum_types::U256;
use lazy_static::lazy_static;

lazy_static! {
    /// Energy generated per 1e18 balance units per second.
    pub static ref ENERGY_GROWTH_RATE: U256 = U256::from(5_000_000_000u64);

    /// Scale factor of the native token (1e18).
    pub static ref TOKEN_DECIMALS_FACTOR: U256 =
        U256::from(1_000_000_000_000_000_000u64);
}
