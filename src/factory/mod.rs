//! Pool identity and registry interface.
//!
//! The registry that instantiates pools lives outside the engine. What the
//! engine fixes is identity: a pool is addressed by its ordered asset pair,
//! and the ordering must be total and deterministic so that (a, b) and
//! (b, a) always resolve to the same pool.

use ethers::types::Address;
use ethers::utils::keccak256;

use crate::pair::Pair;
use crate::types::{PairError, Result};

/// Canonical ordering: smaller address first. Identical addresses are
/// rejected, so the order over distinct pairs is total.
pub fn sort_tokens(token_a: Address, token_b: Address) -> Result<(Address, Address)> {
    if token_a == token_b {
        return Err(PairError::IdenticalTokens(token_a));
    }
    if token_a < token_b {
        Ok((token_a, token_b))
    } else {
        Ok((token_b, token_a))
    }
}

/// Deterministic pool address derived from the sorted asset pair.
pub fn pair_address(token_a: Address, token_b: Address) -> Result<Address> {
    let (token0, token1) = sort_tokens(token_a, token_b)?;
    let mut preimage = [0u8; 40];
    preimage[..20].copy_from_slice(token0.as_bytes());
    preimage[20..].copy_from_slice(token1.as_bytes());
    let hash = keccak256(preimage);
    Ok(Address::from_slice(&hash[12..]))
}

/// Registry of pools keyed by asset pair.
///
/// Implementations must derive identity via [`pair_address`] and reject a
/// second pool for the same pair with `PairError::PairExists`.
pub trait PairRegistry {
    /// Look up an existing pool for the pair, in either token order.
    fn get_pair(&self, token_a: Address, token_b: Address) -> Option<&Pair>;

    /// Create the pool for the pair, failing if it already exists.
    fn create_pair(&mut self, token_a: Address, token_b: Address) -> Result<Address>;

    /// Number of pools created so far.
    fn pair_count(&self) -> usize;
}
