use std::fmt;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Reserves are stored in 112 bits so that their product always fits the
/// 256-bit accumulator used by the invariant check.
pub const MAX_RESERVE: u128 = (1 << 112) - 1;

/// Liquidity locked at the zero address on pool inception. Can never be
/// withdrawn, so reserves can never be drained back to the all-zero state.
pub const MINIMUM_LIQUIDITY: u128 = 1000;

/// Notifications emitted by a pair. Drained by the caller after each
/// operation; `Transfer` covers the liquidity-claim token, with the zero
/// address standing in for mint and burn counterparties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairEvent {
    Mint {
        sender: Address,
        amount0: U256,
        amount1: U256,
    },
    Burn {
        sender: Address,
        amount0: U256,
        amount1: U256,
        to: Address,
    },
    Swap {
        sender: Address,
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    },
    Sync {
        reserve0: u128,
        reserve1: u128,
    },
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
}

impl fmt::Display for PairEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairEvent::Mint { amount0, amount1, .. } => {
                write!(f, "Mint {{ amount0: {}, amount1: {} }}", amount0, amount1)
            }
            PairEvent::Burn { amount0, amount1, to, .. } => {
                write!(f, "Burn {{ amount0: {}, amount1: {}, to: {:?} }}", amount0, amount1, to)
            }
            PairEvent::Swap {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to,
                ..
            } => write!(
                f,
                "Swap {{ in: ({}, {}), out: ({}, {}), to: {:?} }}",
                amount0_in, amount1_in, amount0_out, amount1_out, to
            ),
            PairEvent::Sync { reserve0, reserve1 } => {
                write!(f, "Sync {{ reserve0: {}, reserve1: {} }}", reserve0, reserve1)
            }
            PairEvent::Transfer { from, to, value } => {
                write!(f, "Transfer {{ from: {:?}, to: {:?}, value: {} }}", from, to, value)
            }
        }
    }
}

/// 错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairError {
    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("invalid recipient: {0:?}")]
    InvalidRecipient(Address),

    #[error("constant product invariant violated")]
    K,

    #[error("reentrant call rejected")]
    Locked,

    #[error("reserve overflow")]
    Overflow,

    #[error("identical tokens: {0:?}")]
    IdenticalTokens(Address),

    #[error("pair already exists: {0:?}")]
    PairExists(Address),

    #[error(transparent)]
    Custody(#[from] CustodyError),
}

/// Failure surfaced by the external asset custody ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustodyError {
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: U256, have: U256 },
}

pub type Result<T> = std::result::Result<T, PairError>;
