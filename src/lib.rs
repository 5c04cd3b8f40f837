//! Two-asset constant-product pool engine: deposits, withdrawals and
//! swaps over a pair of external asset ledgers, with time-weighted price
//! accumulators and optional protocol fee accrual.

pub mod amm;
pub mod config;
pub mod factory;
pub mod ledger;
pub mod pair;
pub mod types;
pub mod utils;

pub use config::ProtocolConfig;
pub use factory::{pair_address, sort_tokens, PairRegistry};
pub use ledger::{AssetCustody, LiquidityLedger, MemoryCustody};
pub use pair::{Pair, PairCtx, Reserves, SwapCallee};
pub use types::{CustodyError, PairError, PairEvent, Result};
