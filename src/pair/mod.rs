//! Constant-product pool engine.
//!
//! A [`Pair`] tracks two reserve balances under the x*y=k rule. Callers
//! first move assets into the pair's custody, then invoke one of the
//! guarded entry points; each entry point reconciles custody against the
//! recorded reserves and settles the difference.

use std::cmp;

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::amm::{uq112, BPS_DENOMINATOR, SWAP_FEE_BPS};
use crate::factory::sort_tokens;
use crate::ledger::{AssetCustody, LiquidityLedger, LpLedger};
use crate::types::{PairError, PairEvent, Result, MAX_RESERVE, MINIMUM_LIQUIDITY};
use crate::utils::math::isqrt;
use crate::utils::time::Clock;

/// Execution context threaded through every state-mutating entry point.
pub struct PairCtx<'a> {
    pub custody: &'a mut dyn AssetCustody,
    pub clock: &'a dyn Clock,
    /// Protocol fee destination. `None` disables fee accrual.
    pub fee_to: Option<Address>,
    /// Account the operation is attributed to in emitted events.
    pub sender: Address,
}

/// Hook invoked by `swap` after the optimistic transfer and before the
/// invariant check. The callee may move assets through `ctx.custody` to
/// pay for the swap; any attempt to reenter the pair fails with `Locked`.
pub trait SwapCallee {
    fn swap_call(
        &mut self,
        pair: &mut Pair,
        ctx: &mut PairCtx<'_>,
        sender: Address,
        amount0: U256,
        amount1: U256,
        data: &[u8],
    ) -> Result<()>;
}

/// Reserve snapshot. The three fields form one record so that readers
/// always observe reserves and their timestamp together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub reserve0: u128,
    pub reserve1: u128,
    pub block_timestamp_last: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PairState {
    reserves: Reserves,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    k_last: U256,
    lp: LpLedger,
    events: Vec<PairEvent>,
}

/// A two-asset constant-product pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    address: Address,
    token0: Address,
    token1: Address,
    state: PairState,
    #[serde(skip)]
    locked: bool,
}

impl Pair {
    /// Create an empty pool for the given asset pair. Tokens are stored in
    /// canonical order regardless of the order passed in.
    pub fn new(address: Address, token_a: Address, token_b: Address) -> Result<Self> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        Ok(Self {
            address,
            token0,
            token1,
            state: PairState::default(),
            locked: false,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    /// Atomic reserve snapshot.
    pub fn get_reserves(&self) -> Reserves {
        self.state.reserves
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.state.price0_cumulative_last
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.state.price1_cumulative_last
    }

    /// Reserve product recorded at the last liquidity event, zero while
    /// protocol fees are disabled.
    pub fn k_last(&self) -> U256 {
        self.state.k_last
    }

    pub fn total_liquidity(&self) -> U256 {
        self.state.lp.total_supply()
    }

    pub fn liquidity_balance_of(&self, owner: Address) -> U256 {
        self.state.lp.balance_of(owner)
    }

    /// Move liquidity-claim tokens between holders. Burning via the pool
    /// requires transferring the claim to the pair's own address first.
    pub fn transfer_liquidity(&mut self, from: Address, to: Address, value: U256) -> Result<()> {
        self.state.lp.transfer(from, to, value)?;
        self.state.events.push(PairEvent::Transfer { from, to, value });
        Ok(())
    }

    /// Drain the accumulated event log.
    pub fn drain_events(&mut self) -> Vec<PairEvent> {
        std::mem::take(&mut self.state.events)
    }

    /// Deposit liquidity. Mints claim tokens for whatever was transferred
    /// into custody since the last reserve update.
    pub fn mint(&mut self, ctx: &mut PairCtx<'_>, to: Address) -> Result<U256> {
        self.guarded(ctx, |pair, ctx| pair.do_mint(ctx, to))
    }

    /// Withdraw liquidity. Burns the claim balance previously transferred
    /// to the pair itself and pays out both assets pro rata.
    pub fn burn(&mut self, ctx: &mut PairCtx<'_>, to: Address) -> Result<(U256, U256)> {
        self.guarded(ctx, |pair, ctx| pair.do_burn(ctx, to))
    }

    /// Exchange assets. Output amounts are transferred optimistically; the
    /// invariant check afterwards decides whether the operation stands.
    pub fn swap(
        &mut self,
        ctx: &mut PairCtx<'_>,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callee: Option<&mut dyn SwapCallee>,
        data: &[u8],
    ) -> Result<()> {
        self.guarded(ctx, |pair, ctx| {
            pair.do_swap(ctx, amount0_out, amount1_out, to, callee, data)
        })
    }

    /// Transfer any custody excess over the recorded reserves out to `to`.
    pub fn skim(&mut self, ctx: &mut PairCtx<'_>, to: Address) -> Result<()> {
        self.guarded(ctx, |pair, ctx| pair.do_skim(ctx, to))
    }

    /// Force reserves to match current custody balances.
    pub fn sync(&mut self, ctx: &mut PairCtx<'_>) -> Result<()> {
        self.guarded(ctx, |pair, ctx| {
            let balance0 = ctx.custody.balance_of(pair.token0, pair.address);
            let balance1 = ctx.custody.balance_of(pair.token1, pair.address);
            pair.update(ctx, balance0, balance1)
        })
    }

    /// Run `f` under the reentrancy lock with all-or-nothing semantics:
    /// on failure both pair state and custody are restored to the state at
    /// entry, and the lock is released on every exit path.
    fn guarded<'a, T, F>(&mut self, ctx: &mut PairCtx<'a>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut PairCtx<'a>) -> Result<T>,
    {
        if self.locked {
            return Err(PairError::Locked);
        }
        self.locked = true;
        let checkpoint = ctx.custody.checkpoint();
        let snapshot = self.state.clone();

        let result = f(self, ctx);
        match result {
            Ok(value) => {
                ctx.custody.commit(checkpoint);
                self.locked = false;
                Ok(value)
            }
            Err(err) => {
                ctx.custody.revert(checkpoint);
                self.state = snapshot;
                self.locked = false;
                debug!(pair = ?self.address, %err, "operation reverted");
                Err(err)
            }
        }
    }

    fn do_mint(&mut self, ctx: &mut PairCtx<'_>, to: Address) -> Result<U256> {
        let Reserves { reserve0, reserve1, .. } = self.state.reserves;
        let balance0 = ctx.custody.balance_of(self.token0, self.address);
        let balance1 = ctx.custody.balance_of(self.token1, self.address);
        let amount0 = balance0
            .checked_sub(U256::from(reserve0))
            .ok_or(PairError::Overflow)?;
        let amount1 = balance1
            .checked_sub(U256::from(reserve1))
            .ok_or(PairError::Overflow)?;

        let fee_on = self.mint_fee(ctx.fee_to)?;
        // the protocol fee mint above may have changed total supply
        let total_supply = self.state.lp.total_supply();

        let liquidity = if total_supply.is_zero() {
            let root = isqrt(amount0.checked_mul(amount1).ok_or(PairError::Overflow)?);
            let locked = U256::from(MINIMUM_LIQUIDITY);
            if root <= locked {
                return Err(PairError::InsufficientLiquidityMinted);
            }
            self.mint_liquidity(Address::zero(), locked);
            root - locked
        } else {
            if reserve0 == 0 || reserve1 == 0 {
                return Err(PairError::InsufficientLiquidity);
            }
            cmp::min(
                amount0
                    .checked_mul(total_supply)
                    .ok_or(PairError::Overflow)?
                    / U256::from(reserve0),
                amount1
                    .checked_mul(total_supply)
                    .ok_or(PairError::Overflow)?
                    / U256::from(reserve1),
            )
        };
        if liquidity.is_zero() {
            return Err(PairError::InsufficientLiquidityMinted);
        }

        self.mint_liquidity(to, liquidity);
        self.update(ctx, balance0, balance1)?;
        if fee_on {
            self.state.k_last =
                U256::from(self.state.reserves.reserve0) * U256::from(self.state.reserves.reserve1);
        }
        self.state.events.push(PairEvent::Mint { sender: ctx.sender, amount0, amount1 });
        info!(pair = ?self.address, %amount0, %amount1, %liquidity, "mint");
        Ok(liquidity)
    }

    fn do_burn(&mut self, ctx: &mut PairCtx<'_>, to: Address) -> Result<(U256, U256)> {
        let Reserves { reserve0, reserve1, .. } = self.state.reserves;
        let liquidity = self.state.lp.balance_of(self.address);

        let fee_on = self.mint_fee(ctx.fee_to)?;
        let total_supply = self.state.lp.total_supply();
        if total_supply.is_zero() {
            return Err(PairError::InsufficientLiquidityBurned);
        }

        let amount0 = liquidity
            .checked_mul(U256::from(reserve0))
            .ok_or(PairError::Overflow)?
            / total_supply;
        let amount1 = liquidity
            .checked_mul(U256::from(reserve1))
            .ok_or(PairError::Overflow)?
            / total_supply;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(PairError::InsufficientLiquidityBurned);
        }

        self.burn_liquidity(self.address, liquidity)?;
        ctx.custody.transfer(self.token0, self.address, to, amount0)?;
        ctx.custody.transfer(self.token1, self.address, to, amount1)?;

        let balance0 = ctx.custody.balance_of(self.token0, self.address);
        let balance1 = ctx.custody.balance_of(self.token1, self.address);
        self.update(ctx, balance0, balance1)?;
        if fee_on {
            self.state.k_last =
                U256::from(self.state.reserves.reserve0) * U256::from(self.state.reserves.reserve1);
        }
        self.state.events.push(PairEvent::Burn { sender: ctx.sender, amount0, amount1, to });
        info!(pair = ?self.address, %amount0, %amount1, %liquidity, "burn");
        Ok((amount0, amount1))
    }

    fn do_swap(
        &mut self,
        ctx: &mut PairCtx<'_>,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callee: Option<&mut dyn SwapCallee>,
        data: &[u8],
    ) -> Result<()> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(PairError::InsufficientOutputAmount);
        }
        let Reserves { reserve0, reserve1, .. } = self.state.reserves;
        if amount0_out >= U256::from(reserve0) || amount1_out >= U256::from(reserve1) {
            return Err(PairError::InsufficientLiquidity);
        }
        if to == self.token0 || to == self.token1 {
            return Err(PairError::InvalidRecipient(to));
        }

        // optimistic transfer; the K comparison below decides whether it stands
        if !amount0_out.is_zero() {
            ctx.custody.transfer(self.token0, self.address, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            ctx.custody.transfer(self.token1, self.address, to, amount1_out)?;
        }
        if let Some(callee) = callee {
            let sender = ctx.sender;
            callee.swap_call(self, ctx, sender, amount0_out, amount1_out, data)?;
        }

        let balance0 = ctx.custody.balance_of(self.token0, self.address);
        let balance1 = ctx.custody.balance_of(self.token1, self.address);
        let amount0_in = net_input(balance0, reserve0, amount0_out);
        let amount1_in = net_input(balance1, reserve1, amount1_out);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(PairError::InsufficientInputAmount);
        }

        let bps = U256::from(BPS_DENOMINATOR);
        let fee = U256::from(SWAP_FEE_BPS);
        let adjusted0 = balance0
            .checked_mul(bps)
            .ok_or(PairError::Overflow)?
            .checked_sub(amount0_in.checked_mul(fee).ok_or(PairError::Overflow)?)
            .ok_or(PairError::Overflow)?;
        let adjusted1 = balance1
            .checked_mul(bps)
            .ok_or(PairError::Overflow)?
            .checked_sub(amount1_in.checked_mul(fee).ok_or(PairError::Overflow)?)
            .ok_or(PairError::Overflow)?;
        // exact 512-bit comparison, no rounding on the settlement path
        let lhs = adjusted0.full_mul(adjusted1);
        let rhs = (U256::from(reserve0) * U256::from(reserve1)).full_mul(bps * bps);
        if lhs < rhs {
            return Err(PairError::K);
        }

        self.update(ctx, balance0, balance1)?;
        self.state.events.push(PairEvent::Swap {
            sender: ctx.sender,
            amount0_in,
            amount1_in,
            amount0_out,
            amount1_out,
            to,
        });
        info!(
            pair = ?self.address,
            %amount0_in, %amount1_in, %amount0_out, %amount1_out,
            "swap"
        );
        Ok(())
    }

    fn do_skim(&mut self, ctx: &mut PairCtx<'_>, to: Address) -> Result<()> {
        let Reserves { reserve0, reserve1, .. } = self.state.reserves;
        let excess0 = ctx
            .custody
            .balance_of(self.token0, self.address)
            .saturating_sub(U256::from(reserve0));
        let excess1 = ctx
            .custody
            .balance_of(self.token1, self.address)
            .saturating_sub(U256::from(reserve1));
        if !excess0.is_zero() {
            ctx.custody.transfer(self.token0, self.address, to, excess0)?;
        }
        if !excess1.is_zero() {
            ctx.custody.transfer(self.token1, self.address, to, excess1)?;
        }
        Ok(())
    }

    /// Accrue the protocol's share of invariant growth since the last
    /// liquidity event. Returns whether fee collection is enabled.
    fn mint_fee(&mut self, fee_to: Option<Address>) -> Result<bool> {
        let Reserves { reserve0, reserve1, .. } = self.state.reserves;
        let k_last = self.state.k_last;
        match fee_to {
            Some(fee_to) => {
                if !k_last.is_zero() {
                    let root_k = isqrt(U256::from(reserve0) * U256::from(reserve1));
                    let root_k_last = isqrt(k_last);
                    if root_k > root_k_last {
                        let numerator = self
                            .state
                            .lp
                            .total_supply()
                            .checked_mul(root_k - root_k_last)
                            .ok_or(PairError::Overflow)?;
                        let denominator = root_k * U256::from(5u64) + root_k_last;
                        let liquidity = numerator / denominator;
                        if !liquidity.is_zero() {
                            self.mint_liquidity(fee_to, liquidity);
                            debug!(fee_to = ?fee_to, %liquidity, "protocol fee minted");
                        }
                    }
                }
                Ok(true)
            }
            None => {
                if !k_last.is_zero() {
                    self.state.k_last = U256::zero();
                }
                Ok(false)
            }
        }
    }

    /// Advance the price accumulators, then persist the new reserves and
    /// timestamp as one record.
    fn update(&mut self, ctx: &PairCtx<'_>, balance0: U256, balance1: U256) -> Result<()> {
        let max = U256::from(MAX_RESERVE);
        if balance0 > max || balance1 > max {
            return Err(PairError::Overflow);
        }
        let Reserves { reserve0, reserve1, block_timestamp_last } = self.state.reserves;
        let block_timestamp = ctx.clock.now_truncated();
        let elapsed = block_timestamp.wrapping_sub(block_timestamp_last);
        if elapsed > 0 && reserve0 != 0 && reserve1 != 0 {
            // accumulators wrap; consumers take differences mod 2^256
            let price0 = uq112::uqdiv(uq112::encode(reserve1), reserve0);
            let price1 = uq112::uqdiv(uq112::encode(reserve0), reserve1);
            let elapsed = U256::from(elapsed);
            self.state.price0_cumulative_last = self
                .state
                .price0_cumulative_last
                .overflowing_add(price0.overflowing_mul(elapsed).0)
                .0;
            self.state.price1_cumulative_last = self
                .state
                .price1_cumulative_last
                .overflowing_add(price1.overflowing_mul(elapsed).0)
                .0;
        }
        self.state.reserves = Reserves {
            reserve0: balance0.as_u128(),
            reserve1: balance1.as_u128(),
            block_timestamp_last: block_timestamp,
        };
        self.state.events.push(PairEvent::Sync {
            reserve0: self.state.reserves.reserve0,
            reserve1: self.state.reserves.reserve1,
        });
        Ok(())
    }

    fn mint_liquidity(&mut self, to: Address, value: U256) {
        self.state.lp.mint(to, value);
        self.state.events.push(PairEvent::Transfer { from: Address::zero(), to, value });
    }

    fn burn_liquidity(&mut self, from: Address, value: U256) -> Result<()> {
        self.state.lp.burn(from, value)?;
        self.state.events.push(PairEvent::Transfer { from, to: Address::zero(), value });
        Ok(())
    }
}

/// Net amount paid in for one side: what remains above the post-output
/// reserve level, zero if nothing was paid.
fn net_input(balance: U256, reserve: u128, amount_out: U256) -> U256 {
    let after_out = U256::from(reserve) - amount_out;
    balance.saturating_sub(after_out)
}
