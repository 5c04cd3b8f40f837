//! 恒定乘积AMM计算
//!
//! 实现精确的恒定乘积公式计算，供调用方预估交换数量。
//! 链上检查以池子的不变量比较为准，这里的舍入只影响预估值。

pub mod uq112;

use ethers::types::U256;

use crate::types::{PairError, Result};

/// 交易手续费(基点, 30 = 0.3%)
pub const SWAP_FEE_BPS: u16 = 30;

/// 基点分母
pub const BPS_DENOMINATOR: u16 = 10000;

/// 按当前储备比例报价: amount_b = amount_a * reserve_b / reserve_a
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256> {
    if amount_a.is_zero() {
        return Err(PairError::InsufficientInputAmount);
    }
    if reserve_a.is_zero() || reserve_b.is_zero() {
        return Err(PairError::InsufficientLiquidity);
    }
    let amount_b = amount_a
        .checked_mul(reserve_b)
        .ok_or(PairError::Overflow)?
        / reserve_a;
    Ok(amount_b)
}

/// 计算给定输入数量的输出数量
/// 使用公式: amount_out = (amount_in * fee_factor * reserve_out) / (reserve_in * 10000 + amount_in * fee_factor)
/// 其中 fee_factor = 10000 - SWAP_FEE_BPS
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
    // 输入验证
    if amount_in.is_zero() {
        return Err(PairError::InsufficientInputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(PairError::InsufficientLiquidity);
    }

    let fee_factor = U256::from(BPS_DENOMINATOR - SWAP_FEE_BPS);

    // 防止溢出的计算
    let amount_in_with_fee = amount_in
        .checked_mul(fee_factor)
        .ok_or(PairError::Overflow)?;

    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(PairError::Overflow)?;

    let denominator = reserve_in
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or(PairError::Overflow)?
        .checked_add(amount_in_with_fee)
        .ok_or(PairError::Overflow)?;

    Ok(numerator / denominator)
}

/// 计算达到指定输出数量所需的输入数量
/// 使用公式: amount_in = (reserve_in * amount_out * 10000) / ((reserve_out - amount_out) * fee_factor) + 1
pub fn get_amount_in(amount_out: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
    // 输入验证
    if amount_out.is_zero() {
        return Err(PairError::InsufficientOutputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
        return Err(PairError::InsufficientLiquidity);
    }

    let fee_factor = U256::from(BPS_DENOMINATOR - SWAP_FEE_BPS);

    // 计算分子: reserve_in * amount_out * 10000
    let numerator = reserve_in
        .checked_mul(amount_out)
        .ok_or(PairError::Overflow)?
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .ok_or(PairError::Overflow)?;

    // 计算分母: (reserve_out - amount_out) * fee_factor
    let denominator = (reserve_out - amount_out)
        .checked_mul(fee_factor)
        .ok_or(PairError::Overflow)?;

    // 为了确保精度，向上舍入（加1）
    Ok(numerator / denominator + U256::one())
}
