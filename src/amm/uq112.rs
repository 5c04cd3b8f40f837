//! UQ112.112 定点数
//!
//! 112位小数位足以无损表示两个112位储备量的比值。

use ethers::types::U256;

/// 小数位数
pub const RESOLUTION: u32 = 112;

/// 编码为 UQ112.112: y * 2^112
pub fn encode(y: u128) -> U256 {
    U256::from(y) << RESOLUTION
}

/// UQ112.112 除以普通整数，结果仍为 UQ112.112
///
/// 调用方保证除数非零。
pub fn uqdiv(x: U256, y: u128) -> U256 {
    x / U256::from(y)
}
