//! 数值计算工具

use ethers::types::U256;

/// 整数平方根（巴比伦法）
///
/// 对任意非负整数返回精确的 floor(sqrt(value))。
pub fn isqrt(value: U256) -> U256 {
    if value <= U256::one() {
        return value;
    }
    let mut x0 = value >> 1;
    let mut x1 = (x0 + value / x0) >> 1;
    while x1 < x0 {
        x0 = x1;
        x1 = (x0 + value / x0) >> 1;
    }
    x0
}
