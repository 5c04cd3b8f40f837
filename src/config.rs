//! 协议配置

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::amm::SWAP_FEE_BPS;

/// 协议级配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// 协议费接收地址，None 表示关闭协议费
    #[serde(default)]
    pub fee_to: Option<Address>,
    /// 交易手续费(基点)
    pub swap_fee_bps: u16,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            fee_to: None,
            swap_fee_bps: SWAP_FEE_BPS,
        }
    }
}

impl ProtocolConfig {
    /// 开启协议费
    pub fn with_fee_to(mut self, fee_to: Address) -> Self {
        self.fee_to = Some(fee_to);
        self
    }

    /// 从环境变量加载配置 (前缀 AMM_, 如 AMM_FEE_TO, AMM_SWAP_FEE_BPS)
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("swap_fee_bps", SWAP_FEE_BPS as i64)?
            .add_source(config::Environment::with_prefix("AMM").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
