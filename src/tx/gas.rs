//! Fee quoting for legacy and EIP-1559 chains

use crate::error::{WalletError, WalletResult};
use crate::units::{gwei_to_wei, GWEI};

use ethers::types::U256;
use serde::Serialize;
use tracing::debug;

/// Fee market a chain operates under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    Legacy,
    Eip1559,
}

impl FeeMode {
    /// EIP-1559 when the latest block carries a base fee
    pub fn from_base_fee(base_fee: Option<U256>) -> Self {
        if base_fee.is_some() {
            FeeMode::Eip1559
        } else {
            FeeMode::Legacy
        }
    }
}

/// Fee fields of a transaction; exactly one form per draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeeQuote {
    Legacy {
        #[serde(rename = "gasPrice")]
        gas_price: U256,
    },
    Eip1559 {
        #[serde(rename = "maxFeePerGas")]
        max_fee_per_gas: U256,
        #[serde(rename = "maxPriorityFeePerGas")]
        max_priority_fee_per_gas: U256,
    },
}

impl FeeQuote {
    /// Per-gas price used for the advisory cost estimate
    pub fn price_ceiling(&self) -> U256 {
        match self {
            FeeQuote::Legacy { gas_price } => *gas_price,
            FeeQuote::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// Turns queried chain prices into capped fee quotes
#[derive(Debug, Clone, Copy)]
pub struct FeeEstimator {
    /// Ceiling for the legacy price and the priority tip, in wei
    max_gas_price: U256,
}

impl FeeEstimator {
    /// Create a new fee estimator from the configured gwei ceiling
    pub fn new(max_gas_price_gwei: u64) -> Self {
        Self {
            max_gas_price: gwei_to_wei(max_gas_price_gwei),
        }
    }

    pub fn max_gas_price(&self) -> U256 {
        self.max_gas_price
    }

    /// Legacy price: the queried price, never above the ceiling
    pub fn legacy(&self, queried: U256) -> FeeQuote {
        let gas_price = queried.min(self.max_gas_price);
        debug!("Legacy gas price {} (queried {})", gas_price, queried);
        FeeQuote::Legacy { gas_price }
    }

    /// EIP-1559 fees from the queried price and the latest base fee
    ///
    /// The queried price already embeds a tip, so the tip is what remains after
    /// the base fee, floored at 1 gwei and capped at the ceiling. The max fee
    /// doubles the base fee to stay valid while the base fee rises.
    pub fn eip1559(&self, queried: U256, base_fee: U256) -> WalletResult<FeeQuote> {
        let tip = queried
            .saturating_sub(base_fee)
            .max(U256::from(GWEI))
            .min(self.max_gas_price);

        let max_fee_per_gas = base_fee
            .checked_mul(U256::from(2))
            .and_then(|doubled| doubled.checked_add(tip))
            .ok_or_else(|| {
                WalletError::Validation(format!(
                    "max fee overflows for base fee {} and tip {}",
                    base_fee, tip
                ))
            })?;

        debug!(
            "EIP-1559 fees: base {} tip {} max {} (queried {})",
            base_fee, tip, max_fee_per_gas, queried
        );

        Ok(FeeQuote::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas: tip,
        })
    }

    /// Flat quote at the ceiling for when the node cannot quote a price
    pub fn fallback(&self, mode: FeeMode) -> FeeQuote {
        match mode {
            FeeMode::Legacy => FeeQuote::Legacy {
                gas_price: self.max_gas_price,
            },
            FeeMode::Eip1559 => FeeQuote::Eip1559 {
                max_fee_per_gas: self.max_gas_price,
                max_priority_fee_per_gas: U256::from(GWEI).min(self.max_gas_price),
            },
        }
    }

    /// Calculate the worst-case total cost in wei
    pub fn calculate_cost(gas_limit: U256, fee: &FeeQuote) -> WalletResult<U256> {
        let price = fee.price_ceiling();
        gas_limit.checked_mul(price).ok_or_else(|| {
            WalletError::Validation(format!(
                "cost overflows for gas {} at price {}",
                gas_limit, price
            ))
        })
    }
}
