//! Token amounts denominated in their smallest unit

use crate::error::{WalletError, WalletResult};

use ethers::types::U256;
use ethers::utils::{format_units, parse_units};
use std::fmt;

/// Decimals of the native coin (1 ether = 10^18 wei)
pub const NATIVE_DECIMALS: u32 = 18;

/// One gwei in wei
pub const GWEI: u64 = 1_000_000_000;

/// An integer amount in the smallest unit, paired with the token's decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    wei: U256,
    decimals: u32,
}

impl TokenAmount {
    pub fn new(wei: U256, decimals: u32) -> Self {
        Self { wei, decimals }
    }

    /// Native-coin amount
    pub fn native(wei: U256) -> Self {
        Self::new(wei, NATIVE_DECIMALS)
    }

    /// Parse a human amount such as "1.5" into smallest units
    pub fn parse(human: &str, decimals: u32) -> WalletResult<Self> {
        let human = human.trim();
        if human.starts_with('-') {
            return Err(WalletError::Validation(format!(
                "amount must not be negative: {}",
                human
            )));
        }

        let wei: U256 = parse_units(human, decimals)
            .map_err(|e| WalletError::Validation(format!("invalid amount {:?}: {}", human, e)))?
            .into();

        Ok(Self::new(wei, decimals))
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }

    /// Exact amount in smallest units as a decimal string
    pub fn to_decimal_string(&self) -> String {
        self.wei.to_string()
    }

    /// Amount in whole units, e.g. "1.500000000000000000"
    pub fn format(&self) -> WalletResult<String> {
        format_units(self.wei, self.decimals)
            .map_err(|e| WalletError::Validation(format!("cannot format amount: {}", e)))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format() {
            Ok(units) => write!(f, "{} ({} base units)", units, self.wei),
            Err(_) => write!(f, "{} base units", self.wei),
        }
    }
}

/// Convert a gwei ceiling into wei
pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(GWEI)
}
