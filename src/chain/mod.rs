//! Chain module - the query interface the rest of the crate talks to
//!
//! This module provides:
//! - The `ChainQuery` trait consumed by the assembler, sender and token helpers
//! - An ethers HTTP implementation with per-request timeouts

pub mod provider;

pub use provider::ChainProvider;

use crate::error::WalletResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Fields of the latest block header the assembler cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlock {
    pub number: u64,
    /// Present only on chains running the EIP-1559 fee market
    pub base_fee_per_gas: Option<U256>,
}

/// Draft call handed to `eth_estimateGas`; carries no nonce or chain id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimateRequest {
    pub from: Address,
    pub to: Address,
    pub gas: U256,
    pub value: U256,
    pub data: Option<Bytes>,
}

/// Read and broadcast operations against a single JSON-RPC endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn get_latest_block(&self) -> WalletResult<LatestBlock>;

    /// Deployed bytecode; empty for externally owned accounts
    async fn get_code(&self, address: Address) -> WalletResult<Bytes>;

    async fn get_transaction_count(&self, address: Address) -> WalletResult<U256>;

    /// Current gas price, `None` when the node declines to quote one
    async fn get_gas_price(&self) -> WalletResult<Option<U256>>;

    async fn estimate_gas(&self, request: &GasEstimateRequest) -> WalletResult<U256>;

    async fn get_network_id(&self) -> WalletResult<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<H256>;

    async fn get_balance(&self, address: Address) -> WalletResult<U256>;

    /// Read-only contract call against the latest block
    async fn call(&self, to: Address, data: Bytes) -> WalletResult<Bytes>;
}
