//! Transaction assembly: gas limit, fees, nonce and chain id for a transfer or call
//!
//! Chain id and fee mode are detected once when the assembler is built and
//! kept for its lifetime. An assembler that outlives a hard fork keeps the
//! old fee mode; build a new one instead.

use super::draft::TransactionDraft;
use super::gas::{FeeEstimator, FeeMode, FeeQuote};
use crate::chain::{ChainQuery, GasEstimateRequest};
use crate::config::{GasConfig, TRANSFER_GAS};
use crate::error::{WalletError, WalletResult};

use dashmap::DashMap;
use ethers::types::{Address, Bytes, U256};
use tracing::{debug, info, warn};

/// Builds unsigned transaction drafts against one chain
pub struct TransactionAssembler<Q> {
    /// Chain query interface
    chain: Q,
    /// Gas ceilings
    gas: GasConfig,
    /// Fee quoting
    fees: FeeEstimator,
    /// Chain id detected at construction
    chain_id: u64,
    /// Fee market detected at construction
    fee_mode: FeeMode,
    /// Whether an address has deployed code. Never invalidated, so an address
    /// redeployed with different code keeps its first answer.
    code_cache: DashMap<Address, bool>,
}

impl<Q: ChainQuery> TransactionAssembler<Q> {
    /// Create a new assembler, detecting fee mode and chain id up front
    pub async fn new(chain: Q, gas: GasConfig) -> WalletResult<Self> {
        let block = chain.get_latest_block().await?;
        let fee_mode = FeeMode::from_base_fee(block.base_fee_per_gas);
        let chain_id = chain.get_network_id().await?;

        info!(
            "Connected to chain {} at block {} ({:?} fees)",
            chain_id, block.number, fee_mode
        );

        Ok(Self {
            chain,
            fees: FeeEstimator::new(gas.max_gas_price_gwei),
            gas,
            chain_id,
            fee_mode,
            code_cache: DashMap::new(),
        })
    }

    /// Get the chain query interface
    pub fn chain(&self) -> &Q {
        &self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn fee_mode(&self) -> FeeMode {
        self.fee_mode
    }

    /// Check whether an address has deployed bytecode
    pub async fn has_code(&self, address: Address) -> WalletResult<bool> {
        if let Some(cached) = self.code_cache.get(&address) {
            return Ok(*cached);
        }

        let code = self.chain.get_code(address).await?;
        let has_code = !code.is_empty();
        self.code_cache.insert(address, has_code);

        debug!("Address {:?} has code: {}", address, has_code);
        Ok(has_code)
    }

    /// Select the gas limit for a transfer or call
    ///
    /// Plain accounts get the intrinsic transfer cost. Contract calls are
    /// estimated with the configured default as the upper bound; an estimate
    /// landing exactly on that bound means the bound is too low to trust.
    pub async fn gas_limit(
        &self,
        from: Address,
        to: Address,
        data: &Bytes,
        value: U256,
    ) -> WalletResult<U256> {
        if !self.has_code(to).await? {
            return Ok(U256::from(TRANSFER_GAS));
        }

        let ceiling = U256::from(self.gas.default_limit);
        let request = GasEstimateRequest {
            from,
            to,
            gas: ceiling,
            value,
            data: if data.is_empty() {
                None
            } else {
                Some(data.clone())
            },
        };

        let estimate = self.chain.estimate_gas(&request).await?;
        if estimate == ceiling {
            return Err(WalletError::Config(format!(
                "gas estimate for {:?} hit the configured limit of {}; raise gas.default_limit",
                to, ceiling
            )));
        }

        debug!("Estimated {} gas for call to {:?}", estimate, to);
        Ok(estimate)
    }

    /// Quote fees for the next transaction; never cached across calls
    pub async fn fee_quote(&self) -> WalletResult<FeeQuote> {
        let Some(queried) = self.chain.get_gas_price().await? else {
            warn!(
                "Gas price unavailable, falling back to the {} wei ceiling",
                self.fees.max_gas_price()
            );
            return Ok(self.fees.fallback(self.fee_mode));
        };

        match self.fee_mode {
            FeeMode::Legacy => Ok(self.fees.legacy(queried)),
            FeeMode::Eip1559 => {
                let block = self.chain.get_latest_block().await?;
                let base_fee = block.base_fee_per_gas.ok_or_else(|| WalletError::NoResult {
                    operation: "baseFeePerGas of latest block".to_string(),
                })?;
                self.fees.eip1559(queried, base_fee)
            }
        }
    }

    /// Assemble an unsigned transaction from `from` to `to`
    ///
    /// Empty `data` makes a plain transfer. The nonce is read fresh from the
    /// chain with no reservation, so concurrent drafts for one sender collide.
    pub async fn make_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
        value: U256,
    ) -> WalletResult<TransactionDraft> {
        let gas = self.gas_limit(from, to, &data, value).await?;
        let fee = self.fee_quote().await?;
        let nonce = self.chain.get_transaction_count(from).await?;

        let draft = TransactionDraft::new(nonce, to, gas, value, self.chain_id, data, fee);

        info!(
            "Assembled tx to {:?}: nonce {} gas {} value {} on chain {}",
            to, nonce, gas, value, self.chain_id
        );
        Ok(draft)
    }
}
