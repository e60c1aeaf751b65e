//! Unsigned transaction descriptor handed to the signer

use super::gas::{FeeEstimator, FeeQuote};
use crate::error::WalletResult;
use crate::units::TokenAmount;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, U256};
use serde::Serialize;

/// Fully parameterized transaction, minus the sender
///
/// Serializes with hex quantities (`"0x0"` for zero), an integer `chainId`,
/// `data: null` for plain transfers, and exactly one set of fee fields. The
/// sender is left out; the signer derives it from the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    nonce: U256,
    to: Address,
    gas: U256,
    value: U256,
    chain_id: u64,
    data: Option<Bytes>,
    #[serde(flatten)]
    fee: FeeQuote,
}

impl TransactionDraft {
    pub fn new(
        nonce: U256,
        to: Address,
        gas: U256,
        value: U256,
        chain_id: u64,
        data: Bytes,
        fee: FeeQuote,
    ) -> Self {
        Self {
            nonce,
            to,
            gas,
            value,
            chain_id,
            data: if data.is_empty() { None } else { Some(data) },
            fee,
        }
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn gas(&self) -> U256 {
        self.gas
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn fee(&self) -> &FeeQuote {
        &self.fee
    }

    /// Worst-case cost in wei: gas × (gasPrice or maxFeePerGas)
    ///
    /// Advisory only. The amount charged depends on gas used and the
    /// effective price at inclusion.
    pub fn estimate_cost(&self) -> WalletResult<TokenAmount> {
        FeeEstimator::calculate_cost(self.gas, &self.fee).map(TokenAmount::native)
    }

    /// Build the ethers transaction the signer consumes
    pub fn to_typed(&self) -> TypedTransaction {
        let data = self.data.clone().unwrap_or_default();

        match self.fee {
            FeeQuote::Legacy { gas_price } => TypedTransaction::Legacy(
                TransactionRequest::new()
                    .to(self.to)
                    .data(data)
                    .nonce(self.nonce)
                    .gas(self.gas)
                    .value(self.value)
                    .gas_price(gas_price)
                    .chain_id(self.chain_id),
            ),
            FeeQuote::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => TypedTransaction::Eip1559(
                Eip1559TransactionRequest::new()
                    .to(self.to)
                    .data(data)
                    .nonce(self.nonce)
                    .gas(self.gas)
                    .value(self.value)
                    .max_fee_per_gas(max_fee_per_gas)
                    .max_priority_fee_per_gas(max_priority_fee_per_gas)
                    .chain_id(self.chain_id),
            ),
        }
    }
}
