//! Signing and broadcast of assembled drafts

use super::draft::TransactionDraft;
use crate::account::Account;
use crate::chain::ChainQuery;
use crate::error::{WalletError, WalletResult};

use ethers::signers::Signer;
use ethers::types::{Bytes, H256};
use tracing::{debug, error, info};

/// Signs drafts with a local key and hands them to the node
pub struct TransactionSender<'a, Q> {
    /// Chain query interface used for broadcast
    chain: &'a Q,
    /// Signing account
    account: &'a Account,
}

impl<'a, Q: ChainQuery> TransactionSender<'a, Q> {
    pub fn new(chain: &'a Q, account: &'a Account) -> Self {
        Self { chain, account }
    }

    /// Sign a draft, returning the RLP-encoded raw transaction
    pub async fn sign(&self, draft: &TransactionDraft) -> WalletResult<Bytes> {
        debug!(
            "Signing nonce {} to {:?}: {} wei, {} bytes of calldata, gas {}, {:?}",
            draft.nonce(),
            draft.to(),
            draft.value(),
            draft.data().map_or(0, |data| data.len()),
            draft.gas(),
            draft.fee()
        );

        let tx = draft.to_typed();
        let wallet = self.account.signer().clone().with_chain_id(draft.chain_id());

        let signature = wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| WalletError::Wallet(format!("Failed to sign transaction: {}", e)))?;

        Ok(tx.rlp_signed(&signature))
    }

    /// Sign and broadcast once; failures are returned, never retried
    pub async fn submit(&self, draft: &TransactionDraft) -> WalletResult<H256> {
        let raw = self.sign(draft).await?;

        match self.chain.send_raw_transaction(raw).await {
            Ok(tx_hash) => {
                info!(
                    "Transaction sent: {:?} from {:?} to {:?} (nonce {})",
                    tx_hash,
                    self.account.address(),
                    draft.to(),
                    draft.nonce()
                );
                Ok(tx_hash)
            }
            Err(e) => {
                error!("Broadcast failed for nonce {}: {}", draft.nonce(), e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainQuery;
    use crate::tx::gas::FeeQuote;
    use ethers::types::transaction::eip2718::TypedTransaction;
    use ethers::types::{Address, U256};
    use ethers::utils::rlp::Rlp;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn draft(fee: FeeQuote) -> TransactionDraft {
        TransactionDraft::new(
            U256::from(9u64),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse::<Address>().unwrap(),
            U256::from(21_000u64),
            U256::from(1_000_000u64),
            31337,
            Bytes::new(),
            fee,
        )
    }

    #[tokio::test]
    async fn signed_eip1559_tx_recovers_to_signer() {
        let account = Account::from_private_key(DEV_KEY).unwrap();
        let chain = MockChainQuery::new();
        let sender = TransactionSender::new(&chain, &account);

        let raw = sender
            .sign(&draft(FeeQuote::Eip1559 {
                max_fee_per_gas: U256::from(3_000_000_000u64),
                max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            }))
            .await
            .unwrap();

        assert_eq!(raw[0], 0x02);

        let (decoded, signature) = TypedTransaction::decode_signed(&Rlp::new(&raw)).unwrap();
        assert_eq!(decoded.nonce().copied(), Some(U256::from(9u64)));
        assert_eq!(signature.recover(decoded.sighash()).unwrap(), account.address());
    }

    #[tokio::test]
    async fn submit_broadcasts_signed_legacy_tx() {
        let account = Account::from_private_key(DEV_KEY).unwrap();
        let legacy = draft(FeeQuote::Legacy {
            gas_price: U256::from(1_000_000_000u64),
        });

        let mut chain = MockChainQuery::new();
        chain
            .expect_send_raw_transaction()
            .withf(|raw| raw[0] >= 0xc0)
            .times(1)
            .returning(|_| Ok(H256::repeat_byte(0xab)));

        let sender = TransactionSender::new(&chain, &account);
        let tx_hash = sender.submit(&legacy).await.unwrap();

        assert_eq!(tx_hash, H256::repeat_byte(0xab));
    }

    #[tokio::test]
    async fn broadcast_error_is_returned() {
        let account = Account::from_private_key(DEV_KEY).unwrap();
        let mut chain = MockChainQuery::new();
        chain.expect_send_raw_transaction().returning(|_| {
            Err(WalletError::transport(
                "eth_sendRawTransaction",
                std::io::Error::new(std::io::ErrorKind::Other, "nonce too low"),
            ))
        });

        let sender = TransactionSender::new(&chain, &account);
        let err = sender
            .submit(&draft(FeeQuote::Legacy {
                gas_price: U256::one(),
            }))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("nonce too low"));
    }
}
