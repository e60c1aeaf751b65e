//! Account generation and signing keys

use crate::error::{WalletError, WalletResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use rand::thread_rng;

/// An address and the local key that signs for it
#[derive(Debug, Clone)]
pub struct Account {
    signer: LocalWallet,
}

impl Account {
    /// Generate a fresh random account
    pub fn generate() -> Self {
        Self {
            signer: LocalWallet::new(&mut thread_rng()),
        }
    }

    /// Load an account from a hex private key, with or without 0x
    pub fn from_private_key(key: &str) -> WalletResult<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = key
            .parse::<LocalWallet>()
            .map_err(|e| WalletError::Wallet(format!("Invalid private key: {}", e)))?;
        Ok(Self { signer })
    }

    /// Load an account from the named environment variable
    pub fn from_env(var: &str) -> WalletResult<Self> {
        let key = std::env::var(var).map_err(|_| {
            WalletError::Wallet(format!("No signing key configured. Set {}", var))
        })?;
        Self::from_private_key(&key)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }

    /// Hex private key, for showing a freshly generated account to its owner
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signer.signer().to_bytes()))
    }
}
