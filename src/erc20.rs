//! ERC-20 balance queries and transfer payloads

use crate::chain::ChainQuery;
use crate::error::{WalletError, WalletResult};
use crate::units::TokenAmount;

use ethers::abi::{parse_abi, Abi, Function, Token};
use ethers::types::{Address, Bytes, U256};
use lazy_static::lazy_static;
use tracing::{debug, warn};

lazy_static! {
    static ref ERC20_ABI: Abi = parse_abi(&[
        "function balanceOf(address owner) view returns (uint256)",
        "function decimals() view returns (uint8)",
        "function symbol() view returns (string)",
        "function transfer(address to, uint256 amount) returns (bool)",
    ])
    .expect("valid ERC-20 ABI");
}

fn function(name: &str) -> WalletResult<&'static Function> {
    ERC20_ABI
        .function(name)
        .map_err(|e| WalletError::Abi(format!("{}: {}", name, e)))
}

/// Encode `transfer(to, amount)` calldata
pub fn transfer_calldata(to: Address, amount: U256) -> WalletResult<Bytes> {
    let data = function("transfer")?
        .encode_input(&[Token::Address(to), Token::Uint(amount)])
        .map_err(|e| WalletError::Abi(format!("transfer: {}", e)))?;
    Ok(data.into())
}

/// Read-only view of a token contract
pub struct Erc20Token<'a, Q> {
    chain: &'a Q,
    address: Address,
}

impl<'a, Q: ChainQuery> Erc20Token<'a, Q> {
    pub fn new(chain: &'a Q, address: Address) -> Self {
        Self { chain, address }
    }

    /// Call a view function and decode its single return value
    async fn view(&self, name: &str, args: &[Token]) -> WalletResult<Token> {
        let func = function(name)?;
        let data = func
            .encode_input(args)
            .map_err(|e| WalletError::Abi(format!("{}: {}", name, e)))?;

        let output = self.chain.call(self.address, data.into()).await?;
        if output.is_empty() {
            return Err(WalletError::NoResult {
                operation: format!("{}() on {:?}", name, self.address),
            });
        }

        func.decode_output(&output)
            .map_err(|e| WalletError::Abi(format!("{} output: {}", name, e)))?
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::Abi(format!("{} returned no values", name)))
    }

    /// Token decimals
    pub async fn decimals(&self) -> WalletResult<u32> {
        match self.view("decimals", &[]).await? {
            Token::Uint(decimals) if decimals <= U256::from(u8::MAX) => Ok(decimals.as_u32()),
            other => Err(WalletError::Abi(format!("unexpected decimals: {:?}", other))),
        }
    }

    /// Token symbol
    pub async fn symbol(&self) -> WalletResult<String> {
        match self.view("symbol", &[]).await? {
            Token::String(symbol) => Ok(symbol),
            other => Err(WalletError::Abi(format!("unexpected symbol: {:?}", other))),
        }
    }

    /// Token symbol for display; a failed lookup is logged and shown as "tokens"
    pub async fn display_symbol(&self) -> String {
        match self.symbol().await {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!("Could not read symbol of token {:?}: {}", self.address, e);
                "tokens".to_string()
            }
        }
    }

    /// Balance of `owner`, scaled by the token's decimals
    pub async fn balance_of(&self, owner: Address) -> WalletResult<TokenAmount> {
        let balance = match self.view("balanceOf", &[Token::Address(owner)]).await? {
            Token::Uint(balance) => balance,
            other => return Err(WalletError::Abi(format!("unexpected balance: {:?}", other))),
        };
        let decimals = self.decimals().await?;

        debug!(
            "Token {:?} balance of {:?}: {} ({} decimals)",
            self.address, owner, balance, decimals
        );
        Ok(TokenAmount::new(balance, decimals))
    }
}
