//! ethwrap - operator scripts for Ethereum accounts, balances and transfers
//!
//! Generates accounts, reads native and ERC-20 balances, and assembles
//! fee-capped transactions that are only signed and broadcast on request.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethers::types::{Address, Bytes, U256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

mod account;
mod chain;
mod config;
mod erc20;
mod error;
mod tx;
mod units;

use account::Account;
use chain::{ChainProvider, ChainQuery};
use config::Settings;
use erc20::Erc20Token;
use error::WalletError;
use tx::{TransactionAssembler, TransactionDraft, TransactionSender};
use units::{TokenAmount, NATIVE_DECIMALS};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long = "config", short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new account and print its address and private key
    NewAccount,
    /// Show the native-coin balance of an address
    Balance {
        /// Account address
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Show the ERC-20 token balance of an address
    TokenBalance {
        /// Token contract address
        #[arg(long = "token", short = 't', value_parser = parse_address)]
        token: Address,

        /// Account address
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Send native coin from the configured account
    Send {
        /// Recipient address
        #[arg(long = "to", value_parser = parse_address)]
        to: Address,

        /// Amount in ether, e.g. 0.25
        #[arg(long = "amount", short = 'a')]
        amount: String,

        /// Sign and broadcast instead of printing the draft only
        #[arg(long = "broadcast")]
        broadcast: bool,
    },
    /// Send ERC-20 tokens from the configured account
    SendToken {
        /// Token contract address
        #[arg(long = "token", short = 't', value_parser = parse_address)]
        token: Address,

        /// Recipient address
        #[arg(long = "to", value_parser = parse_address)]
        to: Address,

        /// Amount in whole token units, scaled by the token's decimals
        #[arg(long = "amount", short = 'a')]
        amount: String,

        /// Sign and broadcast instead of printing the draft only
        #[arg(long = "broadcast")]
        broadcast: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if is_retryable(&e) {
                warn!("The node request failed; the command can be rerun once the endpoint responds");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::NewAccount => {
            let account = Account::generate();
            println!("address:     {:?}", account.address());
            println!("private key: {}", account.private_key_hex());
        }
        Commands::Balance { address } => {
            let (_, provider) = connect(config)?;
            let wei = provider.get_balance(address).await?;
            println!("{}", TokenAmount::native(wei));
        }
        Commands::TokenBalance { token, address } => {
            let (_, provider) = connect(config)?;
            let erc20 = Erc20Token::new(&provider, token);
            let balance = erc20.balance_of(address).await?;
            let symbol = erc20.display_symbol().await;
            println!(
                "{} {} ({} base units)",
                balance.format()?,
                symbol,
                balance.to_decimal_string()
            );
        }
        Commands::Send {
            to,
            amount,
            broadcast,
        } => {
            let (settings, provider) = connect(config)?;
            let account = Account::from_env(&settings.wallet.private_key_env)?;
            let value = TokenAmount::parse(&amount, NATIVE_DECIMALS)?;

            let assembler = TransactionAssembler::new(provider, settings.gas.clone()).await?;
            let draft = assembler
                .make_transaction(account.address(), to, Bytes::new(), value.wei())
                .await?;

            finish(&assembler, &account, &draft, broadcast).await?;
        }
        Commands::SendToken {
            token,
            to,
            amount,
            broadcast,
        } => {
            let (settings, provider) = connect(config)?;
            let account = Account::from_env(&settings.wallet.private_key_env)?;
            let decimals = Erc20Token::new(&provider, token).decimals().await?;
            let value = TokenAmount::parse(&amount, decimals)?;
            let data = erc20::transfer_calldata(to, value.wei())?;

            let assembler = TransactionAssembler::new(provider, settings.gas.clone()).await?;
            let draft = assembler
                .make_transaction(account.address(), token, data, U256::zero())
                .await?;

            finish(&assembler, &account, &draft, broadcast).await?;
        }
    }

    Ok(())
}

/// Whether the failure came from a node request that may succeed on rerun
fn is_retryable(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|cause| cause.downcast_ref::<WalletError>())
        .any(WalletError::is_retryable)
}

/// Load settings and create the provider they point at
fn connect(config: Option<&Path>) -> Result<(Settings, ChainProvider)> {
    let settings = Settings::load(config)?;
    let provider = ChainProvider::new(&settings.network)?;
    Ok((settings, provider))
}

/// Accept checksummed, lowercase or unprefixed hex addresses
fn parse_address(input: &str) -> Result<Address, String> {
    input
        .trim()
        .parse::<Address>()
        .map_err(|e| format!("invalid address {:?}: {}", input, e))
}

/// Print the draft and its cost, then sign and broadcast if asked to
async fn finish<Q: ChainQuery>(
    assembler: &TransactionAssembler<Q>,
    account: &Account,
    draft: &TransactionDraft,
    broadcast: bool,
) -> Result<()> {
    let draft_json =
        serde_json::to_string_pretty(draft).context("Failed to serialize transaction draft")?;
    println!(
        "chain {} ({:?} fees)",
        assembler.chain_id(),
        assembler.fee_mode()
    );
    println!("{}", draft_json);
    println!("max cost: {}", draft.estimate_cost()?);

    if !broadcast {
        info!("Dry run; pass --broadcast to sign and send");
        return Ok(());
    }

    let sender = TransactionSender::new(assembler.chain(), account);
    let tx_hash = sender.submit(draft).await?;
    println!("tx hash: {:?}", tx_hash);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,ethwrap=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_failures_get_retry_hint() {
        let timeout = anyhow::Error::new(WalletError::Timeout {
            operation: "eth_gasPrice".to_string(),
            secs: 30,
        })
        .context("Failed to assemble transaction");
        assert!(is_retryable(&timeout));

        let config = anyhow::Error::new(WalletError::Config("bad rpc_url".to_string()));
        assert!(!is_retryable(&config));
    }

    #[test]
    fn parses_unprefixed_address() {
        let address = parse_address(" 70997970c51812dc3a010c7d01b50e0d17dc79c8 ").unwrap();
        assert_eq!(
            address,
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse::<Address>().unwrap()
        );
        assert!(parse_address("0x1234").is_err());
    }
}
