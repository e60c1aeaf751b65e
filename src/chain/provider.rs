//! Chain provider backed by an ethers HTTP client

use super::{ChainQuery, GasEstimateRequest, LatestBlock};
use crate::config::NetworkConfig;
use crate::error::{WalletError, WalletResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, TransactionRequest, H256, U256};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// JSON-RPC endpoint wrapper; every request is bounded by the configured timeout
pub struct ChainProvider {
    /// Endpoint URL, kept for log context
    url: String,
    /// HTTP provider
    http: Provider<Http>,
    /// Per-request timeout
    timeout: Duration,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: &NetworkConfig) -> WalletResult<Self> {
        let http = Provider::<Http>::try_from(config.rpc_url.as_str()).map_err(|e| {
            WalletError::Config(format!("Invalid RPC endpoint {}: {}", config.rpc_url, e))
        })?;

        debug!("Created HTTP provider for {}", config.rpc_url);

        Ok(Self {
            url: config.rpc_url.clone(),
            http,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Await a request, mapping provider failures and timeouts to transport errors
    async fn request<T, F>(&self, operation: &str, fut: F) -> WalletResult<T>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        debug!("{} -> {}", operation, self.url);
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(WalletError::transport(operation, e)),
            Err(_) => Err(WalletError::Timeout {
                operation: operation.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl ChainQuery for ChainProvider {
    async fn get_latest_block(&self) -> WalletResult<LatestBlock> {
        let operation = "eth_getBlockByNumber(latest)";
        let block = self
            .request(operation, self.http.get_block(BlockNumber::Latest))
            .await?
            .ok_or_else(|| WalletError::NoResult {
                operation: operation.to_string(),
            })?;

        Ok(LatestBlock {
            number: block.number.map(|n| n.as_u64()).unwrap_or_default(),
            base_fee_per_gas: block.base_fee_per_gas,
        })
    }

    async fn get_code(&self, address: Address) -> WalletResult<Bytes> {
        self.request("eth_getCode", self.http.get_code(address, None))
            .await
    }

    async fn get_transaction_count(&self, address: Address) -> WalletResult<U256> {
        self.request(
            "eth_getTransactionCount",
            self.http.get_transaction_count(address, None),
        )
        .await
    }

    async fn get_gas_price(&self) -> WalletResult<Option<U256>> {
        let operation = "eth_gasPrice";
        match timeout(self.timeout, self.http.get_gas_price()).await {
            Ok(Ok(price)) => Ok(Some(price)),
            // The node answered, but with an error object instead of a quote
            Ok(Err(e)) if e.as_error_response().is_some() => {
                warn!("{} unavailable on {}: {}", operation, self.url, e);
                Ok(None)
            }
            Ok(Err(e)) => Err(WalletError::transport(operation, e)),
            Err(_) => Err(WalletError::Timeout {
                operation: operation.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn estimate_gas(&self, request: &GasEstimateRequest) -> WalletResult<U256> {
        let mut tx = TransactionRequest::new()
            .from(request.from)
            .to(request.to)
            .gas(request.gas)
            .value(request.value);
        if let Some(data) = &request.data {
            tx = tx.data(data.clone());
        }
        let tx = TypedTransaction::Legacy(tx);

        self.request("eth_estimateGas", self.http.estimate_gas(&tx, None))
            .await
    }

    async fn get_network_id(&self) -> WalletResult<u64> {
        let id = self
            .request("eth_chainId", self.http.get_chainid())
            .await?;
        if id > U256::from(u64::MAX) {
            return Err(WalletError::Validation(format!(
                "chain id {} does not fit in 64 bits",
                id
            )));
        }
        Ok(id.as_u64())
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> WalletResult<H256> {
        let pending = self
            .request(
                "eth_sendRawTransaction",
                self.http.send_raw_transaction(raw),
            )
            .await?;
        Ok(pending.tx_hash())
    }

    async fn get_balance(&self, address: Address) -> WalletResult<U256> {
        self.request("eth_getBalance", self.http.get_balance(address, None))
            .await
    }

    async fn call(&self, to: Address, data: Bytes) -> WalletResult<Bytes> {
        let tx = TypedTransaction::Legacy(TransactionRequest::new().to(to).data(data));
        self.request("eth_call", self.http.call(&tx, None)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn network(url: &str, timeout_secs: u64) -> NetworkConfig {
        NetworkConfig {
            rpc_url: url.to_string(),
            timeout_secs,
        }
    }

    /// Read one HTTP request, headers and body
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|len| len.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Local endpoint answering every request with the same JSON-RPC body
    async fn serve(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    /// Local endpoint that accepts requests and never answers
    async fn serve_stalled() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut stream, _)) = listener.accept().await {
                read_request(&mut stream).await;
                held.push(stream);
            }
        });

        format!("http://{}", addr)
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let err = ChainProvider::new(&network("not a url", 5)).err().unwrap();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Nothing listens on the discard port
        let provider = ChainProvider::new(&network("http://127.0.0.1:9", 2)).unwrap();
        let err = provider.get_network_id().await.unwrap_err();

        assert!(matches!(err, WalletError::Transport { .. }), "unexpected error: {err}");
        assert!(err.to_string().contains("eth_chainId"));
    }

    #[tokio::test]
    async fn gas_price_is_decoded() {
        let url = serve(r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#).await;
        let provider = ChainProvider::new(&network(&url, 5)).unwrap();

        let price = provider.get_gas_price().await.unwrap();
        assert_eq!(price, Some(U256::from(1_000_000_000u64)));
    }

    #[tokio::test]
    async fn gas_price_error_object_means_unavailable() {
        let url = serve(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"the method eth_gasPrice does not exist"}}"#,
        )
        .await;
        let provider = ChainProvider::new(&network(&url, 5)).unwrap();

        assert_eq!(provider.get_gas_price().await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_gas_price_is_transport_error() {
        let url = serve(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).await;
        let provider = ChainProvider::new(&network(&url, 5)).unwrap();

        let err = provider.get_gas_price().await.unwrap_err();
        match err {
            WalletError::Transport { operation, .. } => assert_eq!(operation, "eth_gasPrice"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_gas_price_is_not_unavailable() {
        let provider = ChainProvider::new(&network("http://127.0.0.1:9", 2)).unwrap();

        let err = provider.get_gas_price().await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn stalled_gas_price_times_out() {
        let url = serve_stalled().await;
        let provider = ChainProvider::new(&network(&url, 1)).unwrap();

        let err = provider.get_gas_price().await.unwrap_err();
        match err {
            WalletError::Timeout { operation, secs } => {
                assert_eq!(operation, "eth_gasPrice");
                assert_eq!(secs, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn null_latest_block_is_no_result() {
        let url = serve(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).await;
        let provider = ChainProvider::new(&network(&url, 5)).unwrap();

        let err = provider.get_latest_block().await.unwrap_err();
        assert!(matches!(err, WalletError::NoResult { .. }), "unexpected error: {err}");
    }
}
