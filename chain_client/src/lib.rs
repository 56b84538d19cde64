pub mod comptroller;
pub mod contracts;
pub mod lens;
pub mod multicall;
pub mod pairs;
pub mod vaults;

use alloy::{
    network::Ethereum,
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::{http::reqwest::Url, layers::RetryBackoffLayer},
};
use anyhow::Result;

/// ChainManager handles blockchain-related connections.
/// It provides functionality to create provider instances used by the typed
/// contract clients in this crate.
pub struct ChainManager;

impl ChainManager {
    /// Creates and returns an HTTP provider instance for blockchain interactions.
    ///
    /// Retry/backoff policy lives here, in the transport layer; the callers
    /// issuing reads never retry on their own.
    ///
    /// # Arguments
    /// * `rpc_url` - RPC endpoint URL
    ///
    /// # Returns
    /// * `Result<impl Provider<Ethereum> + Clone>` - A Result containing either the provider instance or an error
    pub async fn get_provider(rpc_url: &str) -> Result<impl Provider<Ethereum> + Clone> {
        // Instantiate the RetryBackoffLayer with the configuration
        let retry_layer = RetryBackoffLayer::new(10, 1000, 10000);

        let client = RpcClient::builder()
            .layer(retry_layer)
            .http(Url::parse(rpc_url)?);

        let provider = ProviderBuilder::new().on_client(client);

        Ok(provider)
    }
}
