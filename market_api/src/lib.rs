pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

pub use types::{ApiEnvelope, GovernedMarkets, MarketHistory, MarketHistoryPoint, MarketSnapshot};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request rejected with status {0}")]
    Status(u16),

    #[error("response carried status=false or no data")]
    Rejected,
}

/// Source of off-chain market metadata. The engine depends on this trait so
/// ticks can be driven by an in-process fake in tests.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn get_governed_markets(&self) -> Result<GovernedMarkets, ApiError>;
}

/// Granularity of the market history series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPeriod {
    Day,
    Hour,
}

impl HistoryPeriod {
    fn as_query(self) -> &'static str {
        match self {
            HistoryPeriod::Day => "1day",
            HistoryPeriod::Hour => "1hr",
        }
    }
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            info!("Request to {} failed with status: {}", url, response.status());
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if !envelope.status {
            return Err(ApiError::Rejected);
        }
        envelope.data.ok_or(ApiError::Rejected)
    }

    /// History of rates and totals for a single market, newest first.
    pub async fn get_market_history(
        &self,
        vtoken_address: &str,
        period: HistoryPeriod,
        limit: u32,
    ) -> Result<MarketHistory, ApiError> {
        let url = format!(
            "{}/market_history/graph?asset={}&type={}&limit={}",
            self.base_url,
            vtoken_address,
            period.as_query(),
            limit
        );
        self.get_json(url).await
    }
}

#[async_trait]
impl MarketDataSource for ApiClient {
    async fn get_governed_markets(&self) -> Result<GovernedMarkets, ApiError> {
        let url = format!("{}/governance/venus", self.base_url);
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn markets_body() -> serde_json::Value {
        serde_json::json!({
            "status": true,
            "data": {
                "markets": [
                    {
                        "symbol": "vUSDC",
                        "underlyingSymbol": "USDC",
                        "underlyingName": "USD Coin",
                        "underlyingAddress": "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d",
                        "supplyApy": "3.12",
                        "borrowApy": "5.87",
                        "supplyVenusApy": "0.41",
                        "borrowVenusApy": "0.56",
                        "collateralFactor": "800000000000000000",
                        "tokenPrice": "1.0001",
                        "liquidity": "14300000.55",
                        "borrowCaps": "0",
                        "totalBorrows2": "10400000.12"
                    }
                ],
                "dailyVenus": 1234.5
            }
        })
    }

    #[tokio::test]
    async fn parses_governed_markets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/governance/venus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(markets_body()))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let governed = client.get_governed_markets().await.unwrap();

        assert_eq!(governed.markets.len(), 1);
        assert_eq!(governed.daily_venus, 1234.5);
        let market = &governed.markets[0];
        assert_eq!(market.underlying_symbol, "USDC");
        assert_eq!(market.collateral_factor, "800000000000000000");
        assert_eq!(market.total_borrows, "10400000.12");
    }

    #[tokio::test]
    async fn status_false_is_a_failed_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/governance/venus"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": false, "data": null})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let result = client.get_governed_markets().await;

        assert!(matches!(result, Err(ApiError::Rejected)));
    }

    #[tokio::test]
    async fn http_error_propagates_without_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/governance/venus"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let result = client.get_governed_markets().await;

        assert!(matches!(result, Err(ApiError::Status(502))));
    }

    #[test]
    fn missing_numeric_fields_default_to_zero() {
        let market: MarketSnapshot = serde_json::from_value(serde_json::json!({
            "symbol": "vXVS",
            "underlyingSymbol": "XVS"
        }))
        .unwrap();

        assert_eq!(market.supply_apy, "0");
        assert_eq!(market.token_price, "0");
        assert_eq!(market.underlying_address, None);
    }
}
