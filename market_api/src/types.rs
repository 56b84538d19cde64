use serde::{Deserialize, Serialize};

fn zero() -> String {
    "0".to_string()
}

/// One row of off-chain market metadata per underlying asset. Numeric fields
/// arrive as decimal strings; absent fields default to "0" the way the API
/// consumers have always treated them. Replaced wholesale on every
/// successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// vToken symbol, e.g. "vUSDC".
    pub symbol: String,
    pub underlying_symbol: String,
    #[serde(default)]
    pub underlying_name: String,
    #[serde(default)]
    pub underlying_address: Option<String>,
    #[serde(default = "zero")]
    pub supply_apy: String,
    #[serde(default = "zero")]
    pub borrow_apy: String,
    #[serde(default = "zero")]
    pub supply_venus_apy: String,
    #[serde(default = "zero")]
    pub borrow_venus_apy: String,
    /// Fixed-point mantissa, 18 decimals.
    #[serde(default = "zero")]
    pub collateral_factor: String,
    /// USD price, decimal.
    #[serde(default = "zero")]
    pub token_price: String,
    #[serde(default = "zero")]
    pub liquidity: String,
    #[serde(default = "zero")]
    pub borrow_caps: String,
    #[serde(default = "zero", rename = "totalBorrows2")]
    pub total_borrows: String,
}

/// Successful payload of the governed-markets endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernedMarkets {
    pub markets: Vec<MarketSnapshot>,
    /// Daily XVS emission across all markets.
    #[serde(default)]
    pub daily_venus: f64,
}

/// Envelope every API response is wrapped in. `status == false` means the
/// request was understood but rejected; callers treat it as a failed fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: bool,
    pub data: Option<T>,
}

/// One point of the per-market history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketHistoryPoint {
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "zero")]
    pub supply_apy: String,
    #[serde(default = "zero")]
    pub borrow_apy: String,
    #[serde(default = "zero")]
    pub total_supply: String,
    #[serde(default = "zero")]
    pub total_borrow: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketHistory {
    #[serde(default)]
    pub result: Vec<MarketHistoryPoint>,
}
