use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use market_api::MarketSnapshot;

/// The merged, consumer-facing view of one underlying asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub underlying_address: Option<Address>,
    pub vtoken_address: Address,
    pub vtoken_symbol: String,

    // Market economics, copied from the metadata snapshot.
    pub supply_apy: BigDecimal,
    pub borrow_apy: BigDecimal,
    pub xvs_supply_apy: BigDecimal,
    pub xvs_borrow_apy: BigDecimal,
    /// Fraction in [0, 1], already shifted out of its 18-decimal mantissa.
    pub collateral_factor: BigDecimal,
    pub token_price: BigDecimal,
    pub liquidity: BigDecimal,
    pub borrow_caps: BigDecimal,
    pub total_borrows: BigDecimal,

    // Balances, decimal-shifted by the registry decimals.
    pub treasury_balance: BigDecimal,
    pub wallet_balance: BigDecimal,
    pub supply_balance: BigDecimal,
    pub borrow_balance: BigDecimal,

    /// Allowance exceeds the wallet balance, or the asset is the native gas
    /// asset. Always false with no connected account.
    pub is_enabled: bool,
    /// The account has entered this market as collateral.
    pub collateral: bool,
    /// This asset's USD borrow value as a whole-number percentage of the
    /// account's total borrow limit, floor-rounded; "0" when the limit is
    /// zero.
    pub percent_of_limit: String,
    /// (error, liquidity, shortfall) projected on exiting this market;
    /// ["0","0","0"] with no connected account.
    pub hypothetical_liquidity: [String; 3],
}

/// One published aggregation result. Replaced atomically as a whole; a
/// consumer never observes a partially updated view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateSnapshot {
    pub markets: Vec<MarketSnapshot>,
    pub daily_xvs: f64,
    pub assets: Vec<Asset>,
    pub treasury_total_usd_balance: BigDecimal,
    pub user_total_borrow_limit: BigDecimal,
    /// Includes the account's minted VAI on top of per-market borrows.
    pub user_total_borrow_balance: BigDecimal,
    pub user_xvs_balance: BigDecimal,
    pub published_at: Option<DateTime<Utc>>,
}
