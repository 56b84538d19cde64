use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chain_client::lens::AccountBalanceRecord;
use market_api::MarketSnapshot;

use crate::{
    engine::snapshot::Asset,
    error::RefreshError,
    tokens::TokenRegistry,
};

/// Everything one merge pass needs. Balances and markets are already indexed
/// so the pass itself is pure and O(configured assets).
pub struct MergeInputs<'a> {
    pub registry: &'a TokenRegistry,
    pub markets_by_symbol: &'a HashMap<String, &'a MarketSnapshot>,
    /// Empty when no account is connected.
    pub balances: &'a HashMap<Address, AccountBalanceRecord>,
    pub treasury_balances: &'a HashMap<Address, AccountBalanceRecord>,
    pub assets_in: &'a [Address],
    pub account_connected: bool,
}

/// Converts an integer mantissa to a decimal amount using the asset's
/// configured decimal count.
pub fn to_decimal_amount(mantissa: U256, decimals: u8) -> BigDecimal {
    let digits = BigInt::from_bytes_be(Sign::Plus, &mantissa.to_be_bytes::<32>());
    BigDecimal::new(digits, i64::from(decimals))
}

/// Parses an API decimal string, treating anything unparseable as zero the
/// way the metadata consumers always have.
pub fn parse_decimal(raw: &str) -> BigDecimal {
    raw.parse().unwrap_or_default()
}

/// Collateral factors arrive as 18-decimal fixed-point mantissas.
fn collateral_factor_fraction(raw: &str) -> BigDecimal {
    parse_decimal(raw) / BigDecimal::new(BigInt::from(1), -18)
}

pub fn zero_liquidity() -> [String; 3] {
    ["0".to_string(), "0".to_string(), "0".to_string()]
}

pub fn index_by_vtoken(
    records: Vec<AccountBalanceRecord>,
) -> HashMap<Address, AccountBalanceRecord> {
    records
        .into_iter()
        .map(|record| (record.vtoken, record))
        .collect()
}

pub fn index_by_symbol(markets: &[MarketSnapshot]) -> HashMap<String, &MarketSnapshot> {
    markets
        .iter()
        .map(|market| (market.underlying_symbol.to_lowercase(), market))
        .collect()
}

/// Builds the merged asset list. Registry entries without a configured
/// market, or whose market has no metadata row, are excluded; a configured
/// market without a balance record is an error, because the balance sets are
/// fetched for exactly the configured market list.
pub fn build_assets(inputs: &MergeInputs<'_>) -> Result<Vec<Asset>, RefreshError> {
    let mut assets = Vec::new();

    for entry in inputs.registry.entries() {
        let Some(vtoken_address) = entry.vtoken_address else {
            continue;
        };
        let Some(market) = inputs.markets_by_symbol.get(&entry.symbol.to_lowercase()) else {
            continue;
        };

        let treasury_record = inputs
            .treasury_balances
            .get(&vtoken_address)
            .ok_or(RefreshError::MissingBalanceRecord {
                vtoken: vtoken_address,
            })?;
        let treasury_balance = to_decimal_amount(treasury_record.token_balance, entry.decimals);

        let mut wallet_balance = BigDecimal::zero();
        let mut supply_balance = BigDecimal::zero();
        let mut borrow_balance = BigDecimal::zero();
        let mut is_enabled = false;

        if inputs.account_connected {
            let record = inputs.balances.get(&vtoken_address).ok_or(
                RefreshError::MissingBalanceRecord {
                    vtoken: vtoken_address,
                },
            )?;

            wallet_balance = to_decimal_amount(record.token_balance, entry.decimals);
            supply_balance = to_decimal_amount(record.balance_of_underlying, entry.decimals);
            borrow_balance = to_decimal_amount(record.borrow_balance_current, entry.decimals);
            is_enabled = entry.is_native || record.token_allowance > record.token_balance;
        }

        let collateral = inputs.assets_in.contains(&vtoken_address);

        assets.push(Asset {
            id: entry.id.clone(),
            symbol: market.underlying_symbol.clone(),
            name: market.underlying_name.clone(),
            decimals: entry.decimals,
            underlying_address: entry.underlying_address,
            vtoken_address,
            vtoken_symbol: market.symbol.clone(),
            supply_apy: parse_decimal(&market.supply_apy),
            borrow_apy: parse_decimal(&market.borrow_apy),
            xvs_supply_apy: parse_decimal(&market.supply_venus_apy),
            xvs_borrow_apy: parse_decimal(&market.borrow_venus_apy),
            collateral_factor: collateral_factor_fraction(&market.collateral_factor),
            token_price: parse_decimal(&market.token_price),
            liquidity: parse_decimal(&market.liquidity),
            borrow_caps: parse_decimal(&market.borrow_caps),
            total_borrows: parse_decimal(&market.total_borrows),
            treasury_balance,
            wallet_balance,
            supply_balance,
            borrow_balance,
            is_enabled,
            collateral,
            percent_of_limit: "0".to_string(),
            hypothetical_liquidity: zero_liquidity(),
        });
    }

    Ok(assets)
}

/// Sum over collateral assets of supply value times collateral factor.
pub fn total_borrow_limit(assets: &[Asset]) -> BigDecimal {
    assets
        .iter()
        .filter(|asset| asset.collateral)
        .map(|asset| &asset.supply_balance * &asset.token_price * &asset.collateral_factor)
        .sum()
}

/// Sum of USD borrow values across all assets, plus the minted VAI amount.
pub fn total_borrow_balance(assets: &[Asset], minted_vai: &BigDecimal) -> BigDecimal {
    assets
        .iter()
        .map(|asset| &asset.borrow_balance * &asset.token_price)
        .sum::<BigDecimal>()
        + minted_vai
}

pub fn treasury_total_usd(assets: &[Asset]) -> BigDecimal {
    assets
        .iter()
        .map(|asset| &asset.treasury_balance * &asset.token_price)
        .sum()
}

/// Second pass over the asset list, once the whole set's borrow limit is
/// known. Floor rounding to whole percents; "0" whenever the limit is zero.
pub fn apply_percent_of_limit(assets: &mut [Asset], total_borrow_limit: &BigDecimal) {
    for asset in assets.iter_mut() {
        asset.percent_of_limit = if total_borrow_limit.is_zero() {
            "0".to_string()
        } else {
            let percent = &asset.borrow_balance * &asset.token_price * BigDecimal::from(100)
                / total_borrow_limit;
            percent.with_scale_round(0, RoundingMode::Down).to_string()
        };
    }
}
