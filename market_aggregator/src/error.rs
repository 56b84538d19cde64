use alloy::primitives::Address;
use thiserror::Error;

/// Everything that can abort one aggregation tick. The refresh loop logs
/// these and keeps the previously published snapshot; nothing here is fatal
/// to the process.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("market metadata unavailable: {0}")]
    MarketData(#[from] market_api::ApiError),

    #[error("on-chain read failed: {0}")]
    Rpc(#[source] anyhow::Error),

    /// A configured market reached derivation without a balance record for
    /// it. That is a fetch-ordering bug, not a valid state to default over.
    #[error("no balance record for vToken {vtoken}")]
    MissingBalanceRecord { vtoken: Address },

    #[error("invalid token registry entry: {0}")]
    Registry(String),
}

/// Write-path failures of the reward claim dispatcher. Always surfaced to
/// the caller unmodified; the caller decides user messaging.
#[derive(Error, Debug)]
pub enum ClaimError {
    /// Raised synchronously before any write call is issued.
    #[error("wallet not connected")]
    WalletNotConnected,

    /// Claiming from the indexed vault without saying which pool.
    #[error("pool index required to claim from the XVS vault")]
    MissingPoolIndex,

    #[error("claim transaction failed: {0}")]
    Contract(#[source] anyhow::Error),
}
