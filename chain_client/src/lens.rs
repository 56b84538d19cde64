use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::Provider,
};
use anyhow::Result;
use async_trait::async_trait;

use crate::contracts::VenusLens;

/// One row of the batched per-account balance read, keyed by vToken address.
///
/// Fields are copied one by one out of the ABI struct so that a change in the
/// generated return shape never silently reorders values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalanceRecord {
    pub vtoken: Address,
    /// vToken balance, in vToken units.
    pub balance_of: U256,
    /// Supplied balance converted to the underlying asset.
    pub balance_of_underlying: U256,
    /// Current borrow balance in the underlying asset.
    pub borrow_balance_current: U256,
    /// Wallet balance of the underlying asset.
    pub token_balance: U256,
    /// Allowance granted to the market for the underlying asset.
    pub token_allowance: U256,
}

impl AccountBalanceRecord {
    pub fn from_raw(raw: VenusLens::VTokenBalances) -> Self {
        Self {
            vtoken: raw.vToken,
            balance_of: raw.balanceOf,
            balance_of_underlying: raw.balanceOfUnderlying,
            borrow_balance_current: raw.borrowBalanceCurrent,
            token_balance: raw.tokenBalance,
            token_allowance: raw.tokenAllowance,
        }
    }
}

/// Batched balance reads against the VenusLens contract.
#[async_trait]
pub trait LensReader: Send + Sync {
    /// One balance record per market for the given account. Errors propagate
    /// unmodified; retry belongs to the provider layer.
    async fn vtoken_balances_all(
        &self,
        vtokens: &[Address],
        account: Address,
    ) -> Result<Vec<AccountBalanceRecord>>;

    /// XVS reward accrued but not yet claimed by the account.
    async fn pending_xvs_reward(&self, account: Address) -> Result<U256>;
}

pub struct LensClient<P: Provider<Ethereum>> {
    instance: VenusLens::VenusLensInstance<(), P>,
    comptroller_address: Address,
}

impl<P: Provider<Ethereum>> LensClient<P> {
    pub fn new(provider: P, address: Address, comptroller_address: Address) -> Self {
        Self {
            instance: VenusLens::new(address, provider),
            comptroller_address,
        }
    }
}

#[async_trait]
impl<P: Provider<Ethereum> + Send + Sync> LensReader for LensClient<P> {
    async fn vtoken_balances_all(
        &self,
        vtokens: &[Address],
        account: Address,
    ) -> Result<Vec<AccountBalanceRecord>> {
        let raw = self
            .instance
            .vTokenBalancesAll(vtokens.to_vec(), account)
            .call()
            .await?
            ._0;

        Ok(raw.into_iter().map(AccountBalanceRecord::from_raw).collect())
    }

    async fn pending_xvs_reward(&self, account: Address) -> Result<U256> {
        let pending = self
            .instance
            .pendingVenus(account, self.comptroller_address)
            .call()
            .await?
            ._0;
        Ok(pending)
    }
}
