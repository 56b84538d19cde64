use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::Provider,
};
use anyhow::Result;
use async_trait::async_trait;

use crate::contracts::Comptroller;

/// Account-level risk reads against the Comptroller contract.
///
/// The aggregation engine talks to this trait rather than to a contract
/// instance so it can be exercised with in-process fakes.
#[async_trait]
pub trait ComptrollerReader: Send + Sync {
    /// Markets the account has entered as collateral.
    async fn get_assets_in(&self, account: Address) -> Result<Vec<Address>>;

    /// Projected (error, liquidity, shortfall) if the account redeemed
    /// `redeem_tokens` vTokens of the given market, as decimal strings.
    async fn get_hypothetical_account_liquidity(
        &self,
        account: Address,
        vtoken: Address,
        redeem_tokens: U256,
    ) -> Result<[String; 3]>;

    /// Outstanding VAI minted by the account, as an 18-decimal mantissa.
    async fn minted_vai(&self, account: Address) -> Result<U256>;
}

pub struct ComptrollerClient<P: Provider<Ethereum>> {
    instance: Comptroller::ComptrollerInstance<(), P>,
    address: Address,
}

impl<P: Provider<Ethereum>> ComptrollerClient<P> {
    pub fn new(provider: P, address: Address) -> Self {
        Self {
            instance: Comptroller::new(address, provider),
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl<P: Provider<Ethereum> + Send + Sync> ComptrollerReader for ComptrollerClient<P> {
    async fn get_assets_in(&self, account: Address) -> Result<Vec<Address>> {
        let assets_in = self.instance.getAssetsIn(account).call().await?._0;
        Ok(assets_in)
    }

    async fn get_hypothetical_account_liquidity(
        &self,
        account: Address,
        vtoken: Address,
        redeem_tokens: U256,
    ) -> Result<[String; 3]> {
        let result = self
            .instance
            .getHypotheticalAccountLiquidity(self.address, account, vtoken, redeem_tokens, U256::ZERO)
            .call()
            .await?;

        Ok([
            result._0.to_string(),
            result._1.to_string(),
            result._2.to_string(),
        ])
    }

    async fn minted_vai(&self, account: Address) -> Result<U256> {
        let minted = self.instance.mintedVAIs(account).call().await?._0;
        Ok(minted)
    }
}
