use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::TransactionReceipt,
};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::contracts::{Comptroller, VaiVault, VrtVault, XvsVault};

/// The four reward-claim write operations. Each returns the mined receipt or
/// propagates the underlying revert/rejection unmodified; no retry.
#[async_trait]
pub trait VaultWriter: Send + Sync {
    /// Claim from the indexed XVS vault pool.
    async fn claim_xvs_vault_reward(
        &self,
        account: Address,
        reward_token: Address,
        pool_index: U256,
    ) -> Result<TransactionReceipt>;

    /// Claim from the single-purpose VAI vault.
    async fn claim_vai_vault_reward(&self, account: Address) -> Result<TransactionReceipt>;

    /// Claim from the single-purpose VRT vault.
    async fn claim_vrt_vault_reward(&self, account: Address) -> Result<TransactionReceipt>;

    /// Claim accrued XVS through the Comptroller.
    async fn claim_xvs_reward(&self, account: Address) -> Result<TransactionReceipt>;
}

pub struct VaultClient<P: Provider<Ethereum>> {
    xvs_vault: XvsVault::XvsVaultInstance<(), P>,
    vai_vault: VaiVault::VaiVaultInstance<(), P>,
    vrt_vault: VrtVault::VrtVaultInstance<(), P>,
    comptroller: Comptroller::ComptrollerInstance<(), P>,
}

pub struct VaultAddresses {
    pub xvs_vault: Address,
    pub vai_vault: Address,
    pub vrt_vault: Address,
    pub comptroller: Address,
}

impl<P: Provider<Ethereum> + Clone> VaultClient<P> {
    pub fn new(provider: P, addresses: VaultAddresses) -> Self {
        Self {
            xvs_vault: XvsVault::new(addresses.xvs_vault, provider.clone()),
            vai_vault: VaiVault::new(addresses.vai_vault, provider.clone()),
            vrt_vault: VrtVault::new(addresses.vrt_vault, provider.clone()),
            comptroller: Comptroller::new(addresses.comptroller, provider),
        }
    }
}

#[async_trait]
impl<P: Provider<Ethereum> + Clone + Send + Sync> VaultWriter for VaultClient<P> {
    async fn claim_xvs_vault_reward(
        &self,
        account: Address,
        reward_token: Address,
        pool_index: U256,
    ) -> Result<TransactionReceipt> {
        info!(
            "Claiming XVS vault reward for {} (pool {})",
            account, pool_index
        );
        let receipt = self
            .xvs_vault
            .claim(account, reward_token, pool_index)
            .send()
            .await?
            .get_receipt()
            .await?;
        Ok(receipt)
    }

    async fn claim_vai_vault_reward(&self, account: Address) -> Result<TransactionReceipt> {
        info!("Claiming VAI vault reward for {}", account);
        let receipt = self
            .vai_vault
            .claim(account)
            .send()
            .await?
            .get_receipt()
            .await?;
        Ok(receipt)
    }

    async fn claim_vrt_vault_reward(&self, account: Address) -> Result<TransactionReceipt> {
        info!("Claiming VRT vault reward for {}", account);
        let receipt = self
            .vrt_vault
            .claim(account)
            .send()
            .await?
            .get_receipt()
            .await?;
        Ok(receipt)
    }

    async fn claim_xvs_reward(&self, account: Address) -> Result<TransactionReceipt> {
        info!("Claiming accrued XVS for {}", account);
        let receipt = self
            .comptroller
            .claimVenus(account)
            .send()
            .await?
            .get_receipt()
            .await?;
        Ok(receipt)
    }
}
