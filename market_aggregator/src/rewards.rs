use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionReceipt;
use chain_client::vaults::VaultWriter;
use tracing::info;

use crate::error::ClaimError;

/// Which staking product a vault claim targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakedToken {
    Xvs,
    Vai,
    Vrt,
}

/// One vault reward claim, as issued by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRequest {
    /// The connected account; a claim without one is rejected before any
    /// contract call.
    pub account: Option<Address>,
    pub staked_token: StakedToken,
    pub reward_token_address: Address,
    /// Pool within the indexed XVS vault. The single-purpose vaults take
    /// none.
    pub pool_index: Option<u64>,
}

/// Routes reward claims to the right vault contract.
pub struct RewardDispatcher<V> {
    vaults: V,
}

impl<V: VaultWriter> RewardDispatcher<V> {
    pub fn new(vaults: V) -> Self {
        Self { vaults }
    }

    /// Dispatches one vault claim.
    ///
    /// A request carrying a pool index goes to the indexed XVS vault
    /// regardless of the staked token; index-less VAI and VRT requests go to
    /// their single-purpose vaults; an index-less XVS request has no valid
    /// target and is rejected.
    ///
    /// # Returns
    /// The mined receipt of the claim transaction.
    pub async fn claim_vault_reward(
        &self,
        request: ClaimRequest,
    ) -> Result<TransactionReceipt, ClaimError> {
        let account = request.account.ok_or(ClaimError::WalletNotConnected)?;

        match (request.pool_index, request.staked_token) {
            (Some(pool_index), _) => {
                info!("Dispatching claim for account {} to the XVS vault", account);
                self.vaults
                    .claim_xvs_vault_reward(
                        account,
                        request.reward_token_address,
                        U256::from(pool_index),
                    )
                    .await
                    .map_err(ClaimError::Contract)
            }
            (None, StakedToken::Vai) => {
                info!("Dispatching claim for account {} to the VAI vault", account);
                self.vaults
                    .claim_vai_vault_reward(account)
                    .await
                    .map_err(ClaimError::Contract)
            }
            (None, StakedToken::Vrt) => {
                info!("Dispatching claim for account {} to the VRT vault", account);
                self.vaults
                    .claim_vrt_vault_reward(account)
                    .await
                    .map_err(ClaimError::Contract)
            }
            (None, StakedToken::Xvs) => Err(ClaimError::MissingPoolIndex),
        }
    }

    /// Claims XVS accrued across markets, through the Comptroller rather
    /// than a vault.
    pub async fn claim_xvs_reward(
        &self,
        account: Option<Address>,
    ) -> Result<TransactionReceipt, ClaimError> {
        let account = account.ok_or(ClaimError::WalletNotConnected)?;
        self.vaults
            .claim_xvs_reward(account)
            .await
            .map_err(ClaimError::Contract)
    }
}
