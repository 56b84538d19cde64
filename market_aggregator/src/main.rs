use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chain_client::{
    comptroller::ComptrollerClient,
    lens::{LensClient, LensReader},
    vaults::{VaultAddresses, VaultClient},
    ChainManager,
};
use market_aggregator::{
    config::LocalConfig,
    engine::AggregationEngine,
    rewards::RewardDispatcher,
    tokens::TokenRegistry,
    utils,
};
use market_api::ApiClient;
use tokio::sync::watch;
use tracing::info;

/// Main entry point for the market aggregation service
///
/// This function performs the following steps:
/// 1. Initializes the pre-run environment
/// 2. Builds the RPC provider and the typed contract clients
/// 3. Dispatches a one-off XVS claim when invoked with `claim-xvs`
/// 4. Otherwise runs the aggregation loop until shutdown
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    init_pre_run()?;

    info!("Starting the market aggregation service");

    let config = LocalConfig::load_from_env()?;

    let provider = ChainManager::get_provider(&config.rpc_url)
        .await
        .context("Failed to create RPC provider")?;

    let args = std::env::args().collect::<Vec<String>>();
    if args.len() > 1 && args[1] == "claim-xvs" {
        let vaults = VaultClient::new(
            provider,
            VaultAddresses {
                xvs_vault: config.xvs_vault_address,
                vai_vault: config.vai_vault_address,
                vrt_vault: config.vrt_vault_address,
                comptroller: config.comptroller_address,
            },
        );
        let dispatcher = RewardDispatcher::new(vaults);
        let receipt = dispatcher.claim_xvs_reward(config.account_address).await?;
        info!("Claimed accrued XVS in tx {}", receipt.transaction_hash);
        return Ok(());
    }

    let comptroller = ComptrollerClient::new(provider.clone(), config.comptroller_address);
    let lens = LensClient::new(
        provider.clone(),
        config.lens_address,
        config.comptroller_address,
    );

    if let Some(account) = config.account_address {
        let pending = lens
            .pending_xvs_reward(account)
            .await
            .context("Failed to read pending XVS reward")?;
        info!("Account {} has a pending XVS reward of {} wei", account, pending);
    }

    let market_data =
        ApiClient::new(&config.api_base_url).context("Failed to create market API client")?;
    let registry = TokenRegistry::mainnet()?;

    let engine = Arc::new(AggregationEngine::new(
        comptroller,
        lens,
        market_data,
        registry,
        config.treasury_address,
    ));

    // The sender side stays alive for the whole process; the loop stops once
    // it is dropped.
    let (_account_tx, account_rx) = watch::channel(config.account_address);

    info!(
        "Aggregating every {}s for account {:?}",
        config.refresh_interval_secs, config.account_address
    );
    engine
        .run(Duration::from_secs(config.refresh_interval_secs), account_rx)
        .await;

    info!("Aggregation loop stopped");
    Ok(())
}

/// Initializes the pre-run environment
///
/// This function performs the following steps:
/// 1. Loads environment variables from the `.env` file
/// 2. Sets up the logger
fn init_pre_run() -> Result<()> {
    dotenvy::dotenv().context("Failed to load environment variables")?;
    utils::logger::setup_logger().context("Failed to setup logger")?;
    Ok(())
}
