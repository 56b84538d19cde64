use alloy::primitives::Address;
use anyhow::Result;

use super::env_helper::load_env_var;

#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub rpc_url: String,
    pub api_base_url: String,
    pub comptroller_address: Address,
    pub lens_address: Address,
    pub treasury_address: Address,
    pub xvs_vault_address: Address,
    pub vai_vault_address: Address,
    pub vrt_vault_address: Address,
    /// Fast refresh cadence for the aggregation loop, in seconds.
    pub refresh_interval_secs: u64,
    /// Optional account to aggregate for; treasury totals are computed
    /// either way.
    pub account_address: Option<Address>,
}

impl LocalConfig {
    pub fn load_from_env() -> Result<Self> {
        Ok(Self {
            rpc_url: load_env_var("RPC_URL")?,
            api_base_url: load_env_var("API_BASE_URL")?,
            comptroller_address: load_env_var("COMPTROLLER_ADDRESS")?,
            lens_address: load_env_var("LENS_ADDRESS")?,
            treasury_address: load_env_var("TREASURY_ADDRESS")?,
            xvs_vault_address: load_env_var("XVS_VAULT_ADDRESS")?,
            vai_vault_address: load_env_var("VAI_VAULT_ADDRESS")?,
            vrt_vault_address: load_env_var("VRT_VAULT_ADDRESS")?,
            refresh_interval_secs: load_env_var("REFRESH_INTERVAL_SECS")?,
            account_address: match std::env::var("ACCOUNT_ADDRESS") {
                Ok(var) => Some(var.parse()?),
                Err(_) => None,
            },
        })
    }
}
