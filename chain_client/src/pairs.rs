use alloy::{
    network::Ethereum,
    primitives::{keccak256, Address, B256, U256},
    providers::Provider,
    sol_types::SolCall,
};
use anyhow::{Context, Result};

use crate::{contracts::PancakePair, multicall::MulticallManager};

const PAIR_FACTORY_ADDRESS: Address =
    alloy::primitives::address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73");
const PAIR_INIT_CODE_HASH: B256 =
    alloy::primitives::b256!("00fb7f630766e6a796048ea87d01acd3068e8ff67d078148a3fa3f4a84f69bd5");

/// An unordered combination of two underlying tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPair {
    pub token_a: Address,
    pub token_b: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairAddress {
    pub pair: TokenPair,
    pub address: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub pair: TokenPair,
    pub address: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u64,
}

/// Derives the pool address for a token combination without touching the
/// chain (CREATE2 over the sorted token pair). Returns `None` for
/// combinations with no valid pool, such as identical tokens; callers
/// exclude those combinations instead of failing the batch.
pub fn derive_pair_address(pair: TokenPair) -> Option<PairAddress> {
    if pair.token_a == pair.token_b {
        return None;
    }

    let (token0, token1) = if pair.token_a < pair.token_b {
        (pair.token_a, pair.token_b)
    } else {
        (pair.token_b, pair.token_a)
    };

    let mut packed = [0u8; 40];
    packed[..20].copy_from_slice(token0.as_slice());
    packed[20..].copy_from_slice(token1.as_slice());
    let salt = keccak256(packed);

    Some(PairAddress {
        pair,
        address: PAIR_FACTORY_ADDRESS.create2(salt, PAIR_INIT_CODE_HASH),
    })
}

/// Fetches current reserves for every derivable pair in one multicall batch.
///
/// # Arguments
/// * `provider` - Blockchain provider
/// * `combinations` - Token combinations to look up
///
/// # Returns
/// * `Result<Vec<PairReserves>>` - Reserves per derivable pair; one failed sub-call fails the whole fetch
pub async fn get_pair_reserves<P: Provider<Ethereum> + Clone>(
    provider: &P,
    combinations: &[TokenPair],
) -> Result<Vec<PairReserves>> {
    let pair_addresses: Vec<PairAddress> = combinations
        .iter()
        .copied()
        .filter_map(derive_pair_address)
        .collect();

    if pair_addresses.is_empty() {
        return Ok(vec![]);
    }

    let mut multicall_manager = MulticallManager::new(provider.clone())?;
    let call_data: alloy::primitives::Bytes = PancakePair::getReservesCall {}.abi_encode().into();
    for pair_address in &pair_addresses {
        multicall_manager.add_call(&pair_address.address, &call_data);
    }

    let results = multicall_manager.execute_calls().await?;
    multicall_manager.clear_calls();

    let mut reserves = Vec::with_capacity(pair_addresses.len());
    for (pair_address, result) in pair_addresses.iter().zip(results.iter()) {
        let decoded = PancakePair::getReservesCall::abi_decode_returns(result.as_ref(), false)?;

        reserves.push(PairReserves {
            pair: pair_address.pair,
            address: pair_address.address,
            reserve0: decoded.reserve0,
            reserve1: decoded.reserve1,
            block_timestamp_last: u64::try_from(decoded.blockTimestampLast)
                .context("blockTimestampLast out of range")?,
        });
    }

    Ok(reserves)
}
