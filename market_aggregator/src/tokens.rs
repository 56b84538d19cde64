use alloy::primitives::Address;

use crate::error::RefreshError;

/// Static per-asset configuration. Decimals always come from here, never
/// from the chain, so every monetary derivation uses one consistent scale.
#[derive(Debug, Clone, Copy)]
struct StaticToken {
    id: &'static str,
    symbol: &'static str,
    decimals: u8,
    /// None for the native gas asset.
    underlying_address: Option<&'static str>,
    /// None for assets without a listed market (e.g. VAI, VRT); those never
    /// reach the derived asset list.
    vtoken_address: Option<&'static str>,
    is_native: bool,
}

const MAINNET_TOKENS: &[StaticToken] = &[
    StaticToken {
        id: "bnb",
        symbol: "BNB",
        decimals: 18,
        underlying_address: None,
        vtoken_address: Some("0xA07c5b74C9B40447a954e1466938b865b6BBea36"),
        is_native: true,
    },
    StaticToken {
        id: "usdc",
        symbol: "USDC",
        decimals: 18,
        underlying_address: Some("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
        vtoken_address: Some("0xecA88125a5ADbe82614ffC12D0DB554E2e2867C8"),
        is_native: false,
    },
    StaticToken {
        id: "usdt",
        symbol: "USDT",
        decimals: 18,
        underlying_address: Some("0x55d398326f99059fF775485246999027B3197955"),
        vtoken_address: Some("0xfD5840Cd36d94D7229439859C0112a4185BC0255"),
        is_native: false,
    },
    StaticToken {
        id: "busd",
        symbol: "BUSD",
        decimals: 18,
        underlying_address: Some("0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56"),
        vtoken_address: Some("0x95c78222B3D6e262426483D42CfA53685A67Ab9D"),
        is_native: false,
    },
    StaticToken {
        id: "xvs",
        symbol: "XVS",
        decimals: 18,
        underlying_address: Some("0xcF6BB5389c92Bdda8a3747Ddb454cB7a64626C63"),
        vtoken_address: Some("0x151B1e2635A717bcDc836ECd6FbB62B674FE3E1D"),
        is_native: false,
    },
    StaticToken {
        id: "btcb",
        symbol: "BTCB",
        decimals: 18,
        underlying_address: Some("0x7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c"),
        vtoken_address: Some("0x882C173bC7Ff3b7786CA16dfeD3DFFfb9Ee7847B"),
        is_native: false,
    },
    StaticToken {
        id: "eth",
        symbol: "ETH",
        decimals: 18,
        underlying_address: Some("0x2170Ed0880ac9A755fd29B2688956BD959F933F8"),
        vtoken_address: Some("0xf508fCD89b8bd15579dc79A6827cB4686A3592c8"),
        is_native: false,
    },
    // Minted stablecoin and legacy reward token: stakeable, but no market.
    StaticToken {
        id: "vai",
        symbol: "VAI",
        decimals: 18,
        underlying_address: Some("0x4BD17003473389A42DAF6a0a729f6Fdb328BbBd7"),
        vtoken_address: None,
        is_native: false,
    },
    StaticToken {
        id: "vrt",
        symbol: "VRT",
        decimals: 18,
        underlying_address: Some("0x5F84ce30DC3cF7909101C69086c50De191895883"),
        vtoken_address: None,
        is_native: false,
    },
];

/// One configured underlying asset with its addresses parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: String,
    pub symbol: String,
    pub decimals: u8,
    pub underlying_address: Option<Address>,
    pub vtoken_address: Option<Address>,
    pub is_native: bool,
}

#[derive(Debug, Clone)]
pub struct TokenRegistry {
    entries: Vec<RegistryEntry>,
}

impl TokenRegistry {
    /// Builds the registry from the compiled-in mainnet token list.
    pub fn mainnet() -> Result<Self, RefreshError> {
        let mut entries = Vec::with_capacity(MAINNET_TOKENS.len());
        for token in MAINNET_TOKENS {
            entries.push(RegistryEntry {
                id: token.id.to_string(),
                symbol: token.symbol.to_string(),
                decimals: token.decimals,
                underlying_address: parse_optional(token.id, token.underlying_address)?,
                vtoken_address: parse_optional(token.id, token.vtoken_address)?,
                is_native: token.is_native,
            });
        }
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Addresses of every configured market, in registry order.
    pub fn vtoken_addresses(&self) -> Vec<Address> {
        self.entries
            .iter()
            .filter_map(|entry| entry.vtoken_address)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// The governance token entry, used for the aggregate XVS balance.
    pub fn xvs(&self) -> Option<&RegistryEntry> {
        self.get("xvs")
    }
}

fn parse_optional(id: &str, address: Option<&str>) -> Result<Option<Address>, RefreshError> {
    match address {
        Some(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|_| RefreshError::Registry(format!("bad address for token {}: {}", id, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_registry_parses() {
        let registry = TokenRegistry::mainnet().unwrap();
        assert!(registry.entries().len() >= 7);
        assert!(registry.xvs().is_some());
    }

    #[test]
    fn vtoken_addresses_skip_marketless_tokens() {
        let registry = TokenRegistry::mainnet().unwrap();
        let with_market = registry
            .entries()
            .iter()
            .filter(|entry| entry.vtoken_address.is_some())
            .count();
        assert_eq!(registry.vtoken_addresses().len(), with_market);
        assert!(registry.get("vai").unwrap().vtoken_address.is_none());
    }
}
