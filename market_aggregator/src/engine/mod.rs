pub mod merge;
pub mod snapshot;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy::primitives::{Address, U256};
use bigdecimal::{BigDecimal, Zero};
use chain_client::{comptroller::ComptrollerReader, lens::LensReader};
use chrono::Utc;
use futures::future::try_join_all;
use market_api::{GovernedMarkets, MarketDataSource};
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::{
    engine::{
        merge::MergeInputs,
        snapshot::AggregateSnapshot,
    },
    error::RefreshError,
    tokens::TokenRegistry,
};

/// Consecutive failed ticks before the refresh loop escalates from per-tick
/// errors to a staleness warning on the published snapshot.
const STALE_WARN_THRESHOLD: u32 = 5;

/// What became of one finished tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// A newer tick started before this one finished; its result was
    /// discarded without touching the published snapshot.
    Superseded,
}

/// Merges off-chain market metadata with batched on-chain account reads into
/// one atomically published [`AggregateSnapshot`].
///
/// All three data sources sit behind traits so ticks can be driven end to end
/// by in-process fakes.
pub struct AggregationEngine<C, L, M> {
    comptroller: C,
    lens: L,
    market_data: M,
    registry: TokenRegistry,
    treasury_address: Address,
    /// Last successfully fetched metadata, reused when a fetch fails
    /// mid-session.
    cached_markets: Mutex<Option<GovernedMarkets>>,
    /// Generation token. Each tick takes the next value on entry and may only
    /// publish while it is still the newest.
    latest_tick: AtomicU64,
    publisher: watch::Sender<Arc<AggregateSnapshot>>,
}

impl<C, L, M> AggregationEngine<C, L, M>
where
    C: ComptrollerReader,
    L: LensReader,
    M: MarketDataSource,
{
    pub fn new(
        comptroller: C,
        lens: L,
        market_data: M,
        registry: TokenRegistry,
        treasury_address: Address,
    ) -> Self {
        let (publisher, _) = watch::channel(Arc::new(AggregateSnapshot::default()));
        Self {
            comptroller,
            lens,
            market_data,
            registry,
            treasury_address,
            cached_markets: Mutex::new(None),
            latest_tick: AtomicU64::new(0),
            publisher,
        }
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AggregateSnapshot>> {
        self.publisher.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<AggregateSnapshot> {
        self.publisher.borrow().clone()
    }

    /// Runs one aggregation tick for the given account (or for no account,
    /// which still refreshes markets and treasury totals).
    ///
    /// # Returns
    /// Whether the tick's snapshot was published, or discarded because a
    /// newer tick had already started.
    pub async fn refresh(&self, account: Option<Address>) -> Result<PublishOutcome, RefreshError> {
        let tick = self.latest_tick.fetch_add(1, Ordering::SeqCst) + 1;

        let governed = self.fetch_markets().await?;
        let vtokens = self.registry.vtoken_addresses();

        let treasury_records = self
            .lens
            .vtoken_balances_all(&vtokens, self.treasury_address)
            .await
            .map_err(RefreshError::Rpc)?;
        let treasury_balances = merge::index_by_vtoken(treasury_records);

        let mut balances = HashMap::new();
        let mut assets_in = Vec::new();
        let mut minted_vai = BigDecimal::zero();
        if let Some(account) = account {
            let records = self
                .lens
                .vtoken_balances_all(&vtokens, account)
                .await
                .map_err(RefreshError::Rpc)?;
            balances = merge::index_by_vtoken(records);

            assets_in = self
                .comptroller
                .get_assets_in(account)
                .await
                .map_err(RefreshError::Rpc)?;

            let minted = self
                .comptroller
                .minted_vai(account)
                .await
                .map_err(RefreshError::Rpc)?;
            let vai_decimals = self
                .registry
                .get("vai")
                .map(|entry| entry.decimals)
                .unwrap_or(18);
            minted_vai = merge::to_decimal_amount(minted, vai_decimals);
        }

        let markets_by_symbol = merge::index_by_symbol(&governed.markets);
        let mut assets = merge::build_assets(&MergeInputs {
            registry: &self.registry,
            markets_by_symbol: &markets_by_symbol,
            balances: &balances,
            treasury_balances: &treasury_balances,
            assets_in: &assets_in,
            account_connected: account.is_some(),
        })?;

        // Per-market exit projections, fetched concurrently. Any single
        // failure aborts the whole tick; a snapshot never mixes real and
        // defaulted projections.
        if let Some(account) = account {
            let calls = assets.iter().map(|asset| {
                let redeem_tokens = balances
                    .get(&asset.vtoken_address)
                    .map(|record| record.balance_of)
                    .unwrap_or(U256::ZERO);
                self.comptroller.get_hypothetical_account_liquidity(
                    account,
                    asset.vtoken_address,
                    redeem_tokens,
                )
            });
            let projections = try_join_all(calls).await.map_err(RefreshError::Rpc)?;
            for (asset, projection) in assets.iter_mut().zip(projections) {
                asset.hypothetical_liquidity = projection;
            }
        }

        let user_total_borrow_limit = merge::total_borrow_limit(&assets);
        merge::apply_percent_of_limit(&mut assets, &user_total_borrow_limit);
        let user_total_borrow_balance = merge::total_borrow_balance(&assets, &minted_vai);
        let treasury_total_usd_balance = merge::treasury_total_usd(&assets);

        let user_xvs_balance = match self.registry.xvs() {
            Some(entry) => entry
                .vtoken_address
                .and_then(|vtoken| balances.get(&vtoken))
                .map(|record| merge::to_decimal_amount(record.token_balance, entry.decimals))
                .unwrap_or_default(),
            None => BigDecimal::zero(),
        };

        let snapshot = AggregateSnapshot {
            markets: governed.markets,
            daily_xvs: governed.daily_venus,
            assets,
            treasury_total_usd_balance,
            user_total_borrow_limit,
            user_total_borrow_balance,
            user_xvs_balance,
            published_at: Some(Utc::now()),
        };

        let outcome = self.publish_if_latest(tick, snapshot);
        if outcome == PublishOutcome::Superseded {
            info!("Tick {} was superseded before publication, discarding its result", tick);
        }
        Ok(outcome)
    }

    /// Replaces the published snapshot only if `tick` is still the newest
    /// generation. The watch sender serializes modification closures, so the
    /// generation check and the replacement cannot interleave with a
    /// concurrent publish.
    fn publish_if_latest(&self, tick: u64, snapshot: AggregateSnapshot) -> PublishOutcome {
        let mut outcome = PublishOutcome::Superseded;
        self.publisher.send_if_modified(|current| {
            if self.latest_tick.load(Ordering::SeqCst) != tick {
                return false;
            }
            *current = Arc::new(snapshot);
            outcome = PublishOutcome::Published;
            true
        });
        outcome
    }

    async fn fetch_markets(&self) -> Result<GovernedMarkets, RefreshError> {
        match self.market_data.get_governed_markets().await {
            Ok(governed) => {
                *self.cached_markets.lock().await = Some(governed.clone());
                Ok(governed)
            }
            Err(err) => {
                let cached = self.cached_markets.lock().await.clone();
                match cached {
                    Some(governed) => {
                        warn!("Market metadata fetch failed, reusing cached markets: {}", err);
                        Ok(governed)
                    }
                    None => Err(RefreshError::MarketData(err)),
                }
            }
        }
    }

    /// Drives ticks until the account channel closes. A tick runs on every
    /// interval elapse and immediately whenever the account changes; failed
    /// ticks keep the previous snapshot published.
    pub async fn run(&self, interval: Duration, mut account_rx: watch::Receiver<Option<Address>>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = account_rx.changed() => {
                    if changed.is_err() {
                        info!("Account channel closed, stopping aggregation loop");
                        return;
                    }
                    ticker.reset();
                }
            }

            let account = *account_rx.borrow();
            match self.refresh(account).await {
                Ok(_) => consecutive_failures = 0,
                Err(err) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= STALE_WARN_THRESHOLD {
                        warn!(
                            "Published snapshot is stale after {} consecutive failed refreshes: {}",
                            consecutive_failures, err
                        );
                    } else {
                        error!("Refresh failed: {}", err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chain_client::lens::AccountBalanceRecord;
    use market_api::{ApiError, MarketSnapshot};
    use std::{
        collections::VecDeque,
        sync::atomic::AtomicBool,
    };
    use tokio::sync::oneshot;

    const TREASURY: Address = Address::repeat_byte(0xFD);
    const ACCOUNT: Address = Address::repeat_byte(0xAC);

    fn vtoken(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn to_wei(units: u64) -> U256 {
        U256::from(units) * U256::from(10u64).pow(U256::from(18))
    }

    fn record(vtoken_byte: u8, wallet: u64, supplied: u64, borrowed: u64) -> AccountBalanceRecord {
        AccountBalanceRecord {
            vtoken: vtoken(vtoken_byte),
            balance_of: to_wei(supplied),
            balance_of_underlying: to_wei(supplied),
            borrow_balance_current: to_wei(borrowed),
            token_balance: to_wei(wallet),
            token_allowance: to_wei(1_000_000),
        }
    }

    fn market(symbol: &str, price: &str, collateral_factor: &str) -> MarketSnapshot {
        MarketSnapshot {
            symbol: format!("v{}", symbol),
            underlying_symbol: symbol.to_string(),
            underlying_name: symbol.to_string(),
            underlying_address: None,
            supply_apy: "1".to_string(),
            borrow_apy: "2".to_string(),
            supply_venus_apy: "0".to_string(),
            borrow_venus_apy: "0".to_string(),
            collateral_factor: collateral_factor.to_string(),
            token_price: price.to_string(),
            liquidity: "0".to_string(),
            borrow_caps: "0".to_string(),
            total_borrows: "0".to_string(),
        }
    }

    fn governed(daily_venus: f64) -> GovernedMarkets {
        GovernedMarkets {
            markets: vec![
                market("USDC", "1", "500000000000000000"),
                market("XVS", "4", "0"),
            ],
            daily_venus,
        }
    }

    fn registry() -> TokenRegistry {
        use crate::tokens::RegistryEntry;
        TokenRegistry::from_entries(vec![
            RegistryEntry {
                id: "usdc".to_string(),
                symbol: "USDC".to_string(),
                decimals: 18,
                underlying_address: Some(Address::repeat_byte(0xEE)),
                vtoken_address: Some(vtoken(0x01)),
                is_native: false,
            },
            RegistryEntry {
                id: "xvs".to_string(),
                symbol: "XVS".to_string(),
                decimals: 18,
                underlying_address: Some(Address::repeat_byte(0xEF)),
                vtoken_address: Some(vtoken(0x05)),
                is_native: false,
            },
        ])
    }

    struct FakeComptroller {
        assets_in: Vec<Address>,
        minted_vai: U256,
        liquidity: [&'static str; 3],
    }

    impl Default for FakeComptroller {
        fn default() -> Self {
            Self {
                assets_in: Vec::new(),
                minted_vai: U256::ZERO,
                liquidity: ["0", "0", "0"],
            }
        }
    }

    #[async_trait]
    impl ComptrollerReader for FakeComptroller {
        async fn get_assets_in(&self, _account: Address) -> anyhow::Result<Vec<Address>> {
            Ok(self.assets_in.clone())
        }

        async fn get_hypothetical_account_liquidity(
            &self,
            _account: Address,
            _vtoken: Address,
            _redeem_tokens: U256,
        ) -> anyhow::Result<[String; 3]> {
            Ok(self.liquidity.map(str::to_string))
        }

        async fn minted_vai(&self, _account: Address) -> anyhow::Result<U256> {
            Ok(self.minted_vai)
        }
    }

    struct FakeLens {
        account_records: Vec<AccountBalanceRecord>,
        treasury_records: Vec<AccountBalanceRecord>,
        fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl LensReader for FakeLens {
        async fn vtoken_balances_all(
            &self,
            _vtokens: &[Address],
            account: Address,
        ) -> anyhow::Result<Vec<AccountBalanceRecord>> {
            if self.fail.load(Ordering::Relaxed) {
                anyhow::bail!("rpc unavailable");
            }
            if account == TREASURY {
                Ok(self.treasury_records.clone())
            } else {
                Ok(self.account_records.clone())
            }
        }

        async fn pending_xvs_reward(&self, _account: Address) -> anyhow::Result<U256> {
            Ok(U256::ZERO)
        }
    }

    /// One scripted metadata fetch. `started` fires when the fetch begins;
    /// `gate` holds the fetch open until the test releases it.
    struct FakeMarketCall {
        started: Option<oneshot::Sender<()>>,
        gate: Option<oneshot::Receiver<()>>,
        response: Result<GovernedMarkets, ApiError>,
    }

    impl FakeMarketCall {
        fn ready(response: Result<GovernedMarkets, ApiError>) -> Self {
            Self {
                started: None,
                gate: None,
                response,
            }
        }
    }

    struct FakeMarketData {
        queue: Mutex<VecDeque<FakeMarketCall>>,
    }

    impl FakeMarketData {
        fn scripted(calls: Vec<FakeMarketCall>) -> Self {
            Self {
                queue: Mutex::new(calls.into()),
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for FakeMarketData {
        async fn get_governed_markets(&self) -> Result<GovernedMarkets, ApiError> {
            let call = self
                .queue
                .lock()
                .await
                .pop_front()
                .expect("unexpected metadata fetch");
            if let Some(started) = call.started {
                let _ = started.send(());
            }
            if let Some(gate) = call.gate {
                let _ = gate.await;
            }
            call.response
        }
    }

    fn default_lens() -> (FakeLens, Arc<AtomicBool>) {
        let fail = Arc::new(AtomicBool::new(false));
        let lens = FakeLens {
            account_records: vec![record(0x01, 50, 10, 2), record(0x05, 7, 0, 0)],
            treasury_records: vec![record(0x01, 5, 0, 0), record(0x05, 0, 0, 0)],
            fail: fail.clone(),
        };
        (lens, fail)
    }

    fn make_engine(
        comptroller: FakeComptroller,
        lens: FakeLens,
        market_data: FakeMarketData,
    ) -> AggregationEngine<FakeComptroller, FakeLens, FakeMarketData> {
        AggregationEngine::new(comptroller, lens, market_data, registry(), TREASURY)
    }

    #[tokio::test]
    async fn refresh_without_account_uses_defaults() {
        let (lens, _) = default_lens();
        let engine = make_engine(
            FakeComptroller::default(),
            lens,
            FakeMarketData::scripted(vec![FakeMarketCall::ready(Ok(governed(1.0)))]),
        );

        let outcome = engine.refresh(None).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Published);

        let snapshot = engine.latest();
        assert_eq!(snapshot.daily_xvs, 1.0);
        assert_eq!(snapshot.assets.len(), 2);
        for asset in &snapshot.assets {
            assert!(asset.wallet_balance.is_zero());
            assert!(!asset.collateral);
            assert!(!asset.is_enabled);
            assert_eq!(asset.hypothetical_liquidity, merge::zero_liquidity());
            assert_eq!(asset.percent_of_limit, "0");
        }
        // Treasury holds 5 USDC at $1; user totals stay zero.
        assert_eq!(snapshot.treasury_total_usd_balance, BigDecimal::from(5));
        assert!(snapshot.user_total_borrow_limit.is_zero());
        assert!(snapshot.user_total_borrow_balance.is_zero());
        assert!(snapshot.user_xvs_balance.is_zero());
        assert!(snapshot.published_at.is_some());
    }

    #[tokio::test]
    async fn refresh_with_account_derives_user_totals() {
        let (lens, _) = default_lens();
        let comptroller = FakeComptroller {
            assets_in: vec![vtoken(0x01)],
            minted_vai: to_wei(1),
            liquidity: ["0", "123", "0"],
        };
        let engine = make_engine(
            comptroller,
            lens,
            FakeMarketData::scripted(vec![FakeMarketCall::ready(Ok(governed(1.0)))]),
        );

        let outcome = engine.refresh(Some(ACCOUNT)).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Published);

        let snapshot = engine.latest();
        let usdc = &snapshot.assets[0];
        assert!(usdc.collateral);
        assert_eq!(usdc.supply_balance, BigDecimal::from(10));
        assert_eq!(usdc.borrow_balance, BigDecimal::from(2));
        assert_eq!(usdc.hypothetical_liquidity, ["0", "123", "0"].map(str::to_string));

        // Limit: 10 USDC supplied at $1 with factor 0.5. Borrow balance:
        // 2 USDC borrowed plus 1 minted VAI. Percent: 2 / 5 * 100.
        assert_eq!(snapshot.user_total_borrow_limit, BigDecimal::from(5));
        assert_eq!(snapshot.user_total_borrow_balance, BigDecimal::from(3));
        assert_eq!(usdc.percent_of_limit, "40");
        assert_eq!(snapshot.user_xvs_balance, BigDecimal::from(7));
    }

    #[tokio::test]
    async fn superseded_tick_never_overwrites_newer_snapshot() {
        let (started_tx, started_rx) = oneshot::channel();
        let (gate_tx, gate_rx) = oneshot::channel();

        let (lens, _) = default_lens();
        let engine = Arc::new(make_engine(
            FakeComptroller::default(),
            lens,
            FakeMarketData::scripted(vec![
                FakeMarketCall {
                    started: Some(started_tx),
                    gate: Some(gate_rx),
                    response: Ok(governed(1.0)),
                },
                FakeMarketCall::ready(Ok(governed(2.0))),
            ]),
        ));

        let slow = tokio::spawn({
            let engine = engine.clone();
            async move { engine.refresh(None).await }
        });
        started_rx.await.unwrap();

        // A newer tick starts and completes while the first is held open.
        let outcome = engine.refresh(None).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Published);
        assert_eq!(engine.latest().daily_xvs, 2.0);

        gate_tx.send(()).unwrap();
        let slow_outcome = slow.await.unwrap().unwrap();
        assert_eq!(slow_outcome, PublishOutcome::Superseded);

        // The stale result never replaced the newer snapshot.
        assert_eq!(engine.latest().daily_xvs, 2.0);
    }

    #[tokio::test]
    async fn publish_guard_rejects_old_generation() {
        let (lens, _) = default_lens();
        let engine = make_engine(
            FakeComptroller::default(),
            lens,
            FakeMarketData::scripted(vec![FakeMarketCall::ready(Ok(governed(2.0)))]),
        );

        engine.refresh(None).await.unwrap();
        let current = engine.latest();

        // A tick from an older generation must lose the guarded publish even
        // when it reaches publication after the newer one.
        let stale_tick = engine.latest_tick.load(Ordering::SeqCst) - 1;
        let stale = AggregateSnapshot {
            daily_xvs: 1.0,
            ..AggregateSnapshot::default()
        };
        let outcome = engine.publish_if_latest(stale_tick, stale);

        assert_eq!(outcome, PublishOutcome::Superseded);
        assert_eq!(*engine.latest(), *current);
    }

    #[tokio::test]
    async fn metadata_failure_reuses_cached_markets() {
        let (lens, _) = default_lens();
        let engine = make_engine(
            FakeComptroller::default(),
            lens,
            FakeMarketData::scripted(vec![
                FakeMarketCall::ready(Ok(governed(1.0))),
                FakeMarketCall::ready(Err(ApiError::Rejected)),
            ]),
        );

        engine.refresh(None).await.unwrap();
        let outcome = engine.refresh(None).await.unwrap();

        assert_eq!(outcome, PublishOutcome::Published);
        assert_eq!(engine.latest().daily_xvs, 1.0);
    }

    #[tokio::test]
    async fn metadata_failure_without_cache_is_an_error() {
        let (lens, _) = default_lens();
        let engine = make_engine(
            FakeComptroller::default(),
            lens,
            FakeMarketData::scripted(vec![FakeMarketCall::ready(Err(ApiError::Rejected))]),
        );

        let result = engine.refresh(None).await;
        assert!(matches!(result, Err(RefreshError::MarketData(_))));
        assert!(engine.latest().published_at.is_none());
    }

    #[tokio::test]
    async fn failed_tick_keeps_previous_snapshot() {
        let (lens, fail) = default_lens();
        let engine = make_engine(
            FakeComptroller::default(),
            lens,
            FakeMarketData::scripted(vec![
                FakeMarketCall::ready(Ok(governed(1.0))),
                FakeMarketCall::ready(Ok(governed(2.0))),
            ]),
        );

        engine.refresh(None).await.unwrap();
        let first = engine.latest();

        fail.store(true, Ordering::Relaxed);
        let result = engine.refresh(None).await;
        assert!(matches!(result, Err(RefreshError::Rpc(_))));

        let after = engine.latest();
        assert_eq!(after.daily_xvs, 1.0);
        assert_eq!(after.published_at, first.published_at);
    }
}
