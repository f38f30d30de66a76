use crate::data_sync::ledger::LedgerClient;
use crate::data_sync::pool::{Pool, PoolHandle};
use crate::swap_error::{Result, SwapError};
use crate::utils::{PairKey, PoolCache};
use alloy_primitives::Address;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// AMM router with its lazily resolved factory and a pool cache scoped to it.
#[derive(Debug)]
pub struct Venue {
    name: String,
    router: Address,
    factory: OnceCell<Address>,
    pools: PoolCache,
}

pub type VenueWrapper = Arc<Venue>;

impl Venue {
    pub fn new(name: impl Into<String>, router: Address, pool_cache_capacity: usize) -> Self {
        Self { name: name.into(), router, factory: OnceCell::new(), pools: PoolCache::new(pool_cache_capacity) }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_router(&self) -> Address {
        self.router
    }

    pub fn pool_cache(&self) -> &PoolCache {
        &self.pools
    }

    /// Factory behind the router, fetched on first use. Concurrent first callers share one fetch.
    pub async fn factory(&self, ledger: &dyn LedgerClient) -> Result<Address> {
        let factory = self
            .factory
            .get_or_try_init(|| async {
                let factory = ledger.router_factory(self.router).await?;
                debug!(router = %self.router, %factory, "Resolved venue factory");
                Ok::<_, SwapError>(factory)
            })
            .await?;
        Ok(*factory)
    }

    /// Pool for the unordered pair, served from the cache when present.
    ///
    /// Concurrent misses for the same pair may each query the factory; the last insert wins.
    pub async fn resolve_pool(&self, ledger: &dyn LedgerClient, token_a: Address, token_b: Address) -> Result<PoolHandle> {
        if token_a == token_b {
            return Err(SwapError::InvalidPath(format!("pair of identical tokens {token_a}")));
        }
        if let Some(pool) = self.pools.get(token_a, token_b) {
            return Ok(pool);
        }

        let factory = self.factory(ledger).await?;
        let address = match ledger.get_pool_pair(factory, token_a, token_b).await? {
            Some(address) if !address.is_zero() => address,
            _ => {
                return Err(SwapError::NotFound(format!("pool for {token_a}/{token_b} on {}", self.name)));
            }
        };

        let (token0, token1) = ledger.pool_tokens(address).await?;
        if token0 == token1 || PairKey::new(token0, token1) != PairKey::new(token_a, token_b) {
            return Err(SwapError::PairMismatch { pool: address, token_in: token_a, token_out: token_b });
        }

        let pool: PoolHandle = Arc::new(Pool::new(token0, token1, address));
        if let Some(evicted) = self.pools.insert(pool.clone()) {
            debug!(venue = %self.name, ?evicted, "Evicted pool from cache");
        }
        Ok(pool)
    }
}

impl Display for Venue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::mock_ledger::MockLedger;
    use alloy_primitives::U256;

    const ROUTER: Address = Address::repeat_byte(0x10);
    const FACTORY: Address = Address::repeat_byte(0x11);
    const POOL: Address = Address::repeat_byte(0x12);
    const T1: Address = Address::repeat_byte(0x01);
    const T2: Address = Address::repeat_byte(0x02);

    fn ledger() -> MockLedger {
        MockLedger::new().with_venue(ROUTER, FACTORY).with_pool(FACTORY, POOL, T2, T1, U256::from(1u64), U256::from(1u64))
    }

    #[tokio::test]
    async fn test_resolve_pool_caches_pair() -> eyre::Result<()> {
        let ledger = ledger();
        let venue = Venue::new("Test", ROUTER, 10);

        let pool = venue.resolve_pool(&ledger, T1, T2).await?;
        assert_eq!(pool.address, POOL);
        assert_eq!(pool.get_tokens(), (T2, T1));

        let again = venue.resolve_pool(&ledger, T2, T1).await?;
        assert_eq!(again.address, POOL);
        assert_eq!(ledger.pair_lookups(), 1);
        assert_eq!(ledger.factory_lookups(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_pool_is_not_found() {
        let ledger = ledger();
        let venue = Venue::new("Test", ROUTER, 10);
        let result = venue.resolve_pool(&ledger, T1, Address::repeat_byte(0x03)).await;
        assert!(matches!(result, Err(SwapError::NotFound(_))));
        assert!(venue.pool_cache().is_empty());
    }

    #[tokio::test]
    async fn test_factory_fetched_once_across_pairs() -> eyre::Result<()> {
        let t3 = Address::repeat_byte(0x03);
        let ledger = ledger().with_pool(FACTORY, Address::repeat_byte(0x13), T1, t3, U256::from(1u64), U256::from(1u64));
        let venue = Venue::new("Test", ROUTER, 0);

        venue.resolve_pool(&ledger, T1, T2).await?;
        venue.resolve_pool(&ledger, T1, t3).await?;
        venue.resolve_pool(&ledger, T1, T2).await?;

        assert_eq!(ledger.factory_lookups(), 1);
        // capacity 0 never caches
        assert_eq!(ledger.pair_lookups(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_router_is_not_found() {
        let ledger = ledger();
        let venue = Venue::new("Ghost", Address::repeat_byte(0x99), 10);
        assert!(matches!(venue.factory(&ledger).await, Err(SwapError::NotFound(_))));
    }
}
