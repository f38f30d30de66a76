use crate::data_sync::ledger::LedgerClient;
use crate::swap_error::{Result, SwapError};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const GWEI: u128 = 1_000_000_000;

/// Effective gas price from an explicit override or the network suggestion, bounded by floor and ceiling.
#[derive(Clone)]
pub struct GasPolicy {
    ledger: Arc<dyn LedgerClient>,
    floor_gwei: u64,
    ceiling_gwei: u64,
    last_good: Arc<Mutex<Option<u128>>>,
}

impl GasPolicy {
    pub fn new(ledger: Arc<dyn LedgerClient>, floor_gwei: u64, ceiling_gwei: u64) -> Self {
        Self { ledger, floor_gwei, ceiling_gwei, last_good: Arc::new(Mutex::new(None)) }
    }

    pub fn floor_wei(&self) -> u128 {
        self.floor_gwei as u128 * GWEI
    }

    pub fn ceiling_wei(&self) -> u128 {
        self.ceiling_gwei as u128 * GWEI
    }

    pub fn last_good(&self) -> Option<u128> {
        self.last_good.lock().ok().and_then(|guard| *guard)
    }

    /// Gas price in wei.
    ///
    /// An override above the ceiling is rejected. Without an override the network suggestion is
    /// used. A missing or below-floor suggestion falls back to the floor. A failed query reuses the
    /// last network price when there is one, else the floor.
    pub async fn effective_gas_price(&self, override_gwei: Option<u64>) -> Result<u128> {
        if let Some(gwei) = override_gwei {
            if gwei > self.ceiling_gwei {
                return Err(SwapError::GasPriceTooHigh { requested_gwei: gwei, ceiling_gwei: self.ceiling_gwei });
            }
            return Ok(gwei as u128 * GWEI);
        }

        let floor = self.floor_wei();
        match self.ledger.suggest_gas_price().await {
            Ok(Some(price)) if price >= floor => {
                if let Ok(mut guard) = self.last_good.lock() {
                    *guard = Some(price);
                }
                Ok(price)
            }
            Ok(Some(price)) => {
                debug!(price, floor, "Network gas price below floor");
                Ok(floor)
            }
            Ok(None) => Ok(floor),
            Err(err) => match self.last_good() {
                Some(price) => {
                    warn!(error = %err, price, "Gas price unavailable, reusing last network price");
                    Ok(price)
                }
                None => {
                    warn!(error = %err, "Gas price unavailable, using floor");
                    Ok(floor)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::mock_ledger::MockLedger;

    fn policy(gas_price: Option<u128>) -> GasPolicy {
        GasPolicy::new(Arc::new(MockLedger::new().with_gas_price(gas_price)), 1, 10_000)
    }

    #[tokio::test]
    async fn test_network_price_used_above_floor() -> eyre::Result<()> {
        assert_eq!(policy(Some(5 * GWEI)).effective_gas_price(None).await?, 5 * GWEI);
        Ok(())
    }

    #[tokio::test]
    async fn test_floor_fallback() -> eyre::Result<()> {
        assert_eq!(policy(Some(GWEI / 2)).effective_gas_price(None).await?, GWEI);
        assert_eq!(policy(None).effective_gas_price(None).await?, GWEI);
        Ok(())
    }

    #[tokio::test]
    async fn test_override() -> eyre::Result<()> {
        let policy = policy(Some(5 * GWEI));
        assert_eq!(policy.effective_gas_price(Some(20)).await?, 20 * GWEI);
        assert_eq!(policy.effective_gas_price(Some(10_000)).await?, 10_000 * GWEI);
        assert!(matches!(
            policy.effective_gas_price(Some(10_001)).await,
            Err(SwapError::GasPriceTooHigh { requested_gwei: 10_001, ceiling_gwei: 10_000 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_last_good_recorded() -> eyre::Result<()> {
        let policy = policy(Some(3 * GWEI));
        assert_eq!(policy.last_good(), None);
        policy.effective_gas_price(None).await?;
        assert_eq!(policy.last_good(), Some(3 * GWEI));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_query_reuses_last_network_price() -> eyre::Result<()> {
        let ledger = Arc::new(MockLedger::new().with_gas_price(Some(3 * GWEI)));
        let policy = GasPolicy::new(ledger.clone(), 1, 10_000);

        ledger.set_gas_price_down(true);
        assert_eq!(policy.effective_gas_price(None).await?, GWEI);

        ledger.set_gas_price_down(false);
        assert_eq!(policy.effective_gas_price(None).await?, 3 * GWEI);

        ledger.set_gas_price_down(true);
        assert_eq!(policy.effective_gas_price(None).await?, 3 * GWEI);
        assert_eq!(policy.last_good(), Some(3 * GWEI));
        Ok(())
    }
}
