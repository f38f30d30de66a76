use crate::data_sync::ledger::LedgerClient;
use crate::data_sync::pool::ReserveSnapshot;
use crate::data_sync::venue::VenueWrapper;
use crate::logic::selector::ReserveImpact;
use crate::logic::slippage;
use crate::swap_error::{Result, SwapError};
use crate::utils::{TokenWrapper, units};
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Executable output for one venue at the moment of the query. Immutable once produced.
#[derive(Clone, Debug)]
pub struct Quote {
    pub venue: VenueWrapper,
    pub token_in: TokenWrapper,
    pub token_out: TokenWrapper,
    pub amount_in: U256,
    pub amount_out: U256,
    pub reserves: ReserveSnapshot,
}

impl Quote {
    pub fn amount_in_decimal(&self) -> Result<Decimal> {
        self.token_in.to_decimal(self.amount_in)
    }

    pub fn amount_out_decimal(&self) -> Result<Decimal> {
        self.token_out.to_decimal(self.amount_out)
    }

    /// Natural units of output per natural unit of input.
    pub fn rate(&self) -> Result<Decimal> {
        units::ratio(self.amount_out, self.token_out.get_decimals(), self.amount_in, self.token_in.get_decimals())
    }

    /// Unit price expressed in `reference`, which must be one of the two quoted tokens.
    ///
    /// Computed on integer units, so high-supply tokens price as well as small ones.
    pub fn price(&self, reference: Address) -> Result<Decimal> {
        let (amount_in, decimals_in) = (self.amount_in, self.token_in.get_decimals());
        let (amount_out, decimals_out) = (self.amount_out, self.token_out.get_decimals());
        if reference == self.token_in.get_address() {
            units::ratio(amount_in, decimals_in, amount_out, decimals_out)
        } else if reference == self.token_out.get_address() {
            units::ratio(amount_out, decimals_out, amount_in, decimals_in)
        } else {
            Err(SwapError::InvalidPath(format!(
                "reference {reference} is neither {} nor {}",
                self.token_in, self.token_out
            )))
        }
    }

    pub fn min_amount_out(&self, slippage_percent: Decimal) -> Result<U256> {
        slippage::min_amount_out(self.amount_out, slippage_percent)
    }

    pub fn impact(&self) -> ReserveImpact {
        ReserveImpact::assess(self.amount_in, self.reserves.reserve_in)
    }

    /// Input amount as a percentage of the input-side reserve.
    pub fn impact_percent(&self) -> Result<Decimal> {
        units::ratio(self.amount_in, 0, self.reserves.reserve_in, 0)?
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| SwapError::Conversion(format!("{} is too large", self.amount_in)))
    }
}

/// Fetches reserves and asks the venue for the executable output.
///
/// The constant-product formula is not recomputed locally; the router's answer is trusted.
#[derive(Clone)]
pub struct QuoteEngine {
    ledger: Arc<dyn LedgerClient>,
    timeout: Duration,
}

impl QuoteEngine {
    pub fn new(ledger: Arc<dyn LedgerClient>, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub async fn quote(
        &self,
        venue: &VenueWrapper,
        token_in: &TokenWrapper,
        token_out: &TokenWrapper,
        amount_in: U256,
    ) -> Result<Quote> {
        tokio::time::timeout(self.timeout, self.fetch_quote(venue, token_in, token_out, amount_in))
            .await
            .map_err(|_| SwapError::timeout(format!("quote on {venue}"), None))?
    }

    async fn fetch_quote(
        &self,
        venue: &VenueWrapper,
        token_in: &TokenWrapper,
        token_out: &TokenWrapper,
        amount_in: U256,
    ) -> Result<Quote> {
        if amount_in.is_zero() {
            return Err(SwapError::InvalidAmount("cannot quote a zero input".to_string()));
        }
        let reserves = self.fetch_reserves(venue, token_in.get_address(), token_out.get_address()).await?;

        let amount_out = self
            .ledger
            .get_amount_out(venue.get_router(), amount_in, reserves.reserve_in, reserves.reserve_out)
            .await?;
        if amount_out.is_zero() {
            return Err(SwapError::ContractLogic(format!("{venue} quoted zero output for {amount_in}")));
        }

        debug!(venue = %venue, pool = %reserves.pool, %amount_in, %amount_out, "Quoted");
        Ok(Quote {
            venue: venue.clone(),
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount_in,
            amount_out,
            reserves,
        })
    }

    async fn fetch_reserves(&self, venue: &VenueWrapper, token_a: Address, token_b: Address) -> Result<ReserveSnapshot> {
        let pool = venue.resolve_pool(self.ledger.as_ref(), token_a, token_b).await?;
        let raw = self.ledger.get_reserves(pool.address).await?;
        pool.oriented(&raw, token_a, token_b)
    }

    /// Reserves oriented to the caller's `(token_a, token_b)` order.
    pub async fn reserves(&self, venue: &VenueWrapper, token_a: Address, token_b: Address) -> Result<ReserveSnapshot> {
        tokio::time::timeout(self.timeout, self.fetch_reserves(venue, token_a, token_b))
            .await
            .map_err(|_| SwapError::timeout(format!("reserves on {venue}"), None))?
    }

    pub async fn reserves_decimal(
        &self,
        venue: &VenueWrapper,
        token_a: &TokenWrapper,
        token_b: &TokenWrapper,
    ) -> Result<(Decimal, Decimal)> {
        let snapshot = self.reserves(venue, token_a.get_address(), token_b.get_address()).await?;
        Ok((token_a.to_decimal(snapshot.reserve_in)?, token_b.to_decimal(snapshot.reserve_out)?))
    }
}
