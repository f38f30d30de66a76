use crate::data_sync::venue::VenueWrapper;
use crate::logic::quote::{Quote, QuoteEngine};
use crate::swap_error::{Result, SwapError};
use crate::utils::TokenWrapper;
use alloy_primitives::{Address, U256};
use futures::{StreamExt, stream};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, info, warn};

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Disposing of a token for a reference token, highest price wins
    Sell,
    /// Lowest price wins
    Buy,
}

/// Trade direction and whether it came from the reference-list position heuristic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DirectionInference {
    pub direction: TradeDirection,
    pub heuristic: bool,
}

/// Sell when only the output token is a reference token.
///
/// When both tokens are reference tokens the one listed earlier counts as the more fundamental
/// asset. That case is a heuristic and the ranking may be upside down.
pub fn infer_direction(reference_tokens: &[Address], token_in: Address, token_out: Address) -> DirectionInference {
    let in_pos = reference_tokens.iter().position(|t| *t == token_in);
    let out_pos = reference_tokens.iter().position(|t| *t == token_out);
    match (in_pos, out_pos) {
        (None, Some(_)) => DirectionInference { direction: TradeDirection::Sell, heuristic: false },
        (Some(in_pos), Some(out_pos)) => {
            let direction = if out_pos < in_pos { TradeDirection::Sell } else { TradeDirection::Buy };
            DirectionInference { direction, heuristic: true }
        }
        _ => DirectionInference { direction: TradeDirection::Buy, heuristic: false },
    }
}

/// Token prices are expressed in: the output token when it is a reference token, else the input token.
pub fn reference_token_for(reference_tokens: &[Address], token_in: Address, token_out: Address) -> Address {
    if reference_tokens.contains(&token_out) { token_out } else { token_in }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReserveImpact {
    Acceptable,
    /// Input is more than 1% of the input-side reserve
    Warning,
    /// Input exceeds the input-side reserve, or the pool is empty
    Exceeded,
}

impl ReserveImpact {
    pub fn assess(amount_in: U256, reserve_in: U256) -> Self {
        if reserve_in.is_zero() || amount_in > reserve_in {
            ReserveImpact::Exceeded
        } else if amount_in.saturating_mul(U256::from(100u64)) > reserve_in {
            ReserveImpact::Warning
        } else {
            ReserveImpact::Acceptable
        }
    }

    pub fn passes(&self) -> bool {
        *self != ReserveImpact::Exceeded
    }
}

#[derive(Clone, Debug)]
pub struct RankedQuote {
    pub quote: Quote,
    pub price: Decimal,
    /// Signed distance from the best price, in percent
    pub diff_percent: Decimal,
    pub impact: ReserveImpact,
    pub impact_percent: Option<Decimal>,
}

impl RankedQuote {
    pub fn venue(&self) -> &VenueWrapper {
        &self.quote.venue
    }
}

#[derive(Clone, Debug)]
pub struct FailedVenue {
    pub venue: VenueWrapper,
    pub reason: String,
}

/// Outcome of a venue selection, with the full ranking for reporting.
#[derive(Clone, Debug)]
pub struct Selection {
    pub direction: TradeDirection,
    pub reference_token: Address,
    pub chosen: RankedQuote,
    pub ranked: Vec<RankedQuote>,
    pub failed: Vec<FailedVenue>,
}

impl Selection {
    pub fn venue(&self) -> &VenueWrapper {
        self.chosen.venue()
    }

    pub fn quote(&self) -> &Quote {
        &self.chosen.quote
    }

    pub fn price(&self) -> Decimal {
        self.chosen.price
    }

    pub fn impact(&self) -> ReserveImpact {
        self.chosen.impact
    }
}

/// Fans quotes out across venues with a bounded worker count and picks the best executable one.
#[derive(Clone)]
pub struct VenueSelector {
    engine: QuoteEngine,
    reference_tokens: Vec<Address>,
    worker_pool_size: usize,
}

impl VenueSelector {
    pub fn new(engine: QuoteEngine, reference_tokens: Vec<Address>, worker_pool_size: usize) -> Self {
        Self { engine, reference_tokens, worker_pool_size: worker_pool_size.max(1) }
    }

    pub fn engine(&self) -> &QuoteEngine {
        &self.engine
    }

    pub fn infer_direction(&self, token_in: Address, token_out: Address) -> DirectionInference {
        infer_direction(&self.reference_tokens, token_in, token_out)
    }

    pub fn reference_token_for(&self, token_in: Address, token_out: Address) -> Address {
        reference_token_for(&self.reference_tokens, token_in, token_out)
    }

    /// Selection with the direction inferred from the reference-token list.
    pub async fn select(
        &self,
        venues: &[VenueWrapper],
        token_in: &TokenWrapper,
        token_out: &TokenWrapper,
        amount_in: U256,
    ) -> Result<Selection> {
        let inference = self.infer_direction(token_in.get_address(), token_out.get_address());
        if inference.heuristic {
            warn!(
                %token_in, %token_out, direction = %inference.direction,
                "Both tokens are reference tokens, best and worst prices might be upside down"
            );
        }
        self.select_best(venues, token_in, token_out, amount_in, inference.direction).await
    }

    /// Quotes every venue, drops the ones that fail, ranks the rest by price and returns
    /// the first one whose reserves can absorb `amount_in`.
    ///
    /// Ties keep the order of `venues`.
    pub async fn select_best(
        &self,
        venues: &[VenueWrapper],
        token_in: &TokenWrapper,
        token_out: &TokenWrapper,
        amount_in: U256,
        direction: TradeDirection,
    ) -> Result<Selection> {
        let reference_token = self.reference_token_for(token_in.get_address(), token_out.get_address());

        let mut results: Vec<(usize, Result<Quote>)> = stream::iter(venues.iter().enumerate())
            .map(|(idx, venue)| async move { (idx, self.engine.quote(venue, token_in, token_out, amount_in).await) })
            .buffer_unordered(self.worker_pool_size)
            .collect()
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        let mut failed = Vec::new();
        let mut ranked = Vec::with_capacity(results.len());
        for (idx, result) in results {
            let venue = &venues[idx];
            match result.and_then(|quote| Self::rank_entry(quote, reference_token)) {
                Ok(entry) => ranked.push(entry),
                Err(err) => {
                    warn!(venue = %venue, error = %err, "Venue dropped from selection");
                    failed.push(FailedVenue { venue: venue.clone(), reason: err.to_string() });
                }
            }
        }

        match direction {
            TradeDirection::Sell => ranked.sort_by(|a, b| b.price.cmp(&a.price)),
            TradeDirection::Buy => ranked.sort_by(|a, b| a.price.cmp(&b.price)),
        }

        if let Some(best) = ranked.first().map(|r| r.price) {
            for entry in ranked.iter_mut() {
                entry.diff_percent = (entry.price - best)
                    .checked_mul(Decimal::ONE_HUNDRED)
                    .and_then(|v| v.checked_div(best))
                    .unwrap_or_default();
            }
        }

        for entry in &ranked {
            debug!(
                venue = %entry.venue(), price = %entry.price, diff_percent = %entry.diff_percent,
                impact = %entry.impact, "Ranked venue"
            );
        }

        let Some(chosen) = ranked.iter().find(|r| r.impact.passes()).cloned() else {
            return Err(SwapError::NoSuitableVenue { attempted: venues.len(), answered: ranked.len() });
        };
        if chosen.impact == ReserveImpact::Warning {
            warn!(venue = %chosen.venue(), impact_percent = ?chosen.impact_percent, "Swap takes a large share of reserves");
        }
        info!(venue = %chosen.venue(), price = %chosen.price, %direction, "Selected venue");

        Ok(Selection { direction, reference_token, chosen, ranked, failed })
    }

    /// Quotes one venue. Errors propagate unchanged and the reserve guard still applies.
    pub async fn evaluate(
        &self,
        venue: &VenueWrapper,
        token_in: &TokenWrapper,
        token_out: &TokenWrapper,
        amount_in: U256,
    ) -> Result<Selection> {
        let direction = self.infer_direction(token_in.get_address(), token_out.get_address()).direction;
        let reference_token = self.reference_token_for(token_in.get_address(), token_out.get_address());
        let quote = self.engine.quote(venue, token_in, token_out, amount_in).await?;
        let chosen = Self::rank_entry(quote, reference_token)?;
        if !chosen.impact.passes() {
            warn!(venue = %venue, impact_percent = ?chosen.impact_percent, "Swap exceeds pool reserves");
            return Err(SwapError::NoSuitableVenue { attempted: 1, answered: 1 });
        }
        Ok(Selection { direction, reference_token, chosen: chosen.clone(), ranked: vec![chosen], failed: vec![] })
    }

    fn rank_entry(quote: Quote, reference_token: Address) -> Result<RankedQuote> {
        let price = quote.price(reference_token)?;
        let impact = quote.impact();
        let impact_percent = quote.impact_percent().ok();
        Ok(RankedQuote { quote, price, diff_percent: Decimal::ZERO, impact, impact_percent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::mock_ledger::MockLedger;
    use crate::data_sync::venue::Venue;
    use crate::utils::Token;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    const TOKEN: Address = Address::repeat_byte(0x01);
    const REF: Address = Address::repeat_byte(0x02);
    const OTHER_REF: Address = Address::repeat_byte(0x03);

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn router(i: u8) -> Address {
        Address::with_last_byte(0x10 + i)
    }

    /// One venue per `(reserve_token, reserve_ref)` entry, each with its own factory and pool.
    fn setup(reserves: &[(U256, U256)]) -> (VenueSelector, Vec<VenueWrapper>, Arc<MockLedger>) {
        let mut ledger = MockLedger::new();
        let mut venues = Vec::new();
        for (i, (reserve_token, reserve_ref)) in reserves.iter().enumerate() {
            let i = i as u8;
            let factory = Address::with_last_byte(0x40 + i);
            ledger = ledger.with_venue(router(i), factory).with_pool(
                factory,
                Address::with_last_byte(0x80 + i),
                TOKEN,
                REF,
                *reserve_token,
                *reserve_ref,
            );
            venues.push(Arc::new(Venue::new(format!("venue{i}"), router(i), 10)));
        }
        let ledger = Arc::new(ledger);
        let engine = QuoteEngine::new(ledger.clone(), Duration::from_secs(5));
        (VenueSelector::new(engine, vec![REF, OTHER_REF], 10), venues, ledger)
    }

    fn tokens() -> (TokenWrapper, TokenWrapper) {
        (Arc::new(Token::new(TOKEN, 18)), Arc::new(Token::new(REF, 18)))
    }

    // prices of 0.09, 0.10 and 0.11 REF per TOKEN
    fn three_venues() -> (VenueSelector, Vec<VenueWrapper>, Arc<MockLedger>) {
        setup(&[(e18(1000), e18(90)), (e18(1000), e18(100)), (e18(1000), e18(110))])
    }

    #[test]
    fn test_infer_direction() {
        let refs = [REF, OTHER_REF];
        assert_eq!(infer_direction(&refs, TOKEN, REF).direction, TradeDirection::Sell);
        assert_eq!(infer_direction(&refs, REF, TOKEN).direction, TradeDirection::Buy);
        assert_eq!(infer_direction(&refs, TOKEN, Address::repeat_byte(9)).direction, TradeDirection::Buy);

        let both = infer_direction(&refs, OTHER_REF, REF);
        assert_eq!(both, DirectionInference { direction: TradeDirection::Sell, heuristic: true });
        assert_eq!(infer_direction(&refs, REF, OTHER_REF).direction, TradeDirection::Buy);
    }

    #[test]
    fn test_reference_token_choice() {
        let refs = [REF];
        assert_eq!(reference_token_for(&refs, TOKEN, REF), REF);
        assert_eq!(reference_token_for(&refs, REF, TOKEN), REF);
        assert_eq!(reference_token_for(&refs, TOKEN, OTHER_REF), TOKEN);
    }

    #[test]
    fn test_reserve_impact() {
        assert_eq!(ReserveImpact::assess(U256::from(1u64), U256::from(1000u64)), ReserveImpact::Acceptable);
        assert_eq!(ReserveImpact::assess(U256::from(10u64), U256::from(1000u64)), ReserveImpact::Acceptable);
        assert_eq!(ReserveImpact::assess(U256::from(11u64), U256::from(1000u64)), ReserveImpact::Warning);
        assert_eq!(ReserveImpact::assess(U256::from(1000u64), U256::from(1000u64)), ReserveImpact::Warning);
        assert_eq!(ReserveImpact::assess(U256::from(1500u64), U256::from(1000u64)), ReserveImpact::Exceeded);
        assert_eq!(ReserveImpact::assess(U256::from(1u64), U256::ZERO), ReserveImpact::Exceeded);
    }

    #[tokio::test]
    async fn test_sell_picks_highest_price() -> eyre::Result<()> {
        let (selector, venues, _) = three_venues();
        let (token, reference) = tokens();
        let selection = selector.select_best(&venues, &token, &reference, e18(1), TradeDirection::Sell).await?;

        assert_eq!(selection.venue().get_router(), router(2));
        assert_eq!(selection.reference_token, REF);
        let prices: Vec<_> = selection.ranked.iter().map(|r| r.price.round_dp(2)).collect();
        assert_eq!(prices, vec![dec!(0.11), dec!(0.10), dec!(0.09)]);
        assert_eq!(selection.ranked[0].diff_percent, Decimal::ZERO);
        assert!(selection.ranked[2].diff_percent < Decimal::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_buy_picks_lowest_price() -> eyre::Result<()> {
        let (selector, venues, _) = three_venues();
        let (token, reference) = tokens();
        let selection = selector.select_best(&venues, &token, &reference, e18(1), TradeDirection::Buy).await?;
        assert_eq!(selection.venue().get_router(), router(0));
        assert_eq!(selection.price().round_dp(2), dec!(0.09));
        Ok(())
    }

    #[tokio::test]
    async fn test_inferred_direction_sells_into_reference() -> eyre::Result<()> {
        let (selector, venues, _) = three_venues();
        let (token, reference) = tokens();
        let selection = selector.select(&venues, &token, &reference, e18(1)).await?;
        assert_eq!(selection.direction, TradeDirection::Sell);
        assert_eq!(selection.venue().get_router(), router(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_ties_keep_configured_order() -> eyre::Result<()> {
        let (selector, venues, _) = setup(&[(e18(1000), e18(100)), (e18(1000), e18(100)), (e18(1000), e18(100))]);
        let (token, reference) = tokens();
        for direction in [TradeDirection::Sell, TradeDirection::Buy] {
            let selection = selector.select_best(&venues, &token, &reference, e18(1), direction).await?;
            assert_eq!(selection.venue().get_router(), router(0));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_guard_rejects_shallow_pool_but_selection_succeeds() -> eyre::Result<()> {
        // venue0 has the best price but only 10 TOKEN of reserve, 15 is 150% of it
        let (selector, venues, _) = setup(&[(e18(10), e18(2)), (e18(1000), e18(100))]);
        let (token, reference) = tokens();
        let selection = selector.select_best(&venues, &token, &reference, e18(15), TradeDirection::Sell).await?;

        assert_eq!(selection.venue().get_router(), router(1));
        assert_eq!(selection.ranked.len(), 2);
        let shallow = selection.ranked.iter().find(|r| r.venue().get_router() == router(0));
        assert_eq!(shallow.map(|r| r.impact), Some(ReserveImpact::Exceeded));
        assert_eq!(shallow.and_then(|r| r.impact_percent), Some(dec!(150)));
        Ok(())
    }

    #[tokio::test]
    async fn test_guard_rejecting_every_venue_fails() {
        let (selector, venues, _) = setup(&[(e18(10), e18(2))]);
        let (token, reference) = tokens();
        let result = selector.select_best(&venues, &token, &reference, e18(15), TradeDirection::Sell).await;
        assert!(matches!(result, Err(SwapError::NoSuitableVenue { attempted: 1, answered: 1 })));
    }

    #[tokio::test]
    async fn test_failed_venues_are_dropped() -> eyre::Result<()> {
        let (selector, mut venues, _) = three_venues();
        // a venue the ledger does not know
        venues.push(Arc::new(Venue::new("ghost", Address::repeat_byte(0x99), 10)));
        let (token, reference) = tokens();

        let selection = selector.select_best(&venues, &token, &reference, e18(1), TradeDirection::Sell).await?;
        assert_eq!(selection.ranked.len(), 3);
        assert_eq!(selection.failed.len(), 1);
        assert_eq!(selection.failed[0].venue.get_name(), "ghost");
        Ok(())
    }

    #[tokio::test]
    async fn test_all_venues_failing_is_no_suitable_venue() {
        let ledger = Arc::new(MockLedger::new().with_failing_quotes(router(0)));
        let selector = VenueSelector::new(QuoteEngine::new(ledger, Duration::from_secs(5)), vec![REF], 2);
        let venues = vec![Arc::new(Venue::new("a", router(0), 10)), Arc::new(Venue::new("b", router(1), 10))];
        let (token, reference) = tokens();

        let result = selector.select_best(&venues, &token, &reference, e18(1), TradeDirection::Sell).await;
        assert!(matches!(result, Err(SwapError::NoSuitableVenue { attempted: 2, answered: 0 })));
    }

    #[tokio::test]
    async fn test_bounded_workers_still_join_all() -> eyre::Result<()> {
        let reserves: Vec<_> = (1..=12u64).map(|i| (e18(1000), e18(90 + i))).collect();
        let (selector, venues, _) = setup(&reserves);
        let selector = VenueSelector::new(selector.engine().clone(), vec![REF], 3);
        let (token, reference) = tokens();

        let selection = selector.select_best(&venues, &token, &reference, e18(1), TradeDirection::Sell).await?;
        assert_eq!(selection.ranked.len(), 12);
        assert_eq!(selection.venue().get_router(), router(11));
        Ok(())
    }

    #[tokio::test]
    async fn test_evaluate_single_venue_propagates_errors() -> eyre::Result<()> {
        let (selector, venues, _) = three_venues();
        let (token, reference) = tokens();

        let selection = selector.evaluate(&venues[1], &token, &reference, e18(1)).await?;
        assert_eq!(selection.venue().get_router(), router(1));

        let missing = Arc::new(Token::repeat_byte(0x55, 18));
        let result = selector.evaluate(&venues[1], &token, &missing, e18(1)).await;
        assert!(matches!(result, Err(SwapError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_high_supply_pool_is_ranked() -> eyre::Result<()> {
        let e = |exp: u64| U256::from(10u64).pow(U256::from(exp));
        let (selector, venues, _) = setup(&[(e(33), e(22)), (e(33), e(21))]);
        let (token, reference) = tokens();

        let selection = selector.select_best(&venues, &token, &reference, e(30), TradeDirection::Sell).await?;
        assert!(selection.failed.is_empty());
        assert_eq!(selection.ranked.len(), 2);
        assert_eq!(selection.venue().get_router(), router(0));
        assert_eq!(selection.price(), dec!(0.00000000001));
        assert_eq!(selection.ranked[1].diff_percent, dec!(-90));
        Ok(())
    }
}
