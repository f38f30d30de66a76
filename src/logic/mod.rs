/// Logic Layer
///
/// This layer is responsible for:
/// - Quoting a token pair on a single venue
/// - Concurrent price discovery across venues and venue selection
/// - Reserve-impact guarding and slippage-bounded minimum output
pub mod quote;
pub mod selector;
pub mod slippage;

pub use quote::{Quote, QuoteEngine};
pub use selector::{
    DirectionInference, FailedVenue, RankedQuote, ReserveImpact, Selection, TradeDirection, VenueSelector,
    infer_direction, reference_token_for,
};
pub use slippage::min_amount_out;
