// Three-Layer Architecture
pub mod data_sync; // Data Layer: ledger reads, venues, pools, token metadata
pub mod execution; // Execution Layer: nonces, gas, approve-then-swap
pub mod logic; // Logic Layer: quoting and venue selection

// Common utilities and types
pub mod swap_error;
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{
    AccountCredential, LedgerClient, MockLedger, Pool, PoolHandle, SwapConfig, TokenRegistry, TransactionReceipt,
    TransactionRequest, Venue, VenueConfig, VenueWrapper,
};
pub use execution::{
    BlockingSwapper, GasPolicy, NonceManager, PendingSwap, SwapOptions, SwapOrchestrator, SwapReport, SwapRequest,
    TransactionExecutor, TxOptions, TxPhase, VenueChoice,
};
pub use logic::{Quote, QuoteEngine, ReserveImpact, Selection, TradeDirection, VenueSelector};
pub use swap_error::{LedgerError, SwapError};
pub use utils::{AmountSpec, CacheStats, PairKey, PoolCache, Token, TokenWrapper};
