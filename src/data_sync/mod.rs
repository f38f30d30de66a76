/// Data Layer
///
/// Everything that reads ledger state:
///
/// - The `LedgerClient` collaborator and its transaction types
/// - Contract call definitions for routers, factories, pairs and ERC-20 tokens
/// - Venues with their lazily resolved factory and per-venue pool cache
/// - Fetch-once token metadata
/// - Swap configuration
pub mod abi;
pub mod config;
pub mod ledger;
pub mod mock_ledger;
pub mod pool;
pub mod tokens;
pub mod venue;

pub use config::{SwapConfig, VenueConfig};
pub use ledger::{
    AccountCredential, LedgerClient, LedgerResult, PoolReserves, SignedTransaction, TokenMetadata, TransactionReceipt,
    TransactionRequest,
};
pub use mock_ledger::{LedgerCall, MockLedger};
pub use pool::{Pool, PoolHandle, ReserveSnapshot};
pub use tokens::TokenRegistry;
pub use venue::{Venue, VenueWrapper};
