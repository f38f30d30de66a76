/// Execution Layer
///
/// This layer is responsible for:
/// - Nonce allocation and gas pricing for the trading account
/// - Simulate, sign, submit and confirm for single transactions
/// - The approve-then-swap sequence and native token wrapping
/// - A blocking front end for synchronous callers
pub mod blocking;
pub mod gas;
pub mod nonce;
pub mod orchestrator;
pub mod transaction_executor;


pub use blocking::BlockingSwapper;
pub use gas::{GWEI, GasPolicy};
pub use nonce::NonceManager;
pub use orchestrator::{
    NATIVE_TRANSFER_GAS_LIMIT, PendingSwap, SwapOptions, SwapOrchestrator, SwapReport, SwapRequest, VenueChoice,
    WRAP_GAS_LIMIT,
};
pub use transaction_executor::{TransactionExecutor, TxOptions, TxPhase};
