use crate::data_sync::config::SwapConfig;
use crate::data_sync::ledger::{AccountCredential, LedgerClient};
use crate::execution::orchestrator::{SwapOrchestrator, SwapReport, SwapRequest, VenueChoice};
use crate::execution::transaction_executor::TxPhase;
use crate::logic::selector::Selection;
use crate::swap_error::{Result, SwapError};
use crate::utils::AmountSpec;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Blocking front end for callers without an async runtime. Each call blocks until the ledger answers.
///
/// Must not be used from inside another tokio runtime.
pub struct BlockingSwapper {
    runtime: Runtime,
    inner: SwapOrchestrator,
}

impl BlockingSwapper {
    pub fn new(config: SwapConfig, ledger: Arc<dyn LedgerClient>, credential: AccountCredential) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SwapError::Config(format!("cannot start runtime: {e}")))?;
        let inner = SwapOrchestrator::new(config, ledger, credential)?;
        Ok(Self { runtime, inner })
    }

    pub fn orchestrator(&self) -> &SwapOrchestrator {
        &self.inner
    }

    pub fn balance(&self, token: Address) -> Result<Decimal> {
        self.runtime.block_on(self.inner.balance(token))
    }

    pub fn quote(&self, token_in: Address, token_out: Address, amount: Decimal, venue: &VenueChoice) -> Result<Selection> {
        self.runtime.block_on(self.inner.quote(token_in, token_out, amount, venue))
    }

    pub fn swap_tokens(&self, request: &SwapRequest) -> Result<SwapReport> {
        self.runtime.block_on(self.inner.swap_tokens(request))
    }

    pub fn wrap(&self, amount: AmountSpec, gas_price_gwei: Option<u64>) -> Result<TxPhase> {
        self.runtime.block_on(self.inner.wrap(amount, gas_price_gwei))
    }

    pub fn unwrap(&self, amount: AmountSpec, gas_price_gwei: Option<u64>) -> Result<TxPhase> {
        self.runtime.block_on(self.inner.unwrap(amount, gas_price_gwei))
    }

    pub fn transfer(&self, token: Address, to: Address, amount: AmountSpec, gas_price_gwei: Option<u64>) -> Result<TxPhase> {
        self.runtime.block_on(self.inner.transfer(token, to, amount, gas_price_gwei))
    }
}
