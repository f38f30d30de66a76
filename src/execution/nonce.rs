use crate::data_sync::ledger::LedgerClient;
use crate::swap_error::Result;
use alloy_primitives::Address;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-account nonce allocator.
///
/// A nonce handed out by [`NonceManager::next_nonce`] is consumed even if the caller never
/// submits; the resulting gap stays until [`NonceManager::resync`] is called.
#[derive(Clone)]
pub struct NonceManager {
    ledger: Arc<dyn LedgerClient>,
    account: Address,
    local_nonce: Arc<Mutex<Option<u64>>>,
}

impl NonceManager {
    pub fn new(ledger: Arc<dyn LedgerClient>, account: Address) -> Self {
        Self { ledger, account, local_nonce: Arc::new(Mutex::new(None)) }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Reserves the next nonce: `max(local, network pending count)`, then advances the local counter.
    pub async fn next_nonce(&self) -> Result<u64> {
        let mut guard = self.local_nonce.lock().await;
        let network = self.ledger.get_pending_transaction_count(self.account).await?;
        let nonce = guard.map_or(network, |local| local.max(network));
        *guard = Some(nonce + 1);
        debug!(account = %self.account, nonce, network, "Allocated nonce");
        Ok(nonce)
    }

    /// The nonce the next call to `next_nonce` would return, without reserving it.
    pub async fn peek(&self) -> Result<u64> {
        let guard = self.local_nonce.lock().await;
        let network = self.ledger.get_pending_transaction_count(self.account).await?;
        Ok(guard.map_or(network, |local| local.max(network)))
    }

    /// Resets the local counter to the network pending count, dropping reserved but unused nonces.
    pub async fn resync(&self) -> Result<u64> {
        let mut guard = self.local_nonce.lock().await;
        let network = self.ledger.get_pending_transaction_count(self.account).await?;
        if let Some(local) = *guard {
            if local > network {
                warn!(account = %self.account, local, network, "Dropping unused nonces");
            }
        }
        *guard = Some(network);
        debug!(account = %self.account, nonce = network, "Nonce resynced");
        Ok(network)
    }
}
