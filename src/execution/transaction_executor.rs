use crate::data_sync::config::SwapConfig;
use crate::data_sync::ledger::{AccountCredential, LedgerClient, SignedTransaction, TransactionReceipt, TransactionRequest};
use crate::execution::gas::GasPolicy;
use crate::execution::nonce::NonceManager;
use crate::swap_error::{LedgerError, Result, SwapError};
use alloy_primitives::{B256, Bytes};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Per-transaction overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Skip estimation and use this gas limit
    pub gas_limit: Option<u64>,
    pub gas_price_gwei: Option<u64>,
}

/// Where one transaction of a swap ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxPhase {
    /// Nothing had to be sent
    NotRequired,
    /// Simulated and signed but not submitted (test mode)
    Simulated { signed_hash: B256, nonce: u64 },
    Confirmed(TransactionReceipt),
}

impl TxPhase {
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            TxPhase::Confirmed(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub fn tx_hash(&self) -> Option<B256> {
        self.receipt().map(|r| r.transaction_hash)
    }
}

/// Simulate, sign, submit and wait for one transaction of the trading account.
#[derive(Clone)]
pub struct TransactionExecutor {
    ledger: Arc<dyn LedgerClient>,
    credential: AccountCredential,
    nonces: NonceManager,
    gas: GasPolicy,
    chain_id: u64,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    submit_timeout: Duration,
    test_mode: bool,
}

impl TransactionExecutor {
    pub fn new(ledger: Arc<dyn LedgerClient>, credential: AccountCredential, config: &SwapConfig) -> Self {
        let nonces = NonceManager::new(ledger.clone(), credential.address());
        let gas = GasPolicy::new(ledger.clone(), config.gas_price_floor_gwei, config.gas_price_ceiling_gwei);
        Self {
            ledger,
            credential,
            nonces,
            gas,
            chain_id: config.chain_id,
            poll_interval: config.poll_interval(),
            confirmation_timeout: config.confirmation_timeout(),
            submit_timeout: config.submit_timeout(),
            test_mode: config.test_mode,
        }
    }

    pub fn account(&self) -> alloy_primitives::Address {
        self.credential.address()
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn nonces(&self) -> &NonceManager {
        &self.nonces
    }

    pub fn gas_policy(&self) -> &GasPolicy {
        &self.gas
    }

    /// Read-only dry run. A revert aborts before anything is signed.
    pub async fn simulate(&self, tx: &TransactionRequest) -> Result<Bytes> {
        self.ledger.call(tx).await.map_err(|err| match err {
            LedgerError::Reverted(reason) => SwapError::Simulation(reason),
            err => err.into(),
        })
    }

    /// Fills gas, gas price and nonce, then signs.
    ///
    /// The nonce is taken last so a failed estimate does not burn one. In test mode the nonce is
    /// only peeked since nothing will be submitted.
    pub async fn sign(&self, tx: TransactionRequest, options: TxOptions) -> Result<SignedTransaction> {
        let mut tx = tx;
        tx.chain_id = Some(self.chain_id);
        tx.gas = Some(match options.gas_limit {
            Some(limit) => limit,
            None => self.ledger.estimate_gas(&tx).await.map_err(|err| match err {
                LedgerError::Reverted(reason) => SwapError::Simulation(reason),
                err => err.into(),
            })?,
        });
        tx.gas_price = Some(self.gas.effective_gas_price(options.gas_price_gwei).await?);
        tx.nonce = Some(if self.test_mode { self.nonces.peek().await? } else { self.nonces.next_nonce().await? });

        let signed = self.ledger.sign_transaction(&tx, &self.credential).await?;
        debug!(hash = %signed.hash, nonce = signed.nonce, to = %tx.to, "Signed transaction");
        Ok(signed)
    }

    /// Submits the signed transaction. Returns `None` in test mode without touching the network.
    pub async fn submit(&self, signed: &SignedTransaction) -> Result<Option<B256>> {
        if self.test_mode {
            warn!(hash = %signed.hash, "Test mode, transaction not submitted");
            return Ok(None);
        }

        let submitted = tokio::time::timeout(self.submit_timeout, self.ledger.submit_raw_transaction(signed))
            .await
            .map_err(|_| SwapError::timeout("submission", Some(signed.hash)))?;

        match submitted {
            Ok(hash) => {
                info!(%hash, nonce = signed.nonce, "Transaction submitted");
                Ok(Some(hash))
            }
            Err(LedgerError::NonceTooLow(reason)) => {
                let resynced = self.nonces.resync().await?;
                warn!(nonce = signed.nonce, resynced, "Nonce rejected by the network");
                Err(SwapError::NonceConflict { nonce: signed.nonce, reason })
            }
            Err(source) => Err(SwapError::Ledger { source, tx_hash: Some(signed.hash) }),
        }
    }

    /// Polls for the receipt until it is included or the confirmation timeout runs out.
    ///
    /// The timeout bounds wall time, including receipt queries that never answer. An unknown or
    /// not yet included transaction is retried. Abandoning the wait leaves the transaction
    /// pending on the network.
    pub async fn wait_for_success(&self, hash: B256) -> Result<TransactionReceipt> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            let polled = tokio::time::timeout_at(deadline, self.ledger.get_transaction_receipt(hash))
                .await
                .map_err(|_| SwapError::timeout("confirmation", Some(hash)))?;
            match polled {
                Ok(Some(receipt)) if receipt.is_included() => {
                    if !receipt.is_success() {
                        return Err(SwapError::TransactionFailed { hash, status: receipt.status });
                    }
                    info!(%hash, block = ?receipt.block_number, gas_used = receipt.gas_used, "Transaction confirmed");
                    return Ok(receipt);
                }
                Ok(_) | Err(LedgerError::NotFound(_)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    debug!(%hash, remaining_ms = remaining.as_millis() as u64, "Waiting for receipt");
                }
                Err(source) => return Err(SwapError::Ledger { source, tx_hash: Some(hash) }),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SwapError::timeout("confirmation", Some(hash)));
            }
            tokio::time::sleep_until((now + self.poll_interval).min(deadline)).await;
        }
    }

    /// Simulate, sign, submit and wait. In test mode the pipeline stops after signing.
    pub async fn execute(&self, tx: TransactionRequest, options: TxOptions) -> Result<TxPhase> {
        self.simulate(&tx).await?;
        let signed = self.sign(tx, options).await?;
        match self.submit(&signed).await? {
            Some(hash) => Ok(TxPhase::Confirmed(self.wait_for_success(hash).await?)),
            None => Ok(TxPhase::Simulated { signed_hash: signed.hash, nonce: signed.nonce }),
        }
    }
}
