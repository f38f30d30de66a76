use crate::data_sync::abi::IERC20;
use crate::data_sync::ledger::{
    AccountCredential, LedgerClient, LedgerResult, PoolReserves, SignedTransaction, TokenMetadata, TransactionReceipt,
    TransactionRequest,
};
use crate::swap_error::LedgerError;
use crate::utils::PairKey;
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Ledger call recorded by [`MockLedger`] in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    Call(Address),
    EstimateGas(Address),
    Sign { hash: B256, nonce: u64 },
    Submit(B256),
    Receipt(B256),
}

#[derive(Debug, Default)]
struct MockState {
    factories: HashMap<Address, Address>,
    pairs: HashMap<(Address, PairKey), Address>,
    pools: HashMap<Address, (Address, Address, PoolReserves)>,
    tokens: HashMap<Address, TokenMetadata>,
    balances: HashMap<(Address, Address), U256>,
    native_balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    pending_counts: HashMap<Address, u64>,
    gas_price: Option<u128>,
    gas_price_down: bool,
    gas_estimate: u64,
    failing_quotes: HashSet<Address>,
    quote_delays: HashMap<Address, Duration>,
    simulation_failures: HashMap<Address, String>,
    receipt_status: HashMap<Address, u64>,
    receipt_delay_polls: u32,
    stalled_receipts: bool,
    submit_error: Option<LedgerError>,
    signed: HashMap<B256, TransactionRequest>,
    submitted: Vec<TransactionRequest>,
    pending_polls: HashMap<B256, u32>,
    journal: Vec<LedgerCall>,
    factory_lookups: u64,
    pair_lookups: u64,
    metadata_lookups: u64,
}

/// Scriptable in-memory ledger.
///
/// Routers compute `reserve_out * amount_in / reserve_in` and revert on empty reserves.
/// Submitted approvals update the allowance table so approve-then-swap flows behave like on chain.
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        let state = MockState { gas_price: Some(5_000_000_000), gas_estimate: 150_000, ..Default::default() };
        Self { state: Mutex::new(state) }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_venue(self, router: Address, factory: Address) -> Self {
        self.state().factories.insert(router, factory);
        self
    }

    pub fn with_pool(
        self,
        factory: Address,
        pool: Address,
        token0: Address,
        token1: Address,
        reserve0: U256,
        reserve1: U256,
    ) -> Self {
        {
            let mut state = self.state();
            state.pairs.insert((factory, PairKey::new(token0, token1)), pool);
            let reserves = PoolReserves { reserve0, reserve1, block_timestamp_last: 1 };
            state.pools.insert(pool, (token0, token1, reserves));
        }
        self
    }

    pub fn with_token(self, token: Address, decimals: u8, symbol: &str) -> Self {
        let metadata = TokenMetadata { decimals, symbol: Some(symbol.to_string()), name: None };
        self.state().tokens.insert(token, metadata);
        self
    }

    pub fn with_balance(self, token: Address, owner: Address, amount: U256) -> Self {
        self.state().balances.insert((token, owner), amount);
        self
    }

    pub fn with_native_balance(self, owner: Address, amount: U256) -> Self {
        self.state().native_balances.insert(owner, amount);
        self
    }

    pub fn with_allowance(self, token: Address, owner: Address, spender: Address, amount: U256) -> Self {
        self.state().allowances.insert((token, owner, spender), amount);
        self
    }

    pub fn with_pending_count(self, account: Address, count: u64) -> Self {
        self.set_pending_count(account, count);
        self
    }

    pub fn with_gas_price(self, gas_price: Option<u128>) -> Self {
        self.state().gas_price = gas_price;
        self
    }

    pub fn with_failing_quotes(self, router: Address) -> Self {
        self.state().failing_quotes.insert(router);
        self
    }

    pub fn with_quote_delay(self, router: Address, delay: Duration) -> Self {
        self.state().quote_delays.insert(router, delay);
        self
    }

    /// Read-only calls against `to` revert with `reason`.
    pub fn with_simulation_failure(self, to: Address, reason: &str) -> Self {
        self.state().simulation_failures.insert(to, reason.to_string());
        self
    }

    /// Receipts of transactions sent to `to` carry `status`.
    pub fn with_receipt_status(self, to: Address, status: u64) -> Self {
        self.state().receipt_status.insert(to, status);
        self
    }

    /// Number of receipt polls that report the transaction as not yet included.
    pub fn with_receipt_delay(self, polls: u32) -> Self {
        self.state().receipt_delay_polls = polls;
        self
    }

    /// Receipt queries never answer.
    pub fn with_stalled_receipts(self) -> Self {
        self.state().stalled_receipts = true;
        self
    }

    pub fn with_submit_error(self, error: LedgerError) -> Self {
        self.state().submit_error = Some(error);
        self
    }

    pub fn set_reserves(&self, pool: Address, reserve0: U256, reserve1: U256) {
        if let Some((_, _, reserves)) = self.state().pools.get_mut(&pool) {
            reserves.reserve0 = reserve0;
            reserves.reserve1 = reserve1;
        }
    }

    /// Makes gas price queries fail until switched back.
    pub fn set_gas_price_down(&self, down: bool) {
        self.state().gas_price_down = down;
    }

    pub fn set_pending_count(&self, account: Address, count: u64) {
        self.state().pending_counts.insert(account, count);
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.state().submitted.clone()
    }

    pub fn signed_count(&self) -> usize {
        self.state().signed.len()
    }

    pub fn journal(&self) -> Vec<LedgerCall> {
        self.state().journal.clone()
    }

    pub fn factory_lookups(&self) -> u64 {
        self.state().factory_lookups
    }

    pub fn pair_lookups(&self) -> u64 {
        self.state().pair_lookups
    }

    pub fn metadata_lookups(&self) -> u64 {
        self.state().metadata_lookups
    }

    pub fn allowance_of(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state().allowances.get(&(token, owner, spender)).copied().unwrap_or_default()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn router_factory(&self, router: Address) -> LedgerResult<Address> {
        let mut state = self.state();
        state.factory_lookups += 1;
        state.factories.get(&router).copied().ok_or_else(|| LedgerError::NotFound(format!("router {router}")))
    }

    async fn get_pool_pair(&self, factory: Address, token_a: Address, token_b: Address) -> LedgerResult<Option<Address>> {
        let mut state = self.state();
        state.pair_lookups += 1;
        Ok(state.pairs.get(&(factory, PairKey::new(token_a, token_b))).copied())
    }

    async fn pool_tokens(&self, pool: Address) -> LedgerResult<(Address, Address)> {
        self.state()
            .pools
            .get(&pool)
            .map(|(token0, token1, _)| (*token0, *token1))
            .ok_or_else(|| LedgerError::NotFound(format!("pool {pool}")))
    }

    async fn get_reserves(&self, pool: Address) -> LedgerResult<PoolReserves> {
        self.state()
            .pools
            .get(&pool)
            .map(|(_, _, reserves)| *reserves)
            .ok_or_else(|| LedgerError::NotFound(format!("pool {pool}")))
    }

    async fn get_amount_out(
        &self,
        router: Address,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> LedgerResult<U256> {
        let (failing, delay) = {
            let state = self.state();
            (state.failing_quotes.contains(&router), state.quote_delays.get(&router).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(LedgerError::Transport(format!("router {router} unavailable")));
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(LedgerError::Reverted("INSUFFICIENT_LIQUIDITY".to_string()));
        }
        if amount_in.is_zero() {
            return Err(LedgerError::Reverted("INSUFFICIENT_INPUT_AMOUNT".to_string()));
        }
        reserve_out
            .checked_mul(amount_in)
            .map(|product| product / reserve_in)
            .ok_or_else(|| LedgerError::Reverted("ds-math-mul-overflow".to_string()))
    }

    async fn token_metadata(&self, token: Address) -> LedgerResult<TokenMetadata> {
        let mut state = self.state();
        state.metadata_lookups += 1;
        state.tokens.get(&token).cloned().ok_or_else(|| LedgerError::NotFound(format!("token {token}")))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> LedgerResult<U256> {
        Ok(self.state().balances.get(&(token, owner)).copied().unwrap_or_default())
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> LedgerResult<U256> {
        Ok(self.allowance_of(token, owner, spender))
    }

    async fn native_balance(&self, owner: Address) -> LedgerResult<U256> {
        Ok(self.state().native_balances.get(&owner).copied().unwrap_or_default())
    }

    async fn call(&self, tx: &TransactionRequest) -> LedgerResult<Bytes> {
        let mut state = self.state();
        state.journal.push(LedgerCall::Call(tx.to));
        match state.simulation_failures.get(&tx.to) {
            Some(reason) => Err(LedgerError::Reverted(reason.clone())),
            None => Ok(Bytes::new()),
        }
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> LedgerResult<u64> {
        let mut state = self.state();
        state.journal.push(LedgerCall::EstimateGas(tx.to));
        if let Some(reason) = state.simulation_failures.get(&tx.to) {
            return Err(LedgerError::Reverted(reason.clone()));
        }
        Ok(state.gas_estimate)
    }

    async fn get_pending_transaction_count(&self, account: Address) -> LedgerResult<u64> {
        Ok(self.state().pending_counts.get(&account).copied().unwrap_or_default())
    }

    async fn suggest_gas_price(&self) -> LedgerResult<Option<u128>> {
        let state = self.state();
        if state.gas_price_down {
            return Err(LedgerError::Transport("gas price oracle unavailable".to_string()));
        }
        Ok(state.gas_price)
    }

    async fn sign_transaction(
        &self,
        tx: &TransactionRequest,
        credential: &AccountCredential,
    ) -> LedgerResult<SignedTransaction> {
        let Some(nonce) = tx.nonce.filter(|_| tx.is_ready_to_sign()) else {
            return Err(LedgerError::Rejected("transaction is missing nonce, gas or gas price".to_string()));
        };
        if credential.address() != tx.from {
            return Err(LedgerError::Rejected(format!("credential does not match sender {}", tx.from)));
        }

        let mut state = self.state();
        let mut seed = Vec::with_capacity(56 + tx.data.len());
        seed.extend_from_slice(tx.from.as_slice());
        seed.extend_from_slice(tx.to.as_slice());
        seed.extend_from_slice(&nonce.to_be_bytes());
        seed.extend_from_slice(&(state.signed.len() as u64).to_be_bytes());
        seed.extend_from_slice(&tx.data);
        let hash = keccak256(&seed);
        state.signed.insert(hash, tx.clone());
        state.journal.push(LedgerCall::Sign { hash, nonce });
        Ok(SignedTransaction { hash, raw: Bytes::from(tx.data.to_vec()), nonce })
    }

    async fn submit_raw_transaction(&self, signed: &SignedTransaction) -> LedgerResult<B256> {
        let mut state = self.state();
        if let Some(error) = state.submit_error.clone() {
            return Err(error);
        }
        let tx = state
            .signed
            .get(&signed.hash)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("unknown transaction {}", signed.hash)))?;

        let pending = state.pending_counts.entry(tx.from).or_default();
        if signed.nonce < *pending {
            return Err(LedgerError::NonceTooLow(format!("nonce {} below {}", signed.nonce, pending)));
        }
        *pending = signed.nonce + 1;

        if let Ok(approve) = IERC20::approveCall::abi_decode(&tx.data) {
            state.allowances.insert((tx.to, tx.from, approve.spender), approve.amount);
        }

        let delay = state.receipt_delay_polls;
        state.pending_polls.insert(signed.hash, delay);
        state.journal.push(LedgerCall::Submit(signed.hash));
        state.submitted.push(tx);
        Ok(signed.hash)
    }

    async fn get_transaction_receipt(&self, hash: B256) -> LedgerResult<Option<TransactionReceipt>> {
        let stalled = {
            let mut state = self.state();
            state.journal.push(LedgerCall::Receipt(hash));
            state.stalled_receipts
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut state = self.state();

        let Some(remaining) = state.pending_polls.get_mut(&hash) else {
            return Ok(None);
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(Some(TransactionReceipt {
                transaction_hash: hash,
                block_hash: None,
                block_number: None,
                status: 0,
                gas_used: 0,
            }));
        }

        let to = state.signed.get(&hash).map(|tx| tx.to).unwrap_or_default();
        let status = state.receipt_status.get(&to).copied().unwrap_or(1);
        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            block_hash: Some(keccak256(hash)),
            block_number: Some(1),
            status,
            gas_used: state.gas_estimate,
        }))
    }
}
