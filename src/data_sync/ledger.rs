use crate::swap_error::LedgerError;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Raw pool reserves in the pool's own token0/token1 order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolReserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    pub decimals: u8,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

/// Unsigned transaction fields. `nonce`, `gas` and `gas_price` are filled in before signing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub nonce: Option<u64>,
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub chain_id: Option<u64>,
}

impl TransactionRequest {
    pub fn call(from: Address, to: Address, data: impl Into<Bytes>) -> Self {
        Self { from, to, data: data.into(), ..Default::default() }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn is_ready_to_sign(&self) -> bool {
        self.nonce.is_some() && self.gas.is_some() && self.gas_price.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: B256,
    pub raw: Bytes,
    pub nonce: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    /// `None` while the transaction is not yet included in a block.
    pub block_hash: Option<B256>,
    pub block_number: Option<u64>,
    /// 1 on success, 0 when reverted.
    pub status: u64,
    pub gas_used: u64,
}

impl TransactionReceipt {
    pub fn is_included(&self) -> bool {
        self.block_hash.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.status == 1
    }
}

/// Signing credential of the trading account. Key storage and decryption live elsewhere.
#[derive(Clone)]
pub struct AccountCredential {
    address: Address,
    secret: Bytes,
}

impl AccountCredential {
    pub fn new(address: Address, secret: impl Into<Bytes>) -> Self {
        Self { address, secret: secret.into() }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn secret(&self) -> &Bytes {
        &self.secret
    }
}

impl Debug for AccountCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredential").field("address", &self.address).field("secret", &"<redacted>").finish()
    }
}

/// Ledger client the engine consumes: chain reads, simulation, signing and submission.
///
/// Implementations own transport, ABI decoding and signing. Router `get_amount_out` is the
/// venue's own constant-product computation and must report a revert as `LedgerError::Reverted`.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn router_factory(&self, router: Address) -> LedgerResult<Address>;

    /// Pool address for the pair, `None` (or the zero address) when the factory has none.
    async fn get_pool_pair(&self, factory: Address, token_a: Address, token_b: Address) -> LedgerResult<Option<Address>>;

    async fn pool_tokens(&self, pool: Address) -> LedgerResult<(Address, Address)>;

    async fn get_reserves(&self, pool: Address) -> LedgerResult<PoolReserves>;

    async fn get_amount_out(
        &self,
        router: Address,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> LedgerResult<U256>;

    async fn token_metadata(&self, token: Address) -> LedgerResult<TokenMetadata>;

    async fn balance_of(&self, token: Address, owner: Address) -> LedgerResult<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> LedgerResult<U256>;

    async fn native_balance(&self, owner: Address) -> LedgerResult<U256>;

    /// Read-only simulation of the transaction against current state.
    async fn call(&self, tx: &TransactionRequest) -> LedgerResult<Bytes>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> LedgerResult<u64>;

    async fn get_pending_transaction_count(&self, account: Address) -> LedgerResult<u64>;

    async fn suggest_gas_price(&self) -> LedgerResult<Option<u128>>;

    async fn sign_transaction(
        &self,
        tx: &TransactionRequest,
        credential: &AccountCredential,
    ) -> LedgerResult<SignedTransaction>;

    async fn submit_raw_transaction(&self, signed: &SignedTransaction) -> LedgerResult<B256>;

    async fn get_transaction_receipt(&self, hash: B256) -> LedgerResult<Option<TransactionReceipt>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = AccountCredential::new(Address::repeat_byte(1), vec![0x42u8; 32]);
        let printed = format!("{credential:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("4242"));
    }

    #[test]
    fn test_receipt_states() {
        let mut receipt = TransactionReceipt {
            transaction_hash: B256::ZERO,
            block_hash: None,
            block_number: None,
            status: 1,
            gas_used: 21_000,
        };
        assert!(!receipt.is_included());
        receipt.block_hash = Some(B256::repeat_byte(1));
        assert!(receipt.is_included() && receipt.is_success());
    }
}
