use crate::data_sync::ledger::LedgerClient;
use crate::swap_error::{Result, SwapError};
use crate::utils::{NATIVE, NATIVE_TOKEN_DECIMALS, Token, TokenWrapper, units};
use alloy_primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Session-wide token metadata. Each address is fetched at most once, even under concurrent first access.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: DashMap<Address, Arc<OnceCell<TokenWrapper>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata known ahead of time.
    pub fn insert(&self, token: Token) -> TokenWrapper {
        let token = Arc::new(token);
        let cell = OnceCell::new_with(Some(token.clone()));
        self.tokens.insert(token.get_address(), Arc::new(cell));
        token
    }

    pub fn get_cached(&self, address: Address) -> Option<TokenWrapper> {
        self.tokens.get(&address).and_then(|cell| cell.get().cloned())
    }

    pub async fn get_token(&self, ledger: &dyn LedgerClient, address: Address) -> Result<TokenWrapper> {
        // the map guard must not be held across the fetch
        let cell = self.tokens.entry(address).or_default().clone();
        let token = cell
            .get_or_try_init(|| async {
                if address == NATIVE {
                    return Ok(Arc::new(Token::new_with_data(
                        NATIVE,
                        Some("BNB".to_string()),
                        Some("BNB".to_string()),
                        NATIVE_TOKEN_DECIMALS,
                    )));
                }
                let metadata = ledger.token_metadata(address).await?;
                if metadata.decimals > units::MAX_DECIMAL_SCALE {
                    return Err(SwapError::Conversion(format!(
                        "token {address} has {} decimals, at most {} supported",
                        metadata.decimals,
                        units::MAX_DECIMAL_SCALE
                    )));
                }
                debug!(token = %address, decimals = metadata.decimals, symbol = ?metadata.symbol, "Fetched token metadata");
                Ok(Arc::new(Token::new_with_data(address, metadata.symbol, metadata.name, metadata.decimals)))
            })
            .await?;
        Ok(token.clone())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::mock_ledger::MockLedger;
    use futures::future::join_all;

    #[tokio::test]
    async fn test_metadata_fetched_once() -> eyre::Result<()> {
        let address = Address::repeat_byte(1);
        let ledger = MockLedger::new().with_token(address, 12, "T2");
        let registry = TokenRegistry::new();

        let tokens = join_all((0..8).map(|_| registry.get_token(&ledger, address))).await;
        for token in tokens {
            let token = token?;
            assert_eq!(token.get_decimals(), 12);
            assert_eq!(token.get_symbol(), "T2");
        }
        assert_eq!(ledger.metadata_lookups(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let registry = TokenRegistry::new();
        let result = registry.get_token(&MockLedger::new(), Address::repeat_byte(5)).await;
        assert!(matches!(result, Err(SwapError::NotFound(_))));
        assert!(registry.get_cached(Address::repeat_byte(5)).is_none());
    }

    #[tokio::test]
    async fn test_preregistered_token_skips_ledger() -> eyre::Result<()> {
        let ledger = MockLedger::new();
        let registry = TokenRegistry::new();
        registry.insert(Token::repeat_byte(7, 6));
        assert_eq!(registry.get_token(&ledger, Address::repeat_byte(7)).await?.get_decimals(), 6);
        assert_eq!(ledger.metadata_lookups(), 0);
        Ok(())
    }
}
