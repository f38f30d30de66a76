use crate::data_sync::abi::{encode_approve, encode_deposit, encode_swap_exact_tokens, encode_transfer, encode_withdraw};
use crate::data_sync::config::SwapConfig;
use crate::data_sync::ledger::{AccountCredential, LedgerClient, TransactionReceipt, TransactionRequest};
use crate::data_sync::tokens::TokenRegistry;
use crate::data_sync::venue::{Venue, VenueWrapper};
use crate::execution::transaction_executor::{TransactionExecutor, TxOptions, TxPhase};
use crate::logic::quote::QuoteEngine;
use crate::logic::selector::{Selection, VenueSelector};
use crate::swap_error::{Result, SwapError};
use crate::utils::{AmountSpec, NATIVE, TokenWrapper};
use alloy_primitives::{Address, Bytes, U256};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Fixed gas limit for wrapping and unwrapping the native token.
pub const WRAP_GAS_LIMIT: u64 = 50_000;

/// Fixed gas limit for sending native coin.
pub const NATIVE_TRANSFER_GAS_LIMIT: u64 = 400_000;

/// Venue selection mode for a swap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VenueChoice {
    /// Quote every configured venue and take the best
    All,
    Named(String),
    Address(Address),
}

impl FromStr for VenueChoice {
    type Err = SwapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s.eq_ignore_ascii_case("any") {
            Ok(VenueChoice::All)
        } else if s.starts_with("0x") {
            Address::from_str(s).map(VenueChoice::Address).map_err(|e| SwapError::InvalidPath(format!("{s}: {e}")))
        } else if s.is_empty() {
            Err(SwapError::NotFound("empty venue name".to_string()))
        } else {
            Ok(VenueChoice::Named(s.to_string()))
        }
    }
}

impl Display for VenueChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VenueChoice::All => write!(f, "all"),
            VenueChoice::Named(name) => write!(f, "{name}"),
            VenueChoice::Address(address) => write!(f, "{address}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwapOptions {
    /// Approve at least this much when the allowance is short
    pub approve_amount: Option<U256>,
    pub gas_price_gwei: Option<u64>,
    /// Defaults to the trading account
    pub recipient: Option<Address>,
}

/// The approve and swap transactions of one swap.
///
/// The swap is only built after the approve is confirmed. A failure in between leaves an
/// approved but unswapped state; retrying the swap alone recovers it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSwap {
    pub approve: TxPhase,
    pub swap: TxPhase,
}

impl PendingSwap {
    /// Swap receipt, `None` in test mode.
    pub fn receipt(&self) -> Option<&TransactionReceipt> {
        self.swap.receipt()
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.swap, TxPhase::Simulated { .. })
    }
}

#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount: AmountSpec,
    pub venue: VenueChoice,
    /// Defaults to the configured slippage
    pub slippage_percent: Option<Decimal>,
    pub gas_price_gwei: Option<u64>,
    pub deadline_secs: Option<u64>,
}

impl SwapRequest {
    pub fn new(token_in: Address, token_out: Address, amount: AmountSpec) -> Self {
        Self {
            token_in,
            token_out,
            amount,
            venue: VenueChoice::All,
            slippage_percent: None,
            gas_price_gwei: None,
            deadline_secs: None,
        }
    }

    pub fn with_venue(mut self, venue: VenueChoice) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_slippage(mut self, slippage_percent: Decimal) -> Self {
        self.slippage_percent = Some(slippage_percent);
        self
    }

    pub fn with_gas_price(mut self, gas_price_gwei: u64) -> Self {
        self.gas_price_gwei = Some(gas_price_gwei);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SwapReport {
    pub selection: Selection,
    pub amount_in: U256,
    pub min_amount_out: U256,
    pub pending: PendingSwap,
}

/// Quotes, selects a venue and runs the approve-then-swap sequence for one account.
pub struct SwapOrchestrator {
    config: SwapConfig,
    ledger: Arc<dyn LedgerClient>,
    venues: Vec<VenueWrapper>,
    // unconfigured routers chosen by address, kept so their factory and pools stay cached
    ad_hoc_venues: DashMap<Address, VenueWrapper>,
    tokens: TokenRegistry,
    selector: VenueSelector,
    executor: TransactionExecutor,
}

impl SwapOrchestrator {
    pub fn new(config: SwapConfig, ledger: Arc<dyn LedgerClient>, credential: AccountCredential) -> Result<Self> {
        config.validate().map_err(|e| SwapError::Config(e.to_string()))?;

        let venues = config
            .venues
            .iter()
            .map(|v| Arc::new(Venue::new(v.name.clone(), v.router, config.pool_cache_capacity)))
            .collect();
        let engine = QuoteEngine::new(ledger.clone(), config.quote_timeout());
        let selector = VenueSelector::new(engine, config.reference_tokens.clone(), config.worker_pool_size);
        let executor = TransactionExecutor::new(ledger.clone(), credential, &config);

        info!(
            venues = config.venues.len(),
            account = %executor.account(),
            test_mode = config.test_mode,
            "Swap orchestrator ready"
        );
        Ok(Self {
            config,
            ledger,
            venues,
            ad_hoc_venues: DashMap::new(),
            tokens: TokenRegistry::new(),
            selector,
            executor,
        })
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn account(&self) -> Address {
        self.executor.account()
    }

    pub fn venues(&self) -> &[VenueWrapper] {
        &self.venues
    }

    pub fn selector(&self) -> &VenueSelector {
        &self.selector
    }

    pub fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    /// Configured venue by name (case-insensitive) or router address. An unknown address gets an
    /// ad-hoc venue.
    pub fn find_venue(&self, choice: &VenueChoice) -> Result<VenueWrapper> {
        match choice {
            VenueChoice::All => Err(SwapError::InvalidPath("a single venue is required".to_string())),
            VenueChoice::Named(name) => self
                .venues
                .iter()
                .find(|v| v.get_name().eq_ignore_ascii_case(name))
                .cloned()
                .ok_or_else(|| SwapError::NotFound(format!("venue {name}"))),
            VenueChoice::Address(router) => {
                if let Some(venue) = self.venues.iter().find(|v| v.get_router() == *router) {
                    return Ok(venue.clone());
                }
                let capacity = self.config.pool_cache_capacity;
                let venue = self
                    .ad_hoc_venues
                    .entry(*router)
                    .or_insert_with(|| Arc::new(Venue::new(router.to_string(), *router, capacity)));
                Ok(venue.value().clone())
            }
        }
    }

    pub async fn get_token(&self, address: Address) -> Result<TokenWrapper> {
        self.tokens.get_token(self.ledger.as_ref(), address).await
    }

    async fn raw_balance(&self, token: Address) -> Result<U256> {
        let account = self.account();
        Ok(if token == NATIVE {
            self.ledger.native_balance(account).await?
        } else {
            self.ledger.balance_of(token, account).await?
        })
    }

    /// Account balance in natural units. The zero address is the native coin.
    pub async fn balance(&self, token: Address) -> Result<Decimal> {
        let metadata = self.get_token(token).await?;
        metadata.to_decimal(self.raw_balance(token).await?)
    }

    /// Quotes `amount` of `token_in` on the chosen venues and returns the ranked selection.
    pub async fn quote(&self, token_in: Address, token_out: Address, amount: Decimal, venue: &VenueChoice) -> Result<Selection> {
        if token_in == token_out {
            return Err(SwapError::InvalidPath("input and output token must differ".to_string()));
        }
        let token_in = self.get_token(token_in).await?;
        let token_out = self.get_token(token_out).await?;
        let amount_in = token_in.from_decimal(amount)?;
        self.select(&token_in, &token_out, amount_in, venue).await
    }

    async fn select(
        &self,
        token_in: &TokenWrapper,
        token_out: &TokenWrapper,
        amount_in: U256,
        venue: &VenueChoice,
    ) -> Result<Selection> {
        match venue {
            VenueChoice::All => self.selector.select(&self.venues, token_in, token_out, amount_in).await,
            choice => self.selector.evaluate(&self.find_venue(choice)?, token_in, token_out, amount_in).await,
        }
    }

    /// Approve-then-swap along `path` on `venue`.
    ///
    /// Every consecutive pair of `path` must have a pool on the venue. The approve, when needed,
    /// is confirmed before the swap is built.
    pub async fn swap(
        &self,
        venue: &VenueWrapper,
        path: &[Address],
        amount_in: U256,
        min_amount_out: U256,
        deadline_secs: u64,
        options: &SwapOptions,
    ) -> Result<PendingSwap> {
        if path.len() < 2 {
            return Err(SwapError::InvalidPath(format!("path needs at least two tokens, got {}", path.len())));
        }
        if amount_in.is_zero() {
            return Err(SwapError::InvalidAmount("cannot swap a zero amount".to_string()));
        }
        deadline_from_now(deadline_secs)?;
        for pair in path.windows(2) {
            venue.resolve_pool(self.ledger.as_ref(), pair[0], pair[1]).await?;
        }

        let account = self.account();
        let router = venue.get_router();
        let token_in = path[0];
        let tx_options = TxOptions { gas_limit: None, gas_price_gwei: options.gas_price_gwei };

        let allowance = self.ledger.allowance(token_in, account, router).await?;
        let approve = if allowance < amount_in {
            let approve_amount = amount_in.max(options.approve_amount.unwrap_or_default());
            info!(token = %token_in, spender = %router, %allowance, %approve_amount, "Approving");
            let tx = TransactionRequest::call(account, token_in, encode_approve(router, approve_amount));
            self.executor.execute(tx, tx_options).await?
        } else {
            TxPhase::NotRequired
        };

        // the deadline starts once the approve is final
        let deadline = deadline_from_now(deadline_secs)?;
        let recipient = options.recipient.unwrap_or(account);
        let data = encode_swap_exact_tokens(amount_in, min_amount_out, path.to_vec(), recipient, deadline);

        info!(venue = %venue, %amount_in, %min_amount_out, hops = path.len() - 1, "Swapping");
        let swap = self.executor.execute(TransactionRequest::call(account, router, data), tx_options).await?;
        Ok(PendingSwap { approve, swap })
    }

    /// Resolves the amount, selects a venue, checks balance and reserves, then swaps with a
    /// slippage-bounded minimum output.
    pub async fn swap_tokens(&self, request: &SwapRequest) -> Result<SwapReport> {
        if request.token_in == request.token_out {
            return Err(SwapError::InvalidPath("input and output token must differ".to_string()));
        }
        let token_in = self.get_token(request.token_in).await?;
        let token_out = self.get_token(request.token_out).await?;

        let raw_balance = self.raw_balance(request.token_in).await?;
        let amount_in = match request.amount {
            AmountSpec::All => raw_balance,
            spec => token_in.from_decimal(spec.resolve(token_in.to_decimal(raw_balance)?)?)?,
        };
        if amount_in.is_zero() {
            return Err(SwapError::InvalidAmount(format!("{} of {token_in} is nothing", request.amount)));
        }

        let selection = self.select(&token_in, &token_out, amount_in, &request.venue).await?;

        if raw_balance < amount_in {
            return Err(SwapError::InsufficientBalance {
                token: request.token_in,
                required: amount_in,
                available: raw_balance,
            });
        }

        let slippage = request.slippage_percent.unwrap_or_else(|| Decimal::from(self.config.default_slippage_percent));
        let min_amount_out = selection.quote().min_amount_out(slippage)?;
        info!(
            venue = %selection.venue(),
            price = %selection.price(),
            reference = %selection.reference_token,
            %slippage,
            %min_amount_out,
            "Prepared swap"
        );

        let options = SwapOptions {
            approve_amount: Some(amount_in.saturating_mul(U256::from(self.config.approve_multiplier))),
            gas_price_gwei: request.gas_price_gwei,
            recipient: None,
        };
        let deadline = request.deadline_secs.unwrap_or(self.config.default_deadline_secs);
        let pending = self
            .swap(selection.venue(), &[request.token_in, request.token_out], amount_in, min_amount_out, deadline, &options)
            .await?;

        Ok(SwapReport { selection, amount_in, min_amount_out, pending })
    }

    /// Deposits native coin into the wrapped native token.
    pub async fn wrap(&self, amount: AmountSpec, gas_price_gwei: Option<u64>) -> Result<TxPhase> {
        let wrapped = self.config.wrapped_native_token;
        let amount = self.resolve_amount(NATIVE, amount).await?;
        let tx = TransactionRequest::call(self.account(), wrapped, encode_deposit()).with_value(amount);
        info!(%amount, token = %wrapped, "Wrapping native coin");
        self.executor.execute(tx, TxOptions { gas_limit: Some(WRAP_GAS_LIMIT), gas_price_gwei }).await
    }

    /// Withdraws the wrapped native token back to native coin.
    pub async fn unwrap(&self, amount: AmountSpec, gas_price_gwei: Option<u64>) -> Result<TxPhase> {
        let wrapped = self.config.wrapped_native_token;
        let amount = self.resolve_amount(wrapped, amount).await?;
        let tx = TransactionRequest::call(self.account(), wrapped, encode_withdraw(amount));
        info!(%amount, token = %wrapped, "Unwrapping native coin");
        self.executor.execute(tx, TxOptions { gas_limit: Some(WRAP_GAS_LIMIT), gas_price_gwei }).await
    }

    /// Sends `amount` of `token` to `to`. The zero address sends native coin.
    ///
    /// Token transfers are simulated and their gas estimated like any contract call.
    pub async fn transfer(
        &self,
        token: Address,
        to: Address,
        amount: AmountSpec,
        gas_price_gwei: Option<u64>,
    ) -> Result<TxPhase> {
        if to.is_zero() {
            return Err(SwapError::InvalidPath("cannot transfer to the zero address".to_string()));
        }
        let amount = self.resolve_amount(token, amount).await?;
        let account = self.account();
        let (tx, gas_limit) = if token == NATIVE {
            (TransactionRequest::call(account, to, Bytes::new()).with_value(amount), Some(NATIVE_TRANSFER_GAS_LIMIT))
        } else {
            (TransactionRequest::call(account, token, encode_transfer(to, amount)), None)
        };
        info!(%token, %to, %amount, "Transferring");
        self.executor.execute(tx, TxOptions { gas_limit, gas_price_gwei }).await
    }

    async fn resolve_amount(&self, token: Address, amount: AmountSpec) -> Result<U256> {
        let metadata = self.get_token(token).await?;
        let balance = self.raw_balance(token).await?;
        let required = match amount {
            AmountSpec::All => balance,
            spec => metadata.from_decimal(spec.resolve(metadata.to_decimal(balance)?)?)?,
        };
        if required.is_zero() {
            return Err(SwapError::InvalidAmount(format!("{amount} of {metadata} is nothing")));
        }
        if required > balance {
            return Err(SwapError::InsufficientBalance { token, required, available: balance });
        }
        Ok(required)
    }
}

fn deadline_from_now(deadline_secs: u64) -> Result<u64> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
    now.checked_add(deadline_secs)
        .ok_or_else(|| SwapError::InvalidAmount(format!("deadline of {deadline_secs}s is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::config::VenueConfig;
    use crate::data_sync::mock_ledger::MockLedger;

    #[test]
    fn test_venue_choice_parse() -> eyre::Result<()> {
        assert_eq!("any".parse::<VenueChoice>()?, VenueChoice::All);
        assert_eq!("PancakeRouterV2".parse::<VenueChoice>()?, VenueChoice::Named("PancakeRouterV2".to_string()));
        assert_eq!(
            "0x10ED43C718714eb63d5aA57B78B54704E256024E".parse::<VenueChoice>()?,
            VenueChoice::Address(crate::utils::BscRouterAddress::PANCAKE_V2)
        );
        assert!("0xnothex".parse::<VenueChoice>().is_err());
        Ok(())
    }

    #[test]
    fn test_find_venue() -> eyre::Result<()> {
        let config = SwapConfig {
            venues: vec![VenueConfig { name: "Pancake".to_string(), router: Address::repeat_byte(0x10) }],
            ..Default::default()
        };
        let orchestrator =
            SwapOrchestrator::new(config, Arc::new(MockLedger::new()), AccountCredential::new(Address::ZERO, vec![1u8]))?;

        assert_eq!(orchestrator.find_venue(&VenueChoice::Named("pancake".into()))?.get_router(), Address::repeat_byte(0x10));
        assert!(orchestrator.find_venue(&VenueChoice::Named("Ape".into())).is_err());
        let ad_hoc = orchestrator.find_venue(&VenueChoice::Address(Address::repeat_byte(0x20)))?;
        assert_eq!(ad_hoc.get_router(), Address::repeat_byte(0x20));
        // the same router keeps its venue and caches
        let again = orchestrator.find_venue(&VenueChoice::Address(Address::repeat_byte(0x20)))?;
        assert!(Arc::ptr_eq(&ad_hoc, &again));
        assert!(orchestrator.find_venue(&VenueChoice::All).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SwapConfig { worker_pool_size: 0, ..Default::default() };
        let result = SwapOrchestrator::new(config, Arc::new(MockLedger::new()), AccountCredential::new(Address::ZERO, vec![1u8]));
        assert!(matches!(result, Err(SwapError::Config(_))));
    }
}
