use crate::utils::{
    BSC_CHAIN_ID, BSC_REFERENCE_TOKENS, BSC_ROUTERS, LoadConfigError, SwapConfigLoader, SwapConfigLoaderSync, WBNB,
    load_from_file, load_from_file_sync,
};
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "BLOCKCHAIN_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    pub name: String,
    pub router: Address,
}

/// Configuration for quoting and swap execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    pub chain_id: u64,
    /// Routers to quote against, in tie-break order
    pub venues: Vec<VenueConfig>,
    /// Pricing anchors, most fundamental first
    pub reference_tokens: Vec<Address>,
    pub wrapped_native_token: Address,
    /// Pools cached per venue, 0 disables caching
    pub pool_cache_capacity: usize,
    /// Concurrent quote requests during venue selection
    pub worker_pool_size: usize,
    pub poll_interval_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub quote_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub gas_price_floor_gwei: u64,
    pub gas_price_ceiling_gwei: u64,
    pub default_deadline_secs: u64,
    pub default_slippage_percent: u32,
    /// Approved amount as a multiple of the swapped amount
    pub approve_multiplier: u32,
    /// Sign and simulate but never submit
    pub test_mode: bool,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            chain_id: BSC_CHAIN_ID,
            venues: BSC_ROUTERS.iter().map(|(name, router)| VenueConfig { name: name.to_string(), router: *router }).collect(),
            reference_tokens: BSC_REFERENCE_TOKENS.iter().map(|(_, token)| *token).collect(),
            wrapped_native_token: WBNB,
            pool_cache_capacity: 100,
            worker_pool_size: 10,
            poll_interval_ms: 1000,
            confirmation_timeout_secs: 180,
            quote_timeout_secs: 60,
            submit_timeout_secs: 60,
            gas_price_floor_gwei: 1,
            gas_price_ceiling_gwei: 10_000,
            default_deadline_secs: 60,
            default_slippage_percent: 3,
            approve_multiplier: 2,
            test_mode: true,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, LoadConfigError>
where
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| LoadConfigError::ConfigError(format!("Invalid {ENV_PREFIX}{name}: {e}")))
        })
        .transpose()
}

fn parse_address_list(name: &str, raw: &str) -> Result<Vec<Address>, LoadConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Address::from_str(s).map_err(|e| LoadConfigError::ConfigError(format!("Invalid {ENV_PREFIX}{name}: {e}"))))
        .collect()
}

impl SwapConfig {
    /// Defaults overridden by `BLOCKCHAIN_*` environment variables (`.env` is loaded first).
    ///
    /// `BLOCKCHAIN_VENUES` is a comma separated list of `name=router` entries.
    pub fn from_env() -> Result<Self, LoadConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Some(chain_id) = parse_env("CHAIN_ID")? {
            config.chain_id = chain_id;
        }
        if let Some(raw) = env_var("VENUES") {
            config.venues = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|entry| {
                    let (name, router) = entry.split_once('=').ok_or_else(|| {
                        LoadConfigError::ConfigError(format!("Invalid {ENV_PREFIX}VENUES entry {entry}, expected name=router"))
                    })?;
                    let router = Address::from_str(router.trim())
                        .map_err(|e| LoadConfigError::ConfigError(format!("Invalid router for {name}: {e}")))?;
                    Ok(VenueConfig { name: name.trim().to_string(), router })
                })
                .collect::<Result<_, LoadConfigError>>()?;
        }
        if let Some(raw) = env_var("REFERENCE_TOKENS") {
            config.reference_tokens = parse_address_list("REFERENCE_TOKENS", &raw)?;
        }
        if let Some(token) = parse_env("WRAPPED_NATIVE_TOKEN")? {
            config.wrapped_native_token = token;
        }
        if let Some(capacity) = parse_env("POOL_CACHE_CAPACITY")? {
            config.pool_cache_capacity = capacity;
        }
        if let Some(workers) = parse_env("WORKER_POOL_SIZE")? {
            config.worker_pool_size = workers;
        }
        if let Some(interval) = parse_env("POLL_INTERVAL_MS")? {
            config.poll_interval_ms = interval;
        }
        if let Some(timeout) = parse_env("CONFIRMATION_TIMEOUT_SECS")? {
            config.confirmation_timeout_secs = timeout;
        }
        if let Some(timeout) = parse_env("QUOTE_TIMEOUT_SECS")? {
            config.quote_timeout_secs = timeout;
        }
        if let Some(timeout) = parse_env("SUBMIT_TIMEOUT_SECS")? {
            config.submit_timeout_secs = timeout;
        }
        if let Some(floor) = parse_env("GAS_PRICE_FLOOR_GWEI")? {
            config.gas_price_floor_gwei = floor;
        }
        if let Some(ceiling) = parse_env("GAS_PRICE_CEILING_GWEI")? {
            config.gas_price_ceiling_gwei = ceiling;
        }
        if let Some(deadline) = parse_env("DEADLINE_SECS")? {
            config.default_deadline_secs = deadline;
        }
        if let Some(slippage) = parse_env("SLIPPAGE_PERCENT")? {
            config.default_slippage_percent = slippage;
        }
        if let Some(multiplier) = parse_env("APPROVE_MULTIPLIER")? {
            config.approve_multiplier = multiplier;
        }
        if let Some(test_mode) = parse_env("TEST_MODE")? {
            config.test_mode = test_mode;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadConfigError> {
        let invalid = |msg: String| Err(LoadConfigError::ConfigError(msg));

        if self.venues.is_empty() {
            return invalid("at least one venue is required".to_string());
        }
        let mut routers = HashSet::new();
        if let Some(dup) = self.venues.iter().find(|v| !routers.insert(v.router)) {
            return invalid(format!("router {} is configured twice ({})", dup.router, dup.name));
        }
        if self.worker_pool_size == 0 {
            return invalid("worker_pool_size must be positive".to_string());
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms must be positive".to_string());
        }
        if self.gas_price_floor_gwei > self.gas_price_ceiling_gwei {
            return invalid(format!(
                "gas price floor {} gwei is above ceiling {} gwei",
                self.gas_price_floor_gwei, self.gas_price_ceiling_gwei
            ));
        }
        if self.default_slippage_percent >= 100 {
            return invalid(format!("slippage {}% leaves no minimum output", self.default_slippage_percent));
        }
        if self.approve_multiplier == 0 {
            return invalid("approve_multiplier must be positive".to_string());
        }
        Ok(())
    }

    pub fn is_reference_token(&self, token: Address) -> bool {
        self.reference_tokens.contains(&token)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SwapConfigRoot {
    #[serde(default)]
    swap: SwapConfig,
}

#[async_trait]
impl SwapConfigLoader for SwapConfig {
    type SectionType = SwapConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: SwapConfigRoot = load_from_file(file_name).await?;
        root.swap.validate()?;
        Ok(root.swap)
    }
}

impl SwapConfigLoaderSync for SwapConfig {
    type SectionType = SwapConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: SwapConfigRoot = load_from_file_sync(file_name)?;
        root.swap.validate()?;
        Ok(root.swap)
    }
}
