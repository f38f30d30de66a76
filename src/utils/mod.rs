pub mod amount;
pub mod cache;
pub mod config_loader;
pub mod constants;
pub mod token;
pub mod units;

pub use amount::AmountSpec;
pub use cache::{CacheStats, PairKey, PoolCache};
pub use config_loader::*;
pub use constants::*;
pub use token::{Token, TokenWrapper};
pub use units::{exp10, mul_div, ratio, to_decimal, to_units, to_units_floor};
