use crate::data_sync::ledger::PoolReserves;
use crate::swap_error::{Result, SwapError};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Liquidity pair. Token order is fixed by the venue, not by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pool {
    pub token0: Address,
    pub token1: Address,
    pub address: Address,
}

pub type PoolHandle = Arc<Pool>;

/// Reserves mapped onto a caller's `(token_in, token_out)` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub pool: Address,
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub timestamp: u32,
}

impl Pool {
    pub fn new(token0: Address, token1: Address, address: Address) -> Self {
        Self { token0, token1, address }
    }

    pub fn get_tokens(&self) -> (Address, Address) {
        (self.token0, self.token1)
    }

    pub fn contains(&self, token: Address) -> bool {
        self.token0 == token || self.token1 == token
    }

    /// Orients raw reserves to `token_in -> token_out`.
    pub fn oriented(&self, reserves: &PoolReserves, token_in: Address, token_out: Address) -> Result<ReserveSnapshot> {
        let (reserve_in, reserve_out) = if (token_in, token_out) == (self.token0, self.token1) {
            (reserves.reserve0, reserves.reserve1)
        } else if (token_in, token_out) == (self.token1, self.token0) {
            (reserves.reserve1, reserves.reserve0)
        } else {
            return Err(SwapError::PairMismatch { pool: self.address, token_in, token_out });
        };

        Ok(ReserveSnapshot { pool: self.address, reserve_in, reserve_out, timestamp: reserves.block_timestamp_last })
    }
}

impl Display for Pool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}, {})", self.address, self.token0, self.token1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserves() -> PoolReserves {
        PoolReserves { reserve0: U256::from(5u64), reserve1: U256::from(7u64), block_timestamp_last: 42 }
    }

    #[test]
    fn test_oriented_both_directions() -> eyre::Result<()> {
        let (a, b) = (Address::repeat_byte(1), Address::repeat_byte(2));
        let pool = Pool::new(a, b, Address::repeat_byte(9));

        let forward = pool.oriented(&reserves(), a, b)?;
        assert_eq!((forward.reserve_in, forward.reserve_out), (U256::from(5u64), U256::from(7u64)));

        let backward = pool.oriented(&reserves(), b, a)?;
        assert_eq!((backward.reserve_in, backward.reserve_out), (U256::from(7u64), U256::from(5u64)));
        assert_eq!(backward.timestamp, 42);
        Ok(())
    }

    #[test]
    fn test_oriented_rejects_foreign_token() {
        let pool = Pool::new(Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(9));
        let result = pool.oriented(&reserves(), Address::repeat_byte(1), Address::repeat_byte(3));
        assert!(matches!(result, Err(SwapError::PairMismatch { .. })));
    }
}
