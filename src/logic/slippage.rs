use crate::swap_error::{Result, SwapError};
use crate::utils::{exp10, mul_div};
use alloy_primitives::U256;
use rust_decimal::Decimal;

/// `amount_out * (1 - slippage / 100)` in integer units of the output token, rounded down.
///
/// `amount_out` is the quoted output for the whole input, so this equals
/// `amount_in * rate * (1 - slippage / 100)` without going through decimals.
pub fn min_amount_out(amount_out: U256, slippage_percent: Decimal) -> Result<U256> {
    if slippage_percent < Decimal::ZERO || slippage_percent >= Decimal::ONE_HUNDRED {
        return Err(SwapError::InvalidAmount(format!("slippage {slippage_percent}% must be in [0, 100)")));
    }
    let keep = Decimal::ONE_HUNDRED - slippage_percent;
    let keep_units = u128::try_from(keep.mantissa())
        .map_err(|_| SwapError::InvalidAmount(format!("slippage {slippage_percent}% is out of range")))?;
    // keep / 100 == keep_units / (100 * 10^scale)
    let scale = u8::try_from(keep.scale()).map_err(|e| SwapError::Conversion(e.to_string()))?;
    let denominator = exp10(scale)? * U256::from(100u64);
    mul_div(amount_out, U256::from(keep_units), denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_min_amount_out() -> eyre::Result<()> {
        let e18 = U256::from(10u64).pow(U256::from(18u64));
        // 600 out, 3% slippage
        let min_out = min_amount_out(U256::from(600u64) * e18, dec!(3))?;
        assert_eq!(min_out, U256::from(582u64) * e18);
        Ok(())
    }

    #[test]
    fn test_rounds_down() -> eyre::Result<()> {
        assert_eq!(min_amount_out(U256::from(199u64), dec!(0.5))?, U256::from(198u64));
        assert_eq!(min_amount_out(U256::from(10_000u64), dec!(0.005))?, U256::from(9_999u64));
        assert_eq!(min_amount_out(U256::from(7u64), dec!(0))?, U256::from(7u64));
        Ok(())
    }

    #[test]
    fn test_high_supply_output() -> eyre::Result<()> {
        let out = U256::from(10u64).pow(U256::from(40u64));
        assert_eq!(min_amount_out(out, dec!(3))?, out / U256::from(100u64) * U256::from(97u64));
        Ok(())
    }

    #[test]
    fn test_rejects_out_of_range_slippage() {
        assert!(min_amount_out(U256::from(1u64), dec!(100)).is_err());
        assert!(min_amount_out(U256::from(1u64), dec!(-1)).is_err());
    }
}
