use crate::swap_error::{Result, SwapError};
use alloy_primitives::{U256, U512};
use rust_decimal::{Decimal, RoundingStrategy};

/// Largest scale a `Decimal` can carry.
pub const MAX_DECIMAL_SCALE: u8 = 28;

const MAX_MANTISSA: u128 = (1 << 96) - 1;

pub fn exp10(decimals: u8) -> Result<U256> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| SwapError::Conversion(format!("10^{decimals} overflows")))
}

/// Converts a natural amount to integer token units, `round(amount * 10^decimals)`.
///
/// Midpoints round to the nearest even unit. Negative amounts are rejected.
pub fn to_units(amount: Decimal, decimals: u8) -> Result<U256> {
    to_units_with_strategy(amount, decimals, RoundingStrategy::MidpointNearestEven)
}

/// Same as [`to_units`] but truncates toward zero. Used for lower bounds such as minimum output.
pub fn to_units_floor(amount: Decimal, decimals: u8) -> Result<U256> {
    to_units_with_strategy(amount, decimals, RoundingStrategy::ToZero)
}

fn to_units_with_strategy(amount: Decimal, decimals: u8, strategy: RoundingStrategy) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(SwapError::Conversion(format!("negative amount {amount}")));
    }
    let rounded = amount.round_dp_with_strategy(decimals as u32, strategy);
    let scale = rounded.scale() as u8;
    let mantissa = u128::try_from(rounded.mantissa())
        .map_err(|_| SwapError::Conversion(format!("negative mantissa for {amount}")))?;

    // after rounding scale <= decimals
    U256::from(mantissa)
        .checked_mul(exp10(decimals - scale)?)
        .ok_or_else(|| SwapError::Conversion(format!("{amount} overflows with {decimals} decimals")))
}

/// Converts integer token units back to the natural decimal amount.
///
/// Amounts wider than the 96-bit decimal mantissa keep their integer part and lose
/// trailing fractional digits, truncated toward zero. Fails when the integer part alone
/// does not fit or when the token uses more than 28 decimals.
pub fn to_decimal(units: U256, decimals: u8) -> Result<Decimal> {
    if decimals > MAX_DECIMAL_SCALE {
        return Err(SwapError::Conversion(format!("{decimals} decimals exceed decimal precision")));
    }
    decimal_from_units(widen(units), decimals as u32)
}

/// Fractional digits computed by [`ratio`] before narrowing to a `Decimal`.
pub const RATIO_SCALE: u32 = 18;

/// `(numerator / 10^numerator_decimals) / (denominator / 10^denominator_decimals)`.
///
/// The division runs on 512-bit integers so the operands may use the full U256 range.
/// Only the quotient is narrowed to a `Decimal`.
pub fn ratio(numerator: U256, numerator_decimals: u8, denominator: U256, denominator_decimals: u8) -> Result<Decimal> {
    if denominator.is_zero() {
        return Err(SwapError::Conversion(format!("cannot divide {numerator} by zero")));
    }
    let overflow = || SwapError::Conversion(format!("{numerator} / {denominator} overflows"));
    let scaled = widen(numerator)
        .checked_mul(exp10_wide(denominator_decimals as u32 + RATIO_SCALE)?)
        .ok_or_else(overflow)?;
    let divisor = widen(denominator).checked_mul(exp10_wide(numerator_decimals as u32)?).ok_or_else(overflow)?;
    decimal_from_units(scaled / divisor, RATIO_SCALE)
}

/// `amount * numerator / denominator` without intermediate overflow, rounded down.
pub fn mul_div(amount: U256, numerator: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(SwapError::Conversion(format!("cannot divide {amount} by zero")));
    }
    narrow(widen(amount) * widen(numerator) / widen(denominator))
}

fn widen(value: U256) -> U512 {
    let mut limbs = [0u64; 8];
    limbs[..4].copy_from_slice(value.as_limbs());
    U512::from_limbs(limbs)
}

fn narrow(value: U512) -> Result<U256> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(SwapError::Conversion(format!("{value} does not fit 256 bits")));
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

fn exp10_wide(exp: u32) -> Result<U512> {
    U512::from(10u64)
        .checked_pow(U512::from(exp))
        .ok_or_else(|| SwapError::Conversion(format!("10^{exp} overflows")))
}

// drops fractional digits until the mantissa fits
fn decimal_from_units(units: U512, scale: u32) -> Result<Decimal> {
    let max_mantissa = U512::from(MAX_MANTISSA);
    let ten = U512::from(10u64);
    let (mut mantissa, mut scale) = (units, scale);
    while mantissa > max_mantissa && scale > 0 {
        mantissa /= ten;
        scale -= 1;
    }
    let raw = u128::try_from(mantissa)
        .ok()
        .filter(|value| *value <= MAX_MANTISSA)
        .and_then(|value| i128::try_from(value).ok())
        .ok_or_else(|| SwapError::Conversion(format!("{units} does not fit decimal mantissa")))?;

    Decimal::try_from_i128_with_scale(raw, scale)
        .map(|value| value.normalize())
        .map_err(|e| SwapError::Conversion(format!("{units} with scale {scale}: {e}")))
}
