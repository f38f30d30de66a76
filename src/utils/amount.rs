use crate::swap_error::{Result, SwapError};
use rust_decimal::Decimal;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Amount requested by a caller: a fixed natural amount, the whole balance, or a share of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountSpec {
    Exact(Decimal),
    All,
    Percent(Decimal),
}

impl AmountSpec {
    /// Resolves the request against the current natural balance.
    pub fn resolve(&self, balance: Decimal) -> Result<Decimal> {
        match self {
            AmountSpec::Exact(amount) => Ok(*amount),
            AmountSpec::All => Ok(balance),
            AmountSpec::Percent(percent) => balance
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(|| SwapError::InvalidAmount(format!("{percent}% of {balance} overflows"))),
        }
    }
}

impl FromStr for AmountSpec {
    type Err = SwapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let spec = if s.eq_ignore_ascii_case("all") {
            AmountSpec::All
        } else if let Some(percent) = s.strip_suffix('%') {
            let percent = Decimal::from_str(percent.trim())
                .map_err(|e| SwapError::InvalidAmount(format!("{s}: {e}")))?;
            if percent > Decimal::ONE_HUNDRED {
                return Err(SwapError::InvalidAmount(format!("{s} is more than the whole balance")));
            }
            AmountSpec::Percent(percent)
        } else {
            AmountSpec::Exact(Decimal::from_str(s).map_err(|e| SwapError::InvalidAmount(format!("{s}: {e}")))?)
        };

        match spec {
            AmountSpec::Exact(v) | AmountSpec::Percent(v) if v <= Decimal::ZERO => {
                Err(SwapError::InvalidAmount(format!("{s} must be positive")))
            }
            spec => Ok(spec),
        }
    }
}

impl Display for AmountSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountSpec::Exact(amount) => write!(f, "{amount}"),
            AmountSpec::All => write!(f, "all"),
            AmountSpec::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse() -> eyre::Result<()> {
        assert_eq!("1.5".parse::<AmountSpec>()?, AmountSpec::Exact(dec!(1.5)));
        assert_eq!("ALL".parse::<AmountSpec>()?, AmountSpec::All);
        assert_eq!("10%".parse::<AmountSpec>()?, AmountSpec::Percent(dec!(10)));
        assert!("-1".parse::<AmountSpec>().is_err());
        assert!("0%".parse::<AmountSpec>().is_err());
        assert!("150%".parse::<AmountSpec>().is_err());
        assert!("ten".parse::<AmountSpec>().is_err());
        Ok(())
    }

    #[test]
    fn test_resolve() -> eyre::Result<()> {
        let balance = dec!(250);
        assert_eq!(AmountSpec::Exact(dec!(3)).resolve(balance)?, dec!(3));
        assert_eq!(AmountSpec::All.resolve(balance)?, dec!(250));
        assert_eq!(AmountSpec::Percent(dec!(10)).resolve(balance)?, dec!(25));
        Ok(())
    }
}
