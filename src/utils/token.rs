use crate::swap_error::Result;
use crate::utils::units;
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// ERC-20 token. Decimals, symbol and name are fetched once and never change for the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    address: Address,
    decimals: u8,
    name: Option<String>,
    symbol: Option<String>,
}

pub type TokenWrapper = Arc<Token>;

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.get_address()
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.get_address())
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.get_symbol(), self.address)
    }
}

impl Token {
    pub fn new(address: Address, decimals: u8) -> Token {
        Token { address, decimals, name: None, symbol: None }
    }

    pub fn new_with_data(address: Address, symbol: Option<String>, name: Option<String>, decimals: u8) -> Token {
        Token { address, symbol, name, decimals }
    }

    // For testing purposes
    pub fn repeat_byte(byte: u8, decimals: u8) -> Token {
        Token::new(Address::repeat_byte(byte), decimals)
    }

    pub fn get_symbol(&self) -> String {
        self.symbol.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_name(&self) -> String {
        self.name.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    pub fn get_exp(&self) -> Result<U256> {
        units::exp10(self.decimals)
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    /// Integer units to natural amount.
    pub fn to_decimal(&self, value: U256) -> Result<Decimal> {
        units::to_decimal(value, self.decimals)
    }

    /// Natural amount to integer units, rounded to the nearest unit.
    pub fn from_decimal(&self, value: Decimal) -> Result<U256> {
        units::to_units(value, self.decimals)
    }

    pub fn is_native(&self) -> bool {
        self.address.is_zero()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::constants::WBNB;
    use rust_decimal_macros::dec;

    #[test]
    fn test_serialize() {
        let wbnb = Token::new_with_data(WBNB, Some("WBNB".to_string()), None, 18);

        let serialized = serde_json::to_string(&wbnb).unwrap();
        assert_eq!(
            serialized,
            "{\"address\":\"0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c\",\"decimals\":18,\"name\":null,\"symbol\":\"WBNB\"}"
        );
    }

    #[test]
    fn test_conversions() -> eyre::Result<()> {
        let token = Token::repeat_byte(1, 12);
        assert_eq!(token.from_decimal(dec!(1.5))?, U256::from(1_500_000_000_000u64));
        assert_eq!(token.to_decimal(U256::from(10u64))?, dec!(0.00000000001));
        assert_eq!(token.get_exp()?, U256::from(1_000_000_000_000u64));
        Ok(())
    }

    #[test]
    fn test_identity_is_address() {
        let a = Token::new_with_data(Address::repeat_byte(7), Some("A".into()), None, 18);
        let b = Token::new(Address::repeat_byte(7), 6);
        assert_eq!(a, b);
        assert_eq!(format!("{a}"), format!("A({})", Address::repeat_byte(7)));
    }
}
