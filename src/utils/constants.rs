use alloy_primitives::{Address, address};

pub const BSC_CHAIN_ID: u64 = 56;

pub const WBNB: Address = address!("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
pub const USDT: Address = address!("0x55d398326f99059fF775485246999027B3197955");
pub const BUSD: Address = address!("0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56");
pub const USDC: Address = address!("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d");

pub const NATIVE: Address = Address::ZERO;

pub const NATIVE_TOKEN_DECIMALS: u8 = 18;

/// Reference tokens in priority order, most fundamental first.
pub const BSC_REFERENCE_TOKENS: [(&str, Address); 4] = [("WBNB", WBNB), ("USDT", USDT), ("BUSD", BUSD), ("USDC", USDC)];

#[non_exhaustive]
pub struct BscRouterAddress;

impl BscRouterAddress {
    // Uniswap V2 compatible routers
    pub const PANCAKE_V2: Address = address!("10ED43C718714eb63d5aA57B78B54704E256024E");
    pub const PANCAKE_V1: Address = address!("05fF2B0DB69458A0750badebc4f9e13aDd608C7F");
    pub const CAFESWAP_V2: Address = address!("933DAea3a5995Fb94b14A7696a5F3ffD7B1E385A");
    pub const SAFESWAP: Address = address!("E804f3C3E6DdA8159055428848fE6f2a91c2b9AF");
    pub const SHIBANCE: Address = address!("A1fDB322Ab5fE4dF90099E6f514B9819AEaCA8Cf");
    pub const BABY: Address = address!("325E343f1dE602396E256B67eFd1F61C3A6B38Bd");
    pub const PANTHERSWAP: Address = address!("24f7C33ae5f77e2A9ECeed7EA858B4ca2fa1B7eC");
    pub const APE: Address = address!("C0788A3aD43d79aa53B09c2EaCc313A787d1d607");
    pub const MDEX: Address = address!("7DAe51BD3E3376B8c7c4900E9107f12Be3AF1bA8");
    pub const JETSWAP: Address = address!("A8583a8C53A08EbCD6cB494B10Ce48C86F53Be75");
    pub const SWAP: Address = address!("E9C7650b97712C0Ec958FF270FBF4189fB99C071");
}

pub const BSC_ROUTERS: [(&str, Address); 11] = [
    ("PancakeRouterV2", BscRouterAddress::PANCAKE_V2),
    ("PancakeRouterV1", BscRouterAddress::PANCAKE_V1),
    ("CafeSwapRouterV2", BscRouterAddress::CAFESWAP_V2),
    ("SafeswapRouter", BscRouterAddress::SAFESWAP),
    ("ShibanceRouter", BscRouterAddress::SHIBANCE),
    ("BabyRouter", BscRouterAddress::BABY),
    ("PantherSwapRouter", BscRouterAddress::PANTHERSWAP),
    ("ApeRouter", BscRouterAddress::APE),
    ("MDEXRouter", BscRouterAddress::MDEX),
    ("JetswapRouter", BscRouterAddress::JETSWAP),
    ("SwapRouter", BscRouterAddress::SWAP),
];
