use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, sol};

// Uniswap V2 compatible contract interfaces
sol! {
    interface IUniswapV2Router02 {
        function factory() external pure returns (address);
        function getAmountOut(uint amountIn, uint reserveIn, uint reserveOut) external pure returns (uint amountOut);
        function swapExactTokensForTokensSupportingFeeOnTransferTokens(
            uint amountIn,
            uint amountOutMin,
            address[] calldata path,
            address to,
            uint deadline
        ) external;
    }

    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    interface IERC20 {
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function name() external view returns (string);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    interface IWrappedNative {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}

pub fn encode_swap_exact_tokens(
    amount_in: U256,
    amount_out_min: U256,
    path: Vec<Address>,
    recipient: Address,
    deadline: u64,
) -> Bytes {
    IUniswapV2Router02::swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
        amountIn: amount_in,
        amountOutMin: amount_out_min,
        path,
        to: recipient,
        deadline: U256::from(deadline),
    }
    .abi_encode()
    .into()
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

pub fn encode_deposit() -> Bytes {
    IWrappedNative::depositCall {}.abi_encode().into()
}

pub fn encode_withdraw(amount: U256) -> Bytes {
    IWrappedNative::withdrawCall { wad: amount }.abi_encode().into()
}
