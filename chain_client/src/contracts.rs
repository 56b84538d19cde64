use alloy::sol;

// Comptroller (Unitroller proxy). The hypothetical liquidity read takes the
// comptroller address itself as its first argument.
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface Comptroller {
        function getAssetsIn(address account) external view returns (address[] memory);
        function getHypotheticalAccountLiquidity(
            address comptroller,
            address account,
            address vTokenModify,
            uint256 redeemTokens,
            uint256 borrowAmount
        ) external view returns (uint256, uint256, uint256);
        function mintedVAIs(address account) external view returns (uint256);
        function claimVenus(address holder) external;
    }
);

// VenusLens read aggregator. vTokenBalancesAll is not a view function on
// chain (balanceOfUnderlying accrues interest) but is only ever issued as an
// eth_call here.
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface VenusLens {
        struct VTokenBalances {
            address vToken;
            uint256 balanceOf;
            uint256 borrowBalanceCurrent;
            uint256 balanceOfUnderlying;
            uint256 tokenBalance;
            uint256 tokenAllowance;
        }

        function vTokenBalancesAll(address[] calldata vTokens, address account) external returns (VTokenBalances[] memory);
        function pendingVenus(address account, address comptroller) external view returns (uint256);
    }
);

// --------- Multicall ---------
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface Multicall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
    }
);

// Reserves are uint112 on chain; each return word is still 32 bytes, so
// decoding them as uint256 is ABI-compatible and saves a narrow-int hop.
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface PancakePair {
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint256 blockTimestampLast);
    }
);

// --------- Staking vaults ---------
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface XvsVault {
        function claim(address account, address rewardToken, uint256 pid) external;
    }
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface VaiVault {
        function claim(address account) external;
    }
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface VrtVault {
        function claim(address account) external;
    }
);
