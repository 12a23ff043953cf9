use alloy_sol_types::sol;

sol! {
    #[allow(missing_docs)]
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Cluster {
        uint32 validatorCount;
        uint64 networkFeeIndex;
        uint64 index;
        bool active;
        uint256 balance;
    }

    // Reference: https://github.com/ssvlabs/ssv-network/blob/main/contracts/interfaces/ISSVValidators.sol
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface SSVNetwork {
        event ValidatorAdded(
            address indexed owner,
            uint64[] operatorIds,
            bytes publicKey,
            bytes shares,
            Cluster cluster
        );

        event ValidatorRemoved(address indexed owner, uint64[] operatorIds, bytes publicKey, Cluster cluster);

        event ValidatorExited(address indexed owner, uint64[] operatorIds, bytes publicKey);

        event ClusterLiquidated(address indexed owner, uint64[] operatorIds, Cluster cluster);

        function registerValidator(
            bytes calldata publicKey,
            uint64[] memory operatorIds,
            bytes calldata sharesData,
            uint256 amount,
            Cluster memory cluster
        ) external;

        function bulkRegisterValidator(
            bytes[] calldata publicKeys,
            uint64[] memory operatorIds,
            bytes[] calldata sharesData,
            uint256 amount,
            Cluster memory cluster
        ) external;

        function removeValidator(
            bytes calldata publicKey,
            uint64[] memory operatorIds,
            Cluster memory cluster
        ) external;

        function exitValidator(bytes calldata publicKey, uint64[] calldata operatorIds) external;

        function liquidate(address clusterOwner, uint64[] memory operatorIds, Cluster memory cluster)
            external;
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::keccak256;
    use alloy_sol_types::SolCall;

    use super::*;

    #[test]
    fn test_bulk_register_signature() {
        assert_eq!(
            SSVNetwork::bulkRegisterValidatorCall::SIGNATURE,
            "bulkRegisterValidator(bytes[],uint64[],bytes[],uint256,(uint32,uint64,uint64,bool,uint256))"
        );
    }

    #[test]
    fn test_exit_validator_selector() {
        let hash = keccak256("exitValidator(bytes,uint64[])");
        assert_eq!(SSVNetwork::exitValidatorCall::SELECTOR, hash[..4]);
    }
}
