//! Gas limit estimation with a safety buffer

use crate::chain::{Endpoint, GasPrice};
use crate::error::{OrchResult, OrchestratorError};

use ethers::providers::JsonRpcClient;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;
use std::sync::Arc;
use tracing::debug;

/// Estimates gas limits and prices for outgoing transactions
pub struct GasEstimator {
    /// Buffer percentage applied to estimated gas limits (e.g. 20 = +20%)
    gas_limit_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new(gas_limit_buffer_percent: u64) -> Self {
        Self {
            gas_limit_buffer_percent,
        }
    }

    /// Estimate the gas limit for a call via `eth_estimateGas`, then add
    /// the configured buffer.
    pub async fn estimate_limit<P: JsonRpcClient>(
        &self,
        endpoint: &Arc<Endpoint<P>>,
        tx: &TypedTransaction,
    ) -> OrchResult<U256> {
        let estimated = endpoint
            .estimate_gas(tx)
            .await
            .map_err(|e| OrchestratorError::GasEstimation(e.to_string()))?;

        let limit = self.buffered(estimated);
        debug!("Gas limit estimated: {} (buffered: {})", estimated, limit);
        Ok(limit)
    }

    /// Current gas price per the endpoint's configured strategy
    pub async fn get_gas_price<P: JsonRpcClient>(
        &self,
        endpoint: &Arc<Endpoint<P>>,
    ) -> OrchResult<GasPrice> {
        endpoint.get_gas_price().await
    }

    fn buffered(&self, estimate: U256) -> U256 {
        estimate + estimate * self.gas_limit_buffer_percent / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_applied() {
        let estimator = GasEstimator::new(20);
        assert_eq!(
            estimator.buffered(U256::from(100_000u64)),
            U256::from(120_000u64)
        );
        let flat = GasEstimator::new(0);
        assert_eq!(flat.buffered(U256::from(100_000u64)), U256::from(100_000u64));
    }
}
