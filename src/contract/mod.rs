//! Contract bindings
//!
//! A binding pairs a fixed on-chain address with the ABI fragment this
//! client is allowed to call. Encoding is validated before any network
//! round-trip; reads are always fresh `eth_call`s since balances and
//! allowances are time-varying.

use crate::chain::Endpoint;
use crate::error::{OrchResult, OrchestratorError};

use ethers::abi::{Abi, Function, StateMutability, Token};
use ethers::providers::JsonRpcClient;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use std::sync::Arc;

/// A fixed contract address plus its declared callable surface
#[derive(Debug, Clone)]
pub struct ContractBinding {
    name: &'static str,
    address: Address,
    abi: Abi,
}

impl ContractBinding {
    /// Parse a binding from human-readable function signatures
    pub fn new(name: &'static str, address: Address, signatures: &[&str]) -> OrchResult<Self> {
        let abi = ethers::abi::parse_abi(signatures).map_err(|e| {
            OrchestratorError::Configuration(format!("Bad ABI fragment for {name}: {e}"))
        })?;
        Ok(Self { name, address, abi })
    }

    /// ERC20 surface used by the operation scripts
    pub fn erc20(address: Address) -> OrchResult<Self> {
        Self::new(
            "erc20",
            address,
            &[
                "function balanceOf(address owner) view returns (uint256)",
                "function allowance(address owner, address spender) view returns (uint256)",
                "function decimals() view returns (uint8)",
                "function symbol() view returns (string)",
            ],
        )
    }

    /// DEX router surface (Pangolin-style AVAX pairs)
    pub fn router(address: Address) -> OrchResult<Self> {
        Self::new(
            "router",
            address,
            &[
                "function addLiquidityAVAX(address token, uint256 amountTokenDesired, uint256 amountTokenMin, uint256 amountAVAXMin, address to, uint256 deadline) payable returns (uint256 amountToken, uint256 amountAVAX, uint256 liquidity)",
                "function removeLiquidityAVAX(address token, uint256 liquidity, uint256 amountTokenMin, uint256 amountAVAXMin, address to, uint256 deadline) returns (uint256 amountToken, uint256 amountAVAX)",
                "function swapExactAVAXForTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) payable returns (uint256[] amounts)",
                "function swapExactTokensForAVAX(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) returns (uint256[] amounts)",
                "function getAmountsOut(uint256 amountIn, address[] path) view returns (uint256[] amounts)",
            ],
        )
    }

    /// Cross-chain bridge surface
    pub fn bridge(address: Address) -> OrchResult<Self> {
        Self::new(
            "bridge",
            address,
            &["function bridgeTo(address token, uint256 amount)"],
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Look up a declared function
    pub fn function(&self, name: &str) -> OrchResult<&Function> {
        self.abi
            .function(name)
            .map_err(|_| OrchestratorError::UnknownFunction {
                contract: self.name.to_string(),
                function: name.to_string(),
            })
    }

    /// Encode a call payload, validating arity and types first.
    /// Fails before any network round-trip.
    pub fn encode_call(&self, function: &str, args: &[Token]) -> OrchResult<Bytes> {
        let func = self.function(function)?;
        if func.inputs.len() != args.len() {
            return Err(OrchestratorError::InvalidArguments {
                function: function.to_string(),
                message: format!("expected {} arguments, got {}", func.inputs.len(), args.len()),
            });
        }
        func.encode_input(args)
            .map(Bytes::from)
            .map_err(|e| OrchestratorError::InvalidArguments {
                function: function.to_string(),
                message: e.to_string(),
            })
    }

    /// Execute a view function and decode its outputs.
    /// No caching: every read is a fresh round-trip.
    pub async fn read<P: JsonRpcClient>(
        &self,
        endpoint: &Arc<Endpoint<P>>,
        function: &str,
        args: &[Token],
    ) -> OrchResult<Vec<Token>> {
        let func = self.function(function)?;
        if !matches!(
            func.state_mutability,
            StateMutability::View | StateMutability::Pure
        ) {
            return Err(OrchestratorError::InvalidArguments {
                function: function.to_string(),
                message: "not a read-only function".to_string(),
            });
        }

        let data = self.encode_call(function, args)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.address)
            .data(data)
            .into();

        let output = endpoint
            .call(&tx, None)
            .await
            .map_err(|e| OrchestratorError::ChainConnection(e.to_string()))?;

        func.decode_output(&output)
            .map_err(|e| OrchestratorError::InvalidArguments {
                function: function.to_string(),
                message: format!("undecodable output: {e}"),
            })
    }
}
