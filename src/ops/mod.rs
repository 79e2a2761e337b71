//! Operation scripts
//!
//! One module per use case. Every script follows the same shape: read the
//! balances/allowances the operation depends on, construct a call intent
//! with live-quoted minimums and a real deadline, submit it through the
//! lifecycle engine, and report the terminal state.

pub mod bridge;
pub mod liquidity;
pub mod swap;

use crate::amount::Amount;
use crate::chain::Endpoint;
use crate::config::Settings;
use crate::contract::ContractBinding;
use crate::error::{OrchResult, OrchestratorError};
use crate::lifecycle::{Confirmation, LifecycleEngine, TxState};
use crate::wallet::SigningIdentity;

use chrono::Utc;
use ethers::abi::Token;
use ethers::types::{Address, U256};
use std::fmt;
use std::sync::Arc;

/// Decimals of the chain's native currency
pub const NATIVE_DECIMALS: u8 = 18;

/// Everything an operation needs, built once per invocation.
/// No global signer/provider state: the context is passed explicitly.
pub struct OpContext {
    pub settings: Settings,
    pub endpoint: Arc<Endpoint>,
    pub signer: Arc<SigningIdentity>,
    pub engine: LifecycleEngine,
}

impl OpContext {
    pub fn new(settings: Settings) -> OrchResult<Self> {
        let endpoint = Arc::new(Endpoint::new(
            settings.endpoint.clone(),
            settings.engine.gas_price_strategy,
            settings.engine.max_gas_price_gwei,
        )?);

        let key = settings
            .private_key()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        let signer = Arc::new(SigningIdentity::from_key(&key, settings.endpoint.chain_id)?);

        let engine = LifecycleEngine::new(
            endpoint.clone(),
            signer.clone(),
            settings.engine.clone(),
        );

        Ok(Self {
            settings,
            endpoint,
            signer,
            engine,
        })
    }

    pub fn router_binding(&self) -> OrchResult<ContractBinding> {
        ContractBinding::router(parse_address("contracts.router", &self.settings.contracts.router)?)
    }

    pub fn wrapped_native(&self) -> OrchResult<Address> {
        parse_address(
            "contracts.wrapped_native",
            &self.settings.contracts.wrapped_native,
        )
    }

    /// Token metadata needed to interpret operator-supplied decimal text
    pub async fn token_decimals(&self, token: &ContractBinding) -> OrchResult<u8> {
        let out = token.read(&self.endpoint, "decimals", &[]).await?;
        match out.first() {
            Some(Token::Uint(v)) => decimals_from_word(*v),
            _ => Err(OrchestratorError::InvalidArguments {
                function: "decimals".into(),
                message: "unexpected output shape".into(),
            }),
        }
    }

    pub async fn token_symbol(&self, token: &ContractBinding) -> String {
        match token.read(&self.endpoint, "symbol", &[]).await {
            Ok(out) => match out.into_iter().next() {
                Some(Token::String(s)) => s,
                _ => format!("{:?}", token.address()),
            },
            Err(_) => format!("{:?}", token.address()),
        }
    }

    /// Check that the signer holds and has approved enough of `token`
    /// toward `spender`. Both reads run concurrently; failures surface
    /// before anything is built or signed.
    pub async fn require_funds(
        &self,
        token: &ContractBinding,
        spender: Address,
        needed: &Amount,
    ) -> OrchResult<()> {
        let owner = self.signer.address();
        // The argument slices must outlive both futures.
        let balance_args = [Token::Address(owner)];
        let allowance_args = [Token::Address(owner), Token::Address(spender)];
        let (balance_out, allowance_out) = futures::try_join!(
            token.read(&self.endpoint, "balanceOf", &balance_args),
            token.read(&self.endpoint, "allowance", &allowance_args),
        )?;

        let balance = expect_uint(&balance_out, "balanceOf")?;
        let allowance = expect_uint(&allowance_out, "allowance")?;
        let decimals = needed.decimals();

        if balance < needed.raw() {
            return Err(OrchestratorError::InsufficientBalance {
                token: format!("{:?}", token.address()),
                have: Amount::from_raw(balance, decimals).to_decimal_string(),
                need: needed.to_decimal_string(),
            });
        }
        if allowance < needed.raw() {
            return Err(OrchestratorError::InsufficientAllowance {
                token: format!("{:?}", token.address()),
                spender: format!("{spender:?}"),
                have: Amount::from_raw(allowance, decimals).to_decimal_string(),
                need: needed.to_decimal_string(),
            });
        }
        Ok(())
    }

    /// Check the signer's native balance covers the attached value
    pub async fn require_native(&self, needed: &Amount) -> OrchResult<()> {
        let balance = self.endpoint.get_balance(self.signer.address()).await?;
        if balance < needed.raw() {
            return Err(OrchestratorError::InsufficientBalance {
                token: "native".into(),
                have: Amount::from_raw(balance, NATIVE_DECIMALS).to_decimal_string(),
                need: needed.to_decimal_string(),
            });
        }
        Ok(())
    }
}

/// Terminal report returned to the invoking operator
pub struct Report {
    pub operation: &'static str,
    pub state: TxState,
    pub tx_hash: Option<String>,
    pub detail: String,
}

impl Report {
    pub fn confirmed(operation: &'static str, confirmation: &Confirmation, detail: String) -> Self {
        Self {
            operation,
            state: TxState::Confirmed,
            tx_hash: Some(format!("{:?}", confirmation.tx_hash)),
            detail: format!(
                "{detail} (block {}, gas used {})",
                confirmation.block_number,
                confirmation
                    .gas_used
                    .map(|g| g.to_string())
                    .unwrap_or_else(|| "?".into())
            ),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.state)?;
        if let Some(hash) = &self.tx_hash {
            write!(f, " {hash}")?;
        }
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

/// Parse an address argument, naming it in the error
pub fn parse_address(label: &str, text: &str) -> OrchResult<Address> {
    text.trim()
        .parse::<Address>()
        .map_err(|e| OrchestratorError::InvalidArguments {
            function: label.to_string(),
            message: format!("bad address {text:?}: {e}"),
        })
}

/// Minimum-accepted amount after slippage, validated non-zero.
/// Zero-valued minimums remove the economic protection entirely and are
/// rejected rather than defaulted.
pub fn slippage_floor(amount: &Amount, slippage_bps: u64) -> OrchResult<Amount> {
    if slippage_bps >= 10_000 {
        return Err(OrchestratorError::InvalidArguments {
            function: "slippage_bps".into(),
            message: format!("{slippage_bps} bps leaves no minimum at all"),
        });
    }
    let floor = amount.apply_bps(10_000 - slippage_bps)?;
    if floor.is_zero() {
        return Err(OrchestratorError::InvalidArguments {
            function: "slippage_bps".into(),
            message: "minimum accepted amount computes to zero".into(),
        });
    }
    Ok(floor)
}

/// Absolute unix deadline `seconds` from now; a zero horizon is rejected
pub fn deadline_from_now(seconds: u64) -> OrchResult<U256> {
    if seconds == 0 {
        return Err(OrchestratorError::InvalidArguments {
            function: "deadline_secs".into(),
            message: "deadline must be in the future".into(),
        });
    }
    Ok(U256::from(Utc::now().timestamp() as u64 + seconds))
}

/// Narrow a `decimals()` return word to `u8`. The ABI type is uint8 but
/// the wire word is 256 bits wide and the contract is untrusted.
fn decimals_from_word(word: U256) -> OrchResult<u8> {
    if word > U256::from(u8::MAX) {
        return Err(OrchestratorError::InvalidArguments {
            function: "decimals".into(),
            message: format!("value {word} does not fit in uint8"),
        });
    }
    Ok(word.as_u32() as u8)
}

fn expect_uint(tokens: &[Token], function: &str) -> OrchResult<U256> {
    match tokens.first() {
        Some(Token::Uint(v)) => Ok(*v),
        _ => Err(OrchestratorError::InvalidArguments {
            function: function.to_string(),
            message: "unexpected output shape".into(),
        }),
    }
}

/// Decode a `uint256[]` single-output return (e.g. getAmountsOut)
pub fn decode_uint_array(tokens: Vec<Token>, function: &str) -> OrchResult<Vec<U256>> {
    match tokens.into_iter().next() {
        Some(Token::Array(items)) => items
            .into_iter()
            .map(|t| match t {
                Token::Uint(v) => Ok(v),
                _ => Err(OrchestratorError::InvalidArguments {
                    function: function.to_string(),
                    message: "non-uint element in array output".into(),
                }),
            })
            .collect(),
        _ => Err(OrchestratorError::InvalidArguments {
            function: function.to_string(),
            message: "expected an array output".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slippage_floor_rejects_zero_protection() {
        let amount = Amount::from_raw(U256::from(10_000u64), 0);
        assert_eq!(
            slippage_floor(&amount, 50).unwrap().raw(),
            U256::from(9950u64)
        );
        assert!(slippage_floor(&amount, 10_000).is_err());
        assert!(slippage_floor(&Amount::zero(0), 50).is_err());
    }

    #[test]
    fn deadline_is_strictly_in_the_future() {
        assert!(deadline_from_now(0).is_err());
        let now = Utc::now().timestamp() as u64;
        let deadline = deadline_from_now(300).unwrap();
        assert!(deadline >= U256::from(now + 300));
    }

    #[test]
    fn parse_address_names_the_field() {
        assert!(parse_address("recipient", "0x60781C2586D68229fde47564546784ab3fACA982").is_ok());
        let err = parse_address("recipient", "nonsense").unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::InvalidArguments { function, .. } if function == "recipient"
        ));
    }

    #[test]
    fn decimals_word_is_range_checked() {
        assert_eq!(decimals_from_word(U256::from(18u64)).unwrap(), 18);
        assert_eq!(decimals_from_word(U256::from(255u64)).unwrap(), 255);
        // 256 would silently truncate to 0 under a plain cast
        assert!(decimals_from_word(U256::from(256u64)).is_err());
        assert!(decimals_from_word(U256::MAX).is_err());
    }

    #[test]
    fn uint_array_decoding() {
        let tokens = vec![Token::Array(vec![
            Token::Uint(U256::from(1u64)),
            Token::Uint(U256::from(2u64)),
        ])];
        assert_eq!(
            decode_uint_array(tokens, "getAmountsOut").unwrap(),
            vec![U256::from(1u64), U256::from(2u64)]
        );
        assert!(decode_uint_array(vec![Token::Bool(true)], "getAmountsOut").is_err());
    }
}
