//! Token <-> native swaps through the router
//!
//! The minimum output is always computed from a live `getAmountsOut`
//! quote floored by the operator's slippage tolerance; it is never zero.

use super::{
    deadline_from_now, decode_uint_array, parse_address, slippage_floor, OpContext, Report,
    NATIVE_DECIMALS,
};
use crate::amount::Amount;
use crate::contract::ContractBinding;
use crate::error::{OrchResult, OrchestratorError};
use crate::lifecycle::CallIntent;

use ethers::abi::Token;
use ethers::types::Address;
use tracing::info;

pub struct SwapParams {
    /// Input amount, decimal text in the input side's units
    pub amount_in: String,
    /// Ordered hop addresses; for token->native the last hop must be the
    /// wrapped native token, for native->token the first hop must be.
    pub route: Vec<String>,
    pub recipient: String,
    pub slippage_bps: u64,
    pub deadline_secs: u64,
    /// Swap native currency into tokens instead of tokens into native
    pub from_native: bool,
}

pub async fn swap(ctx: &OpContext, params: SwapParams) -> OrchResult<Report> {
    let recipient = parse_address("recipient", &params.recipient)?;
    let route = parse_route(&params.route)?;
    let wrapped = ctx.wrapped_native()?;
    validate_route(&route, wrapped, params.from_native)?;
    let router = ctx.router_binding()?;

    let (amount_in, in_label) = if params.from_native {
        (
            Amount::from_decimal_str(&params.amount_in, NATIVE_DECIMALS)?,
            "native".to_string(),
        )
    } else {
        let token = ContractBinding::erc20(route[0])?;
        let decimals = ctx.token_decimals(&token).await?;
        (
            Amount::from_decimal_str(&params.amount_in, decimals)?,
            ctx.token_symbol(&token).await,
        )
    };
    if amount_in.is_zero() {
        return Err(OrchestratorError::InvalidArguments {
            function: "swap".into(),
            message: "input amount must be non-zero".into(),
        });
    }

    // Live quote drives the minimum-output protection
    let path_tokens = Token::Array(route.iter().copied().map(Token::Address).collect());
    let quoted = decode_uint_array(
        router
            .read(
                &ctx.endpoint,
                "getAmountsOut",
                &[Token::Uint(amount_in.raw()), path_tokens.clone()],
            )
            .await?,
        "getAmountsOut",
    )?;
    let quoted_out = *quoted.last().ok_or_else(|| OrchestratorError::InvalidArguments {
        function: "getAmountsOut".into(),
        message: "empty quote".into(),
    })?;
    if quoted_out.is_zero() {
        return Err(OrchestratorError::WouldRevert {
            reason: "router quotes zero output for this route".into(),
        });
    }

    let out_decimals = if params.from_native {
        let token = ContractBinding::erc20(route[route.len() - 1])?;
        ctx.token_decimals(&token).await?
    } else {
        NATIVE_DECIMALS
    };
    let quoted_amount = Amount::from_raw(quoted_out, out_decimals);
    let min_out = slippage_floor(&quoted_amount, params.slippage_bps)?;
    let deadline = deadline_from_now(params.deadline_secs)?;

    info!(
        amount_in = %amount_in,
        quoted = %quoted_amount,
        min_out = %min_out,
        hops = route.len(),
        "Swapping"
    );

    let confirmation = if params.from_native {
        ctx.require_native(&amount_in).await?;
        let intent = CallIntent::new(
            router,
            "swapExactAVAXForTokens",
            vec![
                Token::Uint(min_out.raw()),
                path_tokens,
                Token::Address(recipient),
                Token::Uint(deadline),
            ],
        )
        .with_value(amount_in.raw());
        ctx.engine.execute(intent).await?
    } else {
        let token = ContractBinding::erc20(route[0])?;
        ctx.require_funds(&token, router.address(), &amount_in)
            .await?;
        let intent = CallIntent::new(
            router,
            "swapExactTokensForAVAX",
            vec![
                Token::Uint(amount_in.raw()),
                Token::Uint(min_out.raw()),
                path_tokens,
                Token::Address(recipient),
                Token::Uint(deadline),
            ],
        );
        ctx.engine.execute(intent).await?
    };

    Ok(Report::confirmed(
        "swap",
        &confirmation,
        format!("{amount_in} {in_label} in, quoted {quoted_amount}, minimum {min_out}"),
    ))
}

fn parse_route(route: &[String]) -> OrchResult<Vec<Address>> {
    route
        .iter()
        .map(|hop| parse_address("route", hop))
        .collect()
}

/// A route needs at least two hops and must touch the wrapped-native token
/// on the native side of the swap.
fn validate_route(route: &[Address], wrapped_native: Address, from_native: bool) -> OrchResult<()> {
    if route.len() < 2 {
        return Err(OrchestratorError::InvalidArguments {
            function: "route".into(),
            message: "a route needs at least two hops".into(),
        });
    }
    let (end, side) = if from_native {
        (route[0], "start")
    } else {
        (route[route.len() - 1], "end")
    };
    if end != wrapped_native {
        return Err(OrchestratorError::InvalidArguments {
            function: "route".into(),
            message: format!("route must {side} at the wrapped native token {wrapped_native:?}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_low_u64_be(n as u64)
    }

    #[test]
    fn route_must_have_two_hops() {
        assert!(validate_route(&[addr(1)], addr(9), false).is_err());
        assert!(validate_route(&[addr(1), addr(9)], addr(9), false).is_ok());
    }

    #[test]
    fn token_to_native_route_ends_at_wrapped() {
        let wrapped = addr(9);
        assert!(validate_route(&[addr(1), addr(2), wrapped], wrapped, false).is_ok());
        assert!(validate_route(&[addr(1), wrapped, addr(2)], wrapped, false).is_err());
    }

    #[test]
    fn native_to_token_route_starts_at_wrapped() {
        let wrapped = addr(9);
        assert!(validate_route(&[wrapped, addr(2)], wrapped, true).is_ok());
        assert!(validate_route(&[addr(2), wrapped], wrapped, true).is_err());
    }

    #[test]
    fn route_parsing_rejects_bad_hops() {
        assert!(parse_route(&["junk".into()]).is_err());
        let parsed = parse_route(&[
            "0x60781C2586D68229fde47564546784ab3fACA982".into(),
            "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7".into(),
        ])
        .unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
