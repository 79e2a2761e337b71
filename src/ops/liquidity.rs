//! Add / remove liquidity against the router's AVAX pairs

use super::{
    deadline_from_now, parse_address, slippage_floor, OpContext, Report, NATIVE_DECIMALS,
};
use crate::amount::Amount;
use crate::contract::ContractBinding;
use crate::error::{OrchResult, OrchestratorError};
use crate::lifecycle::CallIntent;

use ethers::abi::Token;
use tracing::info;

pub struct AddLiquidityParams {
    pub token: String,
    /// Desired token amount, decimal text in the token's units
    pub amount_token: String,
    /// Native amount sent as value, decimal text
    pub amount_native: String,
    pub recipient: String,
    pub slippage_bps: u64,
    pub deadline_secs: u64,
}

pub async fn add_liquidity(ctx: &OpContext, params: AddLiquidityParams) -> OrchResult<Report> {
    let token_addr = parse_address("token", &params.token)?;
    let recipient = parse_address("recipient", &params.recipient)?;
    let token = ContractBinding::erc20(token_addr)?;
    let router = ctx.router_binding()?;

    let decimals = ctx.token_decimals(&token).await?;
    let amount_token = Amount::from_decimal_str(&params.amount_token, decimals)?;
    let amount_native = Amount::from_decimal_str(&params.amount_native, NATIVE_DECIMALS)?;
    if amount_token.is_zero() || amount_native.is_zero() {
        return Err(OrchestratorError::InvalidArguments {
            function: "addLiquidityAVAX".into(),
            message: "both token and native amounts must be non-zero".into(),
        });
    }

    // Minimums derive from the desired amounts; zero minimums are rejected
    let min_token = slippage_floor(&amount_token, params.slippage_bps)?;
    let min_native = slippage_floor(&amount_native, params.slippage_bps)?;
    let deadline = deadline_from_now(params.deadline_secs)?;

    ctx.require_funds(&token, router.address(), &amount_token)
        .await?;
    ctx.require_native(&amount_native).await?;

    let symbol = ctx.token_symbol(&token).await;
    info!(
        token = %symbol,
        amount = %amount_token,
        native = %amount_native,
        "Adding liquidity"
    );

    let intent = CallIntent::new(
        router,
        "addLiquidityAVAX",
        vec![
            Token::Address(token_addr),
            Token::Uint(amount_token.raw()),
            Token::Uint(min_token.raw()),
            Token::Uint(min_native.raw()),
            Token::Address(recipient),
            Token::Uint(deadline),
        ],
    )
    .with_value(amount_native.raw());

    let confirmation = ctx.engine.execute(intent).await?;
    Ok(Report::confirmed(
        "add-liquidity",
        &confirmation,
        format!(
            "{amount_token} {symbol} + {amount_native} native, minimums {min_token}/{min_native}"
        ),
    ))
}

pub struct RemoveLiquidityParams {
    pub token: String,
    /// The pair (LP) token being burned; approval/balance checks read it
    pub lp_token: String,
    /// Liquidity to burn, decimal text (LP tokens are 18-decimal)
    pub liquidity: String,
    /// Explicit minimum token output, decimal text; must be non-zero
    pub min_token: String,
    /// Explicit minimum native output, decimal text; must be non-zero
    pub min_native: String,
    pub recipient: String,
    pub deadline_secs: u64,
}

pub async fn remove_liquidity(
    ctx: &OpContext,
    params: RemoveLiquidityParams,
) -> OrchResult<Report> {
    let token_addr = parse_address("token", &params.token)?;
    let lp_addr = parse_address("lp_token", &params.lp_token)?;
    let recipient = parse_address("recipient", &params.recipient)?;
    let token = ContractBinding::erc20(token_addr)?;
    let lp = ContractBinding::erc20(lp_addr)?;
    let router = ctx.router_binding()?;

    let liquidity = Amount::from_decimal_str(&params.liquidity, NATIVE_DECIMALS)?;
    let token_decimals = ctx.token_decimals(&token).await?;
    let min_token = Amount::from_decimal_str(&params.min_token, token_decimals)?;
    let min_native = Amount::from_decimal_str(&params.min_native, NATIVE_DECIMALS)?;

    // No on-chain quote surface exists for burns, so the minimums are
    // operator-supplied and must carry real protection.
    if liquidity.is_zero() || min_token.is_zero() || min_native.is_zero() {
        return Err(OrchestratorError::InvalidArguments {
            function: "removeLiquidityAVAX".into(),
            message: "liquidity and both minimum outputs must be non-zero".into(),
        });
    }
    let deadline = deadline_from_now(params.deadline_secs)?;

    ctx.require_funds(&lp, router.address(), &liquidity).await?;

    info!(liquidity = %liquidity, "Removing liquidity");

    let intent = CallIntent::new(
        router,
        "removeLiquidityAVAX",
        vec![
            Token::Address(token_addr),
            Token::Uint(liquidity.raw()),
            Token::Uint(min_token.raw()),
            Token::Uint(min_native.raw()),
            Token::Address(recipient),
            Token::Uint(deadline),
        ],
    );

    let confirmation = ctx.engine.execute(intent).await?;
    Ok(Report::confirmed(
        "remove-liquidity",
        &confirmation,
        format!("burned {liquidity} LP, minimums {min_token} token / {min_native} native"),
    ))
}
