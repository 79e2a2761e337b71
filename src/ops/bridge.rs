//! Bridge a token to another chain

use super::{parse_address, OpContext, Report};
use crate::amount::Amount;
use crate::contract::ContractBinding;
use crate::error::{OrchResult, OrchestratorError};
use crate::lifecycle::CallIntent;

use ethers::abi::Token;
use ethers::types::Address;
use tracing::info;

pub struct BridgeParams {
    pub token: String,
    /// Amount to bridge, decimal text in the token's units
    pub amount: String,
    /// Destination chain id; selects the bridge contract from config
    pub dest_chain: u64,
    /// Recipient on the destination chain; `bridgeTo` credits the sender,
    /// so this must equal the signing address and is validated explicitly.
    pub recipient: String,
}

pub async fn bridge(ctx: &OpContext, params: BridgeParams) -> OrchResult<Report> {
    let token_addr = parse_address("token", &params.token)?;
    let recipient = parse_address("recipient", &params.recipient)?;

    let bridge_addr = ctx
        .settings
        .bridge_for_chain(params.dest_chain)
        .ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "no bridge configured for destination chain {}",
                params.dest_chain
            ))
        })?;
    let bridge_addr: Address = parse_address("contracts.bridges", bridge_addr)?;

    validate_recipient(recipient, ctx.signer.address())?;

    let token = ContractBinding::erc20(token_addr)?;
    let decimals = ctx.token_decimals(&token).await?;
    let amount = Amount::from_decimal_str(&params.amount, decimals)?;
    if amount.is_zero() {
        return Err(OrchestratorError::InvalidArguments {
            function: "bridgeTo".into(),
            message: "bridge amount must be non-zero".into(),
        });
    }

    ctx.require_funds(&token, bridge_addr, &amount).await?;

    let symbol = ctx.token_symbol(&token).await;
    info!(
        token = %symbol,
        amount = %amount,
        dest_chain = params.dest_chain,
        "Bridging"
    );

    let binding = ContractBinding::bridge(bridge_addr)?;
    let intent = CallIntent::new(
        binding,
        "bridgeTo",
        vec![Token::Address(token_addr), Token::Uint(amount.raw())],
    );

    let confirmation = ctx.engine.execute(intent).await?;
    Ok(Report::confirmed(
        "bridge",
        &confirmation,
        format!(
            "{amount} {symbol} to chain {} for {recipient:?}",
            params.dest_chain
        ),
    ))
}

/// The bridge call carries no recipient parameter: funds arrive at the
/// sender's own address on the destination chain.
fn validate_recipient(recipient: Address, signer: Address) -> OrchResult<()> {
    if recipient != signer {
        return Err(OrchestratorError::InvalidArguments {
            function: "recipient".into(),
            message: format!(
                "bridgeTo credits the sender; recipient {recipient:?} must equal the signing address {signer:?}"
            ),
        });
    }
    Ok(())
}
