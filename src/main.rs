//! dexops - one-shot transaction orchestration for a DEX router, ERC20
//! tokens and a cross-chain bridge on an EVM-compatible network.
//!
//! Each invocation runs a single operation end to end: read the relevant
//! balances, build and simulate the call, sign and submit it, then watch
//! it to a terminal state.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

mod amount;
mod chain;
mod config;
mod contract;
mod error;
mod lifecycle;
mod ops;
mod wallet;

use config::Settings;
use ops::bridge::BridgeParams;
use ops::liquidity::{AddLiquidityParams, RemoveLiquidityParams};
use ops::swap::SwapParams;
use ops::{OpContext, Report};

#[derive(Parser)]
#[command(name = "dexops")]
#[command(about = "On-chain DEX/bridge transaction orchestration client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add token + native liquidity to the router's pair
    AddLiquidity {
        /// ERC20 token address
        #[arg(long)]
        token: String,
        /// Desired token amount (decimal, token units)
        #[arg(long)]
        amount_token: String,
        /// Native amount attached as value (decimal)
        #[arg(long)]
        amount_native: String,
        /// LP token recipient
        #[arg(long)]
        recipient: String,
        /// Slippage tolerance in basis points
        #[arg(long, default_value_t = 50)]
        slippage_bps: u64,
        /// Deadline horizon in seconds from now
        #[arg(long, default_value_t = 300)]
        deadline_secs: u64,
    },
    /// Burn LP tokens and withdraw token + native
    RemoveLiquidity {
        /// ERC20 token address of the pair
        #[arg(long)]
        token: String,
        /// Pair (LP) token address holding the liquidity
        #[arg(long)]
        lp_token: String,
        /// Liquidity to burn (decimal)
        #[arg(long)]
        liquidity: String,
        /// Minimum token output (decimal, non-zero)
        #[arg(long)]
        min_token: String,
        /// Minimum native output (decimal, non-zero)
        #[arg(long)]
        min_native: String,
        /// Withdrawal recipient
        #[arg(long)]
        recipient: String,
        #[arg(long, default_value_t = 300)]
        deadline_secs: u64,
    },
    /// Swap along a route; token->native by default, native->token with --from-native
    Swap {
        /// Input amount (decimal, input side units)
        #[arg(long)]
        amount_in: String,
        /// Comma-separated hop addresses
        #[arg(long, value_delimiter = ',')]
        route: Vec<String>,
        /// Output recipient
        #[arg(long)]
        recipient: String,
        #[arg(long, default_value_t = 50)]
        slippage_bps: u64,
        #[arg(long, default_value_t = 300)]
        deadline_secs: u64,
        /// Spend native currency instead of tokens
        #[arg(long)]
        from_native: bool,
    },
    /// Send a token through the bridge to another chain
    Bridge {
        /// ERC20 token address
        #[arg(long)]
        token: String,
        /// Amount to bridge (decimal, token units)
        #[arg(long)]
        amount: String,
        /// Destination chain id
        #[arg(long)]
        dest_chain: u64,
        /// Recipient on the destination chain (must equal the signer)
        #[arg(long)]
        recipient: String,
    },
    /// Re-attach to a previously broadcast transaction by hash
    Watch {
        #[arg(long)]
        tx_hash: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    // Configuration problems are fatal before any network activity
    let settings = Settings::load()?;
    let ctx = OpContext::new(settings)?;
    info!("Operating as {:?}", ctx.signer.address());

    let result = match cli.command {
        Command::AddLiquidity {
            token,
            amount_token,
            amount_native,
            recipient,
            slippage_bps,
            deadline_secs,
        } => {
            ops::liquidity::add_liquidity(
                &ctx,
                AddLiquidityParams {
                    token,
                    amount_token,
                    amount_native,
                    recipient,
                    slippage_bps,
                    deadline_secs,
                },
            )
            .await
        }
        Command::RemoveLiquidity {
            token,
            lp_token,
            liquidity,
            min_token,
            min_native,
            recipient,
            deadline_secs,
        } => {
            ops::liquidity::remove_liquidity(
                &ctx,
                RemoveLiquidityParams {
                    token,
                    lp_token,
                    liquidity,
                    min_token,
                    min_native,
                    recipient,
                    deadline_secs,
                },
            )
            .await
        }
        Command::Swap {
            amount_in,
            route,
            recipient,
            slippage_bps,
            deadline_secs,
            from_native,
        } => {
            ops::swap::swap(
                &ctx,
                SwapParams {
                    amount_in,
                    route,
                    recipient,
                    slippage_bps,
                    deadline_secs,
                    from_native,
                },
            )
            .await
        }
        Command::Bridge {
            token,
            amount,
            dest_chain,
            recipient,
        } => {
            ops::bridge::bridge(
                &ctx,
                BridgeParams {
                    token,
                    amount,
                    dest_chain,
                    recipient,
                },
            )
            .await
        }
        Command::Watch { tx_hash } => {
            let hash = tx_hash
                .parse()
                .map_err(|e| error::OrchestratorError::InvalidArguments {
                    function: "tx_hash".to_string(),
                    message: format!("{e}"),
                })?;
            ctx.engine
                .reattach(hash)
                .await
                .map(|confirmation| Report::confirmed("watch", &confirmation, String::new()))
        }
    };

    match result {
        Ok(report) => {
            println!("{report}");
            Ok(())
        }
        Err(e) => {
            if e.is_preflight() {
                eprintln!("failed before broadcast; no fee was spent");
            } else if let Some(hash) = e.tx_hash() {
                // A broadcast transaction is never retracted by a local
                // failure; surface its hash so the operator can re-attach.
                eprintln!("transaction hash: {hash}");
            }
            Err(e.into())
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dexops=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
