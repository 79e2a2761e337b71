//! Chain module - RPC endpoint handling
//!
//! Provides the shared JSON-RPC endpoint with multi-provider failover,
//! gas price strategies, and receipt/simulation access.

pub mod endpoint;

pub use endpoint::{Endpoint, GasPrice};
