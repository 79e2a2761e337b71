//! Transaction lifecycle engine
//!
//! Drives a call intent through
//! `Built -> Signed -> Submitted -> Pending -> {Confirmed | Reverted | Dropped | TimedOut}`
//! with single-writer nonce allocation and a mandatory pre-flight simulation.

mod engine;
mod gas;
mod nonce;

pub use engine::{CallIntent, Confirmation, LifecycleEngine, TxState};
