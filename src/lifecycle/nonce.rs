//! Single-writer nonce allocation
//!
//! One credential signs at most one in-flight transaction at a time. The
//! allocator hands out a lease under a mutex; the lease is held from
//! allocation through submission so a later-built transaction can never
//! claim a nonce before an earlier one is signed and broadcast.

use crate::chain::Endpoint;
use crate::error::OrchResult;

use ethers::providers::JsonRpcClient;
use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Allocates strictly increasing nonces for one signing address
pub struct NonceAllocator {
    address: Address,
    /// Next nonce to hand out; `None` until fetched from the chain
    next: Mutex<Option<u64>>,
}

impl NonceAllocator {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            next: Mutex::new(None),
        }
    }

    /// Pre-seeded allocator that skips the initial chain fetch
    #[cfg(test)]
    pub fn with_next(address: Address, next: u64) -> Self {
        Self {
            address,
            next: Mutex::new(Some(next)),
        }
    }

    /// Acquire the next usable nonce. The returned lease holds the
    /// allocator lock: drop it to release the nonce unused, `commit` it
    /// once the transaction carrying it has been accepted by the network.
    pub async fn acquire<P: JsonRpcClient>(
        &self,
        endpoint: &Arc<Endpoint<P>>,
    ) -> OrchResult<NonceLease<'_>> {
        let mut guard = self.next.lock().await;

        let nonce = match *guard {
            Some(n) => n,
            None => {
                let n = endpoint.get_pending_nonce(self.address).await?;
                *guard = Some(n);
                debug!("Initialized nonce for {:?}: {}", self.address, n);
                n
            }
        };

        Ok(NonceLease { guard, nonce })
    }
}

/// Exclusive hold on one nonce value
pub struct NonceLease<'a> {
    guard: MutexGuard<'a, Option<u64>>,
    nonce: u64,
}

impl NonceLease<'_> {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The transaction was accepted: advance to the next nonce
    pub fn commit(mut self) {
        *self.guard = Some(self.nonce + 1);
    }

    /// The network rejected our nonce view (e.g. "nonce too low"):
    /// force a fresh fetch on the next allocation.
    pub fn invalidate(mut self) {
        *self.guard = None;
    }

    // Dropping without commit releases the nonce for reuse.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, GasPriceStrategy};

    fn offline_endpoint() -> Arc<Endpoint> {
        // HTTP providers connect lazily; a pre-seeded allocator never
        // touches the network.
        Arc::new(
            Endpoint::new(
                EndpointConfig {
                    chain_id: 43114,
                    rpc_urls: vec!["http://127.0.0.1:1".into()],
                },
                GasPriceStrategy::Legacy,
                500,
            )
            .unwrap(),
        )
    }

    fn signer() -> Address {
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn nonces_are_strictly_increasing_without_gaps() {
        let endpoint = offline_endpoint();
        let allocator = NonceAllocator::with_next(signer(), 5);

        let mut observed = Vec::new();
        for _ in 0..4 {
            let lease = allocator.acquire(&endpoint).await.unwrap();
            observed.push(lease.nonce());
            lease.commit();
        }
        assert_eq!(observed, vec![5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn released_nonce_is_reused() {
        let endpoint = offline_endpoint();
        let allocator = NonceAllocator::with_next(signer(), 10);

        let lease = allocator.acquire(&endpoint).await.unwrap();
        assert_eq!(lease.nonce(), 10);
        drop(lease); // submission never happened

        let lease = allocator.acquire(&endpoint).await.unwrap();
        assert_eq!(lease.nonce(), 10);
        lease.commit();

        let lease = allocator.acquire(&endpoint).await.unwrap();
        assert_eq!(lease.nonce(), 11);
    }

    #[tokio::test]
    async fn lease_serializes_allocation() {
        let endpoint = offline_endpoint();
        let allocator = Arc::new(NonceAllocator::with_next(signer(), 0));

        let lease = allocator.acquire(&endpoint).await.unwrap();

        // A second acquire must block until the first lease resolves.
        let contender = {
            let allocator = allocator.clone();
            let endpoint = endpoint.clone();
            tokio::spawn(async move {
                let lease = allocator.acquire(&endpoint).await.unwrap();
                let n = lease.nonce();
                lease.commit();
                n
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        let first = lease.nonce();
        lease.commit();
        let second = contender.await.unwrap();
        assert_eq!((first, second), (0, 1));
    }
}
