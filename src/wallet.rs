//! Signing identity
//!
//! Wraps the local wallet: derives the chain address from the configured
//! private key and signs transaction envelopes. The key material stays
//! inside the wallet and is never logged or serialized.

use crate::error::{OrchResult, OrchestratorError};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Signature};
use tracing::info;

/// A signing credential bound to one chain
pub struct SigningIdentity {
    wallet: LocalWallet,
}

impl SigningIdentity {
    /// Build an identity from a hex-encoded private key.
    /// The key must decode to a valid secp256k1 scalar.
    pub fn from_key(private_key: &str, chain_id: u64) -> OrchResult<Self> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| OrchestratorError::InvalidCredential(e.to_string()))?
            .with_chain_id(chain_id);

        info!("Signing identity derived: {:?}", wallet.address());
        Ok(Self { wallet })
    }

    /// The address derived from the credential
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign a transaction envelope
    pub async fn sign(&self, tx: &TypedTransaction) -> OrchResult<Signature> {
        self.wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| OrchestratorError::InvalidCredential(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::TransactionRequest;

    // Well-known hardhat test key, never funded on a real network
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_expected_address() {
        let identity = SigningIdentity::from_key(TEST_KEY, 43114).unwrap();
        assert_eq!(
            format!("{:?}", identity.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn rejects_invalid_scalar() {
        assert!(SigningIdentity::from_key("0x00", 1).is_err());
        assert!(SigningIdentity::from_key("not-a-key", 1).is_err());
    }

    #[tokio::test]
    async fn signing_is_deterministic() {
        let identity = SigningIdentity::from_key(TEST_KEY, 43114).unwrap();
        let tx: TypedTransaction = TransactionRequest::new()
            .to("0x0000000000000000000000000000000000000001"
                .parse::<Address>()
                .unwrap())
            .nonce(0u64)
            .gas(21_000u64)
            .gas_price(1_000_000_000u64)
            .chain_id(43114u64)
            .into();

        let a = identity.sign(&tx).await.unwrap();
        let b = identity.sign(&tx).await.unwrap();
        assert_eq!(a, b);
    }
}
