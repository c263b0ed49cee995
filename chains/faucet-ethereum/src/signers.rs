use async_trait::async_trait;
use ethers::prelude::{Address, Signature};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::utils::keccak256;
use ethers_signers::{AwsSigner, AwsSignerError, LocalWallet, Signer, WalletError};
use tracing::instrument;

use faucet_core::{FaucetSigner, FaucetSignerError, SignedTransaction, H256};

/// Ethereum-supported signer types
#[derive(Debug, Clone)]
pub enum Signers {
    /// A wallet instantiated with a locally stored private key
    Local(LocalWallet),
    /// A signer using a key stored in aws kms
    Aws(AwsSigner),
}

impl From<LocalWallet> for Signers {
    fn from(s: LocalWallet) -> Self {
        Signers::Local(s)
    }
}

impl From<AwsSigner> for Signers {
    fn from(s: AwsSigner) -> Self {
        Signers::Aws(s)
    }
}

impl Signers {
    /// Bind the signer to an EIP-155 chain id
    pub fn with_chain_id(self, chain_id: u64) -> Self {
        match self {
            Signers::Local(signer) => signer.with_chain_id(chain_id).into(),
            Signers::Aws(signer) => signer.with_chain_id(chain_id).into(),
        }
    }

    /// The chain id signatures are bound to when a draft carries none
    pub fn chain_id(&self) -> u64 {
        match self {
            Signers::Local(signer) => signer.chain_id(),
            Signers::Aws(signer) => signer.chain_id(),
        }
    }

    async fn sign_typed(&self, tx: &TypedTransaction) -> Result<Signature, SignersError> {
        match self {
            Signers::Local(signer) => Ok(signer.sign_transaction(tx).await?),
            Signers::Aws(signer) => Ok(signer.sign_transaction(tx).await?),
        }
    }
}

/// Error types for Signers
#[derive(Debug, thiserror::Error)]
pub enum SignersError {
    /// AWS Signer Error
    #[error("{0}")]
    AwsSignerError(Box<AwsSignerError>),
    /// Wallet Signer Error
    #[error("{0}")]
    WalletError(#[from] WalletError),
}

impl From<AwsSignerError> for SignersError {
    fn from(e: AwsSignerError) -> Self {
        SignersError::AwsSignerError(Box::new(e))
    }
}

impl From<SignersError> for FaucetSignerError {
    fn from(e: SignersError) -> Self {
        FaucetSignerError::from_other(e)
    }
}

#[async_trait]
impl FaucetSigner for Signers {
    fn address(&self) -> Address {
        match self {
            Signers::Local(signer) => Signer::address(signer),
            Signers::Aws(signer) => Signer::address(signer),
        }
    }

    #[instrument(skip(self, draft), fields(signer = ?FaucetSigner::address(self)))]
    async fn sign(&self, draft: &TypedTransaction) -> Result<SignedTransaction, FaucetSignerError> {
        let mut tx = draft.clone();
        if tx.chain_id().is_none() {
            tx.set_chain_id(self.chain_id());
        }
        let signature = self.sign_typed(&tx).await?;
        let raw = tx.rlp_signed(&signature);
        let tx_hash = H256::from(keccak256(&raw));
        Ok(SignedTransaction::new(tx_hash, raw))
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::{Eip1559TransactionRequest, TransactionRequest, U256};
    use ethers::utils::rlp::Rlp;

    use super::*;

    // anvil's first dev account
    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn local_signer() -> Signers {
        let wallet: LocalWallet = KEY.parse().unwrap();
        Signers::from(wallet).with_chain_id(43113u64)
    }

    #[test]
    fn address_is_derived_from_key() {
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse()
            .unwrap();
        assert_eq!(FaucetSigner::address(&local_signer()), expected);
    }

    #[tokio::test]
    async fn signs_legacy_draft() {
        let signer = local_signer();
        let draft: TypedTransaction = TransactionRequest::new()
            .to(Address::repeat_byte(9))
            .value(U256::from(1000u64))
            .gas(21_000u64)
            .gas_price(U256::from(25_000_000_000u64))
            .nonce(3u64)
            .into();

        let signed = signer.sign(&draft).await.unwrap();
        assert_eq!(signed.tx_hash, H256::from(keccak256(&signed.raw)));

        let (decoded, signature) = TypedTransaction::decode_signed(&Rlp::new(&signed.raw)).unwrap();
        assert_eq!(decoded.nonce(), Some(&U256::from(3u64)));
        assert_eq!(decoded.chain_id().map(|id| id.as_u64()), Some(43113));
        let recovered = signature.recover(decoded.sighash()).unwrap();
        assert_eq!(recovered, FaucetSigner::address(&signer));
    }

    #[tokio::test]
    async fn signs_eip1559_draft() {
        let signer = local_signer();
        let draft: TypedTransaction = Eip1559TransactionRequest::new()
            .to(Address::repeat_byte(9))
            .value(U256::from(1u64))
            .gas(21_000u64)
            .max_fee_per_gas(U256::from(100u64))
            .max_priority_fee_per_gas(U256::from(2u64))
            .nonce(0u64)
            .into();

        let signed = signer.sign(&draft).await.unwrap();
        // typed envelope
        assert_eq!(signed.raw[0], 0x02);
        let (decoded, signature) = TypedTransaction::decode_signed(&Rlp::new(&signed.raw)).unwrap();
        assert!(matches!(decoded, TypedTransaction::Eip1559(_)));
        assert_eq!(
            signature.recover(decoded.sighash()).unwrap(),
            FaucetSigner::address(&signer)
        );
    }
}
