//! Abstractions and implementations for transaction signers.

use {
    crate::{pubkey::Pubkey, signature::Signature},
    thiserror::Error,
};

pub mod keypair;
pub mod presigner;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    /// A signature was requested for a required signer whose key is not
    /// available.
    #[error("no signing key available for `{0}`")]
    MissingSigner(Pubkey),
    #[error("keypair-pubkey mismatch")]
    KeypairPubkeyMismatch,
    #[error("not enough signers")]
    NotEnoughSigners,
    #[error("message is malformed: {0}")]
    InvalidMessage(String),
    /// A presigned signature was asked to cover a message other than the
    /// one it was produced for.
    #[error("presigned signature does not cover this message")]
    PresignedSignatureMismatch,
    #[error("custom error: {0}")]
    Custom(String),
}

/// The `Signer` trait declares operations that all digital signature
/// providers must support. It is the interface by which all signers are
/// presented to the transaction layer, whether they are in-memory keypairs,
/// hardware wallets, or detached signatures produced elsewhere.
pub trait Signer {
    /// Infallibly gets the implementor's public key. Returns the all-zeros
    /// `Pubkey` if the implementor has none.
    fn pubkey(&self) -> Pubkey {
        self.try_pubkey().unwrap_or_default()
    }
    /// Fallibly gets the implementor's public key.
    fn try_pubkey(&self) -> Result<Pubkey, SignerError>;
    /// Infallibly produces an Ed25519 signature over the provided `message`
    /// bytes. Returns the all-zeros `Signature` if signing is not possible.
    fn sign_message(&self, message: &[u8]) -> Signature {
        self.try_sign_message(message).unwrap_or_default()
    }
    /// Fallibly produces an Ed25519 signature over the provided `message`
    /// bytes.
    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;
    /// Whether the implementation requires user interaction to sign.
    fn is_interactive(&self) -> bool;
}

impl<T> Signer for &T
where
    T: Signer,
{
    fn pubkey(&self) -> Pubkey {
        (*self).pubkey()
    }

    fn try_pubkey(&self) -> Result<Pubkey, SignerError> {
        (*self).try_pubkey()
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        (*self).sign_message(message)
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        (*self).try_sign_message(message)
    }

    fn is_interactive(&self) -> bool {
        (*self).is_interactive()
    }
}

impl PartialEq for dyn Signer {
    fn eq(&self, other: &dyn Signer) -> bool {
        self.pubkey() == other.pubkey()
    }
}

impl std::fmt::Debug for dyn Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Signer: {:?}", self.pubkey())
    }
}
