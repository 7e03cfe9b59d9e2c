//! Transactions wrapping either message format.

use {
    crate::{
        message::VersionedMessage,
        sanitize::SanitizeError,
        short_vec,
        signature::Signature,
        signer::SignerError,
        signers::Signers,
        transaction::Transaction,
    },
    serde_derive::{Deserialize, Serialize},
};

/// The declared format of a transaction's message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransactionVersion {
    Legacy,
    Number(u8),
}

impl TransactionVersion {
    pub const LEGACY: Self = Self::Legacy;
}

/// An atomic transaction wrapping either message format.
#[derive(Debug, PartialEq, Default, Eq, Clone, Serialize, Deserialize)]
pub struct VersionedTransaction {
    /// List of signatures.
    #[serde(with = "short_vec")]
    pub signatures: Vec<Signature>,
    /// Message to sign.
    pub message: VersionedMessage,
}

impl From<Transaction> for VersionedTransaction {
    fn from(transaction: Transaction) -> Self {
        Self {
            signatures: transaction.signatures,
            message: VersionedMessage::Legacy(transaction.message),
        }
    }
}

impl VersionedTransaction {
    /// Create an unsigned transaction, with a placeholder signature slot
    /// for each required signer.
    pub fn new_unsigned(message: VersionedMessage) -> Self {
        Self {
            signatures: vec![
                Signature::default();
                usize::from(message.header().num_required_signatures)
            ],
            message,
        }
    }

    /// Signs a versioned message and if successful, returns a signed
    /// transaction.
    ///
    /// The full signer set must be supplied: a required signer with no
    /// matching keypair fails with `SignerError::MissingSigner`, and a
    /// keypair that is not a required signer fails with
    /// `SignerError::KeypairPubkeyMismatch`.
    pub fn try_new<T: Signers>(
        message: VersionedMessage,
        keypairs: &T,
    ) -> Result<Self, SignerError> {
        let static_account_keys = message.static_account_keys();
        let num_required_signatures = usize::from(message.header().num_required_signatures);
        if num_required_signatures > static_account_keys.len() {
            return Err(SignerError::InvalidMessage(
                "account table is shorter than the required signer count".to_string(),
            ));
        }
        let expected_signer_keys = &static_account_keys[0..num_required_signatures];

        let signer_keys = keypairs.try_pubkeys()?;
        let message_data = message.serialize();
        let unordered_signatures = keypairs.try_sign_message(&message_data)?;

        let mut signatures = vec![Signature::default(); num_required_signatures];
        for (signer_key, signature) in signer_keys.iter().zip(unordered_signatures) {
            let position = expected_signer_keys
                .iter()
                .position(|key| key == signer_key)
                .ok_or(SignerError::KeypairPubkeyMismatch)?;
            signatures[position] = signature;
        }
        for (position, expected_key) in expected_signer_keys.iter().enumerate() {
            if signatures[position] == Signature::default() {
                return Err(SignerError::MissingSigner(*expected_key));
            }
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Sanitize the transaction and its message.
    pub fn sanitize(&self) -> Result<(), SanitizeError> {
        self.message.sanitize()?;
        // the signature list must match the required signer count exactly
        if self.signatures.len() != usize::from(self.message.header().num_required_signatures) {
            return Err(SanitizeError::IndexOutOfBounds);
        }
        Ok(())
    }

    /// Returns the version of the transaction.
    pub fn version(&self) -> TransactionVersion {
        match self.message {
            VersionedMessage::Legacy(_) => TransactionVersion::Legacy,
            VersionedMessage::V0(_) => TransactionVersion::Number(0),
        }
    }

    /// Returns a legacy transaction if the transaction message is legacy.
    pub fn into_legacy_transaction(self) -> Option<Transaction> {
        match self.message {
            VersionedMessage::Legacy(message) => Some(Transaction {
                signatures: self.signatures,
                message,
            }),
            _ => None,
        }
    }

    /// Return the serialized message data to sign.
    pub fn message_data(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Whether every required signature slot has been filled.
    pub fn is_signed(&self) -> bool {
        self.signatures
            .iter()
            .all(|signature| *signature != Signature::default())
    }

    /// Verify every signature against the serialized message bytes.
    pub fn verify(&self) -> bool {
        let message_bytes = self.message_data();
        if self.signatures.len() != usize::from(self.message.header().num_required_signatures) {
            return false;
        }
        self.signatures
            .iter()
            .zip(self.message.static_account_keys().iter())
            .all(|(signature, pubkey)| signature.verify(pubkey.as_ref(), &message_bytes))
    }
}
