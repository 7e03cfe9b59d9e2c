//! Atomically-committed sequences of instructions.
//!
//! A transaction is the unit of submission: a compiled [`Message`] plus one
//! Ed25519 signature per required signer, every signature covering the same
//! serialized message bytes. Signatures sit in the same order as the signer
//! keys at the front of the message's account table, and the fee payer's
//! signature is always first. Signing may happen in one shot or
//! incrementally, with each party filling in its own slot.

use {
    crate::{
        hash::Hash,
        message::Message,
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
        short_vec,
        signature::Signature,
        signer::SignerError,
        signers::Signers,
    },
    log::debug,
    serde_derive::{Deserialize, Serialize},
};

mod versioned;
pub use versioned::{TransactionVersion, VersionedTransaction};

/// An atomically-committed sequence of instructions, in the legacy format.
#[derive(Debug, PartialEq, Default, Eq, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// A set of signatures of a serialized [`Message`], signed by the first
    /// keys of the message's `account_keys`, where the number of signatures
    /// is equal to `num_required_signatures` of the message's header.
    #[serde(with = "short_vec")]
    pub signatures: Vec<Signature>,

    /// The message to sign.
    pub message: Message,
}

impl Sanitize for Transaction {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        if self.message.header.num_required_signatures as usize > self.signatures.len() {
            return Err(SanitizeError::IndexOutOfBounds);
        }
        if self.signatures.len() > self.message.account_keys.len() {
            return Err(SanitizeError::IndexOutOfBounds);
        }
        self.message.sanitize()
    }
}

impl Transaction {
    /// Create an unsigned transaction, with a placeholder signature slot
    /// for each required signer.
    pub fn new_unsigned(message: Message) -> Self {
        Self {
            signatures: vec![
                Signature::default();
                usize::from(message.header.num_required_signatures)
            ],
            message,
        }
    }

    /// Create a fully-signed transaction.
    ///
    /// Panics when signing fails; most callers want [`Transaction::try_sign`]
    /// on an unsigned transaction instead.
    pub fn new<T: Signers>(
        from_keypairs: &T,
        message: Message,
        recent_blockhash: Hash,
    ) -> Transaction {
        let mut tx = Self::new_unsigned(message);
        tx.sign(from_keypairs, recent_blockhash);
        tx
    }

    /// Return the message containing all data that should be signed.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Return the serialized message data to sign.
    pub fn message_data(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Sign the transaction, panicking on any error.
    pub fn sign<T: Signers>(&mut self, keypairs: &T, recent_blockhash: Hash) {
        if let Err(e) = self.try_sign(keypairs, recent_blockhash) {
            panic!("Transaction::sign failed with error {e:?}");
        }
    }

    /// Sign the transaction with a subset of required keys, panicking on any
    /// error.
    pub fn partial_sign<T: Signers>(&mut self, keypairs: &T, recent_blockhash: Hash) {
        if let Err(e) = self.try_partial_sign(keypairs, recent_blockhash) {
            panic!("Transaction::partial_sign failed with error {e:?}");
        }
    }

    /// Sign the transaction, returning any error.
    ///
    /// Signing is complete only when every required signer has been
    /// provided; otherwise `SignerError::NotEnoughSigners` is returned and
    /// the signatures written so far are kept.
    pub fn try_sign<T: Signers>(
        &mut self,
        keypairs: &T,
        recent_blockhash: Hash,
    ) -> Result<(), SignerError> {
        self.try_partial_sign(keypairs, recent_blockhash)?;

        if !self.is_signed() {
            Err(SignerError::NotEnoughSigners)
        } else {
            Ok(())
        }
    }

    /// Sign the transaction with a subset of required keys, returning any
    /// error.
    ///
    /// Unlike [`Transaction::try_sign`], this method does not require all
    /// keypairs to be provided. Each signature lands in the slot matching
    /// its key's position in the signer table, so signing can proceed in
    /// multiple calls by independent parties.
    ///
    /// Every provided key must be a required signer of the message, or
    /// `SignerError::KeypairPubkeyMismatch` is returned.
    pub fn try_partial_sign<T: Signers>(
        &mut self,
        keypairs: &T,
        recent_blockhash: Hash,
    ) -> Result<(), SignerError> {
        let pubkeys = keypairs.try_pubkeys()?;
        let positions = self.get_signing_keypair_positions(&pubkeys)?;
        if positions.iter().any(|pos| pos.is_none()) {
            return Err(SignerError::KeypairPubkeyMismatch);
        }
        let positions: Vec<usize> = positions.iter().map(|pos| pos.unwrap()).collect();
        self.try_partial_sign_unchecked(keypairs, positions, recent_blockhash)
    }

    /// Sign the transaction with a subset of required keys, placing each
    /// signature at the given position.
    ///
    /// The positions are not checked against the message's signer table.
    pub fn try_partial_sign_unchecked<T: Signers>(
        &mut self,
        keypairs: &T,
        positions: Vec<usize>,
        recent_blockhash: Hash,
    ) -> Result<(), SignerError> {
        // if you change the blockhash, you're re-signing...
        if recent_blockhash != self.message.recent_blockhash {
            debug!("block reference changed, clearing any existing signatures");
            self.message.recent_blockhash = recent_blockhash;
            self.signatures
                .iter_mut()
                .for_each(|signature| *signature = Signature::default());
        }

        let signatures = keypairs.try_sign_message(&self.message_data())?;
        for i in 0..positions.len() {
            self.signatures[positions[i]] = signatures[i];
        }
        Ok(())
    }

    /// Map each provided pubkey to its position in the message's signer
    /// table, or `None` if it is not a required signer.
    pub fn get_signing_keypair_positions(
        &self,
        pubkeys: &[Pubkey],
    ) -> Result<Vec<Option<usize>>, SignerError> {
        let required_signatures = usize::from(self.message.header.num_required_signatures);
        if self.message.account_keys.len() < required_signatures {
            return Err(SignerError::InvalidMessage(
                "account table is shorter than the required signer count".to_string(),
            ));
        }
        let signed_keys = &self.message.account_keys[0..required_signatures];

        Ok(pubkeys
            .iter()
            .map(|pubkey| signed_keys.iter().position(|x| x == pubkey))
            .collect())
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
        if self.signatures.len() != usize::from(self.message.header.num_required_signatures) {
            return false;
        }
        self.signatures
            .iter()
            .zip(self.message.account_keys.iter())
            .all(|(signature, pubkey)| signature.verify(pubkey.as_ref(), &message_bytes))
    }
}
