//! A signer backed by a signature produced ahead of time.

use crate::{
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
};

/// Wraps a signature that was produced outside the current process, such as
/// by a hardware wallet or an offline co-signer, so it can take part in
/// signing alongside in-memory keypairs.
///
/// The wrapped signature only covers one specific message. Each signing
/// request verifies the signature against the bytes it was handed and fails
/// with [`SignerError::PresignedSignatureMismatch`] on anything else, so a
/// stale or misrouted presignature can never end up in a transaction.
#[derive(Clone, Debug, Default)]
pub struct Presigner {
    pubkey: Pubkey,
    signature: Signature,
}

impl Presigner {
    pub fn new(pubkey: &Pubkey, signature: &Signature) -> Self {
        Self {
            pubkey: *pubkey,
            signature: *signature,
        }
    }
}

impl Signer for Presigner {
    fn try_pubkey(&self) -> Result<Pubkey, SignerError> {
        Ok(self.pubkey)
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        if self.signature.verify(self.pubkey.as_ref(), message) {
            Ok(self.signature)
        } else {
            Err(SignerError::PresignedSignatureMismatch)
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Signers compare by the key they sign for.
impl<T> PartialEq<T> for Presigner
where
    T: Signer,
{
    fn eq(&self, other: &T) -> bool {
        self.pubkey() == other.pubkey()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::signer::keypair::Keypair, assert_matches::assert_matches};

    fn presigned(message: &[u8]) -> (Keypair, Presigner) {
        let keypair = Keypair::new();
        let signature = keypair.sign_message(message);
        let presigner = Presigner::new(&keypair.pubkey(), &signature);
        (keypair, presigner)
    }

    #[test]
    fn test_presigner_signs_its_message() {
        let message = b"settle channel 7";
        let (keypair, presigner) = presigned(message);

        assert_eq!(presigner.try_pubkey().unwrap(), keypair.pubkey());
        assert_eq!(
            presigner.try_sign_message(message).unwrap(),
            keypair.sign_message(message)
        );
        assert!(!presigner.is_interactive());
    }

    #[test]
    fn test_presigner_rejects_other_messages() {
        let (_, presigner) = presigned(b"settle channel 7");

        assert_matches!(
            presigner.try_sign_message(b"settle channel 8"),
            Err(SignerError::PresignedSignatureMismatch)
        );
        // the infallible form degrades to the all-zeros signature
        assert_eq!(
            presigner.sign_message(b"settle channel 8"),
            Signature::default()
        );
    }

    #[test]
    fn test_presigner_equality() {
        let message = b"x";
        let (keypair, presigner) = presigned(message);

        assert_eq!(presigner, keypair);
        assert_eq!(keypair, presigner);
        assert_eq!(
            presigner,
            Presigner::new(&keypair.pubkey(), &keypair.sign_message(message))
        );
        assert_ne!(presigner, Keypair::new());
    }
}
