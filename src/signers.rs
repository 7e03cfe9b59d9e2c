//! The `Signers` trait, for collections of transaction signers.

use crate::{
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
};

/// Convenience trait for working with mixed collections of `Signer`s.
pub trait Signers {
    fn pubkeys(&self) -> Vec<Pubkey>;
    fn try_pubkeys(&self) -> Result<Vec<Pubkey>, SignerError>;
    fn sign_message(&self, message: &[u8]) -> Vec<Signature>;
    fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError>;
    fn is_interactive(&self) -> bool;
}

macro_rules! default_keypairs_impl {
    () => {
        fn pubkeys(&self) -> Vec<Pubkey> {
            self.iter().map(|keypair| keypair.pubkey()).collect()
        }

        fn try_pubkeys(&self) -> Result<Vec<Pubkey>, SignerError> {
            self.iter().map(|keypair| keypair.try_pubkey()).collect()
        }

        fn sign_message(&self, message: &[u8]) -> Vec<Signature> {
            self.iter()
                .map(|keypair| keypair.sign_message(message))
                .collect()
        }

        fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError> {
            self.iter()
                .map(|keypair| keypair.try_sign_message(message))
                .collect()
        }

        fn is_interactive(&self) -> bool {
            self.iter().any(|s| s.is_interactive())
        }
    };
}

impl<T: Signer + ?Sized> Signers for [&T] {
    default_keypairs_impl!();
}

impl<T: Signer + ?Sized> Signers for [&T; 0] {
    default_keypairs_impl!();
}

impl<T: Signer + ?Sized> Signers for [&T; 1] {
    default_keypairs_impl!();
}

impl<T: Signer + ?Sized> Signers for [&T; 2] {
    default_keypairs_impl!();
}

impl<T: Signer + ?Sized> Signers for [&T; 3] {
    default_keypairs_impl!();
}

impl<T: Signer + ?Sized> Signers for [&T; 4] {
    default_keypairs_impl!();
}

impl<T: Signer + ?Sized> Signers for Vec<&T> {
    default_keypairs_impl!();
}

impl Signers for Vec<Box<dyn Signer>> {
    default_keypairs_impl!();
}
