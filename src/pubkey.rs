//! Meridian account addresses.

use {
    crate::{hash::hashv, sanitize::Sanitize},
    serde_derive::{Deserialize, Serialize},
    std::{
        convert::{Infallible, TryFrom},
        fmt, mem,
        str::FromStr,
    },
    thiserror::Error,
};

/// Number of bytes in a pubkey.
pub const PUBKEY_BYTES: usize = 32;
/// Maximum length of derived `Pubkey` seed.
pub const MAX_SEED_LEN: usize = 32;
/// Maximum number of seeds.
pub const MAX_SEEDS: usize = 16;
/// Maximum string length of a base58 encoded pubkey.
const MAX_BASE58_LEN: usize = 44;

/// Domain separator appended when hashing program-derived addresses.
const PDA_MARKER: &[u8; 21] = b"ProgramDerivedAddress";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PubkeyError {
    /// Length of the seed is too long for address generation.
    #[error("length of the seed is too long for address generation")]
    MaxSeedLengthExceeded,
    #[error("provided seeds do not result in a valid address")]
    InvalidSeeds,
    #[error("provided owner is not allowed")]
    IllegalOwner,
    #[error("unable to find a viable program address bump seed")]
    NoViableBump,
}

/// The address of a Meridian account.
///
/// Some account addresses are ed25519 public keys, with the account holder
/// controlling it through a private key. Other addresses are program-derived
/// and have no corresponding private key; they are created with
/// [`Pubkey::find_program_address`].
#[repr(transparent)]
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Pubkey(pub(crate) [u8; 32]);

impl Sanitize for Pubkey {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePubkeyError {
    #[error("string is the wrong size")]
    WrongSize,
    #[error("invalid base58 string")]
    Invalid,
}

impl From<Infallible> for ParsePubkeyError {
    fn from(_: Infallible) -> Self {
        unreachable!("Infallible uninhabited")
    }
}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_BASE58_LEN {
            return Err(ParsePubkeyError::WrongSize);
        }
        let pubkey_vec = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParsePubkeyError::Invalid)?;
        if pubkey_vec.len() != mem::size_of::<Pubkey>() {
            Err(ParsePubkeyError::WrongSize)
        } else {
            Ok(Pubkey::new(&pubkey_vec))
        }
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(from: [u8; 32]) -> Self {
        Self(from)
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = std::array::TryFromSliceError;

    fn try_from(pubkey: &[u8]) -> Result<Self, Self::Error> {
        <[u8; 32]>::try_from(pubkey).map(Self::from)
    }
}

impl TryFrom<&str> for Pubkey {
    type Error = ParsePubkeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Pubkey::from_str(s)
    }
}

impl Pubkey {
    pub fn new(pubkey_vec: &[u8]) -> Self {
        Self(
            <[u8; 32]>::try_from(<&[u8]>::clone(&pubkey_vec))
                .expect("Slice must be the same length as a Pubkey"),
        )
    }

    pub const fn new_from_array(pubkey_array: [u8; 32]) -> Self {
        Self(pubkey_array)
    }

    /// unique Pubkey for tests and benchmarks.
    pub fn new_unique() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static I: AtomicU64 = AtomicU64::new(1);

        let mut b = [0u8; 32];
        let i = I.fetch_add(1, Ordering::Relaxed);
        // use big endian representation to ensure that recent unique pubkeys
        // are always greater than less recent unique pubkeys
        b[0..8].copy_from_slice(&i.to_be_bytes());
        Self::new(&b)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Derive an address from a base key, a utf-8 seed string, and an owning
    /// program.
    pub fn create_with_seed(
        base: &Pubkey,
        seed: &str,
        owner: &Pubkey,
    ) -> Result<Pubkey, PubkeyError> {
        if seed.len() > MAX_SEED_LEN {
            return Err(PubkeyError::MaxSeedLengthExceeded);
        }

        let owner = owner.as_ref();
        if owner.len() >= PDA_MARKER.len() {
            let slice = &owner[owner.len() - PDA_MARKER.len()..];
            if slice == PDA_MARKER {
                return Err(PubkeyError::IllegalOwner);
            }
        }

        Ok(Pubkey::new(
            hashv(&[base.as_ref(), seed.as_ref(), owner]).as_ref(),
        ))
    }

    /// Find a valid program-derived address and its bump seed.
    ///
    /// Program-derived addresses (PDAs) are account keys that only programs
    /// can sign for, so they must not lie on the ed25519 curve. The search
    /// appends a single bump byte to the seeds, starting at 255 and counting
    /// down until the resulting hash falls off the curve. About half of all
    /// candidates are valid, so the first bump nearly always succeeds.
    ///
    /// Panics if no viable bump exists, which is vanishingly improbable for
    /// honest inputs; use [`Pubkey::try_find_program_address`] to handle the
    /// error instead.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> (Pubkey, u8) {
        Self::try_find_program_address(seeds, program_id)
            .expect("Unable to find a viable program address bump seed")
    }

    /// Find a valid program-derived address and its bump seed.
    ///
    /// The only difference from [`Pubkey::find_program_address`] is that
    /// exhausting all 256 bump seeds returns `PubkeyError::NoViableBump`
    /// instead of panicking.
    pub fn try_find_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<(Pubkey, u8), PubkeyError> {
        let mut bump_seed = [u8::MAX];
        for _ in 0..u8::MAX as usize + 1 {
            let mut seeds_with_bump = seeds.to_vec();
            seeds_with_bump.push(&bump_seed);
            match Self::create_program_address(&seeds_with_bump, program_id) {
                Ok(address) => return Ok((address, bump_seed[0])),
                Err(PubkeyError::InvalidSeeds) => (),
                Err(err) => return Err(err),
            }
            bump_seed[0] = bump_seed[0].saturating_sub(1);
        }
        Err(PubkeyError::NoViableBump)
    }

    /// Derive a program address from seeds and a program id.
    ///
    /// Hashes the seeds, the program id, and a domain separator with
    /// SHA-256, then rejects the result if it decodes to an ed25519 curve
    /// point. Each seed is limited to [`MAX_SEED_LEN`] bytes and at most
    /// [`MAX_SEEDS`] seeds may be supplied.
    pub fn create_program_address(
        seeds: &[&[u8]],
        program_id: &Pubkey,
    ) -> Result<Pubkey, PubkeyError> {
        if seeds.len() > MAX_SEEDS {
            return Err(PubkeyError::MaxSeedLengthExceeded);
        }
        for seed in seeds.iter() {
            if seed.len() > MAX_SEED_LEN {
                return Err(PubkeyError::MaxSeedLengthExceeded);
            }
        }

        let mut flattened = Vec::with_capacity(seeds.len() + 2);
        flattened.extend_from_slice(seeds);
        flattened.push(program_id.as_ref());
        flattened.push(PDA_MARKER);
        let hash = hashv(&flattened);

        if crate::curve::bytes_are_curve_point(hash) {
            return Err(PubkeyError::InvalidSeeds);
        }

        Ok(Pubkey::new(hash.as_ref()))
    }

    pub fn is_on_curve(&self) -> bool {
        crate::curve::bytes_are_curve_point(self)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl AsMut<[u8]> for Pubkey {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0[..]
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}
