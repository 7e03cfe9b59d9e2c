//! Sequences of instructions executed atomically.
//!
//! A message is the signed payload of a transaction: a header describing the
//! privilege layout of the account table, the account table itself, a recent
//! block reference, and the compiled instructions. Two formats exist. The
//! legacy format lists every account inline; the v0 format may additionally
//! load accounts from on-chain lookup tables, and is wrapped in a version
//! prefix byte on the wire.

use {
    crate::{hash::Hash, instruction::Instruction},
    serde_derive::{Deserialize, Serialize},
};

pub mod account_keys;
pub(crate) mod account_refs;
pub mod legacy;
pub mod v0;
pub mod versions;

pub use {
    account_keys::AccountKeys,
    account_refs::CompileError,
    legacy::Message,
    versions::{VersionedMessage, MESSAGE_VERSION_PREFIX},
};
pub(crate) use account_refs::AccountRefs;

/// The length of a message header in bytes.
pub const MESSAGE_HEADER_LENGTH: usize = 3;

/// Describes the organization and privileges of accounts in a message's
/// account table.
///
/// The table is partitioned into four contiguous segments: writable signers,
/// read-only signers, writable non-signers, read-only non-signers. Three
/// counts are enough to recover the partition, since the segment lengths
/// must sum to the table length.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    /// The number of signatures required for this message to be considered
    /// valid. The signers of those signatures must match the first
    /// `num_required_signatures` of the account table.
    pub num_required_signatures: u8,
    /// The last `num_readonly_signed_accounts` of the signing keys are
    /// read-only accounts.
    pub num_readonly_signed_accounts: u8,
    /// The last `num_readonly_unsigned_accounts` of the non-signing keys are
    /// read-only accounts.
    pub num_readonly_unsigned_accounts: u8,
}

/// A durable nonce to stamp into a message in place of a recent block
/// reference, paired with the instruction that advances the nonce account.
///
/// The advance instruction is spliced in front of the caller's instructions
/// so it executes first, guaranteeing the nonce is consumed even if later
/// instructions fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceInfo {
    pub nonce: Hash,
    pub advance_instruction: Instruction,
}
