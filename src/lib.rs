//! Client-side transaction construction for the Meridian network.
//!
//! This crate builds the exact byte sequences the Meridian runtime accepts:
//! unordered [`Instruction`]s are compiled into a [`Message`] whose account
//! table is deduplicated and ordered per protocol rules, then signed and
//! serialized into a [`Transaction`] envelope. It also computes
//! program-derived addresses, which are guaranteed to lie off the ed25519
//! curve so that no private key can ever sign for them.
//!
//! [`Instruction`]: crate::instruction::Instruction
//! [`Message`]: crate::message::Message
//! [`Transaction`]: crate::transaction::Transaction
//!
//! Transport (RPC, subscriptions) and per-program instruction encoders live
//! in other crates; this one is purely a synchronous, CPU-bound codec layer
//! with no I/O and no shared mutable state.

pub mod address_lookup_table_account;
pub mod curve;
pub mod hash;
pub mod instruction;
pub mod message;
pub mod pubkey;
pub mod sanitize;
pub mod short_vec;
pub mod signature;
pub mod signer;
pub mod signers;
pub mod transaction;

pub use crate::{
    pubkey::Pubkey,
    signature::Signature,
    signer::{keypair::Keypair, Signer},
};
