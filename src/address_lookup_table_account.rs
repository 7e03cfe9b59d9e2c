//! The client-side view of an on-chain address lookup table.

use {crate::pubkey::Pubkey, serde_derive::{Deserialize, Serialize}};

/// The definition of an address lookup table account as used by message
/// compilation. Clients fetch the table contents separately; compilation
/// only needs the table's address and the list of addresses it stores.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct AddressLookupTableAccount {
    pub key: Pubkey,
    pub addresses: Vec<Pubkey>,
}
