//! Collection and ordering of the accounts referenced by a message.

use {
    crate::{
        address_lookup_table_account::AddressLookupTableAccount,
        instruction::Instruction,
        message::{
            v0::{LoadedAddresses, MessageAddressTableLookup},
            MessageHeader,
        },
        pubkey::Pubkey,
    },
    std::collections::{hash_map::Entry, HashMap},
    thiserror::Error,
};

#[derive(PartialEq, Debug, Error, Eq, Clone)]
pub enum CompileError {
    #[error("account index overflowed during compilation")]
    AccountIndexOverflow,
    #[error("address lookup table index overflowed during compilation")]
    AddressTableLookupIndexOverflow,
    #[error("encountered unknown account key `{0}` during instruction compilation")]
    UnknownInstructionKey(Pubkey),
    #[error("no fee payer was designated")]
    MissingFeePayer,
    #[error("no recent block reference was provided")]
    MissingBlockReference,
    #[error("instruction list is empty")]
    EmptyInstructionSet,
}

/// One deduplicated account reference with its merged privilege flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AccountRef {
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
    /// Set when the account is invoked as a program. Invoked accounts must
    /// keep a static table index, so they are never moved into a lookup.
    is_invoked: bool,
}

/// The deduplicated set of accounts referenced by a group of instructions.
///
/// Duplicate references merge by OR-ing their privilege flags, so an account
/// one instruction writes and another only reads ends up writable. The set
/// remembers discovery order, which decides relative order inside each
/// privilege segment of the compiled account table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct AccountRefs {
    positions: HashMap<Pubkey, usize>,
    refs: Vec<AccountRef>,
}

impl AccountRefs {
    /// Walk the instructions and record every account they touch. The fee
    /// payer, when given, enters first as a writable signer so that later
    /// lookup extraction can never move it out of the static table. Account
    /// metas are visited next, in instruction order, then each program id
    /// joins as a read-only non-signer.
    pub(crate) fn collect(instructions: &[Instruction], fee_payer: Option<&Pubkey>) -> Self {
        let mut refs = Self::default();
        if let Some(fee_payer) = fee_payer {
            refs.add(*fee_payer, true, true, false);
        }
        for instruction in instructions {
            for account_meta in &instruction.accounts {
                refs.add(
                    account_meta.pubkey,
                    account_meta.is_signer,
                    account_meta.is_writable,
                    false,
                );
            }
        }
        for instruction in instructions {
            refs.add(instruction.program_id, false, false, true);
        }
        refs
    }

    fn add(&mut self, pubkey: Pubkey, is_signer: bool, is_writable: bool, is_invoked: bool) {
        match self.positions.entry(pubkey) {
            Entry::Occupied(entry) => {
                let account_ref = &mut self.refs[*entry.get()];
                account_ref.is_signer |= is_signer;
                account_ref.is_writable |= is_writable;
                account_ref.is_invoked |= is_invoked;
            }
            Entry::Vacant(entry) => {
                entry.insert(self.refs.len());
                self.refs.push(AccountRef {
                    pubkey,
                    is_signer,
                    is_writable,
                    is_invoked,
                });
            }
        }
    }

    /// Extract the non-signer refs that appear in the given lookup table.
    ///
    /// Extracted refs are removed from this set. The returned lookup records
    /// their positions within the table; the loaded addresses keep this
    /// set's discovery order. Returns `None` if the table contains none of
    /// the remaining refs.
    pub(crate) fn try_extract_table_lookup(
        &mut self,
        lookup_table_account: &AddressLookupTableAccount,
    ) -> Result<Option<(MessageAddressTableLookup, LoadedAddresses)>, CompileError> {
        let (writable_indexes, drained_writable_keys) = self
            .try_drain_keys_found_in_lookup_table(&lookup_table_account.addresses, |r| {
                !r.is_signer && !r.is_invoked && r.is_writable
            })?;
        let (readonly_indexes, drained_readonly_keys) = self
            .try_drain_keys_found_in_lookup_table(&lookup_table_account.addresses, |r| {
                !r.is_signer && !r.is_invoked && !r.is_writable
            })?;

        // Don't construct a lookup if no keys were found
        if writable_indexes.is_empty() && readonly_indexes.is_empty() {
            return Ok(None);
        }

        Ok(Some((
            MessageAddressTableLookup {
                account_key: lookup_table_account.key,
                writable_indexes,
                readonly_indexes,
            },
            LoadedAddresses {
                writable: drained_writable_keys,
                readonly: drained_readonly_keys,
            },
        )))
    }

    fn try_drain_keys_found_in_lookup_table(
        &mut self,
        lookup_table_addresses: &[Pubkey],
        predicate: impl Fn(&AccountRef) -> bool,
    ) -> Result<(Vec<u8>, Vec<Pubkey>), CompileError> {
        let mut lookup_table_indexes = Vec::new();
        let mut drained_keys = Vec::new();

        let mut index = 0;
        while index < self.refs.len() {
            let account_ref = self.refs[index];
            if predicate(&account_ref) {
                if let Some(position) = lookup_table_addresses
                    .iter()
                    .position(|address| *address == account_ref.pubkey)
                {
                    let position = u8::try_from(position)
                        .map_err(|_| CompileError::AddressTableLookupIndexOverflow)?;
                    lookup_table_indexes.push(position);
                    drained_keys.push(account_ref.pubkey);
                    self.refs.remove(index);
                    continue;
                }
            }
            index += 1;
        }

        if !drained_keys.is_empty() {
            self.positions.clear();
            for (position, account_ref) in self.refs.iter().enumerate() {
                self.positions.insert(account_ref.pubkey, position);
            }
        }

        Ok((lookup_table_indexes, drained_keys))
    }

    /// Order the set into a message header and account table.
    ///
    /// The fee payer leads the table as a writable signer regardless of how
    /// the instructions referenced it. The remaining refs partition into
    /// writable signers, read-only signers, writable non-signers, and
    /// read-only non-signers, keeping discovery order within each segment.
    pub(crate) fn try_into_message_components(
        self,
        fee_payer: Option<Pubkey>,
    ) -> Result<(MessageHeader, Vec<Pubkey>), CompileError> {
        let fee_payer = fee_payer.ok_or(CompileError::MissingFeePayer)?;

        let mut writable_signer_keys = vec![fee_payer];
        let mut readonly_signer_keys = vec![];
        let mut writable_non_signer_keys = vec![];
        let mut readonly_non_signer_keys = vec![];
        for account_ref in &self.refs {
            if account_ref.pubkey == fee_payer {
                continue;
            }
            match (account_ref.is_signer, account_ref.is_writable) {
                (true, true) => writable_signer_keys.push(account_ref.pubkey),
                (true, false) => readonly_signer_keys.push(account_ref.pubkey),
                (false, true) => writable_non_signer_keys.push(account_ref.pubkey),
                (false, false) => readonly_non_signer_keys.push(account_ref.pubkey),
            }
        }

        let try_into_u8 =
            |num: usize| u8::try_from(num).map_err(|_| CompileError::AccountIndexOverflow);

        let signers_len = writable_signer_keys
            .len()
            .saturating_add(readonly_signer_keys.len());
        let header = MessageHeader {
            num_required_signatures: try_into_u8(signers_len)?,
            num_readonly_signed_accounts: try_into_u8(readonly_signer_keys.len())?,
            num_readonly_unsigned_accounts: try_into_u8(readonly_non_signer_keys.len())?,
        };

        let static_account_keys: Vec<Pubkey> = std::iter::empty()
            .chain(writable_signer_keys)
            .chain(readonly_signer_keys)
            .chain(writable_non_signer_keys)
            .chain(readonly_non_signer_keys)
            .collect();

        // every account must be addressable with a u8 index
        if static_account_keys.len() > usize::from(u8::MAX) + 1 {
            return Err(CompileError::AccountIndexOverflow);
        }

        Ok((header, static_account_keys))
    }
}
