//! The v0 message format, which supports loading accounts from on-chain
//! address lookup tables.
//!
//! A v0 message keeps signers and invoked programs in its static account
//! table, but may refer to other accounts by their position in a lookup
//! table instead of spelling out the full 32-byte key. Loaded addresses
//! extend the message's index space past the static table: writable loaded
//! addresses first, then read-only ones.

use {
    crate::{
        address_lookup_table_account::AddressLookupTableAccount,
        hash::Hash,
        instruction::{CompiledInstruction, Instruction},
        message::{
            AccountKeys, AccountRefs, CompileError, MessageHeader, NonceInfo,
            MESSAGE_VERSION_PREFIX,
        },
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
        short_vec,
    },
    serde_derive::{Deserialize, Serialize},
};

/// Address table lookups describe an on-chain address lookup table to use
/// for loading more readonly and writable accounts in a single tx.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MessageAddressTableLookup {
    /// Address lookup table account key.
    pub account_key: Pubkey,
    /// List of indexes used to load writable account addresses.
    #[serde(with = "short_vec")]
    pub writable_indexes: Vec<u8>,
    /// List of indexes used to load readonly account addresses.
    #[serde(with = "short_vec")]
    pub readonly_indexes: Vec<u8>,
}

impl Sanitize for MessageAddressTableLookup {}

/// Collection of addresses loaded from on-chain lookup tables, split by
/// the privilege they were loaded with.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
pub struct LoadedAddresses {
    /// List of addresses for writable loaded accounts.
    pub writable: Vec<Pubkey>,
    /// List of addresses for read-only loaded accounts.
    pub readonly: Vec<Pubkey>,
}

impl FromIterator<LoadedAddresses> for LoadedAddresses {
    fn from_iter<T: IntoIterator<Item = LoadedAddresses>>(iter: T) -> Self {
        let (writable, readonly): (Vec<Vec<Pubkey>>, Vec<Vec<Pubkey>>) = iter
            .into_iter()
            .map(|addresses| (addresses.writable, addresses.readonly))
            .unzip();
        LoadedAddresses {
            writable: writable.into_iter().flatten().collect(),
            readonly: readonly.into_iter().flatten().collect(),
        }
    }
}

impl LoadedAddresses {
    pub fn len(&self) -> usize {
        self.writable.len().saturating_add(self.readonly.len())
    }

    pub fn is_empty(&self) -> bool {
        self.writable.is_empty() && self.readonly.is_empty()
    }
}

/// A Meridian transaction message in the v0 format, serialized behind the
/// `0x80` version prefix byte.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The message header, identifying signed and read-only `account_keys`.
    /// Header values only describe static `account_keys`, they do not
    /// describe any additional account keys loaded via address table
    /// lookups.
    pub header: MessageHeader,

    /// List of accounts loaded by this transaction.
    #[serde(with = "short_vec")]
    pub account_keys: Vec<Pubkey>,

    /// The id of a recent ledger entry.
    pub recent_blockhash: Hash,

    /// Instructions that invoke a designated program, are executed in
    /// sequence, and committed in one atomic transaction if all succeed.
    ///
    /// Account and program indexes index into the space formed by this
    /// message's static keys followed by its loaded writable and read-only
    /// addresses, in that order.
    #[serde(with = "short_vec")]
    pub instructions: Vec<CompiledInstruction>,

    /// List of address table lookups used to load additional accounts for
    /// this transaction.
    #[serde(with = "short_vec")]
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl Sanitize for Message {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        let num_static_account_keys = self.account_keys.len();
        if usize::from(self.header.num_required_signatures)
            .saturating_add(usize::from(self.header.num_readonly_unsigned_accounts))
            > num_static_account_keys
        {
            return Err(SanitizeError::IndexOutOfBounds);
        }

        // there should be at least 1 RW fee-payer account.
        if self.header.num_readonly_signed_accounts >= self.header.num_required_signatures {
            return Err(SanitizeError::InvalidValue);
        }

        let num_dynamic_account_keys = {
            let mut total_lookup_keys: usize = 0;
            for lookup in &self.address_table_lookups {
                let num_lookup_indexes = lookup
                    .writable_indexes
                    .len()
                    .saturating_add(lookup.readonly_indexes.len());

                // each lookup table must be used to load at least one account
                if num_lookup_indexes == 0 {
                    return Err(SanitizeError::InvalidValue);
                }

                total_lookup_keys = total_lookup_keys.saturating_add(num_lookup_indexes);
            }
            total_lookup_keys
        };

        // the combined number of static and dynamic account keys must be <= 256
        // since account indices are encoded as a u8
        let total_account_keys = num_static_account_keys.saturating_add(num_dynamic_account_keys);
        if total_account_keys > 256 {
            return Err(SanitizeError::IndexOutOfBounds);
        }

        // the combined number of static and dynamic account keys is known,
        // so verify that each instruction's account and program index is
        // within the bounds of the account key space
        let max_account_ix = total_account_keys.saturating_sub(1);
        for instruction in &self.instructions {
            // program id index must reference a static key since programs
            // cannot be loaded through a lookup table
            if usize::from(instruction.program_id_index) >= num_static_account_keys {
                return Err(SanitizeError::IndexOutOfBounds);
            }
            // A program cannot be a payer.
            if instruction.program_id_index == 0 {
                return Err(SanitizeError::IndexOutOfBounds);
            }
            for account_index in &instruction.accounts {
                if usize::from(*account_index) > max_account_ix {
                    return Err(SanitizeError::IndexOutOfBounds);
                }
            }
        }

        Ok(())
    }
}

impl Message {
    /// Compile instructions into a v0 message, offloading non-signer keys
    /// to the given lookup tables where possible.
    ///
    /// Each table is consulted in order; an account moves into a lookup
    /// only if it is neither a signer nor an invoked program and its key
    /// appears in that table. The caller controls placement entirely
    /// through the table list it supplies: an empty list yields a message
    /// with a fully static account table.
    pub fn try_compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
    ) -> Result<Self, CompileError> {
        if instructions.is_empty() {
            return Err(CompileError::EmptyInstructionSet);
        }
        if recent_blockhash == Hash::default() {
            return Err(CompileError::MissingBlockReference);
        }

        let mut account_refs = AccountRefs::collect(instructions, Some(payer));

        let mut address_table_lookups = Vec::with_capacity(address_lookup_table_accounts.len());
        let mut loaded_addresses_list = Vec::with_capacity(address_lookup_table_accounts.len());
        for lookup_table_account in address_lookup_table_accounts {
            if let Some((lookup, loaded_addresses)) =
                account_refs.try_extract_table_lookup(lookup_table_account)?
            {
                address_table_lookups.push(lookup);
                loaded_addresses_list.push(loaded_addresses);
            }
        }

        let (header, static_keys) = account_refs.try_into_message_components(Some(*payer))?;
        let dynamic_keys: LoadedAddresses = loaded_addresses_list.into_iter().collect();
        let account_keys = AccountKeys::new(&static_keys, Some(&dynamic_keys));
        if account_keys.len() > usize::from(u8::MAX) + 1 {
            return Err(CompileError::AccountIndexOverflow);
        }
        let instructions = account_keys.try_compile_instructions(instructions)?;

        Ok(Self {
            header,
            account_keys: static_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        })
    }

    /// Compile a v0 message against a durable nonce instead of a recent
    /// block reference, splicing the nonce-advance instruction in front.
    pub fn try_compile_with_nonce(
        payer: &Pubkey,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        nonce_info: &NonceInfo,
    ) -> Result<Self, CompileError> {
        if instructions.is_empty() {
            return Err(CompileError::EmptyInstructionSet);
        }
        let mut spliced = Vec::with_capacity(instructions.len().saturating_add(1));
        spliced.push(nonce_info.advance_instruction.clone());
        spliced.extend_from_slice(instructions);
        Self::try_compile(
            payer,
            &spliced,
            address_lookup_table_accounts,
            nonce_info.nonce,
        )
    }

    /// Serialize this message with a version prefix byte.
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(&(MESSAGE_VERSION_PREFIX, self)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::instruction::AccountMeta};

    fn nonsigner_metas(keys: &[Pubkey], writable: bool) -> Vec<AccountMeta> {
        keys.iter()
            .map(|key| {
                if writable {
                    AccountMeta::new(*key, false)
                } else {
                    AccountMeta::new_readonly(*key, false)
                }
            })
            .collect()
    }

    #[test]
    fn test_try_compile_with_lookups() {
        let payer = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();
        let writable_keys = [Pubkey::new_unique(), Pubkey::new_unique()];
        let readonly_keys = [Pubkey::new_unique()];
        let inline_key = Pubkey::new_unique();

        let mut metas = nonsigner_metas(&writable_keys, true);
        metas.extend(nonsigner_metas(&readonly_keys, false));
        metas.push(AccountMeta::new(inline_key, false));
        let instructions = vec![Instruction::new_with_bytes(program_id, &[3], metas)];

        let lookup_table_account = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![
                readonly_keys[0],
                writable_keys[0],
                writable_keys[1],
            ],
        };

        let recent_blockhash = Hash::new_unique();
        let message = Message::try_compile(
            &payer,
            &instructions,
            &[lookup_table_account.clone()],
            recent_blockhash,
        )
        .unwrap();

        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            }
        );
        // only the payer, the inline key, and the program stay static
        assert_eq!(message.account_keys, vec![payer, inline_key, program_id]);
        assert_eq!(
            message.address_table_lookups,
            vec![MessageAddressTableLookup {
                account_key: lookup_table_account.key,
                writable_indexes: vec![1, 2],
                readonly_indexes: vec![0],
            }]
        );
        // loaded writable addresses follow the static table, then read-only
        assert_eq!(
            message.instructions,
            vec![CompiledInstruction {
                program_id_index: 2,
                accounts: vec![3, 4, 5, 1],
                data: vec![3],
            }]
        );
        assert!(message.sanitize().is_ok());
    }

    #[test]
    fn test_try_compile_without_lookups() {
        let payer = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        let instructions = vec![Instruction::new_with_bytes(
            program_id,
            &[],
            vec![AccountMeta::new(key, false)],
        )];

        let message =
            Message::try_compile(&payer, &instructions, &[], Hash::new_unique()).unwrap();
        assert_eq!(message.account_keys, vec![payer, key, program_id]);
        assert!(message.address_table_lookups.is_empty());
    }

    #[test]
    fn test_try_compile_signers_stay_static() {
        let payer = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();
        let signer = Pubkey::new_unique();
        let instructions = vec![Instruction::new_with_bytes(
            program_id,
            &[],
            vec![AccountMeta::new(signer, true)],
        )];

        // the signer and program are listed in the table, but cannot move
        let lookup_table_account = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![signer, program_id],
        };

        let message = Message::try_compile(
            &payer,
            &instructions,
            &[lookup_table_account],
            Hash::new_unique(),
        )
        .unwrap();
        assert_eq!(message.account_keys, vec![payer, signer, program_id]);
        assert!(message.address_table_lookups.is_empty());
    }

    #[test]
    fn test_try_compile_payer_stays_static() {
        let payer = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        // the payer is only referenced as a writable non-signer
        let instructions = vec![Instruction::new_with_bytes(
            program_id,
            &[],
            vec![
                AccountMeta::new(payer, false),
                AccountMeta::new(other, false),
            ],
        )];

        // a table offering both the payer and the other key may only take
        // the other key
        let lookup_table_account = AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: vec![payer, other],
        };

        let message = Message::try_compile(
            &payer,
            &instructions,
            &[lookup_table_account.clone()],
            Hash::new_unique(),
        )
        .unwrap();
        assert_eq!(message.account_keys, vec![payer, program_id]);
        assert_eq!(
            message.address_table_lookups,
            vec![MessageAddressTableLookup {
                account_key: lookup_table_account.key,
                writable_indexes: vec![1],
                readonly_indexes: vec![],
            }]
        );
        assert_eq!(
            message.instructions,
            vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0, 2],
                data: vec![],
            }]
        );
        assert!(message.sanitize().is_ok());
    }

    #[test]
    fn test_try_compile_fail_fast() {
        let payer = Pubkey::new_unique();
        assert_eq!(
            Message::try_compile(&payer, &[], &[], Hash::new_unique()),
            Err(CompileError::EmptyInstructionSet)
        );

        let instructions = vec![Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![AccountMeta::new(payer, true)],
        )];
        assert_eq!(
            Message::try_compile(&payer, &instructions, &[], Hash::default()),
            Err(CompileError::MissingBlockReference)
        );
    }

    #[test]
    fn test_try_compile_with_nonce() {
        let payer = Pubkey::new_unique();
        let nonce_info = NonceInfo {
            nonce: Hash::new_unique(),
            advance_instruction: Instruction::new_with_bytes(
                Pubkey::new_unique(),
                &[0],
                vec![AccountMeta::new(Pubkey::new_unique(), false)],
            ),
        };
        let instructions = vec![Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(payer, true)],
        )];

        let message =
            Message::try_compile_with_nonce(&payer, &instructions, &[], &nonce_info).unwrap();
        assert_eq!(message.recent_blockhash, nonce_info.nonce);
        assert_eq!(message.instructions[0].data, vec![0]);
        assert_eq!(message.instructions[1].data, vec![1]);
    }

    #[test]
    fn test_sanitize_with_lookups() {
        let message = Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            recent_blockhash: Hash::new_unique(),
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0, 2, 3],
                data: vec![],
            }],
            address_table_lookups: vec![MessageAddressTableLookup {
                account_key: Pubkey::new_unique(),
                writable_indexes: vec![0],
                readonly_indexes: vec![1],
            }],
        };
        assert!(message.sanitize().is_ok());

        // empty lookups are not allowed
        let mut bad = message.clone();
        bad.address_table_lookups[0].writable_indexes.clear();
        bad.address_table_lookups[0].readonly_indexes.clear();
        assert!(bad.sanitize().is_err());

        // account index past the combined key space
        let mut bad = message.clone();
        bad.instructions[0].accounts = vec![4];
        assert!(bad.sanitize().is_err());

        // program ids cannot come from a lookup table
        let mut bad = message;
        bad.instructions[0].program_id_index = 2;
        assert!(bad.sanitize().is_err());
    }

    #[test]
    fn test_serialize_prefix() {
        let message = Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 0,
            },
            account_keys: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            recent_blockhash: Hash::new_unique(),
            instructions: vec![],
            address_table_lookups: vec![],
        };
        let bytes = message.serialize();
        assert_eq!(bytes[0], MESSAGE_VERSION_PREFIX);
        assert_eq!(
            bincode::serialize(&crate::message::VersionedMessage::V0(message)).unwrap(),
            bytes
        );
    }
}
