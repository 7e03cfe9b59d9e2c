//! A unified view over a message's static and lookup-loaded account keys.

use {
    crate::{
        instruction::{CompiledInstruction, Instruction},
        message::{v0::LoadedAddresses, CompileError},
        pubkey::Pubkey,
    },
    std::collections::HashMap,
};

/// Collection of static and dynamically loaded keys used to load accounts
/// during transaction processing. Indexing continues past the static table
/// into the loaded writable keys, then the loaded read-only keys, giving
/// every account a single u8 index.
#[derive(Clone, Default, Debug, Eq, PartialEq)]
pub struct AccountKeys<'a> {
    static_keys: &'a [Pubkey],
    dynamic_keys: Option<&'a LoadedAddresses>,
}

impl<'a> AccountKeys<'a> {
    pub fn new(static_keys: &'a [Pubkey], dynamic_keys: Option<&'a LoadedAddresses>) -> Self {
        Self {
            static_keys,
            dynamic_keys,
        }
    }

    /// Returns an iterator of account key segments. The ordering of segments
    /// is significant because it defines the index space of the message.
    fn key_segment_iter(&self) -> impl Iterator<Item = &'a [Pubkey]> + Clone {
        if let Some(dynamic_keys) = self.dynamic_keys {
            [
                self.static_keys,
                &dynamic_keys.writable,
                &dynamic_keys.readonly,
            ]
            .into_iter()
        } else {
            // empty segments, so the iterator type is the same
            [self.static_keys, &[], &[]].into_iter()
        }
    }

    /// Returns the address of the account at the specified index of the list
    /// of message account keys constructed from static keys, followed by
    /// dynamically loaded writable addresses, and lastly the list of
    /// dynamically loaded readonly addresses.
    pub fn get(&self, mut index: usize) -> Option<&'a Pubkey> {
        for key_segment in self.key_segment_iter() {
            if index < key_segment.len() {
                return Some(&key_segment[index]);
            }
            index = index.saturating_sub(key_segment.len());
        }
        None
    }

    /// Returns the total length of loaded accounts for a message.
    pub fn len(&self) -> usize {
        let mut len = 0usize;
        for key_segment in self.key_segment_iter() {
            len = len.saturating_add(key_segment.len());
        }
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator for the addresses of the loaded accounts for a message.
    pub fn iter(&self) -> impl Iterator<Item = &'a Pubkey> + Clone {
        self.key_segment_iter().flatten()
    }

    /// Compile instructions using the order of account keys to determine
    /// compiled instruction account indexes.
    ///
    /// Panics when compilation fails; see
    /// [`AccountKeys::try_compile_instructions`] for a full description of
    /// the failure modes.
    pub fn compile_instructions(&self, instructions: &[Instruction]) -> Vec<CompiledInstruction> {
        self.try_compile_instructions(instructions)
            .expect("compilation failure")
    }

    /// Compile instructions using the order of account keys to determine
    /// compiled instruction account indexes.
    ///
    /// Every account and program key referenced by the instructions must be
    /// present in this view, or compilation fails with
    /// `CompileError::UnknownInstructionKey`. More than 256 keys fail with
    /// `CompileError::AccountIndexOverflow`.
    pub fn try_compile_instructions(
        &self,
        instructions: &[Instruction],
    ) -> Result<Vec<CompiledInstruction>, CompileError> {
        let mut account_index_map: HashMap<&Pubkey, u8> = HashMap::with_capacity(self.len());
        for (index, key) in self.iter().enumerate() {
            let index = u8::try_from(index).map_err(|_| CompileError::AccountIndexOverflow)?;
            account_index_map.entry(key).or_insert(index);
        }

        let get_account_index = |key: &Pubkey| -> Result<u8, CompileError> {
            account_index_map
                .get(key)
                .cloned()
                .ok_or(CompileError::UnknownInstructionKey(*key))
        };

        instructions
            .iter()
            .map(|ix| {
                let accounts = ix
                    .accounts
                    .iter()
                    .map(|account_meta| get_account_index(&account_meta.pubkey))
                    .collect::<Result<Vec<u8>, CompileError>>()?;
                Ok(CompiledInstruction {
                    program_id_index: get_account_index(&ix.program_id)?,
                    accounts,
                    data: ix.data.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::instruction::AccountMeta};

    fn test_account_keys() -> ([Pubkey; 3], LoadedAddresses) {
        let static_keys = [
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        ];
        let loaded = LoadedAddresses {
            writable: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            readonly: vec![Pubkey::new_unique()],
        };
        (static_keys, loaded)
    }

    #[test]
    fn test_get_with_dynamic_keys() {
        let (static_keys, loaded) = test_account_keys();
        let account_keys = AccountKeys::new(&static_keys, Some(&loaded));

        assert_eq!(account_keys.get(0), Some(&static_keys[0]));
        assert_eq!(account_keys.get(2), Some(&static_keys[2]));
        assert_eq!(account_keys.get(3), Some(&loaded.writable[0]));
        assert_eq!(account_keys.get(4), Some(&loaded.writable[1]));
        assert_eq!(account_keys.get(5), Some(&loaded.readonly[0]));
        assert_eq!(account_keys.get(6), None);
        assert_eq!(account_keys.len(), 6);
    }

    #[test]
    fn test_get_without_dynamic_keys() {
        let (static_keys, _) = test_account_keys();
        let account_keys = AccountKeys::new(&static_keys, None);

        assert_eq!(account_keys.get(0), Some(&static_keys[0]));
        assert_eq!(account_keys.get(3), None);
        assert_eq!(account_keys.len(), 3);
    }

    #[test]
    fn test_try_compile_instructions() {
        let (static_keys, loaded) = test_account_keys();
        let account_keys = AccountKeys::new(&static_keys, Some(&loaded));

        let program_id = static_keys[2];
        let instruction = Instruction::new_with_bytes(
            program_id,
            &[7],
            vec![
                AccountMeta::new(loaded.writable[1], false),
                AccountMeta::new_readonly(loaded.readonly[0], false),
                AccountMeta::new(static_keys[0], true),
            ],
        );

        let compiled = account_keys
            .try_compile_instructions(&[instruction])
            .unwrap();
        assert_eq!(
            compiled,
            vec![CompiledInstruction {
                program_id_index: 2,
                accounts: vec![4, 5, 0],
                data: vec![7],
            }]
        );
    }

    #[test]
    fn test_try_compile_instructions_with_unknown_key() {
        let (static_keys, _) = test_account_keys();
        let account_keys = AccountKeys::new(&static_keys, None);

        let unknown_key = Pubkey::new_unique();
        let instruction = Instruction::new_with_bytes(
            static_keys[0],
            &[],
            vec![AccountMeta::new(unknown_key, false)],
        );
        assert_eq!(
            account_keys.try_compile_instructions(&[instruction]),
            Err(CompileError::UnknownInstructionKey(unknown_key))
        );
    }
}
