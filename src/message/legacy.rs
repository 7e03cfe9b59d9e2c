//! The original message format.
//!
//! A legacy message lists every account it references inline. This is the
//! format produced when no address lookup tables are involved, and it is
//! serialized without a version prefix: the first byte is the header's
//! required-signature count, whose top bit is always zero.

use {
    crate::{
        hash::Hash,
        instruction::{CompiledInstruction, Instruction},
        message::{AccountKeys, AccountRefs, CompileError, MessageHeader, NonceInfo},
        pubkey::Pubkey,
        sanitize::{Sanitize, SanitizeError},
        short_vec,
    },
    serde_derive::{Deserialize, Serialize},
};

/// A Meridian transaction message in the legacy format.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The message header, identifying signed and read-only `account_keys`.
    pub header: MessageHeader,

    /// All the account keys used by this transaction.
    #[serde(with = "short_vec")]
    pub account_keys: Vec<Pubkey>,

    /// The id of a recent ledger entry.
    pub recent_blockhash: Hash,

    /// Programs that will be executed in sequence and committed in one
    /// atomic transaction if all succeed.
    #[serde(with = "short_vec")]
    pub instructions: Vec<CompiledInstruction>,
}

impl Sanitize for Message {
    fn sanitize(&self) -> Result<(), SanitizeError> {
        // signing area and read-only non-signing area should not overlap
        if usize::from(self.header.num_required_signatures)
            .saturating_add(usize::from(self.header.num_readonly_unsigned_accounts))
            > self.account_keys.len()
        {
            return Err(SanitizeError::IndexOutOfBounds);
        }

        // there should be at least 1 RW fee-payer account.
        if self.header.num_readonly_signed_accounts >= self.header.num_required_signatures {
            return Err(SanitizeError::IndexOutOfBounds);
        }

        for ci in &self.instructions {
            if usize::from(ci.program_id_index) >= self.account_keys.len() {
                return Err(SanitizeError::IndexOutOfBounds);
            }
            // A program cannot be a payer.
            if ci.program_id_index == 0 {
                return Err(SanitizeError::IndexOutOfBounds);
            }
            for ai in &ci.accounts {
                if usize::from(*ai) >= self.account_keys.len() {
                    return Err(SanitizeError::IndexOutOfBounds);
                }
            }
        }
        self.account_keys.sanitize()?;
        self.recent_blockhash.sanitize()?;
        self.instructions.sanitize()?;
        Ok(())
    }
}

impl Message {
    /// Compile instructions into a signable message.
    ///
    /// Fails fast, before any account ordering happens, when the
    /// instruction list is empty, when no fee payer is given, or when the
    /// block reference is the all-zeros placeholder. Signing keys are never
    /// touched by compilation.
    pub fn try_compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: &Hash,
    ) -> Result<Self, CompileError> {
        if instructions.is_empty() {
            return Err(CompileError::EmptyInstructionSet);
        }
        if *recent_blockhash == Hash::default() {
            return Err(CompileError::MissingBlockReference);
        }

        let account_refs = AccountRefs::collect(instructions, Some(payer));
        let (header, account_keys) = account_refs.try_into_message_components(Some(*payer))?;
        let instructions =
            AccountKeys::new(&account_keys, None).try_compile_instructions(instructions)?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash: *recent_blockhash,
            instructions,
        })
    }

    /// Compile instructions against a durable nonce instead of a recent
    /// block reference.
    ///
    /// The nonce-advance instruction is spliced in front of the caller's
    /// instructions so it executes first, and the stored nonce value takes
    /// the place of the blockhash.
    pub fn try_compile_with_nonce(
        payer: &Pubkey,
        instructions: &[Instruction],
        nonce_info: &NonceInfo,
    ) -> Result<Self, CompileError> {
        if instructions.is_empty() {
            return Err(CompileError::EmptyInstructionSet);
        }
        let mut spliced = Vec::with_capacity(instructions.len().saturating_add(1));
        spliced.push(nonce_info.advance_instruction.clone());
        spliced.extend_from_slice(instructions);
        Self::try_compile(payer, &spliced, &nonce_info.nonce)
    }

    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap()
    }

    pub fn program_ids(&self) -> Vec<&Pubkey> {
        self.instructions
            .iter()
            .map(|ix| &self.account_keys[usize::from(ix.program_id_index)])
            .collect()
    }

    pub fn is_signer(&self, i: usize) -> bool {
        i < usize::from(self.header.num_required_signatures)
    }

    pub fn signer_keys(&self) -> Vec<&Pubkey> {
        let last_key = self
            .account_keys
            .len()
            .min(usize::from(self.header.num_required_signatures));
        self.account_keys[..last_key].iter().collect()
    }
}
