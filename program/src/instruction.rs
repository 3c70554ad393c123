use solana_program::{
    clock::UnixTimestamp,
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::{Pubkey, PUBKEY_BYTES},
    system_program,
    sysvar::{clock, slot_hashes},
};
use std::convert::TryInto;

use crate::{
    state::{RaffleConfig, RandomnessSource},
    utils::{find_custody_address, find_escrow_address},
};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Create a raffle and its escrow token account
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Payer for the raffle and escrow accounts
    /// 1. `[signer, writable]` The raffle account, must not exist yet
    /// 2. `[]` Mint of the token tickets are paid in
    /// 3. `[]` Custody PDA `["custody", raffle]`
    /// 4. `[writable]` Escrow: the custody PDA's associated token account
    /// 5. `[]` The system program
    /// 6. `[]` The token program
    /// 7. `[]` The associated token account program
    InitializeRaffle {
        /// Price per ticket in the mint's smallest unit
        ticket_price: u64,
        open_time: UnixTimestamp,
        close_time: UnixTimestamp,
        /// Identity allowed to draw the raffle
        operator: Pubkey,
        randomness: RandomnessSource,
    },

    /// Buy tickets with tokens the buyer has delegated to the custody PDA
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The buyer, pays for roster storage
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` Buyer's token account
    /// 3. `[writable]` Escrow token account
    /// 4. `[]` Custody PDA
    /// 5. `[]` The token program
    /// 6. `[]` The system program
    /// 7. `[]` The clock sysvar
    BuyTickets {
        /// Number of tickets to purchase
        quantity: u64,
    },

    /// Select the winner once the sale has closed (operator only)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The operator
    /// 1. `[writable]` The raffle account
    /// 2. `[]` SlotHashes sysvar or the configured Switchboard VRF account
    /// 3. `[]` The system program
    /// 4. `[]` The clock sysvar
    DrawRaffle,

    /// Move collected payments out of escrow after the draw (operator only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The operator
    /// 1. `[]` The raffle account
    /// 2. `[writable]` Escrow token account
    /// 3. `[]` Custody PDA
    /// 4. `[writable]` Destination token account
    /// 5. `[]` The token program
    WithdrawProceeds,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (ticket_price, rest) = Self::unpack_u64(rest)?;
                let (open_time, rest) = Self::unpack_i64(rest)?;
                let (close_time, rest) = Self::unpack_i64(rest)?;
                let (operator, rest) = Self::unpack_pubkey(rest)?;
                let (randomness, _) = Self::unpack_randomness(rest)?;
                Self::InitializeRaffle {
                    ticket_price,
                    open_time,
                    close_time,
                    operator,
                    randomness,
                }
            }
            1 => {
                let (quantity, _) = Self::unpack_u64(rest)?;
                Self::BuyTickets { quantity }
            }
            2 => Self::DrawRaffle,
            3 => Self::WithdrawProceeds,
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match *self {
            Self::InitializeRaffle {
                ticket_price,
                open_time,
                close_time,
                ref operator,
                randomness,
            } => {
                buf.push(0);
                buf.extend_from_slice(&ticket_price.to_le_bytes());
                buf.extend_from_slice(&open_time.to_le_bytes());
                buf.extend_from_slice(&close_time.to_le_bytes());
                buf.extend_from_slice(operator.as_ref());
                match randomness {
                    RandomnessSource::SlotHashes => buf.push(0),
                    RandomnessSource::SwitchboardVrf { vrf_account } => {
                        buf.push(1);
                        buf.extend_from_slice(vrf_account.as_ref());
                    }
                }
            }
            Self::BuyTickets { quantity } => {
                buf.push(1);
                buf.extend_from_slice(&quantity.to_le_bytes());
            }
            Self::DrawRaffle => buf.push(2),
            Self::WithdrawProceeds => buf.push(3),
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::split(input, 8)?;
        let value = bytes
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::split(input, 8)?;
        let value = bytes
            .try_into()
            .map(i64::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }

    fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
        let (bytes, rest) = Self::split(input, PUBKEY_BYTES)?;
        let key = Pubkey::try_from(bytes).map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((key, rest))
    }

    fn unpack_randomness(input: &[u8]) -> Result<(RandomnessSource, &[u8]), ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        match tag {
            0 => Ok((RandomnessSource::SlotHashes, rest)),
            1 => {
                let (vrf_account, rest) = Self::unpack_pubkey(rest)?;
                Ok((RandomnessSource::SwitchboardVrf { vrf_account }, rest))
            }
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }

    fn split(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), ProgramError> {
        if input.len() < len {
            return Err(ProgramError::InvalidInstructionData);
        }
        Ok(input.split_at(len))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    payer: &Pubkey,
    raffle_account: &Pubkey,
    config: &RaffleConfig,
) -> Instruction {
    let data = RaffleInstruction::InitializeRaffle {
        ticket_price: config.ticket_price,
        open_time: config.open_time,
        close_time: config.close_time,
        operator: config.operator,
        randomness: config.randomness,
    }
    .pack();

    let (custody, _) = find_custody_address(program_id, raffle_account);
    let escrow = find_escrow_address(program_id, raffle_account, &config.token_mint);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*raffle_account, true),
            AccountMeta::new_readonly(config.token_mint, false),
            AccountMeta::new_readonly(custody, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        ],
        data,
    }
}

/// Create buy_tickets instruction
pub fn buy_tickets(
    program_id: &Pubkey,
    buyer: &Pubkey,
    raffle_account: &Pubkey,
    buyer_token_account: &Pubkey,
    token_mint: &Pubkey,
    quantity: u64,
) -> Instruction {
    let (custody, _) = find_custody_address(program_id, raffle_account);
    let escrow = find_escrow_address(program_id, raffle_account, token_mint);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*buyer, true),
            AccountMeta::new(*raffle_account, false),
            AccountMeta::new(*buyer_token_account, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new_readonly(custody, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(clock::id(), false),
        ],
        data: RaffleInstruction::BuyTickets { quantity }.pack(),
    }
}

/// Create draw_raffle instruction. `randomness_account` must match the
/// raffle's configured source: the SlotHashes sysvar or its VRF account.
pub fn draw_raffle(
    program_id: &Pubkey,
    operator: &Pubkey,
    raffle_account: &Pubkey,
    randomness_account: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*operator, true),
            AccountMeta::new(*raffle_account, false),
            AccountMeta::new_readonly(*randomness_account, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(clock::id(), false),
        ],
        data: RaffleInstruction::DrawRaffle.pack(),
    }
}

/// Create draw_raffle instruction for a raffle seeded from SlotHashes
pub fn draw_raffle_with_slot_hashes(
    program_id: &Pubkey,
    operator: &Pubkey,
    raffle_account: &Pubkey,
) -> Instruction {
    draw_raffle(program_id, operator, raffle_account, &slot_hashes::id())
}

/// Create withdraw_proceeds instruction
pub fn withdraw_proceeds(
    program_id: &Pubkey,
    operator: &Pubkey,
    raffle_account: &Pubkey,
    token_mint: &Pubkey,
    destination: &Pubkey,
) -> Instruction {
    let (custody, _) = find_custody_address(program_id, raffle_account);
    let escrow = find_escrow_address(program_id, raffle_account, token_mint);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*operator, true),
            AccountMeta::new_readonly(*raffle_account, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new_readonly(custody, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: RaffleInstruction::WithdrawProceeds.pack(),
    }
}
