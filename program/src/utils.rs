// Ticket Raffle Program - Utility Functions
use borsh::BorshSerialize;
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};
use spl_associated_token_account::get_associated_token_address;

use crate::state::{Raffle, CUSTODY_SEED};

/// Find the PDA that holds custody of a raffle's escrow
pub fn find_custody_address(program_id: &Pubkey, raffle: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CUSTODY_SEED, raffle.as_ref()], program_id)
}

/// Escrow token account of a raffle: the custody PDA's associated account for the mint
pub fn find_escrow_address(program_id: &Pubkey, raffle: &Pubkey, token_mint: &Pubkey) -> Pubkey {
    let (custody, _) = find_custody_address(program_id, raffle);
    get_associated_token_address(&custody, token_mint)
}

/// Write the raffle back to its account, growing the account first if needed.
///
/// Growth is paid for by `payer`, who tops the account up to the new
/// rent-exempt minimum.
pub fn store_raffle<'info>(
    raffle: &Raffle,
    raffle_info: &AccountInfo<'info>,
    payer_info: &AccountInfo<'info>,
    system_program_info: &AccountInfo<'info>,
) -> ProgramResult {
    let data = raffle
        .try_to_vec()
        .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;

    if data.len() > raffle_info.data_len() {
        let rent = Rent::get()?;
        let top_up = rent
            .minimum_balance(data.len())
            .saturating_sub(raffle_info.lamports());
        if top_up > 0 {
            msg!("Growing raffle account to {} bytes, rent top-up {}", data.len(), top_up);
            invoke(
                &system_instruction::transfer(payer_info.key, raffle_info.key, top_up),
                &[
                    payer_info.clone(),
                    raffle_info.clone(),
                    system_program_info.clone(),
                ],
            )?;
        }
        raffle_info.realloc(data.len(), false)?;
    }

    raffle_info.data.borrow_mut()[..data.len()].copy_from_slice(&data);
    Ok(())
}
