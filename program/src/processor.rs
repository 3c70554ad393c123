// Ticket Raffle Program - Instruction Processor
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::state::Account as TokenAccount;

use crate::{
    error::RaffleError,
    events::RaffleEvent,
    instruction::RaffleInstruction,
    ledger::{self, SplTokenLedger},
    state::{Raffle, RaffleConfig, RandomnessSource, CUSTODY_SEED},
    utils,
    vrf::{SlotHashesEntropy, SwitchboardVrfEntropy},
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle {
                ticket_price,
                open_time,
                close_time,
                operator,
                randomness,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(
                    program_id,
                    accounts,
                    ticket_price,
                    open_time,
                    close_time,
                    operator,
                    randomness,
                )
            }
            RaffleInstruction::BuyTickets { quantity } => {
                msg!("Instruction: Buy Tickets");
                Self::process_buy_tickets(program_id, accounts, quantity)
            }
            RaffleInstruction::DrawRaffle => {
                msg!("Instruction: Draw Raffle");
                Self::process_draw_raffle(program_id, accounts)
            }
            RaffleInstruction::WithdrawProceeds => {
                msg!("Instruction: Withdraw Proceeds");
                Self::process_withdraw_proceeds(program_id, accounts)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        ticket_price: u64,
        open_time: i64,
        close_time: i64,
        operator: Pubkey,
        randomness: RandomnessSource,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();

        // Get accounts
        let payer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;
        let custody_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let ata_program_info = next_account_info(account_info_iter)?;

        // Verify payer and raffle account are signers
        if !payer_info.is_signer || !raffle_info.is_signer {
            msg!("Payer and raffle account must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *token_program_info.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        // Verify the raffle account is still unallocated
        if raffle_info.owner != &system_program::id() {
            msg!("Raffle account {} already exists", raffle_info.key);
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        if mint_info.owner != &spl_token::id() {
            msg!("Mint {} is not owned by the token program", mint_info.key);
            return Err(RaffleError::TokenAccountMismatch.into());
        }

        let config = RaffleConfig {
            token_mint: *mint_info.key,
            ticket_price,
            open_time,
            close_time,
            operator,
            randomness,
        };

        // Verify custody PDA and escrow address
        let (custody, custody_bump) = utils::find_custody_address(program_id, raffle_info.key);
        if *custody_info.key != custody {
            msg!("Invalid custody address");
            return Err(ProgramError::InvalidSeeds);
        }
        let escrow = get_associated_token_address(&custody, mint_info.key);
        if *escrow_info.key != escrow {
            return Err(RaffleError::InvalidEscrowAccount.into());
        }

        let raffle = Raffle::new(config, custody, custody_bump, escrow).map_err(|e| {
            msg!("Invalid raffle configuration: {}", e);
            e
        })?;

        // Create raffle account
        let space = raffle.packed_len();
        let rent = Rent::get()?;
        invoke(
            &system_instruction::create_account(
                payer_info.key,
                raffle_info.key,
                rent.minimum_balance(space),
                space as u64,
                program_id,
            ),
            &[
                payer_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        // Create escrow, tolerating an escrow someone created ahead of us
        invoke(
            &create_associated_token_account_idempotent(
                payer_info.key,
                &custody,
                mint_info.key,
                &spl_token::id(),
            ),
            &[
                payer_info.clone(),
                escrow_info.clone(),
                custody_info.clone(),
                mint_info.clone(),
                system_program_info.clone(),
                token_program_info.clone(),
                ata_program_info.clone(),
            ],
        )?;

        // Save raffle state
        utils::store_raffle(&raffle, raffle_info, payer_info, system_program_info)?;

        RaffleEvent::RaffleInitialized {
            raffle: *raffle_info.key,
            ticket_price,
            open_time,
            close_time,
            operator,
        }
        .emit();
        Ok(())
    }

    fn process_buy_tickets(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        quantity: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();

        // Get accounts
        let buyer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let source_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let custody_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let clock_info = next_account_info(account_info_iter)?;

        // Verify buyer is signer
        if !buyer_info.is_signer {
            msg!("Buyer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *token_program_info.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        // Load raffle state and verify its escrow
        let mut raffle = Self::load_raffle(program_id, raffle_info)?;
        Self::check_escrow(&raffle, escrow_info, custody_info)?;

        let clock = Clock::from_account_info(clock_info)?;

        // The buyer's token account is validated by the ledger, after the
        // sale window and purchase size checks
        let bump = [raffle.custody_bump];
        let custody_seeds: &[&[u8]] = &[CUSTODY_SEED, raffle_info.key.as_ref(), &bump];
        let mut token_ledger = SplTokenLedger {
            token_program: token_program_info,
            source: source_info,
            escrow: escrow_info,
            custody: custody_info,
            custody_seeds,
            token_mint: raffle.config.token_mint,
        };

        let event = raffle
            .buy(buyer_info.key, quantity, clock.unix_timestamp, &mut token_ledger)
            .map_err(|e| {
                msg!("Purchase rejected: {}", e);
                e
            })?;

        // Save raffle state, growing the roster
        utils::store_raffle(&raffle, raffle_info, buyer_info, system_program_info)?;
        event.emit();
        Ok(())
    }

    fn process_draw_raffle(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();

        // Get accounts
        let operator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let randomness_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let clock_info = next_account_info(account_info_iter)?;

        // Verify operator is signer
        if !operator_info.is_signer {
            msg!("Operator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(program_id, raffle_info)?;
        let clock = Clock::from_account_info(clock_info)?;
        let now = clock.unix_timestamp;

        // Pick the entropy source fixed at creation
        let drawn = match raffle.config.randomness {
            RandomnessSource::SlotHashes => raffle.draw(
                operator_info.key,
                now,
                &SlotHashesEntropy {
                    slot_hashes: randomness_info,
                    timestamp: now,
                },
            ),
            RandomnessSource::SwitchboardVrf { vrf_account } => raffle.draw(
                operator_info.key,
                now,
                &SwitchboardVrfEntropy {
                    vrf_account: randomness_info,
                    expected: vrf_account,
                },
            ),
        };
        let event = drawn.map_err(|e| {
            msg!("Draw rejected: {}", e);
            e
        })?;

        // Save raffle state
        utils::store_raffle(&raffle, raffle_info, operator_info, system_program_info)?;
        event.emit();
        Ok(())
    }

    fn process_withdraw_proceeds(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();

        // Get accounts
        let operator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let custody_info = next_account_info(account_info_iter)?;
        let destination_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        // Verify operator is signer
        if !operator_info.is_signer {
            msg!("Operator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *token_program_info.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let raffle = Self::load_raffle(program_id, raffle_info)?;
        raffle.authorize_withdrawal(operator_info.key).map_err(|e| {
            msg!("Withdrawal rejected: {}", e);
            e
        })?;
        Self::check_escrow(&raffle, escrow_info, custody_info)?;

        // Verify destination holds the raffle mint
        let destination = TokenAccount::unpack(&destination_info.data.borrow())?;
        if destination.mint != raffle.config.token_mint {
            return Err(RaffleError::TokenAccountMismatch.into());
        }

        // Release the whole escrow balance
        let amount = TokenAccount::unpack(&escrow_info.data.borrow())?.amount;
        if amount > 0 {
            let bump = [raffle.custody_bump];
            let custody_seeds: &[&[u8]] = &[CUSTODY_SEED, raffle_info.key.as_ref(), &bump];
            ledger::release_escrow(
                token_program_info,
                escrow_info,
                destination_info,
                custody_info,
                custody_seeds,
                amount,
            )?;
        }

        RaffleEvent::ProceedsWithdrawn {
            destination: *destination_info.key,
            amount,
        }
        .emit();
        Ok(())
    }

    fn load_raffle(program_id: &Pubkey, raffle_info: &AccountInfo) -> Result<Raffle, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let data = raffle_info.data.borrow();
        Raffle::unpack(&data)
    }

    fn check_escrow(
        raffle: &Raffle,
        escrow_info: &AccountInfo,
        custody_info: &AccountInfo,
    ) -> ProgramResult {
        if *escrow_info.key != raffle.escrow {
            return Err(RaffleError::InvalidEscrowAccount.into());
        }
        if *custody_info.key != raffle.custody {
            msg!("Invalid custody address");
            return Err(ProgramError::InvalidSeeds);
        }
        Ok(())
    }
}
