// Ticket Raffle Program
// A time-bounded raffle paid for in SPL tokens, drawn once by its operator

pub mod engine;
pub mod error;
pub mod events;
pub mod instruction;
pub mod ledger;
pub mod processor;
pub mod state;
pub mod utils;

// Entropy sources for the draw
pub mod vrf;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub use solana_program;

solana_program::declare_id!("EG1ZRr9vjwXZwNGd9MQUeTDgqsA2tpsSfvPKiuQ3VE2G");

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
