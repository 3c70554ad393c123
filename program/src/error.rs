use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError,
    program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Ticket quantity must be positive
    #[error("Number of tickets must be greater than 0")]
    InvalidQuantity,

    /// Purchase attempted outside `[open_time, close_time)`
    #[error("Ticket sale is not open")]
    SaleNotOpen,

    #[error("Insufficient balance")]
    InsufficientBalance,

    /// The raffle custody is not delegated enough of the buyer's tokens
    #[error("Token not approved")]
    TokenNotApproved,

    /// Only the operator may draw or withdraw
    #[error("Caller is not the raffle operator")]
    NotAuthorized,

    #[error("Ticket sale has not ended")]
    SaleNotEnded,

    #[error("No participants")]
    NoParticipants,

    #[error("Raffle has already been drawn")]
    AlreadyDrawn,

    /// The token program rejected the transfer
    #[error("Token ledger transfer failed")]
    TokenLedgerFailure,

    #[error("Ticket price must be greater than 0")]
    InvalidTicketPrice,

    #[error("Sale close time must be after open time")]
    InvalidSaleWindow,

    #[error("Arithmetic overflow")]
    Overflow,

    /// Roster growth for a single purchase exceeds what one instruction may allocate
    #[error("Too many tickets in a single purchase")]
    PurchaseTooLarge,

    #[error("Raffle has not been drawn")]
    RaffleNotDrawn,

    #[error("Randomness account does not match the raffle configuration")]
    InvalidRandomnessAccount,

    #[error("Randomness is not available yet")]
    RandomnessNotResolved,

    /// Token account has the wrong owner or mint
    #[error("Token account does not match the buyer or raffle mint")]
    TokenAccountMismatch,

    #[error("Escrow account does not match the raffle")]
    InvalidEscrowAccount,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_follow_declaration_order() {
        assert_eq!(ProgramError::from(RaffleError::InvalidQuantity), ProgramError::Custom(0));
        assert_eq!(ProgramError::from(RaffleError::AlreadyDrawn), ProgramError::Custom(7));
        assert_eq!(
            ProgramError::from(RaffleError::TokenLedgerFailure),
            ProgramError::Custom(8)
        );
    }
}
