use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, log::sol_log_data, msg, pubkey::Pubkey};

/// Notifications the program logs for indexers.
///
/// Each event is written twice: a readable `msg!` line and a borsh payload via
/// `sol_log_data` ("Program data: <base64>") that clients decode with
/// [`RaffleEvent::try_from_slice`].
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleInitialized {
        raffle: Pubkey,
        ticket_price: u64,
        open_time: UnixTimestamp,
        close_time: UnixTimestamp,
        operator: Pubkey,
    },
    PurchaseRecorded {
        buyer: Pubkey,
        quantity: u64,
        roster_len: u64,
    },
    RaffleDrawn {
        winner: Pubkey,
        entropy: u64,
        index: u64,
    },
    ProceedsWithdrawn {
        destination: Pubkey,
        amount: u64,
    },
}

impl RaffleEvent {
    pub fn emit(&self) {
        match self {
            Self::RaffleInitialized {
                raffle,
                ticket_price,
                open_time,
                close_time,
                operator,
            } => msg!(
                "RaffleInitialized: raffle={}, price={}, open={}, close={}, operator={}",
                raffle,
                ticket_price,
                open_time,
                close_time,
                operator
            ),
            Self::PurchaseRecorded {
                buyer,
                quantity,
                roster_len,
            } => msg!(
                "PurchaseRecorded: buyer={}, quantity={}, roster_len={}",
                buyer,
                quantity,
                roster_len
            ),
            Self::RaffleDrawn {
                winner,
                entropy,
                index,
            } => msg!(
                "RaffleDrawn: winner={}, entropy={}, index={}",
                winner,
                entropy,
                index
            ),
            Self::ProceedsWithdrawn {
                destination,
                amount,
            } => msg!(
                "ProceedsWithdrawn: destination={}, amount={}",
                destination,
                amount
            ),
        }

        if let Ok(payload) = self.try_to_vec() {
            sol_log_data(&[&payload]);
        }
    }
}
