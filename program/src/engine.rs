//! Ticket accounting and winner selection.
//!
//! Nothing in here touches accounts or sysvars. The processor hands in the
//! current time, a [`TokenLedger`] and an [`EntropySource`], which keeps the
//! rules testable with plain test doubles.

use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    error::RaffleError,
    events::RaffleEvent,
    state::{DrawResult, Raffle, RaffleState, MAX_TICKETS_PER_PURCHASE},
};

/// Fungible token ledger the raffle collects payments through
pub trait TokenLedger {
    fn balance_of(&self, owner: &Pubkey) -> Result<u64, RaffleError>;

    /// Amount `spender` may still move out of `owner`'s balance
    fn allowance(&self, owner: &Pubkey, spender: &Pubkey) -> Result<u64, RaffleError>;

    /// Move `amount` from `owner` into `spender`'s custody. Must either move the
    /// full amount or fail without effect.
    fn transfer_from(
        &mut self,
        owner: &Pubkey,
        spender: &Pubkey,
        amount: u64,
    ) -> Result<(), RaffleError>;
}

/// Supplies the raw value a winner is selected from
pub trait EntropySource {
    fn entropy(&self) -> Result<u64, RaffleError>;
}

/// Reduce `entropy` to a roster position. `None` when the roster is empty.
pub fn winner_index(entropy: u64, roster_len: u64) -> Option<u64> {
    entropy.checked_rem(roster_len)
}

impl Raffle {
    /// Sell `quantity` tickets to `buyer`.
    ///
    /// Checks run in a fixed order: quantity, sale window, purchase size,
    /// balance, allowance.
    /// Funds are pulled before any ticket is recorded, and the roster is left
    /// untouched when the transfer fails.
    pub fn buy<L: TokenLedger + ?Sized>(
        &mut self,
        buyer: &Pubkey,
        quantity: u64,
        now: UnixTimestamp,
        ledger: &mut L,
    ) -> Result<RaffleEvent, RaffleError> {
        if quantity == 0 {
            return Err(RaffleError::InvalidQuantity);
        }
        if self.state(now) != RaffleState::Open {
            return Err(RaffleError::SaleNotOpen);
        }
        if quantity > MAX_TICKETS_PER_PURCHASE {
            return Err(RaffleError::PurchaseTooLarge);
        }

        let cost = quantity
            .checked_mul(self.config.ticket_price)
            .ok_or(RaffleError::Overflow)?;
        let tickets = usize::try_from(quantity).map_err(|_| RaffleError::Overflow)?;
        let roster_len = self
            .roster
            .len()
            .checked_add(tickets)
            .ok_or(RaffleError::Overflow)?;

        if ledger.balance_of(buyer)? < cost {
            return Err(RaffleError::InsufficientBalance);
        }
        if ledger.allowance(buyer, &self.custody)? < cost {
            return Err(RaffleError::TokenNotApproved);
        }

        ledger.transfer_from(buyer, &self.custody, cost)?;

        self.roster.reserve(tickets);
        self.roster.extend(std::iter::repeat(*buyer).take(tickets));

        Ok(RaffleEvent::PurchaseRecorded {
            buyer: *buyer,
            quantity,
            roster_len: roster_len as u64,
        })
    }

    /// Select the winner. Operator only, once, after the sale has closed.
    pub fn draw<E: EntropySource + ?Sized>(
        &mut self,
        caller: &Pubkey,
        now: UnixTimestamp,
        source: &E,
    ) -> Result<RaffleEvent, RaffleError> {
        if *caller != self.config.operator {
            return Err(RaffleError::NotAuthorized);
        }
        match self.state(now) {
            RaffleState::Drawn => return Err(RaffleError::AlreadyDrawn),
            RaffleState::Pending | RaffleState::Open => return Err(RaffleError::SaleNotEnded),
            RaffleState::Closed => {}
        }

        if self.roster.is_empty() {
            return Err(RaffleError::NoParticipants);
        }

        let entropy = source.entropy()?;
        let index = winner_index(entropy, self.roster.len() as u64)
            .ok_or(RaffleError::NoParticipants)?;
        let winner = self.roster[index as usize];

        self.result = Some(DrawResult {
            winner,
            entropy,
            index,
            drawn_at: now,
        });

        Ok(RaffleEvent::RaffleDrawn {
            winner,
            entropy,
            index,
        })
    }

    /// Escrowed payments may only leave custody to the operator, after the draw
    pub fn authorize_withdrawal(&self, caller: &Pubkey) -> Result<(), RaffleError> {
        if *caller != self.config.operator {
            return Err(RaffleError::NotAuthorized);
        }
        if self.result.is_none() {
            return Err(RaffleError::RaffleNotDrawn);
        }
        Ok(())
    }
}
