// Ticket Raffle Program - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::IsInitialized,
    pubkey::Pubkey,
};

use crate::error::RaffleError;

/// Seed prefix for the PDA that owns the raffle's escrow token account
pub const CUSTODY_SEED: &[u8] = b"custody";

/// Bytes one roster entry occupies in the raffle account
pub const ROSTER_ENTRY_LEN: usize = 32;

/// An account may grow by at most 10 KiB per instruction, which caps how many
/// roster entries a single purchase can append.
pub const MAX_TICKETS_PER_PURCHASE: u64 = 300;

/// Where the draw takes its entropy from. Chosen at creation time.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandomnessSource {
    /// Most recent slot hash mixed with the clock. Anyone producing blocks
    /// around the draw can bias this.
    SlotHashes,
    /// A Switchboard VRF account whose resolved result seeds the draw
    SwitchboardVrf { vrf_account: Pubkey },
}

/// Raffle parameters, immutable once the raffle is initialized
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RaffleConfig {
    /// Mint of the token tickets are paid in
    pub token_mint: Pubkey,
    /// Price of one ticket in the mint's smallest unit
    pub ticket_price: u64,
    /// First second tickets can be bought
    pub open_time: UnixTimestamp,
    /// First second tickets can no longer be bought and the draw is allowed
    pub close_time: UnixTimestamp,
    /// The only identity allowed to draw the raffle
    pub operator: Pubkey,
    pub randomness: RandomnessSource,
}

impl RaffleConfig {
    pub fn validate(&self) -> Result<(), RaffleError> {
        if self.ticket_price == 0 {
            return Err(RaffleError::InvalidTicketPrice);
        }
        if self.close_time <= self.open_time {
            return Err(RaffleError::InvalidSaleWindow);
        }
        Ok(())
    }
}

/// Lifecycle of a raffle. Never stored: see [`Raffle::state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Before `open_time`
    Pending,
    /// `open_time <= now < close_time`, tickets on sale
    Open,
    /// `now >= close_time`, waiting for the draw
    Closed,
    /// Winner recorded, terminal
    Drawn,
}

/// Outcome of the draw, written exactly once
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawResult {
    pub winner: Pubkey,
    /// Raw entropy the index was reduced from
    pub entropy: u64,
    /// Roster position of the winning ticket
    pub index: u64,
    pub drawn_at: UnixTimestamp,
}

/// Raffle account data.
///
/// The roster is stored inline as a growable vector, one entry per ticket in
/// purchase order. The account is reallocated on every purchase, so the total
/// roster is bounded by the 10 MiB account size limit (roughly 327k tickets).
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    pub is_initialized: bool,
    pub config: RaffleConfig,
    /// PDA that owns the escrow and is the delegate buyers approve
    pub custody: Pubkey,
    pub custody_bump: u8,
    /// Token account holding collected ticket payments
    pub escrow: Pubkey,
    pub result: Option<DrawResult>,
    pub roster: Vec<Pubkey>,
}

impl IsInitialized for Raffle {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Raffle {
    /// Create an empty raffle after validating its configuration
    pub fn new(
        config: RaffleConfig,
        custody: Pubkey,
        custody_bump: u8,
        escrow: Pubkey,
    ) -> Result<Self, RaffleError> {
        config.validate()?;
        Ok(Self {
            is_initialized: true,
            config,
            custody,
            custody_bump,
            escrow,
            result: None,
            roster: Vec::new(),
        })
    }

    /// Derive the lifecycle state at `now`
    pub fn state(&self, now: UnixTimestamp) -> RaffleState {
        if self.result.is_some() {
            RaffleState::Drawn
        } else if now < self.config.open_time {
            RaffleState::Pending
        } else if now < self.config.close_time {
            RaffleState::Open
        } else {
            RaffleState::Closed
        }
    }

    /// Every ticket sold so far, in purchase order
    pub fn participants(&self) -> &[Pubkey] {
        &self.roster
    }

    /// Number of tickets `owner` holds
    #[cfg(test)]
    pub fn tickets_of(&self, owner: &Pubkey) -> usize {
        self.roster.iter().filter(|entry| *entry == owner).count()
    }

    /// Decode raffle data from an account buffer. Trailing bytes are ignored.
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let mut buf = data;
        let raffle =
            Self::deserialize(&mut buf).map_err(|_| ProgramError::InvalidAccountData)?;
        if !raffle.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    /// Serialized size of the account as it stands
    pub fn packed_len(&self) -> usize {
        solana_program::borsh::get_instance_packed_len(self).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RaffleConfig {
        RaffleConfig {
            token_mint: Pubkey::new_unique(),
            ticket_price: 10,
            open_time: 1_000,
            close_time: 2_000,
            operator: Pubkey::new_unique(),
            randomness: RandomnessSource::SlotHashes,
        }
    }

    #[test]
    fn rejects_zero_price_and_inverted_window() {
        let mut bad_price = config();
        bad_price.ticket_price = 0;
        assert_eq!(bad_price.validate(), Err(RaffleError::InvalidTicketPrice));

        let mut same_time = config();
        same_time.close_time = same_time.open_time;
        assert_eq!(same_time.validate(), Err(RaffleError::InvalidSaleWindow));
    }

    #[test]
    fn state_follows_clock_boundaries() {
        let raffle = Raffle::new(config(), Pubkey::new_unique(), 255, Pubkey::new_unique())
            .unwrap();
        assert_eq!(raffle.state(999), RaffleState::Pending);
        assert_eq!(raffle.state(1_000), RaffleState::Open);
        assert_eq!(raffle.state(1_999), RaffleState::Open);
        assert_eq!(raffle.state(2_000), RaffleState::Closed);
    }

    #[test]
    fn drawn_flag_overrides_clock() {
        let mut raffle = Raffle::new(config(), Pubkey::new_unique(), 255, Pubkey::new_unique())
            .unwrap();
        raffle.result = Some(DrawResult {
            winner: Pubkey::new_unique(),
            entropy: 7,
            index: 0,
            drawn_at: 2_500,
        });
        assert_eq!(raffle.state(1_500), RaffleState::Drawn);
        assert_eq!(raffle.state(3_000), RaffleState::Drawn);
    }

    #[test]
    fn unpack_ignores_trailing_space() {
        let mut raffle = Raffle::new(config(), Pubkey::new_unique(), 254, Pubkey::new_unique())
            .unwrap();
        let buyer = Pubkey::new_unique();
        raffle.roster.extend([buyer, buyer]);

        let mut data = raffle.try_to_vec().unwrap();
        assert_eq!(data.len(), raffle.packed_len());
        data.extend_from_slice(&[0u8; 64]);

        let decoded = Raffle::unpack(&data).unwrap();
        assert_eq!(decoded, raffle);
        assert_eq!(decoded.tickets_of(&buyer), 2);
    }

    #[test]
    fn unpack_rejects_zeroed_account() {
        let data = vec![0u8; 256];
        assert_eq!(Raffle::unpack(&data), Err(ProgramError::UninitializedAccount));
    }
}
