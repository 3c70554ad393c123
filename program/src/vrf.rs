// Entropy sources for the raffle draw
use arrayref::array_ref;
use solana_program::{
    account_info::AccountInfo, clock::UnixTimestamp, msg, pubkey::Pubkey, sysvar,
};
use std::mem::size_of;
use switchboard_v2::{VrfAccountData, SWITCHBOARD_PROGRAM_ID};

use crate::{engine::EntropySource, error::RaffleError};

/// Anchor discriminator in front of the VRF account data
const VRF_DISCRIMINATOR_LEN: usize = 8;

/// Resolved result of a Switchboard VRF account
pub struct SwitchboardVrfEntropy<'a, 'info> {
    pub vrf_account: &'a AccountInfo<'info>,
    /// VRF account recorded in the raffle configuration
    pub expected: Pubkey,
}

impl<'a, 'info> EntropySource for SwitchboardVrfEntropy<'a, 'info> {
    fn entropy(&self) -> Result<u64, RaffleError> {
        if *self.vrf_account.key != self.expected {
            msg!(
                "VRF account {} does not match configured {}",
                self.vrf_account.key,
                self.expected
            );
            return Err(RaffleError::InvalidRandomnessAccount);
        }
        if self.vrf_account.owner != &SWITCHBOARD_PROGRAM_ID {
            msg!("VRF account not owned by Switchboard program");
            return Err(RaffleError::InvalidRandomnessAccount);
        }
        if self.vrf_account.data_len() < VRF_DISCRIMINATOR_LEN + size_of::<VrfAccountData>() {
            msg!("VRF account is too small");
            return Err(RaffleError::InvalidRandomnessAccount);
        }

        let vrf = VrfAccountData::new(self.vrf_account).map_err(|_| {
            msg!("VRF account could not be parsed");
            RaffleError::InvalidRandomnessAccount
        })?;
        let result = vrf.get_result().map_err(|_| {
            msg!("VRF account does not have a result yet");
            RaffleError::RandomnessNotResolved
        })?;

        vrf_result_entropy(&result)
    }
}

/// First 8 bytes of a VRF result, little-endian
pub fn vrf_result_entropy(result: &[u8; 32]) -> Result<u64, RaffleError> {
    if result.iter().all(|b| *b == 0) {
        return Err(RaffleError::RandomnessNotResolved);
    }
    Ok(u64::from_le_bytes(*array_ref![result, 0, 8]))
}

/// Newest entry of the SlotHashes sysvar mixed with the draw timestamp.
///
/// Whoever produces the block the draw lands in can influence this value.
/// Raffles with meaningful prizes should be configured with a VRF instead.
pub struct SlotHashesEntropy<'a, 'info> {
    pub slot_hashes: &'a AccountInfo<'info>,
    pub timestamp: UnixTimestamp,
}

impl<'a, 'info> EntropySource for SlotHashesEntropy<'a, 'info> {
    fn entropy(&self) -> Result<u64, RaffleError> {
        if !sysvar::slot_hashes::check_id(self.slot_hashes.key) {
            msg!("Expected the SlotHashes sysvar, got {}", self.slot_hashes.key);
            return Err(RaffleError::InvalidRandomnessAccount);
        }
        let data = self.slot_hashes.data.borrow();
        slot_hash_entropy(&data, self.timestamp)
    }
}

/// Layout: u64 entry count, then `(slot: u64, hash: [u8; 32])` newest first
const SLOT_HASH_ENTRY_OFFSET: usize = 8;
const SLOT_HASH_HASH_OFFSET: usize = SLOT_HASH_ENTRY_OFFSET + 8;

pub fn slot_hash_entropy(data: &[u8], timestamp: UnixTimestamp) -> Result<u64, RaffleError> {
    if data.len() < SLOT_HASH_HASH_OFFSET + 32 {
        return Err(RaffleError::RandomnessNotResolved);
    }
    let entries = u64::from_le_bytes(*array_ref![data, 0, 8]);
    if entries == 0 {
        return Err(RaffleError::RandomnessNotResolved);
    }

    let hash_low = u64::from_le_bytes(*array_ref![data, SLOT_HASH_HASH_OFFSET, 8]);
    let hash_high = u64::from_le_bytes(*array_ref![data, SLOT_HASH_HASH_OFFSET + 8, 8]);

    Ok(mix(mix(hash_low, timestamp as u64), hash_high))
}

/// splitmix64 finaliser over the sum of both inputs
fn mix(a: u64, b: u64) -> u64 {
    let mut z = a.wrapping_add(b);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_hashes_data(hash: [u8; 32]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&77u64.to_le_bytes());
        data.extend_from_slice(&hash);
        data
    }

    #[test]
    fn slot_hash_entropy_depends_on_hash_and_time() {
        let data = slot_hashes_data([7u8; 32]);

        let first = slot_hash_entropy(&data, 1_000).unwrap();
        assert_eq!(first, slot_hash_entropy(&data, 1_000).unwrap());
        assert_ne!(first, slot_hash_entropy(&data, 1_001).unwrap());
        assert_ne!(
            first,
            slot_hash_entropy(&slot_hashes_data([8u8; 32]), 1_000).unwrap()
        );
    }

    #[test]
    fn empty_slot_hashes_are_unresolved() {
        let mut data = slot_hashes_data([7u8; 32]);
        data[..8].copy_from_slice(&0u64.to_le_bytes());
        assert_eq!(
            slot_hash_entropy(&data, 1),
            Err(RaffleError::RandomnessNotResolved)
        );
        assert_eq!(
            slot_hash_entropy(&data[..20], 1),
            Err(RaffleError::RandomnessNotResolved)
        );
    }

    #[test]
    fn slot_hashes_account_key_is_checked() {
        let key = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mut lamports = 0;
        let mut data = slot_hashes_data([1u8; 32]);
        let info = AccountInfo::new(
            &key, false, false, &mut lamports, &mut data, &owner, false, 0,
        );

        let source = SlotHashesEntropy {
            slot_hashes: &info,
            timestamp: 5,
        };
        assert_eq!(source.entropy(), Err(RaffleError::InvalidRandomnessAccount));
    }

    /// Account data that passes the VRF discriminator check, result bytes set
    fn forged_vrf_data() -> Vec<u8> {
        let mut data = vec![0xABu8; VRF_DISCRIMINATOR_LEN + size_of::<VrfAccountData>()];
        data[..VRF_DISCRIMINATOR_LEN].copy_from_slice(&[101, 35, 62, 239, 103, 151, 6, 18]);
        data
    }

    fn vrf_entropy_of(
        key: Pubkey,
        owner: Pubkey,
        mut data: Vec<u8>,
        expected: Pubkey,
    ) -> Result<u64, RaffleError> {
        let mut lamports = 0;
        let info = AccountInfo::new(
            &key, false, false, &mut lamports, &mut data, &owner, false, 0,
        );
        SwitchboardVrfEntropy {
            vrf_account: &info,
            expected,
        }
        .entropy()
    }

    #[test]
    fn vrf_account_not_owned_by_switchboard_is_rejected() {
        let key = Pubkey::new_unique();
        assert_eq!(
            vrf_entropy_of(key, Pubkey::new_unique(), forged_vrf_data(), key),
            Err(RaffleError::InvalidRandomnessAccount)
        );
    }

    #[test]
    fn vrf_account_must_match_configuration() {
        assert_eq!(
            vrf_entropy_of(
                Pubkey::new_unique(),
                SWITCHBOARD_PROGRAM_ID,
                forged_vrf_data(),
                Pubkey::new_unique(),
            ),
            Err(RaffleError::InvalidRandomnessAccount)
        );
    }

    #[test]
    fn short_vrf_account_is_rejected() {
        let key = Pubkey::new_unique();
        let mut data = forged_vrf_data();
        data.truncate(64);
        assert_eq!(
            vrf_entropy_of(key, SWITCHBOARD_PROGRAM_ID, data, key),
            Err(RaffleError::InvalidRandomnessAccount)
        );
    }

    #[test]
    fn vrf_entropy_reads_low_bytes() {
        let mut result = [0u8; 32];
        result[0] = 0x01;
        result[1] = 0x02;
        result[31] = 0xff;
        assert_eq!(vrf_result_entropy(&result), Ok(0x0201));
        assert_eq!(
            vrf_result_entropy(&[0u8; 32]),
            Err(RaffleError::RandomnessNotResolved)
        );
    }
}
