// SPL token implementation of the raffle's token ledger
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
};
use spl_token::state::Account as TokenAccount;

use crate::{engine::TokenLedger, error::RaffleError};

/// Ledger view over one buyer token account and the raffle escrow.
///
/// Allowance maps onto SPL delegation: buyers `approve` the raffle custody PDA
/// as delegate of their token account, and the purchase spends that
/// delegation with a transfer signed by the PDA.
pub struct SplTokenLedger<'a, 'info> {
    pub token_program: &'a AccountInfo<'info>,
    /// Buyer's token account
    pub source: &'a AccountInfo<'info>,
    pub escrow: &'a AccountInfo<'info>,
    pub custody: &'a AccountInfo<'info>,
    pub custody_seeds: &'a [&'a [u8]],
    /// Mint the raffle is paid in
    pub token_mint: Pubkey,
}

impl<'a, 'info> SplTokenLedger<'a, 'info> {
    /// Re-read the source account, it may have changed since the last call
    fn source_account(&self, owner: &Pubkey) -> Result<TokenAccount, RaffleError> {
        let account = read_token_account(self.source)?;
        if account.owner != *owner {
            msg!("Token account {} is not owned by {}", self.source.key, owner);
            return Err(RaffleError::TokenAccountMismatch);
        }
        if account.mint != self.token_mint {
            msg!("Token account mint {} is not the raffle mint", account.mint);
            return Err(RaffleError::TokenAccountMismatch);
        }
        Ok(account)
    }
}

impl<'a, 'info> TokenLedger for SplTokenLedger<'a, 'info> {
    fn balance_of(&self, owner: &Pubkey) -> Result<u64, RaffleError> {
        Ok(self.source_account(owner)?.amount)
    }

    fn allowance(&self, owner: &Pubkey, spender: &Pubkey) -> Result<u64, RaffleError> {
        let account = self.source_account(owner)?;
        Ok(match account.delegate {
            COption::Some(delegate) if delegate == *spender => account.delegated_amount,
            _ => 0,
        })
    }

    fn transfer_from(
        &mut self,
        owner: &Pubkey,
        spender: &Pubkey,
        amount: u64,
    ) -> Result<(), RaffleError> {
        let source = self.source_account(owner)?;
        if spender != self.custody.key {
            msg!("Spender {} is not the raffle custody", spender);
            return Err(RaffleError::TokenLedgerFailure);
        }
        // A failing token program CPI aborts the whole transaction, so
        // anything it would reject has to be caught here
        check_not_frozen(self.source, &source)?;
        check_not_frozen(self.escrow, &read_token_account(self.escrow)?)?;

        transfer_signed(
            self.token_program,
            self.source,
            self.escrow,
            self.custody,
            self.custody_seeds,
            amount,
        )
        .map_err(|e| {
            msg!("Token transfer of {} failed: {}", amount, e);
            RaffleError::TokenLedgerFailure
        })
    }
}

fn read_token_account(info: &AccountInfo) -> Result<TokenAccount, RaffleError> {
    if info.owner != &spl_token::id() {
        msg!("Account {} is not owned by the token program", info.key);
        return Err(RaffleError::TokenAccountMismatch);
    }
    TokenAccount::unpack(&info.data.borrow()).map_err(|_| RaffleError::TokenAccountMismatch)
}

fn check_not_frozen(info: &AccountInfo, account: &TokenAccount) -> Result<(), RaffleError> {
    if account.is_frozen() {
        msg!("Token account {} is frozen", info.key);
        return Err(RaffleError::TokenLedgerFailure);
    }
    Ok(())
}

/// Move `amount` out of the escrow into `destination`, signed by the custody PDA
pub fn release_escrow<'info>(
    token_program: &AccountInfo<'info>,
    escrow: &AccountInfo<'info>,
    destination: &AccountInfo<'info>,
    custody: &AccountInfo<'info>,
    custody_seeds: &[&[u8]],
    amount: u64,
) -> ProgramResult {
    check_not_frozen(escrow, &read_token_account(escrow)?)?;
    check_not_frozen(destination, &read_token_account(destination)?)?;
    transfer_signed(token_program, escrow, destination, custody, custody_seeds, amount)
}

fn transfer_signed<'info>(
    token_program: &AccountInfo<'info>,
    from: &AccountInfo<'info>,
    to: &AccountInfo<'info>,
    authority: &AccountInfo<'info>,
    authority_seeds: &[&[u8]],
    amount: u64,
) -> ProgramResult {
    let ix = spl_token::instruction::transfer(
        token_program.key,
        from.key,
        to.key,
        authority.key,
        &[],
        amount,
    )?;
    invoke_signed(
        &ix,
        &[
            from.clone(),
            to.clone(),
            authority.clone(),
            token_program.clone(),
        ],
        &[authority_seeds],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token::state::AccountState;

    fn token_account_data(owner: Pubkey, mint: Pubkey, state: AccountState) -> Vec<u8> {
        let mut data = vec![0u8; TokenAccount::LEN];
        let account = TokenAccount {
            mint,
            owner,
            amount: 1_000,
            state,
            ..TokenAccount::default()
        };
        TokenAccount::pack(account, &mut data).unwrap();
        data
    }

    /// Run `f` against a ledger whose buyer owns a source account of `source_mint`
    fn with_ledger<R>(
        source_state: AccountState,
        escrow_state: AccountState,
        source_mint: Option<Pubkey>,
        f: impl FnOnce(&mut SplTokenLedger<'_, '_>, &Pubkey, &Pubkey) -> R,
    ) -> R {
        let buyer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let custody_key = Pubkey::new_unique();
        let source_key = Pubkey::new_unique();
        let escrow_key = Pubkey::new_unique();
        let program_key = spl_token::id();
        let token_owner = spl_token::id();
        let system_owner = Pubkey::default();

        let mut source_lamports = 0;
        let mut escrow_lamports = 0;
        let mut custody_lamports = 0;
        let mut program_lamports = 0;
        let mut source_data =
            token_account_data(buyer, source_mint.unwrap_or(mint), source_state);
        let mut escrow_data = token_account_data(custody_key, mint, escrow_state);
        let mut custody_data = Vec::new();
        let mut program_data = Vec::new();

        let source = AccountInfo::new(
            &source_key,
            false,
            true,
            &mut source_lamports,
            &mut source_data,
            &token_owner,
            false,
            0,
        );
        let escrow = AccountInfo::new(
            &escrow_key,
            false,
            true,
            &mut escrow_lamports,
            &mut escrow_data,
            &token_owner,
            false,
            0,
        );
        let custody = AccountInfo::new(
            &custody_key,
            false,
            false,
            &mut custody_lamports,
            &mut custody_data,
            &system_owner,
            false,
            0,
        );
        let token_program = AccountInfo::new(
            &program_key,
            false,
            false,
            &mut program_lamports,
            &mut program_data,
            &system_owner,
            true,
            0,
        );

        let mut ledger = SplTokenLedger {
            token_program: &token_program,
            source: &source,
            escrow: &escrow,
            custody: &custody,
            custody_seeds: &[],
            token_mint: mint,
        };
        f(&mut ledger, &buyer, &custody_key)
    }

    #[test]
    fn frozen_source_fails_before_transfer() {
        let result = with_ledger(
            AccountState::Frozen,
            AccountState::Initialized,
            None,
            |ledger, buyer, custody| ledger.transfer_from(buyer, custody, 10),
        );
        assert_eq!(result, Err(RaffleError::TokenLedgerFailure));
    }

    #[test]
    fn frozen_escrow_fails_before_transfer() {
        let result = with_ledger(
            AccountState::Initialized,
            AccountState::Frozen,
            None,
            |ledger, buyer, custody| ledger.transfer_from(buyer, custody, 10),
        );
        assert_eq!(result, Err(RaffleError::TokenLedgerFailure));
    }

    #[test]
    fn source_of_another_owner_or_mint_is_rejected() {
        let result = with_ledger(
            AccountState::Initialized,
            AccountState::Initialized,
            None,
            |ledger, _, _| ledger.balance_of(&Pubkey::new_unique()),
        );
        assert_eq!(result, Err(RaffleError::TokenAccountMismatch));

        let result = with_ledger(
            AccountState::Initialized,
            AccountState::Initialized,
            Some(Pubkey::new_unique()),
            |ledger, buyer, _| ledger.balance_of(buyer),
        );
        assert_eq!(result, Err(RaffleError::TokenAccountMismatch));
    }

    #[test]
    fn allowance_only_counts_delegation_to_spender() {
        let (approved, other) = with_ledger(
            AccountState::Initialized,
            AccountState::Initialized,
            None,
            |ledger, buyer, custody| {
                let mut data = ledger.source.data.borrow_mut();
                let mut account = TokenAccount::unpack(&data).unwrap();
                account.delegate = COption::Some(*custody);
                account.delegated_amount = 40;
                TokenAccount::pack(account, &mut data).unwrap();
                drop(data);
                (
                    ledger.allowance(buyer, custody).unwrap(),
                    ledger.allowance(buyer, &Pubkey::new_unique()).unwrap(),
                )
            },
        );
        assert_eq!(approved, 40);
        assert_eq!(other, 0);
    }
}
