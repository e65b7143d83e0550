//! Per-account ledger of available and locked funds for both pool assets.
//!
//! Funds reserved for resting orders sit in the locked column and move back
//! to available on cancellation or expiry, or are debited outright when a
//! fill settles. Every transition is checked; an underflow on an
//! available-balance debit is a caller error (`InsufficientFunds`), an
//! underflow on a locked-balance debit can only be an engine bug and
//! surfaces as `InvariantViolation`.

use std::collections::HashMap;

use crate::account::AccountId;
use crate::error::DexError;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Account {
    pub available_base: u64,
    pub locked_base: u64,
    pub available_quote: u64,
    pub locked_quote: u64,
}

impl Account {
    #[inline(always)]
    fn credit(balance: &mut u64, amount: u64) -> Result<(), DexError> {
        *balance = balance.checked_add(amount).ok_or(DexError::Arithmetic)?;
        Ok(())
    }

    #[inline(always)]
    fn debit(balance: &mut u64, amount: u64, err: DexError) -> Result<(), DexError> {
        *balance = balance.checked_sub(amount).ok_or(err)?;
        Ok(())
    }
}

/// Sparse map of accounts; an account springs into existence (all zeroes)
/// on first touch and persists for the life of the pool.
#[derive(Debug, Default)]
pub struct Custodian {
    accounts: HashMap<AccountId, Account>,
}

impl Custodian {
    pub fn new() -> Self {
        Custodian {
            accounts: HashMap::new(),
        }
    }

    #[inline(always)]
    fn account_mut(&mut self, account_id: AccountId) -> &mut Account {
        self.accounts.entry(account_id).or_default()
    }

    /// Read-only view; `None` means the account has never been touched and
    /// all four balances are zero.
    pub fn account(&self, account_id: AccountId) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    /// (available base, locked base, available quote, locked quote).
    pub fn balances(&self, account_id: AccountId) -> (u64, u64, u64, u64) {
        match self.accounts.get(&account_id) {
            Some(account) => (
                account.available_base,
                account.locked_base,
                account.available_quote,
                account.locked_quote,
            ),
            None => (0, 0, 0, 0),
        }
    }

    pub fn deposit_base(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::credit(&mut account.available_base, amount)
    }

    pub fn deposit_quote(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::credit(&mut account.available_quote, amount)
    }

    pub fn withdraw_base(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.available_base, amount, DexError::InsufficientFunds)
    }

    pub fn withdraw_quote(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.available_quote, amount, DexError::InsufficientFunds)
    }

    /// Moves available base into the locked column.
    pub fn lock_base(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.available_base, amount, DexError::InsufficientFunds)?;
        Account::credit(&mut account.locked_base, amount)
    }

    pub fn lock_quote(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.available_quote, amount, DexError::InsufficientFunds)?;
        Account::credit(&mut account.locked_quote, amount)
    }

    /// Releases locked base back to available (cancellation, expiry).
    pub fn unlock_base(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.locked_base, amount, DexError::InvariantViolation)?;
        Account::credit(&mut account.available_base, amount)
    }

    pub fn unlock_quote(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.locked_quote, amount, DexError::InvariantViolation)?;
        Account::credit(&mut account.available_quote, amount)
    }

    /// Settles a fill: the locked funds leave the account entirely (the
    /// counterparty or the fee pot receives them).
    pub fn debit_locked_base(&mut self, account_id: AccountId, amount: u64) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.locked_base, amount, DexError::InvariantViolation)
    }

    pub fn debit_locked_quote(
        &mut self,
        account_id: AccountId,
        amount: u64,
    ) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.locked_quote, amount, DexError::InvariantViolation)
    }

    pub fn credit_available_base(
        &mut self,
        account_id: AccountId,
        amount: u64,
    ) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::credit(&mut account.available_base, amount)
    }

    pub fn credit_available_quote(
        &mut self,
        account_id: AccountId,
        amount: u64,
    ) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::credit(&mut account.available_quote, amount)
    }

    /// Debits available quote without locking, for taker-side settlement.
    pub fn debit_available_quote(
        &mut self,
        account_id: AccountId,
        amount: u64,
    ) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.available_quote, amount, DexError::InsufficientFunds)
    }

    pub fn debit_available_base(
        &mut self,
        account_id: AccountId,
        amount: u64,
    ) -> Result<(), DexError> {
        let account = self.account_mut(account_id);
        Account::debit(&mut account.available_base, amount, DexError::InsufficientFunds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_id(tag: u8) -> AccountId {
        AccountId([tag; 32])
    }

    #[test]
    fn deposit_withdraw() {
        let mut custodian = Custodian::new();
        let alice = account_id(1);
        custodian.deposit_quote(alice, 1000).unwrap();
        assert_eq!(custodian.balances(alice), (0, 0, 1000, 0));
        custodian.withdraw_quote(alice, 400).unwrap();
        assert_eq!(custodian.balances(alice), (0, 0, 600, 0));
        assert_eq!(
            custodian.withdraw_quote(alice, 601),
            Err(DexError::InsufficientFunds)
        );
        // The failed withdrawal must not have touched the balance.
        assert_eq!(custodian.balances(alice), (0, 0, 600, 0));
    }

    #[test]
    fn lock_then_unlock_round_trips() {
        let mut custodian = Custodian::new();
        let alice = account_id(1);
        custodian.deposit_base(alice, 500).unwrap();
        let before = custodian.balances(alice);

        custodian.lock_base(alice, 200).unwrap();
        assert_eq!(custodian.balances(alice), (300, 200, 0, 0));
        custodian.unlock_base(alice, 200).unwrap();
        assert_eq!(custodian.balances(alice), before);
    }

    #[test]
    fn locked_funds_are_not_withdrawable() {
        let mut custodian = Custodian::new();
        let alice = account_id(1);
        custodian.deposit_quote(alice, 100).unwrap();
        custodian.lock_quote(alice, 80).unwrap();
        assert_eq!(
            custodian.withdraw_quote(alice, 50),
            Err(DexError::InsufficientFunds)
        );
        custodian.withdraw_quote(alice, 20).unwrap();
    }

    #[test]
    fn settlement_debits_locked_without_refund() {
        let mut custodian = Custodian::new();
        let maker = account_id(1);
        custodian.deposit_base(maker, 100).unwrap();
        custodian.lock_base(maker, 100).unwrap();
        custodian.debit_locked_base(maker, 60).unwrap();
        assert_eq!(custodian.balances(maker), (0, 40, 0, 0));
        assert_eq!(
            custodian.debit_locked_base(maker, 41),
            Err(DexError::InvariantViolation)
        );
    }

    #[test]
    fn untouched_account_reads_as_zero() {
        let custodian = Custodian::new();
        assert_eq!(custodian.balances(account_id(9)), (0, 0, 0, 0));
        assert!(custodian.account(account_id(9)).is_none());
    }
}
