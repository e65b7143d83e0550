//! Host-facing identity and asset primitives.
//!
//! The engine never talks to a vault or a signer directly. The host supplies
//! an opaque, non-forgeable [`AccountCap`] per trading account and moves
//! funds in and out as [`Coin`] values; the engine only does ledger
//! accounting against those primitives.

use crate::error::DexError;
use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for asset types. A pool is parameterized by two markers,
/// one for the base asset and one for the quote asset.
pub trait Asset: 'static {}

/// Opaque 256-bit account identity derived from an [`AccountCap`].
///
/// The engine treats this purely as a map key; it carries no meaning beyond
/// equality and ordering.
#[repr(C)]
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct AccountId(pub [u8; 32]);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..")
    }
}

/// Capability object identifying a trading account.
///
/// Deliberately neither `Clone` nor `Copy`: possession of the value is the
/// authorization. The host's capability-issuance machinery is responsible
/// for handing out caps with distinct ids.
#[derive(Debug)]
pub struct AccountCap {
    id: AccountId,
}

impl AccountCap {
    /// Issues a capability for the given 256-bit identity. This is the
    /// host-side primitive; the engine never calls it.
    pub fn new(id: [u8; 32]) -> Self {
        AccountCap { id: AccountId(id) }
    }

    #[inline(always)]
    pub fn account_id(&self) -> AccountId {
        self.id
    }
}

/// A typed amount of a single asset, denominated in that asset's smallest
/// unit.
///
/// `Coin` is the engine's view of the host's transfer primitive: deposits
/// and taker payments consume coins, withdrawals and refunds produce them.
/// Backing the amounts with real custody is the host's responsibility.
pub struct Coin<T: Asset> {
    amount: u64,
    _asset: PhantomData<T>,
}

// Manual impls: asset markers are not required to implement any traits.
impl<T: Asset> fmt::Debug for Coin<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Coin").field(&self.amount).finish()
    }
}

impl<T: Asset> PartialEq for Coin<T> {
    fn eq(&self, other: &Self) -> bool {
        self.amount == other.amount
    }
}

impl<T: Asset> Eq for Coin<T> {}

impl<T: Asset> Coin<T> {
    pub fn new(amount: u64) -> Self {
        Coin {
            amount,
            _asset: PhantomData,
        }
    }

    pub fn zero() -> Self {
        Self::new(0)
    }

    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.amount
    }

    /// Splits `amount` off into a new coin, leaving the remainder behind.
    pub fn split(&mut self, amount: u64) -> Result<Coin<T>, DexError> {
        if amount > self.amount {
            return Err(DexError::InsufficientFunds);
        }
        self.amount -= amount;
        Ok(Coin::new(amount))
    }

    /// Absorbs another coin of the same asset.
    pub fn join(&mut self, other: Coin<T>) -> Result<(), DexError> {
        self.amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(DexError::Arithmetic)?;
        Ok(())
    }

    /// Consumes the coin, yielding its amount.
    #[inline(always)]
    pub fn into_value(self) -> u64 {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;
    impl Asset for Base {}

    #[test]
    fn split_and_join() {
        let mut coin = Coin::<Base>::new(100);
        let part = coin.split(40).unwrap();
        assert_eq!(part.value(), 40);
        assert_eq!(coin.value(), 60);
        coin.join(part).unwrap();
        assert_eq!(coin.value(), 100);
        assert_eq!(coin.split(101), Err(DexError::InsufficientFunds));
    }
}
