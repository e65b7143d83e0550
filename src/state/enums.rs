use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::state::order::order_id_is_bid;

#[derive(BorshDeserialize, BorshSerialize, Copy, Clone, PartialEq, Eq, Debug)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match *self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Recovers the side from a packed order id. A clear leading bit
    /// indicates a bid, a set leading bit an ask.
    pub fn from_order_id(order_id: u64) -> Self {
        if order_id_is_bid(order_id) {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    #[inline(always)]
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }
}

/// What to do with the portion of a limit order that does not cross.
///
/// The `u8` representation is the packed wire code used at the API boundary.
#[derive(
    BorshDeserialize,
    BorshSerialize,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum OrderRestriction {
    /// Match what crosses, rest the remainder.
    NoRestriction = 0,
    /// Match what crosses, drop the remainder.
    ImmediateOrCancel = 1,
    /// All-or-nothing: if the full quantity cannot fill at the limit,
    /// nothing happens and the order is reported not placed.
    FillOrKill = 2,
    /// Must rest as a maker; abort if the order would cross immediately.
    PostOrAbort = 3,
}

/// Resolution when an incoming order crosses a resting order owned by the
/// same account.
#[derive(
    BorshDeserialize,
    BorshSerialize,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum SelfMatchBehavior {
    /// Cancel the resting maker (refunding its locked funds) and keep
    /// matching. This is the default.
    CancelOldest = 0,
    /// Stop matching and drop the taker's remainder; nothing rests.
    CancelTaker = 1,
    /// Abort the whole operation with no state change.
    Abort = 2,
}

impl Default for SelfMatchBehavior {
    fn default() -> Self {
        SelfMatchBehavior::CancelOldest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn packed_codes_round_trip() {
        for restriction in [
            OrderRestriction::NoRestriction,
            OrderRestriction::ImmediateOrCancel,
            OrderRestriction::FillOrKill,
            OrderRestriction::PostOrAbort,
        ] {
            let code: u8 = restriction.into();
            assert_eq!(OrderRestriction::try_from(code).unwrap(), restriction);
        }
        assert!(OrderRestriction::try_from(4u8).is_err());
        assert!(SelfMatchBehavior::try_from(3u8).is_err());
    }

    #[test]
    fn side_from_order_id_uses_the_leading_bit() {
        assert_eq!(Side::from_order_id(0), Side::Bid);
        assert_eq!(Side::from_order_id((1 << 63) - 1), Side::Bid);
        assert_eq!(Side::from_order_id(1 << 63), Side::Ask);
        assert_eq!(Side::from_order_id(u64::MAX), Side::Ask);
    }
}
