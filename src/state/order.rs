use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::AccountId;
use crate::state::enums::Side;

/// Expiry value meaning "never expires".
pub const NO_EXPIRATION: u64 = u64::MAX;

/// Packed order ids carry the side in the leading bit and a per-side
/// monotone sequence number in the low 63 bits. Bid ids occupy
/// `0 ..= MAX_BID_ORDER_ID`; ask ids start at `MIN_ASK_ORDER_ID`.
pub const MIN_ASK_ORDER_ID: u64 = 1 << 63;
pub const MAX_BID_ORDER_ID: u64 = (1 << 63) - 1;

#[inline(always)]
pub fn order_id_is_bid(order_id: u64) -> bool {
    order_id < MIN_ASK_ORDER_ID
}

/// Packs a per-side sequence number into the public order-id form.
#[inline(always)]
pub fn pack_order_id(side: Side, sequence_number: u64) -> u64 {
    debug_assert!(sequence_number <= MAX_BID_ORDER_ID);
    match side {
        Side::Bid => sequence_number,
        Side::Ask => MIN_ASK_ORDER_ID | sequence_number,
    }
}

/// A resting or in-flight order. `quantity` is the remaining unfilled
/// amount in base units; matching only ever decreases it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Order {
    pub order_id: u64,
    /// Caller-supplied correlation id, opaque to the engine.
    pub client_order_id: u64,
    pub price: u64,
    pub quantity: u64,
    pub is_bid: bool,
    pub owner: AccountId,
    pub expire_timestamp_ms: u64,
    /// Packed [`SelfMatchBehavior`](crate::state::enums::SelfMatchBehavior)
    /// code recorded at placement.
    pub self_matching_prevention: u8,
}

impl Order {
    #[inline(always)]
    pub fn side(&self) -> Side {
        if self.is_bid {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    #[inline(always)]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expire_timestamp_ms <= now_ms
    }
}
