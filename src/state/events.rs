use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::AccountId;

/// Market events delivered through the caller-supplied recorder closure.
///
/// Events are informational: the engine's correctness never depends on
/// their delivery, and a host that does not care passes a no-op closure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum MarketEvent {
    Place {
        pool_id: u64,
        order_id: u64,
        client_order_id: u64,
        owner: AccountId,
        price: u64,
        base_quantity: u64,
        expire_timestamp_ms: u64,
        now_ms: u64,
    },
    /// One maker fill inside a matching pass.
    Fill {
        pool_id: u64,
        /// The resting order's id.
        order_id: u64,
        maker: AccountId,
        taker: AccountId,
        price: u64,
        base_quantity: u64,
        quote_quantity: u64,
        maker_rebate: u64,
        /// Base quantity the maker still has resting after this fill.
        base_remaining: u64,
        now_ms: u64,
    },
    /// Aggregate totals for one matching pass, emitted after the last fill.
    FillSummary {
        pool_id: u64,
        client_order_id: u64,
        taker: AccountId,
        total_base_filled: u64,
        total_quote_filled: u64,
        taker_fee: u64,
        now_ms: u64,
    },
    Cancel {
        pool_id: u64,
        order_id: u64,
        owner: AccountId,
        price: u64,
        base_quantity_removed: u64,
    },
    /// A resting order was removed because its expiry passed; emitted from
    /// the matching loop, never from a background task.
    Expire {
        pool_id: u64,
        order_id: u64,
        owner: AccountId,
        price: u64,
        base_quantity_removed: u64,
        now_ms: u64,
    },
    Deposit {
        pool_id: u64,
        owner: AccountId,
        /// True for the base asset, false for the quote asset.
        is_base: bool,
        amount: u64,
    },
    Withdraw {
        pool_id: u64,
        owner: AccountId,
        is_base: bool,
        amount: u64,
    },
    FeesCollected {
        pool_id: u64,
        quote_amount: u64,
    },
}
