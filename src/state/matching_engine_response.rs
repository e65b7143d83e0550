use borsh::{BorshDeserialize, BorshSerialize};

/// Outcome of a limit-order placement.
#[derive(Debug, Eq, PartialEq, Default, Copy, Clone, BorshDeserialize, BorshSerialize)]
pub struct PlacedOrder {
    /// Base quantity filled immediately against the book.
    pub base_filled: u64,
    /// Quote notional exchanged for `base_filled`, before fees.
    pub quote_filled: u64,
    /// Whether a residual rested on the book.
    pub is_placed: bool,
    /// Id of the resting residual; `0` when nothing rested.
    pub order_id: u64,
}

impl PlacedOrder {
    pub(crate) fn not_placed(base_filled: u64, quote_filled: u64) -> Self {
        PlacedOrder {
            base_filled,
            quote_filled,
            is_placed: false,
            order_id: 0,
        }
    }

    pub(crate) fn placed(base_filled: u64, quote_filled: u64, order_id: u64) -> Self {
        PlacedOrder {
            base_filled,
            quote_filled,
            is_placed: true,
            order_id,
        }
    }
}

/// Totals for one taker execution (market order or swap).
#[derive(Debug, Eq, PartialEq, Default, Copy, Clone, BorshDeserialize, BorshSerialize)]
pub struct OrderExecution {
    pub base_filled: u64,
    /// Quote notional exchanged, before fees.
    pub quote_filled: u64,
    /// Aggregate taker fee charged on the pass, in quote units.
    pub taker_fee: u64,
}
