use crate::state::enums::{SelfMatchBehavior, Side};

/// Accumulator for the incoming (taker) side of one matching pass.
///
/// Budgets only ever decrease and totals only ever increase; the loop runs
/// while [`InflightOrder::in_progress`] holds and every iteration either
/// consumes budget or removes a resting order, so matching terminates.
#[derive(Copy, Clone, Debug)]
pub(crate) struct InflightOrder {
    pub side: Side,
    pub self_match_behavior: SelfMatchBehavior,

    /// Most aggressive price the taker accepts. Unbounded market bids use
    /// `u64::MAX`; unbounded market asks use `0`.
    pub limit_price: u64,

    /// Remaining base quantity the taker wants, always a lot multiple.
    pub base_remaining: u64,

    /// Remaining quote notional the taker may spend (quote-bounded bids and
    /// coin-funded market bids). `u64::MAX` when only base-bounded.
    pub quote_remaining: u64,

    /// Set when matching must stop early: partial-lot stall, exhausted
    /// quote budget, or a self-match under `CancelTaker`.
    pub should_terminate: bool,

    /// Set when the taker's residual must not rest (`CancelTaker`).
    pub taker_cancelled: bool,

    pub filled_base: u64,
    /// Total quote notional exchanged, before fees.
    pub filled_quote: u64,
    /// Maker rebates credited so far, for fee-pot accounting.
    pub rebates_paid: u64,
}

impl InflightOrder {
    pub(crate) fn new(
        side: Side,
        self_match_behavior: SelfMatchBehavior,
        limit_price: u64,
        base_budget: u64,
        quote_budget: u64,
    ) -> Self {
        InflightOrder {
            side,
            self_match_behavior,
            limit_price,
            base_remaining: base_budget,
            quote_remaining: quote_budget,
            should_terminate: false,
            taker_cancelled: false,
            filled_base: 0,
            filled_quote: 0,
            rebates_paid: 0,
        }
    }

    #[inline(always)]
    pub(crate) fn in_progress(&self) -> bool {
        self.base_remaining > 0 && self.quote_remaining > 0 && !self.should_terminate
    }

    /// Whether a resting order at `price` is within the taker's bound.
    #[inline(always)]
    pub(crate) fn crosses(&self, price: u64) -> bool {
        match self.side {
            Side::Bid => price <= self.limit_price,
            Side::Ask => price >= self.limit_price,
        }
    }

    pub(crate) fn process_match(&mut self, fill_base: u64, fill_quote: u64, maker_rebate: u64) {
        self.base_remaining -= fill_base;
        // `u64::MAX` means "not quote-bounded" and must stay that way.
        if self.quote_remaining != u64::MAX {
            self.quote_remaining -= fill_quote;
        }
        self.filled_base += fill_base;
        self.filled_quote += fill_quote;
        self.rebates_paid += maker_rebate;
    }
}
