//! The matching engine: deterministic price-then-FIFO crossing of an
//! incoming taker against the resting book.
//!
//! Makers are consumed best-price-first and, within a level, in insertion
//! order. Expired makers are removed (with a refund) the moment the loop
//! encounters them; there is no background sweeper. The maker side of every
//! fill settles into the custodian inside the loop; the taker side settles
//! once after the loop from whichever funding source the operation uses
//! (custodian balances for limit orders, supplied coins for market orders
//! and swaps).
//!
//! The taker fee is charged on the aggregate notional of the pass; maker
//! rebates are paid per fill. With the rebate rate bounded by the fee rate
//! the pool's net accrual is non-negative.

use tracing::debug;

use crate::account::{AccountCap, AccountId, Asset, Coin};
use crate::error::DexError;
use crate::math;
use crate::pool::{Pool, RemoveReason};
use crate::state::enums::{SelfMatchBehavior, Side};
use crate::state::events::MarketEvent;
use crate::state::inflight_order::InflightOrder;
use crate::state::matching_engine_response::OrderExecution;

/// Result of a read-only simulation of a matching pass. Used for the
/// FILL_OR_KILL feasibility check and the ABORT self-match pre-scan, so
/// that both decisions happen before any state changes.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct DryRunOutcome {
    pub feasible_base: u64,
    pub feasible_quote: u64,
    /// A live self-owned maker was reached under the `Abort` policy.
    pub self_match_hit: bool,
    /// A live self-owned maker was reached under `CancelTaker`; the
    /// residual would be dropped instead of resting.
    pub taker_cancelled: bool,
}

impl<B: Asset, Q: Asset> Pool<B, Q> {
    /// Simulates matching without mutating anything, mirroring
    /// [`Pool::match_against_book`] decision for decision.
    pub(crate) fn dry_run_match(
        &self,
        taker: AccountId,
        side: Side,
        limit_price: u64,
        base_budget: u64,
        quote_budget: u64,
        self_match_behavior: SelfMatchBehavior,
        now_ms: u64,
    ) -> Result<DryRunOutcome, DexError> {
        let mut outcome = DryRunOutcome::default();
        let mut base_remaining = base_budget;
        let mut quote_remaining = quote_budget;
        let opposite = self.tree(side.opposite());

        let mut cursor = self.best_opposite(side);
        'levels: while let Some((level_price, handle)) = cursor {
            let in_bound = match side {
                Side::Bid => level_price <= limit_price,
                Side::Ask => level_price >= limit_price,
            };
            if !in_bound {
                break;
            }
            let level = opposite.borrow_leaf(handle)?;
            for maker in level.iter() {
                if base_remaining == 0 || quote_remaining == 0 {
                    break 'levels;
                }
                if maker.is_expired(now_ms) {
                    continue;
                }
                if maker.owner == taker {
                    match self_match_behavior {
                        SelfMatchBehavior::CancelOldest => continue,
                        SelfMatchBehavior::CancelTaker => {
                            outcome.taker_cancelled = true;
                            break 'levels;
                        }
                        SelfMatchBehavior::Abort => {
                            outcome.self_match_hit = true;
                            break 'levels;
                        }
                    }
                }
                let mut fill_base = base_remaining.min(maker.quantity);
                if quote_remaining != u64::MAX {
                    let affordable = math::div_floor(quote_remaining, maker.price)?;
                    fill_base =
                        math::round_down_to_lot(fill_base.min(affordable), self.lot_size());
                    if fill_base == 0 {
                        break 'levels;
                    }
                }
                let fill_quote = math::mul_floor(fill_base, maker.price)?;
                base_remaining -= fill_base;
                if quote_remaining != u64::MAX {
                    quote_remaining -= fill_quote;
                }
                outcome.feasible_base += fill_base;
                outcome.feasible_quote += fill_quote;
            }
            cursor = match side {
                Side::Bid => opposite.next_leaf(level_price)?,
                Side::Ask => opposite.previous_leaf(level_price)?,
            };
        }
        Ok(outcome)
    }

    /// Whether a would-be maker at `price` crosses a live opposite order.
    /// Read-only: expired opposite orders are ignored, not removed, so a
    /// POST_OR_ABORT rejection leaves the pool untouched.
    pub(crate) fn crosses_live_order(
        &self,
        side: Side,
        price: u64,
        now_ms: u64,
    ) -> Result<bool, DexError> {
        let opposite = self.tree(side.opposite());
        let mut cursor = self.best_opposite(side);
        while let Some((level_price, handle)) = cursor {
            let in_bound = match side {
                Side::Bid => level_price <= price,
                Side::Ask => level_price >= price,
            };
            if !in_bound {
                return Ok(false);
            }
            let level = opposite.borrow_leaf(handle)?;
            if level.iter().any(|maker| !maker.is_expired(now_ms)) {
                return Ok(true);
            }
            cursor = match side {
                Side::Bid => opposite.next_leaf(level_price)?,
                Side::Ask => opposite.previous_leaf(level_price)?,
            };
        }
        Ok(false)
    }

    /// Core matching loop. Mutates the book and the makers' custodian
    /// entries; the taker's totals accumulate in `inflight` and settle in
    /// the caller. Termination: every iteration fills budget, removes a
    /// resting order, or sets the terminate flag.
    pub(crate) fn match_against_book(
        &mut self,
        taker: AccountId,
        inflight: &mut InflightOrder,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        let opposite_side = inflight.side.opposite();
        while inflight.in_progress() {
            let Some((level_price, handle)) = self.best_opposite(inflight.side) else {
                break;
            };
            if !inflight.crosses(level_price) {
                break;
            }
            // Levels are never empty (they are removed when they drain), so
            // the front order always exists.
            let maker = *self
                .tree(opposite_side)
                .borrow_leaf(handle)?
                .front()
                .ok_or(DexError::InvariantViolation)?;

            if maker.is_expired(now_ms) {
                debug!(order_id = maker.order_id, "removing expired maker");
                self.remove_resting_order(
                    opposite_side,
                    level_price,
                    maker.order_id,
                    RemoveReason::Expired { now_ms },
                    record_event_fn,
                )?;
                continue;
            }

            if maker.owner == taker {
                match inflight.self_match_behavior {
                    SelfMatchBehavior::CancelOldest => {
                        debug!(order_id = maker.order_id, "self match: cancelling maker");
                        self.remove_resting_order(
                            opposite_side,
                            level_price,
                            maker.order_id,
                            RemoveReason::Cancelled,
                            record_event_fn,
                        )?;
                        continue;
                    }
                    SelfMatchBehavior::CancelTaker => {
                        debug!("self match: cancelling taker remainder");
                        inflight.should_terminate = true;
                        inflight.taker_cancelled = true;
                        break;
                    }
                    // The limit-order path pre-scans for this case; market
                    // orders and swaps never use the Abort policy.
                    SelfMatchBehavior::Abort => return Err(DexError::SelfMatch),
                }
            }

            let mut fill_base = inflight.base_remaining.min(maker.quantity);
            if inflight.quote_remaining != u64::MAX {
                let affordable = math::div_floor(inflight.quote_remaining, maker.price)?;
                fill_base = math::round_down_to_lot(fill_base.min(affordable), self.lot_size());
                if fill_base == 0 {
                    // Partial-lot stall: the remaining quote cannot buy a
                    // whole lot at this level. Matching stops cleanly.
                    inflight.should_terminate = true;
                    break;
                }
            }
            let fill_quote = math::mul_floor(fill_base, maker.price)?;
            let maker_rebate = math::mul_floor(fill_quote, self.maker_rebate_rate())?;

            // Maker-side settlement.
            if maker.is_bid {
                // Release exactly the difference between the old and new
                // reservations; the taker receives the truncated notional
                // and the sub-unit residue returns to the maker.
                let lock_before = Self::bid_lock_amount(maker.price, maker.quantity)?;
                let lock_after =
                    Self::bid_lock_amount(maker.price, maker.quantity - fill_base)?;
                let lock_release = lock_before - lock_after;
                let custodian = self.custodian_mut();
                custodian.debit_locked_quote(maker.owner, lock_release)?;
                let residue = lock_release - fill_quote;
                if residue > 0 {
                    custodian.credit_available_quote(maker.owner, residue)?;
                }
                custodian.credit_available_base(maker.owner, fill_base)?;
                custodian.credit_available_quote(maker.owner, maker_rebate)?;
            } else {
                let custodian = self.custodian_mut();
                custodian.debit_locked_base(maker.owner, fill_base)?;
                custodian.credit_available_quote(
                    maker.owner,
                    math::checked_add(fill_quote, maker_rebate)?,
                )?;
            }

            // Shrink the maker in place, or retire it on a full fill.
            let maker_remaining = maker.quantity - fill_base;
            {
                let tree = self.tree_mut(opposite_side);
                if maker_remaining == 0 {
                    let now_empty = {
                        let level = tree.borrow_leaf_mut(handle)?;
                        level.pop_front().ok_or(DexError::InvariantViolation)?;
                        level.is_empty()
                    };
                    if now_empty {
                        tree.remove_leaf(handle)?;
                    }
                } else {
                    let level = tree.borrow_leaf_mut(handle)?;
                    level
                        .front_mut()
                        .ok_or(DexError::InvariantViolation)?
                        .quantity = maker_remaining;
                }
            }
            if maker_remaining == 0 {
                self.index_remove(maker.owner, maker.order_id);
            }

            inflight.process_match(fill_base, fill_quote, maker_rebate);
            record_event_fn(MarketEvent::Fill {
                pool_id: self.pool_id(),
                order_id: maker.order_id,
                maker: maker.owner,
                taker,
                price: maker.price,
                base_quantity: fill_base,
                quote_quantity: fill_quote,
                maker_rebate,
                base_remaining: maker_remaining,
                now_ms,
            });
        }
        Ok(())
    }

    /// Post-loop taker accounting shared by every crossing operation:
    /// computes the aggregate fee, accrues the pool's net take and emits
    /// the fill summary. Returns the execution totals.
    pub(crate) fn finish_taker_execution(
        &mut self,
        taker: AccountId,
        client_order_id: u64,
        inflight: &InflightOrder,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<OrderExecution, DexError> {
        let taker_fee = math::mul_floor(inflight.filled_quote, self.taker_fee_rate())?;
        // Rebates are funded out of the taker fee; the rate bound makes the
        // difference non-negative.
        let net_fee = taker_fee
            .checked_sub(inflight.rebates_paid)
            .ok_or(DexError::InvariantViolation)?;
        self.accrue_fees(net_fee)?;
        if inflight.filled_base > 0 {
            record_event_fn(MarketEvent::FillSummary {
                pool_id: self.pool_id(),
                client_order_id,
                taker,
                total_base_filled: inflight.filled_base,
                total_quote_filled: inflight.filled_quote,
                taker_fee,
                now_ms,
            });
        }
        Ok(OrderExecution {
            base_filled: inflight.filled_base,
            quote_filled: inflight.filled_quote,
            taker_fee,
        })
    }

    // ------------------------------------------------------------------
    // Coin-funded taker operations (market orders and swaps)
    // ------------------------------------------------------------------

    /// Matches the whole base `quantity` at any price, paying and receiving
    /// through the supplied coins. The unused portions come back to the
    /// caller; nothing ever rests.
    pub fn place_market_order(
        &mut self,
        account_cap: &AccountCap,
        client_order_id: u64,
        side: Side,
        quantity: u64,
        base_coin: Coin<B>,
        quote_coin: Coin<Q>,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(Coin<B>, Coin<Q>), DexError> {
        self.validate_base_quantity(quantity)?;
        match side {
            Side::Bid => {
                let (base_coin, quote_coin, _) = self.execute_taker_bid(
                    account_cap,
                    client_order_id,
                    quantity,
                    base_coin,
                    quote_coin,
                    now_ms,
                    record_event_fn,
                )?;
                Ok((base_coin, quote_coin))
            }
            Side::Ask => {
                let (base_coin, quote_coin, _) = self.execute_taker_ask(
                    account_cap,
                    client_order_id,
                    quantity,
                    base_coin,
                    quote_coin,
                    now_ms,
                    record_event_fn,
                )?;
                Ok((base_coin, quote_coin))
            }
        }
    }

    /// Sells exactly `quantity` base (or as much as the book can take) for
    /// quote. Returns the remaining base coin, the quote proceeds net of
    /// the taker fee, and the net quote amount received.
    pub fn swap_exact_base_for_quote(
        &mut self,
        account_cap: &AccountCap,
        client_order_id: u64,
        quantity: u64,
        base_coin: Coin<B>,
        quote_coin: Coin<Q>,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(Coin<B>, Coin<Q>, u64), DexError> {
        self.validate_base_quantity(quantity)?;
        self.execute_taker_ask(
            account_cap,
            client_order_id,
            quantity,
            base_coin,
            quote_coin,
            now_ms,
            record_event_fn,
        )
    }

    /// Spends up to `quantity` quote notional on base. The supplied coin
    /// must cover the notional plus the worst-case aggregate fee; whatever
    /// is not spent comes back. Returns the base received.
    pub fn swap_exact_quote_for_base(
        &mut self,
        account_cap: &AccountCap,
        client_order_id: u64,
        quantity: u64,
        mut quote_coin: Coin<Q>,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(Coin<B>, Coin<Q>, u64), DexError> {
        if quantity == 0 {
            return Err(DexError::InvalidQuantity);
        }
        let taker = account_cap.account_id();
        let fee_headroom = math::mul_floor(quantity, self.taker_fee_rate())?;
        if quote_coin.value() < math::checked_add(quantity, fee_headroom)? {
            return Err(DexError::InsufficientFunds);
        }

        let mut inflight = InflightOrder::new(
            Side::Bid,
            SelfMatchBehavior::CancelOldest,
            u64::MAX,
            u64::MAX,
            quantity,
        );
        self.match_against_book(taker, &mut inflight, now_ms, record_event_fn)?;
        let execution = self.finish_taker_execution(
            taker,
            client_order_id,
            &inflight,
            now_ms,
            record_event_fn,
        )?;

        let spend = math::checked_add(execution.quote_filled, execution.taker_fee)?;
        quote_coin.split(spend)?.into_value();
        Ok((
            Coin::new(execution.base_filled),
            quote_coin,
            execution.base_filled,
        ))
    }

    fn execute_taker_bid(
        &mut self,
        account_cap: &AccountCap,
        client_order_id: u64,
        quantity: u64,
        mut base_coin: Coin<B>,
        mut quote_coin: Coin<Q>,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(Coin<B>, Coin<Q>, u64), DexError> {
        let taker = account_cap.account_id();
        // Shave the quote budget so the aggregate fee always fits in the
        // supplied coin, whatever the fill pattern.
        let quote_budget =
            math::fee_adjusted_budget(quote_coin.value(), self.taker_fee_rate())?;
        let mut inflight = InflightOrder::new(
            Side::Bid,
            SelfMatchBehavior::CancelOldest,
            u64::MAX,
            quantity,
            quote_budget,
        );
        if quote_budget > 0 {
            self.match_against_book(taker, &mut inflight, now_ms, record_event_fn)?;
        }
        let execution = self.finish_taker_execution(
            taker,
            client_order_id,
            &inflight,
            now_ms,
            record_event_fn,
        )?;

        let spend = math::checked_add(execution.quote_filled, execution.taker_fee)?;
        quote_coin.split(spend)?.into_value();
        base_coin.join(Coin::new(execution.base_filled))?;
        Ok((base_coin, quote_coin, execution.base_filled))
    }

    fn execute_taker_ask(
        &mut self,
        account_cap: &AccountCap,
        client_order_id: u64,
        quantity: u64,
        mut base_coin: Coin<B>,
        mut quote_coin: Coin<Q>,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(Coin<B>, Coin<Q>, u64), DexError> {
        let taker = account_cap.account_id();
        if base_coin.value() < quantity {
            return Err(DexError::InsufficientFunds);
        }
        let mut inflight = InflightOrder::new(
            Side::Ask,
            SelfMatchBehavior::CancelOldest,
            0,
            quantity,
            u64::MAX,
        );
        self.match_against_book(taker, &mut inflight, now_ms, record_event_fn)?;
        let execution = self.finish_taker_execution(
            taker,
            client_order_id,
            &inflight,
            now_ms,
            record_event_fn,
        )?;

        // The fee is carved out of the quote proceeds.
        let net_quote = math::checked_sub(execution.quote_filled, execution.taker_fee)?;
        base_coin.split(execution.base_filled)?.into_value();
        quote_coin.join(Coin::new(net_quote))?;
        Ok((base_coin, quote_coin, net_quote))
    }

    #[inline(always)]
    pub(crate) fn validate_base_quantity(&self, quantity: u64) -> Result<(), DexError> {
        if quantity == 0 || quantity % self.lot_size() != 0 {
            return Err(DexError::InvalidQuantity);
        }
        Ok(())
    }
}
