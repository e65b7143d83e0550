//! Limit-order placement and cancellation.
//!
//! Placement validates everything it can before the first mutation. For
//! orders that cross, a read-only dry run of the matching pass supplies the
//! exact spend, so the funds check is neither optimistic nor over-strict,
//! and the mutating pass that follows cannot fail part-way.

use tracing::debug;

use crate::account::{AccountCap, AccountId, Asset};
use crate::error::DexError;
use crate::math;
use crate::pool::{Pool, RemoveReason};
use crate::state::enums::{OrderRestriction, SelfMatchBehavior, Side};
use crate::state::events::MarketEvent;
use crate::state::inflight_order::InflightOrder;
use crate::state::matching_engine_response::PlacedOrder;
use crate::state::order::{Order, MIN_ASK_ORDER_ID};

impl<B: Asset, Q: Asset> Pool<B, Q> {
    /// Places a limit order: matches against the book up to the limit
    /// price, then rests, drops or refuses the remainder according to
    /// `restriction`. Limit orders draw on and settle into the owner's
    /// custodian balances.
    #[allow(clippy::too_many_arguments)]
    pub fn place_limit_order(
        &mut self,
        account_cap: &AccountCap,
        client_order_id: u64,
        side: Side,
        price: u64,
        quantity: u64,
        expire_timestamp_ms: u64,
        restriction: OrderRestriction,
        self_match_behavior: SelfMatchBehavior,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<PlacedOrder, DexError> {
        if price == 0 || price >= MIN_ASK_ORDER_ID || price % self.tick_size() != 0 {
            return Err(DexError::InvalidPrice);
        }
        self.validate_base_quantity(quantity)?;
        if expire_timestamp_ms <= now_ms {
            return Err(DexError::InvalidExpiration);
        }
        let taker = account_cap.account_id();

        if restriction == OrderRestriction::PostOrAbort {
            // Must rest as a maker. Expired opposite orders don't count as
            // a cross and are left for the matching loop to sweep.
            if self.crosses_live_order(side, price, now_ms)? {
                debug!(price, "post-or-abort order would cross");
                return Err(DexError::OrderCannotCross);
            }
            return self.rest_new_order(
                taker,
                client_order_id,
                side,
                price,
                quantity,
                expire_timestamp_ms,
                self_match_behavior,
                now_ms,
                PlacedOrder::default(),
                record_event_fn,
            );
        }

        let crossing = match self.best_opposite(side) {
            Some((best_price, _)) => match side {
                Side::Bid => best_price <= price,
                Side::Ask => best_price >= price,
            },
            None => false,
        };

        // Read-only rehearsal of the matching pass: exact fill totals for
        // the funds check, FILL_OR_KILL feasibility and the ABORT
        // self-match pre-scan, all before any state change.
        let dry_run = if crossing {
            self.dry_run_match(
                taker,
                side,
                price,
                quantity,
                u64::MAX,
                self_match_behavior,
                now_ms,
            )?
        } else {
            Default::default()
        };

        if dry_run.self_match_hit {
            return Err(DexError::SelfMatch);
        }
        if restriction == OrderRestriction::FillOrKill && dry_run.feasible_base < quantity {
            debug!(
                feasible = dry_run.feasible_base,
                requested = quantity,
                "fill-or-kill not satisfiable"
            );
            return Ok(PlacedOrder::not_placed(0, 0));
        }

        let residual = quantity - dry_run.feasible_base;
        let will_rest = residual > 0
            && restriction == OrderRestriction::NoRestriction
            && !dry_run.taker_cancelled;

        // Exact worst-case spend for this order, given the dry run.
        let taker_fee = math::mul_floor(dry_run.feasible_quote, self.taker_fee_rate())?;
        let (available_base, _, available_quote, _) = self.custodian().balances(taker);
        match side {
            Side::Bid => {
                let mut required = math::checked_add(dry_run.feasible_quote, taker_fee)?;
                if will_rest {
                    required = math::checked_add(required, Self::bid_lock_amount(price, residual)?)?;
                }
                if available_quote < required {
                    return Err(DexError::InsufficientFunds);
                }
            }
            Side::Ask => {
                let required = if will_rest { quantity } else { dry_run.feasible_base };
                if available_base < required {
                    return Err(DexError::InsufficientFunds);
                }
            }
        }

        // Mutating pass; mirrors the dry run decision for decision.
        let mut inflight =
            InflightOrder::new(side, self_match_behavior, price, quantity, u64::MAX);
        if crossing {
            self.match_against_book(taker, &mut inflight, now_ms, record_event_fn)?;
        }
        let execution = self.finish_taker_execution(
            taker,
            client_order_id,
            &inflight,
            now_ms,
            record_event_fn,
        )?;
        debug_assert_eq!(execution.base_filled, dry_run.feasible_base);
        debug_assert_eq!(execution.quote_filled, dry_run.feasible_quote);

        // Taker-side settlement through the custodian.
        match side {
            Side::Bid => {
                let spend = math::checked_add(execution.quote_filled, execution.taker_fee)?;
                self.custodian_mut().debit_available_quote(taker, spend)?;
                self.custodian_mut()
                    .credit_available_base(taker, execution.base_filled)?;
            }
            Side::Ask => {
                let proceeds = math::checked_sub(execution.quote_filled, execution.taker_fee)?;
                self.custodian_mut()
                    .debit_available_base(taker, execution.base_filled)?;
                self.custodian_mut()
                    .credit_available_quote(taker, proceeds)?;
            }
        }

        let filled = PlacedOrder::not_placed(execution.base_filled, execution.quote_filled);
        let residual = quantity - execution.base_filled;
        if residual > 0
            && restriction == OrderRestriction::NoRestriction
            && !inflight.taker_cancelled
        {
            return self.rest_new_order(
                taker,
                client_order_id,
                side,
                price,
                residual,
                expire_timestamp_ms,
                self_match_behavior,
                now_ms,
                filled,
                record_event_fn,
            );
        }
        Ok(filled)
    }

    /// Allocates an id and rests `quantity` at `price`. The caller has
    /// already verified the funds, so the lock cannot fail after the
    /// sequence number advances.
    #[allow(clippy::too_many_arguments)]
    fn rest_new_order(
        &mut self,
        owner: AccountId,
        client_order_id: u64,
        side: Side,
        price: u64,
        quantity: u64,
        expire_timestamp_ms: u64,
        self_match_behavior: SelfMatchBehavior,
        now_ms: u64,
        filled: PlacedOrder,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<PlacedOrder, DexError> {
        // Funds re-check so this helper is safe on the pure-placement path
        // too (where no dry run ran).
        let (available_base, _, available_quote, _) = self.custodian().balances(owner);
        if side.is_bid() {
            if available_quote < Self::bid_lock_amount(price, quantity)? {
                return Err(DexError::InsufficientFunds);
            }
        } else if available_base < quantity {
            return Err(DexError::InsufficientFunds);
        }

        let order_id = self.allocate_order_id(side)?;
        let order = Order {
            order_id,
            client_order_id,
            price,
            quantity,
            is_bid: side.is_bid(),
            owner,
            expire_timestamp_ms,
            self_matching_prevention: self_match_behavior.into(),
        };
        self.insert_resting_order(order, now_ms, record_event_fn)?;
        Ok(PlacedOrder::placed(
            filled.base_filled,
            filled.quote_filled,
            order_id,
        ))
    }

    /// Cancels one resting order owned by the capability holder and refunds
    /// the funds still reserved for it.
    pub fn cancel_order(
        &mut self,
        account_cap: &AccountCap,
        order_id: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        let owner = account_cap.account_id();
        let price = match self.index_lookup(owner, order_id) {
            Some(price) => price,
            None => {
                return Err(if self.order_exists_elsewhere(owner, order_id) {
                    DexError::Unauthorized
                } else {
                    DexError::InvalidOrderId
                });
            }
        };
        self.remove_resting_order(
            Side::from_order_id(order_id),
            price,
            order_id,
            RemoveReason::Cancelled,
            record_event_fn,
        )?;
        Ok(())
    }

    /// Cancels the given ids in order, stopping at the first failure.
    /// Cancels already applied stay applied; the single cancel is the unit
    /// of atomicity.
    pub fn batch_cancel_orders(
        &mut self,
        account_cap: &AccountCap,
        order_ids: &[u64],
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        for &order_id in order_ids {
            self.cancel_order(account_cap, order_id, record_event_fn)?;
        }
        Ok(())
    }

    /// Cancels every resting order the capability holder owns.
    pub fn cancel_all_orders(
        &mut self,
        account_cap: &AccountCap,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        let owner = account_cap.account_id();
        let orders: Vec<(u64, u64)> = self
            .open_orders_index()
            .get(&owner)
            .map(|orders| orders.iter().map(|(id, price)| (*id, *price)).collect())
            .unwrap_or_default();
        for (order_id, price) in orders {
            self.remove_resting_order(
                Side::from_order_id(order_id),
                price,
                order_id,
                RemoveReason::Cancelled,
                record_event_fn,
            )?;
        }
        Ok(())
    }
}
