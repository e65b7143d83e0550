//! Read-only views over the pool. None of these mutate anything, including
//! expired orders: expiry is filtered in the answers and swept later by the
//! matching loop.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::{AccountCap, Asset};
use crate::error::DexError;
use crate::state::enums::Side;
use crate::state::order::Order;

use crate::pool::Pool;

/// Snapshot of the pool's fixed parameters and counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct PoolStat {
    pub tick_size: u64,
    pub lot_size: u64,
    pub taker_fee_rate: u64,
    pub maker_rebate_rate: u64,
    /// Net taker fees accrued and not yet collected, in quote units.
    pub accumulated_fees: u64,
    pub next_bid_sequence_number: u64,
    pub next_ask_sequence_number: u64,
}

impl<B: Asset, Q: Asset> Pool<B, Q> {
    /// (available base, locked base, available quote, locked quote).
    pub fn account_balance(&self, account_cap: &AccountCap) -> (u64, u64, u64, u64) {
        self.custodian().balances(account_cap.account_id())
    }

    pub fn get_pool_stat(&self) -> PoolStat {
        let (next_bid_sequence_number, next_ask_sequence_number) = self.next_sequence_numbers();
        PoolStat {
            tick_size: self.tick_size(),
            lot_size: self.lot_size(),
            taker_fee_rate: self.taker_fee_rate(),
            maker_rebate_rate: self.maker_rebate_rate(),
            accumulated_fees: self.accumulated_fees(),
            next_bid_sequence_number,
            next_ask_sequence_number,
        }
    }

    /// Best live bid and ask prices, expiry-filtered.
    pub fn get_market_price(&self, now_ms: u64) -> (Option<u64>, Option<u64>) {
        (
            self.best_live_price(Side::Bid, now_ms),
            self.best_live_price(Side::Ask, now_ms),
        )
    }

    fn best_live_price(&self, side: Side, now_ms: u64) -> Option<u64> {
        let tree = self.tree(side);
        let mut cursor = match side {
            Side::Bid => tree.max_leaf(),
            Side::Ask => tree.min_leaf(),
        };
        while let Some((price, handle)) = cursor {
            let level = tree.borrow_leaf(handle).ok()?;
            if level.iter().any(|order| !order.is_expired(now_ms)) {
                return Some(price);
            }
            cursor = match side {
                Side::Bid => tree.previous_leaf(price).ok()?,
                Side::Ask => tree.next_leaf(price).ok()?,
            };
        }
        None
    }

    /// Looks up one of the caller's resting orders.
    pub fn get_order_status(
        &self,
        account_cap: &AccountCap,
        order_id: u64,
    ) -> Result<Order, DexError> {
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
        let side = Side::from_order_id(order_id);
        let tree = self.tree(side);
        let handle = tree
            .find_leaf(price)
            .ok_or(DexError::InvariantViolation)?;
        tree.borrow_leaf(handle)?
            .get(order_id)
            .copied()
            .ok_or(DexError::InvariantViolation)
    }

    /// All resting orders of the caller, ascending by order id.
    pub fn list_open_orders(&self, account_cap: &AccountCap) -> Vec<Order> {
        let owner = account_cap.account_id();
        let Some(orders) = self.open_orders_index().get(&owner) else {
            return Vec::new();
        };
        orders
            .iter()
            .filter_map(|(&order_id, &price)| {
                let tree = self.tree(Side::from_order_id(order_id));
                let handle = tree.find_leaf(price)?;
                tree.borrow_leaf(handle).ok()?.get(order_id).copied()
            })
            .collect()
    }

    /// Depth between two price bounds (inclusive), ascending by price, as
    /// two parallel vectors. Expired orders do not count toward depth and
    /// all-expired levels are skipped.
    pub fn get_level2_book_status(
        &self,
        side: Side,
        price_low: u64,
        price_high: u64,
        now_ms: u64,
    ) -> (Vec<u64>, Vec<u64>) {
        let mut prices = Vec::new();
        let mut depths = Vec::new();
        if price_low > price_high {
            return (prices, depths);
        }
        let tree = self.tree(side);
        let mut cursor = tree.min_leaf();
        while let Some((price, handle)) = cursor {
            if price > price_high {
                break;
            }
            if price >= price_low {
                let Ok(level) = tree.borrow_leaf(handle) else {
                    break;
                };
                let depth: u64 = level
                    .iter()
                    .filter(|order| !order.is_expired(now_ms))
                    .map(|order| order.quantity)
                    .sum();
                if depth > 0 {
                    prices.push(price);
                    depths.push(depth);
                }
            }
            cursor = tree.next_leaf(price).ok().flatten();
        }
        (prices, depths)
    }
}
