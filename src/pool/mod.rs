//! The pool: two crit-bit trees of tick levels, the order-id allocator, the
//! per-account open-order index, and the custodian, glued together by the
//! matching engine.
//!
//! Every public entry point is a single atomic mutation: all validation
//! happens before the first state change (including dry runs for the paths
//! that need exact numbers), so an `Err` return implies the pool is
//! byte-for-byte unchanged.

mod matching;
mod orders;
mod queries;

pub use queries::PoolStat;

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use tracing::debug;

use crate::account::{AccountCap, AccountId, Asset, Coin};
use crate::critbit::CritbitTree;
use crate::error::DexError;
use crate::math::{self, FLOAT_SCALING};
use crate::state::custodian::Custodian;
use crate::state::enums::Side;
use crate::state::events::MarketEvent;
use crate::state::order::{Order, MAX_BID_ORDER_ID};
use crate::state::tick_level::TickLevel;

/// Why a resting order is leaving the book.
#[derive(Debug, Copy, Clone)]
pub(crate) enum RemoveReason {
    Cancelled,
    Expired { now_ms: u64 },
}

pub struct Pool<B: Asset, Q: Asset> {
    pool_id: u64,
    tick_size: u64,
    lot_size: u64,
    /// Taker fee rate, fixed-point over [`FLOAT_SCALING`].
    taker_fee_rate: u64,
    /// Maker rebate rate, fixed-point over [`FLOAT_SCALING`]. Never exceeds
    /// the taker fee rate, so the pool's net fee per pass is non-negative.
    maker_rebate_rate: u64,
    bids: CritbitTree<TickLevel>,
    asks: CritbitTree<TickLevel>,
    next_bid_sequence_number: u64,
    next_ask_sequence_number: u64,
    /// `owner -> order id -> price`, the O(1) cancellation index. Holds
    /// exactly the resting orders of each account.
    open_orders: HashMap<AccountId, BTreeMap<u64, u64>>,
    custodian: Custodian,
    /// Net taker fees accrued to the pool, in quote units.
    accumulated_fees: u64,
    _assets: PhantomData<(B, Q)>,
}

impl<B: Asset, Q: Asset> std::fmt::Debug for Pool<B, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("pool_id", &self.pool_id)
            .field("tick_size", &self.tick_size)
            .field("lot_size", &self.lot_size)
            .field("taker_fee_rate", &self.taker_fee_rate)
            .field("maker_rebate_rate", &self.maker_rebate_rate)
            .field("bids", &self.bids)
            .field("asks", &self.asks)
            .field("next_bid_sequence_number", &self.next_bid_sequence_number)
            .field("next_ask_sequence_number", &self.next_ask_sequence_number)
            .field("open_orders", &self.open_orders)
            .field("custodian", &self.custodian)
            .field("accumulated_fees", &self.accumulated_fees)
            .finish()
    }
}

impl<B: Asset, Q: Asset> Pool<B, Q> {
    /// Creates a pool. Parameters are fixed for the pool's lifetime.
    pub fn new(
        pool_id: u64,
        tick_size: u64,
        lot_size: u64,
        taker_fee_rate: u64,
        maker_rebate_rate: u64,
    ) -> Result<Self, DexError> {
        if tick_size == 0 || lot_size == 0 {
            return Err(DexError::InvalidPoolParams);
        }
        if taker_fee_rate >= FLOAT_SCALING || maker_rebate_rate > taker_fee_rate {
            return Err(DexError::InvalidPoolParams);
        }
        Ok(Pool {
            pool_id,
            tick_size,
            lot_size,
            taker_fee_rate,
            maker_rebate_rate,
            bids: CritbitTree::new(),
            asks: CritbitTree::new(),
            next_bid_sequence_number: 0,
            next_ask_sequence_number: 0,
            open_orders: HashMap::new(),
            custodian: Custodian::new(),
            accumulated_fees: 0,
            _assets: PhantomData,
        })
    }

    #[inline(always)]
    pub fn pool_id(&self) -> u64 {
        self.pool_id
    }

    #[inline(always)]
    pub fn tick_size(&self) -> u64 {
        self.tick_size
    }

    #[inline(always)]
    pub fn lot_size(&self) -> u64 {
        self.lot_size
    }

    // ------------------------------------------------------------------
    // Funds management
    // ------------------------------------------------------------------

    /// Consumes a base coin into the owner's available balance.
    pub fn deposit_base(
        &mut self,
        account_cap: &AccountCap,
        coin: Coin<B>,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        let owner = account_cap.account_id();
        let amount = coin.into_value();
        self.custodian.deposit_base(owner, amount)?;
        record_event_fn(MarketEvent::Deposit {
            pool_id: self.pool_id,
            owner,
            is_base: true,
            amount,
        });
        Ok(())
    }

    pub fn deposit_quote(
        &mut self,
        account_cap: &AccountCap,
        coin: Coin<Q>,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        let owner = account_cap.account_id();
        let amount = coin.into_value();
        self.custodian.deposit_quote(owner, amount)?;
        record_event_fn(MarketEvent::Deposit {
            pool_id: self.pool_id,
            owner,
            is_base: false,
            amount,
        });
        Ok(())
    }

    /// Withdraws available base funds. Locked funds stay with their orders.
    pub fn withdraw_base(
        &mut self,
        account_cap: &AccountCap,
        amount: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<Coin<B>, DexError> {
        let owner = account_cap.account_id();
        self.custodian.withdraw_base(owner, amount)?;
        record_event_fn(MarketEvent::Withdraw {
            pool_id: self.pool_id,
            owner,
            is_base: true,
            amount,
        });
        Ok(Coin::new(amount))
    }

    pub fn withdraw_quote(
        &mut self,
        account_cap: &AccountCap,
        amount: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<Coin<Q>, DexError> {
        let owner = account_cap.account_id();
        self.custodian.withdraw_quote(owner, amount)?;
        record_event_fn(MarketEvent::Withdraw {
            pool_id: self.pool_id,
            owner,
            is_base: false,
            amount,
        });
        Ok(Coin::new(amount))
    }

    /// Drains the accrued taker fees. Routing the proceeds to a treasury is
    /// the host's concern.
    pub fn collect_fees(&mut self, record_event_fn: &mut dyn FnMut(MarketEvent)) -> Coin<Q> {
        let quote_amount = self.accumulated_fees;
        self.accumulated_fees = 0;
        record_event_fn(MarketEvent::FeesCollected {
            pool_id: self.pool_id,
            quote_amount,
        });
        Coin::new(quote_amount)
    }

    // ------------------------------------------------------------------
    // Book maintenance shared by placement, cancellation and matching
    // ------------------------------------------------------------------

    #[inline(always)]
    pub(crate) fn tree(&self, side: Side) -> &CritbitTree<TickLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline(always)]
    pub(crate) fn tree_mut(&mut self, side: Side) -> &mut CritbitTree<TickLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Best resting level on the opposite side of an incoming `taker_side`
    /// order: lowest ask for a bid, highest bid for an ask.
    pub(crate) fn best_opposite(&self, taker_side: Side) -> Option<(u64, u64)> {
        match taker_side {
            Side::Bid => self.asks.min_leaf(),
            Side::Ask => self.bids.max_leaf(),
        }
    }

    /// Quote amount reserved for a resting bid. The ceiling keeps the
    /// reservation sufficient for every partial-fill schedule.
    #[inline(always)]
    pub(crate) fn bid_lock_amount(price: u64, quantity: u64) -> Result<u64, DexError> {
        math::mul_ceil(quantity, price)
    }

    pub(crate) fn allocate_order_id(&mut self, side: Side) -> Result<u64, DexError> {
        let sequence_number = match side {
            Side::Bid => &mut self.next_bid_sequence_number,
            Side::Ask => &mut self.next_ask_sequence_number,
        };
        if *sequence_number > MAX_BID_ORDER_ID {
            return Err(DexError::InvariantViolation);
        }
        let allocated = *sequence_number;
        *sequence_number += 1;
        Ok(crate::state::order::pack_order_id(side, allocated))
    }

    pub(crate) fn index_insert(&mut self, owner: AccountId, order_id: u64, price: u64) {
        self.open_orders
            .entry(owner)
            .or_default()
            .insert(order_id, price);
    }

    pub(crate) fn index_remove(&mut self, owner: AccountId, order_id: u64) -> Option<u64> {
        let orders = self.open_orders.get_mut(&owner)?;
        let price = orders.remove(&order_id);
        if orders.is_empty() {
            self.open_orders.remove(&owner);
        }
        price
    }

    pub(crate) fn index_lookup(&self, owner: AccountId, order_id: u64) -> Option<u64> {
        self.open_orders
            .get(&owner)
            .and_then(|orders| orders.get(&order_id))
            .copied()
    }

    /// Whether any other account has the order id resting; used to pick
    /// between `InvalidOrderId` and `Unauthorized` on the cold error path.
    pub(crate) fn order_exists_elsewhere(&self, owner: AccountId, order_id: u64) -> bool {
        self.open_orders
            .iter()
            .any(|(id, orders)| *id != owner && orders.contains_key(&order_id))
    }

    /// Rests an already-validated order: locks its funds, inserts it at the
    /// back of its price level (creating the level if absent) and records
    /// it in the owner's index.
    pub(crate) fn insert_resting_order(
        &mut self,
        order: Order,
        now_ms: u64,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<(), DexError> {
        if order.is_bid {
            let lock = Self::bid_lock_amount(order.price, order.quantity)?;
            self.custodian.lock_quote(order.owner, lock)?;
        } else {
            self.custodian.lock_base(order.owner, order.quantity)?;
        }

        let side = order.side();
        let tree = self.tree_mut(side);
        match tree.find_leaf(order.price) {
            Some(handle) => tree.borrow_leaf_mut(handle)?.push_back(order),
            None => {
                let mut level = TickLevel::new(order.price);
                level.push_back(order);
                tree.insert_leaf(order.price, level)?;
            }
        }
        self.index_insert(order.owner, order.order_id, order.price);

        debug!(
            order_id = order.order_id,
            price = order.price,
            quantity = order.quantity,
            "order resting"
        );
        record_event_fn(MarketEvent::Place {
            pool_id: self.pool_id,
            order_id: order.order_id,
            client_order_id: order.client_order_id,
            owner: order.owner,
            price: order.price,
            base_quantity: order.quantity,
            expire_timestamp_ms: order.expire_timestamp_ms,
            now_ms,
        });
        Ok(())
    }

    /// Unlinks a resting order, refunds its remaining locked funds to the
    /// owner's available balance and erases it from the index. The level is
    /// dropped from the tree when it empties.
    pub(crate) fn remove_resting_order(
        &mut self,
        side: Side,
        price: u64,
        order_id: u64,
        reason: RemoveReason,
        record_event_fn: &mut dyn FnMut(MarketEvent),
    ) -> Result<Order, DexError> {
        let order = {
            let tree = self.tree_mut(side);
            let handle = tree.find_leaf(price).ok_or(DexError::InvariantViolation)?;
            let (order, now_empty) = {
                let level = tree.borrow_leaf_mut(handle)?;
                let order = level.remove(order_id).ok_or(DexError::InvariantViolation)?;
                (order, level.is_empty())
            };
            if now_empty {
                tree.remove_leaf(handle)?;
            }
            order
        };
        self.index_remove(order.owner, order_id);

        if order.is_bid {
            let refund = Self::bid_lock_amount(order.price, order.quantity)?;
            self.custodian.unlock_quote(order.owner, refund)?;
        } else {
            self.custodian.unlock_base(order.owner, order.quantity)?;
        }

        match reason {
            RemoveReason::Cancelled => record_event_fn(MarketEvent::Cancel {
                pool_id: self.pool_id,
                order_id,
                owner: order.owner,
                price: order.price,
                base_quantity_removed: order.quantity,
            }),
            RemoveReason::Expired { now_ms } => record_event_fn(MarketEvent::Expire {
                pool_id: self.pool_id,
                order_id,
                owner: order.owner,
                price: order.price,
                base_quantity_removed: order.quantity,
                now_ms,
            }),
        }
        Ok(order)
    }

    #[inline(always)]
    pub(crate) fn custodian(&self) -> &Custodian {
        &self.custodian
    }

    #[inline(always)]
    pub(crate) fn custodian_mut(&mut self) -> &mut Custodian {
        &mut self.custodian
    }

    #[inline(always)]
    pub(crate) fn taker_fee_rate(&self) -> u64 {
        self.taker_fee_rate
    }

    #[inline(always)]
    pub(crate) fn maker_rebate_rate(&self) -> u64 {
        self.maker_rebate_rate
    }

    #[inline(always)]
    pub(crate) fn accumulated_fees(&self) -> u64 {
        self.accumulated_fees
    }

    #[inline(always)]
    pub(crate) fn accrue_fees(&mut self, amount: u64) -> Result<(), DexError> {
        self.accumulated_fees = math::checked_add(self.accumulated_fees, amount)?;
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn next_sequence_numbers(&self) -> (u64, u64) {
        (self.next_bid_sequence_number, self.next_ask_sequence_number)
    }

    #[inline(always)]
    pub(crate) fn open_orders_index(&self) -> &HashMap<AccountId, BTreeMap<u64, u64>> {
        &self.open_orders
    }
}
