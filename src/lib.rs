//! A spot central limit order book with price/time priority and atomic
//! settlement.
//!
//! A [`Pool`] pairs a base and a quote asset and holds everything the market
//! needs: two crit-bit trees of price levels (bids and asks), the per-side
//! order-id allocator, a per-account index of resting orders, and a
//! custodian that segregates each account's available and locked funds.
//! Limit orders settle through custodian balances; market orders and swaps
//! settle through caller-supplied [`account::Coin`]s.
//!
//! Every public entry point is one atomic mutation: it validates first,
//! then acts, and an error return means the pool is unchanged. Matching is
//! straight-line code with no suspension points; serializing operations
//! against a pool is the host's responsibility.
//!
//! The host supplies the ambient collaborators (see [`account`]): a
//! monotonic millisecond clock passed as `now_ms`, capability issuance for
//! trading accounts, asset custody behind `Coin`, and — optionally — an
//! event sink passed as a closure to each mutating operation.

pub mod account;
pub mod critbit;
pub mod error;
pub mod math;
pub mod pool;
pub mod state;

pub use account::{AccountCap, AccountId, Asset, Coin};
pub use error::DexError;
pub use pool::{Pool, PoolStat};
pub use state::enums::{OrderRestriction, SelfMatchBehavior, Side};
pub use state::events::MarketEvent;
pub use state::matching_engine_response::{OrderExecution, PlacedOrder};
pub use state::order::{Order, MAX_BID_ORDER_ID, MIN_ASK_ORDER_ID, NO_EXPIRATION};
