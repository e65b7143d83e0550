use num_enum::IntoPrimitive;
use thiserror::Error;

/// Engine error taxonomy. Every error aborts the enclosing operation; the
/// engine guarantees no visible state change on abort.
///
/// The discriminants are stable and part of the public contract so that
/// hosts can surface them as numeric status codes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u32)]
pub enum DexError {
    #[error("Invalid price error")]
    InvalidPrice = 0,
    #[error("Invalid quantity error")]
    InvalidQuantity = 1,
    #[error("Insufficient funds error")]
    InsufficientFunds = 2,
    #[error("Invalid order id error")]
    InvalidOrderId = 3,
    #[error("Unauthorized error")]
    Unauthorized = 4,
    #[error("Order cannot be fully filled error")]
    OrderCannotBeFullyFilled = 5,
    #[error("Order cannot cross error")]
    OrderCannotCross = 6,
    #[error("Self match error")]
    SelfMatch = 7,
    #[error("Invalid expire timestamp error")]
    InvalidExpiration = 8,
    #[error("Arithmetic overflow or underflow error")]
    Arithmetic = 9,
    #[error("Internal invariant violation error")]
    InvariantViolation = 10,
    #[error("Invalid pool parameters error")]
    InvalidPoolParams = 11,
}
