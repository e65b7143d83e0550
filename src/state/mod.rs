pub mod custodian;
pub mod enums;
pub mod events;
pub(crate) mod inflight_order;
pub mod matching_engine_response;
pub mod order;
pub mod tick_level;

pub use enums::*;
pub use events::*;
pub use matching_engine_response::*;
pub use order::*;
