pub mod shutdown;
pub mod time;
pub mod types;
pub mod validations;

pub use time::{Clock, ManualClock, SharedClock, SystemClock};
pub use types::*;
