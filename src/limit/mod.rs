//! Admission logic and time handling.

mod clock;
mod limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::FrequencyLimiter;
