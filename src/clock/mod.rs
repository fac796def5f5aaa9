pub mod estimator;
pub mod schedule;

pub use estimator::{ClockEstimator, ClockSample, local_now_ms};
pub use schedule::PingSchedule;
