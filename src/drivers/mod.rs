//! Reference driver logic shared by adapters. Real pin access stays on
//! the adapter side; these types only compute when an output should be on.

pub mod slow_pwm;

pub use slow_pwm::SlowPwm;
