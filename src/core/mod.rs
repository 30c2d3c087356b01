//! Core types, configuration and ambient plumbing

pub mod cache;
pub mod clock;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;

// Re-export main types for cleaner imports
pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::{CurrencyCode, RateProvider, RateTable};
pub use error::{ConversionError, FetchError};
