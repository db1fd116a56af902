//! Shared domain records, configuration and the request-level error taxonomy.

pub mod config;
pub mod error;
pub mod types;

pub use config::{QuantityPolicy, WatchclubConfig};
pub use error::{Result, WatchclubError};
pub use types::{Club, IntervalUnit, Pick, ScheduledPick, User};
