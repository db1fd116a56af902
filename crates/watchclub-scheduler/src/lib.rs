//! `watchclub-scheduler`: turns a club's unordered picks into a dated schedule.
//!
//! # Algorithm
//!
//! 1. Refuse clubs that already started, and empty pick sets.
//! 2. Shuffle a copy of the picks (Fisher–Yates) using an injected [`RngSource`].
//! 3. Slot `i` (0-based) gets sequence number `i + 1` and starts at
//!    `club.start_date + i * interval`.
//!
//! # Interval units
//!
//! | Unit          | One interval             |
//! |---------------|--------------------------|
//! | `Days`        | `quantity` × 24 h        |
//! | `Weeks`       | `quantity` × 7 days      |
//! | `Months`      | `quantity` × 30 days     |
//! | `Unspecified` | treated as `Weeks`       |

pub mod error;
pub mod rng;
pub mod schedule;

pub use error::{Result, ScheduleError};
pub use rng::{ClockSeeded, FixedSeed, RngSource};
pub use schedule::{
    club_interval, interval_duration, plan_schedule, resolve_quantity, slot_end,
    MAX_INTERVAL_QUANTITY,
};
