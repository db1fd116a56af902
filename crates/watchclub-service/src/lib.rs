//! `watchclub-service`: the request-facing operations.
//!
//! [`WatchclubService`] validates input, enforces club state (open vs
//! started), runs the scheduler and hands notifications to the notifier
//! pool. All persistence goes through [`watchclub_storage::Storage`].

mod error;
pub mod service;
pub mod types;

pub use service::WatchclubService;
pub use types::{ClubDetails, NewClub, NewPick, StartedClub, LOGIN_ACK};
