use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use watchclub_core::types::{Club, IntervalUnit, Pick, ScheduledPick, User};

/// Returned by `send_login_email` whether or not the address is registered.
pub const LOGIN_ACK: &str = "If an account with that email exists, a login link has been sent.";

/// Input to `create_club`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClub {
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    /// Negative is rejected; 0 means unlimited.
    #[serde(default)]
    pub max_picks_per_member: i32,
    #[serde(default)]
    pub interval_quantity: i32,
    #[serde(default)]
    pub interval_unit: IntervalUnit,
}

/// Input to `add_pick`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPick {
    pub club_id: String,
    pub user_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub notes: Option<String>,
    pub link: Option<String>,
}

/// A club with its members resolved, in join order, and its current picks.
#[derive(Debug, Clone, Serialize)]
pub struct ClubDetails {
    pub club: Club,
    pub members: Vec<User>,
    pub picks: Vec<Pick>,
}

/// Result of `start_club`: the club with `started` set and its schedule.
#[derive(Debug, Clone, Serialize)]
pub struct StartedClub {
    pub club: Club,
    /// Ordered by sequence number.
    pub schedule: Vec<ScheduledPick>,
}
