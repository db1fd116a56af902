use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a fresh record id (UUIDv7, time-sortable for easier log correlation).
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// A person who can join clubs and submit picks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique across all users; enforced by the service at creation time.
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Unit of the club's viewing interval.
///
/// Unknown serialized values decode as `Unspecified` so a newer writer never
/// breaks an older reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Days,
    #[default]
    Weeks,
    Months,
    #[serde(other)]
    Unspecified,
}

impl IntervalUnit {
    /// Collapse `Unspecified` to the default unit (weeks).
    pub fn normalized(self) -> Self {
        match self {
            IntervalUnit::Unspecified => IntervalUnit::Weeks,
            other => other,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntervalUnit::Days => "days",
            IntervalUnit::Weeks => "weeks",
            IntervalUnit::Months => "months",
            IntervalUnit::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

/// A viewing club.
///
/// `started` flips false -> true exactly once, when the schedule is generated.
/// After that the pick set is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub name: String,
    /// Join order is preserved; no duplicates.
    #[serde(default)]
    pub member_ids: Vec<String>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub started: bool,
    pub created_at: DateTime<Utc>,
    /// 0 means unlimited.
    #[serde(default)]
    pub max_picks_per_member: u32,
    #[serde(default = "default_interval_quantity")]
    pub interval_quantity: i32,
    #[serde(default)]
    pub interval_unit: IntervalUnit,
}

impl Club {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }
}

fn default_interval_quantity() -> i32 {
    1
}

/// A title submitted by a member for the club to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub id: String,
    pub club_id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One slot of a started club's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPick {
    pub id: String,
    pub club_id: String,
    /// 1-based position in the schedule.
    pub sequence_number: u32,
    pub start_date: DateTime<Utc>,
    pub pick: Pick,
}
