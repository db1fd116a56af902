use thiserror::Error;

/// Reasons a club cannot be scheduled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The club already has a schedule; scheduling happens exactly once.
    #[error("club already started: {club_id}")]
    AlreadyStarted { club_id: String },

    #[error("no picks to shuffle for club {club_id}")]
    NoPicks { club_id: String },

    /// Interval quantity was zero or negative and the policy rejects it, or
    /// exceeded the upper bound.
    #[error("invalid schedule interval quantity: {0}")]
    InvalidInterval(i32),

    /// A slot date falls outside the representable calendar range.
    #[error("schedule for club {club_id} runs past the supported date range")]
    OutOfRange { club_id: String },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
