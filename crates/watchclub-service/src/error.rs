use tracing::error;
use watchclub_core::WatchclubError;
use watchclub_scheduler::ScheduleError;
use watchclub_storage::StorageError;

/// Map a backend error onto the request taxonomy. Only the caller-attributable
/// variants keep their message; backend details are logged and replaced.
pub(crate) fn storage_err(err: StorageError) -> WatchclubError {
    match err {
        e @ StorageError::NotFound { .. } => WatchclubError::NotFound(e.to_string()),
        e @ StorageError::AlreadyExists { .. } => WatchclubError::AlreadyExists(e.to_string()),
        e => {
            error!(error = %e, "storage failure");
            WatchclubError::Internal("storage failure".to_string())
        }
    }
}

pub(crate) fn schedule_err(err: ScheduleError) -> WatchclubError {
    match err {
        e @ (ScheduleError::AlreadyStarted { .. } | ScheduleError::NoPicks { .. }) => {
            WatchclubError::FailedPrecondition(e.to_string())
        }
        e @ (ScheduleError::InvalidInterval(_) | ScheduleError::OutOfRange { .. }) => {
            WatchclubError::InvalidArgument(e.to_string())
        }
    }
}
