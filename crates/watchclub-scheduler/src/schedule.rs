use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};
use watchclub_core::config::QuantityPolicy;
use watchclub_core::types::{new_id, Club, IntervalUnit, Pick, ScheduledPick};

use crate::error::{Result, ScheduleError};

/// Length of one schedule slot.
///
/// Months are a fixed 30 days, not calendar-aware. `Unspecified` counts as
/// weeks.
pub fn interval_duration(quantity: i32, unit: IntervalUnit) -> Duration {
    let days_per_unit: i64 = match unit {
        IntervalUnit::Days => 1,
        IntervalUnit::Weeks | IntervalUnit::Unspecified => 7,
        IntervalUnit::Months => 30,
    };
    Duration::days(quantity as i64 * days_per_unit)
}

/// Largest accepted interval quantity, whatever the unit.
pub const MAX_INTERVAL_QUANTITY: i32 = 1000;

/// Apply `policy` to a stored interval quantity. Quantities above
/// [`MAX_INTERVAL_QUANTITY`] are always rejected.
pub fn resolve_quantity(quantity: i32, policy: QuantityPolicy) -> Result<i32> {
    if quantity > MAX_INTERVAL_QUANTITY {
        return Err(ScheduleError::InvalidInterval(quantity));
    }
    if quantity > 0 {
        return Ok(quantity);
    }
    match policy {
        QuantityPolicy::DefaultToOne => {
            warn!(quantity, "non-positive interval quantity, defaulting to 1");
            Ok(1)
        }
        QuantityPolicy::Reject => Err(ScheduleError::InvalidInterval(quantity)),
    }
}

/// Slot length for `club` under `policy`.
pub fn club_interval(club: &Club, policy: QuantityPolicy) -> Result<Duration> {
    let quantity = resolve_quantity(club.interval_quantity, policy)?;
    Ok(interval_duration(quantity, club.interval_unit))
}

/// End of the slot beginning at `start`. Used for calendar event bounds, so a
/// bad quantity is clamped rather than rejected. `None` when the end is past
/// the representable date range.
pub fn slot_end(start: DateTime<Utc>, club: &Club) -> Option<DateTime<Utc>> {
    let quantity = club.interval_quantity.clamp(1, MAX_INTERVAL_QUANTITY);
    start.checked_add_signed(interval_duration(quantity, club.interval_unit))
}

/// Start of slot `index` (0-based), or `None` on overflow.
fn slot_start(club: &Club, interval: Duration, index: usize) -> Option<DateTime<Utc>> {
    let offset = interval.checked_mul(i32::try_from(index).ok()?)?;
    club.start_date.checked_add_signed(offset)
}

/// Shuffle `picks` and lay them out one interval apart from the club's start
/// date.
///
/// The returned records have sequence numbers `1..=N` in slot order. Nothing is
/// persisted here; the caller stores the records and flips `started`.
pub fn plan_schedule<R: Rng + ?Sized>(
    club: &Club,
    picks: &[Pick],
    rng: &mut R,
    policy: QuantityPolicy,
) -> Result<Vec<ScheduledPick>> {
    if club.started {
        return Err(ScheduleError::AlreadyStarted {
            club_id: club.id.clone(),
        });
    }
    if picks.is_empty() {
        return Err(ScheduleError::NoPicks {
            club_id: club.id.clone(),
        });
    }
    let interval = club_interval(club, policy)?;

    let mut shuffled = picks.to_vec();
    shuffled.shuffle(rng);

    let schedule = shuffled
        .into_iter()
        .enumerate()
        .map(|(i, pick)| {
            let start_date = slot_start(club, interval, i).ok_or_else(|| {
                ScheduleError::OutOfRange {
                    club_id: club.id.clone(),
                }
            })?;
            Ok(ScheduledPick {
                id: new_id(),
                club_id: club.id.clone(),
                sequence_number: (i + 1) as u32,
                start_date,
                pick,
            })
        })
        .collect::<Result<Vec<ScheduledPick>>>()?;

    debug!(
        club_id = %club.id,
        slots = schedule.len(),
        interval_days = interval.num_days(),
        "schedule planned"
    );
    Ok(schedule)
}
