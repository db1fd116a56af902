use std::collections::HashMap;

use chrono::{DateTime, Utc};
use watchclub_core::types::{Club, ScheduledPick, User};
use watchclub_scheduler::slot_end;

use crate::sender::app_link;

/// Render a club's schedule as an iCalendar file, one all-day event per slot.
///
/// `users` maps user id -> user and only supplies picker names; missing
/// entries print as "Unknown".
pub fn render_calendar(
    club: &Club,
    scheduled: &[ScheduledPick],
    users: &HashMap<String, User>,
    base_url: &str,
) -> Vec<u8> {
    render_calendar_at(club, scheduled, users, base_url, Utc::now())
}

/// Same as [`render_calendar`] with an explicit DTSTAMP.
pub fn render_calendar_at(
    club: &Club,
    scheduled: &[ScheduledPick],
    users: &HashMap<String, User>,
    base_url: &str,
    stamp: DateTime<Utc>,
) -> Vec<u8> {
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//WatchClub//Schedule//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{} - Schedule", escape_text(&club.name)),
        "X-WR-TIMEZONE:UTC".to_string(),
    ];

    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();

    for slot in scheduled {
        let pick = &slot.pick;
        let picker = users
            .get(&pick.user_id)
            .map(|u| u.name.as_str())
            .unwrap_or("Unknown");

        let mut description = format!("Picked by {}", escape_text(picker));
        if let Some(notes) = pick.notes.as_deref().filter(|n| !n.is_empty()) {
            description.push_str("\\n\\nNotes: ");
            description.push_str(&escape_text(notes));
        }
        description.push_str("\\n\\nView details: ");
        description.push_str(&app_link(
            base_url,
            &format!("club/{}/pick/{}", club.id, pick.id),
        ));

        let mut summary = escape_text(&pick.title);
        if let Some(year) = pick.year.filter(|y| *y > 0) {
            summary.push_str(&format!(" ({year})"));
        }

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@watchclub", pick.id));
        lines.push(format!("DTSTAMP:{dtstamp}"));
        lines.push(format!("DTSTART;VALUE=DATE:{}", slot.start_date.format("%Y%m%d")));
        // Omitted when the end falls past the date range.
        if let Some(end) = slot_end(slot.start_date, club) {
            lines.push(format!("DTEND;VALUE=DATE:{}", end.format("%Y%m%d")));
        }
        lines.push(format!("SUMMARY:{summary}"));
        lines.push(format!("DESCRIPTION:{description}"));
        if let Some(link) = pick.link.as_deref().filter(|l| !l.is_empty()) {
            let link = escape_text(link);
            lines.push(format!("LOCATION:{link}"));
            lines.push(format!("URL:{link}"));
        }
        lines.push("TRANSP:TRANSPARENT".to_string());
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out.into_bytes()
}

/// Escape an iCalendar TEXT value.
pub fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace('\n', "\\n")
        .replace('\r', "")
}
