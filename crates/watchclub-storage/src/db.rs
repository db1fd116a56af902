use rusqlite::Connection;

use crate::error::Result;

/// Initialise the durable schema in `conn`. Safe to call on every startup;
/// CREATE IF NOT EXISTS makes it idempotent.
///
/// Every table is wide-opaque: the primary key plus one serialized `data`
/// blob. Club-scoped tables duplicate `club_id` purely so list-by-club can use
/// an index.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id      TEXT PRIMARY KEY NOT NULL,
            data    BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS clubs (
            id      TEXT PRIMARY KEY NOT NULL,
            data    BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS picks (
            id      TEXT PRIMARY KEY NOT NULL,
            club_id TEXT NOT NULL,
            data    BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_picks_club_id ON picks (club_id);

        CREATE TABLE IF NOT EXISTS scheduled_picks (
            id      TEXT PRIMARY KEY NOT NULL,
            club_id TEXT NOT NULL,
            data    BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scheduled_picks_club_id ON scheduled_picks (club_id);
        ",
    )?;
    Ok(())
}
