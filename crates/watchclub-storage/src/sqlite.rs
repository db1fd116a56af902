use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};
use watchclub_core::types::{Club, Pick, ScheduledPick, User};

use crate::codec::{decode, encode};
use crate::db::init_db;
use crate::error::{Result, StorageError};
use crate::store::Storage;

/// Table name plus the entity label used in error messages.
#[derive(Clone, Copy)]
struct Table {
    name: &'static str,
    entity: &'static str,
}

const USERS: Table = Table { name: "users", entity: "user" };
const CLUBS: Table = Table { name: "clubs", entity: "club" };
const PICKS: Table = Table { name: "picks", entity: "pick" };
const SCHEDULED_PICKS: Table = Table {
    name: "scheduled_picks",
    entity: "scheduled pick",
};

/// Durable backend: a single SQLite file, one opaque blob per record.
///
/// Wraps one connection in a `Mutex` and runs every statement on the blocking
/// pool. Dropping the returned future abandons the wait; a statement that has
/// already started still runs to completion. Each call is its own implicit
/// transaction.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the database file at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening SQLite storage");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// Private in-memory database; handy for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Internal("sqlite connection lock poisoned".to_string()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("storage task failed: {e}")))?
    }

    async fn insert<T: Serialize + Sync>(
        &self,
        table: Table,
        id: &str,
        club_id: Option<&str>,
        record: &T,
    ) -> Result<()> {
        let blob = encode(record)?;
        let id = id.to_string();
        let club_id = club_id.map(str::to_string);
        self.run(move |conn| {
            let res = match &club_id {
                Some(club_id) => conn.execute(
                    &format!("INSERT INTO {} (id, club_id, data) VALUES (?1, ?2, ?3)", table.name),
                    params![id, club_id, blob],
                ),
                None => conn.execute(
                    &format!("INSERT INTO {} (id, data) VALUES (?1, ?2)", table.name),
                    params![id, blob],
                ),
            };
            match res {
                Ok(_) => {
                    debug!(table = table.name, %id, "row inserted");
                    Ok(())
                }
                Err(rusqlite::Error::SqliteFailure(f, _))
                    if f.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StorageError::already_exists(table.entity, id))
                }
                Err(e) => Err(StorageError::Database(e)),
            }
        })
        .await
    }

    async fn select_one<T>(&self, table: Table, id: &str) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let id = id.to_string();
        self.run(move |conn| {
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    &format!("SELECT data FROM {} WHERE id = ?1", table.name),
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            match blob {
                Some(blob) => decode(&blob),
                None => Err(StorageError::not_found(table.entity, id)),
            }
        })
        .await
    }

    /// Decode every row, failing on the first undecodable blob.
    async fn select_many<T>(&self, table: Table, club_id: Option<&str>) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let club_id = club_id.map(str::to_string);
        self.run(move |conn| {
            let blobs: Vec<Vec<u8>> = match &club_id {
                Some(club_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT data FROM {} WHERE club_id = ?1 ORDER BY rowid",
                        table.name
                    ))?;
                    let rows = stmt.query_map(params![club_id], |row| row.get(0))?;
                    let blobs = rows.collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                    blobs
                }
                None => {
                    let mut stmt =
                        conn.prepare(&format!("SELECT data FROM {} ORDER BY rowid", table.name))?;
                    let rows = stmt.query_map([], |row| row.get(0))?;
                    let blobs = rows.collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                    blobs
                }
            };
            blobs.iter().map(|b| decode(b)).collect()
        })
        .await
    }

    async fn delete(&self, table: Table, id: &str) -> Result<()> {
        let id = id.to_string();
        self.run(move |conn| {
            let n = conn.execute(
                &format!("DELETE FROM {} WHERE id = ?1", table.name),
                params![id],
            )?;
            if n == 0 {
                return Err(StorageError::not_found(table.entity, id));
            }
            debug!(table = table.name, %id, "row deleted");
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.insert(USERS, &user.id, None, user).await
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        self.select_one(USERS, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = email.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare("SELECT id, data FROM users ORDER BY rowid")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let blob: Vec<u8> = row.get(1)?;
                match decode::<User>(&blob) {
                    Ok(user) if user.email == email => return Ok(user),
                    Ok(_) => {}
                    Err(e) => {
                        let id: String = row.get(0)?;
                        warn!(user_id = %id, error = %e, "skipping undecodable user row");
                    }
                }
            }
            Err(StorageError::not_found("user", format!("email={email}")))
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.select_many(USERS, None).await
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        self.delete(USERS, id).await
    }

    async fn create_club(&self, club: &Club) -> Result<()> {
        self.insert(CLUBS, &club.id, None, club).await
    }

    async fn get_club(&self, id: &str) -> Result<Club> {
        self.select_one(CLUBS, id).await
    }

    async fn list_clubs(&self) -> Result<Vec<Club>> {
        self.select_many(CLUBS, None).await
    }

    async fn update_club(&self, club: &Club) -> Result<()> {
        let blob = encode(club)?;
        let id = club.id.clone();
        self.run(move |conn| {
            let n = conn.execute("UPDATE clubs SET data = ?2 WHERE id = ?1", params![id, blob])?;
            if n == 0 {
                return Err(StorageError::not_found(CLUBS.entity, id));
            }
            debug!(club_id = %id, "club updated");
            Ok(())
        })
        .await
    }

    async fn delete_club(&self, id: &str) -> Result<()> {
        self.delete(CLUBS, id).await
    }

    async fn create_pick(&self, pick: &Pick) -> Result<()> {
        self.insert(PICKS, &pick.id, Some(&pick.club_id), pick).await
    }

    async fn get_pick(&self, id: &str) -> Result<Pick> {
        self.select_one(PICKS, id).await
    }

    async fn list_picks(&self, club_id: &str) -> Result<Vec<Pick>> {
        self.select_many(PICKS, Some(club_id)).await
    }

    async fn delete_pick(&self, id: &str) -> Result<()> {
        self.delete(PICKS, id).await
    }

    async fn create_scheduled_pick(&self, scheduled: &ScheduledPick) -> Result<()> {
        self.insert(
            SCHEDULED_PICKS,
            &scheduled.id,
            Some(&scheduled.club_id),
            scheduled,
        )
        .await
    }

    async fn get_scheduled_pick(&self, id: &str) -> Result<ScheduledPick> {
        self.select_one(SCHEDULED_PICKS, id).await
    }

    async fn list_scheduled_picks(&self, club_id: &str) -> Result<Vec<ScheduledPick>> {
        self.select_many(SCHEDULED_PICKS, Some(club_id)).await
    }

    async fn delete_scheduled_pick(&self, id: &str) -> Result<()> {
        self.delete(SCHEDULED_PICKS, id).await
    }
}
