use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;
use watchclub_core::types::{Club, Pick, ScheduledPick, User};

use crate::error::{Result, StorageError};
use crate::store::Storage;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    clubs: HashMap<String, Club>,
    picks: HashMap<String, Pick>,
    scheduled_picks: HashMap<String, ScheduledPick>,
}

/// Process-lifetime store. Everything is lost on exit.
///
/// One `RwLock` covers all four maps so cross-entity sequencing stays simple:
/// reads share the lock, any write is exclusive across every entity type.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".to_string()))
    }
}

fn insert_new<T: Clone>(
    map: &mut HashMap<String, T>,
    entity: &'static str,
    id: &str,
    value: &T,
) -> Result<()> {
    if map.contains_key(id) {
        return Err(StorageError::already_exists(entity, id));
    }
    map.insert(id.to_string(), value.clone());
    Ok(())
}

fn fetch<T: Clone>(map: &HashMap<String, T>, entity: &'static str, id: &str) -> Result<T> {
    map.get(id)
        .cloned()
        .ok_or_else(|| StorageError::not_found(entity, id))
}

fn remove<T>(map: &mut HashMap<String, T>, entity: &'static str, id: &str) -> Result<()> {
    map.remove(id)
        .map(|_| ())
        .ok_or_else(|| StorageError::not_found(entity, id))
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut t = self.write()?;
        insert_new(&mut t.users, "user", &user.id, user)?;
        debug!(user_id = %user.id, "user stored");
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<User> {
        fetch(&self.read()?.users, "user", id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", format!("email={email}")))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(users)
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        remove(&mut self.write()?.users, "user", id)
    }

    async fn create_club(&self, club: &Club) -> Result<()> {
        let mut t = self.write()?;
        insert_new(&mut t.clubs, "club", &club.id, club)?;
        debug!(club_id = %club.id, "club stored");
        Ok(())
    }

    async fn get_club(&self, id: &str) -> Result<Club> {
        fetch(&self.read()?.clubs, "club", id)
    }

    async fn list_clubs(&self) -> Result<Vec<Club>> {
        let mut clubs: Vec<Club> = self.read()?.clubs.values().cloned().collect();
        clubs.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(clubs)
    }

    async fn update_club(&self, club: &Club) -> Result<()> {
        let mut t = self.write()?;
        match t.clubs.get_mut(&club.id) {
            Some(slot) => {
                *slot = club.clone();
                Ok(())
            }
            None => Err(StorageError::not_found("club", &club.id)),
        }
    }

    async fn delete_club(&self, id: &str) -> Result<()> {
        remove(&mut self.write()?.clubs, "club", id)
    }

    async fn create_pick(&self, pick: &Pick) -> Result<()> {
        insert_new(&mut self.write()?.picks, "pick", &pick.id, pick)
    }

    async fn get_pick(&self, id: &str) -> Result<Pick> {
        fetch(&self.read()?.picks, "pick", id)
    }

    async fn list_picks(&self, club_id: &str) -> Result<Vec<Pick>> {
        let mut picks: Vec<Pick> = self
            .read()?
            .picks
            .values()
            .filter(|p| p.club_id == club_id)
            .cloned()
            .collect();
        picks.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(picks)
    }

    async fn delete_pick(&self, id: &str) -> Result<()> {
        remove(&mut self.write()?.picks, "pick", id)
    }

    async fn create_scheduled_pick(&self, scheduled: &ScheduledPick) -> Result<()> {
        insert_new(
            &mut self.write()?.scheduled_picks,
            "scheduled pick",
            &scheduled.id,
            scheduled,
        )
    }

    async fn get_scheduled_pick(&self, id: &str) -> Result<ScheduledPick> {
        fetch(&self.read()?.scheduled_picks, "scheduled pick", id)
    }

    async fn list_scheduled_picks(&self, club_id: &str) -> Result<Vec<ScheduledPick>> {
        let mut scheduled: Vec<ScheduledPick> = self
            .read()?
            .scheduled_picks
            .values()
            .filter(|s| s.club_id == club_id)
            .cloned()
            .collect();
        scheduled.sort_by_key(|s| s.sequence_number);
        Ok(scheduled)
    }

    async fn delete_scheduled_pick(&self, id: &str) -> Result<()> {
        remove(&mut self.write()?.scheduled_picks, "scheduled pick", id)
    }
}
