use async_trait::async_trait;
use watchclub_core::types::{Club, Pick, ScheduledPick, User};

use crate::error::Result;

/// Persistence contract shared by every backend.
///
/// Each entity gets the same quartet: `create_*` fails with `AlreadyExists`
/// on a duplicate id, `get_*` and `delete_*` fail with `NotFound`, and the
/// list calls return an empty `Vec` rather than an error when nothing matches.
///
/// Cancellation is by dropping the returned future. Implementations must stay
/// consistent if that happens at any await point; a statement already handed
/// to the database may still complete.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend label used in logs (`"memory"`, `"sqlite"`).
    fn backend(&self) -> &'static str;

    async fn create_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: &str) -> Result<User>;
    /// Linear scan; `NotFound` when no user carries `email`.
    async fn get_user_by_email(&self, email: &str) -> Result<User>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn delete_user(&self, id: &str) -> Result<()>;

    async fn create_club(&self, club: &Club) -> Result<()>;
    async fn get_club(&self, id: &str) -> Result<Club>;
    async fn list_clubs(&self) -> Result<Vec<Club>>;
    /// Replace an existing club record in a single step.
    async fn update_club(&self, club: &Club) -> Result<()>;
    async fn delete_club(&self, id: &str) -> Result<()>;

    async fn create_pick(&self, pick: &Pick) -> Result<()>;
    async fn get_pick(&self, id: &str) -> Result<Pick>;
    async fn list_picks(&self, club_id: &str) -> Result<Vec<Pick>>;
    async fn delete_pick(&self, id: &str) -> Result<()>;

    async fn create_scheduled_pick(&self, scheduled: &ScheduledPick) -> Result<()>;
    async fn get_scheduled_pick(&self, id: &str) -> Result<ScheduledPick>;
    async fn list_scheduled_picks(&self, club_id: &str) -> Result<Vec<ScheduledPick>>;
    async fn delete_scheduled_pick(&self, id: &str) -> Result<()>;
}
