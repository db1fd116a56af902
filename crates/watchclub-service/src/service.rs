use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use watchclub_core::config::QuantityPolicy;
use watchclub_core::types::{new_id, Club, Pick, ScheduledPick, User};
use watchclub_core::{Result, WatchclubError};
use watchclub_notify::{render_calendar, Notification, Notifier, NotifierStats};
use watchclub_scheduler::{plan_schedule, resolve_quantity, ClockSeeded, RngSource};
use watchclub_storage::{Storage, StorageError};

use crate::error::{schedule_err, storage_err};
use crate::types::{ClubDetails, NewClub, NewPick, StartedClub, LOGIN_ACK};

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(WatchclubError::InvalidArgument(format!("{field} is required")));
    }
    Ok(())
}

/// Request-level operations over a shared storage backend.
///
/// Writers touching one club (`join_club`, `add_pick`, `delete_pick`,
/// `start_club`) are serialized by a per-club async mutex, so the pick cap
/// and the single schedule per club hold under concurrent callers. Readers
/// take no service-level lock.
pub struct WatchclubService {
    storage: Arc<dyn Storage>,
    notifier: Notifier,
    base_url: String,
    policy: QuantityPolicy,
    rng: Box<dyn RngSource>,
    /// Entries are created on first write and kept for the process lifetime.
    club_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Held across the email check and the insert in `create_user`.
    user_create: Mutex<()>,
}

impl WatchclubService {
    pub fn new(storage: Arc<dyn Storage>, notifier: Notifier, base_url: impl Into<String>) -> Self {
        Self {
            storage,
            notifier,
            base_url: base_url.into(),
            policy: QuantityPolicy::default(),
            rng: Box::new(ClockSeeded),
            club_locks: DashMap::new(),
            user_create: Mutex::new(()),
        }
    }

    pub fn with_quantity_policy(mut self, policy: QuantityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rng_source(mut self, rng: impl RngSource + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn notifier_stats(&self) -> NotifierStats {
        self.notifier.stats()
    }

    fn club_lock(&self, club_id: &str) -> Arc<Mutex<()>> {
        self.club_locks
            .entry(club_id.to_string())
            .or_default()
            .clone()
    }

    // ---- users ----

    pub async fn create_user(&self, name: &str, email: &str) -> Result<User> {
        require(name, "name")?;
        require(email, "email")?;

        let _guard = self.user_create.lock().await;
        match self.storage.get_user_by_email(email).await {
            Ok(_) => {
                return Err(WatchclubError::AlreadyExists(
                    "email already registered".to_string(),
                ))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(storage_err(e)),
        }

        let user = User {
            id: new_id(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.storage.create_user(&user).await.map_err(storage_err)?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        require(user_id, "user_id")?;
        self.storage.get_user(user_id).await.map_err(storage_err)
    }

    // ---- clubs ----

    pub async fn create_club(&self, req: NewClub) -> Result<Club> {
        require(&req.name, "name")?;
        let start_date = req
            .start_date
            .ok_or_else(|| WatchclubError::InvalidArgument("start_date is required".to_string()))?;
        let max_picks_per_member = u32::try_from(req.max_picks_per_member).map_err(|_| {
            WatchclubError::InvalidArgument("max_picks_per_member cannot be negative".to_string())
        })?;
        let interval_quantity =
            resolve_quantity(req.interval_quantity, self.policy).map_err(schedule_err)?;

        let club = Club {
            id: new_id(),
            name: req.name,
            member_ids: Vec::new(),
            start_date,
            started: false,
            created_at: Utc::now(),
            max_picks_per_member,
            interval_quantity,
            interval_unit: req.interval_unit.normalized(),
        };
        self.storage.create_club(&club).await.map_err(storage_err)?;
        info!(
            club_id = %club.id,
            interval_quantity,
            interval_unit = %club.interval_unit,
            "club created"
        );
        Ok(club)
    }

    pub async fn join_club(&self, club_id: &str, user_id: &str) -> Result<Club> {
        require(club_id, "club_id")?;
        require(user_id, "user_id")?;

        let lock = self.club_lock(club_id);
        let _guard = lock.lock().await;

        let mut club = self.storage.get_club(club_id).await.map_err(storage_err)?;
        self.storage.get_user(user_id).await.map_err(storage_err)?;
        if club.is_member(user_id) {
            return Err(WatchclubError::AlreadyExists(
                "user already in club".to_string(),
            ));
        }

        club.member_ids.push(user_id.to_string());
        self.storage.update_club(&club).await.map_err(storage_err)?;
        debug!(club_id, user_id, members = club.member_ids.len(), "member joined");
        Ok(club)
    }

    /// Club with members resolved in join order. A member id that no longer
    /// resolves is reported as an internal error.
    pub async fn get_club(&self, club_id: &str) -> Result<ClubDetails> {
        require(club_id, "club_id")?;
        let club = self.storage.get_club(club_id).await.map_err(storage_err)?;

        let mut members = Vec::with_capacity(club.member_ids.len());
        for member_id in &club.member_ids {
            match self.storage.get_user(member_id).await {
                Ok(user) => members.push(user),
                Err(e) => {
                    error!(club_id, member_id = %member_id, error = %e, "club member unresolvable");
                    return Err(WatchclubError::Internal(format!(
                        "failed to load member {member_id}"
                    )));
                }
            }
        }

        let picks = self.storage.list_picks(club_id).await.map_err(storage_err)?;
        Ok(ClubDetails {
            club,
            members,
            picks,
        })
    }

    // ---- picks ----

    pub async fn add_pick(&self, req: NewPick) -> Result<Pick> {
        require(&req.club_id, "club_id")?;
        require(&req.user_id, "user_id")?;
        require(&req.title, "title")?;

        let lock = self.club_lock(&req.club_id);
        let _guard = lock.lock().await;

        let club = self.storage.get_club(&req.club_id).await.map_err(storage_err)?;
        if club.started {
            return Err(WatchclubError::FailedPrecondition(
                "cannot add picks after club has started".to_string(),
            ));
        }
        self.storage.get_user(&req.user_id).await.map_err(storage_err)?;

        if club.max_picks_per_member > 0 {
            let existing = self.storage.list_picks(&club.id).await.map_err(storage_err)?;
            let mine = existing.iter().filter(|p| p.user_id == req.user_id).count();
            if mine >= club.max_picks_per_member as usize {
                return Err(WatchclubError::FailedPrecondition(format!(
                    "user has already added maximum number of picks ({})",
                    club.max_picks_per_member
                )));
            }
        }

        let pick = Pick {
            id: new_id(),
            club_id: req.club_id,
            user_id: req.user_id,
            title: req.title,
            year: req.year,
            notes: req.notes,
            link: req.link,
            created_at: Utc::now(),
        };
        self.storage.create_pick(&pick).await.map_err(storage_err)?;
        debug!(club_id = %pick.club_id, pick_id = %pick.id, "pick added");
        Ok(pick)
    }

    /// Owner-only, and only before the club starts.
    pub async fn delete_pick(&self, pick_id: &str, user_id: &str) -> Result<()> {
        require(pick_id, "pick_id")?;
        require(user_id, "user_id")?;

        let pick = self.storage.get_pick(pick_id).await.map_err(storage_err)?;
        if pick.user_id != user_id {
            return Err(WatchclubError::PermissionDenied(
                "you can only delete your own picks".to_string(),
            ));
        }

        let lock = self.club_lock(&pick.club_id);
        let _guard = lock.lock().await;

        let club = self.storage.get_club(&pick.club_id).await.map_err(storage_err)?;
        if club.started {
            return Err(WatchclubError::FailedPrecondition(
                "cannot delete picks after club has started".to_string(),
            ));
        }
        self.storage.delete_pick(pick_id).await.map_err(storage_err)?;
        debug!(club_id = %club.id, pick_id, "pick deleted");
        Ok(())
    }

    // ---- scheduling ----

    /// Shuffle the club's picks into a dated schedule, persist it, mark the
    /// club started and queue a notification per member.
    ///
    /// A storage failure while persisting slots aborts the request; slots
    /// already written stay written and the count is logged.
    pub async fn start_club(&self, club_id: &str) -> Result<StartedClub> {
        require(club_id, "club_id")?;

        let lock = self.club_lock(club_id);
        let _guard = lock.lock().await;

        let mut club = self.storage.get_club(club_id).await.map_err(storage_err)?;
        if club.started {
            return Err(WatchclubError::FailedPrecondition(
                "club already started".to_string(),
            ));
        }
        let picks = self.storage.list_picks(club_id).await.map_err(storage_err)?;

        let schedule = {
            let mut rng = self.rng.rng();
            plan_schedule(&club, &picks, &mut *rng, self.policy).map_err(schedule_err)?
        };

        for (persisted, slot) in schedule.iter().enumerate() {
            if let Err(e) = self.storage.create_scheduled_pick(slot).await {
                error!(
                    club_id,
                    persisted,
                    total = schedule.len(),
                    error = %e,
                    "schedule persistence failed part way"
                );
                return Err(storage_err(e));
            }
        }

        club.started = true;
        self.storage.update_club(&club).await.map_err(storage_err)?;
        info!(club_id, slots = schedule.len(), "club started");

        self.notify_club_started(&club, &schedule).await;

        Ok(StartedClub { club, schedule })
    }

    async fn notify_club_started(&self, club: &Club, schedule: &[ScheduledPick]) {
        let mut users: HashMap<String, User> = HashMap::with_capacity(club.member_ids.len());
        for member_id in &club.member_ids {
            match self.storage.get_user(member_id).await {
                Ok(user) => {
                    users.insert(user.id.clone(), user);
                }
                Err(e) => warn!(member_id = %member_id, error = %e, "skipping notification"),
            }
        }

        let calendar: Arc<[u8]> = Arc::from(render_calendar(club, schedule, &users, &self.base_url));

        let mut queued = 0usize;
        for member_id in &club.member_ids {
            let Some(user) = users.get(member_id) else {
                continue;
            };
            if user.email.is_empty() {
                warn!(user_id = %user.id, "user has no email address, skipping");
                continue;
            }
            let queued_ok = self
                .notifier
                .enqueue(Notification::ClubStarted {
                    to: user.email.clone(),
                    user_name: user.name.clone(),
                    club_name: club.name.clone(),
                    club_id: club.id.clone(),
                    calendar: Arc::clone(&calendar),
                })
                .is_ok();
            if queued_ok {
                queued += 1;
            }
        }
        info!(
            club_id = %club.id,
            queued,
            members = club.member_ids.len(),
            calendar_bytes = calendar.len(),
            "club started notifications queued"
        );
    }

    /// Scheduled picks for a club, by sequence number. Empty before start.
    pub async fn get_scheduled_picks(&self, club_id: &str) -> Result<Vec<ScheduledPick>> {
        require(club_id, "club_id")?;
        self.storage.get_club(club_id).await.map_err(storage_err)?;
        let mut scheduled = self
            .storage
            .list_scheduled_picks(club_id)
            .await
            .map_err(storage_err)?;
        scheduled.sort_by_key(|s| s.sequence_number);
        Ok(scheduled)
    }

    /// iCalendar text for a started club, with picker names from every user.
    pub async fn get_club_calendar(&self, club_id: &str) -> Result<String> {
        require(club_id, "club_id")?;
        let club = self.storage.get_club(club_id).await.map_err(storage_err)?;
        if !club.started {
            return Err(WatchclubError::FailedPrecondition(
                "club must be started to generate calendar".to_string(),
            ));
        }

        let scheduled = self.get_scheduled_picks(club_id).await?;
        let users: HashMap<String, User> = self
            .storage
            .list_users()
            .await
            .map_err(storage_err)?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        String::from_utf8(render_calendar(&club, &scheduled, &users, &self.base_url))
            .map_err(|e| WatchclubError::Internal(format!("calendar encoding: {e}")))
    }

    // ---- login ----

    /// Queue a login link for `email` if it belongs to a user. The answer is
    /// the same either way so the call does not reveal which addresses are registered.
    pub async fn send_login_email(&self, email: &str) -> Result<&'static str> {
        require(email, "email")?;

        let user = match self.storage.get_user_by_email(email).await {
            Ok(user) => user,
            Err(StorageError::NotFound { .. }) => {
                debug!("login requested for unknown email");
                return Ok(LOGIN_ACK);
            }
            Err(e) => {
                error!(error = %e, "login lookup failed");
                return Ok(LOGIN_ACK);
            }
        };

        // enqueue logs its own failures.
        let _ = self.notifier.enqueue(Notification::Login {
            to: user.email,
            user_name: user.name,
            user_id: user.id,
        });
        Ok(LOGIN_ACK)
    }
}
