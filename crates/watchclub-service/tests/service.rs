use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures_util::future::join_all;
use rand::seq::SliceRandom;
use watchclub_core::config::{NotifierConfig, QuantityPolicy};
use watchclub_core::types::IntervalUnit;
use watchclub_core::WatchclubError;
use watchclub_notify::{MailSender, Notifier, NotifierPool};
use watchclub_scheduler::{FixedSeed, RngSource};
use watchclub_service::{NewClub, NewPick, WatchclubService, LOGIN_ACK};
use watchclub_storage::MemoryStorage;

#[derive(Default)]
struct Recorder {
    logins: Mutex<Vec<String>>,
    started: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl MailSender for Recorder {
    async fn send_login(
        &self,
        to: &str,
        _user_name: &str,
        _user_id: &str,
        _base_url: &str,
    ) -> watchclub_notify::Result<()> {
        self.logins.lock().unwrap().push(to.to_string());
        Ok(())
    }

    async fn send_club_started(
        &self,
        to: &str,
        _user_name: &str,
        _club_name: &str,
        _club_id: &str,
        _base_url: &str,
        calendar: &[u8],
    ) -> watchclub_notify::Result<()> {
        self.started.lock().unwrap().push((to.to_string(), calendar.len()));
        Ok(())
    }
}

struct Harness {
    svc: Arc<WatchclubService>,
    pool: NotifierPool,
    recorder: Arc<Recorder>,
}

fn harness_with(policy: QuantityPolicy) -> Harness {
    let recorder = Arc::new(Recorder::default());
    let config = NotifierConfig {
        workers: 2,
        queue_capacity: 64,
        max_retries: 0,
        initial_backoff_ms: 1,
        max_backoff_ms: 1,
    };
    let (notifier, pool) = Notifier::start(recorder.clone(), "http://localhost:3000/", &config);
    let svc = WatchclubService::new(
        Arc::new(MemoryStorage::new()),
        notifier,
        "http://localhost:3000/",
    )
    .with_quantity_policy(policy)
    .with_rng_source(FixedSeed(11));
    Harness {
        svc: Arc::new(svc),
        pool,
        recorder,
    }
}

fn harness() -> Harness {
    harness_with(QuantityPolicy::DefaultToOne)
}

fn new_club(max_picks: i32) -> NewClub {
    NewClub {
        name: "Friday Films".to_string(),
        start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        max_picks_per_member: max_picks,
        interval_quantity: 1,
        interval_unit: IntervalUnit::Weeks,
    }
}

fn new_pick(club_id: &str, user_id: &str, title: &str) -> NewPick {
    NewPick {
        club_id: club_id.to_string(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_user_requires_fields_and_unique_email() {
    let h = harness();
    let err = h.svc.create_user("", "a@example.com").await.unwrap_err();
    assert!(matches!(err, WatchclubError::InvalidArgument(_)));

    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    assert_eq!(h.svc.get_user(&ada.id).await.unwrap(), ada);

    let err = h.svc.create_user("Imposter", "ada@example.com").await.unwrap_err();
    assert_eq!(err.code(), "ALREADY_EXISTS");

    let err = h.svc.get_user("nope").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_with_same_email_admit_one() {
    let h = harness();
    let tasks = (0..10).map(|i| {
        let svc = h.svc.clone();
        tokio::spawn(async move { svc.create_user(&format!("u{i}"), "same@example.com").await })
    });
    let ok = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn create_club_validates_and_normalizes() {
    let h = harness();
    let mut req = new_club(-1);
    assert_eq!(h.svc.create_club(req.clone()).await.unwrap_err().code(), "INVALID_ARGUMENT");

    req.max_picks_per_member = 0;
    req.interval_unit = IntervalUnit::Unspecified;
    req.interval_quantity = 0;
    let club = h.svc.create_club(req.clone()).await.unwrap();
    assert_eq!(club.max_picks_per_member, 0);
    assert_eq!(club.interval_unit, IntervalUnit::Weeks);
    assert_eq!(club.interval_quantity, 1);
    assert!(club.member_ids.is_empty());
    assert!(!club.started);

    req.start_date = None;
    assert_eq!(h.svc.create_club(req).await.unwrap_err().code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn oversized_interval_cannot_be_created() {
    let h = harness();
    let mut req = new_club(1);
    req.interval_quantity = 10_000_000;
    req.interval_unit = IntervalUnit::Months;
    assert_eq!(h.svc.create_club(req).await.unwrap_err().code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn schedule_past_the_date_range_is_rejected_cleanly() {
    let h = harness();
    let mut req = new_club(0);
    req.start_date = Some(chrono::DateTime::<Utc>::MAX_UTC - chrono::Duration::days(3));
    let club = h.svc.create_club(req).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    for title in ["A", "B"] {
        h.svc.add_pick(new_pick(&club.id, &ada.id, title)).await.unwrap();
    }

    let err = h.svc.start_club(&club.id).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");
    assert!(!h.svc.get_club(&club.id).await.unwrap().club.started);
    assert!(h.svc.get_scheduled_picks(&club.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_quantity_rejected_under_strict_policy() {
    let h = harness_with(QuantityPolicy::Reject);
    let mut req = new_club(1);
    req.interval_quantity = 0;
    assert_eq!(h.svc.create_club(req).await.unwrap_err().code(), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn join_club_appends_once() {
    let h = harness();
    let club = h.svc.create_club(new_club(1)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    let bob = h.svc.create_user("Bob", "bob@example.com").await.unwrap();

    h.svc.join_club(&club.id, &ada.id).await.unwrap();
    let joined = h.svc.join_club(&club.id, &bob.id).await.unwrap();
    assert_eq!(joined.member_ids, vec![ada.id.clone(), bob.id.clone()]);

    assert_eq!(h.svc.join_club(&club.id, &ada.id).await.unwrap_err().code(), "ALREADY_EXISTS");
    assert_eq!(h.svc.join_club(&club.id, "ghost").await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(h.svc.join_club("ghost", &ada.id).await.unwrap_err().code(), "NOT_FOUND");

    let details = h.svc.get_club(&club.id).await.unwrap();
    let names: Vec<_> = details.members.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Bob"]);
}

#[tokio::test]
async fn pick_cap_is_enforced_and_zero_is_unlimited() {
    let h = harness();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();

    let capped = h.svc.create_club(new_club(2)).await.unwrap();
    h.svc.add_pick(new_pick(&capped.id, &ada.id, "A")).await.unwrap();
    h.svc.add_pick(new_pick(&capped.id, &ada.id, "B")).await.unwrap();
    let err = h.svc.add_pick(new_pick(&capped.id, &ada.id, "C")).await.unwrap_err();
    assert_eq!(err.code(), "FAILED_PRECONDITION");

    let open = h.svc.create_club(new_club(0)).await.unwrap();
    for i in 0..15 {
        h.svc
            .add_pick(new_pick(&open.id, &ada.id, &format!("t{i}")))
            .await
            .unwrap();
    }
    assert_eq!(h.svc.get_club(&open.id).await.unwrap().picks.len(), 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_add_pick_loses_nothing() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();

    let tasks = (0..100).map(|i| {
        let svc = h.svc.clone();
        let pick = new_pick(&club.id, &ada.id, &format!("title {i}"));
        tokio::spawn(async move { svc.add_pick(pick).await })
    });
    let picks: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let ids: HashSet<_> = picks.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids.len(), 100);
    assert_eq!(h.svc.get_club(&club.id).await.unwrap().picks.len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_add_pick_respects_cap() {
    let h = harness();
    let club = h.svc.create_club(new_club(1)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();

    let tasks = (0..20).map(|i| {
        let svc = h.svc.clone();
        let pick = new_pick(&club.id, &ada.id, &format!("title {i}"));
        tokio::spawn(async move { svc.add_pick(pick).await })
    });
    let ok = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn delete_pick_owner_only_and_before_start() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    let bob = h.svc.create_user("Bob", "bob@example.com").await.unwrap();

    let a1 = h.svc.add_pick(new_pick(&club.id, &ada.id, "A1")).await.unwrap();
    let a2 = h.svc.add_pick(new_pick(&club.id, &ada.id, "A2")).await.unwrap();

    let err = h.svc.delete_pick(&a1.id, &bob.id).await.unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    h.svc.delete_pick(&a1.id, &ada.id).await.unwrap();
    assert_eq!(h.svc.delete_pick(&a1.id, &ada.id).await.unwrap_err().code(), "NOT_FOUND");

    h.svc.start_club(&club.id).await.unwrap();
    let err = h.svc.delete_pick(&a2.id, &ada.id).await.unwrap_err();
    assert_eq!(err.code(), "FAILED_PRECONDITION");
    let err = h.svc.add_pick(new_pick(&club.id, &ada.id, "late")).await.unwrap_err();
    assert_eq!(err.code(), "FAILED_PRECONDITION");
}

#[tokio::test]
async fn start_club_schedules_once() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    for title in ["A", "B", "C"] {
        h.svc.add_pick(new_pick(&club.id, &ada.id, title)).await.unwrap();
    }

    let started = h.svc.start_club(&club.id).await.unwrap();
    assert!(started.club.started);
    let dates: Vec<_> = started.schedule.iter().map(|s| s.start_date).collect();
    assert_eq!(
        dates,
        vec![
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        ]
    );

    let err = h.svc.start_club(&club.id).await.unwrap_err();
    assert_eq!(err.code(), "FAILED_PRECONDITION");

    let stored = h.svc.get_scheduled_picks(&club.id).await.unwrap();
    assert_eq!(stored.len(), 3);
    let stored_ids: Vec<_> = stored.iter().map(|s| s.id.clone()).collect();
    let first_ids: Vec<_> = started.schedule.iter().map(|s| s.id.clone()).collect();
    assert_eq!(stored_ids, first_ids);
    assert_eq!(
        stored.iter().map(|s| s.sequence_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn start_club_applies_the_seeded_shuffle() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    for i in 0..10 {
        h.svc
            .add_pick(new_pick(&club.id, &ada.id, &format!("t{i}")))
            .await
            .unwrap();
    }

    let submitted: Vec<String> = h
        .svc
        .get_club(&club.id)
        .await
        .unwrap()
        .picks
        .into_iter()
        .map(|p| p.id)
        .collect();
    let mut expected = submitted.clone();
    expected.shuffle(&mut *FixedSeed(11).rng());

    let started = h.svc.start_club(&club.id).await.unwrap();
    let scheduled: Vec<String> = started.schedule.iter().map(|s| s.pick.id.clone()).collect();
    assert_eq!(scheduled, expected);
    assert_ne!(scheduled, submitted);
}

#[tokio::test]
async fn start_club_without_picks_is_a_precondition_failure() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let err = h.svc.start_club(&club.id).await.unwrap_err();
    assert_eq!(err.code(), "FAILED_PRECONDITION");
    assert!(!h.svc.get_club(&club.id).await.unwrap().club.started);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_start_produces_one_schedule() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    for title in ["A", "B", "C", "D"] {
        h.svc.add_pick(new_pick(&club.id, &ada.id, title)).await.unwrap();
    }

    let tasks = (0..8).map(|_| {
        let svc = h.svc.clone();
        let id = club.id.clone();
        tokio::spawn(async move { svc.start_club(&id).await })
    });
    let ok = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(h.svc.get_scheduled_picks(&club.id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn members_are_notified_when_club_starts() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    let bob = h.svc.create_user("Bob", "bob@example.com").await.unwrap();
    h.svc.join_club(&club.id, &ada.id).await.unwrap();
    h.svc.join_club(&club.id, &bob.id).await.unwrap();
    h.svc.add_pick(new_pick(&club.id, &ada.id, "A")).await.unwrap();

    h.svc.start_club(&club.id).await.unwrap();
    let svc = h.svc.clone();
    h.pool.shutdown().await;

    let mut started = h.recorder.started.lock().unwrap().clone();
    started.sort();
    let recipients: Vec<_> = started.iter().map(|(to, _)| to.as_str()).collect();
    assert_eq!(recipients, vec!["ada@example.com", "bob@example.com"]);
    assert!(started.iter().all(|(_, bytes)| *bytes > 0));
    assert_eq!(svc.notifier_stats().sent, 2);
}

#[tokio::test]
async fn login_email_answer_is_uniform() {
    let h = harness();
    h.svc.create_user("Ada", "ada@example.com").await.unwrap();

    assert_eq!(h.svc.send_login_email("ada@example.com").await.unwrap(), LOGIN_ACK);
    assert_eq!(h.svc.send_login_email("nobody@example.com").await.unwrap(), LOGIN_ACK);
    assert_eq!(h.svc.send_login_email("").await.unwrap_err().code(), "INVALID_ARGUMENT");

    h.pool.shutdown().await;
    assert_eq!(*h.recorder.logins.lock().unwrap(), vec!["ada@example.com".to_string()]);
}

#[tokio::test]
async fn calendar_requires_started_club() {
    let h = harness();
    let club = h.svc.create_club(new_club(0)).await.unwrap();
    let ada = h.svc.create_user("Ada", "ada@example.com").await.unwrap();
    h.svc
        .add_pick(NewPick {
            year: Some(1979),
            ..new_pick(&club.id, &ada.id, "Alien")
        })
        .await
        .unwrap();

    let err = h.svc.get_club_calendar(&club.id).await.unwrap_err();
    assert_eq!(err.code(), "FAILED_PRECONDITION");

    h.svc.start_club(&club.id).await.unwrap();
    let ics = h.svc.get_club_calendar(&club.id).await.unwrap();
    assert!(ics.contains("SUMMARY:Alien (1979)\r\n"));
    assert!(ics.contains("Picked by Ada"));
    assert!(ics.contains("X-WR-CALNAME:Friday Films - Schedule"));
}
