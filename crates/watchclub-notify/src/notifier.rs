use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use watchclub_core::config::NotifierConfig;

use crate::error::{NotifyError, Result};
use crate::sender::MailSender;

/// One outbound message, addressed to a single recipient.
#[derive(Debug, Clone)]
pub enum Notification {
    Login {
        to: String,
        user_name: String,
        user_id: String,
    },
    ClubStarted {
        to: String,
        user_name: String,
        club_name: String,
        club_id: String,
        /// Shared by every member's message for the same club.
        calendar: Arc<[u8]>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Login { .. } => "login",
            Notification::ClubStarted { .. } => "club_started",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::Login { to, .. } | Notification::ClubStarted { to, .. } => to,
        }
    }
}

/// Exponential backoff: `min(initial * multiplier^attempt, max)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let wait = self.initial_backoff.as_secs_f64() * factor;
        Duration::from_secs_f64(wait.min(self.max_backoff.as_secs_f64()))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&NotifierConfig::default())
    }
}

impl From<&NotifierConfig> for RetryPolicy {
    fn from(config: &NotifierConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: 2.0,
        }
    }
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time view of the notifier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotifierStats {
    pub enqueued: u64,
    pub sent: u64,
    /// Gave up after exhausting retries.
    pub failed: u64,
    /// Individual retry attempts, not messages.
    pub retried: u64,
    /// Rejected at enqueue because the queue was full or closed.
    pub dropped: u64,
}

/// Cheap, cloneable handle for queueing notifications.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
    counters: Arc<Counters>,
}

/// Owns the worker tasks. Dropping it without [`NotifierPool::shutdown`]
/// leaves the workers running until the runtime stops.
pub struct NotifierPool {
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Notifier {
    /// Spawn `config.workers` delivery tasks on the current runtime.
    pub fn start(
        sender: Arc<dyn MailSender>,
        base_url: impl Into<String>,
        config: &NotifierConfig,
    ) -> (Notifier, NotifierPool) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());
        let policy = RetryPolicy::from(config);
        let base_url: Arc<str> = Arc::from(base_url.into());

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let ctx = WorkerContext {
                    worker,
                    rx: Arc::clone(&rx),
                    sender: Arc::clone(&sender),
                    base_url: Arc::clone(&base_url),
                    policy: policy.clone(),
                    counters: Arc::clone(&counters),
                };
                tokio::spawn(ctx.run(shutdown_rx.clone()))
            })
            .collect();

        info!(
            workers = config.workers.max(1),
            queue_capacity = config.queue_capacity.max(1),
            "notifier started"
        );

        (
            Notifier { tx, counters },
            NotifierPool {
                shutdown: shutdown_tx,
                workers,
            },
        )
    }

    /// Queue `notification` without waiting. A full or closed queue drops it
    /// and bumps the `dropped` counter.
    pub fn enqueue(&self, notification: Notification) -> Result<()> {
        let kind = notification.kind();
        match self.tx.try_send(notification) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(n)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind, to = n.recipient(), "notification queue full, message dropped");
                Err(NotifyError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind, to = n.recipient(), "notification queue closed, message dropped");
                Err(NotifyError::QueueClosed)
            }
        }
    }

    pub fn stats(&self) -> NotifierStats {
        NotifierStats {
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            retried: self.counters.retried.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl NotifierPool {
    /// Signal shutdown and wait for every worker. Messages already queued are
    /// delivered first; retries in progress finish their backoff.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!("notifier worker panicked: {e}");
            }
        }
        info!("notifier stopped");
    }
}

struct WorkerContext {
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<Notification>>>,
    sender: Arc<dyn MailSender>,
    base_url: Arc<str>,
    policy: RetryPolicy,
    counters: Arc<Counters>,
}

impl WorkerContext {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!(worker = self.worker, "notifier worker started");
        loop {
            // Biased toward the queue so pending messages drain before exit.
            let next = tokio::select! {
                biased;
                msg = async { self.rx.lock().await.recv().await } => msg,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };
            match next {
                Some(notification) => self.deliver(&notification).await,
                None => break,
            }
        }
        debug!(worker = self.worker, "notifier worker exiting");
    }

    async fn deliver(&self, notification: &Notification) {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(notification).await {
                Ok(()) => {
                    self.counters.sent.fetch_add(1, Ordering::Relaxed);
                    info!(
                        kind = notification.kind(),
                        to = notification.recipient(),
                        attempts = attempt + 1,
                        "notification sent"
                    );
                    return;
                }
                Err(e) if attempt < self.policy.max_retries => {
                    let wait = self.policy.backoff(attempt);
                    attempt += 1;
                    self.counters.retried.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        kind = notification.kind(),
                        to = notification.recipient(),
                        attempt,
                        backoff_ms = wait.as_millis() as u64,
                        error = %e,
                        "notification failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        kind = notification.kind(),
                        to = notification.recipient(),
                        attempts = attempt + 1,
                        error = %e,
                        "notification failed, giving up"
                    );
                    return;
                }
            }
        }
    }

    async fn send_once(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::Login {
                to,
                user_name,
                user_id,
            } => {
                self.sender
                    .send_login(to, user_name, user_id, &self.base_url)
                    .await
            }
            Notification::ClubStarted {
                to,
                user_name,
                club_name,
                club_id,
                calendar,
            } => {
                self.sender
                    .send_club_started(to, user_name, club_name, club_id, &self.base_url, calendar)
                    .await
            }
        }
    }
}
