//! `watchclub-notify`: outbound email and calendar rendering.
//!
//! Messages go through a bounded queue drained by a small worker pool
//! ([`Notifier`]); request handlers never wait on delivery. Each failed send
//! is retried with exponential backoff up to the configured limit, then
//! counted as failed and logged.
//!
//! [`MailSender`] is the provider seam. [`ConsoleSender`] logs rendered
//! messages and is what development mode uses.

pub mod calendar;
pub mod error;
pub mod notifier;
pub mod sender;

pub use calendar::{render_calendar, render_calendar_at};
pub use error::{NotifyError, Result};
pub use notifier::{Notification, Notifier, NotifierPool, NotifierStats, RetryPolicy};
pub use sender::{app_link, build_sender, sender_identity, ConsoleSender, MailSender};
