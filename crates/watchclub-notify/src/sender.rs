use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use watchclub_core::config::MailConfig;

use crate::error::Result;

/// Outbound mail provider.
///
/// An empty `base_url` means "use the sender's configured one".
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_login(&self, to: &str, user_name: &str, user_id: &str, base_url: &str)
        -> Result<()>;

    async fn send_club_started(
        &self,
        to: &str,
        user_name: &str,
        club_name: &str,
        club_id: &str,
        base_url: &str,
        calendar: &[u8],
    ) -> Result<()>;
}

/// Join `base` and a fragment route: `http://host/` + `club/1` -> `http://host/#/club/1`.
pub fn app_link(base: &str, route: &str) -> String {
    format!("{}/#/{}", base.trim_end_matches('/'), route)
}

pub fn login_text(user_name: &str, link: &str) -> String {
    format!(
        "Hi {user_name},\n\n\
         Click the link below to log into your account:\n\n\
         {link}\n\n\
         This link will automatically log you in.\n\n\
         If you didn't request this login link, you can safely ignore this email.\n"
    )
}

pub fn club_started_text(user_name: &str, club_name: &str, link: &str) -> String {
    format!(
        "Hi {user_name},\n\n\
         {club_name} has started and the viewing schedule is set.\n\n\
         See the schedule here:\n\n\
         {link}\n\n\
         A calendar file with every slot is attached.\n"
    )
}

/// `From:` header value built from mail config.
pub fn sender_identity(config: &MailConfig) -> String {
    let name = config.from_name.as_deref().filter(|n| !n.is_empty());
    let address = config.from_address.as_deref().filter(|a| !a.is_empty());
    match (name, address) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => DEFAULT_FROM.to_string(),
    }
}

const DEFAULT_FROM: &str = "WatchClub";

/// Development sender: renders each message and logs it instead of
/// delivering. Never fails.
pub struct ConsoleSender {
    base_url: String,
    from: String,
}

impl ConsoleSender {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            from: DEFAULT_FROM.to_string(),
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    fn base<'a>(&'a self, base_url: &'a str) -> &'a str {
        if base_url.is_empty() {
            &self.base_url
        } else {
            base_url
        }
    }
}

#[async_trait]
impl MailSender for ConsoleSender {
    async fn send_login(
        &self,
        to: &str,
        user_name: &str,
        user_id: &str,
        base_url: &str,
    ) -> Result<()> {
        let link = app_link(self.base(base_url), &format!("login/{user_id}"));
        let body = login_text(user_name, &link);
        info!(
            from = %self.from,
            to,
            user_name,
            login_link = %link,
            "login email (development mode)\n{body}"
        );
        Ok(())
    }

    async fn send_club_started(
        &self,
        to: &str,
        user_name: &str,
        club_name: &str,
        club_id: &str,
        base_url: &str,
        calendar: &[u8],
    ) -> Result<()> {
        let link = app_link(self.base(base_url), &format!("club/{club_id}"));
        let body = club_started_text(user_name, club_name, &link);
        info!(
            from = %self.from,
            to,
            user_name,
            club_name,
            club_link = %link,
            calendar_bytes = calendar.len(),
            "club started email (development mode)\n{body}"
        );
        Ok(())
    }
}

/// Pick a sender from mail config. Only the console sender ships in this
/// workspace; production delivery plugs in behind [`MailSender`].
pub fn build_sender(config: &MailConfig, base_url: &str) -> Arc<dyn MailSender> {
    let from = sender_identity(config);
    if !config.development_mode {
        warn!(
            from = %from,
            "no mail provider configured, using development mode (console logging)"
        );
    }
    Arc::new(ConsoleSender::new(base_url).with_from(from))
}
