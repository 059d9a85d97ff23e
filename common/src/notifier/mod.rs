// Shop announcement delivery

pub mod announcement;
pub mod command;
pub mod discord;

pub use announcement::{read_shop, Announcement};
pub use command::CommandNotifier;
pub use discord::DiscordNotifier;

use crate::errors::NotifyError;
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// What a notifier reports back after delivering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: Option<String>,
}

/// Announces the shop stored at `artifact`
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, artifact: &Path) -> Result<Delivery, NotifyError>;
}

/// Notifier used when announcements are turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, artifact: &Path) -> Result<Delivery, NotifyError> {
        info!(artifact = %artifact.display(), "Notifications disabled; skipping announcement");
        Ok(Delivery::default())
    }
}
