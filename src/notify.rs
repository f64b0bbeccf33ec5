use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A transient notice emitted by a workflow after a mutation settles.
///
/// The embedding UI decides how to render these (toast, banner, log line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Handle for pushing notices to the embedder over a bounded channel.
///
/// Sending never blocks a workflow: when the channel is full or the receiver
/// has gone away, the notice is dropped and a warning is logged.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: mpsc::Sender<Notice>,
}

impl Notifier {
    /// Creates a notifier together with the receiver the embedder drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub fn send(&self, notice: Notice) {
        if let Err(e) = self.sender.try_send(notice) {
            warn!("Dropping notice: {}", e);
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Notice::success(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(Notice::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Notice::error(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notices_arrive_in_order() {
        let (notifier, mut rx) = Notifier::channel(8);
        notifier.success("saved");
        notifier.warning("stock pending");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, NoticeLevel::Success);
        assert_eq!(first.message, "saved");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let (notifier, mut rx) = Notifier::channel(1);
        notifier.success("kept");
        notifier.success("dropped");

        assert_eq!(rx.recv().await.unwrap().message, "kept");
        assert!(rx.try_recv().is_err());
    }
}
