//! Notifier adapters.
//!
//! - `TracingNotifier` - Writes each message to the log; the default when no
//!   transport is attached
//! - `RecordingNotifier` - Captures messages for assertions

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::Notifier;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, to: &UserId, message: &str) -> Result<(), DomainError> {
        tracing::info!(user_id = %to, message, "notification");
        Ok(())
    }
}

/// Keeps every delivered message in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, user: &UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == user)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, to: &UserId, message: &str) -> Result<(), DomainError> {
        self.sent
            .lock()
            .map_err(|_| DomainError::lock_poisoned("RecordingNotifier"))?
            .push((to.clone(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_notifier_keeps_order_per_user() {
        let notifier = RecordingNotifier::new();
        let a = UserId::new("521001").unwrap();
        let b = UserId::new("521002").unwrap();

        notifier.notify(&a, "first").await.unwrap();
        notifier.notify(&b, "other").await.unwrap();
        notifier.notify(&a, "second").await.unwrap();

        assert_eq!(notifier.sent_to(&a), vec!["first", "second"]);
        assert_eq!(notifier.sent().len(), 3);
    }

    #[tokio::test]
    async fn tracing_notifier_never_fails() {
        let a = UserId::new("521001").unwrap();
        assert!(TracingNotifier.notify(&a, "hello").await.is_ok());
    }
}
