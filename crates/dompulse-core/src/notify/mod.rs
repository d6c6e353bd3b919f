//! Notifier contract: deliver one formatted message to a chat destination,
//! signaling rate limits with an explicit wait duration.

mod telegram;

pub use telegram::TelegramNotifier;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// One outgoing chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub text: String,
    pub markdown: bool,
}

/// Destination configuration; pairs with a text to form a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTarget {
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    pub markdown: bool,
}

impl NotificationTarget {
    pub fn message(&self, text: impl Into<String>) -> Notification {
        Notification {
            chat_id: self.chat_id,
            thread_id: self.thread_id,
            text: text.into(),
            markdown: self.markdown,
        }
    }
}

/// Delivery failure classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// Anything that may succeed on a later attempt.
    #[error("notifier transient failure: {0}")]
    Transient(String),
    /// Upstream asked the caller to wait before retrying.
    #[error("notifier rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

/// Delivery capability for a chat channel.
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// [`NotifierError::RateLimited`] carries the upstream-signaled wait;
    /// every other failure is [`NotifierError::Transient`].
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifierError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_builds_notification_with_destination_fields() {
        let target = NotificationTarget {
            chat_id: -100_200,
            thread_id: Some(3),
            markdown: true,
        };

        let notification = target.message("hello");

        assert_eq!(notification.chat_id, -100_200);
        assert_eq!(notification.thread_id, Some(3));
        assert_eq!(notification.text, "hello");
        assert!(notification.markdown);
    }
}
