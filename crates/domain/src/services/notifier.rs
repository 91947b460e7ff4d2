//! Push notification trait and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub title: String,
    pub content: String,
}

/// A push message addressed to one device of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Device token the push is delivered to.
    pub device: String,
    pub user_id: UserId,
    pub data: NotificationData,
}

/// Fire-and-forget push delivery.
///
/// Implementations log their own failures; callers never observe them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: NotificationRequest);
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    published: Arc<RwLock<Vec<NotificationRequest>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notification published so far, oldest first.
    pub async fn published(&self) -> Vec<NotificationRequest> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn publish(&self, notification: NotificationRequest) {
        self.published.write().await.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let notification = NotificationRequest {
            device: "token-1".to_string(),
            user_id: UserId::new(4),
            data: NotificationData {
                title: "Hi".to_string(),
                content: "Hello".to_string(),
            },
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "device": "token-1",
                "user_id": 4,
                "data": { "title": "Hi", "content": "Hello" }
            })
        );
    }

    #[tokio::test]
    async fn test_records_published() {
        let notifier = InMemoryNotifier::new();
        notifier
            .publish(NotificationRequest {
                device: "token-1".to_string(),
                user_id: UserId::new(4),
                data: NotificationData {
                    title: "Hi".to_string(),
                    content: "Hello".to_string(),
                },
            })
            .await;

        let published = notifier.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].device, "token-1");
    }
}
