//! Push notification publishers.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{NotificationRequest, Notifier};
use serde::Serialize;
use thiserror::Error;

/// Topic consumed by the push delivery worker.
pub const DEFAULT_TOPIC: &str = "send-push-notification";

const PUBSUB_BASE: &str = "https://pubsub.googleapis.com/v1";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Publish rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct PublishBody {
    messages: Vec<PubsubMessage>,
}

#[derive(Debug, Serialize)]
struct PubsubMessage {
    data: String,
}

impl PublishBody {
    fn for_notification(notification: &NotificationRequest) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(notification)?;
        Ok(Self {
            messages: vec![PubsubMessage {
                data: STANDARD.encode(payload),
            }],
        })
    }
}

/// Publishes notifications to a Google Cloud Pub/Sub topic over REST.
///
/// `publish` hands the request to a background task and returns at once;
/// the outcome only shows up in logs and metrics.
#[derive(Debug, Clone)]
pub struct PubsubNotifier {
    project: String,
    topic: String,
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl PubsubNotifier {
    pub fn new(
        project: impl Into<String>,
        topic: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            topic: topic.into(),
            token: token.into(),
            base_url: PUBSUB_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points publishing at another endpoint, such as the Pub/Sub emulator.
    pub fn with_endpoint(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn topic_url(&self) -> String {
        format!(
            "{}/projects/{}/topics/{}:publish",
            self.base_url, self.project, self.topic
        )
    }

    /// Sends one notification and waits for the topic to accept it.
    pub async fn send(&self, notification: &NotificationRequest) -> Result<(), PublishError> {
        let body = PublishBody::for_notification(notification)?;

        let response = self
            .client
            .post(self.topic_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PubsubNotifier {
    async fn publish(&self, notification: NotificationRequest) {
        let notifier = self.clone();
        tokio::spawn(async move {
            let user_id = notification.user_id;
            match notifier.send(&notification).await {
                Ok(()) => {
                    metrics::counter!("notifications_published_total").increment(1);
                    tracing::info!(user_id = %user_id, topic = %notifier.topic, "push notification published");
                }
                Err(e) => {
                    metrics::counter!("notifications_failed_total").increment(1);
                    tracing::warn!(user_id = %user_id, error = %e, "error publishing push notification");
                }
            }
        });
    }
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, notification: NotificationRequest) {
        tracing::info!(
            user_id = %notification.user_id,
            title = %notification.data.title,
            "push notification dropped, no publisher configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use common::UserId;
    use domain::NotificationData;

    use super::*;

    fn notification() -> NotificationRequest {
        NotificationRequest {
            device: "fcm-token".to_string(),
            user_id: UserId::new(7),
            data: NotificationData {
                title: "Hi Sari, ada transaksi baru!".to_string(),
                content: "Ada yang ingin membeli Matcha dari kamu.".to_string(),
            },
        }
    }

    #[test]
    fn test_topic_url() {
        let notifier = PubsubNotifier::new("jastip", DEFAULT_TOPIC, "token");
        assert_eq!(
            notifier.topic_url(),
            "https://pubsub.googleapis.com/v1/projects/jastip/topics/send-push-notification:publish"
        );
    }

    #[test]
    fn test_publish_body_wraps_base64_json() {
        let body = PublishBody::for_notification(&notification()).unwrap();
        assert_eq!(body.messages.len(), 1);

        let decoded = STANDARD.decode(&body.messages[0].data).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(json["device"], "fcm-token");
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["data"]["title"], "Hi Sari, ada transaksi baru!");
    }

    #[tokio::test]
    async fn test_send_to_unreachable_endpoint_fails() {
        let notifier = PubsubNotifier::new("jastip", DEFAULT_TOPIC, "token")
            .with_endpoint("http://127.0.0.1:1");

        let result = notifier.send(&notification()).await;

        assert!(matches!(result, Err(PublishError::Transport(_))));
    }

    #[tokio::test]
    async fn test_publish_never_fails_caller() {
        let notifier = PubsubNotifier::new("jastip", DEFAULT_TOPIC, "token")
            .with_endpoint("http://127.0.0.1:1");

        notifier.publish(notification()).await;
        LogNotifier.publish(notification()).await;
    }
}
