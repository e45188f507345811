use async_trait::async_trait;
use ledger::{DeliveryError, Mailer};
use serde::Serialize;
use tracing::info;
use url::Url;

#[derive(Debug, Serialize)]
struct WebhookNotification<'a> {
    subject: &'a str,
    body: &'a str,
    to: &'a [String],
}

/// Posts each notification as JSON to a webhook.
pub struct WebhookMailer {
    client: reqwest::Client,
    url: Url,
}

impl WebhookMailer {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send_notification(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookNotification {
                subject,
                body,
                to: recipients,
            })
            .send()
            .await
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_server_error() || status.as_u16() == 429 {
            Err(DeliveryError::Unavailable(format!("webhook returned {status}")))
        } else {
            Err(DeliveryError::Rejected(format!("webhook returned {status}")))
        }
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_notification(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), DeliveryError> {
        info!(subject, to = ?recipients, body, "notification (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_delivers() {
        LogMailer
            .send_notification("Low balance alert", "hello", &["a@example.com".to_string()])
            .await
            .unwrap();
    }

    #[test]
    fn webhook_payload_shape() {
        let to = vec!["a@example.com".to_string()];
        let payload = serde_json::to_value(WebhookNotification {
            subject: "Low balance alert",
            body: "hello",
            to: &to,
        })
        .unwrap();
        assert_eq!(payload["subject"], "Low balance alert");
        assert_eq!(payload["to"][0], "a@example.com");
    }

    #[tokio::test]
    async fn unreachable_webhook_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mailer = WebhookMailer::new(Url::parse(&format!("http://{addr}/notify")).unwrap());
        let err = mailer
            .send_notification("s", "b", &["a@example.com".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Unavailable(_)));
    }
}
