use std::sync::Mutex;

use async_trait::async_trait;

use super::lock;
use crate::error::DeliveryError;
use crate::processor::{Mailer, Notification};

/// Mailer that keeps what it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Notification>>,
    failures_left: Mutex<usize>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` deliveries as if the transport were down.
    pub fn fail_next(&self, count: usize) {
        *lock(&self.failures_left) = count;
    }

    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_notification(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), DeliveryError> {
        {
            let mut failures_left = lock(&self.failures_left);
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(DeliveryError::Unavailable("mail transport down".to_string()));
            }
        }

        lock(&self.sent).push(Notification {
            subject: subject.to_string(),
            body: body.to_string(),
            to: recipients.to_vec(),
        });
        Ok(())
    }
}
