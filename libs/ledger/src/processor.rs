//! Consumer side of the alert queue.
//!
//! A task moves through decode, user lookup, rendering and delivery. A
//! payload that cannot be decoded, or a notification the transport
//! rejects, is a permanent failure; lookup failures and an unreachable
//! transport are transient and left to the retry policy. The
//! processor never touches the ledger, so replaying a task can at worst
//! send the notification twice.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::alerts::{AlertDirection, PayloadAccountAlert};
use crate::error::{DeliveryError, ProcessError};
use crate::models::User;
use crate::store::UserStore;
use crate::tasks::{TaskEnvelope, TASK_SEND_ACCOUNT_ALERT};

/// Notification transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_notification(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub to: Vec<String>,
}

pub fn render_account_alert(user: &User, payload: &PayloadAccountAlert) -> Notification {
    let subject = match payload.direction {
        AlertDirection::Low => "Low balance alert",
        AlertDirection::High => "High balance alert",
    };

    let body = format!(
        "Hello {name},<br/>\n\
         Your account {account} balance is now {balance} {currency}.<br/>\n\
         Alert threshold: {threshold} {currency}.<br/>\n",
        name = user.full_name,
        account = payload.account_id,
        balance = payload.balance,
        currency = payload.currency,
        threshold = payload.threshold,
    );

    Notification {
        subject: subject.to_string(),
        body,
        to: vec![user.email.clone()],
    }
}

#[derive(Clone)]
pub struct TaskProcessor {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
}

impl TaskProcessor {
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { users, mailer }
    }

    pub async fn process(&self, task: &TaskEnvelope) -> Result<(), ProcessError> {
        match task.task_type.as_str() {
            TASK_SEND_ACCOUNT_ALERT => self.process_send_account_alert(task).await,
            other => Err(ProcessError::Permanent(format!(
                "no handler registered for task type {other}"
            ))),
        }
    }

    async fn process_send_account_alert(&self, task: &TaskEnvelope) -> Result<(), ProcessError> {
        let payload: PayloadAccountAlert = serde_json::from_str(&task.payload)
            .map_err(|err| ProcessError::Permanent(format!("failed to decode payload: {err}")))?;

        let user = self
            .users
            .get_user(&payload.username)
            .await
            .map_err(|err| ProcessError::Transient(format!("failed to get user: {err}")))?
            .ok_or_else(|| {
                ProcessError::Transient(format!("user {} not found", payload.username))
            })?;

        let notification = render_account_alert(&user, &payload);

        self.mailer
            .send_notification(&notification.subject, &notification.body, &notification.to)
            .await
            .map_err(|err| match err {
                DeliveryError::Rejected(_) => {
                    ProcessError::Permanent(format!("account alert rejected: {err}"))
                }
                DeliveryError::Unavailable(_) => {
                    ProcessError::Transient(format!("failed to send account alert: {err}"))
                }
            })?;

        info!(
            task_type = %task.task_type,
            task_id = %task.id,
            account_id = payload.account_id,
            direction = %payload.direction,
            email = %user.email,
            "processed task"
        );
        Ok(())
    }
}
