//! NATS subscriber for incoming prediction requests.
//!
//! With a queue group set, every server instance joins the same group and
//! NATS hands each request to exactly one of them.

use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

use crate::config::NatsConfig;

pub struct PredictionConsumer {
    client: Client,
    subject: String,
    queue_group: Option<String>,
}

impl PredictionConsumer {
    pub fn new(client: Client, nats: &NatsConfig) -> Self {
        Self {
            client,
            subject: nats.request_subject.clone(),
            queue_group: nats.queue_group().map(str::to_string),
        }
    }

    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => self
                .client
                .queue_subscribe(self.subject.clone(), group.clone())
                .await
                .with_context(|| {
                    format!("failed to join queue group {group} on {}", self.subject)
                })?,
            None => self
                .client
                .subscribe(self.subject.clone())
                .await
                .with_context(|| format!("failed to subscribe to {}", self.subject))?,
        };
        info!(
            subject = %self.subject,
            queue_group = self.queue_group.as_deref().unwrap_or("-"),
            "Subscribed to prediction requests"
        );
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn queue_group(&self) -> Option<&str> {
        self.queue_group.as_deref()
    }
}
