//! NATS publisher for prediction results

use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

use crate::types::prediction::PredictionResult;

/// Publishes results to the request's reply subject, or to the configured
/// result subject when the request expects no reply.
#[derive(Clone)]
pub struct ResultPublisher {
    client: Client,
    result_subject: String,
}

impl ResultPublisher {
    pub fn new(client: Client, result_subject: &str) -> Self {
        Self {
            client,
            result_subject: result_subject.to_string(),
        }
    }

    /// Subject a result goes to for a request with the given reply subject
    pub fn target(&self, reply: Option<&Subject>) -> Subject {
        match reply {
            Some(subject) => subject.clone(),
            None => Subject::from(self.result_subject.as_str()),
        }
    }

    pub async fn publish(&self, reply: Option<&Subject>, result: &PredictionResult) -> Result<()> {
        let payload = serde_json::to_vec(result)?;
        let subject = self.target(reply);

        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(
            subject = %subject,
            total_damage = result.total_damage,
            fallback = result.is_error(),
            "Published prediction result"
        );

        Ok(())
    }

    pub fn result_subject(&self) -> &str {
        &self.result_subject
    }
}
