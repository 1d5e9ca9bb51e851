//! Forward progress records to a spreadsheet web app as flat JSON rows.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::model::ProgressRecord;
use super::sink::LeadSink;
use crate::error::SubmissionError;

const SINK_NAME: &str = "webhook";

/// Reply shape of the spreadsheet script.
#[derive(Debug, Deserialize)]
struct WebhookReply {
    success: bool,
    #[serde(default)]
    message: String,
}

/// Posts each record to a URL that upserts one row per session.
pub struct WebhookSink {
    url: SecretString,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: SecretString, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Unavailable {
                sink: SINK_NAME.into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            url,
            timeout,
            client,
        })
    }

    fn map_transport(&self, e: reqwest::Error) -> SubmissionError {
        if e.is_timeout() {
            SubmissionError::Timeout {
                sink: SINK_NAME.into(),
                timeout: self.timeout,
            }
        } else {
            SubmissionError::Unavailable {
                sink: SINK_NAME.into(),
                reason: e.to_string(),
            }
        }
    }
}

/// Flatten a record into one column per field.
///
/// Multi-select answers are joined with ", ". Unset fields are omitted so the
/// receiving side keeps whatever it already stored.
pub fn row_payload(record: &ProgressRecord) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("session_id".into(), json!(record.session_id));
    row.insert("started_at".into(), json!(record.started_at.to_rfc3339()));
    row.insert("last_updated".into(), json!(record.last_updated.to_rfc3339()));
    row.insert("completed".into(), json!(record.completed));
    if let Some(question) = &record.current_question {
        row.insert("current_question".into(), json!(question));
    }
    if let Some(point) = &record.drop_off_point {
        row.insert("drop_off_point".into(), json!(point));
    }

    if let Some(contact) = &record.contact {
        row.insert("email".into(), json!(contact.email));
        let optional = [
            ("name", &contact.name),
            ("phone", &contact.phone),
            ("referral_source", &contact.referral_source),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                row.insert(key.into(), json!(value));
            }
        }
    }

    for (question_id, value) in record.answers.iter() {
        row.insert(question_id.clone(), json!(value.joined()));
    }
    row.insert(
        "full_answers_json".into(),
        json!(serde_json::to_string(&record.answers).unwrap_or_default()),
    );

    if let Some(estimate) = &record.estimate {
        row.insert("savings_min".into(), json!(estimate.total_min));
        row.insert("savings_max".into(), json!(estimate.total_max));
        row.insert("urgency_level".into(), json!(estimate.urgency_level.to_string()));
        row.insert(
            "savings_breakdown_json".into(),
            json!(serde_json::to_string(&estimate.breakdown).unwrap_or_default()),
        );
    }
    row
}

#[async_trait]
impl LeadSink for WebhookSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<(), SubmissionError> {
        let resp = self
            .client
            .post(self.url.expose_secret())
            .json(&row_payload(record))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(SubmissionError::Unavailable {
                sink: SINK_NAME.into(),
                reason: format!("webhook returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(SubmissionError::Rejected {
                sink: SINK_NAME.into(),
                reason: format!("webhook returned {status}"),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_transport(e))?;
        match serde_json::from_str::<WebhookReply>(&body) {
            Ok(reply) if !reply.success => Err(SubmissionError::Rejected {
                sink: SINK_NAME.into(),
                reason: reply.message,
            }),
            Ok(reply) => {
                debug!(session_id = %record.session_id, message = %reply.message, "Webhook accepted row");
                Ok(())
            }
            // Some deployments answer with a redirect page rather than JSON.
            Err(_) => Ok(()),
        }
    }
}
