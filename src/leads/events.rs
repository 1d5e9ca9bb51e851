//! Funnel analytics.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Funnel events emitted while a user moves through the quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuizEvent {
    PageView {
        session_id: String,
        page: String,
    },
    QuizAnswer {
        session_id: String,
        question_id: String,
        answer: String,
    },
    QuizCompleted {
        session_id: String,
        total_min: u64,
        total_max: u64,
    },
    EmailSubmitted {
        session_id: String,
    },
}

impl QuizEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PageView { .. } => "Page View",
            Self::QuizAnswer { .. } => "Quiz Answer",
            Self::QuizCompleted { .. } => "Quiz Completed",
            Self::EmailSubmitted { .. } => "Email Submitted",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::PageView { session_id, .. }
            | Self::QuizAnswer { session_id, .. }
            | Self::QuizCompleted { session_id, .. }
            | Self::EmailSubmitted { session_id } => session_id,
        }
    }
}

/// Fire-and-forget analytics destination. Failures never reach the user.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn track(&self, event: QuizEvent);
}

/// Writes events to the log under the `bill_relief::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn track(&self, event: QuizEvent) {
        let properties = serde_json::to_string(&event).unwrap_or_default();
        info!(
            target: "bill_relief::events",
            event = event.name(),
            session_id = %event.session_id(),
            %properties,
            "Quiz event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_funnel() {
        let event = QuizEvent::QuizAnswer {
            session_id: "s".into(),
            question_id: "situation".into(),
            answer: "baby".into(),
        };
        assert_eq!(event.name(), "Quiz Answer");
        assert_eq!(event.session_id(), "s");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "quiz_answer");
        assert_eq!(json["question_id"], "situation");
    }

    #[tokio::test]
    async fn tracing_sink_accepts_events() {
        TracingEventSink
            .track(QuizEvent::EmailSubmitted {
                session_id: "s".into(),
            })
            .await;
    }
}
