//! Progress records and contact details handed to lead sinks.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;
use crate::estimator::SavingsEstimate;
use crate::quiz::{AnswerSet, Catalog, QuizSession, SessionStatus, SessionSummary};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Contact details collected on the results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_source: Option<String>,
}

impl ContactDetails {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            name: None,
            phone: None,
            referral_source: None,
        }
    }

    /// Trim every field, drop blank optional ones and check the e-mail shape.
    pub fn normalized(self) -> Result<Self, SubmissionError> {
        let email = self.email.trim().to_string();
        if !EMAIL.is_match(&email) {
            return Err(SubmissionError::InvalidContact(format!(
                "'{email}' is not a valid e-mail address"
            )));
        }
        let clean = |field: Option<String>| {
            field
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Ok(Self {
            email,
            name: clean(self.name),
            phone: clean(self.phone),
            referral_source: clean(self.referral_source),
        })
    }
}

/// One row of progressive tracking, keyed by session id.
///
/// Sinks merge records: fields left empty here never erase stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub current_question: Option<String>,
    pub completed: bool,
    pub drop_off_point: Option<String>,
    pub contact: Option<ContactDetails>,
    pub answers: AnswerSet,
    pub estimate: Option<SavingsEstimate>,
}

impl ProgressRecord {
    /// Snapshot an in-flight session.
    pub fn from_summary(summary: &SessionSummary, answers: &AnswerSet) -> Self {
        Self {
            session_id: summary.session_id.clone(),
            started_at: summary.started_at,
            last_updated: summary.updated_at,
            current_question: summary.current_step.clone(),
            completed: summary.status == SessionStatus::Completed,
            drop_off_point: None,
            contact: None,
            answers: answers.clone(),
            estimate: None,
        }
    }

    /// Mark where the user left the quiz.
    pub fn dropped_off_at(mut self, step_id: &str) -> Self {
        self.drop_off_point = Some(step_id.to_string());
        self
    }

    /// Turn a stored row back into a live session.
    pub fn into_session(self, catalog: &Catalog) -> QuizSession {
        let mut session = QuizSession::resume(
            self.session_id,
            self.answers,
            self.current_question.as_deref(),
            catalog,
        );
        session.started_at = self.started_at;
        if self.completed {
            session.status = SessionStatus::Completed;
        }
        session
    }

    /// Attach the captured lead. A record with contact details is complete.
    pub fn with_lead(mut self, contact: ContactDetails, estimate: SavingsEstimate) -> Self {
        self.contact = Some(contact);
        self.estimate = Some(estimate);
        self.completed = true;
        self
    }
}
