//! Quiz session. Owns one user's answers and their position in the flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::Catalog;
use super::flow::{CursorMove, FlowCursor, FlowItem, Progress, apply_selection, resolve_flow};
use super::model::{AnswerSet, AnswerValue};
use crate::error::QuizError;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// The step currently presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'c> {
    /// Nothing to show yet.
    Loading,
    Item {
        item: FlowItem<'c>,
        position: usize,
        progress: Progress,
        is_last: bool,
    },
}

/// Result of recording a click on an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub question_id: String,
    pub answer: AnswerValue,
    /// Single-select answers move on by themselves.
    pub auto_advance: bool,
}

/// Result of [`QuizSession::respond`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub selection: Selection,
    /// Set when the answer auto-advanced the cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved: Option<CursorMove>,
}

/// Snapshot used for progress tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub current_step: Option<String>,
    pub answered: usize,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user's journey through the quiz.
///
/// The session id is supplied by the caller; the session never generates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: String,
    pub answers: AnswerSet,
    cursor: FlowCursor,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            answers: AnswerSet::new(),
            cursor: FlowCursor::new(),
            status: SessionStatus::InProgress,
            started_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a session from saved answers, with the cursor on `current_step`
    /// if that step is still in the flow.
    pub fn resume(
        id: impl Into<String>,
        answers: AnswerSet,
        current_step: Option<&str>,
        catalog: &Catalog,
    ) -> Self {
        let mut session = Self::new(id);
        session.answers = answers;
        let position = current_step
            .and_then(|step| {
                session
                    .flow(catalog)
                    .iter()
                    .position(|item| item.id() == step)
            })
            .unwrap_or(0);
        session.cursor = FlowCursor::at(position);
        session
    }

    /// The flow for the current answers.
    pub fn flow<'c>(&self, catalog: &'c Catalog) -> Vec<FlowItem<'c>> {
        resolve_flow(catalog, &self.answers)
    }

    pub fn current_step<'c>(&self, catalog: &'c Catalog) -> Step<'c> {
        let flow = self.flow(catalog);
        let Some(item) = self.cursor.current(&flow) else {
            return Step::Loading;
        };
        let position = self.cursor.position(flow.len());
        Step::Item {
            item: *item,
            position,
            progress: Progress::at(&flow, position),
            is_last: self.cursor.is_last(flow.len()),
        }
    }

    /// "Question N of M" at the cursor.
    pub fn progress(&self, catalog: &Catalog) -> Progress {
        let flow = self.flow(catalog);
        Progress::at(&flow, self.cursor.position(flow.len()))
    }

    /// Record a click on `value` for `question_id`.
    ///
    /// Single-select answers replace the previous one; multi-select clicks
    /// toggle with the `none` exclusion rule.
    pub fn select(
        &mut self,
        catalog: &Catalog,
        question_id: &str,
        value: &str,
    ) -> Result<Selection, QuizError> {
        self.ensure_open()?;

        let question = catalog
            .question(question_id)
            .ok_or_else(|| QuizError::UnknownQuestion {
                question_id: question_id.to_string(),
            })?;
        if !question.is_visible(&self.answers) {
            return Err(QuizError::QuestionHidden {
                question_id: question_id.to_string(),
            });
        }
        if question.option(value).is_none() {
            return Err(QuizError::UnknownOption {
                question_id: question_id.to_string(),
                value: value.to_string(),
            });
        }

        let answer = apply_selection(question, self.answers.get(question_id), value);
        self.answers.set(question_id, answer.clone());
        self.updated_at = Utc::now();

        debug!(
            session_id = %self.id,
            question_id = %question_id,
            answer = %answer.joined(),
            "Answer recorded"
        );

        Ok(Selection {
            question_id: question_id.to_string(),
            answer,
            auto_advance: !question.multi_select,
        })
    }

    /// Record an answer and, for a single-select answer to the current
    /// question, advance past it.
    pub fn respond(
        &mut self,
        catalog: &Catalog,
        question_id: &str,
        value: &str,
    ) -> Result<Response, QuizError> {
        let was_current = self.current_step_id(catalog).as_deref() == Some(question_id);
        let selection = self.select(catalog, question_id, value)?;

        let moved = if selection.auto_advance && was_current {
            Some(self.advance(catalog)?)
        } else {
            None
        };

        Ok(Response { selection, moved })
    }

    /// Move to the next step. Advancing from the final step completes the session.
    pub fn advance(&mut self, catalog: &Catalog) -> Result<CursorMove, QuizError> {
        self.ensure_open()?;

        let flow = self.flow(catalog);
        let Some(item) = self.cursor.current(&flow) else {
            debug!(session_id = %self.id, "Flow is empty, nothing to advance");
            return Ok(CursorMove::Moved { position: 0 });
        };
        if !item.can_advance(&self.answers) {
            return Err(QuizError::SelectionRequired {
                question_id: item.id().to_string(),
            });
        }

        let moved = self.cursor.advance(flow.len());
        self.updated_at = Utc::now();
        if moved == CursorMove::Finished {
            self.status = SessionStatus::Completed;
            info!(
                session_id = %self.id,
                answered = self.answers.len(),
                "Quiz completed"
            );
        }
        Ok(moved)
    }

    /// Move to the previous step. Going back from the first step exits the quiz.
    pub fn back(&mut self, catalog: &Catalog) -> Result<CursorMove, QuizError> {
        self.ensure_open()?;
        let len = self.flow(catalog).len();
        let moved = self.cursor.back(len);
        self.updated_at = Utc::now();
        Ok(moved)
    }

    pub fn current_step_id(&self, catalog: &Catalog) -> Option<String> {
        match self.current_step(catalog) {
            Step::Loading => None,
            Step::Item { item, .. } => Some(item.id().to_string()),
        }
    }

    pub fn summary(&self, catalog: &Catalog) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            status: self.status,
            current_step: self.current_step_id(catalog),
            answered: self.answers.len(),
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }

    fn ensure_open(&self) -> Result<(), QuizError> {
        if self.status.is_terminal() {
            return Err(QuizError::SessionClosed {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_id(session: &QuizSession, catalog: &Catalog) -> String {
        session.current_step_id(catalog).unwrap()
    }

    #[test]
    fn new_session_starts_at_first_question() {
        let catalog = Catalog::builtin();
        let session = QuizSession::new("s-1");
        assert_eq!(session.status, SessionStatus::InProgress);
        match session.current_step(&catalog) {
            Step::Item {
                item,
                position,
                progress,
                is_last,
            } => {
                assert_eq!(item.id(), "situation");
                assert_eq!(position, 0);
                assert_eq!(progress.current, 1);
                assert!(!is_last);
            }
            Step::Loading => panic!("expected a question"),
        }
    }

    #[test]
    fn empty_catalog_shows_loading() {
        let catalog = Catalog {
            questions: vec![],
            info_pages: vec![],
            anchors: Default::default(),
        };
        let mut session = QuizSession::new("s-empty");
        assert_eq!(session.current_step(&catalog), Step::Loading);
        assert_eq!(
            session.advance(&catalog).unwrap(),
            CursorMove::Moved { position: 0 }
        );
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn single_select_auto_advances_current_question() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-2");

        let response = session.respond(&catalog, "situation", "baby").unwrap();
        assert!(response.selection.auto_advance);
        assert_eq!(response.moved, Some(CursorMove::Moved { position: 1 }));
        assert_eq!(step_id(&session, &catalog), "delivery");
    }

    #[test]
    fn multi_select_waits_for_explicit_advance() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-3");
        session.respond(&catalog, "situation", "baby").unwrap();

        let err = session.advance(&catalog).unwrap_err();
        assert_eq!(
            err,
            QuizError::SelectionRequired {
                question_id: "delivery".into()
            }
        );

        let response = session.respond(&catalog, "delivery", "nicu").unwrap();
        assert!(!response.selection.auto_advance);
        assert!(response.moved.is_none());
        assert_eq!(step_id(&session, &catalog), "delivery");

        session.advance(&catalog).unwrap();
        assert_eq!(step_id(&session, &catalog), "nicu_duration");

        session.respond(&catalog, "nicu_duration", "2-4weeks").unwrap();
        assert_eq!(step_id(&session, &catalog), "nicu_info");
    }

    #[test]
    fn none_after_two_options_leaves_only_none() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-4");
        session.select(&catalog, "actions_taken", "itemized").unwrap();
        session.select(&catalog, "actions_taken", "negotiate").unwrap();
        let selection = session.select(&catalog, "actions_taken", "none").unwrap();

        assert_eq!(selection.answer, AnswerValue::Multi(vec!["none".into()]));
        assert_eq!(session.answers.multi("actions_taken"), ["none".to_string()]);
    }

    #[test]
    fn rejects_unknown_question_and_option() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-5");

        assert!(matches!(
            session.select(&catalog, "favorite_color", "blue"),
            Err(QuizError::UnknownQuestion { .. })
        ));
        assert!(matches!(
            session.select(&catalog, "situation", "retired"),
            Err(QuizError::UnknownOption { .. })
        ));
        assert!(session.answers.is_empty());
    }

    #[test]
    fn rejects_hidden_question() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-6");
        session.select(&catalog, "situation", "er").unwrap();
        assert!(matches!(
            session.select(&catalog, "nicu_duration", "ongoing"),
            Err(QuizError::QuestionHidden { .. })
        ));
    }

    #[test]
    fn back_from_first_step_exits() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-7");
        session.respond(&catalog, "situation", "er").unwrap();

        assert_eq!(
            session.back(&catalog).unwrap(),
            CursorMove::Moved { position: 0 }
        );
        assert_eq!(session.back(&catalog).unwrap(), CursorMove::Exited);
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn walking_pregnant_flow_completes_session() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-8");

        session.respond(&catalog, "situation", "pregnant").unwrap();
        session.respond(&catalog, "expected_delivery", "vaginal").unwrap();
        session.respond(&catalog, "multiples", "no").unwrap();
        session
            .respond(&catalog, "pregnancy_complications", "none")
            .unwrap();
        session.advance(&catalog).unwrap();
        session.respond(&catalog, "hospital_network", "yes").unwrap();
        session.respond(&catalog, "insurance_deductible", "low").unwrap();
        session.respond(&catalog, "reviewed_coverage", "no").unwrap();

        match session.current_step(&catalog) {
            Step::Item { item, is_last, .. } => {
                assert_eq!(item.id(), "pregnant_preparation");
                assert!(is_last);
            }
            Step::Loading => panic!("expected info page"),
        }

        assert_eq!(session.advance(&catalog).unwrap(), CursorMove::Finished);
        assert_eq!(session.status, SessionStatus::Completed);

        assert!(matches!(
            session.select(&catalog, "situation", "baby"),
            Err(QuizError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.advance(&catalog),
            Err(QuizError::SessionClosed { .. })
        ));
    }

    #[test]
    fn summary_reports_progress() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-9");
        session.respond(&catalog, "situation", "er").unwrap();

        let summary = session.summary(&catalog);
        assert_eq!(summary.session_id, "s-9");
        assert_eq!(summary.answered, 1);
        assert_eq!(summary.current_step.as_deref(), Some("hospital_services"));
        assert_eq!(summary.status, SessionStatus::InProgress);
    }

    #[test]
    fn resume_places_cursor_on_saved_step() {
        let catalog = Catalog::builtin();
        let answers = AnswerSet::new()
            .with("situation", "er")
            .with_many("hospital_services", &["er"]);
        let session = QuizSession::resume("s-12", answers, Some("emergency"), &catalog);
        assert_eq!(step_id(&session, &catalog), "emergency");
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.answers.is("situation", "er"));

        let unknown = QuizSession::resume("s-13", AnswerSet::new(), Some("gone"), &catalog);
        assert_eq!(step_id(&unknown, &catalog), "situation");
    }

    #[test]
    fn progress_skips_info_pages() {
        let catalog = Catalog::builtin();
        let mut session = QuizSession::new("s-10");
        session.respond(&catalog, "situation", "pregnant").unwrap();
        assert_eq!(session.progress(&catalog), Progress { current: 2, total: 7 });

        let empty = Catalog {
            questions: vec![],
            info_pages: vec![],
            anchors: Default::default(),
        };
        assert_eq!(
            QuizSession::new("s-11").progress(&empty),
            Progress { current: 0, total: 0 }
        );
    }

    #[test]
    fn status_display_matches_serde() {
        for status in [SessionStatus::InProgress, SessionStatus::Completed] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{status}\""), json);
        }
    }
}
