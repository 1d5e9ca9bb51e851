//! Error types for bill-relief.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Quiz error: {0}")]
    Quiz(#[from] QuizError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid quiz catalog: {0}")]
    InvalidCatalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while driving a quiz session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("Session {id} not found")]
    SessionNotFound { id: String },

    #[error("Session {id} is already completed")]
    SessionClosed { id: String },

    #[error("Unknown question: {question_id}")]
    UnknownQuestion { question_id: String },

    #[error("Question {question_id} is not part of the current flow")]
    QuestionHidden { question_id: String },

    #[error("Unknown option {value} for question {question_id}")]
    UnknownOption { question_id: String, value: String },

    #[error("Question {question_id} needs an answer before continuing")]
    SelectionRequired { question_id: String },
}

/// Errors raised when handing a lead or progress record to a sink.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Sink {sink} unreachable: {reason}")]
    Unavailable { sink: String, reason: String },

    #[error("Sink {sink} timed out after {timeout:?}")]
    Timeout { sink: String, timeout: Duration },

    #[error("Sink {sink} rejected the submission: {reason}")]
    Rejected { sink: String, reason: String },

    #[error("Invalid contact details: {0}")]
    InvalidContact(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl SubmissionError {
    /// Whether resubmitting the same lead may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Storage(_)
        )
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
