//! Declarative visibility predicates over an [`AnswerSet`].

use serde::{Deserialize, Serialize};

use super::model::AnswerSet;

/// A condition evaluated against the answers collected so far.
///
/// Unanswered questions never satisfy `equals`/`one_of`/`contains` and always
/// satisfy `not_equals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Equals { field: String, value: String },
    NotEquals { field: String, value: String },
    OneOf { field: String, values: Vec<String> },
    Contains { field: String, value: String },
    ContainsAny { field: String, values: Vec<String> },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn equals(field: &str, value: &str) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(field: &str, value: &str) -> Self {
        Self::NotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of(field: &str, values: &[&str]) -> Self {
        Self::OneOf {
            field: field.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains_any(field: &str, values: &[&str]) -> Self {
        Self::ContainsAny {
            field: field.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::All { conditions }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Any { conditions }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Self::Not {
            condition: Box::new(condition),
        }
    }

    /// Evaluate against the current answers.
    pub fn evaluate(&self, answers: &AnswerSet) -> bool {
        match self {
            Self::Equals { field, value } => answers.is(field, value),
            Self::NotEquals { field, value } => !answers.is(field, value),
            Self::OneOf { field, values } => answers
                .single(field)
                .is_some_and(|answer| values.iter().any(|v| v == answer)),
            Self::Contains { field, value } => answers.selected(field, value),
            Self::ContainsAny { field, values } => {
                values.iter().any(|v| answers.selected(field, v))
            }
            Self::All { conditions } => conditions.iter().all(|c| c.evaluate(answers)),
            Self::Any { conditions } => conditions.iter().any(|c| c.evaluate(answers)),
            Self::Not { condition } => !condition.evaluate(answers),
        }
    }
}
