//! Quiz data model: answers, questions and info pages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::condition::Condition;

/// Sentinel option value meaning "none of the above" on multi-select questions.
pub const NONE_OPTION: &str = "none";

/// A single response to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Single-select answer.
    Single(String),
    /// Multi-select answer, in selection order.
    Multi(Vec<String>),
}

impl AnswerValue {
    /// Whether `value` is the selected option (single) or among the selected options (multi).
    pub fn includes(&self, value: &str) -> bool {
        match self {
            Self::Single(v) => v == value,
            Self::Multi(vs) => vs.iter().any(|v| v == value),
        }
    }

    /// A multi-select answer with nothing selected counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(v) => v.is_empty(),
            Self::Multi(vs) => vs.is_empty(),
        }
    }

    /// Flatten into a display string (multi-select values comma-joined).
    pub fn joined(&self) -> String {
        match self {
            Self::Single(v) => v.clone(),
            Self::Multi(vs) => vs.join(", "),
        }
    }
}

/// Accumulated responses for one quiz session, keyed by question id.
///
/// A key is present only once the question has been answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the answer to a question.
    pub fn set(&mut self, question_id: impl Into<String>, value: AnswerValue) {
        self.0.insert(question_id.into(), value);
    }

    /// Builder-style variant of [`AnswerSet::set`] for a single-select answer.
    pub fn with(mut self, question_id: &str, value: &str) -> Self {
        self.set(question_id, AnswerValue::Single(value.to_string()));
        self
    }

    /// Builder-style variant of [`AnswerSet::set`] for a multi-select answer.
    pub fn with_many(mut self, question_id: &str, values: &[&str]) -> Self {
        self.set(
            question_id,
            AnswerValue::Multi(values.iter().map(|v| v.to_string()).collect()),
        );
        self
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.0.get(question_id)
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    /// The single-select value for a question, if answered that way.
    pub fn single(&self, question_id: &str) -> Option<&str> {
        match self.0.get(question_id) {
            Some(AnswerValue::Single(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// The multi-select values for a question; empty when unanswered.
    pub fn multi(&self, question_id: &str) -> &[String] {
        match self.0.get(question_id) {
            Some(AnswerValue::Multi(vs)) => vs.as_slice(),
            _ => &[],
        }
    }

    /// Whether a single-select answer equals `value`.
    pub fn is(&self, question_id: &str, value: &str) -> bool {
        self.single(question_id) == Some(value)
    }

    /// Whether a multi-select answer contains `value`.
    pub fn selected(&self, question_id: &str, value: &str) -> bool {
        self.multi(question_id).iter().any(|v| v == value)
    }

    /// Count of multi-select values other than the `none` sentinel.
    pub fn count_selected(&self, question_id: &str) -> usize {
        self.multi(question_id)
            .iter()
            .filter(|v| v.as_str() != NONE_OPTION)
            .count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }
}

/// Text that may vary with earlier answers.
///
/// Serialized either as a plain string or as `{ "default": ..., "variants": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Personalized {
        default: String,
        variants: Vec<TextVariant>,
    },
}

/// Alternative wording used when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextVariant {
    pub when: Condition,
    pub text: String,
}

impl Text {
    /// Pick the wording for the current answers. First matching variant wins.
    pub fn render(&self, answers: &AnswerSet) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Personalized { default, variants } => variants
                .iter()
                .find(|v| v.when.evaluate(answers))
                .map(|v| v.text.as_str())
                .unwrap_or(default),
        }
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_string())
    }
}

/// A selectable option on a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl QuizOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            description: None,
            icon: None,
        }
    }
}

/// One quiz question. Static configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: Text,
    pub options: Vec<QuizOption>,
    #[serde(default)]
    pub multi_select: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_it_matters: Option<Text>,
    /// Shown only when this holds. `None` means always visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,
}

impl Question {
    pub fn is_visible(&self, answers: &AnswerSet) -> bool {
        self.visible_when
            .as_ref()
            .is_none_or(|condition| condition.evaluate(answers))
    }

    pub fn option(&self, value: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// An informational interstitial shown between questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoPage {
    pub id: String,
    pub headline: Text,
    pub stats: Vec<String>,
    pub cta: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,
}

impl InfoPage {
    pub fn is_visible(&self, answers: &AnswerSet) -> bool {
        self.visible_when
            .as_ref()
            .is_none_or(|condition| condition.evaluate(answers))
    }
}
