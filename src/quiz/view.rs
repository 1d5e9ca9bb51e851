//! Render the current step with personalized text for API clients.

use serde::Serialize;

use super::flow::{FlowItem, Progress};
use super::model::{AnswerSet, AnswerValue, QuizOption};
use super::session::Step;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepView {
    Loading,
    Question {
        id: String,
        prompt: String,
        options: Vec<QuizOption>,
        multi_select: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        why_it_matters: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selected: Option<AnswerValue>,
        can_advance: bool,
        progress: Progress,
        is_last: bool,
    },
    Info {
        id: String,
        headline: String,
        stats: Vec<String>,
        cta: String,
        is_last: bool,
    },
}

impl StepView {
    pub fn render(step: &Step<'_>, answers: &AnswerSet) -> Self {
        let Step::Item {
            item,
            progress,
            is_last,
            ..
        } = step
        else {
            return Self::Loading;
        };

        match item {
            FlowItem::Question(q) => Self::Question {
                id: q.id.clone(),
                prompt: q.prompt.render(answers).to_string(),
                options: q.options.clone(),
                multi_select: q.multi_select,
                why_it_matters: q
                    .why_it_matters
                    .as_ref()
                    .map(|text| text.render(answers).to_string()),
                selected: answers.get(&q.id).cloned(),
                can_advance: item.can_advance(answers),
                progress: *progress,
                is_last: *is_last,
            },
            FlowItem::Info(page) => Self::Info {
                id: page.id.clone(),
                headline: page.headline.render(answers).to_string(),
                stats: page.stats.clone(),
                cta: page.cta.clone(),
                is_last: *is_last,
            },
        }
    }
}
