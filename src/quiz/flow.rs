//! Flow resolution: which questions and info pages a user sees, in order.
//!
//! The flow is a pure function of the catalog and the current answers. It is
//! recomputed after every answer write because visibility predicates read
//! answers that may have just changed.

use serde::Serialize;

use super::catalog::Catalog;
use super::model::{AnswerSet, AnswerValue, InfoPage, NONE_OPTION, Question};

/// Visual delay before a single-select question auto-advances. Not a logical gate.
pub const AUTO_ADVANCE_DELAY_MS: u64 = 300;

/// One step in the resolved flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowItem<'c> {
    Question(&'c Question),
    Info(&'c InfoPage),
}

impl<'c> FlowItem<'c> {
    pub fn id(&self) -> &'c str {
        match self {
            Self::Question(q) => &q.id,
            Self::Info(p) => &p.id,
        }
    }

    pub fn is_question(&self) -> bool {
        matches!(self, Self::Question(_))
    }

    /// Whether the user may move past this step with the current answers.
    ///
    /// Multi-select questions need at least one selection; single-select
    /// questions need an answer; info pages never block.
    pub fn can_advance(&self, answers: &AnswerSet) -> bool {
        match self {
            Self::Info(_) => true,
            Self::Question(q) => answers.get(&q.id).is_some_and(|a| !a.is_empty()),
        }
    }
}

/// Resolve the ordered flow for the current answers.
pub fn resolve_flow<'c>(catalog: &'c Catalog, answers: &AnswerSet) -> Vec<FlowItem<'c>> {
    let mut items = Vec::with_capacity(catalog.questions.len());

    for question in catalog.questions.iter() {
        if !question.is_visible(answers) {
            continue;
        }
        items.push(FlowItem::Question(question));

        for page in catalog.pages_after(&question.id) {
            if page.is_visible(answers) {
                items.push(FlowItem::Info(page));
            }
        }
    }

    items
}

/// "Question N of M". Info pages occupy a slot but are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    /// Compute progress at `position` in `flow`.
    pub fn at(flow: &[FlowItem<'_>], position: usize) -> Self {
        let total = flow.iter().filter(|item| item.is_question()).count();
        let current = flow
            .iter()
            .take(position.saturating_add(1))
            .filter(|item| item.is_question())
            .count();
        Self { current, total }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64 * 100.0
    }
}

/// Outcome of moving the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "move", rename_all = "snake_case")]
pub enum CursorMove {
    /// Now at this position.
    Moved { position: usize },
    /// Advanced past the final item; the session is finished.
    Finished,
    /// Went back from the first item; the user left the flow.
    Exited,
}

/// Position within a resolved flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct FlowCursor {
    position: usize,
}

impl FlowCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: usize) -> Self {
        Self { position }
    }

    /// Position clamped to a flow of `len` items. The flow can shrink when an
    /// answer hides later questions.
    pub fn position(&self, len: usize) -> usize {
        self.position.min(len.saturating_sub(1))
    }

    pub fn current<'f, 'c>(&self, flow: &'f [FlowItem<'c>]) -> Option<&'f FlowItem<'c>> {
        flow.get(self.position(flow.len()))
    }

    pub fn is_last(&self, len: usize) -> bool {
        len > 0 && self.position(len) == len - 1
    }

    /// Move forward one step in a flow of `len` items.
    pub fn advance(&mut self, len: usize) -> CursorMove {
        let position = self.position(len);
        if len == 0 || position + 1 >= len {
            self.position = position;
            return CursorMove::Finished;
        }
        self.position = position + 1;
        CursorMove::Moved {
            position: self.position,
        }
    }

    /// Move back one step. Going back from the first item exits the flow.
    pub fn back(&mut self, len: usize) -> CursorMove {
        let position = self.position(len);
        if position == 0 {
            self.position = 0;
            return CursorMove::Exited;
        }
        self.position = position - 1;
        CursorMove::Moved {
            position: self.position,
        }
    }
}

/// Apply a click on a multi-select option to the current selection.
///
/// `none` clears everything else; any other option removes `none` and
/// toggles itself.
pub fn toggle_selection(current: &[String], value: &str) -> Vec<String> {
    if value == NONE_OPTION {
        return vec![NONE_OPTION.to_string()];
    }

    let mut next: Vec<String> = current
        .iter()
        .filter(|v| v.as_str() != NONE_OPTION)
        .cloned()
        .collect();

    if let Some(idx) = next.iter().position(|v| v == value) {
        next.remove(idx);
    } else {
        next.push(value.to_string());
    }
    next
}

/// The answer a click on `value` produces for `question`.
pub fn apply_selection(question: &Question, existing: Option<&AnswerValue>, value: &str) -> AnswerValue {
    if !question.multi_select {
        return AnswerValue::Single(value.to_string());
    }
    let current = match existing {
        Some(AnswerValue::Multi(values)) => values.as_slice(),
        _ => &[],
    };
    AnswerValue::Multi(toggle_selection(current, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'c>(flow: &[FlowItem<'c>]) -> Vec<&'c str> {
        flow.iter().map(|item| item.id()).collect()
    }

    #[test]
    fn unanswered_flow_shows_general_questions() {
        let catalog = Catalog::builtin();
        let flow = resolve_flow(&catalog, &AnswerSet::new());
        let ids = ids(&flow);

        assert_eq!(ids[0], "situation");
        assert!(!ids.contains(&"expected_delivery"));
        assert!(!ids.contains(&"delivery"));
        assert!(ids.contains(&"emergency"));
        // Unconditional info pages appear after their anchors.
        let overpay = ids.iter().position(|id| *id == "overpay_info").unwrap();
        assert_eq!(ids[overpay - 1], "your_responsibility");
        assert_eq!(*ids.last().unwrap(), "red_flags_info");
    }

    #[test]
    fn pregnant_flow_uses_prospective_questions() {
        let catalog = Catalog::builtin();
        let answers = AnswerSet::new().with("situation", "pregnant");
        let flow = resolve_flow(&catalog, &answers);

        assert_eq!(
            ids(&flow),
            vec![
                "situation",
                "expected_delivery",
                "multiples",
                "pregnancy_complications",
                "hospital_network",
                "insurance_deductible",
                "reviewed_coverage",
                "pregnant_preparation",
            ]
        );
    }

    #[test]
    fn nicu_answer_injects_duration_and_info_page() {
        let catalog = Catalog::builtin();
        let answers = AnswerSet::new()
            .with("situation", "baby")
            .with_many("delivery", &["nicu"]);
        let flow = resolve_flow(&catalog, &answers);
        let ids = ids(&flow);

        let duration = ids.iter().position(|id| *id == "nicu_duration").unwrap();
        assert_eq!(ids[duration - 1], "delivery");
        assert_eq!(ids[duration + 1], "nicu_info");
        assert_eq!(ids[duration + 2], "hospital_services");
    }

    #[test]
    fn conditional_info_pages_follow_answers() {
        let catalog = Catalog::builtin();
        let base = AnswerSet::new().with("situation", "er");
        assert!(!ids(&resolve_flow(&catalog, &base)).contains(&"air_ambulance_info"));

        let air = base.clone().with("ambulance", "air");
        let flow = resolve_flow(&catalog, &air);
        let air_ids = ids(&flow);
        let pos = air_ids
            .iter()
            .position(|id| *id == "air_ambulance_info")
            .unwrap();
        assert_eq!(air_ids[pos - 1], "ambulance");

        let struggling = base.clone().with("financial_hardship", "cant_afford");
        assert!(ids(&resolve_flow(&catalog, &struggling)).contains(&"options_info"));

        let applied = struggling.with_many("actions_taken", &["assistance"]);
        assert!(!ids(&resolve_flow(&catalog, &applied)).contains(&"options_info"));
    }

    #[test]
    fn resolution_is_idempotent() {
        let catalog = Catalog::builtin();
        let answers = AnswerSet::new()
            .with("situation", "baby")
            .with_many("delivery", &["nicu", "csection"])
            .with("ambulance", "air");
        let first = resolve_flow(&catalog, &answers);
        let second = resolve_flow(&catalog, &answers);
        assert_eq!(first, second);
    }

    #[test]
    fn progress_counts_only_questions() {
        let catalog = Catalog::builtin();
        let answers = AnswerSet::new().with("situation", "pregnant");
        let flow = resolve_flow(&catalog, &answers);

        assert_eq!(Progress::at(&flow, 0), Progress { current: 1, total: 7 });
        assert_eq!(Progress::at(&flow, 6), Progress { current: 7, total: 7 });
        // The trailing info page does not bump the count.
        assert_eq!(Progress::at(&flow, 7), Progress { current: 7, total: 7 });
        assert!((Progress::at(&flow, 6).percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cursor_advances_and_finishes() {
        let mut cursor = FlowCursor::new();
        assert_eq!(cursor.advance(3), CursorMove::Moved { position: 1 });
        assert_eq!(cursor.advance(3), CursorMove::Moved { position: 2 });
        assert!(cursor.is_last(3));
        assert_eq!(cursor.advance(3), CursorMove::Finished);
        assert_eq!(cursor.position(3), 2);
    }

    #[test]
    fn cursor_back_exits_from_first_item() {
        let mut cursor = FlowCursor::new();
        cursor.advance(5);
        assert_eq!(cursor.back(5), CursorMove::Moved { position: 0 });
        assert_eq!(cursor.back(5), CursorMove::Exited);
        assert_eq!(cursor.position(5), 0);
    }

    #[test]
    fn cursor_clamps_when_flow_shrinks() {
        let mut cursor = FlowCursor::new();
        for _ in 0..9 {
            cursor.advance(10);
        }
        assert_eq!(cursor.position(10), 9);
        assert_eq!(cursor.position(4), 3);
        assert!(cursor.current(&[]).is_none());
        assert_eq!(cursor.back(4), CursorMove::Moved { position: 2 });
    }

    #[test]
    fn none_clears_other_selections() {
        let current = vec!["itemized".to_string(), "negotiate".to_string()];
        assert_eq!(toggle_selection(&current, "none"), vec!["none".to_string()]);
    }

    #[test]
    fn other_option_removes_none() {
        let current = vec!["none".to_string()];
        assert_eq!(
            toggle_selection(&current, "itemized"),
            vec!["itemized".to_string()]
        );
    }

    #[test]
    fn selecting_twice_deselects() {
        let current = vec!["itemized".to_string(), "negotiate".to_string()];
        assert_eq!(
            toggle_selection(&current, "itemized"),
            vec!["negotiate".to_string()]
        );
    }

    #[test]
    fn multi_select_gate_needs_a_selection() {
        let catalog = Catalog::builtin();
        let question = catalog.question("actions_taken").unwrap();
        let item = FlowItem::Question(question);

        assert!(!item.can_advance(&AnswerSet::new()));
        assert!(!item.can_advance(&AnswerSet::new().with_many("actions_taken", &[])));
        assert!(item.can_advance(&AnswerSet::new().with_many("actions_taken", &["none"])));

        let page = FlowItem::Info(catalog.info_page("overpay_info").unwrap());
        assert!(page.can_advance(&AnswerSet::new()));
    }

    #[test]
    fn apply_selection_respects_question_kind() {
        let catalog = Catalog::builtin();
        let single = catalog.question("situation").unwrap();
        assert_eq!(
            apply_selection(single, Some(&AnswerValue::Single("er".into())), "baby"),
            AnswerValue::Single("baby".into())
        );

        let multi = catalog.question("delivery").unwrap();
        let first = apply_selection(multi, None, "nicu");
        let second = apply_selection(multi, Some(&first), "csection");
        assert_eq!(
            second,
            AnswerValue::Multi(vec!["nicu".into(), "csection".into()])
        );
    }
}
