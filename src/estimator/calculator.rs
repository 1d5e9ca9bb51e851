use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::model::{BreakdownEntry, DollarRange, SavingsEstimate};
use super::pregnancy::{PREGNANCY_RULES, future_savings};
use super::rules::{
    FALLBACK_RANGE, GENERAL_RULES, action_multiplier, ceiling_for, classify_urgency,
    evaluate_rules, is_fully_remediated, leverage_multiplier, round_dollars, scale_rounded,
};
use crate::quiz::AnswerSet;

/// Compute the savings estimate for a (possibly partial) answer set.
///
/// Total over every input: unanswered questions simply contribute nothing.
pub fn calculate_savings(answers: &AnswerSet) -> SavingsEstimate {
    if answers.is("situation", "pregnant") {
        let mut breakdown = evaluate_rules(PREGNANCY_RULES, answers);
        if breakdown.is_empty() {
            breakdown.push(future_savings());
        }
        return SavingsEstimate::from_breakdown(breakdown);
    }

    let ceiling = ceiling_for(answers);
    if is_fully_remediated(answers) {
        debug!(ceiling, "Actions already cover the main remediation steps");
        return SavingsEstimate::from_breakdown(vec![additional_review(ceiling)]);
    }

    let factor = action_multiplier(answers) * leverage_multiplier(answers);
    let mut breakdown: Vec<BreakdownEntry> = evaluate_rules(GENERAL_RULES, answers)
        .into_iter()
        .map(|entry| {
            let range = scale_rounded(entry.range(), factor);
            with_range(entry, range)
        })
        .collect();

    if breakdown.is_empty() {
        breakdown.push(BreakdownEntry::new(
            "General Bill Review",
            "Most medical bills contain at least one error worth disputing",
            scale_rounded(FALLBACK_RANGE, factor),
        ));
    }

    let total_max: u64 = breakdown.iter().map(|e| e.max).sum();
    if total_max > ceiling {
        debug!(total_max, ceiling, "Scaling breakdown down to ceiling");
        breakdown = breakdown
            .into_iter()
            .map(|entry| {
                let range = entry.range();
                let scaled = DollarRange::new(
                    range.min * ceiling / total_max,
                    range.max * ceiling / total_max,
                );
                with_range(entry, scaled)
            })
            .collect();
    }

    let (urgency, message) = classify_urgency(answers);
    SavingsEstimate::from_breakdown(breakdown).with_urgency(urgency, message)
}

/// Residual opportunity once the user has done the main remediation work.
fn additional_review(ceiling: u64) -> BreakdownEntry {
    let bound = |cap: u64, share: Decimal| round_dollars(Decimal::from(ceiling) * share).min(cap);
    BreakdownEntry::new(
        "Additional Review",
        "You've already taken key steps; a second look may still find errors",
        DollarRange::new(bound(200, dec!(0.1)), bound(800, dec!(0.2))),
    )
}

fn with_range(mut entry: BreakdownEntry, range: DollarRange) -> BreakdownEntry {
    entry.min = range.min;
    entry.max = range.max;
    entry
}
