//! Contribution rules for the general (post-care) estimate.
//!
//! Each rule looks at the answers and contributes at most one breakdown entry.
//! Rules are independent; their order fixes the order of the breakdown.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use super::model::{BreakdownEntry, DollarRange, UrgencyLevel};
use crate::quiz::AnswerSet;

/// Ceiling used when `your_responsibility` is unanswered.
pub const DEFAULT_CEILING: u64 = 15_000;

/// Ceiling on total savings per self-reported out-of-pocket bucket.
pub const CEILINGS: &[(&str, u64)] = &[
    ("under1k", 800),
    ("1k-5k", 3_000),
    ("5k-15k", 9_000),
    ("over15k", 30_000),
    ("not_sure", 10_000),
];

/// NICU range by stay length. The two longest buckets share a range.
const NICU_RANGES: &[(&str, &str, DollarRange)] = &[
    ("under1week", "Under 1 week", DollarRange::new(2_000, 5_000)),
    ("1-2weeks", "1-2 week", DollarRange::new(4_000, 10_000)),
    ("2-4weeks", "2-4 week", DollarRange::new(8_000, 18_000)),
    ("over1month", "Extended", DollarRange::new(15_000, 35_000)),
    ("ongoing", "Ongoing", DollarRange::new(15_000, 35_000)),
];

/// Red flags that add to the consolidated billing-error entry.
const RED_FLAG_AMOUNTS: &[(&str, DollarRange)] = &[
    ("duplicates", DollarRange::new(800, 2_500)),
    ("denials", DollarRange::new(1_200, 4_000)),
    ("too_high", DollarRange::new(1_000, 3_500)),
    ("late_bills", DollarRange::new(600, 1_800)),
    ("multiple", DollarRange::new(500, 2_000)),
];

const CSECTION_RANGE: DollarRange = DollarRange::new(800, 3_000);
const STANDARD_DELIVERY_RANGE: DollarRange = DollarRange::new(300, 1_200);
const AIR_AMBULANCE_RANGE: DollarRange = DollarRange::new(12_000, 30_000);
const GROUND_AMBULANCE_RANGE: DollarRange = DollarRange::new(500, 2_000);
const SURPRISE_OON_RANGE: DollarRange = DollarRange::new(2_500, 8_000);
const EMERGENCY_RANGE: DollarRange = DollarRange::new(500, 2_000);
const ITEMIZED_RANGE: DollarRange = DollarRange::new(1_000, 2_500);
const EOB_RANGE: DollarRange = DollarRange::new(500, 1_500);

/// Generic entry used when no rule matched.
pub const FALLBACK_RANGE: DollarRange = DollarRange::new(400, 1_200);

/// A single contribution rule.
pub struct SavingsRule {
    pub name: &'static str,
    pub(super) evaluate: fn(&AnswerSet) -> Option<BreakdownEntry>,
}

impl SavingsRule {
    pub fn evaluate(&self, answers: &AnswerSet) -> Option<BreakdownEntry> {
        (self.evaluate)(answers)
    }
}

impl std::fmt::Debug for SavingsRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavingsRule").field("name", &self.name).finish()
    }
}

/// Rules for users who already received care, in evaluation order.
pub static GENERAL_RULES: &[SavingsRule] = &[
    SavingsRule {
        name: "nicu_stay",
        evaluate: nicu_stay,
    },
    SavingsRule {
        name: "delivery_type",
        evaluate: delivery_type,
    },
    SavingsRule {
        name: "ambulance",
        evaluate: ambulance,
    },
    SavingsRule {
        name: "surprise_out_of_network",
        evaluate: surprise_out_of_network,
    },
    SavingsRule {
        name: "emergency_care",
        evaluate: emergency_care,
    },
    SavingsRule {
        name: "financial_hardship",
        evaluate: financial_hardship,
    },
    SavingsRule {
        name: "itemized_bill_missing",
        evaluate: itemized_bill_missing,
    },
    SavingsRule {
        name: "eob_comparison_missing",
        evaluate: eob_comparison_missing,
    },
    SavingsRule {
        name: "red_flags",
        evaluate: red_flags,
    },
];

/// Evaluate `rules` in order, collecting every entry produced.
pub fn evaluate_rules(rules: &[SavingsRule], answers: &AnswerSet) -> Vec<BreakdownEntry> {
    rules
        .iter()
        .filter_map(|rule| {
            let entry = rule.evaluate(answers)?;
            debug!(
                rule = rule.name,
                min = entry.min,
                max = entry.max,
                "Savings rule matched"
            );
            Some(entry)
        })
        .collect()
}

/// Ceiling on total savings from the self-reported responsibility bucket.
pub fn ceiling_for(answers: &AnswerSet) -> u64 {
    answers
        .single("your_responsibility")
        .and_then(|bucket| CEILINGS.iter().find(|(b, _)| *b == bucket))
        .map(|(_, ceiling)| *ceiling)
        .unwrap_or(DEFAULT_CEILING)
}

/// Requested itemized bills, compared to the EOB, and negotiated or applied for charity care.
pub fn is_fully_remediated(answers: &AnswerSet) -> bool {
    let done = |action: &str| answers.selected("actions_taken", action);
    done("itemized") && done("compared_eob") && (done("negotiate") || done("charity"))
}

/// Less remaining opportunity the more the user already did themselves.
pub fn action_multiplier(answers: &AnswerSet) -> Decimal {
    match answers.count_selected("actions_taken") {
        0 => dec!(1.0),
        1 => dec!(0.8),
        2 | 3 => dec!(0.6),
        _ => dec!(0.3),
    }
}

/// Delinquent bills give more room to negotiate.
pub fn leverage_multiplier(answers: &AnswerSet) -> Decimal {
    match answers.single("bill_status") {
        Some("collections") => dec!(1.15),
        Some("legal") => dec!(1.2),
        Some("past_due") => dec!(1.08),
        _ => dec!(1.0),
    }
}

/// Round to whole dollars, halves away from zero.
pub fn round_dollars(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
}

/// Multiply a range, rounding each bound to the nearest whole dollar.
pub fn scale_rounded(range: DollarRange, factor: Decimal) -> DollarRange {
    let scale = |value: u64| round_dollars(Decimal::from(value) * factor);
    DollarRange::new(scale(range.min), scale(range.max))
}

/// Urgency from bill status, with the message shown alongside it.
pub fn classify_urgency(answers: &AnswerSet) -> (UrgencyLevel, Option<&'static str>) {
    match answers.single("bill_status") {
        Some("legal") => (
            UrgencyLevel::Critical,
            Some("URGENT: Legal action threatened - Act now to protect your credit and finances"),
        ),
        Some("collections") => (
            UrgencyLevel::Critical,
            Some("URGENT: Bills in collections - Act now for maximum negotiation leverage"),
        ),
        Some("past_due") => (
            UrgencyLevel::High,
            Some("Bills are past due - Act soon to avoid collections"),
        ),
        _ => (UrgencyLevel::Normal, None),
    }
}

fn nicu_stay(answers: &AnswerSet) -> Option<BreakdownEntry> {
    if !answers.selected("delivery", "nicu") {
        return None;
    }
    let duration = answers.single("nicu_duration")?;
    let (_, label, range) = NICU_RANGES.iter().find(|(bucket, _, _)| *bucket == duration)?;
    Some(BreakdownEntry::new(
        "NICU Billing Errors",
        &format!("{label} NICU stays average 200+ charges per day"),
        *range,
    ))
}

fn delivery_type(answers: &AnswerSet) -> Option<BreakdownEntry> {
    if answers.selected("delivery", "csection") {
        return Some(BreakdownEntry::new(
            "C-Section Billing Review",
            "Additional surgical procedures often have billing errors",
            CSECTION_RANGE,
        ));
    }
    if answers.is("situation", "baby") && !answers.selected("delivery", "complications") {
        return Some(BreakdownEntry::new(
            "Standard Delivery Review",
            "Even routine deliveries generate dozens of line items worth checking",
            STANDARD_DELIVERY_RANGE,
        ));
    }
    None
}

fn ambulance(answers: &AnswerSet) -> Option<BreakdownEntry> {
    match answers.single("ambulance")? {
        "air" => Some(BreakdownEntry::new(
            "Air Ambulance Bill Reduction",
            "Protected under federal No Surprises Act",
            AIR_AMBULANCE_RANGE,
        )),
        "ground" | "transfer" => Some(BreakdownEntry::new(
            "Ambulance Bill Reduction",
            "Ambulance bills often have inflated charges",
            GROUND_AMBULANCE_RANGE,
        )),
        _ => None,
    }
}

fn surprise_out_of_network(answers: &AnswerSet) -> Option<BreakdownEntry> {
    answers.is("out_of_network", "surprise").then(|| {
        BreakdownEntry::new(
            "Surprise Out-of-Network Bills",
            "Protected under federal No Surprises Act",
            SURPRISE_OON_RANGE,
        )
    })
}

fn emergency_care(answers: &AnswerSet) -> Option<BreakdownEntry> {
    answers.is("emergency", "emergency").then(|| {
        BreakdownEntry::new(
            "Emergency Billing Protections",
            "Emergency situations have additional billing protections",
            EMERGENCY_RANGE,
        )
    })
}

fn financial_hardship(answers: &AnswerSet) -> Option<BreakdownEntry> {
    if !matches!(
        answers.single("financial_hardship"),
        Some("cant_afford" | "wipe_savings")
    ) {
        return None;
    }
    let range = match answers.single("your_responsibility") {
        Some("over15k") => DollarRange::new(5_000, 15_000),
        Some("5k-15k") => DollarRange::new(2_500, 7_500),
        _ => DollarRange::new(1_000, 5_000),
    };
    Some(BreakdownEntry::new(
        "Financial Assistance Programs",
        "You may qualify for hospital charity care",
        range,
    ))
}

fn itemized_bill_missing(answers: &AnswerSet) -> Option<BreakdownEntry> {
    (!answers.selected("actions_taken", "itemized")).then(|| {
        BreakdownEntry::new(
            "Billing Code Errors",
            "You haven't reviewed itemized bills yet",
            ITEMIZED_RANGE,
        )
    })
}

fn eob_comparison_missing(answers: &AnswerSet) -> Option<BreakdownEntry> {
    (!answers.selected("actions_taken", "compared_eob")).then(|| {
        BreakdownEntry::new(
            "Insurance Claim Review",
            "Comparing to EOB often reveals errors",
            EOB_RANGE,
        )
    })
}

fn red_flags(answers: &AnswerSet) -> Option<BreakdownEntry> {
    let total = RED_FLAG_AMOUNTS
        .iter()
        .filter(|(flag, _)| answers.selected("red_flags", flag))
        .fold(DollarRange::ZERO, |acc, (_, range)| acc.plus(*range));
    (total.min > 0).then(|| {
        BreakdownEntry::new(
            "Billing Error Corrections",
            "Based on red flags you identified",
            total,
        )
    })
}
