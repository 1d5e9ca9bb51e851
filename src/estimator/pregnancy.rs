//! Prospective rules for users who are still pregnant.
//!
//! These estimate what careful review could save once the bills arrive. No
//! ceiling, multiplier or urgency applies to them.

use super::model::{BreakdownEntry, DollarRange};
use super::rules::SavingsRule;
use crate::quiz::AnswerSet;

const COMPLICATION_AMOUNTS: &[(&str, DollarRange)] = &[
    ("gestational_diabetes", DollarRange::new(500, 1_500)),
    ("preeclampsia", DollarRange::new(1_000, 3_000)),
    ("preterm_risk", DollarRange::new(3_000, 10_000)),
    ("other", DollarRange::new(500, 1_500)),
];

pub static PREGNANCY_RULES: &[SavingsRule] = &[
    SavingsRule {
        name: "expected_delivery",
        evaluate: expected_delivery,
    },
    SavingsRule {
        name: "multiples",
        evaluate: multiples,
    },
    SavingsRule {
        name: "pregnancy_complications",
        evaluate: complications,
    },
    SavingsRule {
        name: "hospital_network",
        evaluate: hospital_network,
    },
    SavingsRule {
        name: "insurance_deductible",
        evaluate: deductible,
    },
    SavingsRule {
        name: "reviewed_coverage",
        evaluate: coverage_review,
    },
];

/// Placeholder entry when nothing about the pregnancy is known yet.
pub fn future_savings() -> BreakdownEntry {
    BreakdownEntry::new(
        "Future Savings Opportunity",
        "Tell us more about your pregnancy to see what you could save",
        DollarRange::ZERO,
    )
}

fn expected_delivery(answers: &AnswerSet) -> Option<BreakdownEntry> {
    let (category, description, range) = match answers.single("expected_delivery")? {
        "vaginal" => (
            "Delivery Bill Review",
            "Even standard deliveries average dozens of line items",
            DollarRange::new(800, 2_500),
        ),
        "planned_csection" => (
            "C-Section Bill Review",
            "Surgical deliveries carry more codes and more chances for error",
            DollarRange::new(1_500, 5_000),
        ),
        "high_risk" => (
            "High-Risk Delivery Review",
            "High-risk care involves specialists and extra monitoring charges",
            DollarRange::new(2_500, 8_000),
        ),
        "not_sure" => (
            "Delivery Bill Review",
            "Whatever the delivery type, the bill will be worth checking",
            DollarRange::new(800, 3_000),
        ),
        _ => return None,
    };
    Some(BreakdownEntry::new(category, description, range))
}

fn multiples(answers: &AnswerSet) -> Option<BreakdownEntry> {
    let range = match answers.single("multiples")? {
        "twins" => DollarRange::new(2_000, 6_000),
        "multiples" => DollarRange::new(4_000, 12_000),
        _ => return None,
    };
    Some(BreakdownEntry::new(
        "Multiple Birth Billing",
        "Each baby is billed separately, multiplying the chance of errors",
        range,
    ))
}

fn complications(answers: &AnswerSet) -> Option<BreakdownEntry> {
    let total = COMPLICATION_AMOUNTS
        .iter()
        .filter(|(risk, _)| answers.selected("pregnancy_complications", risk))
        .fold(DollarRange::ZERO, |acc, (_, range)| acc.plus(*range));
    (total.min > 0).then(|| {
        BreakdownEntry::new(
            "Complication Billing Review",
            "Complications add procedures that are frequently overbilled",
            total,
        )
    })
}

fn hospital_network(answers: &AnswerSet) -> Option<BreakdownEntry> {
    match answers.single("hospital_network")? {
        "no" => Some(BreakdownEntry::new(
            "Out-of-Network Protections",
            "Federal law limits what out-of-network hospitals can bill",
            DollarRange::new(2_000, 6_000),
        )),
        "not_sure" => Some(BreakdownEntry::new(
            "Network Status Review",
            "Confirming network status now prevents surprise bills later",
            DollarRange::new(500, 2_000),
        )),
        _ => None,
    }
}

fn deductible(answers: &AnswerSet) -> Option<BreakdownEntry> {
    let range = match answers.single("insurance_deductible")? {
        "high" => DollarRange::new(1_000, 3_000),
        "medium" => DollarRange::new(500, 1_500),
        "not_sure" => DollarRange::new(300, 1_000),
        _ => return None,
    };
    Some(BreakdownEntry::new(
        "Deductible Planning",
        "Every dollar saved comes straight out of your deductible",
        range,
    ))
}

fn coverage_review(answers: &AnswerSet) -> Option<BreakdownEntry> {
    matches!(answers.single("reviewed_coverage"), Some("no" | "confused")).then(|| {
        BreakdownEntry::new(
            "Coverage Review",
            "Knowing your maternity benefits helps catch denied claims",
            DollarRange::new(300, 1_000),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::rules::evaluate_rules;

    #[test]
    fn delivery_type_ranges() {
        let entry = |kind: &str| {
            expected_delivery(&AnswerSet::new().with("expected_delivery", kind)).unwrap()
        };
        assert_eq!(entry("vaginal").range(), DollarRange::new(800, 2_500));
        assert_eq!(entry("planned_csection").category, "C-Section Bill Review");
        assert_eq!(entry("high_risk").range(), DollarRange::new(2_500, 8_000));
        assert_eq!(entry("not_sure").category, "Delivery Bill Review");
        assert_eq!(entry("not_sure").range(), DollarRange::new(800, 3_000));
    }

    #[test]
    fn complications_ignore_none() {
        let answers = AnswerSet::new().with_many(
            "pregnancy_complications",
            &["gestational_diabetes", "preterm_risk"],
        );
        assert_eq!(
            complications(&answers).unwrap().range(),
            DollarRange::new(3_500, 11_500)
        );
        let none = AnswerSet::new().with_many("pregnancy_complications", &["none"]);
        assert!(complications(&none).is_none());
    }

    #[test]
    fn reassuring_answers_contribute_nothing() {
        let answers = AnswerSet::new()
            .with("situation", "pregnant")
            .with("multiples", "no")
            .with("hospital_network", "yes")
            .with("insurance_deductible", "low")
            .with("reviewed_coverage", "yes_detailed");
        assert!(evaluate_rules(PREGNANCY_RULES, &answers).is_empty());
    }

    #[test]
    fn all_rules_in_order() {
        let answers = AnswerSet::new()
            .with("situation", "pregnant")
            .with("expected_delivery", "high_risk")
            .with("multiples", "twins")
            .with_many("pregnancy_complications", &["preeclampsia"])
            .with("hospital_network", "not_sure")
            .with("insurance_deductible", "high")
            .with("reviewed_coverage", "confused");
        let categories: Vec<_> = evaluate_rules(PREGNANCY_RULES, &answers)
            .into_iter()
            .map(|e| e.category)
            .collect();
        assert_eq!(
            categories,
            vec![
                "High-Risk Delivery Review",
                "Multiple Birth Billing",
                "Complication Billing Review",
                "Network Status Review",
                "Deductible Planning",
                "Coverage Review",
            ]
        );
    }
}
