//! Question catalog, info pages, and the anchor table that injects info pages
//! into the flow.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::model::{InfoPage, Question, QuizOption, Text, TextVariant};
use crate::error::ConfigError;

/// Static quiz configuration.
///
/// `anchors` maps a question id to the info pages shown right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub questions: Vec<Question>,
    pub info_pages: Vec<InfoPage>,
    #[serde(default)]
    pub anchors: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// Parse and validate a catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let catalog: Catalog = serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(format!("quiz catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check ids are unique, every question has options, and anchors resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.questions.is_empty() {
            return Err(ConfigError::InvalidCatalog("no questions defined".into()));
        }

        let mut question_ids = HashSet::new();
        for q in &self.questions {
            if !question_ids.insert(q.id.as_str()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "duplicate question id: {}",
                    q.id
                )));
            }
            if q.options.is_empty() {
                return Err(ConfigError::InvalidCatalog(format!(
                    "question {} has no options",
                    q.id
                )));
            }
        }

        let mut page_ids = HashSet::new();
        for page in &self.info_pages {
            if !page_ids.insert(page.id.as_str()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "duplicate info page id: {}",
                    page.id
                )));
            }
        }

        for (anchor, pages) in &self.anchors {
            if !question_ids.contains(anchor.as_str()) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "anchor references unknown question: {anchor}"
                )));
            }
            if let Some(missing) = pages.iter().find(|p| !page_ids.contains(p.as_str())) {
                return Err(ConfigError::InvalidCatalog(format!(
                    "anchor {anchor} references unknown info page: {missing}"
                )));
            }
        }

        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn info_page(&self, id: &str) -> Option<&InfoPage> {
        self.info_pages.iter().find(|p| p.id == id)
    }

    /// Info pages anchored after `question_id`, in table order.
    pub fn pages_after(&self, question_id: &str) -> Vec<&InfoPage> {
        self.anchors
            .get(question_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.info_page(id))
            .collect()
    }

    /// The question an info page is injected after, if it is anchored at all.
    pub fn anchor_of(&self, page_id: &str) -> Option<&str> {
        self.anchors
            .iter()
            .find(|(_, pages)| pages.iter().any(|p| p == page_id))
            .map(|(anchor, _)| anchor.as_str())
    }

    /// The built-in medical bill quiz.
    pub fn builtin() -> Self {
        Self {
            questions: builtin_questions(),
            info_pages: builtin_info_pages(),
            anchors: builtin_anchors(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn options(pairs: &[(&str, &str)]) -> Vec<QuizOption> {
    pairs
        .iter()
        .map(|(value, label)| QuizOption::new(value, label))
        .collect()
}

fn question(id: &str, prompt: &str, opts: &[(&str, &str)]) -> Question {
    Question {
        id: id.into(),
        prompt: prompt.into(),
        options: options(opts),
        multi_select: false,
        why_it_matters: None,
        visible_when: None,
    }
}

impl Question {
    fn multi(mut self) -> Self {
        self.multi_select = true;
        self
    }

    fn why(mut self, text: &str) -> Self {
        self.why_it_matters = Some(text.into());
        self
    }

    fn when(mut self, condition: Condition) -> Self {
        self.visible_when = Some(condition);
        self
    }
}

fn builtin_questions() -> Vec<Question> {
    let pregnant = || Condition::equals("situation", "pregnant");
    let not_pregnant = || Condition::not_equals("situation", "pregnant");

    let mut emergency = question(
        "emergency",
        "Was this an emergency situation or planned care?",
        &[
            ("emergency", "Emergency/urgent - no time to plan"),
            ("planned", "Scheduled procedure or planned delivery"),
            ("mix", "Mix of both"),
        ],
    )
    .why("Emergencies often mean less choice in providers and more billing protections")
    .when(not_pregnant());
    emergency.prompt = Text::Personalized {
        default: "Was this an emergency situation or planned care?".into(),
        variants: vec![TextVariant {
            when: Condition::equals("situation", "baby"),
            text: "Was your delivery an emergency or was it planned?".into(),
        }],
    };

    vec![
        question(
            "situation",
            "What's your current situation?",
            &[
                ("baby", "I just had a baby"),
                ("pregnant", "I am currently pregnant"),
                ("hospital", "My child had a hospital stay or surgery"),
                ("er", "We've had multiple ER visits"),
                ("chronic", "Ongoing treatment for a chronic condition"),
                ("mix", "Mix of various medical expenses"),
            ],
        ),
        question(
            "expected_delivery",
            "What type of delivery are you expecting?",
            &[
                ("vaginal", "Vaginal delivery (standard)"),
                ("planned_csection", "Planned C-section"),
                ("high_risk", "High-risk pregnancy"),
                ("not_sure", "Not sure yet / too early to tell"),
            ],
        )
        .when(pregnant()),
        question(
            "multiples",
            "Are you expecting twins or multiples?",
            &[
                ("no", "No, single baby"),
                ("twins", "Yes, twins"),
                ("multiples", "Yes, triplets or more"),
            ],
        )
        .when(pregnant()),
        question(
            "pregnancy_complications",
            "Has your doctor mentioned any potential complications or risks?",
            &[
                ("none", "No, everything is normal so far"),
                ("gestational_diabetes", "Gestational diabetes"),
                ("preeclampsia", "Preeclampsia or high blood pressure"),
                ("preterm_risk", "Risk of preterm delivery"),
                ("other", "Other complications"),
            ],
        )
        .multi()
        .why("Complications often mean higher bills and more opportunities for billing errors")
        .when(pregnant()),
        question(
            "hospital_network",
            "Is your planned hospital in-network with your insurance?",
            &[
                ("yes", "Yes, confirmed in-network"),
                ("no", "No, out-of-network"),
                ("not_sure", "Not sure / haven't checked"),
            ],
        )
        .why("Out-of-network hospitals can result in surprise bills, but federal law may protect you")
        .when(pregnant()),
        question(
            "insurance_deductible",
            "What's your insurance deductible and out-of-pocket max?",
            &[
                ("low", "Low deductible (under $1,500)"),
                ("medium", "Medium deductible ($1,500-$5,000)"),
                ("high", "High deductible ($5,000+)"),
                ("not_sure", "Not sure"),
            ],
        )
        .why("Higher deductibles mean you'll pay more out-of-pocket, making savings more valuable")
        .when(pregnant()),
        question(
            "reviewed_coverage",
            "Have you reviewed your insurance maternity coverage?",
            &[
                ("yes_detailed", "Yes, I know what's covered in detail"),
                ("yes_basic", "Yes, I have a basic understanding"),
                ("no", "No, not yet"),
                ("confused", "I tried but it's confusing"),
            ],
        )
        .when(pregnant()),
        question(
            "delivery",
            "Did your delivery involve any of these?",
            &[
                ("csection", "C-section"),
                ("nicu", "NICU stay"),
                ("extended", "Extended hospital stay (3+ days)"),
                ("complications", "Complications requiring additional care"),
                ("none", "None, standard delivery"),
            ],
        )
        .multi()
        .when(Condition::equals("situation", "baby")),
        question(
            "nicu_duration",
            "How long was the NICU stay?",
            &[
                ("under1week", "Less than 1 week"),
                ("1-2weeks", "1-2 weeks"),
                ("2-4weeks", "2-4 weeks"),
                ("over1month", "Over a month"),
                ("ongoing", "Still ongoing"),
            ],
        )
        .when(Condition::contains("delivery", "nicu")),
        question(
            "hospital_services",
            "What type of care did you or your family member receive?",
            &[
                ("overnight", "Overnight hospital stay"),
                ("surgery", "Surgery or procedure"),
                ("er", "Emergency room visit(s)"),
                ("tests", "Specialized tests (MRI, CT scan, ultrasound)"),
                ("icu", "ICU or intensive care"),
                ("none", "None of the above"),
            ],
        )
        .multi()
        .when(Condition::one_of(
            "situation",
            &["baby", "hospital", "er", "chronic", "mix"],
        )),
        emergency,
        question(
            "ambulance",
            "Did you have an ambulance ride or medical transport?",
            &[
                ("no", "No"),
                ("ground", "Ground ambulance"),
                ("air", "Helicopter/air ambulance"),
                ("transfer", "Inter-facility transfer (between hospitals)"),
            ],
        )
        .why("Air ambulance bills average $30k-$50k and often have huge savings opportunities")
        .when(not_pregnant()),
        question(
            "out_of_network",
            "Were any of your providers out-of-network?",
            &[
                ("in_network", "Everything was in-network"),
                ("chose_oon", "I chose to go out-of-network"),
                (
                    "surprise",
                    "I got surprise out-of-network bills (didn't know they were OON)",
                ),
                ("not_sure", "Not sure how to tell"),
            ],
        )
        .why("Surprise out-of-network bills may be illegal under federal law")
        .when(not_pregnant()),
        question(
            "total_billed",
            "What's the total amount billed (before insurance)?",
            &[
                ("under5k", "Under $5,000"),
                ("5k-20k", "$5,000 - $20,000"),
                ("20k-50k", "$20,000 - $50,000"),
                ("50k-100k", "$50,000 - $100,000"),
                ("over100k", "Over $100,000"),
                ("not_sure", "Not sure yet"),
            ],
        )
        .when(not_pregnant()),
        question(
            "your_responsibility",
            "How much are YOU responsible for paying (after insurance)?",
            &[
                ("under1k", "Under $1,000"),
                ("1k-5k", "$1,000 - $5,000"),
                ("5k-15k", "$5,000 - $15,000"),
                ("over15k", "Over $15,000"),
                ("not_sure", "Not sure yet (still getting bills)"),
            ],
        )
        .when(not_pregnant()),
        question(
            "bill_status",
            "What's the status of your bills?",
            &[
                ("current", "All current, no past due"),
                ("past_due", "Some are past due (30-90 days)"),
                ("collections", "In collections"),
                ("legal", "Getting threats of legal action"),
                ("payment_plan", "In a payment plan"),
            ],
        )
        .why("Past due bills need immediate action to protect your credit")
        .when(not_pregnant()),
        question(
            "financial_hardship",
            "Are you struggling to pay these medical bills?",
            &[
                ("cant_afford", "Yes, I can't afford them"),
                ("tight", "It's tight but manageable with payment plan"),
                ("can_pay", "No, I can pay but don't want to overpay"),
                ("wipe_savings", "I could pay but it would wipe out savings"),
            ],
        )
        .why(
            "You may qualify for financial assistance or charity care programs that could reduce/eliminate bills",
        )
        .when(not_pregnant()),
        question(
            "actions_taken",
            "Have you done any of these?",
            &[
                ("itemized", "Requested itemized bills"),
                ("compared_eob", "Compared charges to insurance EOB"),
                ("assistance", "Asked about financial assistance"),
                ("negotiate", "Called to negotiate"),
                ("payment_plan", "Set up a payment plan"),
                ("charity", "Applied for charity care"),
                ("none", "None of the above"),
            ],
        )
        .multi()
        .when(not_pregnant()),
        question(
            "red_flags",
            "Have you noticed any of these?",
            &[
                ("duplicates", "Same charge listed multiple times"),
                ("should_cover", "Bills for services insurance should cover"),
                ("too_high", "Charges that seem way too high"),
                ("late_bills", "Bills still coming months later"),
                ("denials", "Insurance denied claims unexpectedly"),
                (
                    "multiple",
                    "Multiple bills from different providers for same visit",
                ),
                ("not_looked", "Haven't looked closely at the bills"),
            ],
        )
        .multi()
        .when(not_pregnant()),
    ]
}

fn info_page(id: &str, headline: &str, stats: &[&str], cta: &str) -> InfoPage {
    InfoPage {
        id: id.into(),
        headline: headline.into(),
        stats: stats.iter().map(|s| s.to_string()).collect(),
        cta: cta.into(),
        visible_when: None,
    }
}

fn builtin_info_pages() -> Vec<InfoPage> {
    let mut nicu = info_page(
        "nicu_info",
        "NICU Bills Are Especially Complex",
        &[
            "NICU stays generate an average of 50-200+ separate charges per day",
            "Studies show 90% of NICU bills contain billing errors or duplicate charges",
            "Average NICU overcharge: $3,500 - $12,000",
        ],
        "Continue",
    );
    nicu.headline = Text::Personalized {
        default: "NICU Bills Are Especially Complex".into(),
        variants: vec![TextVariant {
            when: Condition::one_of("nicu_duration", &["over1month", "ongoing"]),
            text: "Long NICU Stays Mean Thousands of Charges to Check".into(),
        }],
    };
    nicu.visible_when = Some(Condition::contains("delivery", "nicu"));

    let mut pregnant = info_page(
        "pregnant_preparation",
        "Get Ready Now, Save Money Later",
        &[
            "Average hospital delivery bill: $10,000-$30,000 (before insurance)",
            "80% of delivery bills contain billing errors or overcharges",
            "Parents who review bills carefully save an average of $2,000-$8,000",
            "We'll help you review everything after your baby arrives",
        ],
        "Continue",
    );
    pregnant.visible_when = Some(Condition::equals("situation", "pregnant"));

    let mut air = info_page(
        "air_ambulance_info",
        "Air Ambulance Bills Are Notoriously Inflated",
        &[
            "Average air ambulance bill: $40,000",
            "These bills are often 5-10x higher than the actual cost",
            "Good news: New federal laws protect you from surprise air ambulance bills",
        ],
        "Let's keep going",
    );
    air.visible_when = Some(Condition::equals("ambulance", "air"));

    let mut surprise = info_page(
        "surprise_oon_info",
        "Surprise Bills May Be Illegal",
        &[
            "The No Surprises Act protects you from most surprise out-of-network bills",
            "You may only owe the in-network rate, not what you were billed",
            "Average savings from challenging surprise bills: $2,800",
        ],
        "Continue",
    );
    surprise.visible_when = Some(Condition::equals("out_of_network", "surprise"));

    let overpay = info_page(
        "overpay_info",
        "Here's Why Most People Overpay",
        &[
            "80% of medical bills contain errors",
            "The average hospital bill has $1,400 in overcharges",
            "90% of people never check their bills for errors",
            "Most hospital visits generate bills with 10-30+ separate charges that are never reviewed",
        ],
        "Continue",
    );

    let mut assistance = info_page(
        "options_info",
        "You Have More Options Than You Think",
        &[
            "60% of patients qualify for financial assistance but never apply",
            "Hospitals are required to offer charity care programs - many people just don't know about them",
            "You could qualify for 50-100% bill reduction based on income",
        ],
        "See if you qualify",
    );
    assistance.visible_when = Some(Condition::all(vec![
        Condition::one_of("financial_hardship", &["cant_afford", "wipe_savings"]),
        Condition::not(Condition::contains_any(
            "actions_taken",
            &["assistance", "charity"],
        )),
    ]));

    let red_flags = info_page(
        "red_flags_info",
        "Those Red Flags? They're Worth Money.",
        &[
            "Each of those red flags typically represents $200-$2,000+ in overcharges",
            "Duplicate charges alone account for 30% of billing errors",
            "Insurance denials are often wrong - 50% of appeals succeed",
        ],
        "Continue to results",
    );

    vec![pregnant, nicu, air, surprise, overpay, assistance, red_flags]
}

fn builtin_anchors() -> BTreeMap<String, Vec<String>> {
    [
        ("reviewed_coverage", "pregnant_preparation"),
        ("nicu_duration", "nicu_info"),
        ("ambulance", "air_ambulance_info"),
        ("out_of_network", "surprise_oon_info"),
        ("your_responsibility", "overpay_info"),
        ("bill_status", "options_info"),
        ("red_flags", "red_flags_info"),
    ]
    .into_iter()
    .map(|(question, page)| (question.to_string(), vec![page.to_string()]))
    .collect()
}
