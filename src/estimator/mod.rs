//! Savings estimator.
//!
//! A pure function of the answer set: rule tables produce categorized
//! contributions, which are multiplied by how much the user already did and
//! how delinquent the bills are, then capped by their out-of-pocket bucket.

pub mod calculator;
pub mod model;
pub mod pregnancy;
pub mod rules;

pub use calculator::calculate_savings;
pub use model::{BreakdownEntry, DollarRange, SavingsEstimate, UrgencyLevel};
pub use rules::{DEFAULT_CEILING, ceiling_for};
