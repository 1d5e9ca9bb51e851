//! Bill Relief: an adaptive medical-bill quiz and savings estimator.

pub mod api;
pub mod config;
pub mod error;
pub mod estimator;
pub mod leads;
pub mod quiz;
pub mod store;
