//! HTTP service: quiz sessions, estimates and lead capture over REST.

pub mod routes;
pub mod state;

pub use routes::quiz_routes;
pub use state::{AppState, SessionIdProvider, SessionRegistry, UuidSessionIds};
