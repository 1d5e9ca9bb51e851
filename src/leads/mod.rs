//! Lead capture, progressive tracking sinks and funnel analytics.

pub mod events;
pub mod model;
pub mod sink;
pub mod webhook;

pub use events::{EventSink, QuizEvent, TracingEventSink};
pub use model::{ContactDetails, ProgressRecord};
pub use sink::{CompositeSink, LeadSink, ProgressSource};
pub use webhook::WebhookSink;
