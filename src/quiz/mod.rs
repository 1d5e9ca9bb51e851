//! Quiz flow: catalog, visibility conditions, flow resolution and sessions.
//!
//! A session owns one user's [`AnswerSet`]. After each answer the flow is
//! re-resolved from the catalog; the cursor indexes into that flow.

pub mod catalog;
pub mod condition;
pub mod flow;
pub mod model;
pub mod session;
pub mod view;

pub use catalog::Catalog;
pub use condition::Condition;
pub use flow::{AUTO_ADVANCE_DELAY_MS, CursorMove, FlowCursor, FlowItem, Progress, resolve_flow};
pub use model::{AnswerSet, AnswerValue, InfoPage, NONE_OPTION, Question, QuizOption, Text};
pub use session::{QuizSession, SessionStatus, SessionSummary, Step};
pub use view::StepView;
