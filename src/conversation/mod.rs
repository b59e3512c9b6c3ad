//! Multi-step conversations: session model and the state machine driving it

pub mod machine;
pub mod session;

pub use machine::{ConfirmOutcome, ConversationEngine, GenderOutcome, SelectOutcome, TextOutcome};
pub use session::{ConversationState, CustomPromptData, Session, SessionField, SessionPatch};
