//! PM conversation state machine
//!
//! The phase of a dialogue is a pure function of the shape of its history;
//! the caller drives transitions by appending turns.

mod history;
mod question;

pub use history::{
    ConversationTurn, HistoryError, OpeningMetadata, PmConversation, Role, TemplateType, is_initial, pm_transcript,
    transcript,
};
pub use question::{NEXT_QUESTION_CUE, framing, next_question, question_prompt};
