//! PrdPilot - code-grounded PRD assistant
//!
//! Walks a Product Manager through a clarification dialogue, then produces a
//! PRD, User Stories and a Technical Plan grounded in an indexed codebase,
//! followed by a developer chat that can yield a ticket summary and a brief
//! for a code-generation agent.
//!
//! # Modules
//!
//! - [`project`] - Project index and the retrieval seam every phase queries
//! - [`prompts`] - Prompt templates and document skeletons
//! - [`conversation`] - PM dialogue history and question generation
//! - [`synthesis`] - PRD, User Stories and Technical Plan generation
//! - [`developer`] - Developer chat, ticket summary and code-agent brief
//! - [`store`] - Session persistence
//! - [`server`] - HTTP request surface
//! - [`llm`] - Completion and embedding providers

pub mod cli;
pub mod config;
pub mod conversation;
pub mod developer;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod project;
pub mod prompts;
pub mod server;
pub mod store;
pub mod synthesis;

pub use config::{Config, LlmConfig};
pub use conversation::{ConversationTurn, PmConversation, Role, TemplateType, next_question};
pub use error::PilotError;
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Provider, create_client};
pub use pipeline::Generation;
pub use project::{ProjectContext, ProjectIndex, ProjectIndexer};
pub use prompts::{PromptContext, PromptLoader};
pub use store::{SessionRepo, SessionStore};
pub use synthesis::{DocumentSet, synthesize};
