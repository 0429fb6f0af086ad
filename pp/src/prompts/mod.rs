//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files, one per generation task.
//!
//! Template loading chain:
//! 1. `{prompts.dir}/{name}.pmt` (override)
//! 2. Embedded default compiled in from `pp/prompts/`
//! 3. Empty string, with a warning
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader, PromptTask};
