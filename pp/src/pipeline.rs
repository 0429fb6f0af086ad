//! Collaborators shared by every generation step

use crate::llm::LlmClient;
use crate::project::ProjectContext;
use crate::prompts::PromptLoader;

/// The LLM, project context and prompts one generation step works with
#[derive(Clone, Copy)]
pub struct Generation<'a> {
    pub llm: &'a dyn LlmClient,
    pub project: &'a dyn ProjectContext,
    pub prompts: &'a PromptLoader,
}

impl<'a> Generation<'a> {
    pub fn new(llm: &'a dyn LlmClient, project: &'a dyn ProjectContext, prompts: &'a PromptLoader) -> Self {
        Self { llm, project, prompts }
    }
}
