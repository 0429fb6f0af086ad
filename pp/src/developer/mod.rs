//! Developer collaboration flow
//!
//! A second dialogue, independent of the PM one, grounded in the generated
//! documents.

use tracing::debug;

use crate::conversation::{ConversationTurn, transcript};
use crate::llm::{LlmClient, complete_or_diagnose};
use crate::pipeline::Generation;
use crate::project::{QueryPurpose, relevant_project_info};
use crate::prompts::{PromptContext, PromptLoader, PromptTask};
use crate::synthesis::DocumentSet;

async fn grounded_context(
    generation: &Generation<'_>,
    turns: &[ConversationTurn],
    documents: &DocumentSet,
    purpose: QueryPurpose,
) -> PromptContext {
    PromptContext {
        developer_chat_context: transcript(turns),
        prd_content: documents.prd.clone(),
        user_stories_content: documents.user_stories.clone(),
        technical_plan_content: documents.technical_plan.clone(),
        project_info: relevant_project_info(generation.project, purpose).await,
        ..Default::default()
    }
}

/// Answer the latest developer message using the documents and project context
pub async fn developer_chat_response(
    generation: &Generation<'_>,
    turns: &[ConversationTurn],
    documents: &DocumentSet,
) -> String {
    debug!(turn_count = turns.len(), "developer_chat_response: called");
    let context = grounded_context(generation, turns, documents, QueryPurpose::DeveloperChat).await;
    let prompt = generation.prompts.render(PromptTask::DeveloperChat, &context);
    complete_or_diagnose(generation.llm, prompt, "la respuesta para el chat del desarrollador").await
}

/// Condense the developer dialogue into a ticket description.
///
/// Uses the transcript alone: no retrieval and no documents.
pub async fn summarize_for_ticket(llm: &dyn LlmClient, prompts: &PromptLoader, turns: &[ConversationTurn]) -> String {
    debug!(turn_count = turns.len(), "summarize_for_ticket: called");
    let context = PromptContext {
        developer_chat_context: transcript(turns),
        ..Default::default()
    };
    let prompt = prompts.render(PromptTask::TicketSummary, &context);
    complete_or_diagnose(llm, prompt, "el resumen para Jira").await
}

/// Build an implementation brief for an autonomous code-generation agent
pub async fn generate_code_agent_brief(
    generation: &Generation<'_>,
    turns: &[ConversationTurn],
    documents: &DocumentSet,
) -> String {
    debug!(turn_count = turns.len(), "generate_code_agent_brief: called");
    let context = grounded_context(generation, turns, documents, QueryPurpose::CodeGeneration).await;
    let prompt = generation.prompts.render(PromptTask::CodeAgentBrief, &context);
    complete_or_diagnose(generation.llm, prompt, "el brief para el agente de código").await
}
