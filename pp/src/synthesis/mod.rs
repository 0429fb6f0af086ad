//! Document synthesis
//!
//! PRD, User Stories and Technical Plan are produced as a strict chain: each
//! later stage is grounded in the PRD of the same run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conversation::{ConversationTurn, TemplateType, pm_transcript};
use crate::llm::complete_or_diagnose;
use crate::pipeline::Generation;
use crate::project::{QueryPurpose, relevant_project_info};
use crate::prompts::{PromptContext, PromptTask};

pub const USER_STORIES_HEADING: &str = "# Historias de Usuario";
pub const TECHNICAL_PLAN_HEADING: &str = "# Plan Técnico";

/// The three documents of one synthesis run, replaced as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub prd: String,
    pub user_stories: String,
    pub technical_plan: String,
    pub generated_at: DateTime<Utc>,
}

impl DocumentSet {
    pub fn new(prd: String, user_stories: String, technical_plan: String) -> Self {
        Self {
            prd,
            user_stories,
            technical_plan,
            generated_at: Utc::now(),
        }
    }
}

/// Prefix `text` with `heading` unless it already starts with it
pub fn ensure_heading(text: &str, heading: &str) -> String {
    if text.starts_with(heading) {
        text.to_string()
    } else {
        format!("{}\n{}", heading, text)
    }
}

/// Template skeleton for the PRD prompt.
///
/// Existing-PRD breakdowns use the PM's PRD verbatim; every other type loads
/// the named skeleton, falling back to an empty one.
fn template_content(generation: &Generation<'_>, template_type: &TemplateType, existing_prd: Option<&str>) -> String {
    match template_type {
        TemplateType::ExistingPrd => existing_prd.unwrap_or_default().to_string(),
        other => generation.prompts.skeleton(other.as_str()),
    }
}

/// Generate the Technical Plan from the PRD of the current run
pub async fn generate_technical_plan(generation: &Generation<'_>, turns: &[ConversationTurn], prd: &str) -> String {
    debug!(prd_len = prd.len(), "generate_technical_plan: called");
    let context = PromptContext {
        conversation_context: pm_transcript(turns),
        project_info: relevant_project_info(generation.project, QueryPurpose::TechnicalPlanning).await,
        prd_content: prd.to_string(),
        ..Default::default()
    };
    let prompt = generation.prompts.render(PromptTask::TechnicalPlan, &context);
    let plan = complete_or_diagnose(generation.llm, prompt, "el Plan Técnico").await;
    ensure_heading(&plan, TECHNICAL_PLAN_HEADING)
}

/// Produce PRD, User Stories and Technical Plan from a PM history.
///
/// Only the PM's own turns feed the documents. A failed stage leaves its
/// diagnostic in place and the next stage still runs.
pub async fn synthesize(
    generation: &Generation<'_>,
    turns: &[ConversationTurn],
    template_type: &TemplateType,
    existing_prd: Option<&str>,
) -> DocumentSet {
    debug!(turn_count = turns.len(), %template_type, "synthesize: called");

    let requirements = pm_transcript(turns);
    let project_info = relevant_project_info(generation.project, QueryPurpose::Implementation).await;

    let prd_context = PromptContext {
        conversation_context: requirements.clone(),
        project_info: project_info.clone(),
        template_content: template_content(generation, template_type, existing_prd),
        ..Default::default()
    };
    let prd_prompt = generation.prompts.render(PromptTask::Prd, &prd_context);
    let prd = complete_or_diagnose(generation.llm, prd_prompt, "el PRD").await;

    let stories_context = PromptContext {
        conversation_context: requirements,
        project_info,
        prd_content: prd.clone(),
        ..Default::default()
    };
    let stories_prompt = generation.prompts.render(PromptTask::UserStories, &stories_context);
    let stories = complete_or_diagnose(generation.llm, stories_prompt, "las Historias de Usuario").await;
    let user_stories = ensure_heading(&stories, USER_STORIES_HEADING);

    let technical_plan = generate_technical_plan(generation, turns, &prd).await;

    info!(
        prd_len = prd.len(),
        user_stories_len = user_stories.len(),
        technical_plan_len = technical_plan.len(),
        "Documents generated"
    );
    DocumentSet::new(prd, user_stories, technical_plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::OpeningMetadata;
    use crate::llm::Provider;
    use crate::llm::client::mock::MockLlmClient;
    use crate::project::stub::StubContext;
    use crate::prompts::PromptLoader;
    use proptest::prelude::*;

    fn history(template_type: TemplateType, existing_prd: Option<&str>) -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::opening(
                "Necesitamos notificaciones por correo",
                OpeningMetadata {
                    template_type,
                    existing_prd: existing_prd.map(str::to_string),
                    provider: Provider::Ollama,
                },
            ),
            ConversationTurn::ia("¿A qué usuarios?"),
            ConversationTurn::pm("A los administradores"),
        ]
    }

    #[test]
    fn test_ensure_heading() {
        assert_eq!(ensure_heading("- historia", USER_STORIES_HEADING), "# Historias de Usuario\n- historia");
        assert_eq!(
            ensure_heading("# Historias de Usuario\n- historia", USER_STORIES_HEADING),
            "# Historias de Usuario\n- historia"
        );
        assert_eq!(ensure_heading("", TECHNICAL_PLAN_HEADING), "# Plan Técnico\n");
    }

    proptest! {
        #[test]
        fn prop_ensure_heading_idempotent(text in ".{0,200}") {
            let once = ensure_heading(&text, TECHNICAL_PLAN_HEADING);
            prop_assert!(once.starts_with(TECHNICAL_PLAN_HEADING));
            prop_assert_eq!(ensure_heading(&once, TECHNICAL_PLAN_HEADING), once.clone());
        }
    }

    #[tokio::test]
    async fn test_synthesize_chains_prd_into_later_stages() {
        let mock = MockLlmClient::replies(&["# PRD Notificaciones", "Como admin, quiero...", "1. Crear mailer"]);
        let project = StubContext::new("src/mail.rs existe");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let docs = synthesize(&generation, &history(TemplateType::NewFeature, None), &TemplateType::NewFeature, None).await;

        assert_eq!(docs.prd, "# PRD Notificaciones");
        assert_eq!(docs.user_stories, "# Historias de Usuario\nComo admin, quiero...");
        assert_eq!(docs.technical_plan, "# Plan Técnico\n1. Crear mailer");

        let prompts = mock.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains(&docs.prd));
        assert!(prompts[2].contains(&docs.prd));
    }

    #[tokio::test]
    async fn test_documents_use_pm_turns_only() {
        let mock = MockLlmClient::always("texto");
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        synthesize(&generation, &history(TemplateType::NewPrd, None), &TemplateType::NewPrd, None).await;

        for prompt in mock.prompts() {
            assert!(prompt.contains("PM: Necesitamos notificaciones por correo\nPM: A los administradores\n"));
            assert!(!prompt.contains("¿A qué usuarios?"));
        }
    }

    #[tokio::test]
    async fn test_template_resolution() {
        let mock = MockLlmClient::always("texto");
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let prd = "# PRD heredado\nSección única";
        synthesize(&generation, &history(TemplateType::ExistingPrd, Some(prd)), &TemplateType::ExistingPrd, Some(prd))
            .await;
        assert!(mock.prompts()[0].contains(prd));

        let mock = MockLlmClient::always("texto");
        let generation = Generation::new(&mock, &project, &prompts);
        synthesize(&generation, &history(TemplateType::NewPrd, None), &TemplateType::NewPrd, None).await;
        assert!(mock.prompts()[0].contains("Requisitos funcionales"));
    }

    #[tokio::test]
    async fn test_failed_stage_does_not_stop_chain() {
        let mock = MockLlmClient::new(vec![
            Err("quota exceeded".to_string()),
            Ok("Como PM, quiero...".to_string()),
            Ok("# Plan Técnico\nPasos".to_string()),
        ]);
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let docs = synthesize(&generation, &history(TemplateType::NewFeature, None), &TemplateType::NewFeature, None).await;

        assert!(docs.prd.starts_with("Error al generar el PRD con el LLM:"));
        assert_eq!(docs.user_stories, "# Historias de Usuario\nComo PM, quiero...");
        assert_eq!(docs.technical_plan, "# Plan Técnico\nPasos");
        assert!(mock.prompts()[2].contains(&docs.prd));
    }

    #[tokio::test]
    async fn test_diagnostics_keep_headings() {
        let mock = MockLlmClient::failing("503");
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let docs = synthesize(&generation, &history(TemplateType::NewPrd, None), &TemplateType::NewPrd, None).await;
        assert!(docs.user_stories.starts_with(USER_STORIES_HEADING));
        assert!(docs.user_stories.contains("Error al generar las Historias de Usuario"));
        assert!(docs.technical_plan.starts_with(TECHNICAL_PLAN_HEADING));
        assert!(docs.technical_plan.contains("Error al generar el Plan Técnico"));
    }

    #[tokio::test]
    async fn test_retrieval_purposes() {
        let mock = MockLlmClient::always("texto");
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        synthesize(&generation, &history(TemplateType::NewPrd, None), &TemplateType::NewPrd, None).await;
        assert_eq!(
            project.questions(),
            vec![
                QueryPurpose::Implementation.question(),
                QueryPurpose::TechnicalPlanning.question()
            ]
        );
    }
}
