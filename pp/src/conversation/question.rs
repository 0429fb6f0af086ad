//! Clarifying-question generation

use tracing::debug;

use super::history::{ConversationTurn, TemplateType, is_initial, transcript};
use crate::llm::complete_or_diagnose;
use crate::pipeline::Generation;
use crate::project::{QueryPurpose, relevant_project_info};
use crate::prompts::{PromptContext, PromptTask};

const OPENING_NEW: &str = "Para empezar, ¿cuál es el problema principal que esta funcionalidad busca resolver para el usuario, o cuál es el objetivo principal que queremos lograr con esta nueva característica?";

const OPENING_GENERIC: &str = "Para empezar, ¿cuál es el problema o el objetivo principal de lo que estamos discutiendo?";

const OPENING_EXISTING_PRD: &str = "Para empezar, ¿en qué funcionalidades o secciones del PRD existente deberíamos enfocarnos para generar las Historias de Usuario?";

const OBJECTIVE_EXISTING_PRD: &str = "Tu objetivo es ayudar a desglosar este PRD en Historias de Usuario detalladas.";

const OBJECTIVE_NEW_PRD: &str = "Tu objetivo es recopilar suficiente información para generar un PRD completamente nuevo.";

const OBJECTIVE_NEW_FEATURE: &str =
    "Tu objetivo es recopilar suficiente información para generar un PRD y Historias de Usuario para una nueva funcionalidad.";

/// Closing line of every question prompt
pub const NEXT_QUESTION_CUE: &str = "Siguiente pregunta para el PM:";

fn existing_prd_block(existing_prd: Option<&str>) -> String {
    format!(
        "El PM ha proporcionado el siguiente contenido de PRD existente:\n{}\n{}",
        existing_prd.unwrap_or_default(),
        OBJECTIVE_EXISTING_PRD
    )
}

/// Phase-dependent framing appended after the base prompt.
///
/// The initial phase asks a scripted opening question per template type;
/// later phases only restate the objective.
pub fn framing(initial: bool, template_type: &TemplateType, existing_prd: Option<&str>) -> String {
    match (initial, template_type) {
        (true, TemplateType::ExistingPrd) => format!("{}\n{}", existing_prd_block(existing_prd), OPENING_EXISTING_PRD),
        (true, TemplateType::NewPrd | TemplateType::NewFeature) => OPENING_NEW.to_string(),
        (true, TemplateType::Other(_)) => OPENING_GENERIC.to_string(),
        (false, TemplateType::ExistingPrd) => existing_prd_block(existing_prd),
        (false, TemplateType::NewPrd) => OBJECTIVE_NEW_PRD.to_string(),
        (false, TemplateType::NewFeature) => OBJECTIVE_NEW_FEATURE.to_string(),
        (false, TemplateType::Other(_)) => String::new(),
    }
}

/// Assemble the full question prompt from already-retrieved project context
pub fn question_prompt(
    generation: &Generation<'_>,
    turns: &[ConversationTurn],
    project_info: &str,
    template_type: &TemplateType,
    existing_prd: Option<&str>,
) -> String {
    let context = PromptContext {
        conversation_context: transcript(turns),
        project_info: project_info.to_string(),
        ..Default::default()
    };
    let base = generation.prompts.render(PromptTask::BaseChat, &context);
    let framing = framing(is_initial(turns), template_type, existing_prd);

    let mut prompt = base;
    if !framing.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&framing);
    }
    prompt.push_str("\n\n");
    prompt.push_str(NEXT_QUESTION_CUE);
    prompt.push('\n');
    prompt
}

/// Generate the next clarifying question for the PM.
///
/// Holds no state beyond `turns`. An LLM failure yields a diagnostic string
/// that the caller stores as the IA turn.
pub async fn next_question(
    generation: &Generation<'_>,
    turns: &[ConversationTurn],
    template_type: &TemplateType,
    existing_prd: Option<&str>,
) -> String {
    debug!(turn_count = turns.len(), %template_type, "next_question: called");
    let project_info = relevant_project_info(generation.project, QueryPurpose::NextQuestion).await;
    let prompt = question_prompt(generation, turns, &project_info, template_type, existing_prd);
    complete_or_diagnose(generation.llm, prompt, "la pregunta").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::OpeningMetadata;
    use crate::llm::Provider;
    use crate::llm::client::mock::MockLlmClient;
    use crate::project::stub::StubContext;
    use crate::prompts::PromptLoader;

    fn opening(template_type: TemplateType, existing_prd: Option<&str>) -> ConversationTurn {
        ConversationTurn::opening(
            "Queremos exportar informes a PDF",
            OpeningMetadata {
                template_type,
                existing_prd: existing_prd.map(str::to_string),
                provider: Provider::Google,
            },
        )
    }

    #[test]
    fn test_framing_openings() {
        assert_eq!(framing(true, &TemplateType::NewFeature, None), OPENING_NEW);
        assert_eq!(framing(true, &TemplateType::NewPrd, None), OPENING_NEW);
        assert_eq!(framing(true, &TemplateType::from("epic.md"), None), OPENING_GENERIC);

        let existing = framing(true, &TemplateType::ExistingPrd, Some("# PRD Pagos"));
        assert!(existing.contains("# PRD Pagos"));
        assert!(existing.ends_with(OPENING_EXISTING_PRD));
    }

    #[test]
    fn test_framing_objectives() {
        assert_eq!(framing(false, &TemplateType::NewPrd, None), OBJECTIVE_NEW_PRD);
        assert_eq!(framing(false, &TemplateType::NewFeature, None), OBJECTIVE_NEW_FEATURE);
        assert_eq!(framing(false, &TemplateType::from("epic.md"), None), "");

        let existing = framing(false, &TemplateType::ExistingPrd, Some("# PRD Pagos"));
        assert!(existing.contains("# PRD Pagos"));
        assert!(!existing.contains("Para empezar"));
    }

    #[tokio::test]
    async fn test_new_feature_start_asks_generic_opening() {
        let mock = MockLlmClient::replies(&["  ¿Qué problema resuelve?  "]);
        let project = StubContext::new("src/report.rs genera informes");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let question = next_question(&generation, &[], &TemplateType::NewFeature, None).await;

        assert_eq!(question, "¿Qué problema resuelve?");
        let prompt = &mock.prompts()[0];
        assert!(prompt.contains(OPENING_NEW));
        assert!(!prompt.contains("PRD existente"));
        assert!(prompt.contains("src/report.rs genera informes"));
        assert!(prompt.trim_end().ends_with(NEXT_QUESTION_CUE));
        assert_eq!(project.questions(), vec![QueryPurpose::NextQuestion.question()]);
    }

    #[tokio::test]
    async fn test_existing_prd_start_embeds_prd_verbatim() {
        let prd = "# PRD: Pagos recurrentes\n- {{no es una plantilla}}\n- <html> & otros";
        let mock = MockLlmClient::replies(&["¿Qué secciones?"]);
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let turns = vec![opening(TemplateType::ExistingPrd, Some(prd))];
        next_question(&generation, &turns, &TemplateType::ExistingPrd, Some(prd)).await;

        let prompt = &mock.prompts()[0];
        assert!(prompt.contains(prd));
        assert!(prompt.contains(OPENING_EXISTING_PRD));
    }

    #[tokio::test]
    async fn test_dialogue_phase_states_objective() {
        let mock = MockLlmClient::replies(&["¿Y los permisos?"]);
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let turns = vec![
            opening(TemplateType::NewPrd, None),
            ConversationTurn::ia("¿Para qué usuarios?"),
            ConversationTurn::pm("Administradores"),
        ];
        next_question(&generation, &turns, &TemplateType::NewPrd, None).await;

        let prompt = &mock.prompts()[0];
        assert!(prompt.contains(OBJECTIVE_NEW_PRD));
        assert!(!prompt.contains("Para empezar"));
        assert!(prompt.contains("PM: Queremos exportar informes a PDF\nIA: ¿Para qué usuarios?\nPM: Administradores"));
    }

    #[tokio::test]
    async fn test_llm_failure_returns_diagnostic() {
        let mock = MockLlmClient::failing("503 unavailable");
        let project = StubContext::new("info");
        let prompts = PromptLoader::embedded_only();
        let generation = Generation::new(&mock, &project, &prompts);

        let question = next_question(&generation, &[], &TemplateType::NewFeature, None).await;
        assert!(question.starts_with("Error al generar la pregunta con el LLM:"));
        assert!(question.contains("503 unavailable"));
    }
}
