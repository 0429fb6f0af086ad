//! Prompt Loader
//!
//! Loads prompt templates and document skeletons from override directories,
//! falling back to embedded defaults.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::embedded;
use crate::config::PromptsConfig;

/// One prompt per generation task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTask {
    /// Next clarifying question for the PM
    BaseChat,
    Prd,
    UserStories,
    TechnicalPlan,
    DeveloperChat,
    TicketSummary,
    CodeAgentBrief,
}

impl PromptTask {
    /// Get the template name for this task
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::BaseChat => "base-chat",
            Self::Prd => "prd",
            Self::UserStories => "user-stories",
            Self::TechnicalPlan => "technical-plan",
            Self::DeveloperChat => "developer-chat",
            Self::TicketSummary => "ticket-summary",
            Self::CodeAgentBrief => "code-agent-brief",
        }
    }
}

/// Context for rendering prompt templates
///
/// Fields a task does not use stay empty and render as nothing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    /// Flattened `ROLE: content` transcript of the PM dialogue
    pub conversation_context: String,
    /// Retrieved project context
    pub project_info: String,
    /// Document skeleton or existing PRD
    pub template_content: String,
    pub prd_content: String,
    pub user_stories_content: String,
    pub technical_plan_content: String,
    /// Flattened transcript of the developer dialogue
    pub developer_chat_context: String,
}

/// Template names are plain identifiers, never paths
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directory for `.pmt` files
    prompt_dir: Option<PathBuf>,
    /// Directory holding document skeletons
    templates_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a prompt loader from configuration
    pub fn new(config: &PromptsConfig) -> Self {
        debug!(?config, "PromptLoader::new: called");
        let existing = |dir: &Path| {
            if dir.is_dir() {
                Some(dir.to_path_buf())
            } else {
                debug!(?dir, "PromptLoader::new: directory not found");
                None
            }
        };

        Self {
            hbs: Self::engine(),
            prompt_dir: existing(&config.dir),
            templates_dir: existing(&config.templates_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            prompt_dir: None,
            templates_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.set_strict_mode(false);
        hbs
    }

    /// Load a prompt template by name
    ///
    /// Checks the override directory, then the embedded defaults.
    fn load_template(&self, name: &str) -> Option<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(dir) = &self.prompt_dir
            && is_plain_name(name)
        {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        debug!(?path, "PromptLoader::load_template: found override");
                        return Some(content);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to read prompt override"),
                }
            }
        }

        embedded::get_embedded(name).map(str::to_string)
    }

    /// Render the prompt for `task`.
    ///
    /// A missing template or a render failure yields an empty string so the
    /// caller can still attempt a best-effort completion.
    pub fn render(&self, task: PromptTask, context: &PromptContext) -> String {
        let name = task.template_name();
        debug!(%name, "PromptLoader::render: called");

        let Some(template) = self.load_template(name) else {
            warn!(%name, "Prompt template not found, using empty prompt");
            return String::new();
        };

        match self.hbs.render_template(&template, context) {
            Ok(rendered) => {
                info!("Rendered prompt '{}' ({} chars)", name, rendered.len());
                rendered
            }
            Err(e) => {
                warn!(%name, error = %e, "Failed to render prompt template, using empty prompt");
                String::new()
            }
        }
    }

    /// Load the document skeleton for a template type, e.g. `prd.md`.
    ///
    /// Checks the templates directory, then the embedded skeletons; unknown or
    /// unreadable skeletons yield an empty string.
    pub fn skeleton(&self, template_type: &str) -> String {
        debug!(%template_type, "PromptLoader::skeleton: called");
        if !is_plain_name(template_type) {
            warn!(%template_type, "Refusing to load skeleton with a path-like name");
            return String::new();
        }

        if let Some(dir) = &self.templates_dir {
            let path = dir.join(template_type);
            if path.is_file() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => return content,
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to read document skeleton"),
                }
            }
        }

        match embedded::get_skeleton(template_type) {
            Some(content) => content.to_string(),
            None => {
                warn!(%template_type, "Document skeleton not found, using empty skeleton");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context() -> PromptContext {
        PromptContext {
            conversation_context: "PM: Quiero exportar informes".to_string(),
            project_info: "src/reports.rs define ReportBuilder".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_embedded_base_chat() {
        let loader = PromptLoader::embedded_only();
        let rendered = loader.render(PromptTask::BaseChat, &context());

        assert!(rendered.contains("PM: Quiero exportar informes"));
        assert!(rendered.contains("ReportBuilder"));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_render_does_not_html_escape() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext {
            prd_content: "<b>Vec<String></b> & \"quotes\"".to_string(),
            ..Default::default()
        };
        let rendered = loader.render(PromptTask::UserStories, &ctx);
        assert!(rendered.contains("<b>Vec<String></b> & \"quotes\""));
    }

    #[test]
    fn test_every_task_renders_without_placeholders() {
        let loader = PromptLoader::embedded_only();
        for task in [
            PromptTask::BaseChat,
            PromptTask::Prd,
            PromptTask::UserStories,
            PromptTask::TechnicalPlan,
            PromptTask::DeveloperChat,
            PromptTask::TicketSummary,
            PromptTask::CodeAgentBrief,
        ] {
            let rendered = loader.render(task, &PromptContext::default());
            assert!(!rendered.is_empty(), "{task:?}");
            assert!(!rendered.contains("{{"), "{task:?}");
        }
    }

    #[test]
    fn test_override_directory_wins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("prd.pmt"), "CUSTOM {{template_content}}").unwrap();

        let loader = PromptLoader::new(&PromptsConfig {
            dir: temp.path().to_path_buf(),
            templates_dir: temp.path().join("missing"),
        });
        let ctx = PromptContext {
            template_content: "esqueleto".to_string(),
            ..Default::default()
        };
        assert_eq!(loader.render(PromptTask::Prd, &ctx), "CUSTOM esqueleto");
    }

    #[test]
    fn test_broken_override_renders_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ticket-summary.pmt"), "{{#if}} unclosed").unwrap();

        let loader = PromptLoader::new(&PromptsConfig {
            dir: temp.path().to_path_buf(),
            templates_dir: temp.path().to_path_buf(),
        });
        assert_eq!(loader.render(PromptTask::TicketSummary, &PromptContext::default()), "");
    }

    #[test]
    fn test_skeleton_chain() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("custom.md"), "# Mi plantilla").unwrap();

        let loader = PromptLoader::new(&PromptsConfig {
            dir: temp.path().join("missing"),
            templates_dir: temp.path().to_path_buf(),
        });

        assert_eq!(loader.skeleton("custom.md"), "# Mi plantilla");
        assert!(loader.skeleton("prd.md").contains("PRD"));
        assert_eq!(loader.skeleton("unknown.md"), "");
    }

    #[test]
    fn test_skeleton_rejects_paths() {
        let temp = TempDir::new().unwrap();
        let inner = temp.path().join("templates");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(temp.path().join("secret.md"), "secreto").unwrap();

        let loader = PromptLoader::new(&PromptsConfig {
            dir: inner.clone(),
            templates_dir: inner,
        });

        assert_eq!(loader.skeleton("../secret.md"), "");
        assert_eq!(loader.skeleton("/etc/passwd"), "");
    }
}
