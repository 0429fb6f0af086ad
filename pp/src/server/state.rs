//! Shared application state

use std::str::FromStr;
use std::sync::Arc;

use contextstore::FileTree;
use eyre::Result;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::error::PilotError;
use crate::llm::{ClientFactory, ConfiguredClients, Provider};
use crate::project::{ProjectContext, ProjectIndexer};
use crate::prompts::PromptLoader;
use crate::store::{SessionRepo, open_store};

/// The indexed project every session currently works against
#[derive(Clone)]
pub struct ActiveProject {
    pub context: Arc<dyn ProjectContext>,
    pub tree: FileTree,
}

/// Holds at most one active project per process.
///
/// Indexing a project replaces it for every session.
#[derive(Clone, Default)]
pub struct ProjectSlot(Arc<RwLock<Option<ActiveProject>>>);

impl ProjectSlot {
    pub async fn replace(&self, project: ActiveProject) {
        *self.0.write().await = Some(project);
    }

    pub async fn current(&self) -> Option<ActiveProject> {
        self.0.read().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.0.read().await.is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub default_provider: Provider,
    pub repo: SessionRepo,
    pub project: ProjectSlot,
    pub clients: Arc<dyn ClientFactory>,
    pub prompts: Arc<PromptLoader>,
    pub indexer: Arc<ProjectIndexer>,
}

impl AppState {
    /// Wire real providers, stores and prompts from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!("AppState::from_config: called");
        let store = open_store(&config.store)?;
        let indexer = ProjectIndexer::from_config(config);

        Ok(Self {
            default_provider: config.llm.default,
            repo: SessionRepo::new(store),
            project: ProjectSlot::default(),
            clients: Arc::new(ConfiguredClients::new(config.llm.clone())),
            prompts: Arc::new(PromptLoader::new(&config.prompts)),
            indexer: Arc::new(indexer),
        })
    }

    /// Parse a per-request provider, defaulting when omitted
    pub fn provider(&self, requested: Option<&str>) -> Result<Provider, PilotError> {
        match requested {
            None => Ok(self.default_provider),
            Some(name) => Provider::from_str(name),
        }
    }
}
