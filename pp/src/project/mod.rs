//! Project context provider
//!
//! Every generation phase grounds its prompt in text retrieved from the
//! indexed project through the `ProjectContext` seam.

use async_trait::async_trait;
use tracing::debug;

mod index;

pub use index::{ProjectIndex, ProjectIndexer};

/// Returned whenever retrieval yields nothing usable
pub const NO_RELEVANT_INFO: &str = "No se encontró información relevante del proyecto para esta consulta específica.";

/// A queryable view of the indexed project
#[async_trait]
pub trait ProjectContext: Send + Sync {
    /// Answer a natural-language question from project content.
    ///
    /// Never empty: failures and misses yield `NO_RELEVANT_INFO`.
    async fn query(&self, question: &str) -> String;
}

/// Why a phase is asking the project for context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPurpose {
    NextQuestion,
    Implementation,
    TechnicalPlanning,
    DeveloperChat,
    CodeGeneration,
}

impl QueryPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextQuestion => "formular la siguiente pregunta al PM",
            Self::Implementation => "la implementación",
            Self::TechnicalPlanning => "la planificación de la implementación (arquitectura, componentes, patrones)",
            Self::DeveloperChat => "responder preguntas técnicas sobre la implementación de la propuesta",
            Self::CodeGeneration => "generar código para la implementación",
        }
    }

    /// The retrieval question asked on behalf of this purpose
    pub fn question(&self) -> String {
        format!(
            "Dadas las funcionalidades mencionadas en la conversación, ¿qué información técnica relevante del proyecto podría necesitar para {}?",
            self.as_str()
        )
    }
}

/// Retrieve project context scoped to `purpose`
pub async fn relevant_project_info(ctx: &dyn ProjectContext, purpose: QueryPurpose) -> String {
    debug!(?purpose, "relevant_project_info: called");
    let answer = ctx.query(&purpose.question()).await;
    if answer.trim().is_empty() {
        NO_RELEVANT_INFO.to_string()
    } else {
        answer
    }
}
