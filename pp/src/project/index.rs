//! Building, loading and querying the on-disk project index

use async_trait::async_trait;
use contextstore::{
    ChunkRecord, ContextStore, Embedder, FileTree, IngestOptions, IngestedProject, chunk_text, ingest_project,
};
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{NO_RELEVANT_INFO, ProjectContext};
use crate::config::{Config, EmbeddingConfig, IndexConfig, LlmConfig};
use crate::llm::{CompletionRequest, LlmClient, create_client, create_embedder};

/// Queryable handle over one persisted collection
pub struct ProjectIndex {
    store: Arc<ContextStore>,
    collection: String,
    embedder: Arc<dyn Embedder>,
    synthesizer: Option<Arc<dyn LlmClient>>,
    top_k: usize,
}

impl ProjectIndex {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn chunk_count(&self) -> usize {
        self.store.count(&self.collection).unwrap_or(0)
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<String>> {
        let mut vectors = self.embedder.embed(&[question.to_string()]).await?;
        let embedding = vectors.pop().ok_or_else(|| eyre::eyre!("Embedder returned no vector"))?;

        let store = self.store.clone();
        let collection = self.collection.clone();
        let top_k = self.top_k;
        let hits = tokio::task::spawn_blocking(move || store.search(&collection, &embedding, top_k)).await??;

        Ok(hits.into_iter().map(|h| h.text).collect())
    }

    async fn condense(&self, llm: &dyn LlmClient, question: &str, chunks: &str) -> Result<String> {
        let prompt = format!(
            "Contexto extraído del código del proyecto:\n{}\n\nUsando solo el contexto anterior, responde de forma concisa.\nPregunta: {}\nRespuesta:",
            chunks, question
        );
        let response = llm.complete(CompletionRequest::new(prompt)).await?;
        Ok(response.content.trim().to_string())
    }
}

#[async_trait]
impl ProjectContext for ProjectIndex {
    async fn query(&self, question: &str) -> String {
        debug!(collection = %self.collection, "ProjectIndex::query: called");

        let chunks = match self.retrieve(question).await {
            Ok(chunks) if !chunks.is_empty() => chunks.join("\n\n---\n\n"),
            Ok(_) => {
                debug!("ProjectIndex::query: no hits");
                return NO_RELEVANT_INFO.to_string();
            }
            Err(e) => {
                warn!(error = %e, "Project retrieval failed");
                return NO_RELEVANT_INFO.to_string();
            }
        };

        let Some(llm) = &self.synthesizer else {
            return chunks;
        };

        match self.condense(llm.as_ref(), question, &chunks).await {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => NO_RELEVANT_INFO.to_string(),
            Err(e) => {
                warn!(error = %e, "Retrieval synthesis failed");
                NO_RELEVANT_INFO.to_string()
            }
        }
    }
}

/// Where the indexer gets its embedder from
enum EmbedderSource {
    Ready(Arc<dyn Embedder>),
    /// Created per index request so a missing credential only fails indexing
    Configured { embedding: EmbeddingConfig, llm: LlmConfig },
}

/// Builds or reloads the project index for a path
pub struct ProjectIndexer {
    config: IndexConfig,
    embedder: EmbedderSource,
    synthesizer: Option<Arc<dyn LlmClient>>,
}

impl ProjectIndexer {
    pub fn new(config: IndexConfig, embedder: Arc<dyn Embedder>, synthesizer: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            config,
            embedder: EmbedderSource::Ready(embedder),
            synthesizer,
        }
    }

    /// Build an indexer with the configured embedder and, when enabled, the
    /// default provider as retrieval synthesizer
    pub fn from_config(config: &Config) -> Self {
        debug!("ProjectIndexer::from_config: called");

        let synthesizer = if config.index.synthesize {
            match create_client(config.llm.default, &config.llm) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "Retrieval synthesis disabled, returning raw chunks");
                    None
                }
            }
        } else {
            None
        };

        Self {
            config: config.index.clone(),
            embedder: EmbedderSource::Configured {
                embedding: config.embedding.clone(),
                llm: config.llm.clone(),
            },
            synthesizer,
        }
    }

    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        match &self.embedder {
            EmbedderSource::Ready(embedder) => Ok(embedder.clone()),
            EmbedderSource::Configured { embedding, llm } => {
                create_embedder(embedding, llm).context("Failed to create embedding client")
            }
        }
    }

    fn handle(&self, store: Arc<ContextStore>, embedder: Arc<dyn Embedder>) -> ProjectIndex {
        ProjectIndex {
            store,
            collection: self.config.collection.clone(),
            embedder,
            synthesizer: self.synthesizer.clone(),
            top_k: self.config.top_k,
        }
    }

    fn open_store(&self) -> Result<Arc<ContextStore>> {
        let store = ContextStore::open(&self.config.store_dir)
            .context(format!("Failed to open index at {}", self.config.store_dir.display()))?;
        Ok(Arc::new(store))
    }

    /// Open the persisted index without touching any project, if it has entries
    pub async fn open_existing(&self) -> Result<Option<ProjectIndex>> {
        let store = self.open_store()?;
        let collection = self.config.collection.clone();
        if blocking(&store, move |s| s.count(&collection)).await? == 0 {
            return Ok(None);
        }
        Ok(Some(self.handle(store, self.embedder()?)))
    }

    /// Return the index and file tree for `path`.
    ///
    /// Reuses a non-empty persisted collection unless `force` is set; any
    /// failure while loading falls through to a rebuild. Ingestion failure
    /// degrades to fallback content and the error-marker tree.
    pub async fn build_or_load(&self, path: &Path, force: bool) -> Result<(ProjectIndex, FileTree)> {
        debug!(path = %path.display(), force, "build_or_load: called");
        let embedder = self.embedder()?;
        let store = self.open_store()?;

        if !force {
            match self.try_load(&store, &embedder, path).await {
                Ok(Some(loaded)) => return Ok(loaded),
                Ok(None) => debug!("build_or_load: no persisted index, building"),
                Err(e) => warn!(error = %e, "Could not load existing index, rebuilding"),
            }
        }

        self.rebuild(store, embedder, path).await
    }

    async fn try_load(
        &self,
        store: &Arc<ContextStore>,
        embedder: &Arc<dyn Embedder>,
        path: &Path,
    ) -> Result<Option<(ProjectIndex, FileTree)>> {
        let collection = self.config.collection.clone();
        let count = blocking(store, {
            let collection = collection.clone();
            move |s| s.count(&collection)
        })
        .await?;
        if count == 0 {
            return Ok(None);
        }

        info!(collection = %collection, count, "Loading existing project index");
        let persisted = blocking(store, {
            let collection = collection.clone();
            move |s| s.load_tree(&collection)
        })
        .await?;
        let tree = match persisted {
            Some(tree) => tree,
            None => {
                debug!("try_load: no persisted tree, re-ingesting for tree only");
                let tree = self.ingest(path).await.tree;
                if !tree.is_error() {
                    let saved = tree.clone();
                    blocking(store, move |s| s.save_tree(&collection, &saved)).await?;
                }
                tree
            }
        };

        Ok(Some((self.handle(store.clone(), embedder.clone()), tree)))
    }

    async fn ingest(&self, path: &Path) -> IngestedProject {
        let options = IngestOptions {
            max_file_bytes: self.config.max_file_bytes,
        };
        let owned: PathBuf = path.to_path_buf();

        match tokio::task::spawn_blocking(move || ingest_project(&owned, &options)).await {
            Ok(Ok(project)) => project,
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Project ingestion failed, using fallback content");
                IngestedProject::fallback()
            }
            Err(e) => {
                warn!(error = %e, "Ingestion task failed, using fallback content");
                IngestedProject::fallback()
            }
        }
    }

    async fn rebuild(
        &self,
        store: Arc<ContextStore>,
        embedder: Arc<dyn Embedder>,
        path: &Path,
    ) -> Result<(ProjectIndex, FileTree)> {
        let collection = self.config.collection.clone();
        info!(path = %path.display(), "Building project index");

        let project = self.ingest(path).await;
        info!(summary = %project.summary, "Project ingested");
        let chunks = chunk_text(&project.content, self.config.chunk_size, self.config.chunk_overlap);
        debug!(chunk_count = chunks.len(), "rebuild: chunked project");

        let embeddings = embedder
            .embed(&chunks)
            .await
            .context("Failed to embed project chunks")?;
        if embeddings.len() != chunks.len() {
            eyre::bail!("Embedder returned {} vectors for {} chunks", embeddings.len(), chunks.len());
        }

        let model = embedder.model_name().to_string();
        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| ChunkRecord::new(format!("{:04}", i + 1), text, embedding, &model))
            .collect();

        let tree = project.tree;
        let added = blocking(&store, {
            let collection = collection.clone();
            let tree = tree.clone();
            move |s| {
                s.clear(&collection)?;
                let added = s.add(&collection, records)?;
                s.save_tree(&collection, &tree)?;
                Ok(added)
            }
        })
        .await?;

        info!(collection = %collection, chunk_count = added, files = tree.file_count(), "Project index built");
        Ok((self.handle(store, embedder), tree))
    }
}

/// Run a filesystem-bound store call off the async runtime
async fn blocking<T, F>(store: &Arc<ContextStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&ContextStore) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(&store)).await?
}
