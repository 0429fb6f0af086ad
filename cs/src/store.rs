//! Core ContextStore implementation

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::embed::cosine_similarity;
use crate::tree::FileTree;

/// Unique identifier for a chunk within a collection
pub type ChunkId = String;

/// A stored chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk ID
    pub chunk_id: ChunkId,
    /// Chunk text
    pub text: String,
    /// Dense vector for similarity search
    pub embedding: Vec<f32>,
    /// Embedding model that produced the vector
    pub model: String,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

impl ChunkRecord {
    pub fn new(chunk_id: impl Into<ChunkId>, text: impl Into<String>, embedding: Vec<f32>, model: &str) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            text: text.into(),
            embedding,
            model: model.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A search hit
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub text: String,
    pub score: f32,
}

/// The main context store
pub struct ContextStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl ContextStore {
    /// Open or create a context store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened context store");
        Ok(Self { base_path })
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        if collection.is_empty() || collection.contains(['/', '\\']) || collection.contains("..") {
            return Err(eyre!("Invalid collection name: {}", collection));
        }
        Ok(self.base_path.join(collection))
    }

    fn read_records(&self, collection: &str) -> Result<Vec<ChunkRecord>> {
        let index_path = self.collection_path(collection)?.join("index.jsonl");
        if !index_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&index_path).context(format!("Failed to open {}", index_path.display()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ChunkRecord =
                serde_json::from_str(&line).context(format!("Corrupt chunk record in {}", index_path.display()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Number of chunks stored in a collection; 0 when it does not exist
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.read_records(collection)?.len())
    }

    /// Append chunks to a collection, creating it if needed
    pub fn add(&self, collection: &str, records: Vec<ChunkRecord>) -> Result<usize> {
        let ctx_path = self.collection_path(collection)?;
        fs::create_dir_all(&ctx_path)?;

        let index_path = ctx_path.join("index.jsonl");
        let mut index_file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .context(format!("Failed to open {}", index_path.display()))?;

        let added = records.len();
        for record in records {
            let line = serde_json::to_string(&record)?;
            writeln!(index_file, "{}", line)?;
        }

        info!(collection, chunk_count = added, "Added chunks to collection");
        Ok(added)
    }

    /// Top-k chunks by cosine similarity to `embedding`, best first
    pub fn search(&self, collection: &str, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let records = self.read_records(collection)?;
        debug!(collection, candidates = records.len(), top_k, "search: called");

        let mut scored: Vec<ScoredChunk> = records
            .into_iter()
            .map(|r| ScoredChunk {
                score: cosine_similarity(&r.embedding, embedding),
                chunk_id: r.chunk_id,
                text: r.text,
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Persist the file tree captured at ingestion time
    pub fn save_tree(&self, collection: &str, tree: &FileTree) -> Result<()> {
        let ctx_path = self.collection_path(collection)?;
        fs::create_dir_all(&ctx_path)?;
        let json = serde_json::to_string_pretty(tree)?;
        fs::write(ctx_path.join("tree.json"), json)?;
        Ok(())
    }

    /// Load the persisted file tree, if any
    pub fn load_tree(&self, collection: &str) -> Result<Option<FileTree>> {
        let tree_path = self.collection_path(collection)?.join("tree.json");
        if !tree_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&tree_path)?;
        match serde_json::from_str(&content) {
            Ok(tree) => Ok(Some(tree)),
            Err(e) => {
                warn!(path = %tree_path.display(), error = %e, "Ignoring malformed tree file");
                Ok(None)
            }
        }
    }

    /// Delete a collection and all its data
    pub fn clear(&self, collection: &str) -> Result<()> {
        let ctx_path = self.collection_path(collection)?;
        if ctx_path.exists() {
            fs::remove_dir_all(&ctx_path)?;
            info!(collection, "Cleared collection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, text: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord::new(id, text, embedding, "test")
    }

    #[test]
    fn test_add_and_search() {
        let temp = TempDir::new().unwrap();
        let store = ContextStore::open(temp.path()).unwrap();

        store
            .add(
                "project_index",
                vec![
                    record("0001", "login handler", vec![1.0, 0.0]),
                    record("0002", "chart palette", vec![0.0, 1.0]),
                    record("0003", "session login", vec![0.9, 0.1]),
                ],
            )
            .unwrap();

        let hits = store.search("project_index", &[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "0001");
        assert_eq!(hits[1].chunk_id, "0003");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_count_missing_collection_is_zero() {
        let temp = TempDir::new().unwrap();
        let store = ContextStore::open(temp.path()).unwrap();
        assert_eq!(store.count("nothing").unwrap(), 0);
        assert!(store.search("nothing", &[1.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_clear_and_persistence() {
        let temp = TempDir::new().unwrap();
        {
            let store = ContextStore::open(temp.path()).unwrap();
            store.add("c", vec![record("0001", "a", vec![1.0])]).unwrap();
        }

        let store = ContextStore::open(temp.path()).unwrap();
        assert_eq!(store.count("c").unwrap(), 1);

        store.clear("c").unwrap();
        assert_eq!(store.count("c").unwrap(), 0);
    }

    #[test]
    fn test_tree_roundtrip_beside_chunks() {
        let temp = TempDir::new().unwrap();
        let store = ContextStore::open(temp.path()).unwrap();

        let mut tree = FileTree::dir("app");
        tree.insert_path(&["main.rs".to_string()]);
        store.save_tree("c", &tree).unwrap();
        store.add("c", vec![record("0001", "hello", vec![1.0])]).unwrap();

        assert_eq!(store.load_tree("c").unwrap(), Some(tree));
        assert_eq!(store.count("c").unwrap(), 1);
    }

    #[test]
    fn test_rejects_path_like_collection_names() {
        let temp = TempDir::new().unwrap();
        let store = ContextStore::open(temp.path()).unwrap();
        assert!(store.count("../escape").is_err());
        assert!(store.clear("a/b").is_err());
    }
}
