//! ContextStore - on-disk project context for retrieval-augmented generation
//!
//! Turns a project directory into something an LLM prompt can be grounded in:
//! a flat textual rendering of the sources, a hierarchical file tree, and a
//! persisted vector collection of overlapping chunks that can be searched by
//! similarity.
//!
//! # Architecture
//!
//! ```text
//! <store-dir>/
//! └── {collection}/
//!     ├── index.jsonl      # one chunk per line: id, text, embedding
//!     └── tree.json        # file tree captured at ingestion time
//! ```
//!
//! # Example
//!
//! ```ignore
//! use contextstore::{ContextStore, HashingEmbedder, chunk_text, ingest_project};
//!
//! let store = ContextStore::open(".contextstore")?;
//! let project = ingest_project("./my-app", &IngestOptions::default())?;
//! let chunks = chunk_text(&project.content, 4096, 80);
//! ```

mod chunk;
mod embed;
mod ingest;
mod store;
mod tree;

pub use chunk::chunk_text;
pub use embed::{Embedder, HashingEmbedder, cosine_similarity};
pub use ingest::{EMPTY_CONTENT, FALLBACK_CONTENT, IngestOptions, IngestedProject, SKIPPED_DIRS, ingest_project};
pub use store::{ChunkRecord, ContextStore, ScoredChunk};
pub use tree::{ERROR_TREE_NAME, FileTree, NodeKind};

/// Default chunk size (characters)
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Default overlap between consecutive chunks (characters)
pub const DEFAULT_OVERLAP: usize = 80;

/// Default collection name for the active project
pub const DEFAULT_COLLECTION: &str = "project_index";
