//! Project ingestion: flat text plus file tree

use eyre::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::tree::FileTree;

/// Directories never descended into
pub const SKIPPED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "dist",
    "build",
];

/// Text substituted when ingestion fails, so indexing always has content
pub const FALLBACK_CONTENT: &str = "Este es un contenido de fallback porque la ingesta del proyecto falló o no se pudo ejecutar. Asegúrate de que el directorio del proyecto exista y sea válido.";

/// Text used when a project contains no readable files
pub const EMPTY_CONTENT: &str = "No se extrajo contenido del proyecto.";

const BANNER: &str = "================================================";

/// Options for ingesting a project
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
        }
    }
}

/// Result of ingesting a project directory
#[derive(Debug, Clone)]
pub struct IngestedProject {
    /// Short human-readable summary
    pub summary: String,
    /// Hierarchical file tree
    pub tree: FileTree,
    /// Every file rendered under a `FILE:` banner
    pub content: String,
}

impl IngestedProject {
    /// Degraded result used when ingestion cannot run
    pub fn fallback() -> Self {
        Self {
            summary: "Ingestion failed".to_string(),
            tree: FileTree::error_marker(),
            content: FALLBACK_CONTENT.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.content == FALLBACK_CONTENT && self.tree.is_error()
    }
}

/// Ingest the project rooted at `root`
pub fn ingest_project(root: impl AsRef<Path>, options: &IngestOptions) -> Result<IngestedProject> {
    let root = root.as_ref();
    debug!(root = %root.display(), "ingest_project: called");

    if !root.is_dir() {
        bail!("Project path is not a directory: {}", root.display());
    }
    let root = root
        .canonicalize()
        .context(format!("Failed to resolve project path: {}", root.display()))?;

    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());

    let mut tree = FileTree::dir(root_name.clone());
    let mut content = String::new();
    let mut file_count = 0usize;

    let root_for_filter = root.clone();
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| {
            if e.path() == root_for_filter {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if name.starts_with('.') {
                return false;
            }
            !(e.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref()))
        });

    for entry in walker {
        let entry = entry.context("Failed to walk project directory")?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if size > options.max_file_bytes {
            debug!(path = %path.display(), size, "ingest_project: skipping large file");
            continue;
        }

        let text = match fs::read(path).map(String::from_utf8) {
            Ok(Ok(text)) => text,
            _ => {
                debug!(path = %path.display(), "ingest_project: skipping unreadable or binary file");
                continue;
            }
        };

        let relative = path.strip_prefix(&root).unwrap_or(path);
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let display_path = components.join("/");

        tree.insert_path(&components);
        content.push_str(&format!("{BANNER}\nFILE: {display_path}\n{BANNER}\n{text}\n\n"));
        file_count += 1;
    }

    if content.is_empty() {
        content = EMPTY_CONTENT.to_string();
    }

    let summary = format!(
        "Directory: {}\nFiles analyzed: {}\n\nEstimated tokens: {}",
        root_name,
        file_count,
        content.chars().count() / 4
    );

    info!(root = %root.display(), file_count, "Ingestion complete");
    Ok(IngestedProject { summary, tree, content })
}
