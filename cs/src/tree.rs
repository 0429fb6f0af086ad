//! Hierarchical file tree captured during ingestion

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Name carried by the placeholder tree when ingestion fails
pub const ERROR_TREE_NAME: &str = "Error: Could not retrieve file tree.";

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dir,
    File,
}

/// A directory or file node.
///
/// Directories always serialize `children`, even when empty; files omit it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileTree {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<FileTree>,
}

impl Serialize for FileTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_children = self.kind == NodeKind::Dir || !self.children.is_empty();
        let mut state = serializer.serialize_struct("FileTree", if with_children { 3 } else { 2 })?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("type", &self.kind)?;
        if with_children {
            state.serialize_field("children", &self.children)?;
        } else {
            state.skip_field("children")?;
        }
        state.end()
    }
}

impl FileTree {
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Dir,
            children: Vec::new(),
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            children: Vec::new(),
        }
    }

    /// The explicit error-marker tree substituted when ingestion fails
    pub fn error_marker() -> Self {
        Self::dir(ERROR_TREE_NAME)
    }

    pub fn is_error(&self) -> bool {
        self.kind == NodeKind::Dir && self.name == ERROR_TREE_NAME && self.children.is_empty()
    }

    /// Number of file nodes below (and including) this node
    pub fn file_count(&self) -> usize {
        match self.kind {
            NodeKind::File => 1,
            NodeKind::Dir => self.children.iter().map(FileTree::file_count).sum(),
        }
    }

    /// Insert a file at a relative path, creating intermediate directories
    pub fn insert_path(&mut self, components: &[String]) {
        let Some((first, rest)) = components.split_first() else {
            return;
        };

        if rest.is_empty() {
            if !self.children.iter().any(|c| c.name == *first && c.kind == NodeKind::File) {
                self.children.push(FileTree::file(first.clone()));
            }
            return;
        }

        let idx = match self
            .children
            .iter()
            .position(|c| c.name == *first && c.kind == NodeKind::Dir)
        {
            Some(idx) => idx,
            None => {
                self.children.push(FileTree::dir(first.clone()));
                self.children.len() - 1
            }
        };
        self.children[idx].insert_path(rest);
    }

    /// Render as indented text, directories suffixed with `/`
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        self.render_into(0, &mut lines);
        lines.join("\n")
    }

    fn render_into(&self, depth: usize, lines: &mut Vec<String>) {
        let suffix = if self.kind == NodeKind::Dir { "/" } else { "" };
        if depth == 0 {
            lines.push(format!("{}{}", self.name, suffix));
        } else {
            let indent = "    ".repeat(depth - 1);
            lines.push(format!("{}├── {}{}", indent, self.name, suffix));
        }
        for child in &self.children {
            child.render_into(depth + 1, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(path: &str) -> Vec<String> {
        path.split('/').map(String::from).collect()
    }

    #[test]
    fn test_error_marker_serializes_like_fallback_tree() {
        let json = serde_json::to_value(FileTree::error_marker()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": ERROR_TREE_NAME, "type": "dir", "children": [] })
        );
        assert!(FileTree::error_marker().is_error());
    }

    #[test]
    fn test_insert_path_builds_hierarchy() {
        let mut root = FileTree::dir("app");
        root.insert_path(&parts("src/main.rs"));
        root.insert_path(&parts("src/lib.rs"));
        root.insert_path(&parts("Cargo.toml"));

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.file_count(), 3);
        assert!(!root.is_error());

        let src = root.children.iter().find(|c| c.name == "src").unwrap();
        assert_eq!(src.kind, NodeKind::Dir);
        assert_eq!(src.children.len(), 2);
    }

    #[test]
    fn test_render() {
        let mut root = FileTree::dir("app");
        root.insert_path(&parts("src/main.rs"));

        let rendered = root.render();
        assert_eq!(rendered, "app/\n├── src/\n    ├── main.rs");
    }

    #[test]
    fn test_roundtrip_file_node_without_children() {
        let json = r#"{"name":"README.md","type":"file"}"#;
        let node: FileTree = serde_json::from_str(json).unwrap();
        assert_eq!(node, FileTree::file("README.md"));
        assert_eq!(serde_json::to_string(&node).unwrap(), json);
    }

    #[test]
    fn test_empty_dir_keeps_children_field() {
        let mut root = FileTree::dir("app");
        root.insert_path(&parts("empty/.keep"));
        root.children[0].children.clear();

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["children"][0]["children"], serde_json::json!([]));
    }
}
