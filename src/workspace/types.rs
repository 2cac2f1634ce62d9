// Editor shell state types.
// Serializable shapes for open tabs and the workspace file tree.

use serde::{Deserialize, Serialize};

/// An open editor tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub name: String,
    pub content: String,
    pub language: String,
    #[serde(default)]
    pub is_dirty: bool,
}

impl Tab {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            language: language.into(),
            is_dirty: false,
        }
    }
}

/// File tree node type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

/// Node in the workspace file tree, as returned by the file-tree endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
}

impl FileNode {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::File,
            children: None,
            is_open: None,
        }
    }

    pub fn folder(name: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::Folder,
            children: Some(children),
            is_open: None,
        }
    }

    /// Number of files below (and including) this node.
    pub fn file_count(&self) -> usize {
        match self.node_type {
            NodeType::File => 1,
            NodeType::Folder => self
                .children
                .iter()
                .flatten()
                .map(FileNode::file_count)
                .sum(),
        }
    }
}
