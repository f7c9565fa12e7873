//! Projection of the synthesized tree into nested mount descriptors.
//!
//! The descriptor shape is the container mount format: a file maps to
//! `{"file": {"contents": ...}}` and a folder to `{"directory": {...}}`
//! keyed by child name. Projection is a pure recursion over the tree and
//! holds no state of its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tree::FileNode;

/// A level of the mount descriptor, keyed by entry name.
///
/// BTreeMap keeps serialization order deterministic for a given tree.
pub type MountTree = BTreeMap<String, MountNode>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MountNode {
    File { file: FileContents },
    Directory { directory: MountTree },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContents {
    pub contents: String,
}

/// Project a synthesized tree into its mount descriptor.
pub fn project(tree: &[FileNode]) -> MountTree {
    tree.iter()
        .map(|node| (node.name().to_string(), project_node(node)))
        .collect()
}

fn project_node(node: &FileNode) -> MountNode {
    match node {
        FileNode::File { content, .. } => MountNode::File {
            file: FileContents {
                contents: content.clone(),
            },
        },
        FileNode::Folder { children, .. } => MountNode::Directory {
            directory: project(children),
        },
    }
}
