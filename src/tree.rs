//! File tree synthesis: folding the step log into a project tree.
//!
//! The tree is derived state. It is recomputed from the full, append-only
//! step log after every turn, and the fold is pure: the same ordered step
//! slice always yields the same tree, and re-running from scratch equals
//! extending the previous tree incrementally. Nothing here logs, errors, or
//! keeps state between calls.

use serde::{Deserialize, Serialize};

use crate::steps::{Step, StepKind};

/// One node of the synthesized project tree.
///
/// `path` is the normalized slash path from the project root and serves as
/// the node's identity key; `name` is its last segment. Children are unique
/// by name within a parent and keep first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileNode {
    File {
        name: String,
        path: String,
        content: String,
    },
    Folder {
        name: String,
        path: String,
        children: Vec<FileNode>,
    },
}

impl FileNode {
    pub fn name(&self) -> &str {
        match self {
            FileNode::File { name, .. } | FileNode::Folder { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            FileNode::File { path, .. } | FileNode::Folder { path, .. } => path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileNode::Folder { .. })
    }

    /// File body; `None` for folders.
    pub fn content(&self) -> Option<&str> {
        match self {
            FileNode::File { content, .. } => Some(content),
            FileNode::Folder { .. } => None,
        }
    }
}

/// Fold the cumulative step log into a root-level node sequence.
///
/// CreateFile steps upsert file nodes (and any intermediate folders);
/// CreateFolder steps upsert explicit, possibly empty folder nodes.
/// RunCommand and Unknown steps never touch the tree.
pub fn synthesize(steps: &[Step]) -> Vec<FileNode> {
    let mut root = Vec::new();
    for step in steps {
        apply_step(&mut root, step);
    }
    root
}

/// Fold one step onto an existing tree.
///
/// `synthesize` is exactly a left fold of this over the step log, which is
/// what makes wholesale recomputation and incremental extension equivalent.
pub fn apply_step(root: &mut Vec<FileNode>, step: &Step) {
    let Some(path) = step.path.as_deref() else {
        return;
    };
    match step.kind {
        StepKind::CreateFile => {
            let content = step.content.clone().unwrap_or_default();
            upsert_file(root, path, content);
        }
        StepKind::CreateFolder => upsert_folder(root, path),
        StepKind::RunCommand | StepKind::Unknown => {}
    }
}

/// Look a node up by its normalized path, anywhere in the tree.
pub fn find<'a>(nodes: &'a [FileNode], path: &str) -> Option<&'a FileNode> {
    for node in nodes {
        if node.path() == path {
            return Some(node);
        }
        if let FileNode::Folder { children, .. } = node {
            if let Some(found) = find(children, path) {
                return Some(found);
            }
        }
    }
    None
}

/// Indented listing of the tree, folders suffixed with `/`.
pub fn render(nodes: &[FileNode]) -> String {
    let mut out = String::new();
    render_into(nodes, 0, &mut out);
    out
}

fn render_into(nodes: &[FileNode], depth: usize, out: &mut String) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node {
            FileNode::Folder { name, children, .. } => {
                out.push_str(&format!("{}{}/\n", indent, name));
                render_into(children, depth + 1, out);
            }
            FileNode::File { name, .. } => {
                out.push_str(&format!("{}{}\n", indent, name));
            }
        }
    }
}

fn upsert_file(root: &mut Vec<FileNode>, path: &str, content: String) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((leaf, folders)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    let mut prefix = String::new();
    for segment in folders {
        prefix = join(&prefix, segment);
        current = descend(current, segment, &prefix);
    }

    let full = join(&prefix, leaf);
    let node = FileNode::File {
        name: (*leaf).to_string(),
        path: full.clone(),
        content,
    };
    match current.iter().position(|n| n.path() == full) {
        // Last writer wins: replaces the content of an existing file, or the
        // whole node if a folder previously occupied this path.
        Some(idx) => current[idx] = node,
        None => current.push(node),
    }
}

fn upsert_folder(root: &mut Vec<FileNode>, path: &str) {
    let mut current = root;
    let mut prefix = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        prefix = join(&prefix, segment);
        current = descend(current, segment, &prefix);
    }
}

/// Walk into the folder named `name` under `siblings`, creating it if
/// absent. A file node already occupying the path is overwritten by a fresh
/// folder (last writer wins).
fn descend<'a>(siblings: &'a mut Vec<FileNode>, name: &str, path: &str) -> &'a mut Vec<FileNode> {
    let idx = match siblings.iter().position(|n| n.path() == path) {
        Some(idx) => {
            if !siblings[idx].is_folder() {
                siblings[idx] = empty_folder(name, path);
            }
            idx
        }
        None => {
            siblings.push(empty_folder(name, path));
            siblings.len() - 1
        }
    };
    match &mut siblings[idx] {
        FileNode::Folder { children, .. } => children,
        FileNode::File { .. } => unreachable!("descend always leaves a folder at idx"),
    }
}

fn empty_folder(name: &str, path: &str) -> FileNode {
    FileNode::Folder {
        name: name.to_string(),
        path: path.to_string(),
        children: Vec::new(),
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", prefix, segment)
    }
}
