//! Step record types shared across the interpreter pipeline.

use serde::{Deserialize, Serialize};

/// Kind of instruction a model turn asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CreateFile,
    CreateFolder,
    RunCommand,
    /// Anything the parser could not classify. Carries its raw text in the
    /// step description so malformed model output is surfaced, not dropped.
    Unknown,
}

/// Lifecycle tag for a step.
///
/// Only the build session moves a step through these states; the parser and
/// the tree synthesizer never touch them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// One atomic instruction extracted from a model turn.
///
/// Steps are immutable once parsed except for `status`, and the step list is
/// append-only: later turns extend it, never rewrite earlier entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Arrival index across all turns; the ordering key for tree synthesis.
    pub sequence: u64,
    pub kind: StepKind,
    /// Slash-delimited path relative to the project root.
    /// Present for CreateFile and CreateFolder steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// File body. Present for CreateFile steps only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Shell command text. Present for RunCommand steps only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Human-readable label for step-list display. No semantic weight.
    pub description: String,
    pub status: StepStatus,
}

impl Step {
    pub fn create_file(sequence: u64, path: String, content: String) -> Self {
        let description = format!("Create file {}", path);
        Self {
            sequence,
            kind: StepKind::CreateFile,
            path: Some(path),
            content: Some(content),
            command: None,
            description,
            status: StepStatus::Pending,
        }
    }

    pub fn create_folder(sequence: u64, path: String) -> Self {
        let description = format!("Create folder {}", path);
        Self {
            sequence,
            kind: StepKind::CreateFolder,
            path: Some(path),
            content: None,
            command: None,
            description,
            status: StepStatus::Pending,
        }
    }

    pub fn run_command(sequence: u64, command: String) -> Self {
        Self {
            sequence,
            kind: StepKind::RunCommand,
            path: None,
            content: None,
            command: Some(command),
            description: "Run command".to_string(),
            status: StepStatus::Pending,
        }
    }

    /// An unrecognized or malformed block, preserved rather than dropped.
    pub fn unknown(sequence: u64, tag: &str, body: &str) -> Self {
        let body = body.trim();
        let description = if body.is_empty() {
            format!("Unrecognized {} block", tag)
        } else {
            format!("Unrecognized {} block: {}", tag, body)
        };
        Self {
            sequence,
            kind: StepKind::Unknown,
            path: None,
            content: None,
            command: None,
            description,
            status: StepStatus::Pending,
        }
    }
}
