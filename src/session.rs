//! Build session: the conversation loop that turns prompts into a mounted
//! project.
//!
//! A session owns the append-only step log and the sandbox the project is
//! materialized into. Every backend turn appends one payload; the tree and
//! mount are then re-derived from the whole log, never patched in place.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::{BackendClient, ChatMessage};
use crate::mount::project;
use crate::sandbox::{Sandbox, STATE_DIR};
use crate::steps::{parse_steps, Step, StepStatus};
use crate::tree::{synthesize, FileNode};

/// Schema version of the persisted session log.
const SESSION_LOG_VERSION: u32 = 1;

/// Persisted record of one build session.
///
/// Only inputs are stored: the message history and every ingested payload
/// in arrival order. Steps, tree, and mount are recomputed on load, so the
/// log stays small and a resumed session lands in the same state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLog {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    pub payloads: Vec<String>,
}

/// One prompt-to-project conversation and its derived state.
pub struct BuildSession<S> {
    sandbox: S,
    messages: Vec<ChatMessage>,
    payloads: Vec<String>,
    steps: Vec<Step>,
    tree: Vec<FileNode>,
    created_at: DateTime<Utc>,
}

impl<S: Sandbox> BuildSession<S> {
    pub fn new(sandbox: S) -> Self {
        Self {
            sandbox,
            messages: Vec::new(),
            payloads: Vec::new(),
            steps: Vec::new(),
            tree: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn tree(&self) -> &[FileNode] {
        &self.tree
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether the opening turn has completed. A started session takes
    /// follow-up turns; an unstarted one must bootstrap first.
    pub fn is_started(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Run the opening turn: fetch the template scaffold for the prompt,
    /// ingest it, then run the first chat turn over the seeded history.
    pub async fn bootstrap(&mut self, client: &BackendClient, prompt: &str) -> Result<()> {
        let template = client.fetch_template(prompt).await?;
        info!(
            "Template scaffold: {} prompt(s), {} payload(s)",
            template.prompts.len(),
            template.ui_prompts.len()
        );

        if let Some(scaffold) = template.ui_prompts.first() {
            self.ingest_payload(scaffold)?;
        }

        let mut messages: Vec<ChatMessage> =
            template.prompts.into_iter().map(ChatMessage::user).collect();
        messages.push(ChatMessage::user(prompt));

        let reply = client.chat(&messages).await?;

        // History is committed only once the turn succeeded, so a failed
        // bootstrap can be retried from scratch.
        self.messages = messages;
        self.messages.push(ChatMessage::assistant(reply.response.clone()));
        self.ingest_payload(&reply.response)
    }

    /// Run one follow-up turn over the full history plus the new prompt.
    pub async fn followup(&mut self, client: &BackendClient, prompt: &str) -> Result<()> {
        let mut messages = self.messages.clone();
        messages.push(ChatMessage::user(prompt));

        let reply = client.chat(&messages).await?;

        messages.push(ChatMessage::assistant(reply.response.clone()));
        self.messages = messages;
        self.ingest_payload(&reply.response)
    }

    /// Parse one raw payload, append its steps to the log, and re-derive
    /// tree and mount from the whole log.
    ///
    /// New steps go in-progress for the mount and complete with it. If the
    /// mount fails they fall back to pending; already completed steps keep
    /// their status.
    pub fn ingest_payload(&mut self, raw: &str) -> Result<()> {
        let base = self.steps.len() as u64;
        let mut incoming = parse_steps(raw, base);
        debug!("Parsed {} step(s) from payload", incoming.len());

        for step in &mut incoming {
            step.status = StepStatus::InProgress;
        }
        self.steps.append(&mut incoming);
        self.payloads.push(raw.to_string());

        self.tree = synthesize(&self.steps);
        let mount = project(&self.tree);
        match self.sandbox.mount(&mount) {
            Ok(()) => {
                for step in &mut self.steps {
                    step.status = StepStatus::Completed;
                }
                Ok(())
            }
            Err(err) => {
                for step in &mut self.steps {
                    if step.status == StepStatus::InProgress {
                        step.status = StepStatus::Pending;
                    }
                }
                Err(err)
            }
        }
    }

    /// Path of the session log inside an output directory.
    pub fn log_path(dir: &Path) -> PathBuf {
        dir.join(STATE_DIR).join("session.json")
    }

    /// Save the session log under the output directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::log_path(dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let log = SessionLog {
            version: SESSION_LOG_VERSION,
            created_at: self.created_at,
            updated_at: Utc::now(),
            messages: self.messages.clone(),
            payloads: self.payloads.clone(),
        };
        let content =
            serde_json::to_string_pretty(&log).context("Failed to serialize session log")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write session log to {}", path.display()))?;

        debug!("Session log saved to {}", path.display());
        Ok(())
    }

    /// Load a session log from the output directory and replay it, ending
    /// with one mount of the final state. Returns `None` when there is no
    /// usable log.
    pub fn load(sandbox: S, dir: &Path) -> Result<Option<Self>> {
        let path = Self::log_path(dir);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session log from {}", path.display()))?;
        let log: SessionLog = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session log from {}", path.display()))?;
        if log.version != SESSION_LOG_VERSION {
            warn!("Ignoring session log with unsupported version {}", log.version);
            return Ok(None);
        }

        let mut session = Self::new(sandbox);
        session.created_at = log.created_at;
        session.messages = log.messages;
        session.replay(&log.payloads)?;

        info!(
            "Resumed session: {} step(s) across {} payload(s)",
            session.steps.len(),
            session.payloads.len()
        );
        Ok(Some(session))
    }

    /// Re-ingest recorded payloads, deferring the mount to the end.
    fn replay(&mut self, payloads: &[String]) -> Result<()> {
        for raw in payloads {
            let base = self.steps.len() as u64;
            let mut incoming = parse_steps(raw, base);
            self.steps.append(&mut incoming);
            self.payloads.push(raw.clone());
        }

        self.tree = synthesize(&self.steps);
        self.sandbox
            .mount(&project(&self.tree))
            .context("Failed to restore mounted project from session log")?;
        for step in &mut self.steps {
            step.status = StepStatus::Completed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::MountTree;
    use crate::sandbox::DirSandbox;
    use crate::steps::StepKind;
    use crate::tree::find;
    use tempfile::TempDir;

    /// Sandbox double that records every mount, optionally failing some.
    #[derive(Default)]
    struct RecordingSandbox {
        mounts: Vec<MountTree>,
        fail_after: Option<usize>,
    }

    impl Sandbox for RecordingSandbox {
        fn mount(&mut self, tree: &MountTree) -> Result<()> {
            if let Some(limit) = self.fail_after {
                if self.mounts.len() >= limit {
                    anyhow::bail!("sandbox is full");
                }
            }
            self.mounts.push(tree.clone());
            Ok(())
        }
    }

    const FIRST_PAYLOAD: &str = concat!(
        "<root>",
        "<createfile path=\"src/a.txt\">hello</createfile>",
        "<createfile path=\"src/b/c.txt\">world</createfile>",
        "</root>"
    );

    const SECOND_PAYLOAD: &str = concat!(
        "<root>",
        "<createfile path=\"src/b.txt\">new</createfile>",
        "<createfile path=\"src/a.txt\">updated</createfile>",
        "</root>"
    );

    #[test]
    fn test_ingest_builds_and_mounts() {
        let mut session = BuildSession::new(RecordingSandbox::default());
        session.ingest_payload(FIRST_PAYLOAD).unwrap();

        assert_eq!(session.steps().len(), 2);
        assert!(session
            .steps()
            .iter()
            .all(|s| s.status == StepStatus::Completed));
        assert_eq!(
            find(session.tree(), "src/a.txt").unwrap().content(),
            Some("hello")
        );

        assert_eq!(session.sandbox.mounts.len(), 1);
        let mounted = serde_json::to_value(&session.sandbox.mounts[0]).unwrap();
        assert_eq!(mounted["src"]["directory"]["a.txt"]["file"]["contents"], "hello");
    }

    #[test]
    fn test_second_payload_extends_log_and_overwrites() {
        let mut session = BuildSession::new(RecordingSandbox::default());
        session.ingest_payload(FIRST_PAYLOAD).unwrap();
        session.ingest_payload(SECOND_PAYLOAD).unwrap();

        let sequences: Vec<u64> = session.steps().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert!(session
            .steps()
            .iter()
            .all(|s| s.kind == StepKind::CreateFile));

        assert_eq!(
            find(session.tree(), "src/a.txt").unwrap().content(),
            Some("updated")
        );
        assert_eq!(
            find(session.tree(), "src/b.txt").unwrap().content(),
            Some("new")
        );
        assert_eq!(
            find(session.tree(), "src/b/c.txt").unwrap().content(),
            Some("world")
        );
        assert_eq!(session.sandbox.mounts.len(), 2);
    }

    #[test]
    fn test_mount_failure_reverts_new_steps_to_pending() {
        let sandbox = RecordingSandbox {
            mounts: Vec::new(),
            fail_after: Some(1),
        };
        let mut session = BuildSession::new(sandbox);

        session.ingest_payload(FIRST_PAYLOAD).unwrap();
        let err = session.ingest_payload(SECOND_PAYLOAD);
        assert!(err.is_err());

        let statuses: Vec<StepStatus> = session.steps().iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Completed,
                StepStatus::Completed,
                StepStatus::Pending,
                StepStatus::Pending,
            ]
        );
        // The payload stays in the log; a later replay retries the mount.
        assert_eq!(session.payloads.len(), 2);
    }

    #[test]
    fn test_save_and_load_replays_to_same_state() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();

        let mut original = BuildSession::new(DirSandbox::new(out));
        original.ingest_payload(FIRST_PAYLOAD).unwrap();
        original.ingest_payload(SECOND_PAYLOAD).unwrap();
        original.messages = vec![
            ChatMessage::user("build a todo app"),
            ChatMessage::assistant(SECOND_PAYLOAD),
        ];
        original.save(out).unwrap();

        let resumed = BuildSession::load(DirSandbox::new(out), out)
            .unwrap()
            .expect("session log should load");

        assert_eq!(resumed.steps(), original.steps());
        assert_eq!(resumed.tree(), original.tree());
        assert_eq!(resumed.messages(), original.messages());
        assert!(resumed.is_started());

        let a = std::fs::read_to_string(out.join("src/a.txt")).unwrap();
        assert_eq!(a, "updated");
    }

    #[test]
    fn test_load_without_log_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = BuildSession::load(DirSandbox::new(temp_dir.path()), temp_dir.path()).unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_failed_bootstrap_commits_nothing() {
        let client = BackendClient::new("not a url");
        let mut session = BuildSession::new(RecordingSandbox::default());

        assert!(session.bootstrap(&client, "build a blog").await.is_err());

        assert!(session.messages().is_empty());
        assert!(session.steps().is_empty());
        assert!(session.sandbox.mounts.is_empty());
        assert!(!session.is_started());
    }

    #[tokio::test]
    async fn test_failed_followup_keeps_history_unchanged() {
        let client = BackendClient::new("not a url");
        let mut session = BuildSession::new(RecordingSandbox::default());
        session.ingest_payload(FIRST_PAYLOAD).unwrap();
        session.messages = vec![
            ChatMessage::user("build a todo app"),
            ChatMessage::assistant(FIRST_PAYLOAD),
        ];

        assert!(session.followup(&client, "add a footer").await.is_err());

        // The user prompt lives only in the request; history and mounts are
        // exactly as they were before the failed turn.
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.steps().len(), 2);
        assert_eq!(session.sandbox.mounts.len(), 1);
    }

    #[test]
    fn test_load_ignores_unsupported_version() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path();

        let mut session = BuildSession::new(DirSandbox::new(out));
        session.ingest_payload(FIRST_PAYLOAD).unwrap();
        session.save(out).unwrap();

        let path = BuildSession::<DirSandbox>::log_path(out);
        let doctored = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"version\": 1", "\"version\": 99");
        std::fs::write(&path, doctored).unwrap();

        let loaded = BuildSession::load(DirSandbox::new(out), out).unwrap();
        assert!(loaded.is_none());
    }
}
