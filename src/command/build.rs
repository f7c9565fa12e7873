use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::api::{ApiError, BackendClient};
use crate::sandbox::DirSandbox;
use crate::session::BuildSession;
use crate::steps::{Step, StepStatus};
use crate::tree;

pub async fn run_build(
    backend_url: String,
    prompt: String,
    out: PathBuf,
    interactive: bool,
) -> Result<()> {
    let client = BackendClient::new(backend_url);

    let loaded = BuildSession::load(DirSandbox::new(&out), &out)?;
    let mut session = match loaded {
        Some(mut session) if session.is_started() => {
            println!(
                "📂 Resuming session in {} ({} earlier message(s))",
                out.display(),
                session.messages().len()
            );
            if let Err(err) = session.followup(&client, &prompt).await {
                save_after_error(&session, &out);
                return Err(err);
            }
            session
        }
        other => {
            // A log without a finished opening turn is restarted from
            // scratch; its scaffold payload would otherwise double up.
            if other.is_none() {
                ensure_fresh_target(&out)?;
            }
            println!("🚀 Building a new project in {}", out.display());

            let mut session = BuildSession::new(DirSandbox::new(&out));
            if let Err(err) = session.bootstrap(&client, &prompt).await {
                save_after_error(&session, &out);
                if let Some(api_err) = err.downcast_ref::<ApiError>() {
                    if api_err.status == 403 {
                        eprintln!("❌ The backend declined this prompt.");
                        eprintln!(
                            "   Describe a website to build, e.g. \"a todo app with dark mode\"."
                        );
                    }
                }
                return Err(err);
            }
            session
        }
    };

    print_turn(&session);
    session.save(&out)?;
    println!("\n✅ Project written to {}", out.display());

    if interactive {
        run_interactive_loop(&mut session, &client, &out).await?;
    }

    Ok(())
}

/// Persist the log after a failed turn. The turn may already have mounted
/// files into the output directory; with the log in place the next run
/// restarts or resumes instead of refusing the non-empty directory.
fn save_after_error(session: &BuildSession<DirSandbox>, out: &Path) {
    if let Err(err) = session.save(out) {
        warn!("Failed to save session log after a failed turn: {:#}", err);
    }
}

/// Refuse to adopt a non-empty directory that was never a sitesmith target;
/// mounting would sweep its contents away.
fn ensure_fresh_target(out: &Path) -> Result<()> {
    if !out.exists() {
        return Ok(());
    }
    let mut entries = std::fs::read_dir(out)
        .with_context(|| format!("Failed to read output directory {}", out.display()))?;
    if entries.next().is_some() {
        anyhow::bail!(
            "Output directory {} is not empty and has no session to resume. \
             Pick an empty directory or one holding a previous build.",
            out.display()
        );
    }
    Ok(())
}

async fn run_interactive_loop(
    session: &mut BuildSession<DirSandbox>,
    client: &BackendClient,
    out: &Path,
) -> Result<()> {
    use std::io::{self, Write};

    println!("\nEnter follow-up prompts (empty line to finish).");
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut prompt = String::new();
        if io::stdin().read_line(&mut prompt)? == 0 {
            break;
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            break;
        }

        if let Err(err) = session.followup(client, prompt).await {
            save_after_error(session, out);
            eprintln!("❌ Turn failed: {:#}", err);
            continue;
        }
        print_turn(session);
        session.save(out)?;
    }

    println!("👋 Session saved. Run 'sitesmith build' with the same output directory to continue.");
    Ok(())
}

fn print_turn(session: &BuildSession<DirSandbox>) {
    println!("\nSteps:");
    for step in session.steps() {
        println!("  {} {}", status_marker(step), step.description);
    }

    let tree = session.tree();
    if !tree.is_empty() {
        println!("\nProject files:");
        print!("{}", tree::render(tree));
    }
}

fn status_marker(step: &Step) -> &'static str {
    match step.status {
        StepStatus::Completed => "✅",
        StepStatus::InProgress => "🔄",
        StepStatus::Pending => "⏳",
    }
}
