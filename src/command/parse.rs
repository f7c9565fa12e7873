use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;

use crate::steps::parse_payload;
use crate::tree::{self, FileNode};

pub async fn run_parse(file: Option<PathBuf>, json: bool, show: Option<String>) -> Result<()> {
    let raw = match &file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
    };

    let steps = parse_payload(&raw, 0)?;

    if let Some(path) = &show {
        let tree = tree::synthesize(&steps);
        print!("{}", file_content(&tree, path)?);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    if steps.is_empty() {
        println!("No steps found in payload.");
        return Ok(());
    }

    println!("Steps:");
    for step in &steps {
        println!("  {:>3}. {}", step.sequence, step.description);
    }

    let tree = tree::synthesize(&steps);
    if !tree.is_empty() {
        println!("\nProject files:");
        print!("{}", tree::render(&tree));
    }

    Ok(())
}

/// Body of the file at `path` in the synthesized tree.
fn file_content<'a>(tree: &'a [FileNode], path: &str) -> Result<&'a str> {
    let Some(node) = tree::find(tree, path) else {
        anyhow::bail!("No file at '{}' in the synthesized tree", path);
    };
    node.content()
        .with_context(|| format!("'{}' is a folder, not a file", path))
}
