//! Parser for artifact payloads returned by the builder backend.
//!
//! A payload is the literal body of one model turn. Actionable blocks are
//! wrapped in a lightweight tag markup: a `<root>` container holding child
//! tags (`createfile`, `createfolder`, `runcommand`), each with an optional
//! `path="..."` attribute and a text body. Blocks may be interleaved with
//! free-form prose, which is ignored.
//!
//! Parsing is total over text: unrecognized or malformed blocks degrade to
//! `Unknown` steps instead of aborting the turn. The only fatal input class
//! is a payload that is not decodable text at all (see [`parse_payload`]).

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::types::Step;

/// The single fatal parse failure: input that is not text.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid UTF-8 text")]
    NotText(#[from] std::str::Utf8Error),
}

static CONTAINER: OnceLock<Regex> = OnceLock::new();
static PATH_ATTR: OnceLock<Regex> = OnceLock::new();

/// One tag occurrence inside the container, as found by the scanner.
struct RawBlock<'a> {
    name: &'a str,
    attrs: &'a str,
    body: &'a str,
    /// Offset just past this block, relative to the scanned slice.
    end: usize,
    /// Whether a matching close tag (or self-closing form) was found.
    terminated: bool,
}

/// Parse one raw payload into the steps it contains.
///
/// `base` is the sequence number of the first extracted step; the caller
/// passes the current length of its step log so that steps from successive
/// turns compose into one global arrival order.
///
/// Total over its input: a payload without a `<root>` container yields an
/// empty Vec, never an error.
pub fn parse_steps(raw: &str, base: u64) -> Vec<Step> {
    let Some(body) = container_body(raw) else {
        return Vec::new();
    };

    let mut steps = Vec::new();
    let mut cursor = 0;
    while cursor < body.len() {
        let Some(block) = next_block(&body[cursor..]) else {
            break;
        };
        let sequence = base + steps.len() as u64;
        let terminated = block.terminated;
        let end = block.end;
        steps.push(classify_block(block, sequence));
        cursor += end;
        if !terminated {
            // The unclosed tag consumed the remaining container body.
            break;
        }
    }
    steps
}

/// Byte-level entry point for callers holding undecoded payloads.
///
/// Fails only for non-UTF-8 input; every other degenerate payload falls
/// through to the graceful handling of [`parse_steps`].
pub fn parse_payload(bytes: &[u8], base: u64) -> Result<Vec<Step>, PayloadError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(parse_steps(text, base))
}

/// Extract the body of the first `<root ...>...</root>` container.
///
/// Attributes on the container are tolerated and ignored. Everything outside
/// the container is discarded, including any further containers.
fn container_body(raw: &str) -> Option<&str> {
    let re = CONTAINER.get_or_init(|| {
        Regex::new(r"(?s)<root(?:\s[^>]*)?>(.*?)</root>").expect("container pattern is valid")
    });
    re.captures(raw)?.get(1).map(|m| m.as_str())
}

/// Find the next tag occurrence in `text`, skipping interleaved prose.
fn next_block(text: &str) -> Option<RawBlock<'_>> {
    let mut search = 0;
    loop {
        let lt = text[search..].find('<')? + search;
        let rest = &text[lt + 1..];

        // A tag name starts with an ASCII letter; anything else (close tags,
        // stray angle brackets in prose) is skipped.
        if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            search = lt + 1;
            continue;
        }
        let name_len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .count();
        let name = &rest[..name_len];

        // Open tag never closes: surface the remainder as one raw blob.
        let Some(gt_rel) = rest.find('>') else {
            return Some(RawBlock {
                name,
                attrs: "",
                body: &rest[name_len..],
                end: text.len(),
                terminated: false,
            });
        };

        let head = &rest[name_len..gt_rel];
        let body_start = lt + 1 + gt_rel + 1;

        // Self-closing form: empty body.
        if let Some(attrs) = head.trim_end().strip_suffix('/') {
            return Some(RawBlock {
                name,
                attrs,
                body: "",
                end: body_start,
                terminated: true,
            });
        }

        let close = format!("</{}>", name);
        return Some(match text[body_start..].find(&close) {
            Some(rel) => RawBlock {
                name,
                attrs: head,
                body: &text[body_start..body_start + rel],
                end: body_start + rel + close.len(),
                terminated: true,
            },
            None => RawBlock {
                name,
                attrs: head,
                body: &text[body_start..],
                end: text.len(),
                terminated: false,
            },
        });
    }
}

/// Turn a scanned block into a typed step.
///
/// Demotions (missing/empty path on a file or folder tag, unterminated
/// blocks, unknown tag names) all land on `Step::unknown` so the turn keeps
/// parsing and nothing is silently dropped.
fn classify_block(block: RawBlock<'_>, sequence: u64) -> Step {
    if !block.terminated {
        return Step::unknown(sequence, block.name, block.body);
    }
    match block.name {
        "createfile" => match path_attr(block.attrs) {
            Some(path) => {
                Step::create_file(sequence, path, strip_block_newlines(block.body).to_string())
            }
            None => Step::unknown(sequence, block.name, block.body),
        },
        "createfolder" => match path_attr(block.attrs) {
            Some(path) => Step::create_folder(sequence, path),
            None => Step::unknown(sequence, block.name, block.body),
        },
        "runcommand" => Step::run_command(sequence, strip_block_newlines(block.body).to_string()),
        _ => Step::unknown(sequence, block.name, block.body),
    }
}

/// Extract a non-empty `path="..."` attribute value.
fn path_attr(attrs: &str) -> Option<String> {
    let re = PATH_ATTR.get_or_init(|| {
        Regex::new(r#"(?:^|\s)path\s*=\s*"([^"]*)""#).expect("path pattern is valid")
    });
    let caps = re.captures(attrs)?;
    let value = caps[1].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Drop the single leading and trailing newline that tag formatting
/// introduces around a block body. Interior whitespace is untouched, so file
/// contents survive byte-for-byte.
fn strip_block_newlines(body: &str) -> &str {
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);
    body.strip_suffix("\r\n")
        .or_else(|| body.strip_suffix('\n'))
        .unwrap_or(body)
}
