//! Build steps: the typed instructions extracted from model turns.
//!
//! A model turn is one raw markup payload. The parser turns it into an
//! ordered list of [`Step`] records; the build session appends them to a
//! global, append-only log that the tree synthesizer folds over.

mod parser;
mod types;

pub use parser::{parse_payload, parse_steps};
pub use types::{Step, StepKind, StepStatus};
