//! Commands compiled into the bot.
//!
//! Manifests under `commands/` bind to these through their `entry_point`.

mod echo;
mod forget;
mod help;
mod note;
mod start;

pub use echo::Echo;
pub use forget::Forget;
pub use help::{render_command_help, render_command_list, Help};
pub use note::{Note, NOTE_KEY};
pub use start::Start;

use super::HandlerCatalog;
use std::sync::Arc;

/// Catalog with every built-in handler under its entry-point id.
#[must_use]
pub fn catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with("help", Arc::new(Help))
        .with("echo", Arc::new(Echo))
        .with("start", Arc::new(Start))
        .with("forget", Arc::new(Forget))
        .with("note", Arc::new(Note))
}
