//! Command implementations for scribe CLI

pub mod blog;
pub mod count;
pub mod ping;
pub mod schema;
pub mod user;

use anyhow::{Context, Result};
use serde::Serialize;

// Re-export main dispatcher functions for flat access from main.rs
pub use blog::run_blog;
pub use count::run_count;
pub use ping::run_ping;
pub use schema::run_schema;
pub use user::run_user;

/// Pretty-print a value as JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}
