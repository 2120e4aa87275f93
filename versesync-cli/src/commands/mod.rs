//! CLI command implementations.

pub mod auth;
pub mod cache;
pub mod chat;
pub mod config;
pub mod library;
pub mod read;
pub mod search;
pub mod settings;
pub mod status;

use anyhow::Result;
use serde::Serialize;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Prints `value` as JSON, or the text rendering produced by `text`.
pub(crate) fn emit<T, F>(cli: &Cli, value: &T, text: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&TextFormatter) -> String,
{
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", text(&formatter));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(value)?);
        }
    }
    Ok(())
}
