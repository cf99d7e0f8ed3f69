#![deny(clippy::all, clippy::pedantic)]

use serde::Serialize;

use crate::client::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Server(format!("failed to render output: {e}")))?;
    println!("{out}");
    Ok(())
}

/// One status line per poll on stderr, keeping stdout for JSON.
pub fn progress_line(percent: u8) {
    eprintln!("rendering… {percent:>3}%");
}
