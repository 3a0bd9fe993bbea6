//! JSON I/O handling for CLI
//!
//! - Input: a JSON argument, or one JSON document on stdin
//! - Output: one JSON envelope per command on stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Parse `arg` as JSON, reading stdin when it was not given
pub fn read_input(arg: Option<&str>) -> CliResult<Value> {
    let text = match arg {
        Some(text) => text.to_string(),
        None => {
            let mut buf = String::new();
            io::stdin().lock().read_to_string(&mut buf)?;
            buf
        }
    };
    parse_input(&text)
}

/// Parse a JSON input document
pub fn parse_input(text: &str) -> CliResult<Value> {
    if text.trim().is_empty() {
        return Err(CliError::InvalidInput("Empty input".to_string()));
    }
    Ok(serde_json::from_str(text)?)
}

/// Write a serializable value as one JSON line to stdout
pub fn write_response<T: Serialize>(response: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_json(&mut stdout, response)
}

/// Write a serializable value as one JSON line
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
