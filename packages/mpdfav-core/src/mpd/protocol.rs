//! Low-level MPD text protocol.
//!
//! This module handles command encoding and response line parsing. It does
//! no I/O; see `connection.rs` for the socket side and `client.rs` for the
//! high-level commands.

use std::fmt;

use thiserror::Error;

use crate::protocol_constants::{
    MPD_ACK_NO_EXIST, MPD_GREETING_PREFIX, MPD_RESPONSE_ACK, MPD_RESPONSE_OK,
};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while talking to MPD.
#[derive(Debug, Error)]
pub enum MpdError {
    /// TCP connection to the server could not be established.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),

    /// Socket read or write failed on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server did not greet with `OK MPD <version>`.
    #[error("Unexpected greeting: {0:?}")]
    Greeting(String),

    /// The server rejected a command.
    #[error("{0}")]
    Ack(Ack),

    /// A response line was neither `key: value`, `OK` nor `ACK`.
    #[error("Malformed response line: {0:?}")]
    Malformed(String),

    /// The server closed the connection mid-response.
    #[error("Connection closed by server")]
    Closed,
}

/// Convenient Result alias for MPD operations.
pub type MpdResult<T> = Result<T, MpdError>;

impl MpdError {
    /// Returns true if MPD reported that the addressed object does not exist.
    ///
    /// Used to treat a missing sticker or playlist as "empty" rather than
    /// as a failure.
    #[must_use]
    pub fn is_no_exist(&self) -> bool {
        matches!(self, MpdError::Ack(ack) if ack.code == MPD_ACK_NO_EXIST)
    }
}

/// A parsed `ACK [code@index] {command} message` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// MPD error code.
    pub code: u32,
    /// Position of the failing command inside a command list.
    pub list_index: u32,
    /// Name of the failing command.
    pub command: String,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MPD error {} in {{{}}}: {}",
            self.code, self.command, self.message
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A single protocol command with quoted arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    line: String,
}

impl Command {
    /// Starts a command with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            line: name.to_string(),
        }
    }

    /// Appends a double-quoted, escaped argument.
    #[must_use]
    pub fn arg(mut self, value: &str) -> Self {
        self.line.push(' ');
        self.line.push('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                self.line.push('\\');
            }
            self.line.push(c);
        }
        self.line.push('"');
        self
    }

    /// Appends an unquoted word (subsystem names for `idle`).
    #[must_use]
    pub fn word(mut self, value: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(value);
        self
    }

    /// Returns the command name, used in log lines.
    pub fn name(&self) -> &str {
        self.line.split(' ').next().unwrap_or_default()
    }

    /// Returns the wire form, newline terminated.
    pub fn to_wire(&self) -> String {
        format!("{}\n", self.line)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// One classified response line.
#[derive(Debug, PartialEq, Eq)]
pub enum ResponseLine {
    /// `key: value`
    Pair(String, String),
    /// `OK`
    Ok,
    /// `ACK ...`
    Ack(Ack),
}

/// Validates the greeting line and returns the server protocol version.
pub fn parse_greeting(line: &str) -> MpdResult<String> {
    line.trim_end()
        .strip_prefix(MPD_GREETING_PREFIX)
        .map(str::to_string)
        .ok_or_else(|| MpdError::Greeting(line.trim_end().to_string()))
}

/// Classifies one response line (without its trailing newline).
pub fn parse_line(line: &str) -> MpdResult<ResponseLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line == MPD_RESPONSE_OK {
        return Ok(ResponseLine::Ok);
    }
    if let Some(rest) = line.strip_prefix(MPD_RESPONSE_ACK) {
        return parse_ack(rest)
            .map(ResponseLine::Ack)
            .ok_or_else(|| MpdError::Malformed(line.to_string()));
    }
    match line.split_once(": ") {
        Some((key, value)) => Ok(ResponseLine::Pair(key.to_string(), value.to_string())),
        None => Err(MpdError::Malformed(line.to_string())),
    }
}

/// Parses the part of an ACK line after `ACK `: `[code@index] {command} message`.
fn parse_ack(rest: &str) -> Option<Ack> {
    let rest = rest.strip_prefix('[')?;
    let (position, rest) = rest.split_once(']')?;
    let (code, list_index) = position.split_once('@')?;
    let rest = rest.trim_start().strip_prefix('{')?;
    let (command, message) = rest.split_once('}')?;

    Some(Ack {
        code: code.parse().ok()?,
        list_index: list_index.parse().ok()?,
        command: command.to_string(),
        message: message.trim_start().to_string(),
    })
}

/// Splits a `name=value` sticker string as returned by `sticker get|find`.
pub fn split_sticker(raw: &str) -> Option<(&str, &str)> {
    raw.split_once('=')
}
