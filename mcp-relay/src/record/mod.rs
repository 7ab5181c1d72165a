//! Traffic recording for later replay.
//!
//! The session file is UTF-8 text: two `#` comment lines, one single-line
//! JSON session header, then one [`RecordedMessage`] JSON object per line.
//! Every record is flushed to disk immediately so a crash loses at most the
//! line being written; the write and fsync run on tokio's blocking pool so
//! the upstream loop never parks a worker thread on disk. Recording
//! failures are logged and never propagate into the proxied call.

mod parser;
mod playback_client;
mod playback_server;

pub use parser::{MessagePair, PlaybackSession};
pub use playback_client::PlaybackClient;
pub use playback_server::PlaybackServer;

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the proxy boundary a message crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

/// One JSON-RPC message with replay metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedMessage {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// The JSON-RPC frame itself, carried verbatim.
    pub message: serde_json::Value,
}

/// The one-line JSON header at the top of a session file.
///
/// `messages` is always empty on disk; the per-line records follow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHeader {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub server_info: String,
    #[serde(default)]
    pub messages: Vec<RecordedMessage>,
}

/// Append-only recorder guarding its file handle with a mutex.
///
/// Starts disabled; [`Recorder::enable`] opens the file and writes the
/// header. All components share one recorder by `Arc`. Per-message writes
/// happen through [`Recorder::record`], which hands the blocking write and
/// fsync to `spawn_blocking` and is awaited, keeping records in dialog
/// order without stalling the async loop.
pub struct Recorder {
    file: Arc<Mutex<Option<File>>>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Recorder {
    pub fn disabled() -> Self {
        Self {
            file: Arc::new(Mutex::new(None)),
        }
    }

    /// Open `path` and write the session header. Called once at startup,
    /// before the upstream loop runs, so the write stays inline.
    pub fn enable(&self, path: &Path, server_info: &str) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("recorder lock poisoned"))?;
        if guard.is_some() {
            return Err(io::Error::other("recording already enabled"));
        }

        let mut file = File::create(path)?;
        let header = SessionHeader {
            start_time: Utc::now(),
            server_info: server_info.to_string(),
            messages: Vec::new(),
        };

        writeln!(file, "# MCP Recording Session")?;
        writeln!(file, "# Started: {}", header.start_time.to_rfc3339())?;
        let line = serde_json::to_string(&header).map_err(io::Error::other)?;
        writeln!(file, "{line}")?;
        file.sync_data()?;

        tracing::info!(path = %path.display(), "recording enabled");
        *guard = Some(file);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.file.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Append one message. A no-op when disabled; IO and serialization
    /// failures are logged and swallowed.
    pub async fn record(
        &self,
        direction: Direction,
        message_type: &str,
        tool_name: Option<&str>,
        server_name: Option<&str>,
        message: &serde_json::Value,
    ) {
        if !self.is_enabled() {
            return;
        }

        let recorded = RecordedMessage {
            timestamp: Utc::now(),
            direction,
            message_type: message_type.to_string(),
            tool_name: tool_name.map(str::to_string),
            server_name: server_name.map(str::to_string),
            message: message.clone(),
        };

        let line = match serde_json::to_string(&recorded) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize recorded message");
                return;
            }
        };

        // The fsync-per-record durability guarantee is kept off the async
        // worker threads.
        let file = Arc::clone(&self.file);
        let outcome = tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut guard = file
                .lock()
                .map_err(|_| io::Error::other("recorder lock poisoned"))?;
            let Some(file) = guard.as_mut() else {
                return Ok(());
            };
            writeln!(file, "{line}")?;
            file.sync_data()
        })
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to write recorded message"),
            Err(e) => tracing::warn!(error = %e, "recorder write task failed"),
        }
    }
}
