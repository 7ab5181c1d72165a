//! Lenient parsing of recorded session files.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::{Direction, RecordedMessage, SessionHeader};

/// A parsed recording: header metadata plus the ordered message stream.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub start_time: DateTime<Utc>,
    pub server_info: String,
    pub messages: Vec<RecordedMessage>,
}

/// A request and the response that followed it.
#[derive(Debug, Clone)]
pub struct MessagePair {
    pub request: RecordedMessage,
    pub response: RecordedMessage,
}

impl PlaybackSession {
    /// Parse a session file from disk.
    pub fn parse_file(path: &Path) -> io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse_str(&contents))
    }

    /// Parse session text.
    ///
    /// Blank lines and `#` comments are skipped. The first line that parses
    /// as a session header (and not as a message) supplies the metadata;
    /// unparseable lines are dropped. A missing header is synthesized so a
    /// truncated recording still replays.
    pub fn parse_str(contents: &str) -> Self {
        let mut header: Option<SessionHeader> = None;
        let mut messages = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Messages carry required fields a header lacks, so try the
            // message shape first; header detection stays unambiguous.
            if let Ok(message) = serde_json::from_str::<RecordedMessage>(line) {
                messages.push(message);
                continue;
            }
            if header.is_none() {
                if let Ok(parsed) = serde_json::from_str::<SessionHeader>(line) {
                    header = Some(parsed);
                    continue;
                }
            }
            tracing::debug!(line, "skipping unparseable recording line");
        }

        let (start_time, server_info) = match header {
            Some(h) => (h.start_time, h.server_info),
            None => (Utc::now(), "Unknown".to_string()),
        };

        Self {
            start_time,
            server_info,
            messages,
        }
    }

    /// Raw frames of the client side (request direction), in order.
    pub fn client_messages(&self) -> Vec<serde_json::Value> {
        self.messages
            .iter()
            .filter(|m| m.direction == Direction::Request)
            .map(|m| m.message.clone())
            .collect()
    }

    /// Raw frames of the server side (response direction), in order.
    pub fn server_messages(&self) -> Vec<serde_json::Value> {
        self.messages
            .iter()
            .filter(|m| m.direction == Direction::Response)
            .map(|m| m.message.clone())
            .collect()
    }

    /// Request/response pairs in dialog order. A request is paired with the
    /// next response; back-to-back requests drop the earlier one, matching
    /// the strictly alternating dialog the proxy records.
    pub fn message_pairs(&self) -> Vec<MessagePair> {
        let mut pairs = Vec::new();
        let mut pending: Option<&RecordedMessage> = None;

        for message in &self.messages {
            match message.direction {
                Direction::Request => pending = Some(message),
                Direction::Response => {
                    if let Some(request) = pending.take() {
                        pairs.push(MessagePair {
                            request: request.clone(),
                            response: message.clone(),
                        });
                    }
                }
            }
        }
        pairs
    }
}
