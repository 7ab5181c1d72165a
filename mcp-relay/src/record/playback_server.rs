//! Server-side replay: answer live requests with recorded responses.

use std::io;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader};

use super::playback_client::write_frame;
use super::PlaybackSession;

const DEFAULT_SERVER_DELAY: Duration = Duration::from_millis(50);

/// Replays the response side of a recorded session.
///
/// For every peer request line, the next recorded response is written after
/// a short delay. When the recording runs dry a generic JSON-RPC error is
/// emitted instead; the stateless variant cycles through the responses
/// forever.
pub struct PlaybackServer {
    responses: Vec<serde_json::Value>,
    delay: Duration,
}

impl PlaybackServer {
    pub fn new(session: &PlaybackSession) -> Self {
        Self {
            responses: session.server_messages(),
            delay: DEFAULT_SERVER_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run against the process's own stdin/stdout.
    pub async fn run(self) -> io::Result<()> {
        let input = BufReader::new(tokio::io::stdin());
        self.run_with(input, tokio::io::stdout()).await
    }

    /// Run against arbitrary streams.
    pub async fn run_with<R, W>(self, mut input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let total = self.responses.len();
        tracing::info!(total, "starting playback server");

        let mut index = 0usize;
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!(request = %line.trim(), "peer request");

            if index < self.responses.len() {
                tokio::time::sleep(self.delay).await;
                write_frame(&mut output, &self.responses[index]).await?;
                index += 1;
                tracing::debug!(sent = index, total, "sent recorded response");
            } else {
                write_frame(&mut output, &exhausted_error()).await?;
                tracing::debug!("sent generic error (recording exhausted)");
            }
        }

        tracing::info!("playback server finished");
        Ok(())
    }

    /// Run without request/response pairing: cycle recorded responses
    /// modulo the list length. Useful when request order differs between
    /// runs.
    pub async fn run_stateless(self) -> io::Result<()> {
        let input = BufReader::new(tokio::io::stdin());
        self.run_stateless_with(input, tokio::io::stdout()).await
    }

    pub async fn run_stateless_with<R, W>(self, mut input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("starting stateless playback server");

        let mut index = 0usize;
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                break;
            }
            if line.trim().is_empty() || self.responses.is_empty() {
                continue;
            }

            tokio::time::sleep(self.delay).await;
            let response = &self.responses[index % self.responses.len()];
            write_frame(&mut output, response).await?;
            index += 1;
        }
        Ok(())
    }
}

fn exhausted_error() -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": -32000,
            "message": "No more recorded responses available"
        },
        "id": null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn session_with_responses(ids: &[i64]) -> PlaybackSession {
        let lines: Vec<String> = ids
            .iter()
            .map(|id| {
                serde_json::to_string(&json!({
                    "timestamp": "2025-03-01T10:00:00Z",
                    "direction": "response",
                    "message_type": "tool_call",
                    "message": {"jsonrpc": "2.0", "id": id, "result": {}}
                }))
                .unwrap()
            })
            .collect();
        PlaybackSession::parse_str(&lines.join("\n"))
    }

    fn written_values(bytes: &[u8]) -> Vec<Value> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_replays_responses_then_generic_error() {
        let session = session_with_responses(&[1]);
        let server = PlaybackServer::new(&session).with_delay(Duration::from_millis(1));

        let input = std::io::Cursor::new(b"{\"id\":1}\n{\"id\":2}\n".to_vec());
        let mut output = Vec::new();
        server
            .run_with(BufReader::new(input), &mut output)
            .await
            .unwrap();

        let frames = written_values(&output);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["id"], 1);
        assert_eq!(frames[1]["error"]["code"], -32000);
        assert!(frames[1]["id"].is_null());
    }

    #[tokio::test]
    async fn test_stateless_cycles_responses() {
        let session = session_with_responses(&[1, 2]);
        let server = PlaybackServer::new(&session).with_delay(Duration::from_millis(1));

        let input = std::io::Cursor::new(b"a\nb\nc\n".to_vec());
        let mut output = Vec::new();
        server
            .run_stateless_with(BufReader::new(input), &mut output)
            .await
            .unwrap();

        let ids: Vec<i64> = written_values(&output)
            .iter()
            .map(|v| v["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn test_stateless_with_empty_recording_stays_silent() {
        let session = PlaybackSession::parse_str("");
        let server = PlaybackServer::new(&session).with_delay(Duration::from_millis(1));
        let input = std::io::Cursor::new(b"req\n".to_vec());
        let mut output = Vec::new();
        server
            .run_stateless_with(BufReader::new(input), &mut output)
            .await
            .unwrap();
        assert!(output.is_empty());
    }
}
