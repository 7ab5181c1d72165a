//! Client-side replay: re-emit recorded requests against a live peer.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::PlaybackSession;

const DEFAULT_CLIENT_DELAY: Duration = Duration::from_millis(100);

/// Replays the request side of a recorded session.
///
/// The first request is sent unprompted (the peer only speaks when spoken
/// to); each subsequent request is released after one peer-response line,
/// paced by a small delay. Exits once every request has been sent.
pub struct PlaybackClient {
    messages: Vec<serde_json::Value>,
    delay: Duration,
}

impl PlaybackClient {
    pub fn new(session: &PlaybackSession) -> Self {
        Self {
            messages: session.client_messages(),
            delay: DEFAULT_CLIENT_DELAY,
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
        let total = self.messages.len();
        tracing::info!(total, "starting playback client");

        let mut iter = self.messages.into_iter();
        let Some(first) = iter.next() else {
            tracing::info!("recording contains no client requests");
            return Ok(());
        };
        write_frame(&mut output, &first).await?;
        let mut sent = 1usize;
        tracing::debug!(sent, total, "sent recorded request");

        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!(response = %line.trim(), "peer response");

            match iter.next() {
                Some(message) => {
                    tokio::time::sleep(self.delay).await;
                    write_frame(&mut output, &message).await?;
                    sent += 1;
                    tracing::debug!(sent, total, "sent recorded request");
                }
                None => {
                    tracing::info!("all recorded requests sent");
                    break;
                }
            }
        }

        tracing::info!(sent, total, "playback client finished");
        Ok(())
    }

    /// Send every request back-to-back without waiting for responses.
    pub async fn run_batch(self) -> io::Result<()> {
        self.run_batch_with(tokio::io::stdout()).await
    }

    pub async fn run_batch_with<W>(self, mut output: W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let total = self.messages.len();
        tracing::info!(total, "starting batch playback");

        for (index, message) in self.messages.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.delay).await;
            }
            write_frame(&mut output, message).await?;
            tracing::debug!(sent = index + 1, total, "sent recorded request");
        }
        Ok(())
    }
}

pub(super) async fn write_frame<W>(output: &mut W, message: &serde_json::Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message).map_err(io::Error::other)?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await
}
