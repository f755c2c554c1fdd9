//! Sources of newline-delimited feed events.

use std::future::Future;
use std::time::Duration;

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};

use crate::error::{EventError, FeedError};

/// Longest line the HTTP feed buffers before discarding it.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Upper bound on establishing the feed connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the feed. Only connecting is bounded in time; the body
/// stream itself is open-ended.
pub fn http_client() -> Result<reqwest::Client, FeedError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("thingmodel-tweets/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// One line read from a feed.
#[derive(Debug)]
pub enum FeedLine {
    /// A decoded line.
    Text(String),
    /// A line that could not be read. The feed has already moved past it.
    Rejected(EventError),
}

/// A source of raw feed lines, consumed one at a time.
///
/// `next_line` resolves to `None` once the feed has ended and to an error only
/// when the transport fails. It must be cancel safe: dropping the future
/// before it resolves loses no data.
pub trait FeedSource: Send {
    fn next_line(&mut self) -> impl Future<Output = Option<Result<FeedLine, FeedError>>> + Send;
}

/// A long-lived HTTP response whose body is a stream of JSON lines.
pub struct HttpStreamFeed {
    stream: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    buffer: Vec<u8>,
    max_line: usize,
    discarding: bool,
    finished: bool,
}

impl std::fmt::Debug for HttpStreamFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamFeed")
            .field("buffered", &self.buffer.len())
            .field("max_line", &self.max_line)
            .field("discarding", &self.discarding)
            .field("finished", &self.finished)
            .finish()
    }
}

impl HttpStreamFeed {
    /// Opens the stream at `url`, sending `token` as a bearer token if given.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the request fails or the response status
    /// is not a success.
    pub async fn connect(
        client: &reqwest::Client,
        url: &str,
        token: Option<&str>,
    ) -> Result<Self, FeedError> {
        let mut request = client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        tracing::info!(url = %url, status = %response.status(), "feed connected");

        Ok(Self::from_chunks(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec())),
        ))
    }

    /// Like [`connect`](Self::connect), but gives up as soon as `stop` fires.
    ///
    /// Returns `None` if stopped before the response headers arrived.
    pub async fn connect_until_stopped(
        client: &reqwest::Client,
        url: &str,
        token: Option<&str>,
        stop: watch::Receiver<bool>,
    ) -> Option<Result<Self, FeedError>> {
        tokio::select! {
            biased;
            () = crate::wait_for_stop(stop) => None,
            feed = Self::connect(client, url, token) => Some(feed),
        }
    }

    /// Reads lines from an already open body stream.
    pub fn from_chunks<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send + 'static,
    {
        Self {
            stream: chunks.boxed(),
            buffer: Vec::new(),
            max_line: MAX_LINE_BYTES,
            discarding: false,
            finished: false,
        }
    }

    /// Replaces the maximum line length. Zero is raised to one.
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line.max(1);
        self
    }

    /// Takes the next complete, non-blank line out of the buffer.
    fn take_line(&mut self) -> Option<FeedLine> {
        loop {
            if self.discarding {
                let end = match self.buffer.iter().position(|&b| b == b'\n') {
                    Some(end) => end,
                    None => {
                        self.buffer.clear();
                        return None;
                    }
                };
                self.buffer.drain(..=end);
                self.discarding = false;
            }

            let Some(end) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > self.max_line {
                    // Drop what we have and skip the rest of this line as it arrives.
                    self.buffer.clear();
                    self.discarding = true;
                    return Some(self.too_long());
                }
                return None;
            };

            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.max_line {
                return Some(self.too_long());
            }
            // Blank lines are keep-alives.
            if !line.iter().all(u8::is_ascii_whitespace) {
                return Some(decode(line));
            }
        }
    }

    fn too_long(&self) -> FeedLine {
        FeedLine::Rejected(EventError::LineTooLong {
            limit: self.max_line,
        })
    }
}

fn decode(line: Vec<u8>) -> FeedLine {
    match String::from_utf8(line) {
        Ok(text) => FeedLine::Text(text),
        Err(e) => FeedLine::Rejected(e.into()),
    }
}

impl FeedSource for HttpStreamFeed {
    async fn next_line(&mut self) -> Option<Result<FeedLine, FeedError>> {
        loop {
            if let Some(line) = self.take_line() {
                return Some(Ok(line));
            }

            if self.finished {
                let rest = std::mem::take(&mut self.buffer);
                if self.discarding || rest.iter().all(u8::is_ascii_whitespace) {
                    self.discarding = false;
                    return None;
                }
                return Some(Ok(decode(rest)));
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finished = true;
                    self.discarding = false;
                    self.buffer.clear();
                    return Some(Err(e.into()));
                }
                None => self.finished = true,
            }
        }
    }
}

/// An in-process feed fed through a channel. The feed ends when every sender
/// is dropped.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: mpsc::Receiver<String>,
}

impl ChannelFeed {
    pub fn new(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

impl FeedSource for ChannelFeed {
    async fn next_line(&mut self) -> Option<Result<FeedLine, FeedError>> {
        self.rx.recv().await.map(|line| Ok(FeedLine::Text(line)))
    }
}
