use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::cue::Cue;
use crate::parser::Parser;

/// Supplies raw caption text for a locator.
pub trait CaptionSource {
    async fn fetch(&self, locator: &str) -> Result<String>;
}

/// Fetches caption documents over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl CaptionSource for HttpSource {
    async fn fetch(&self, locator: &str) -> Result<String> {
        let locator = locator.trim();
        if !locator.starts_with("https://") && !locator.starts_with("http://") {
            bail!("invalid caption URL (must start with http:// or https://): {locator}");
        }
        let response = self
            .client
            .get(locator)
            .send()
            .await
            .context("caption request failed")?
            .error_for_status()
            .context("caption server returned an error")?;
        let body = response
            .text()
            .await
            .context("failed to read caption response body")?;
        Ok(body)
    }
}

/// Fetch-and-parse with a stale-response guard.
///
/// Each `load` call makes any still-in-flight earlier load stale: the most
/// recently requested locator is authoritative and older results are
/// dropped instead of overwriting it.
pub struct CaptionSession<S> {
    source: S,
    generation: AtomicU64,
}

impl<S: CaptionSource> CaptionSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
        }
    }

    /// Fetch the captions behind `locator` and parse them.
    ///
    /// Returns `Ok(None)` when a newer load started while this one was in
    /// flight. Fetch and parse failures are recoverable: the caller should
    /// fall back to showing no captions, never fail media playback.
    pub async fn load(&self, parser: &Parser, locator: &str) -> Result<Option<Vec<Cue>>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%locator, "fetching captions");

        let text = self.source.fetch(locator).await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(%locator, "discarding stale caption response");
            return Ok(None);
        }

        let cues = parser
            .parse(&text)
            .context("failed to parse caption document")?;
        Ok(Some(cues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tokio::sync::Notify;

    struct MockSource {
        release_slow: Arc<Notify>,
    }

    impl CaptionSource for MockSource {
        async fn fetch(&self, locator: &str) -> Result<String> {
            match locator {
                "slow" => self.release_slow.notified().await,
                "boom" => bail!("connection reset"),
                _ => (),
            }
            Ok(format!("00:00:01.000 --> 00:00:02.000\n{}\n\n", locator))
        }
    }

    fn session() -> (CaptionSession<MockSource>, Arc<Notify>) {
        let release = Arc::new(Notify::new());
        let source = MockSource {
            release_slow: release.clone(),
        };
        (CaptionSession::new(source), release)
    }

    #[tokio::test]
    async fn load_parses_fetched_captions() {
        let (session, _release) = session();
        let parser = Parser::new();

        let cues = session.load(&parser, "fast").await.unwrap().unwrap();

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "fast\n");
    }

    #[tokio::test]
    async fn newer_load_supersedes_older() {
        let (session, release) = session();
        let parser = Parser::new();

        // The first load stalls inside fetch until the second finishes.
        let slow = session.load(&parser, "slow");
        let fast = async {
            let cues = session.load(&parser, "fast").await;
            release.notify_one();
            cues
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(slow.unwrap().is_none());
        let cues = fast.unwrap().expect("latest load must win");
        assert_eq!(cues[0].text, "fast\n");
    }

    #[tokio::test]
    async fn fetch_failure_is_recoverable() {
        let (session, _release) = session();
        let parser = Parser::new();

        assert!(session.load(&parser, "boom").await.is_err());

        // The session stays usable after a failed load.
        let cues = session.load(&parser, "fast").await.unwrap().unwrap();
        assert_eq!(cues[0].text, "fast\n");
    }

    #[tokio::test]
    async fn http_source_rejects_non_http_locators() {
        let source = HttpSource::new();

        assert!(source.fetch("file:///etc/passwd").await.is_err());
    }
}
