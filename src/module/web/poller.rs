///! Web acquisition: polls a ranked list of cluster pages on a fixed
///! interval and extracts spots with each page's paired extractor.
///!
///! Per cycle the list is walked in order and the first source that
///! yields spots wins; later sources are not consulted, so one poll never
///! mixes pages. Fetch errors skip only the current cycle - every cycle
///! retries the full list from the top.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;

use super::fetcher::{HttpFetcher, PageFetcher};
use crate::module::pipeline::{ResourceBudget, SpotPipeline, SpotSink};
use crate::module::spot::html::{
    DxWatchExtractor, GenericTableExtractor, HamQthExtractor, HtmlSpotExtractor,
};
use crate::module::spot::RawSpot;

const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// One candidate page with its paired extractor.
pub struct WebSource {
    pub url: String,
    pub extractor: Box<dyn HtmlSpotExtractor>,
}

impl WebSource {
    pub fn new(url: impl Into<String>, extractor: Box<dyn HtmlSpotExtractor>) -> Self {
        Self {
            url: url.into(),
            extractor,
        }
    }
}

/// The sites known to publish cluster spots, ranked. Sites without a
/// dedicated extractor go through the generic table walker.
pub fn default_sources() -> Vec<WebSource> {
    vec![
        WebSource::new("https://www.hamqth.com/dxc.php", Box::new(HamQthExtractor::new())),
        WebSource::new("https://www.dxwatch.com/", Box::new(DxWatchExtractor::new())),
        WebSource::new("http://www.dxsummit.fi/", Box::new(GenericTableExtractor::new())),
        WebSource::new("http://www.dx-cluster.de", Box::new(GenericTableExtractor::new())),
        WebSource::new("https://www.dx-cluster.de", Box::new(GenericTableExtractor::new())),
    ]
}

pub struct WebPoller<F: PageFetcher> {
    fetcher: F,
    sources: Vec<WebSource>,
}

impl WebPoller<HttpFetcher> {
    pub fn with_default_sources() -> Self {
        Self::new(HttpFetcher::new(), default_sources())
    }
}

impl<F: PageFetcher> WebPoller<F> {
    pub fn new(fetcher: F, sources: Vec<WebSource>) -> Self {
        Self { fetcher, sources }
    }

    /// One poll cycle: first source yielding a non-empty spot list wins.
    pub async fn fetch_cycle(&self) -> Vec<RawSpot> {
        for source in &self.sources {
            tracing::debug!("Trying to fetch DX spots from {}", source.url);
            let body = match self.fetcher.fetch(&source.url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Error fetching from {}: {:#}", source.url, e);
                    continue;
                }
            };

            let spots = source.extractor.extract(&body);
            if spots.is_empty() {
                tracing::warn!(
                    "No spots found at {} using {} extractor",
                    source.url,
                    source.extractor.name()
                );
                continue;
            }

            tracing::info!(
                "Fetched {} spots from {} using {} extractor",
                spots.len(),
                source.url,
                source.extractor.name()
            );
            return spots;
        }

        tracing::warn!("All web sources failed this cycle");
        Vec::new()
    }

    /// Poll until stopped or out of budget.
    pub async fn run<S: SpotSink>(
        &self,
        pipeline: &mut SpotPipeline<S>,
        budget: &ResourceBudget,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            if *shutdown.borrow() {
                tracing::info!("Stop requested, shutting down web poller");
                break;
            }
            if let Some(reason) = budget.exceeded() {
                tracing::info!("{}, shutting down web poller", reason);
                break;
            }

            let spots = self.fetch_cycle().await;
            for spot in spots {
                if let Err(e) = pipeline.ingest(spot) {
                    tracing::error!("Failed to record spot: {e:#}");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                _ = shutdown.changed() => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted fetcher: canned bodies or errors per URL, with a call log.
    #[derive(Default)]
    struct ScriptedFetcher {
        bodies: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn with(mut self, url: &str, result: Result<&str, &str>) -> Self {
            self.bodies.insert(
                url.to_string(),
                result.map(str::to_string).map_err(str::to_string),
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.bodies.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(e)) => anyhow::bail!("{e}"),
                None => anyhow::bail!("no script for {url}"),
            }
        }
    }

    const TABLE_WITH_TWO_SPOTS: &str = r#"<table>
        <tr><td>14195.0</td><td>JA1ABC</td><td>1200Z</td><td>CQ SSB</td></tr>
        <tr><td>7030.0</td><td>K2XYZ</td><td>0300Z</td><td>QRS CW</td></tr>
    </table>"#;

    fn generic(url: &str) -> WebSource {
        WebSource::new(url, Box::new(GenericTableExtractor::new()))
    }

    #[tokio::test]
    async fn test_first_successful_source_wins_and_later_ones_are_skipped() {
        let fetcher = ScriptedFetcher::default()
            .with("http://a.example/dx", Err("connect timeout"))
            .with("http://b.example/dx", Err("HTTP 503"))
            .with("http://c.example/dx", Ok(TABLE_WITH_TWO_SPOTS))
            .with("http://d.example/dx", Ok(TABLE_WITH_TWO_SPOTS));

        let poller = WebPoller::new(
            fetcher,
            vec![
                generic("http://a.example/dx"),
                generic("http://b.example/dx"),
                generic("http://c.example/dx"),
                generic("http://d.example/dx"),
            ],
        );

        let spots = poller.fetch_cycle().await;
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].dx_call, "JA1ABC");
        assert_eq!(spots[1].dx_call, "K2XYZ");

        // The cycle stopped at the first success: d was never fetched.
        assert_eq!(
            poller.fetcher.calls(),
            vec!["http://a.example/dx", "http://b.example/dx", "http://c.example/dx"]
        );
    }

    #[tokio::test]
    async fn test_source_with_empty_extraction_is_skipped() {
        let fetcher = ScriptedFetcher::default()
            .with("http://empty.example", Ok("<html><p>no tables</p></html>"))
            .with("http://full.example", Ok(TABLE_WITH_TWO_SPOTS));

        let poller = WebPoller::new(
            fetcher,
            vec![generic("http://empty.example"), generic("http://full.example")],
        );

        let spots = poller.fetch_cycle().await;
        assert_eq!(spots.len(), 2);
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty_cycle() {
        let fetcher = ScriptedFetcher::default().with("http://a.example", Err("DNS failure"));
        let poller = WebPoller::new(fetcher, vec![generic("http://a.example")]);
        assert!(poller.fetch_cycle().await.is_empty());
    }
}
