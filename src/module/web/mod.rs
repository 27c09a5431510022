///! Web acquisition: HTTP fetching plus the ranked polling loop.

pub mod fetcher;
mod poller;

pub use fetcher::{HttpFetcher, PageFetcher};
pub use poller::{default_sources, WebPoller, WebSource};
