//! Hub artifact retrieval.
//!
//! `ArtifactFetcher` turns domain requests (project and analysis listings,
//! SARIF reports, SARIF differences) into hub routes on a signed-in
//! `HubSession`. Listings are decoded; reports are handed back as streams.

pub mod fetcher;
pub mod routes;

pub use fetcher::ArtifactFetcher;
