//! Data models for hub entities.
//!
//! - `ProjectId`, `ProjectInfo`: projects known to the hub
//! - `AnalysisId`, `AnalysisInfo`: completed analysis runs of a project
//!
//! Identifiers are validated on parse and never recomputed. Info records are
//! snapshots of one listing call; nothing here is cached.

pub mod analysis;
pub mod project;

pub use analysis::{AnalysisId, AnalysisInfo};
pub use project::{ProjectId, ProjectInfo};

use serde::Deserialize;

use crate::error::{HubError, Result};

/// Parse a hub identifier: a non-empty run of ASCII digits that fits in u64.
fn parse_numeric_id(what: &'static str, input: &str) -> Result<u64> {
    let text = input.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HubError::parse(what, format!("'{}' is not a numeric id", input)));
    }
    text.parse::<u64>()
        .map_err(|_| HubError::parse(what, format!("'{}' is out of range", input)))
}

/// Hub JSON carries ids either as numbers or as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn into_id(self, what: &'static str) -> Result<u64> {
        match self {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => parse_numeric_id(what, &s),
        }
    }
}
