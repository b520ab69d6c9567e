use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::{parse_numeric_id, RawId};
use crate::error::HubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectId(u64);

impl ProjectId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl FromStr for ProjectId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric_id("project id", s).map(ProjectId)
    }
}

impl From<u64> for ProjectId {
    fn from(id: u64) -> Self {
        ProjectId(id)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ProjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer)?
            .into_id("project id")
            .map(ProjectId)
            .map_err(serde::de::Error::custom)
    }
}

/// One project record from the hub's project listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub name: String,
    /// Tree path of the project on the hub, e.g. `/teams/core/app`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Any other fields the hub sends, kept as-is.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
