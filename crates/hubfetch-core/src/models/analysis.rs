use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::{parse_numeric_id, RawId};
use crate::error::HubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AnalysisId(u64);

impl AnalysisId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl FromStr for AnalysisId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_numeric_id("analysis id", s).map(AnalysisId)
    }
}

impl From<u64> for AnalysisId {
    fn from(id: u64) -> Self {
        AnalysisId(id)
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for AnalysisId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer)?
            .into_id("analysis id")
            .map(AnalysisId)
            .map_err(serde::de::Error::custom)
    }
}

/// One analysis record from a project's analysis listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInfo {
    pub id: AnalysisId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analysis_id() {
        assert_eq!("1001".parse::<AnalysisId>().unwrap().get(), 1001);
        assert_eq!(AnalysisId::from(5).to_string(), "5");
        assert!("1001-allwarnings".parse::<AnalysisId>().is_err());
        assert!("".parse::<AnalysisId>().is_err());
    }

    #[test]
    fn test_deserialize_analysis_info() {
        let json = r#"{"id": 1001, "name": "nightly build 318", "state": "Finished", "started": "2026-10-01T02:00:00Z"}"#;
        let analysis: AnalysisInfo = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.id, AnalysisId::from(1001));
        assert_eq!(analysis.state.as_deref(), Some("Finished"));
        assert_eq!(analysis.metadata["started"], "2026-10-01T02:00:00Z");
    }
}
