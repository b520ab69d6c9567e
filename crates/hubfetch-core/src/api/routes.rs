//! Hub-relative routes for artifact requests.

use url::form_urlencoded;

use crate::models::{AnalysisId, ProjectId};

pub fn projects(name_filter: Option<&str>) -> String {
    match name_filter {
        Some(name) => format!(
            "projects.json?{}",
            form_urlencoded::Serializer::new(String::new())
                .append_pair("name", name)
                .finish()
        ),
        None => "projects.json".to_string(),
    }
}

pub fn analyses(project: ProjectId) -> String {
    format!("project/{}/analyses.json", project)
}

pub fn sarif(analysis: AnalysisId) -> String {
    format!("analysis/{}-allwarnings.sarif", analysis)
}

/// SARIF for `analysis` relative to `baseline`; without a baseline this is
/// the plain report route.
pub fn sarif_difference(analysis: AnalysisId, baseline: Option<AnalysisId>) -> String {
    match baseline {
        Some(baseline) => format!("{}?baseline={}", sarif(analysis), baseline),
        None => sarif(analysis),
    }
}
