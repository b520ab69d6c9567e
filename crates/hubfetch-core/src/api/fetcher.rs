use serde::de::DeserializeOwned;
use tracing::debug;

use super::routes;
use crate::auth::HubSession;
use crate::error::{HubError, Result};
use crate::models::{AnalysisId, AnalysisInfo, ProjectId, ProjectInfo};
use crate::transport::{ByteStream, HttpTransport, Transport};

/// Artifact requests on a signed-in session.
///
/// Every call fails with `HubError::AuthRequired` before any I/O when the
/// session is not authenticated.
pub struct ArtifactFetcher<'s, T = HttpTransport> {
    session: &'s HubSession<T>,
}

impl<'s, T: Transport> ArtifactFetcher<'s, T> {
    pub fn new(session: &'s HubSession<T>) -> Self {
        Self { session }
    }

    /// List projects, filtered by name on the hub when `name_filter` is set.
    /// An empty filter lists everything.
    pub async fn fetch_project_info(&self, name_filter: Option<&str>) -> Result<Vec<ProjectInfo>> {
        let filter = name_filter.map(str::trim).filter(|name| !name.is_empty());
        let projects: Vec<ProjectInfo> = self.get_json(&routes::projects(filter)).await?;
        debug!(count = projects.len(), "Fetched project list");
        Ok(projects)
    }

    /// List the analyses of one project. `NotFound` if the hub does not know it.
    pub async fn fetch_analysis_info(&self, project: ProjectId) -> Result<Vec<AnalysisInfo>> {
        let analyses: Vec<AnalysisInfo> = self
            .get_json(&routes::analyses(project))
            .await
            .map_err(|e| match e {
                HubError::NotFound(_) => HubError::NotFound(format!("project {}", project)),
                other => other,
            })?;
        debug!(project = %project, count = analyses.len(), "Fetched analysis list");
        Ok(analyses)
    }

    /// The SARIF report of one analysis, unread.
    pub async fn fetch_sarif_analysis_stream(&self, analysis: AnalysisId) -> Result<ByteStream> {
        self.fetch(&routes::sarif(analysis)).await
    }

    /// SARIF for the warnings of `analysis` relative to `baseline`, computed
    /// by the hub. Without a baseline this is the plain report.
    pub async fn fetch_sarif_analysis_difference_stream(
        &self,
        analysis: AnalysisId,
        baseline: Option<AnalysisId>,
    ) -> Result<ByteStream> {
        self.fetch(&routes::sarif_difference(analysis, baseline)).await
    }

    /// Authenticated GET of any hub-relative path.
    pub async fn fetch(&self, path: &str) -> Result<ByteStream> {
        self.session.fetch(path).await
    }

    async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let url = self.session.url(path)?;
        let response = self.session.get(url).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| HubError::InvalidResponse(format!("{}: {}", path, e)))
    }
}
