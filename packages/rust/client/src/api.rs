//! The injected transport seam between the job protocol and HTTP.

use async_trait::async_trait;

use alignwatch_shared::{ArtifactKey, JobId, Result};

/// One read request against the results server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRequest<'a> {
    /// `GET status/{job_id}`
    Status { job_id: &'a JobId },
    /// `GET retrieveArtifact?key={key}`, or the key itself when it is a URL.
    Artifact {
        job_id: &'a JobId,
        key: &'a ArtifactKey,
    },
    /// `GET hits/{job_id}/{target}`
    Hits { job_id: &'a JobId, target: &'a str },
    /// `GET frames/{job_id}/{input}`
    Frames { job_id: &'a JobId, input: &'a str },
}

impl ApiRequest<'_> {
    /// Short name used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Artifact { .. } => "artifact",
            Self::Hits { .. } => "hits",
            Self::Frames { .. } => "frames",
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Status { job_id }
            | Self::Artifact { job_id, .. }
            | Self::Hits { job_id, .. }
            | Self::Frames { job_id, .. } => job_id,
        }
    }
}

/// Fetches JSON bodies from the results server.
///
/// Implementations return [`AlignwatchError::Network`] for transport failures
/// and non-2xx responses, and [`AlignwatchError::MalformedPayload`] when the
/// body is not JSON.
///
/// [`AlignwatchError::Network`]: alignwatch_shared::AlignwatchError::Network
/// [`AlignwatchError::MalformedPayload`]: alignwatch_shared::AlignwatchError::MalformedPayload
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn get_json(&self, request: ApiRequest<'_>) -> Result<serde_json::Value>;
}
