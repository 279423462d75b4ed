//! Typed retrieval of status payloads and result artifacts.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use tracing::debug;

use alignwatch_shared::{
    AlignmentResult, AlignwatchError, ArtifactKey, FrameSet, HitRow, JobId, Result, StatusPayload,
};

use crate::api::{ApiRequest, JobApi};

/// Alignment results keyed by input sequence name, in submission order.
pub type AlignmentSummary = IndexMap<String, AlignmentResult>;

/// Bundled frames artifact: input name → frame set.
pub type FramesBundle = IndexMap<String, FrameSet>;

/// Bundled hits artifact: target name → ranked hit rows.
pub type HitsBundle = IndexMap<String, Vec<HitRow>>;

/// Key under which the synchronous endpoint wraps the alignment map.
const WRAPPED_ALIGNMENT_KEY: &str = "alignment_results";

/// Decodes server responses into typed artifacts.
///
/// Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct ArtifactFetcher {
    api: Arc<dyn JobApi>,
}

impl ArtifactFetcher {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    /// Current status of a job.
    pub async fn status(&self, job_id: &JobId) -> Result<StatusPayload> {
        let body = self.api.get_json(ApiRequest::Status { job_id }).await?;
        decode("status", body)
    }

    /// Fetch one artifact by key and decode it as `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        job_id: &JobId,
        key: &ArtifactKey,
        artifact: &str,
    ) -> Result<T> {
        debug!(%job_id, artifact, "fetching artifact");
        let body = self
            .api
            .get_json(ApiRequest::Artifact { job_id, key })
            .await?;
        decode(artifact, body)
    }

    pub async fn alignment_summary(
        &self,
        job_id: &JobId,
        key: &ArtifactKey,
    ) -> Result<AlignmentSummary> {
        let mut body: serde_json::Value = self.fetch(job_id, key, "alignment").await?;
        // The artifact is the bare map; the synchronous endpoint wraps it.
        if let Some(inner) = body
            .as_object_mut()
            .and_then(|map| map.remove(WRAPPED_ALIGNMENT_KEY))
        {
            body = inner;
        }
        decode("alignment", body)
    }

    pub async fn frames_bundle(&self, job_id: &JobId, key: &ArtifactKey) -> Result<FramesBundle> {
        self.fetch(job_id, key, "frames").await
    }

    pub async fn hits_bundle(&self, job_id: &JobId, key: &ArtifactKey) -> Result<HitsBundle> {
        self.fetch(job_id, key, "top_hits").await
    }

    /// Frames of one input, fetched on demand.
    pub async fn frames_for_input(&self, job_id: &JobId, input: &str) -> Result<FrameSet> {
        let body = self.api.get_json(ApiRequest::Frames { job_id, input }).await?;
        decode("frames", body)
    }

    /// Ranked hits of one target, fetched on demand.
    pub async fn hits_for_target(&self, job_id: &JobId, target: &str) -> Result<Vec<HitRow>> {
        let body = self.api.get_json(ApiRequest::Hits { job_id, target }).await?;
        decode("hits", body)
    }
}

fn decode<T: DeserializeOwned>(what: &str, body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| AlignwatchError::malformed(format!("{what}: {e}")))
}
