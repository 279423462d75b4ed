//! Result assembly: fetch a completed job's artifacts concurrently and merge
//! them into one [`ResultView`].
//!
//! The alignment summary is mandatory. Frames and hits bundles are optional;
//! when one fails the view is still produced and the failure is recorded as a
//! warning. Warnings are always ordered frames before hits, whichever request
//! finishes first.

use tracing::{info, instrument, warn};

use alignwatch_client::{ArtifactFetcher, FramesBundle, HitsBundle};
use alignwatch_shared::{AlignwatchError, ArtifactKey, CompletedJob, JobId, Result, ResultView};

/// The mandatory artifact of a completed job could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("job {job_id}: alignment summary unavailable: {source}")]
    Alignment {
        job_id: JobId,
        #[source]
        source: AlignwatchError,
    },
}

impl AssemblyError {
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Alignment { job_id, .. } => job_id,
        }
    }
}

/// Builds [`ResultView`]s from completed jobs.
#[derive(Clone)]
pub struct ResultAssembler {
    fetcher: ArtifactFetcher,
}

impl ResultAssembler {
    pub fn new(fetcher: ArtifactFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch every artifact the job advertises in parallel and merge them.
    ///
    /// The result depends only on the artifact contents, never on the order
    /// in which the requests complete.
    #[instrument(skip_all, fields(job_id = %job.job_id))]
    pub async fn assemble(&self, job: &CompletedJob) -> std::result::Result<ResultView, AssemblyError> {
        let job_id = &job.job_id;

        let (alignment, frames, hits) = tokio::join!(
            self.fetcher.alignment_summary(job_id, &job.keys.alignment),
            self.optional_frames(job_id, job.keys.frames.as_ref()),
            self.optional_hits(job_id, job.keys.hits.as_ref()),
        );

        let alignment_by_input = alignment.map_err(|source| AssemblyError::Alignment {
            job_id: job_id.clone(),
            source,
        })?;

        let mut warnings = Vec::new();
        let frames_by_input = settle("frames", frames, &mut warnings);
        let hits_by_target = settle("top_hits", hits, &mut warnings);

        let available_targets = if job.available_targets.is_empty() {
            hits_by_target
                .as_ref()
                .map(|hits| hits.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            job.available_targets.clone()
        };

        info!(
            inputs = alignment_by_input.len(),
            targets = available_targets.len(),
            warnings = warnings.len(),
            "results assembled"
        );

        Ok(ResultView {
            job_id: job_id.clone(),
            alignment_by_input,
            frames_by_input,
            hits_by_target,
            available_targets,
            download_links: job.download_links.clone(),
            warnings,
        })
    }

    async fn optional_frames(
        &self,
        job_id: &JobId,
        key: Option<&ArtifactKey>,
    ) -> Option<Result<FramesBundle>> {
        match key {
            Some(key) => Some(self.fetcher.frames_bundle(job_id, key).await),
            None => None,
        }
    }

    async fn optional_hits(
        &self,
        job_id: &JobId,
        key: Option<&ArtifactKey>,
    ) -> Option<Result<HitsBundle>> {
        match key {
            Some(key) => Some(self.fetcher.hits_bundle(job_id, key).await),
            None => None,
        }
    }
}

/// Keep a supplementary artifact, or downgrade its failure to a warning.
fn settle<T>(artifact: &str, outcome: Option<Result<T>>, warnings: &mut Vec<String>) -> Option<T> {
    match outcome? {
        Ok(value) => Some(value),
        Err(e) => {
            let partial = AlignwatchError::partial(artifact, &e);
            warn!(artifact, error = %e, "supplementary artifact failed");
            warnings.push(partial.to_string());
            None
        }
    }
}
