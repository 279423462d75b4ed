//! Core domain and wire types for alignment jobs and their result artifacts.

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Server-assigned identifier of a submitted alignment job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = crate::AlignwatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::AlignwatchError::validation("job id must not be empty"));
        }
        if trimmed.contains('/') {
            return Err(crate::AlignwatchError::validation(format!(
                "job id '{trimmed}' must not contain '/'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle of a job as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A job and its current status. Once terminal, it never changes again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
}

/// Status string as reported by the status endpoint.
///
/// `UNKNOWN` is returned for ids the backend has never seen and `ERROR` when
/// its job table lookup fails; neither will ever progress, so both map to
/// [`JobStatus::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportedStatus {
    Pending,
    Completed,
    Failed,
    Unknown,
    Error,
}

impl ReportedStatus {
    pub fn job_status(self) -> JobStatus {
        match self {
            Self::Pending => JobStatus::Pending,
            Self::Completed => JobStatus::Completed,
            Self::Failed | Self::Unknown | Self::Error => JobStatus::Failed,
        }
    }
}

impl std::fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Status payload
// ---------------------------------------------------------------------------

/// Opaque key of one retrievable result artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(pub String);

impl ArtifactKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `result_urls` object of a completed status payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<ArtifactKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<ArtifactKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_hits: Option<ArtifactKey>,
}

/// Export links, only issued for authenticated submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLinks {
    pub orf_mappings: String,
    pub top_hits: String,
}

/// Body of `GET status/{job_id}`.
///
/// The job table stores the nested objects stringified, so each may arrive
/// either as JSON or as a string holding JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub job_id: Option<JobId>,
    pub status: ReportedStatus,
    #[serde(default, deserialize_with = "embedded_json")]
    pub available_targets: Option<Vec<String>>,
    #[serde(default, deserialize_with = "embedded_json")]
    pub result_urls: Option<ResultUrls>,
    #[serde(default, deserialize_with = "embedded_json")]
    pub download_links: Option<DownloadLinks>,
}

/// Artifact keys of a completed job, with the mandatory one guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub alignment: ArtifactKey,
    pub frames: Option<ArtifactKey>,
    pub hits: Option<ArtifactKey>,
}

/// Everything a COMPLETED status payload tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job_id: JobId,
    pub keys: ArtifactKeys,
    pub available_targets: Vec<String>,
    pub download_links: Option<DownloadLinks>,
}

impl StatusPayload {
    /// Extract the completion data; fails when the alignment key is missing.
    pub fn into_completed(self, job_id: &JobId) -> crate::Result<CompletedJob> {
        let urls = self.result_urls.unwrap_or_default();
        let alignment = urls.alignment.ok_or_else(|| {
            crate::AlignwatchError::malformed("completed job has no alignment artifact key")
        })?;
        Ok(CompletedJob {
            job_id: job_id.clone(),
            keys: ArtifactKeys {
                alignment,
                frames: urls.frames,
                hits: urls.top_hits,
            },
            available_targets: self.available_targets.unwrap_or_default(),
            download_links: self.download_links,
        })
    }
}

fn embedded_json<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(raw)) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(D::Error::custom),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(D::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Best alignment found for one input sequence.
///
/// When `detail` is set, no alignment was computed and the other fields
/// carry no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    #[serde(default)]
    pub identity_pct: f64,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub top_orf: String,
    #[serde(default)]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AlignmentResult {
    pub fn is_aligned(&self) -> bool {
        self.detail.is_none()
    }
}

/// One ranked hit of an ORF against a target. Rank is the row's position.
///
/// Serialized as the 4-tuple `[identity_pct, lca, orf, origin]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, u32, String, String)", into = "(f64, u32, String, String)")]
pub struct HitRow {
    pub identity_pct: f64,
    /// Longest continuous alignment window.
    pub longest_continuous_alignment: u32,
    pub orf_sequence: String,
    pub origin_sequence: String,
}

impl From<(f64, u32, String, String)> for HitRow {
    fn from((identity_pct, lca, orf, origin): (f64, u32, String, String)) -> Self {
        Self {
            identity_pct,
            longest_continuous_alignment: lca,
            orf_sequence: orf,
            origin_sequence: origin,
        }
    }
}

impl From<HitRow> for (f64, u32, String, String) {
    fn from(row: HitRow) -> Self {
        (
            row.identity_pct,
            row.longest_continuous_alignment,
            row.orf_sequence,
            row.origin_sequence,
        )
    }
}

/// Translation of one reading frame and the ORFs found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(rename = "aa_seq")]
    pub amino_acid_sequence: String,
    #[serde(rename = "orf_set", default)]
    pub orf_substrings: Vec<String>,
}

/// Frame label (e.g. `Frame #2 (FWD)`) to frame data, in server order.
pub type FrameSet = IndexMap<String, FrameData>;

// ---------------------------------------------------------------------------
// ResultView
// ---------------------------------------------------------------------------

/// Fully assembled results of a completed job, handed out as a snapshot.
///
/// Maps keep the order in which the server listed their keys, which is the
/// order the sequences were submitted in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub job_id: JobId,
    pub alignment_by_input: IndexMap<String, AlignmentResult>,
    /// `None` when frames were not bundled or failed to load.
    pub frames_by_input: Option<IndexMap<String, FrameSet>>,
    /// `None` when hits were not bundled or failed to load.
    pub hits_by_target: Option<IndexMap<String, Vec<HitRow>>>,
    pub available_targets: Vec<String>,
    pub download_links: Option<DownloadLinks>,
    /// Supplementary artifacts that could not be loaded, in a fixed order.
    pub warnings: Vec<String>,
}

impl ResultView {
    /// Input names in server order.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.alignment_by_input.keys().map(String::as_str)
    }

    /// The entry shown first: the first input the server listed.
    pub fn default_input(&self) -> Option<&str> {
        self.input_names().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_parse_trims_and_rejects_empty() {
        let id: JobId = " 3f1c-77 ".parse().expect("parse");
        assert_eq!(id.as_str(), "3f1c-77");
        assert!("".parse::<JobId>().is_err());
        assert!("a/b".parse::<JobId>().is_err());
    }

    #[test]
    fn reported_status_maps_to_job_status() {
        assert_eq!(ReportedStatus::Pending.job_status(), JobStatus::Pending);
        assert_eq!(ReportedStatus::Completed.job_status(), JobStatus::Completed);
        assert_eq!(ReportedStatus::Unknown.job_status(), JobStatus::Failed);
        assert_eq!(ReportedStatus::Error.job_status(), JobStatus::Failed);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn status_payload_accepts_stringified_fields() {
        let json = r#"{
            "job_id": "j1",
            "status": "COMPLETED",
            "available_targets": "[\"GFP\", \"mCherry\"]",
            "result_urls": "{\"alignment\": \"tmp/j1/alignment_res.json\", \"frames\": \"tmp/j1/frames.json\"}"
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).expect("deserialize");
        assert_eq!(payload.status, ReportedStatus::Completed);
        assert_eq!(
            payload.available_targets.as_deref(),
            Some(&["GFP".to_string(), "mCherry".to_string()][..])
        );
        let urls = payload.result_urls.expect("urls");
        assert_eq!(urls.frames.unwrap().as_str(), "tmp/j1/frames.json");
        assert!(urls.top_hits.is_none());
    }

    #[test]
    fn status_payload_accepts_native_fields() {
        let json = r#"{
            "status": "COMPLETED",
            "available_targets": ["GFP"],
            "result_urls": {"alignment": "a", "top_hits": "h"},
            "download_links": {"orf_mappings": "https://x/o.csv", "top_hits": "https://x/t.csv"}
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).expect("deserialize");
        let job_id: JobId = "j2".parse().unwrap();
        let completed = payload.into_completed(&job_id).expect("completed");
        assert_eq!(completed.keys.alignment.as_str(), "a");
        assert_eq!(completed.keys.hits.unwrap().as_str(), "h");
        assert!(completed.keys.frames.is_none());
        assert_eq!(completed.available_targets, vec!["GFP".to_string()]);
        assert!(completed.download_links.is_some());
    }

    #[test]
    fn pending_payload_has_no_extras() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"job_id": "j", "status": "PENDING"}"#).expect("deserialize");
        assert_eq!(payload.status, ReportedStatus::Pending);
        assert!(payload.result_urls.is_none());
    }

    #[test]
    fn unrecognised_status_is_rejected() {
        let result = serde_json::from_str::<StatusPayload>(r#"{"status": "RUNNING"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn completed_without_alignment_key_is_malformed() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"status": "COMPLETED", "result_urls": {"frames": "f"}}"#)
                .expect("deserialize");
        let err = payload
            .into_completed(&"j".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, crate::AlignwatchError::MalformedPayload { .. }));
    }

    #[test]
    fn alignment_result_detail_only() {
        let result: AlignmentResult =
            serde_json::from_str(r#"{"detail": "No valid ORFs found."}"#).expect("deserialize");
        assert!(!result.is_aligned());
        assert!(result.target.is_none());
    }

    #[test]
    fn hit_row_is_a_tuple_on_the_wire() {
        let rows: Vec<HitRow> =
            serde_json::from_str(r#"[[99.5, 120, "MKV*", "seq_1"], [80.0, 40, "MAA", "seq_2"]]"#)
                .expect("deserialize");
        assert_eq!(rows[0].longest_continuous_alignment, 120);
        assert_eq!(rows[1].origin_sequence, "seq_2");
        let json = serde_json::to_string(&rows[1]).expect("serialize");
        assert_eq!(json, r#"[80.0,40,"MAA","seq_2"]"#);
    }

    #[test]
    fn frame_set_uses_wire_names() {
        let frames: FrameSet = serde_json::from_str(
            r#"{"Frame #1 (FWD)": {"aa_seq": "MKVLA*", "orf_set": ["MKVLA"]}}"#,
        )
        .expect("deserialize");
        let frame = &frames["Frame #1 (FWD)"];
        assert_eq!(frame.amino_acid_sequence, "MKVLA*");
        assert_eq!(frame.orf_substrings, vec!["MKVLA".to_string()]);
    }

    #[test]
    fn frame_set_keeps_server_order() {
        let frames: FrameSet = serde_json::from_str(
            r#"{"Frame #3 (REV)": {"aa_seq": "MA"}, "Frame #1 (FWD)": {"aa_seq": "MK"}}"#,
        )
        .expect("deserialize");
        let labels: Vec<_> = frames.keys().map(String::as_str).collect();
        assert_eq!(labels, ["Frame #3 (REV)", "Frame #1 (FWD)"]);
    }
}
