//! In-process results server for poller and assembler tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;

use alignwatch_client::{ApiRequest, ArtifactFetcher, JobApi};
use alignwatch_shared::{AlignwatchError, Result};

/// What the fake answers for one artifact key or lazy lookup.
#[derive(Clone)]
pub(crate) enum Reply {
    Body(Value),
    Fail(String),
}

/// Scripted server: status replies are consumed in order, artifact replies
/// are keyed and may be delayed to reorder their completion.
#[derive(Default)]
pub(crate) struct FakeServer {
    statuses: Mutex<VecDeque<Reply>>,
    status_latency: Duration,
    artifacts: HashMap<String, (Duration, Reply)>,
    lazy: HashMap<String, Reply>,
    pub(crate) status_checks: Mutex<Vec<Instant>>,
    pub(crate) artifact_order: Mutex<Vec<String>>,
}

impl FakeServer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn statuses(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        *self.statuses.lock().unwrap() = replies.into_iter().collect();
        self
    }

    pub(crate) fn status_latency(mut self, latency: Duration) -> Self {
        self.status_latency = latency;
        self
    }

    pub(crate) fn artifact(mut self, key: &str, delay: Duration, reply: Reply) -> Self {
        self.artifacts.insert(key.to_string(), (delay, reply));
        self
    }

    /// Reply for `frames/{input}` or `hits/{target}` lookups.
    pub(crate) fn lazy(mut self, path: &str, reply: Reply) -> Self {
        self.lazy.insert(path.to_string(), reply);
        self
    }

    pub(crate) fn check_count(&self) -> usize {
        self.status_checks.lock().unwrap().len()
    }

    pub(crate) fn into_fetcher(self) -> (Arc<FakeServer>, ArtifactFetcher) {
        let server = Arc::new(self);
        let fetcher = ArtifactFetcher::new(server.clone());
        (server, fetcher)
    }
}

fn settle(reply: Reply) -> Result<Value> {
    match reply {
        Reply::Body(body) => Ok(body),
        Reply::Fail(reason) => Err(AlignwatchError::Network(reason)),
    }
}

#[async_trait]
impl JobApi for FakeServer {
    async fn get_json(&self, request: ApiRequest<'_>) -> Result<Value> {
        match request {
            ApiRequest::Status { .. } => {
                self.status_checks.lock().unwrap().push(Instant::now());
                if !self.status_latency.is_zero() {
                    tokio::time::sleep(self.status_latency).await;
                }
                let next = self.statuses.lock().unwrap().pop_front();
                settle(next.unwrap_or(Reply::Fail("status script exhausted".into())))
            }
            ApiRequest::Artifact { key, .. } => {
                let (delay, reply) = self
                    .artifacts
                    .get(key.as_str())
                    .cloned()
                    .unwrap_or((Duration::ZERO, Reply::Fail(format!("{key}: HTTP 404"))));
                tokio::time::sleep(delay).await;
                self.artifact_order.lock().unwrap().push(key.to_string());
                settle(reply)
            }
            ApiRequest::Frames { input, .. } => settle(
                self.lazy
                    .get(&format!("frames/{input}"))
                    .cloned()
                    .unwrap_or(Reply::Fail("frames: HTTP 404".into())),
            ),
            ApiRequest::Hits { target, .. } => settle(
                self.lazy
                    .get(&format!("hits/{target}"))
                    .cloned()
                    .unwrap_or(Reply::Fail("hits: HTTP 404".into())),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Canned bodies
// ---------------------------------------------------------------------------

pub(crate) fn pending() -> Reply {
    Reply::Body(json!({"job_id": "job-1", "status": "PENDING"}))
}

pub(crate) fn completed() -> Reply {
    Reply::Body(json!({
        "job_id": "job-1",
        "status": "COMPLETED",
        "available_targets": "[\"GFP\", \"mCherry\"]",
        "result_urls": "{\"alignment\": \"align.json\", \"frames\": \"frames.json\", \"top_hits\": \"hits.json\"}"
    }))
}

pub(crate) fn alignment_body() -> Value {
    json!({
        "seq_a": {"identity_pct": 99.5, "target": "GFP", "top_orf": "MSKGEEL", "alignment": "MSKGEEL\n|||||||\nMSKGEEL"},
        "seq_b": {"identity_pct": 88.0, "target": "mCherry", "top_orf": "MVSKGEE", "alignment": null},
        "seq_c": {"detail": "No valid ORFs found."}
    })
}

/// Alignment artifact parsed from raw text, so key order is exactly as written.
pub(crate) fn alignment_from_text(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

pub(crate) fn frames_body() -> Value {
    json!({
        "seq_a": {"Frame #1 (FWD)": {"aa_seq": "LMSKGEEL*", "orf_set": ["MSKGEEL"]}},
        "seq_b": {"Frame #1 (FWD)": {"aa_seq": "MVSKGEE*", "orf_set": ["MVSKGEE"]}}
    })
}

pub(crate) fn hits_body() -> Value {
    json!({
        "GFP": [[99.5, 7, "MSKGEEL", "seq_a"], [40.0, 2, "MVSKGEE", "seq_b"]],
        "mCherry": [[88.0, 7, "MVSKGEE", "seq_b"]]
    })
}
