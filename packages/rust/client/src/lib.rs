//! Results-server client for alignment jobs.
//!
//! This crate provides:
//! - [`JobApi`]: the injected transport seam (one JSON GET per [`ApiRequest`])
//! - [`HttpJobApi`]: the `reqwest` implementation with endpoint templates
//! - [`ArtifactFetcher`]: typed decoding of status payloads and artifacts

mod api;
mod artifact;
mod http;

pub use api::{ApiRequest, JobApi};
pub use artifact::{AlignmentSummary, ArtifactFetcher, FramesBundle, HitsBundle};
pub use http::HttpJobApi;
