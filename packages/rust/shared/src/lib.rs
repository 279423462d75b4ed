//! Shared types, error model, and configuration for alignwatch.
//!
//! This crate is the foundation depended on by all other alignwatch crates.
//! It provides:
//! - [`AlignwatchError`]: the unified error type
//! - Job and artifact types ([`JobId`], [`StatusPayload`], [`ResultView`], ...)
//! - Configuration ([`AppConfig`], [`PollConfig`], [`ClientConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClientConfig, EndpointsConfig, HighlightConfig, PollConfig, PollingConfig,
    ServerConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{AlignwatchError, Result};
pub use types::{
    AlignmentResult, ArtifactKey, ArtifactKeys, CompletedJob, DownloadLinks, FrameData, FrameSet,
    HitRow, Job, JobId, JobStatus, ReportedStatus, ResultUrls, ResultView, StatusPayload,
};
