//! Job-completion workflow for alignwatch.
//!
//! This crate drives a submitted job to a terminal state ([`JobPoller`]),
//! turns a completed job's artifacts into one [`ResultView`]
//! ([`ResultAssembler`]), and serves per-selection sections of that view
//! ([`ResultSession`]).
//!
//! [`ResultView`]: alignwatch_shared::ResultView

pub mod assembler;
pub mod poller;
pub mod session;

#[cfg(test)]
mod testing;

pub use assembler::{AssemblyError, ResultAssembler};
pub use poller::{
    JobFailure, JobPoller, PollCanceller, PollOutcome, PollProgress, SilentPoll, next_delay,
};
pub use session::{ResultSession, SectionState};
