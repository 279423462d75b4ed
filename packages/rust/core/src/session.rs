//! Browsing an assembled result: the current selection and per-selection
//! sections that may have to be fetched on demand.

use tracing::{debug, instrument};

use alignwatch_client::ArtifactFetcher;
use alignwatch_shared::{
    AlignmentResult, AlignwatchError, FrameSet, HitRow, Result, ResultView,
};

/// Content of one results section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionState<T> {
    Loaded(T),
    /// The input has no alignment (the server's explanation is attached).
    NoAlignment(String),
    /// The section could not be loaded; the rest of the view is unaffected.
    Unavailable(String),
}

impl<T> SectionState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// A [`ResultView`] plus which input and target are being looked at.
pub struct ResultSession {
    view: ResultView,
    fetcher: ArtifactFetcher,
    selected_input: Option<String>,
    selected_target: Option<String>,
}

impl ResultSession {
    /// Selects the first input in key order and the first available target.
    pub fn new(view: ResultView, fetcher: ArtifactFetcher) -> Self {
        let selected_input = view.default_input().map(str::to_string);
        let selected_target = view.available_targets.first().cloned();
        Self {
            view,
            fetcher,
            selected_input,
            selected_target,
        }
    }

    pub fn view(&self) -> &ResultView {
        &self.view
    }

    pub fn selected_input(&self) -> Option<&str> {
        self.selected_input.as_deref()
    }

    pub fn select_input(&mut self, input: &str) -> Result<()> {
        if !self.view.alignment_by_input.contains_key(input) {
            return Err(AlignwatchError::validation(format!(
                "unknown input '{input}' (have: {})",
                self.view.input_names().collect::<Vec<_>>().join(", ")
            )));
        }
        self.selected_input = Some(input.to_string());
        Ok(())
    }

    pub fn selected_target(&self) -> Option<&str> {
        self.selected_target.as_deref()
    }

    pub fn select_target(&mut self, target: &str) -> Result<()> {
        if !self.view.available_targets.iter().any(|t| t == target) {
            return Err(AlignwatchError::validation(format!(
                "unknown target '{target}' (have: {})",
                self.view.available_targets.join(", ")
            )));
        }
        self.selected_target = Some(target.to_string());
        Ok(())
    }

    pub fn selected_alignment(&self) -> Option<&AlignmentResult> {
        self.selected_input
            .as_ref()
            .and_then(|input| self.view.alignment_by_input.get(input))
    }

    /// Frames of `input`, from the bundle when it was loaded, else fetched.
    #[instrument(skip(self), fields(job_id = %self.view.job_id))]
    pub async fn frames_for(&self, input: &str) -> SectionState<FrameSet> {
        match self.view.alignment_by_input.get(input) {
            None => return SectionState::Unavailable(format!("unknown input '{input}'")),
            Some(result) => {
                if let Some(detail) = &result.detail {
                    return SectionState::NoAlignment(detail.clone());
                }
            }
        }

        if let Some(frames) = self
            .view
            .frames_by_input
            .as_ref()
            .and_then(|bundle| bundle.get(input))
        {
            return SectionState::Loaded(frames.clone());
        }

        debug!("frames not bundled, fetching");
        match self.fetcher.frames_for_input(&self.view.job_id, input).await {
            Ok(frames) => SectionState::Loaded(frames),
            Err(e) => SectionState::Unavailable(e.to_string()),
        }
    }

    /// Ranked hits of `target`, from the bundle when it was loaded, else fetched.
    #[instrument(skip(self), fields(job_id = %self.view.job_id))]
    pub async fn hits_for(&self, target: &str) -> SectionState<Vec<HitRow>> {
        if !self.view.available_targets.iter().any(|t| t == target) {
            return SectionState::Unavailable(format!("unknown target '{target}'"));
        }

        if let Some(rows) = self
            .view
            .hits_by_target
            .as_ref()
            .and_then(|bundle| bundle.get(target))
        {
            return SectionState::Loaded(rows.clone());
        }

        debug!("hits not bundled, fetching");
        match self.fetcher.hits_for_target(&self.view.job_id, target).await {
            Ok(rows) => SectionState::Loaded(rows),
            Err(e) => SectionState::Unavailable(e.to_string()),
        }
    }
}
