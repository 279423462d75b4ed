//! ORF highlighting over translated sequences.
//!
//! Given a sequence and the ORFs found in it, computes the minimal set of
//! disjoint highlighted spans and splits the sequence into alternating
//! plain/highlighted segments for rendering and per-span copy actions.
//!
//! - [`interval`]: occurrence search and the overlap merge
//! - [`copy`]: time-bounded "copied" indicator keyed by span text
//! - [`frames`]: frame labels and FASTA export

pub mod copy;
pub mod frames;
pub mod interval;

use tracing::trace;

use alignwatch_shared::FrameData;

pub use copy::{CopyFeedback, DEFAULT_COPY_RESET};
pub use frames::{FrameLabel, frame_fasta, frames_to_fasta, orf_count_label, parse_frame_label};
pub use interval::{Interval, find_occurrences, merge, merge_intervals};

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One run of a highlighted sequence, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside every span.
    Plain(&'a str),
    /// A merged span; `text` is also the unit of copy.
    Highlight { text: &'a str, interval: Interval },
}

impl<'a> Segment<'a> {
    pub fn text(&self) -> &'a str {
        match self {
            Self::Plain(text) | Self::Highlight { text, .. } => text,
        }
    }

    pub fn is_highlight(&self) -> bool {
        matches!(self, Self::Highlight { .. })
    }
}

/// A sequence together with its merged highlight spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted<'a> {
    sequence: &'a str,
    spans: Vec<Interval>,
}

impl<'a> Highlighted<'a> {
    pub fn sequence(&self) -> &'a str {
        self.sequence
    }

    /// Merged spans, sorted and disjoint.
    pub fn spans(&self) -> &[Interval] {
        &self.spans
    }

    /// The literal text of every span, in order.
    pub fn span_texts(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.spans.iter().map(|iv| &self.sequence[iv.start..iv.end])
    }

    /// Alternating plain/highlighted runs. Concatenating their texts yields
    /// the original sequence. Without spans the whole sequence is one plain run.
    pub fn segments(&self) -> Vec<Segment<'a>> {
        if self.spans.is_empty() {
            return vec![Segment::Plain(self.sequence)];
        }

        let mut segments = Vec::with_capacity(self.spans.len() * 2 + 1);
        let mut cursor = 0;
        for &interval in &self.spans {
            if interval.start > cursor {
                segments.push(Segment::Plain(&self.sequence[cursor..interval.start]));
            }
            segments.push(Segment::Highlight {
                text: &self.sequence[interval.start..interval.end],
                interval,
            });
            cursor = interval.end;
        }
        if cursor < self.sequence.len() {
            segments.push(Segment::Plain(&self.sequence[cursor..]));
        }
        segments
    }
}

/// Highlight every occurrence of `orfs` in `sequence`.
pub fn highlight<'a, S: AsRef<str>>(sequence: &'a str, orfs: &[S]) -> Highlighted<'a> {
    let spans = merge(sequence, orfs);
    trace!(
        sequence_len = sequence.len(),
        orfs = orfs.len(),
        spans = spans.len(),
        "highlighted sequence"
    );
    Highlighted { sequence, spans }
}

/// Highlight a translated frame's ORFs within its amino-acid sequence.
pub fn highlight_frame(frame: &FrameData) -> Highlighted<'_> {
    highlight(&frame.amino_acid_sequence, &frame.orf_substrings)
}
