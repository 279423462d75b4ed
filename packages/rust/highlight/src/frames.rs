//! Frame-label parsing and FASTA export of translated frames.

use std::sync::LazyLock;

use regex::Regex;

use alignwatch_shared::{FrameData, FrameSet};

/// Display parts of a frame label such as `Frame #2 (REV)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLabel<'a> {
    /// `Frame #2`, or the whole label when it does not follow the pattern.
    pub name: &'a str,
    /// Text inside the trailing parentheses, e.g. `REV`.
    pub direction: Option<&'a str>,
}

/// Split a frame label into display name and direction.
pub fn parse_frame_label(label: &str) -> FrameLabel<'_> {
    static LABEL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(Frame #\d+).*\((.*)\)").expect("valid regex"));

    match LABEL_RE.captures(label) {
        Some(caps) => FrameLabel {
            name: caps.get(1).map_or(label, |m| m.as_str()),
            direction: caps.get(2).map(|m| m.as_str()),
        },
        None => FrameLabel {
            name: label,
            direction: None,
        },
    }
}

/// "1 ORF" / "3 ORFs".
pub fn orf_count_label(count: usize) -> String {
    if count == 1 {
        "1 ORF".to_string()
    } else {
        format!("{count} ORFs")
    }
}

/// Single FASTA record for one frame (the per-frame copy text).
pub fn frame_fasta(label: &str, frame: &FrameData) -> String {
    format!(">{label}\n{}", frame.amino_acid_sequence)
}

/// All frames as one FASTA document, records separated by a blank line.
pub fn frames_to_fasta(frames: &FrameSet) -> String {
    frames
        .iter()
        .map(|(label, frame)| frame_fasta(label, frame))
        .collect::<Vec<_>>()
        .join("\n\n")
}
