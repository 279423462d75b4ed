//! Terminal rendering of results. Every function returns the text to print.

use std::fmt::Write as _;

use crossterm::style::Stylize;

use alignwatch_highlight::{Highlighted, Segment, highlight_frame, orf_count_label, parse_frame_label};
use alignwatch_shared::{AlignmentResult, DownloadLinks, FrameSet, HitRow};

/// Sequence with its spans styled; the span equal to `copied` stands out.
pub(crate) fn highlighted(h: &Highlighted<'_>, copied: Option<&str>) -> String {
    h.segments()
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) => text.to_string(),
            Segment::Highlight { text, .. } if copied == Some(text) => {
                text.black().on_green().to_string()
            }
            Segment::Highlight { text, .. } => text.black().on_yellow().to_string(),
        })
        .collect()
}

/// Numbered list of merged spans: index, half-open range, text.
pub(crate) fn span_list(h: &Highlighted<'_>, copied: Option<&str>) -> String {
    let mut out = String::new();
    for (i, (interval, text)) in h.spans().iter().zip(h.span_texts()).enumerate() {
        let mark = if copied == Some(text) { "  Copied!" } else { "" };
        let _ = writeln!(
            out,
            "  [{}] {}..{}  {}{}",
            i + 1,
            interval.start,
            interval.end,
            text,
            mark.green()
        );
    }
    out
}

pub(crate) fn alignment(input: &str, result: &AlignmentResult) -> String {
    let mut out = format!("{}\n", input.bold());
    if let Some(detail) = &result.detail {
        let _ = writeln!(out, "  No alignment: {detail}");
        return out;
    }
    let _ = writeln!(
        out,
        "  Target:   {}",
        result.target.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "  Identity: {:.1}%", result.identity_pct);
    let _ = writeln!(out, "  Top ORF:  {}", result.top_orf);
    if let Some(text) = &result.alignment {
        let _ = writeln!(out);
        for line in text.lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    out
}

pub(crate) fn frames(frames: &FrameSet) -> String {
    if frames.is_empty() {
        return "  (no frames)\n".to_string();
    }
    let mut out = String::new();
    for (label, frame) in frames {
        let parsed = parse_frame_label(label);
        let _ = writeln!(
            out,
            "  {} {}  {}",
            parsed.name.bold(),
            parsed.direction.unwrap_or("").dim(),
            orf_count_label(frame.orf_substrings.len())
        );
        let _ = writeln!(out, "    {}", highlighted(&highlight_frame(frame), None));
    }
    out
}

pub(crate) fn hits(target: &str, rows: &[HitRow]) -> String {
    let mut out = format!("{}\n", format!("Top hits for {target}").bold());
    if rows.is_empty() {
        out.push_str("  (no hits)\n");
        return out;
    }
    let _ = writeln!(
        out,
        "  {:>4}  {:>8}  {:>5}  {:<16}  ORF",
        "Rank", "Identity", "LCA", "Origin"
    );
    for (rank, row) in rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>4}  {:>7.1}%  {:>5}  {:<16}  {}",
            rank + 1,
            row.identity_pct,
            row.longest_continuous_alignment,
            row.origin_sequence,
            row.orf_sequence
        );
    }
    out
}

pub(crate) fn download_links(links: &DownloadLinks) -> String {
    format!(
        "Downloads\n  ORF mappings: {}\n  Top hits:     {}\n",
        links.orf_mappings, links.top_hits
    )
}
