//! Occurrence search and overlap merging over a parent sequence.
//!
//! Offsets are byte offsets into the sequence `&str`. Literal matches always
//! start and end on char boundaries, so slicing with them is safe.

/// Half-open `[start, end)` range into a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "interval start {start} past end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Strict overlap: sharing only a boundary (`a.end == b.start`) is not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Find every non-overlapping, left-to-right occurrence of each substring.
///
/// Matching is literal. Empty substrings and substrings that never occur
/// contribute nothing.
pub fn find_occurrences<S: AsRef<str>>(sequence: &str, substrings: &[S]) -> Vec<Interval> {
    let mut intervals = Vec::new();
    for needle in substrings {
        let needle = needle.as_ref();
        if needle.is_empty() {
            continue;
        }
        intervals.extend(
            sequence
                .match_indices(needle)
                .map(|(start, m)| Interval::new(start, start + m.len())),
        );
    }
    intervals
}

/// Sort by start and merge intervals that strictly overlap.
///
/// Adjacent intervals (`a.end == b.start`) stay separate. Running this on its
/// own output returns the same list.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_unstable();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for next in intervals {
        match merged.last_mut() {
            Some(current) if next.start < current.end => {
                current.end = current.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Occurrences of all `substrings` in `sequence`, merged into disjoint spans.
pub fn merge<S: AsRef<str>>(sequence: &str, substrings: &[S]) -> Vec<Interval> {
    merge_intervals(find_occurrences(sequence, substrings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end)
    }

    #[test]
    fn finds_all_non_overlapping_occurrences() {
        assert_eq!(find_occurrences("ATGAAACCCTTTATG", &["ATG"]), vec![iv(0, 3), iv(12, 15)]);
        // "AAA" in "AAAAA" matches once at 0, then resumes scanning after it
        assert_eq!(find_occurrences("AAAAA", &["AAA"]), vec![iv(0, 3)]);
    }

    #[test]
    fn missing_and_empty_substrings_contribute_nothing() {
        assert!(find_occurrences("MKVLA", &["WWW", ""]).is_empty());
        assert!(merge("MKVLA", &[] as &[&str]).is_empty());
    }

    #[test]
    fn matching_is_literal() {
        // Pattern metacharacters are plain characters here
        assert_eq!(find_occurrences("MK.A*MKVA*", &["K.A*"]), vec![iv(1, 5)]);
        assert!(find_occurrences("MKVA", &["K.A"]).is_empty());
    }

    #[test]
    fn adjacent_spans_are_not_merged() {
        let merged = merge("ATGAAACCCTTTATG", &["ATG", "AAACCC"]);
        assert_eq!(merged, vec![iv(0, 3), iv(3, 9), iv(12, 15)]);
    }

    #[test]
    fn overlapping_spans_merge() {
        // MKVL [0,4) and VLAG [2,6) overlap, LAGT [3,7) extends further
        let merged = merge("MKVLAGTW", &["MKVL", "VLAG", "LAGT"]);
        assert_eq!(merged, vec![iv(0, 7)]);
    }

    #[test]
    fn contained_span_is_absorbed() {
        let merged = merge("MKVLAGTW", &["KV", "MKVLAG"]);
        assert_eq!(merged, vec![iv(0, 6)]);
    }

    #[test]
    fn result_is_independent_of_substring_order() {
        let seq = "MAMKVLMAGMKWA";
        let a = merge(seq, &["MK", "KVL", "MAG", "A"]);
        let b = merge(seq, &["A", "MAG", "KVL", "MK"]);
        assert_eq!(a, b);
    }

    #[test]
    fn merged_output_is_sorted_disjoint_and_idempotent() {
        let seq = "MKVLAMKVLAGGMKMKMKAAAGT";
        let merged = merge(seq, &["MKV", "VLA", "GGM", "MKMK", "AA", "T"]);
        for pair in merged.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(pair[0].end <= pair[1].start);
            assert!(!pair[0].overlaps(&pair[1]));
        }
        assert_eq!(merge_intervals(merged.clone()), merged);
    }

    #[test]
    fn overlap_is_strict() {
        assert!(iv(0, 3).overlaps(&iv(2, 5)));
        assert!(!iv(0, 3).overlaps(&iv(3, 5)));
        assert!(iv(0, 10).overlaps(&iv(4, 5)));
    }
}
