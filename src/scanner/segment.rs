//! SegmentFilter - Word-boundary validation for short matches
//!
//! A one-character role like "李" should not light up inside the unrelated
//! word "李子". The filter segments the text around a hit into word-like and
//! non-word-like runs and accepts the hit only when a word-like segment spans
//! it exactly.
//!
//! The default segmenter is ICU4X (`icu_segmenter`), the engine behind
//! `Intl.Segmenter`: UAX #29 rules plus dictionary segmentation for Chinese
//! and Japanese and LSTM models for Southeast Asian scripts. So "李" is its
//! own word in "李走了" but part of "李子" in "李子很甜".
//!
//! `UnicodeWordSegmenter` is a data-free fallback on plain UAX #29
//! (unicode-segmentation). UAX #29 splits every Han ideograph into its own
//! segment, so it merges adjacent ideographic segments back into one run:
//! without a dictionary, an ideograph counts as a standalone word only when
//! bordered by non-ideographic text, punctuation, whitespace or the text edges.

use unicode_segmentation::UnicodeSegmentation;

use super::config::MatchingConfig;

/// Characters of context kept on each side of a hit when segmenting
const CONTEXT_CHARS: usize = 64;

// =============================================================================
// Segmentation
// =============================================================================

/// A run of text produced by a `WordSegmenter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
    pub word_like: bool,
}

/// Splits text into consecutive word-like / non-word-like segments.
///
/// Segments must cover the input in order with byte offsets relative to it.
pub trait WordSegmenter: Send + Sync {
    fn segments(&self, text: &str) -> Vec<Segment>;
}

/// Locale-aware segmentation via ICU4X with dictionary and LSTM data compiled in
pub struct IcuWordSegmenter {
    inner: icu_segmenter::WordSegmenter,
}

impl IcuWordSegmenter {
    pub fn new() -> Self {
        Self {
            inner: icu_segmenter::WordSegmenter::new_auto(),
        }
    }
}

impl Default for IcuWordSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IcuWordSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcuWordSegmenter").finish_non_exhaustive()
    }
}

impl WordSegmenter for IcuWordSegmenter {
    fn segments(&self, text: &str) -> Vec<Segment> {
        let mut out: Vec<Segment> = Vec::new();
        let mut breaks = self.inner.segment_str(text);
        let mut start = 0;

        // The first breakpoint is always 0; each later one closes a segment
        // whose word type the iterator reports.
        while let Some(end) = breaks.next() {
            if end == start {
                continue;
            }
            out.push(Segment {
                start,
                end,
                word_like: breaks.is_word_like(),
            });
            start = end;
        }

        out
    }
}

/// UAX #29 segmentation with ideographic runs merged
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWordSegmenter;

impl WordSegmenter for UnicodeWordSegmenter {
    fn segments(&self, text: &str) -> Vec<Segment> {
        let mut out: Vec<Segment> = Vec::new();
        let mut prev_ideographic = false;

        for (start, piece) in text.split_word_bound_indices() {
            let end = start + piece.len();
            let word_like = piece.chars().any(char::is_alphanumeric);
            let ideographic = word_like && piece.chars().all(is_ideographic);

            if ideographic && prev_ideographic {
                if let Some(last) = out.last_mut() {
                    last.end = end;
                    continue;
                }
            }

            prev_ideographic = ideographic;
            out.push(Segment {
                start,
                end,
                word_like,
            });
        }

        out
    }
}

/// Scripts written without spaces that UAX #29 splits per character
fn is_ideographic(c: char) -> bool {
    matches!(c as u32,
        0x3005 | 0x3007
        | 0x3040..=0x309F   // Hiragana
        | 0x3400..=0x4DBF   // CJK Extension A
        | 0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0xF900..=0xFAFF   // CJK Compatibility Ideographs
        | 0x20000..=0x3134F // CJK Extensions B-G
    )
}

// =============================================================================
// SegmentFilter
// =============================================================================

/// Pure word-boundary check, callable independently of the collector
#[derive(Debug, Clone, Default)]
pub struct SegmentFilter<S: WordSegmenter = IcuWordSegmenter> {
    segmenter: S,
}

impl SegmentFilter<IcuWordSegmenter> {
    pub fn new() -> Self {
        Self {
            segmenter: IcuWordSegmenter::new(),
        }
    }
}

impl<S: WordSegmenter> SegmentFilter<S> {
    pub fn with_segmenter(segmenter: S) -> Self {
        Self { segmenter }
    }

    /// True iff a word-like segment spans exactly `[start, end)`.
    ///
    /// `pattern` must be the text at `[start, end)`; a mismatched or
    /// misaligned range is rejected.
    pub fn is_complete_word_match(&self, text: &str, pattern: &str, start: usize, end: usize) -> bool {
        if start >= end || text.get(start..end) != Some(pattern) {
            return false;
        }

        let (win_start, win_end) = context_window(text, start, end);
        let window = &text[win_start..win_end];
        let (rel_start, rel_end) = (start - win_start, end - win_start);

        self.segmenter
            .segments(window)
            .iter()
            .any(|seg| seg.word_like && seg.start == rel_start && seg.end == rel_end)
    }

    /// Whether a hit on `pattern` needs the boundary check.
    ///
    /// An explicit role override wins; otherwise the filter applies to
    /// patterns no longer than the configured threshold (in chars) while the
    /// global switch is on.
    pub fn should_apply_filter(&self, pattern: &str, role_override: Option<bool>, config: &MatchingConfig) -> bool {
        should_apply_filter(pattern, role_override, config)
    }
}

/// Free-function form of `SegmentFilter::should_apply_filter`
pub fn should_apply_filter(pattern: &str, role_override: Option<bool>, config: &MatchingConfig) -> bool {
    if let Some(explicit) = role_override {
        return explicit;
    }
    config.word_boundary_filter && pattern.chars().count() <= config.short_pattern_threshold
}

/// Byte window around `[start, end)` bounded by whitespace or
/// `CONTEXT_CHARS` characters on each side
fn context_window(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut win_start = start;
    for (idx, c) in text[..start].char_indices().rev().take(CONTEXT_CHARS) {
        if c.is_whitespace() {
            break;
        }
        win_start = idx;
    }

    let mut win_end = end;
    for (idx, c) in text[end..].char_indices().take(CONTEXT_CHARS) {
        if c.is_whitespace() {
            break;
        }
        win_end = end + idx + c.len_utf8();
    }

    (win_start, win_end)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        UnicodeWordSegmenter
            .segments(text)
            .into_iter()
            .filter(|s| s.word_like)
            .map(|s| &text[s.start..s.end])
            .collect()
    }

    #[test]
    fn test_ideographs_merge_into_one_word() {
        assert_eq!(words("李子很甜"), vec!["李子很甜"]);
        assert_eq!(words("李，你好"), vec!["李", "你好"]);
    }

    #[test]
    fn test_latin_words_follow_uax29() {
        assert_eq!(words("Frodo's ring, again."), vec!["Frodo's", "ring", "again"]);
    }

    #[test]
    fn test_segments_cover_text() {
        let text = "Sam 和 李明 went.";
        let segs = UnicodeWordSegmenter.segments(text);
        assert_eq!(segs.first().map(|s| s.start), Some(0));
        assert_eq!(segs.last().map(|s| s.end), Some(text.len()));
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_substring_inside_word_rejected() {
        let filter = SegmentFilter::with_segmenter(UnicodeWordSegmenter);
        assert!(!filter.is_complete_word_match("李子很甜", "李", 0, 3));
        assert!(!filter.is_complete_word_match("at the hotel", "h", 7, 8));
    }

    #[test]
    fn test_standalone_word_accepted() {
        let filter = SegmentFilter::with_segmenter(UnicodeWordSegmenter);
        assert!(filter.is_complete_word_match("李，你好", "李", 0, 3));
        assert!(filter.is_complete_word_match("我叫 李 。", "李", 7, 10));
        assert!(filter.is_complete_word_match("plan A works", "A", 5, 6));
    }

    #[test]
    fn test_punctuation_is_not_word_like() {
        let filter = SegmentFilter::with_segmenter(UnicodeWordSegmenter);
        assert!(!filter.is_complete_word_match("wait, what", ",", 4, 5));
    }

    #[test]
    fn test_misaligned_range_rejected() {
        let filter = SegmentFilter::with_segmenter(UnicodeWordSegmenter);
        assert!(!filter.is_complete_word_match("plan A", "B", 5, 6));
        assert!(!filter.is_complete_word_match("plan A", "A", 6, 6));
        assert!(!filter.is_complete_word_match("李", "李", 1, 3));
    }

    #[test]
    fn test_match_far_into_long_run() {
        // No whitespace: the window is capped but the verdict is unchanged
        let text = "字".repeat(500);
        let filter = SegmentFilter::with_segmenter(UnicodeWordSegmenter);
        assert!(!filter.is_complete_word_match(&text, "字", 600, 603));

        let standalone = format!("{}。字。{}", "字".repeat(200), "字".repeat(200));
        let start = 200 * 3 + "。".len();
        assert!(filter.is_complete_word_match(&standalone, "字", start, start + 3));
    }

    // -------------------------------------------------------------------------
    // ICU segmenter (default)
    // -------------------------------------------------------------------------

    fn icu_words(text: &str) -> Vec<String> {
        IcuWordSegmenter::new()
            .segments(text)
            .into_iter()
            .filter(|s| s.word_like)
            .map(|s| text[s.start..s.end].to_string())
            .collect()
    }

    #[test]
    fn test_icu_segments_cover_text() {
        let text = "李走了。Sam 和 李明 went.";
        let segs = IcuWordSegmenter::new().segments(text);
        assert_eq!(segs.first().map(|s| s.start), Some(0));
        assert_eq!(segs.last().map(|s| s.end), Some(text.len()));
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_icu_dictionary_splits_chinese() {
        assert!(icu_words("李走了。").contains(&"李".to_string()));
        assert!(icu_words("李子很甜").contains(&"李子".to_string()));
        assert_eq!(icu_words("Frodo's ring, again."), vec!["Frodo's", "ring", "again"]);
    }

    #[test]
    fn test_default_filter_standalone_ideograph() {
        let filter = SegmentFilter::new();
        assert!(filter.is_complete_word_match("李走了。", "李", 0, 3));
        assert!(!filter.is_complete_word_match("李子很甜", "李", 0, 3));
        assert!(!filter.is_complete_word_match("at the hotel", "h", 7, 8));
        assert!(filter.is_complete_word_match("plan A works", "A", 5, 6));
    }

    #[test]
    fn test_should_apply_filter_rules() {
        let config = MatchingConfig::default();
        assert!(should_apply_filter("李", None, &config));
        assert!(!should_apply_filter("李明", None, &config));
        assert!(should_apply_filter("李明", Some(true), &config));
        assert!(!should_apply_filter("李", Some(false), &config));

        let disabled = MatchingConfig::default().with_word_boundary_filter(false);
        assert!(!should_apply_filter("李", None, &disabled));
        assert!(should_apply_filter("李", Some(true), &disabled));

        let wider = MatchingConfig::default().with_short_pattern_threshold(2);
        assert!(should_apply_filter("李明", None, &wider));
    }

    struct WholeText;

    impl WordSegmenter for WholeText {
        fn segments(&self, text: &str) -> Vec<Segment> {
            vec![Segment { start: 0, end: text.len(), word_like: true }]
        }
    }

    #[test]
    fn test_custom_segmenter() {
        let filter = SegmentFilter::with_segmenter(WholeText);
        assert!(filter.is_complete_word_match("李", "李", 0, 3));
        assert!(!filter.is_complete_word_match("李子", "李", 0, 3));
    }
}
