//! Script classification for chunk granularity.
//!
//! Wide scripts (CJK ideographs, kana, hangul) are paced per character; all
//! other text is paced per whitespace-delimited word.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WIDE_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{4E00}-\u{9FFF}\u{3400}-\u{4DBF}\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{AC00}-\u{D7AF}]")
        .unwrap()
});

/// True if `ch` belongs to a wide-script range.
pub fn is_wide_char(ch: char) -> bool {
    let mut buf = [0u8; 4];
    RE_WIDE_SCRIPT.is_match(ch.encode_utf8(&mut buf))
}

/// Fraction of characters in `sample` that fall in wide-script ranges.
pub fn wide_fraction(sample: &str) -> f32 {
    let total = sample.chars().count();
    if total == 0 {
        return 0.0;
    }
    let wide = RE_WIDE_SCRIPT.find_iter(sample).count();
    wide as f32 / total as f32
}

/// Classify the first `sample_chars` characters of `text`.
pub fn is_wide_script(text: &str, sample_chars: usize, threshold: f32) -> bool {
    let sample: String = text.chars().take(sample_chars).collect();
    wide_fraction(&sample) > threshold
}
