//! Number extraction from estimator replies.

use std::sync::LazyLock;

use regex::Regex;

/// `a-b` with any dash the model might produce (hyphen, en, em, minus sign).
static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+)\s*[-–—−]\s*([0-9]+)").expect("static regex")
});

static SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]+\b").expect("static regex"));

/// Pull a calorie figure out of free text.
///
/// A range wins over a single number and yields the floor of its midpoint.
/// Otherwise the first standalone number is returned. `None` when the text
/// holds no number or it does not fit in `u32`.
pub fn extract_average_number(text: &str) -> Option<u32> {
    if let Some(caps) = RANGE.captures(text) {
        let low: u64 = caps[1].parse().ok()?;
        let high: u64 = caps[2].parse().ok()?;
        return u32::try_from((low + high) / 2).ok();
    }
    SINGLE.find(text)?.as_str().parse().ok()
}
