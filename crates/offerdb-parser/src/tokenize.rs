//! Splits free text into numbers with the text around them.
//!
//! Numbers use a comma as decimal separator (`"1,5"`). A dot is never part of
//! a number, so `"1.5"` yields two numbers: `1` and `5`.

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:,[0-9]+)?").expect("valid regex"));

/// A number literal and the text between it and its neighbouring numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberContext<'a> {
    /// Text since the previous number ended (or the start of the input).
    pub prefix: &'a str,
    pub literal: &'a str,
    /// Text until the next number starts (or the end of the input).
    pub suffix: &'a str,
}

impl NumberContext<'_> {
    /// Numeric value of the literal, reading `,` as the decimal point.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.literal.replace(',', ".").parse().ok()
    }
}

/// Yields every number in `text`, in order.
pub fn tokenize(text: &str) -> impl Iterator<Item = NumberContext<'_>> {
    let spans: Vec<(usize, usize)> = NUMBER_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    (0..spans.len()).map(move |i| {
        let (start, end) = spans[i];
        let prefix_start = if i == 0 { 0 } else { spans[i - 1].1 };
        let suffix_end = spans.get(i + 1).map_or(text.len(), |next| next.0);
        NumberContext {
            prefix: &text[prefix_start..start],
            literal: &text[start..end],
            suffix: &text[end..suffix_end],
        }
    })
}
