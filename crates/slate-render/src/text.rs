//! Text measurement and greedy word wrapping for note bodies.

/// Measures rendered text width. Backends with real font metrics implement
/// this; the default is a fixed-advance approximation.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Fixed-advance metrics: every character advances the same fraction of the
/// font size. Close enough for note layout without a font stack.
#[derive(Debug, Clone, Copy)]
pub struct CharMetrics {
    /// Advance per character, in ems.
    pub advance: f64,
}

impl Default for CharMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for CharMetrics {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * self.advance * font_size
    }
}

/// Greedy word wrap.
///
/// Words are packed onto a line until the next one would overflow
/// `max_width`. The first word of a line is always placed even when it
/// alone overflows, so an over-long word occupies its own line instead of
/// cascading empty lines. Explicit newlines in the input are honored.
pub fn wrap_text(
    measure: &dyn TextMeasure,
    text: &str,
    font_size: f64,
    max_width: f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut words = paragraph.split_whitespace();
        let Some(first) = words.next() else {
            lines.push(String::new());
            continue;
        };
        let mut line = first.to_string();
        for word in words {
            let candidate = format!("{} {}", line, word);
            if measure.text_width(&candidate, font_size) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            }
        }
        lines.push(line);
    }
    lines
}
