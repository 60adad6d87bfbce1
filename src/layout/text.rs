//! Text measurement and greedy word wrapping.
//!
//! The same [`TextMeasurer`] is used for the layout pass (row heights, page
//! breaks) and for the draw pass (alignment, wrapped cell lines), so wrapping
//! decisions always agree between the two.

use super::metrics;

/// Points to millimetres.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// Face and size of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub weight: FontWeight,
    pub size_pt: f32,
}

impl FontSpec {
    pub const fn regular(size_pt: f32) -> Self {
        Self { weight: FontWeight::Regular, size_pt }
    }

    pub const fn bold(size_pt: f32) -> Self {
        Self { weight: FontWeight::Bold, size_pt }
    }
}

/// Result of wrapping a string into a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedText {
    pub lines: Vec<String>,
}

impl WrappedText {
    /// Always at least 1.
    pub fn line_count(&self) -> usize {
        self.lines.len().max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMeasurer {
    font: FontSpec,
}

impl TextMeasurer {
    pub fn new(font: FontSpec) -> Self {
        Self { font }
    }

    pub fn font(&self) -> FontSpec {
        self.font
    }

    /// Width of `text` on a single line, in mm.
    pub fn text_width(&self, text: &str) -> f32 {
        self.units_to_mm(self.units(text))
    }

    /// Wrap `text` into lines no wider than `max_width` mm.
    ///
    /// Explicit newlines start a new line. A single word wider than the cell
    /// is kept whole on its own line and overflows horizontally.
    pub fn measure(&self, text: &str, max_width: f32) -> WrappedText {
        let max_units = self.mm_to_units(max_width.max(0.0));
        let space = self.units(" ");
        let mut lines = Vec::new();

        for paragraph in text.split('\n') {
            let paragraph = paragraph.trim_end_matches('\r');
            let mut current = String::new();
            let mut current_units = 0u32;

            for word in paragraph.split_whitespace() {
                let word_units = self.units(word);
                if current.is_empty() {
                    current.push_str(word);
                    current_units = word_units;
                } else if (current_units + space + word_units) as f32 <= max_units {
                    current.push(' ');
                    current.push_str(word);
                    current_units += space + word_units;
                } else {
                    lines.push(std::mem::take(&mut current));
                    current.push_str(word);
                    current_units = word_units;
                }
            }
            lines.push(current);
        }

        if lines.is_empty() {
            lines.push(String::new());
        }
        WrappedText { lines }
    }

    fn units(&self, text: &str) -> u32 {
        let bold = self.font.weight == FontWeight::Bold;
        text.chars()
            .map(|ch| metrics::char_width(ch, bold) as u32)
            .sum()
    }

    fn units_to_mm(&self, units: u32) -> f32 {
        units as f32 / 1000.0 * self.font.size_pt * PT_TO_MM
    }

    fn mm_to_units(&self, mm: f32) -> f32 {
        mm / (self.font.size_pt * PT_TO_MM) * 1000.0
    }
}

/// Cut `text` to at most `budget` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    const ELLIPSIS: &str = "...";
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let keep = budget.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
