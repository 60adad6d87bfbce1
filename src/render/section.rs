//! Bulleted checklist sections.

use super::canvas::{baseline_in, Canvas, RgbColor};
use crate::layout::{FontSpec, TextMeasurer};
use crate::sections::{Section, SectionEntry, SectionValue};

/// Shown in place of a section without truthy entries.
pub const EMPTY_PLACEHOLDER: &str = "Keine Angaben";
pub const BULLET: &str = "•";

#[derive(Debug, Clone, PartialEq)]
pub struct SectionStyle {
    pub heading_font: FontSpec,
    pub heading_height: f32,
    pub heading_color: RgbColor,
    pub body_font: FontSpec,
    pub line_height: f32,
    pub indent: f32,
    pub gap_after: f32,
}

impl Default for SectionStyle {
    fn default() -> Self {
        Self {
            heading_font: FontSpec::bold(11.0),
            heading_height: 7.0,
            heading_color: RgbColor(38, 96, 65),
            body_font: FontSpec::regular(9.0),
            line_height: 5.0,
            indent: 5.0,
            gap_after: 3.0,
        }
    }
}

/// Text of one bullet, or `None` when the entry is not rendered.
///
/// Flags render their label alone, text as `label: value`, and choices as
/// `label: a, b` in their stored order.
pub fn entry_line(entry: &SectionEntry) -> Option<String> {
    if !entry.value.is_truthy() {
        return None;
    }
    match &entry.value {
        SectionValue::Flag(_) => Some(entry.label.clone()),
        SectionValue::Text(text) => Some(format!("{}: {}", entry.label, text.trim())),
        SectionValue::Choices(values) => {
            let joined = values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("{}: {}", entry.label, joined))
        }
    }
}

/// Bullet texts of a section; the placeholder when nothing is set.
pub fn bullet_lines(section: &Section) -> Vec<String> {
    let lines: Vec<String> = section.entries.iter().filter_map(entry_line).collect();
    if lines.is_empty() {
        vec![EMPTY_PLACEHOLDER.to_string()]
    } else {
        lines
    }
}

pub struct SectionComposer {
    style: SectionStyle,
}

impl SectionComposer {
    pub fn new(style: SectionStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &SectionStyle {
        &self.style
    }

    /// Render the heading and bullets of `section` at the cursor.
    ///
    /// The heading never ends a page alone. A wrapped bullet stays on one
    /// page unless it is taller than a page. Returns the number of bullets.
    pub fn render(&self, canvas: &mut Canvas, section: &Section) -> usize {
        let geometry = *canvas.geometry();
        let text_width = geometry.content_width() - self.style.indent;
        let measurer = TextMeasurer::new(self.style.body_font);
        let bullets: Vec<Vec<String>> = bullet_lines(section)
            .iter()
            .map(|line| measurer.measure(line, text_width).lines)
            .collect();

        let first_height = bullets
            .first()
            .map_or(0.0, |lines| lines.len() as f32 * self.style.line_height);
        canvas.ensure_space(self.style.heading_height + first_height);
        self.draw_heading(canvas, &section.name);

        for lines in &bullets {
            let block =
                (lines.len() as f32 * self.style.line_height).min(geometry.printable_height());
            canvas.ensure_space(block);
            for (i, line) in lines.iter().enumerate() {
                canvas.ensure_space(self.style.line_height);
                let top = canvas.cursor().y;
                let baseline = baseline_in(top, self.style.line_height, self.style.body_font);
                if i == 0 {
                    canvas.text(
                        geometry.margin_left + 1.0,
                        baseline,
                        self.style.body_font,
                        RgbColor::BLACK,
                        BULLET,
                    );
                }
                canvas.text(
                    geometry.margin_left + self.style.indent,
                    baseline,
                    self.style.body_font,
                    RgbColor::BLACK,
                    line,
                );
                canvas.ln(self.style.line_height);
            }
        }
        canvas.ln(self.style.gap_after);
        bullets.len()
    }

    fn draw_heading(&self, canvas: &mut Canvas, name: &str) {
        let geometry = *canvas.geometry();
        let top = canvas.cursor().y;
        let baseline = baseline_in(top, self.style.heading_height, self.style.heading_font);
        canvas.text(
            geometry.margin_left,
            baseline,
            self.style.heading_font,
            self.style.heading_color,
            name,
        );
        let rule_y = top + self.style.heading_height - 0.5;
        canvas.line(
            geometry.margin_left,
            rule_y,
            geometry.right_edge(),
            rule_y,
            RgbColor::RULE,
            0.2,
        );
        canvas.ln(self.style.heading_height);
    }
}
