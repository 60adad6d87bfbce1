//! Page-bound draw commands and the cursor that places them.
//!
//! Layout code never talks to the PDF backend directly. It writes
//! [`DrawCommand`]s into a [`Canvas`], which owns the page list, the page
//! template repeated on every new page, and a single drawing cursor.

use crate::layout::row::CELL_PADDING_MM;
use crate::layout::text::PT_TO_MM;
use crate::layout::{Align, FontSpec, PageGeometry, TextMeasurer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor(0, 0, 0);
    pub const WHITE: RgbColor = RgbColor(255, 255, 255);
    pub const GREY: RgbColor = RgbColor(100, 100, 100);
    pub const RULE: RgbColor = RgbColor(180, 180, 180);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text {
        x: f32,
        baseline: f32,
        font: FontSpec,
        color: RgbColor,
        text: String,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: RgbColor,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: RgbColor,
        thickness: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: RgbColor,
        thickness: f32,
    },
    /// Clinic logo, scaled into the box keeping its aspect ratio.
    Logo {
        x: f32,
        y: f32,
        max_width: f32,
        max_height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<DrawCommand>,
}

impl Page {
    /// All text runs on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: f32,
    pub y: f32,
}

/// Header and footer content stamped onto every page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTemplate {
    pub title: String,
    pub show_logo: bool,
    pub address_lines: Vec<String>,
    pub footer_center: String,
    pub footer_right: String,
}

/// Fill, border and text colour of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    pub fill: Option<RgbColor>,
    pub border: Option<RgbColor>,
    pub text: RgbColor,
}

impl CellStyle {
    pub const PLAIN: CellStyle = CellStyle {
        fill: None,
        border: None,
        text: RgbColor::BLACK,
    };

    pub const BODY: CellStyle = CellStyle {
        fill: None,
        border: Some(RgbColor::BLACK),
        text: RgbColor::BLACK,
    };
}

const LOGO_MAX_WIDTH_MM: f32 = 40.0;
const HEADER_TITLE_SIZE: f32 = 16.0;
const ADDRESS_FONT_SIZE: f32 = 9.0;
const ADDRESS_LINE_HEIGHT: f32 = 4.5;
const FOOTER_FONT_SIZE: f32 = 8.0;

pub struct Canvas {
    geometry: PageGeometry,
    template: PageTemplate,
    pages: Vec<Page>,
    cursor: Cursor,
}

impl Canvas {
    /// A canvas with its first page already started.
    pub fn new(geometry: PageGeometry, template: PageTemplate) -> Self {
        let mut canvas = Self {
            geometry,
            template,
            pages: Vec::new(),
            cursor: Cursor {
                x: geometry.margin_left,
                y: geometry.printable_top(),
            },
        };
        canvas.add_page();
        canvas
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_xy(&mut self, x: f32, y: f32) {
        self.cursor = Cursor { x, y };
    }

    /// Move down by `height` and back to the left margin.
    pub fn ln(&mut self, height: f32) {
        self.cursor.x = self.geometry.margin_left;
        self.cursor.y += height;
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Zero-based index of the page being drawn.
    pub fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    /// Start a new page, stamp the template and put the cursor at the top
    /// of the printable area.
    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.decorate_page();
        self.cursor = Cursor {
            x: self.geometry.margin_left,
            y: self.geometry.printable_top(),
        };
        log::debug!("page {} started", self.pages.len());
    }

    pub fn fits(&self, height: f32) -> bool {
        self.cursor.y + height <= self.geometry.printable_bottom()
    }

    pub fn at_page_top(&self) -> bool {
        self.cursor.y <= self.geometry.printable_top()
    }

    /// Break the page unless `height` still fits. A fresh page is never
    /// broken again. Returns whether a break happened.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.fits(height) || self.at_page_top() {
            return false;
        }
        self.add_page();
        true
    }

    pub fn push(&mut self, command: DrawCommand) {
        if let Some(page) = self.pages.last_mut() {
            page.commands.push(command);
        }
    }

    pub fn text(&mut self, x: f32, baseline: f32, font: FontSpec, color: RgbColor, text: &str) {
        if text.is_empty() {
            return;
        }
        self.push(DrawCommand::Text {
            x,
            baseline,
            font,
            color,
            text: text.to_string(),
        });
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: RgbColor) {
        self.push(DrawCommand::FillRect { x, y, width, height, color });
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: RgbColor) {
        self.push(DrawCommand::StrokeRect {
            x,
            y,
            width,
            height,
            color,
            thickness: 0.2,
        });
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: RgbColor, thickness: f32) {
        self.push(DrawCommand::Line { x1, y1, x2, y2, color, thickness });
    }

    /// Draw pre-wrapped `lines` in a box at the cursor and advance the
    /// cursor to the box's right edge.
    pub fn cell(
        &mut self,
        width: f32,
        height: f32,
        lines: &[String],
        font: FontSpec,
        line_height: f32,
        align: Align,
        style: CellStyle,
    ) {
        let Cursor { x, y } = self.cursor;
        if let Some(fill) = style.fill {
            self.fill_rect(x, y, width, height, fill);
        }
        if let Some(border) = style.border {
            self.stroke_rect(x, y, width, height, border);
        }

        let measurer = TextMeasurer::new(font);
        for (i, line) in lines.iter().enumerate() {
            let text_x = match align {
                Align::Left => x + CELL_PADDING_MM,
                Align::Center => x + (width - measurer.text_width(line)) / 2.0,
            };
            let baseline = baseline_in(y + i as f32 * line_height, line_height, font);
            self.text(text_x, baseline, font, style.text, line);
        }
        self.cursor.x = x + width;
    }

    /// Wrap `text` into a box of `width` and draw it line by line.
    ///
    /// The box is at least `min_height` tall. Afterwards the cursor sits at
    /// the left margin below the box, like a line feed.
    pub fn multi_cell(
        &mut self,
        width: f32,
        line_height: f32,
        min_height: f32,
        text: &str,
        font: FontSpec,
        align: Align,
        style: CellStyle,
    ) -> f32 {
        let wrapped = TextMeasurer::new(font).measure(text, crate::layout::row::inner_width(width));
        let height = (wrapped.line_count() as f32 * line_height).max(min_height);
        let y = self.cursor.y;
        self.cell(width, height, &wrapped.lines, font, line_height, align, style);
        self.set_xy(self.geometry.margin_left, y + height);
        height
    }

    /// Full-width coloured band with a left-aligned label.
    pub fn band(
        &mut self,
        label: &str,
        height: f32,
        font: FontSpec,
        fill: RgbColor,
        text: RgbColor,
    ) {
        let width = self.geometry.content_width();
        let style = CellStyle {
            fill: Some(fill),
            border: None,
            text,
        };
        self.set_xy(self.geometry.margin_left, self.cursor.y);
        self.cell(width, height, &[label.to_string()], font, height, Align::Left, style);
        self.ln(height);
    }

    fn decorate_page(&mut self) {
        let g = self.geometry;
        let template = self.template.clone();

        if template.show_logo {
            self.push(DrawCommand::Logo {
                x: g.margin_left,
                y: g.margin_top,
                max_width: LOGO_MAX_WIDTH_MM,
                max_height: g.header_height - 5.0,
            });
        }

        let title_font = FontSpec::bold(HEADER_TITLE_SIZE);
        let title_x = g.margin_left + LOGO_MAX_WIDTH_MM + 10.0;
        self.text(title_x, g.margin_top + 10.0, title_font, RgbColor::BLACK, &template.title);

        let address_font = FontSpec::regular(ADDRESS_FONT_SIZE);
        let measurer = TextMeasurer::new(address_font);
        for (i, line) in template.address_lines.iter().enumerate() {
            let x = g.right_edge() - measurer.text_width(line);
            let baseline = g.margin_top + 3.0 + i as f32 * ADDRESS_LINE_HEIGHT;
            self.text(x, baseline, address_font, RgbColor::BLACK, line);
        }

        let rule_y = g.printable_top() - 3.0;
        self.line(g.margin_left, rule_y, g.right_edge(), rule_y, RgbColor::RULE, 0.3);

        let footer_font = FontSpec::regular(FOOTER_FONT_SIZE);
        let measurer = TextMeasurer::new(footer_font);
        let footer_y = g.height - g.margin_bottom / 2.0;
        let center_width = measurer.text_width(&template.footer_center);
        let center_x = g.margin_left + (g.content_width() - center_width) / 2.0;
        self.text(center_x, footer_y, footer_font, RgbColor::GREY, &template.footer_center);
        let right_x = g.right_edge() - measurer.text_width(&template.footer_right);
        self.text(right_x, footer_y, footer_font, RgbColor::GREY, &template.footer_right);
    }
}

/// Baseline that centres a line of `font` vertically in a band of
/// `line_height` starting at `top`.
pub fn baseline_in(top: f32, line_height: f32, font: FontSpec) -> f32 {
    top + line_height / 2.0 + font.size_pt * PT_TO_MM * 0.35
}
