//! Paginated tables with repeated column headers.

use log::debug;

use super::canvas::{Canvas, CellStyle, RgbColor};
use crate::error::{Error, Result};
use crate::layout::{
    row_height, row_line_count, wrap_cells, ColumnPlan, ColumnSpec, FontSpec, TextMeasurer,
    WrappedText,
};
use crate::model::{LineItem, SlotAmount, TimeSlot};

/// Title of the supplement table.
pub const SUPPLEMENT_TITLE: &str = "NAHRUNGSERGÄNZUNGSMITTEL (NEM) VO";

#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub title_band_height: f32,
    pub title_font: FontSpec,
    pub header_line_height: f32,
    pub header_font: FontSpec,
    pub body_line_height: f32,
    pub body_font: FontSpec,
    pub brand: RgbColor,
    pub gap_after: f32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            title_band_height: 8.0,
            title_font: FontSpec::bold(12.0),
            header_line_height: 5.0,
            header_font: FontSpec::bold(9.0),
            body_line_height: 6.0,
            body_font: FontSpec::regular(9.0),
            brand: RgbColor(38, 96, 65),
            gap_after: 4.0,
        }
    }
}

/// A titled table ready to render. The last column is the free-text column.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub title: String,
    pub plan: ColumnPlan,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    AwaitingHeader,
    RenderingRows,
    PageBreakPending,
    Done,
}

/// Where one body row landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowPlacement {
    pub page: usize,
    pub top: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableReport {
    pub rows: Vec<RowPlacement>,
    pub page_breaks: usize,
}

pub struct TableRenderer {
    style: TableStyle,
}

impl TableRenderer {
    pub fn new(style: TableStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    /// Height of a body row of `table`.
    pub fn body_row_height(&self, plan: &ColumnPlan, cells: &[String]) -> f32 {
        let measurer = TextMeasurer::new(self.style.body_font);
        row_height(&measurer, cells, self.style.body_line_height, &plan.widths())
    }

    pub fn header_height(&self, plan: &ColumnPlan) -> f32 {
        let measurer = TextMeasurer::new(self.style.header_font);
        row_height(&measurer, &plan.labels(), self.style.header_line_height, &plan.widths())
    }

    /// Render `table` starting at the canvas cursor.
    ///
    /// The title band, the column header and the first row are kept together.
    /// When a row does not fit, the page breaks and the column header is
    /// repeated before the row.
    pub fn render(&self, canvas: &mut Canvas, table: &TableBlock) -> Result<TableReport> {
        if table.rows.is_empty() {
            return Err(Error::EmptyTable(table.title.clone()));
        }
        if let Some(row) = table.rows.iter().find(|row| row.len() != table.plan.len()) {
            return Err(Error::Configuration(format!(
                "row has {} cells, table \"{}\" has {} columns",
                row.len(),
                table.title,
                table.plan.len()
            )));
        }

        let mut report = TableReport::default();
        let mut state = TableState::AwaitingHeader;
        let mut next = 0;
        let mut rows_on_page = 0;

        loop {
            state = match state {
                TableState::AwaitingHeader => {
                    let needed = self.style.title_band_height
                        + self.header_height(&table.plan)
                        + self.body_row_height(&table.plan, &table.rows[0]);
                    if canvas.ensure_space(needed) {
                        report.page_breaks += 1;
                    }
                    canvas.band(
                        &table.title,
                        self.style.title_band_height,
                        self.style.title_font,
                        self.style.brand,
                        RgbColor::WHITE,
                    );
                    self.draw_header(canvas, &table.plan);
                    TableState::RenderingRows
                }
                TableState::RenderingRows => match table.rows.get(next) {
                    None => TableState::Done,
                    Some(cells) => {
                        let height = self.body_row_height(&table.plan, cells);
                        if rows_on_page > 0 && !canvas.fits(height) {
                            TableState::PageBreakPending
                        } else if !canvas.fits(height) {
                            // Taller than the free page: continue it on the next pages
                            self.draw_split_row(canvas, &table.plan, cells, &mut report);
                            rows_on_page = 1;
                            next += 1;
                            TableState::RenderingRows
                        } else {
                            let top = canvas.cursor().y;
                            self.draw_row(canvas, &table.plan, cells, height);
                            report.rows.push(RowPlacement {
                                page: canvas.page_index(),
                                top,
                                height,
                            });
                            rows_on_page += 1;
                            next += 1;
                            TableState::RenderingRows
                        }
                    }
                },
                TableState::PageBreakPending => {
                    canvas.add_page();
                    report.page_breaks += 1;
                    rows_on_page = 0;
                    self.draw_header(canvas, &table.plan);
                    TableState::RenderingRows
                }
                TableState::Done => break,
            };
        }

        canvas.ln(self.style.gap_after);
        debug!(
            "table \"{}\": {} rows, {} page breaks",
            table.title,
            report.rows.len(),
            report.page_breaks
        );
        Ok(report)
    }

    fn draw_header(&self, canvas: &mut Canvas, plan: &ColumnPlan) {
        let measurer = TextMeasurer::new(self.style.header_font);
        let wrapped = wrap_cells(&measurer, &plan.labels(), &plan.widths());
        let height = self.header_height(plan);
        let style = CellStyle {
            fill: Some(self.style.brand),
            border: Some(RgbColor::WHITE),
            text: RgbColor::WHITE,
        };
        let left = canvas.geometry().margin_left;
        let top = canvas.cursor().y;
        canvas.set_xy(left, top);
        for (column, text) in plan.columns().iter().zip(&wrapped) {
            canvas.cell(
                column.width,
                height,
                &text.lines,
                self.style.header_font,
                self.style.header_line_height,
                column.align,
                style,
            );
        }
        canvas.ln(height);
    }

    fn draw_row(&self, canvas: &mut Canvas, plan: &ColumnPlan, cells: &[String], height: f32) {
        let measurer = TextMeasurer::new(self.style.body_font);
        let wrapped = wrap_cells(&measurer, cells, &plan.widths());
        let left = canvas.geometry().margin_left;
        let top = canvas.cursor().y;
        canvas.set_xy(left, top);

        let last = plan.len() - 1;
        for (i, column) in plan.columns().iter().enumerate() {
            if i == last {
                // Multi-line cell moves the cursor to the next line
                let x = canvas.cursor().x;
                canvas.multi_cell(
                    column.width,
                    self.style.body_line_height,
                    height,
                    &cells[i],
                    self.style.body_font,
                    column.align,
                    CellStyle::BODY,
                );
                canvas.set_xy(x + column.width, top);
            } else {
                canvas.cell(
                    column.width,
                    height,
                    &wrapped[i].lines,
                    self.style.body_font,
                    self.style.body_line_height,
                    column.align,
                    CellStyle::BODY,
                );
            }
        }
        canvas.ln(height);
    }

    /// Draw a row that does not fit on a fresh page in slices of whole lines.
    ///
    /// Each slice fills the rest of the page; the column header is repeated
    /// on every continuation page. Adds one placement per slice.
    fn draw_split_row(
        &self,
        canvas: &mut Canvas,
        plan: &ColumnPlan,
        cells: &[String],
        report: &mut TableReport,
    ) {
        let measurer = TextMeasurer::new(self.style.body_font);
        let wrapped = wrap_cells(&measurer, cells, &plan.widths());
        let total = row_line_count(&wrapped);

        let mut start = 0;
        let mut slices = 0;
        while start < total {
            if slices > 0 || self.free_lines(canvas) == 0 {
                canvas.add_page();
                report.page_breaks += 1;
                self.draw_header(canvas, plan);
            }
            let count = self.free_lines(canvas).max(1).min(total - start);
            report
                .rows
                .push(self.draw_row_slice(canvas, plan, &wrapped, start, count));
            start += count;
            slices += 1;
        }
        debug!("row of {} lines split into {} slices", total, slices);
    }

    /// Whole body lines left above the printable bottom.
    fn free_lines(&self, canvas: &Canvas) -> usize {
        let free = canvas.geometry().printable_bottom() - canvas.cursor().y;
        ((free + 1e-3) / self.style.body_line_height).floor().max(0.0) as usize
    }

    fn draw_row_slice(
        &self,
        canvas: &mut Canvas,
        plan: &ColumnPlan,
        wrapped: &[WrappedText],
        start: usize,
        count: usize,
    ) -> RowPlacement {
        let height = count as f32 * self.style.body_line_height;
        let left = canvas.geometry().margin_left;
        let top = canvas.cursor().y;
        canvas.set_xy(left, top);
        for (column, text) in plan.columns().iter().zip(wrapped) {
            let end = (start + count).min(text.lines.len());
            let lines = text.lines.get(start..end).unwrap_or(&[]);
            canvas.cell(
                column.width,
                height,
                lines,
                self.style.body_font,
                self.style.body_line_height,
                column.align,
                CellStyle::BODY,
            );
        }
        canvas.ln(height);
        RowPlacement {
            page: canvas.page_index(),
            top,
            height,
        }
    }
}

// ============================================================================
// Supplement Table
// ============================================================================

pub fn supplement_plan(content_width: f32) -> Result<ColumnPlan> {
    let mut specs = vec![
        ColumnSpec::fixed("Supplement", 50.0),
        ColumnSpec::fixed("Gesamt", 20.0).centered(),
        ColumnSpec::fixed("Darreichungsform", 35.0).centered(),
        ColumnSpec::fixed("Pro Einnahme", 20.0).centered(),
    ];
    specs.extend(
        TimeSlot::ALL
            .iter()
            .map(|slot| ColumnSpec::fixed(slot.label(), 18.0).centered()),
    );
    specs.push(ColumnSpec::flex("Kommentar"));
    ColumnPlan::new(content_width, specs)
}

/// `"2x"`, `"1/2x"`, or empty for an unused slot.
pub fn slot_cell(amount: Option<SlotAmount>) -> String {
    amount
        .map(|a| format!("{}x", a.code()))
        .unwrap_or_default()
}

pub fn supplement_row(item: &LineItem) -> Vec<String> {
    let mut cells = vec![
        item.name.clone(),
        format!("{} M", item.total_dose),
        item.delivery_form.clone(),
        item.per_intake.clone(),
    ];
    cells.extend(
        TimeSlot::ALL
            .iter()
            .map(|slot| slot_cell(item.schedule.get(*slot))),
    );
    cells.push(item.comment.clone());
    cells
}

/// The supplement table over the active items. May have no rows.
pub fn supplement_table(items: &[LineItem], content_width: f32) -> Result<TableBlock> {
    Ok(TableBlock {
        title: SUPPLEMENT_TITLE.to_string(),
        plan: supplement_plan(content_width)?,
        rows: items
            .iter()
            .filter(|item| item.is_active())
            .map(supplement_row)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PageGeometry;
    use crate::model::Schedule;
    use crate::render::canvas::PageTemplate;

    fn canvas() -> Canvas {
        Canvas::new(
            PageGeometry::a4_landscape(),
            PageTemplate {
                title: "THERAPIEKONZEPT".into(),
                show_logo: false,
                address_lines: vec![],
                footer_center: String::new(),
                footer_right: String::new(),
            },
        )
    }

    /// Band 10, header 10, rows 7: the printable area (35..195) holds
    /// exactly 20 rows below title and header on the first page.
    fn grid_style() -> TableStyle {
        TableStyle {
            title_band_height: 10.0,
            header_line_height: 10.0,
            body_line_height: 7.0,
            ..TableStyle::default()
        }
    }

    fn short_plan() -> ColumnPlan {
        ColumnPlan::new(
            277.0,
            vec![
                ColumnSpec::fixed("Name", 100.0),
                ColumnSpec::fixed("Menge", 77.0).centered(),
                ColumnSpec::flex("Kommentar"),
            ],
        )
        .unwrap()
    }

    fn rows(n: usize) -> Vec<Vec<String>> {
        (0..n)
            .map(|i| vec![format!("Zeile {}", i), "1".into(), String::new()])
            .collect()
    }

    fn item(id: &str, active: bool) -> LineItem {
        let mut schedule = Schedule::default();
        if active {
            schedule.morning = Some(SlotAmount::Two);
            schedule.evening = Some(SlotAmount::Half);
        }
        LineItem {
            catalog_id: id.into(),
            name: format!("Supplement {}", id),
            total_dose: 6,
            delivery_form: "Kapseln".into(),
            per_intake: "1x täglich".into(),
            schedule,
            comment: String::new(),
        }
    }

    #[test]
    fn test_empty_table_is_an_error() {
        let renderer = TableRenderer::new(TableStyle::default());
        let table = TableBlock {
            title: SUPPLEMENT_TITLE.into(),
            plan: short_plan(),
            rows: vec![],
        };
        let mut canvas = canvas();
        let err = renderer.render(&mut canvas, &table).unwrap_err();
        assert!(matches!(err, Error::EmptyTable(_)));
        assert_eq!(canvas.page_count(), 1);
    }

    #[test]
    fn test_wrong_cell_count_is_rejected() {
        let renderer = TableRenderer::new(TableStyle::default());
        let table = TableBlock {
            title: "T".into(),
            plan: short_plan(),
            rows: vec![vec!["nur eine".into()]],
        };
        assert!(matches!(
            renderer.render(&mut canvas(), &table),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_rows_follow_each_other_without_gaps() {
        let renderer = TableRenderer::new(TableStyle::default());
        let mut table_rows = rows(3);
        table_rows[1][2] = "ein ziemlich langer Kommentar, der über mehrere Zeilen \
                            umbrechen muss, damit die Zeile höher wird als die anderen"
            .into();
        let table = TableBlock {
            title: "T".into(),
            plan: short_plan(),
            rows: table_rows,
        };
        let mut canvas = canvas();
        let report = renderer.render(&mut canvas, &table).unwrap();

        assert!(report.rows[1].height > report.rows[0].height);
        for pair in report.rows.windows(2) {
            assert_eq!(pair[0].top + pair[0].height, pair[1].top);
        }
        let last = report.rows[2];
        assert_eq!(
            canvas.cursor().y,
            last.top + last.height + renderer.style().gap_after
        );
        assert_eq!(canvas.cursor().x, 10.0);
    }

    #[test]
    fn test_exactly_full_page_does_not_break() {
        let renderer = TableRenderer::new(grid_style());
        let table = TableBlock {
            title: "T".into(),
            plan: short_plan(),
            rows: rows(20),
        };
        let mut canvas = canvas();
        let report = renderer.render(&mut canvas, &table).unwrap();
        assert_eq!(report.page_breaks, 0);
        assert_eq!(canvas.page_count(), 1);
        let last = report.rows[19];
        assert_eq!(last.top + last.height, 195.0);
    }

    #[test]
    fn test_overflow_row_moves_to_next_page_with_header() {
        let renderer = TableRenderer::new(grid_style());
        let table = TableBlock {
            title: "T".into(),
            plan: short_plan(),
            rows: rows(21),
        };
        let mut canvas = canvas();
        let report = renderer.render(&mut canvas, &table).unwrap();

        assert_eq!(report.page_breaks, 1);
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(report.rows[19].page, 0);
        let moved = report.rows[20];
        assert_eq!(moved.page, 1);
        // Header repeated above the moved row, title band not repeated
        assert_eq!(moved.top, 35.0 + 10.0);
        let second: Vec<_> = canvas.pages()[1].texts().collect();
        assert!(second.contains(&"Kommentar"));
        assert!(second.contains(&"Zeile 20"));
        assert!(!second.contains(&"T"));
    }

    #[test]
    fn test_title_band_kept_with_first_row() {
        let renderer = TableRenderer::new(grid_style());
        let table = TableBlock {
            title: "T".into(),
            plan: short_plan(),
            rows: rows(1),
        };
        let mut canvas = canvas();
        canvas.set_xy(10.0, 170.0);
        let report = renderer.render(&mut canvas, &table).unwrap();
        assert_eq!(report.page_breaks, 1);
        assert_eq!(report.rows[0].page, 1);
        assert!(canvas.pages()[1].texts().any(|t| t == "T"));
    }

    #[test]
    fn test_row_taller_than_page_continues_on_next_pages() {
        let mut items = vec![item("S001", true), item("S002", true), item("S003", true)];
        items[1].comment = "Einnahme nach Rücksprache ".repeat(120);
        let table = supplement_table(&items, 277.0).unwrap();
        let renderer = TableRenderer::new(TableStyle::default());
        let mut canvas = canvas();
        let report = renderer.render(&mut canvas, &table).unwrap();

        let bottom = canvas.geometry().printable_bottom();
        for placement in &report.rows {
            assert!(
                placement.top + placement.height <= bottom + 1e-3,
                "row on page {} ends at {}",
                placement.page,
                placement.top + placement.height
            );
        }
        assert!(report.rows.len() > 3);
        assert_eq!(report.page_breaks, canvas.page_count() - 1);

        // No comment text lost, header on every page
        let mentions: usize = canvas
            .pages()
            .iter()
            .flat_map(|page| page.texts())
            .map(|text| text.matches("Rücksprache").count())
            .sum();
        assert_eq!(mentions, 120);
        for page in canvas.pages() {
            assert!(page.texts().any(|t| t == "Kommentar"));
        }
        let last = report.rows.last().unwrap();
        assert!(canvas.pages()[last.page].texts().any(|t| t == "Supplement S003"));
    }

    #[test]
    fn test_supplement_rows_skip_inactive_items() {
        let items = vec![item("S001", true), item("S002", false), item("S003", true)];
        let table = supplement_table(&items, 277.0).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], "6 M");
        assert_eq!(table.rows[0][5], "2x");
        assert_eq!(table.rows[0][7], "1/2x");
        assert_eq!(table.rows[0][4], "");
        assert_eq!(table.plan.labels().last().map(String::as_str), Some("Kommentar"));
    }

    #[test]
    fn test_all_inactive_yields_empty_table_error() {
        let items = vec![item("S001", false)];
        let table = supplement_table(&items, 277.0).unwrap();
        let err = TableRenderer::new(TableStyle::default())
            .render(&mut canvas(), &table)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyTable(title) if title == SUPPLEMENT_TITLE));
    }
}
