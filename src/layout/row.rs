//! Uniform row heights for table rows.

use super::text::{TextMeasurer, WrappedText};

/// Horizontal padding inside a cell, each side, in mm.
pub const CELL_PADDING_MM: f32 = 1.0;

/// Usable text width of a cell of `column_width` mm.
pub fn inner_width(column_width: f32) -> f32 {
    (column_width - 2.0 * CELL_PADDING_MM).max(0.0)
}

/// Wrap every cell of a row into its column.
pub fn wrap_cells(
    measurer: &TextMeasurer,
    cells: &[String],
    column_widths: &[f32],
) -> Vec<WrappedText> {
    cells
        .iter()
        .zip(column_widths)
        .map(|(text, width)| measurer.measure(text, inner_width(*width)))
        .collect()
}

/// Number of lines the tallest cell needs; at least 1.
pub fn row_line_count(wrapped: &[WrappedText]) -> usize {
    wrapped
        .iter()
        .map(WrappedText::line_count)
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Height of a row so that its tallest wrapped cell fits.
///
/// Always `line_height * k` with `k >= 1` equal to the largest line count
/// across the cells.
pub fn row_height(
    measurer: &TextMeasurer,
    cells: &[String],
    line_height: f32,
    column_widths: &[f32],
) -> f32 {
    let wrapped = wrap_cells(measurer, cells, column_widths);
    line_height * row_line_count(&wrapped) as f32
}
