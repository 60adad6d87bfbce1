//! Geometry for the document: text measurement, row heights, column plans
//! and the page frame.

mod metrics;
pub mod columns;
pub mod page;
pub mod row;
pub mod text;

pub use columns::{Align, Column, ColumnPlan, ColumnSpec, ColumnWidth};
pub use page::PageGeometry;
pub use row::{row_height, row_line_count, wrap_cells};
pub use text::{truncate_chars, FontSpec, FontWeight, TextMeasurer, WrappedText};
