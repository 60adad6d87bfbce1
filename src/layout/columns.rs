//! Column plans: exact partitions of the content width.

use crate::error::{Error, Result};

/// Widths are snapped to this grid. Sums of grid multiples are exact in f32.
pub const WIDTH_GRID_MM: f32 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    Fixed(f32),
    /// Takes whatever the fixed columns leave over.
    Flex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub label: String,
    pub width: ColumnWidth,
    pub align: Align,
}

impl ColumnSpec {
    pub fn fixed(label: &str, width: f32) -> Self {
        Self {
            label: label.to_string(),
            width: ColumnWidth::Fixed(width),
            align: Align::Left,
        }
    }

    pub fn flex(label: &str) -> Self {
        Self {
            label: label.to_string(),
            width: ColumnWidth::Flex,
            align: Align::Left,
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: String,
    pub width: f32,
    pub align: Align,
}

/// Resolved column widths summing exactly to the content width.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    content_width: f32,
    columns: Vec<Column>,
}

impl ColumnPlan {
    /// Resolve `specs` against `content_width`.
    ///
    /// Fails when the fixed widths exceed the content width, when more than
    /// one column is flex, or when there is no flex column and the fixed
    /// widths do not fill the content width.
    pub fn new(content_width: f32, specs: Vec<ColumnSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::Configuration("plan has no columns".into()));
        }
        let content_ticks = exact_ticks(content_width).ok_or_else(|| {
            Error::Configuration(format!(
                "content width {} is not a multiple of {} mm",
                content_width, WIDTH_GRID_MM
            ))
        })?;

        let flex_count = specs
            .iter()
            .filter(|s| s.width == ColumnWidth::Flex)
            .count();
        if flex_count > 1 {
            return Err(Error::Configuration(format!(
                "{} flex columns, at most one allowed",
                flex_count
            )));
        }

        let mut fixed_ticks = 0i64;
        for spec in &specs {
            if let ColumnWidth::Fixed(width) = spec.width {
                if !width.is_finite() || width < 0.0 {
                    return Err(Error::Configuration(format!(
                        "column \"{}\" has invalid width {}",
                        spec.label, width
                    )));
                }
                fixed_ticks += snap_ticks(width);
            }
        }

        if fixed_ticks > content_ticks {
            return Err(Error::Configuration(format!(
                "fixed widths sum to {} mm, content width is {} mm",
                ticks_to_mm(fixed_ticks),
                content_width
            )));
        }
        if flex_count == 0 && fixed_ticks != content_ticks {
            return Err(Error::Configuration(format!(
                "fixed widths sum to {} mm without a flex column, content width is {} mm",
                ticks_to_mm(fixed_ticks),
                content_width
            )));
        }

        let flex_ticks = content_ticks - fixed_ticks;
        let columns = specs
            .into_iter()
            .map(|spec| {
                let ticks = match spec.width {
                    ColumnWidth::Fixed(width) => snap_ticks(width),
                    ColumnWidth::Flex => flex_ticks,
                };
                Column {
                    label: spec.label,
                    width: ticks_to_mm(ticks),
                    align: spec.align,
                }
            })
            .collect();

        Ok(Self { content_width, columns })
    }

    pub fn content_width(&self) -> f32 {
        self.content_width
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn widths(&self) -> Vec<f32> {
        self.columns.iter().map(|c| c.width).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    /// Left edge of every column, relative to the table's left edge.
    pub fn offsets(&self) -> Vec<f32> {
        let mut x = 0.0;
        self.columns
            .iter()
            .map(|c| {
                let left = x;
                x += c.width;
                left
            })
            .collect()
    }
}

fn snap_ticks(width: f32) -> i64 {
    (width / WIDTH_GRID_MM).round() as i64
}

fn exact_ticks(width: f32) -> Option<i64> {
    let ticks = width / WIDTH_GRID_MM;
    (width.is_finite() && width >= 0.0 && ticks.fract() == 0.0).then_some(ticks as i64)
}

fn ticks_to_mm(ticks: i64) -> f32 {
    ticks as f32 * WIDTH_GRID_MM
}
