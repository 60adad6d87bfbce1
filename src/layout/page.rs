//! Fixed page geometry. Coordinates run top-down from the page's top-left
//! corner, in mm.

/// A4 landscape dimensions in mm
pub const PAGE_WIDTH_MM: f32 = 297.0;
pub const PAGE_HEIGHT_MM: f32 = 210.0;

/// Margins
pub const MARGIN_SIDE_MM: f32 = 10.0;
pub const MARGIN_TOP_MM: f32 = 10.0;
pub const MARGIN_BOTTOM_MM: f32 = 15.0;

/// Space reserved below the top margin for the repeated page header
pub const PAGE_HEADER_MM: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub header_height: f32,
}

impl PageGeometry {
    pub const fn a4_landscape() -> Self {
        Self {
            width: PAGE_WIDTH_MM,
            height: PAGE_HEIGHT_MM,
            margin_left: MARGIN_SIDE_MM,
            margin_right: MARGIN_SIDE_MM,
            margin_top: MARGIN_TOP_MM,
            margin_bottom: MARGIN_BOTTOM_MM,
            header_height: PAGE_HEADER_MM,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// First y available to body content on every page.
    pub fn printable_top(&self) -> f32 {
        self.margin_top + self.header_height
    }

    /// Body content must end at or above this y.
    pub fn printable_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn printable_height(&self) -> f32 {
        self.printable_bottom() - self.printable_top()
    }

    pub fn right_edge(&self) -> f32 {
        self.width - self.margin_right
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4_landscape()
    }
}
