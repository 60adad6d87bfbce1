//! Composition of the therapy-plan document and its PDF backend.

pub mod canvas;
pub mod document;
pub mod pdf;
pub mod section;
pub mod table;

pub use canvas::{Canvas, DrawCommand, Page, PageTemplate, RgbColor};
pub use document::{standard_blocks, Block, Composition, DocumentBuilder, SectionBlock};
pub use section::{SectionComposer, SectionStyle};
pub use table::{TableBlock, TableRenderer, TableReport, TableState, TableStyle};
