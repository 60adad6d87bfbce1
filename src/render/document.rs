//! The whole therapy-plan document: header, patient summary and blocks.

use ::image::DynamicImage;
use chrono::NaiveDate;
use log::info;

use super::canvas::{baseline_in, Canvas, CellStyle, Page, PageTemplate, RgbColor};
use super::pdf;
use super::section::{SectionComposer, SectionStyle};
use super::table::{supplement_table, TableBlock, TableRenderer, TableReport, TableStyle};
use crate::config::ClinicProfile;
use crate::error::{Error, Result};
use crate::layout::{
    truncate_chars, Align, ColumnPlan, ColumnSpec, FontSpec, PageGeometry, TextMeasurer,
};
use crate::model::{LineItem, PatientRecord};
use crate::sections::{Section, SectionBundle, SectionDomain};

pub const DOCUMENT_TITLE: &str = "THERAPIEKONZEPT";

/// Allergies are cut to this many characters in the summary grid.
pub const ALLERGY_BUDGET: usize = 40;

const SUMMARY_LINE_HEIGHT: f32 = 6.0;
const SUMMARY_LABEL_FONT: FontSpec = FontSpec::bold(10.0);
const SUMMARY_VALUE_FONT: FontSpec = FontSpec::regular(10.0);
const DIAGNOSES_LINE_HEIGHT: f32 = 5.0;

/// A titled group of checklist sections.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionBlock {
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Table(TableBlock),
    Sections(SectionBlock),
}

/// The laid-out pages before painting.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub pages: Vec<Page>,
    pub tables: Vec<TableReport>,
}

/// Supplement table followed by the three checklist blocks.
///
/// The follow-up section closes the notes block.
pub fn standard_blocks(
    patient: &PatientRecord,
    items: &[LineItem],
    sections: &SectionBundle,
    content_width: f32,
) -> Result<Vec<Block>> {
    let mut blocks = vec![Block::Table(supplement_table(items, content_width)?)];
    for domain in SectionDomain::ALL {
        let schema = domain.schema();
        let mut block = SectionBlock {
            title: schema.title.to_string(),
            sections: schema.sections(sections.get(domain)),
        };
        if domain == SectionDomain::Notes {
            block.sections.push(patient.follow_up.to_section());
        }
        blocks.push(Block::Sections(block));
    }
    Ok(blocks)
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_default()
}

fn format_weight(weight: Option<f64>) -> String {
    match weight {
        Some(kg) if kg.fract() == 0.0 => format!("{:.0} kg", kg),
        Some(kg) => format!("{:.1} kg", kg),
        None => String::new(),
    }
}

/// Label/value cells of the two summary grid rows.
pub fn summary_rows(patient: &PatientRecord) -> [Vec<String>; 2] {
    [
        vec![
            "Geburtsdatum:".to_string(),
            format_date(patient.birth_date),
            "Geschlecht:".to_string(),
            patient.sex.map(|s| s.code().to_string()).unwrap_or_default(),
            "Größe:".to_string(),
            patient.height_cm.map(|cm| format!("{} cm", cm)).unwrap_or_default(),
            "Gewicht:".to_string(),
            format_weight(patient.weight_kg),
        ],
        vec![
            "Therapiebeginn:".to_string(),
            format_date(patient.therapy_start),
            "Dauer:".to_string(),
            format!("{} Monate", patient.duration_months),
            "TW besprochen:".to_string(),
            if patient.blood_work_discussed { "Ja" } else { "Nein" }.to_string(),
            "Allergien:".to_string(),
            truncate_chars(&patient.allergies, ALLERGY_BUDGET),
        ],
    ]
}

fn summary_plan(content_width: f32) -> Result<ColumnPlan> {
    ColumnPlan::new(
        content_width,
        vec![
            ColumnSpec::fixed("", 36.0),
            ColumnSpec::fixed("", 26.0),
            ColumnSpec::fixed("", 26.0),
            ColumnSpec::fixed("", 22.0),
            ColumnSpec::fixed("", 36.0),
            ColumnSpec::fixed("", 20.0),
            ColumnSpec::fixed("", 36.0),
            ColumnSpec::flex(""),
        ],
    )
}

pub struct DocumentBuilder {
    geometry: PageGeometry,
    clinic: ClinicProfile,
    logo: Option<DynamicImage>,
    document_id: String,
    table_style: TableStyle,
    section_style: SectionStyle,
}

impl DocumentBuilder {
    pub fn new(clinic: ClinicProfile, document_id: &str) -> Self {
        let table_style = TableStyle {
            brand: clinic.brand(),
            ..TableStyle::default()
        };
        let section_style = SectionStyle {
            heading_color: clinic.brand(),
            ..SectionStyle::default()
        };
        Self {
            geometry: PageGeometry::a4_landscape(),
            clinic,
            logo: None,
            document_id: document_id.to_string(),
            table_style,
            section_style,
        }
    }

    pub fn with_logo(mut self, logo: Option<DynamicImage>) -> Self {
        self.logo = logo;
        self
    }

    pub fn with_table_style(mut self, style: TableStyle) -> Self {
        self.table_style = style;
        self
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn template(&self) -> PageTemplate {
        PageTemplate {
            title: DOCUMENT_TITLE.to_string(),
            show_logo: self.logo.is_some(),
            address_lines: self.clinic.address_lines.clone(),
            footer_center: self.clinic.website.clone(),
            footer_right: format!("Dokument-ID: {}", self.document_id),
        }
    }

    /// Lay out the patient summary and `blocks` onto pages.
    ///
    /// Fails with [`Error::EmptyTable`] if a table block has no rows; the
    /// caller decides whether to drop the block and retry.
    pub fn compose(&self, patient: &PatientRecord, blocks: &[Block]) -> Result<Composition> {
        let mut canvas = Canvas::new(self.geometry, self.template());
        self.draw_summary(&mut canvas, patient)?;

        let tables = TableRenderer::new(self.table_style.clone());
        let composer = SectionComposer::new(self.section_style.clone());
        let mut reports = Vec::new();

        for block in blocks {
            match block {
                Block::Table(table) => reports.push(tables.render(&mut canvas, table)?),
                Block::Sections(group) => {
                    let first_heading =
                        composer.style().heading_height + composer.style().line_height;
                    canvas.ensure_space(self.table_style.title_band_height + first_heading);
                    canvas.band(
                        &group.title,
                        self.table_style.title_band_height,
                        self.table_style.title_font,
                        self.table_style.brand,
                        RgbColor::WHITE,
                    );
                    canvas.ln(1.0);
                    for section in &group.sections {
                        composer.render(&mut canvas, section);
                    }
                }
            }
        }

        info!(
            "Composed {} page(s) for {}",
            canvas.page_count(),
            patient.name
        );
        Ok(Composition {
            pages: canvas.into_pages(),
            tables: reports,
        })
    }

    /// Compose and paint to PDF bytes.
    pub fn build(&self, patient: &PatientRecord, blocks: &[Block]) -> Result<Vec<u8>> {
        let composition = self.compose(patient, blocks)?;
        pdf::paint(
            &composition.pages,
            &self.geometry,
            DOCUMENT_TITLE,
            self.logo.as_ref(),
        )
    }

    fn draw_summary(&self, canvas: &mut Canvas, patient: &PatientRecord) -> Result<()> {
        let g = self.geometry;

        // Name line
        let top = canvas.cursor().y;
        let label = "Vor- und Nachname:";
        canvas.text(
            g.margin_left,
            baseline_in(top, SUMMARY_LINE_HEIGHT, SUMMARY_LABEL_FONT),
            SUMMARY_LABEL_FONT,
            RgbColor::BLACK,
            label,
        );
        canvas.text(
            g.margin_left + 36.0,
            baseline_in(top, SUMMARY_LINE_HEIGHT, SUMMARY_VALUE_FONT),
            SUMMARY_VALUE_FONT,
            RgbColor::BLACK,
            &patient.name,
        );
        canvas.ln(SUMMARY_LINE_HEIGHT + 2.0);

        // Label/value grid, one line per cell
        let plan = summary_plan(g.content_width())?;
        for row in summary_rows(patient) {
            let top = canvas.cursor().y;
            canvas.set_xy(g.margin_left, top);
            for (i, (column, text)) in plan.columns().iter().zip(&row).enumerate() {
                let font = if i % 2 == 0 { SUMMARY_LABEL_FONT } else { SUMMARY_VALUE_FONT };
                canvas.cell(
                    column.width,
                    SUMMARY_LINE_HEIGHT,
                    std::slice::from_ref(text),
                    font,
                    SUMMARY_LINE_HEIGHT,
                    Align::Left,
                    CellStyle::PLAIN,
                );
            }
            canvas.ln(SUMMARY_LINE_HEIGHT);
        }
        canvas.ln(2.0);

        // Diagnoses wrap over the full width
        let top = canvas.cursor().y;
        canvas.text(
            g.margin_left,
            baseline_in(top, SUMMARY_LINE_HEIGHT, SUMMARY_LABEL_FONT),
            SUMMARY_LABEL_FONT,
            RgbColor::BLACK,
            "Diagnosen:",
        );
        canvas.ln(SUMMARY_LINE_HEIGHT);
        let diagnoses = if patient.diagnoses.trim().is_empty() {
            "-"
        } else {
            patient.diagnoses.trim()
        };
        let wrapped = TextMeasurer::new(SUMMARY_VALUE_FONT).measure(diagnoses, g.content_width());
        for line in &wrapped.lines {
            canvas.ensure_space(DIAGNOSES_LINE_HEIGHT);
            let top = canvas.cursor().y;
            canvas.text(
                g.margin_left,
                baseline_in(top, DIAGNOSES_LINE_HEIGHT, SUMMARY_VALUE_FONT),
                SUMMARY_VALUE_FONT,
                RgbColor::BLACK,
                line,
            );
            canvas.ln(DIAGNOSES_LINE_HEIGHT);
        }
        canvas.ln(3.0);
        Ok(())
    }
}

/// Remove the table block titled `title`.
pub fn drop_table(blocks: Vec<Block>, title: &str) -> Vec<Block> {
    blocks
        .into_iter()
        .filter(|block| !matches!(block, Block::Table(table) if table.title == title))
        .collect()
}
