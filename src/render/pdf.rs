// printpdf painter for composed pages
//
// Layout coordinates run top-down from the page's top edge; PDF user space
// runs bottom-up, so every y is flipped against the page height here.

use std::io::BufWriter;

use ::image::{DynamicImage, Rgba, RgbImage};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

use super::canvas::{DrawCommand, Page, RgbColor};
use crate::error::{Error, Result};
use crate::layout::{FontWeight, PageGeometry};

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Paint `pages` into a PDF and return its bytes.
pub fn paint(
    pages: &[Page],
    geometry: &PageGeometry,
    title: &str,
    logo: Option<&DynamicImage>,
) -> Result<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        title,
        Mm(geometry.width),
        Mm(geometry.height),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::Pdf(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::Pdf(e.to_string()))?,
    };

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(geometry.width), Mm(geometry.height), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        for command in &page.commands {
            paint_command(&layer, &fonts, geometry.height, command, logo);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(|e| Error::Pdf(e.to_string()))?;
    buf.into_inner().map_err(|e| Error::Pdf(e.to_string()))
}

fn color(c: RgbColor) -> Color {
    Color::Rgb(Rgb::new(
        c.0 as f32 / 255.0,
        c.1 as f32 / 255.0,
        c.2 as f32 / 255.0,
        None,
    ))
}

fn point(x: f32, y: f32, page_height: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(page_height - y)), false)
}

fn rect_points(x: f32, y: f32, width: f32, height: f32, page_height: f32) -> Vec<(Point, bool)> {
    vec![
        point(x, y, page_height),
        point(x + width, y, page_height),
        point(x + width, y + height, page_height),
        point(x, y + height, page_height),
    ]
}

fn paint_command(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    page_height: f32,
    command: &DrawCommand,
    logo: Option<&DynamicImage>,
) {
    match command {
        DrawCommand::Text { x, baseline, font, color: c, text } => {
            let face = match font.weight {
                FontWeight::Regular => &fonts.regular,
                FontWeight::Bold => &fonts.bold,
            };
            layer.set_fill_color(color(*c));
            layer.use_text(text.as_str(), font.size_pt, Mm(*x), Mm(page_height - baseline), face);
        }
        DrawCommand::FillRect { x, y, width, height, color: c } => {
            layer.set_fill_color(color(*c));
            layer.add_polygon(Polygon {
                rings: vec![rect_points(*x, *y, *width, *height, page_height)],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        DrawCommand::StrokeRect { x, y, width, height, color: c, thickness } => {
            layer.set_outline_color(color(*c));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: rect_points(*x, *y, *width, *height, page_height),
                is_closed: true,
            });
        }
        DrawCommand::Line { x1, y1, x2, y2, color: c, thickness } => {
            layer.set_outline_color(color(*c));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![point(*x1, *y1, page_height), point(*x2, *y2, page_height)],
                is_closed: false,
            });
        }
        DrawCommand::Logo { x, y, max_width, max_height } => {
            if let Some(image) = logo {
                embed_logo(layer, image, *x, *y, *max_width, *max_height, page_height);
            }
        }
    }
}

/// Place the logo top-left aligned in its box, flattened onto white.
fn embed_logo(
    layer: &PdfLayerReference,
    logo: &DynamicImage,
    left: f32,
    top: f32,
    max_width_mm: f32,
    max_height_mm: f32,
    page_height: f32,
) {
    let rgba_image = logo.to_rgba8();
    let (width_px, height_px) = rgba_image.dimensions();
    if width_px == 0 || height_px == 0 {
        return;
    }

    let mut rgb_image = RgbImage::new(width_px, height_px);
    for (x, y, pixel) in rgba_image.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |channel: u8| (channel as f32 * alpha + 255.0 * (1.0 - alpha)) as u8;
        rgb_image.put_pixel(x, y, ::image::Rgb([blend(r), blend(g), blend(b)]));
    }

    let aspect_ratio = width_px as f32 / height_px as f32;
    let (width_mm, height_mm) = if max_width_mm / max_height_mm > aspect_ratio {
        (max_height_mm * aspect_ratio, max_height_mm)
    } else {
        (max_width_mm, max_width_mm / aspect_ratio)
    };

    let image = Image::from(ImageXObject {
        width: Px(width_px as usize),
        height: Px(height_px as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb_image.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });

    let dpi = width_px as f32 / (width_mm / 25.4);
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(left)),
            translate_y: Some(Mm(page_height - top - height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}
