//! Paints a [`DocumentPlan`] with printpdf.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;
use tracing::debug;

use crate::assets::flatten_onto_white;
use crate::error::{Result, WaiverError};
use crate::layout::{DocumentPlan, DrawOp, Gray};
use crate::metrics::FontId;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, id: FontId) -> &IndirectFontRef {
        match id {
            FontId::Regular => &self.regular,
            FontId::Bold => &self.bold,
            FontId::Italic => &self.italic,
        }
    }
}

/// Writes every page of `plan` and returns the PDF bytes.
pub fn render(plan: &DocumentPlan) -> Result<Vec<u8>> {
    let width = plan.width_mm;
    let height = plan.height_mm;

    let (doc, page1, layer1) = PdfDocument::new(&plan.title, Mm(width), Mm(height), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| WaiverError::PdfError(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| WaiverError::PdfError(e.to_string()))?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| WaiverError::PdfError(e.to_string()))?,
    };

    for (i, page) in plan.pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (new_page, new_layer) = doc.add_page(Mm(width), Mm(height), "Layer 1");
            doc.get_page(new_page).get_layer(new_layer)
        };

        for op in &page.ops {
            paint(&layer, &fonts, plan, op)?;
        }
    }

    debug!(pages = plan.pages.len(), "rendering PDF");
    doc.save_to_bytes()
        .map_err(|e| WaiverError::PdfError(e.to_string()))
}

fn paint(layer: &PdfLayerReference, fonts: &Fonts, plan: &DocumentPlan, op: &DrawOp) -> Result<()> {
    // Plans measure y from the top edge.
    let flip = |y: f32| plan.height_mm - y;

    match op {
        DrawOp::Text {
            x,
            y,
            text,
            font,
            size,
            color,
        } => {
            layer.set_fill_color(gray(*color));
            layer.use_text(text.as_str(), *size, Mm(*x), Mm(flip(*y)), fonts.get(*font));
            layer.set_fill_color(gray(Gray::BLACK));
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            thickness_pt,
            color,
        } => {
            layer.set_outline_color(gray(*color));
            layer.set_outline_thickness(*thickness_pt);
            draw_line(layer, *x1, flip(*y1), *x2, flip(*y2));
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            thickness_pt,
            color,
        } => {
            layer.set_outline_color(gray(*color));
            layer.set_outline_thickness(*thickness_pt);
            let (top, bottom) = (flip(*y), flip(*y + *height));
            let right = *x + *width;
            draw_line(layer, *x, top, right, top);
            draw_line(layer, right, top, right, bottom);
            draw_line(layer, right, bottom, *x, bottom);
            draw_line(layer, *x, bottom, *x, top);
        }
        DrawOp::Dot { cx, cy, radius } => {
            layer.set_fill_color(gray(Gray::BLACK));
            let points = utils::calculate_points_for_circle(Mm(*radius), Mm(*cx), Mm(flip(*cy)));
            layer.add_polygon(Polygon {
                rings: vec![points],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            index,
        } => {
            let img = plan.images.get(*index).ok_or_else(|| {
                WaiverError::PdfError(format!("image {} missing from plan", index))
            })?;
            embed_image(layer, img, *x, flip(*y + *height), *width);
        }
    }
    Ok(())
}

/// Places `img` with its bottom-left corner at (x, y), scaled to `width_mm`.
fn embed_image(layer: &PdfLayerReference, img: &::image::DynamicImage, x: f32, y: f32, width_mm: f32) {
    let rgb_image = flatten_onto_white(img);
    let (width_px, height_px) = rgb_image.dimensions();

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

    // DPI = pixels / (mm / 25.4)
    let dpi = (width_px as f32) / (width_mm / 25.4);

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

fn gray(level: Gray) -> Color {
    let v = level.0 as f32 / 255.0;
    Color::Rgb(Rgb::new(v, v, v, None))
}

fn draw_line(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
    let points = vec![
        (Point::new(Mm(x1), Mm(y1)), false),
        (Point::new(Mm(x2), Mm(y2)), false),
    ];
    let line = Line {
        points,
        is_closed: false,
    };
    layer.add_line(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PagePlan;
    use ::image::{DynamicImage, Rgba, RgbaImage};

    fn plan(pages: Vec<PagePlan>, images: Vec<DynamicImage>) -> DocumentPlan {
        DocumentPlan {
            title: "Test".into(),
            width_mm: 210.0,
            height_mm: 297.0,
            pages,
            images,
        }
    }

    #[test]
    fn renders_every_op_kind() {
        let page = PagePlan {
            ops: vec![
                DrawOp::Text {
                    x: 16.0,
                    y: 20.0,
                    text: "Hello".into(),
                    font: FontId::Bold,
                    size: 12.0,
                    color: Gray(100),
                },
                DrawOp::Line {
                    x1: 16.0,
                    y1: 30.0,
                    x2: 194.0,
                    y2: 30.0,
                    thickness_pt: 0.5,
                    color: Gray(150),
                },
                DrawOp::Rect {
                    x: 130.0,
                    y: 16.0,
                    width: 60.0,
                    height: 22.0,
                    thickness_pt: 0.3,
                    color: Gray(200),
                },
                DrawOp::Dot {
                    cx: 18.5,
                    cy: 40.0,
                    radius: 0.55,
                },
                DrawOp::Image {
                    x: 16.0,
                    y: 50.0,
                    width: 20.0,
                    height: 10.0,
                    index: 0,
                },
            ],
        };
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 128])));
        let bytes = render(&plan(vec![page, PagePlan::default()], vec![img])).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn dangling_image_index_is_an_error() {
        let page = PagePlan {
            ops: vec![DrawOp::Image {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                index: 3,
            }],
        };
        assert!(matches!(
            render(&plan(vec![page], Vec::new())),
            Err(WaiverError::PdfError(_))
        ));
    }
}
