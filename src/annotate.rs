//! Overlay annotator for scanned paper waivers.
//!
//! Stamps an auto-sized metadata box onto the top-right corner of the
//! first page of an existing PDF. Geometry is computed in PDF points with
//! the usual bottom-left origin; every other page passes through untouched.

use std::fmt::Write as _;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::error::{Result, WaiverError};
use crate::format::{format_date, one_year_after};
use crate::metrics::{
    fit_font_size, truncate_to_width, wrap_text, FontId, StandardFonts, TextMeasurer,
};
use crate::model::OverlayMetadata;

// =============================================================================
// Layout Constants
// =============================================================================

const NOMINAL_FONT_SIZE: f32 = 8.0;
const FLOOR_FONT_SIZE: f32 = 5.5;
const FONT_STEP: f32 = 0.5;
const LINE_HEIGHT_FACTOR: f32 = 1.25;

/// Inset of the box from the page's top and right edges.
const PAGE_MARGIN: f32 = 10.0;
const BOX_PADDING: f32 = 5.0;
const MIN_CONTENT_WIDTH: f32 = 110.0;
/// Keeps the box compact; longer values shrink and then wrap inside it.
const MAX_CONTENT_WIDTH: f32 = 230.0;
/// Between "Waiver ID:" and the ID.
const LABEL_GAP: f32 = 4.0;
const COLUMN_GAP: f32 = 10.0;
const ROW_GAP: f32 = 4.0;

const BOX_OPACITY: f32 = 0.95;
const BORDER_GRAY: f32 = 0.7;
const BORDER_WIDTH: f32 = 0.5;

/// Used when no MediaBox can be resolved (US Letter).
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Resource names; prefixed so they do not collide with the page's own.
const FONT_REGULAR_NAME: &str = "WvrF1";
const FONT_BOLD_NAME: &str = "WvrF2";
const GSTATE_NAME: &str = "WvrGS";

// =============================================================================
// Geometry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRect {
    /// Bottom-left corner.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// One text run; `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font: FontId,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayout {
    pub rect: BoxRect,
    pub texts: Vec<PlacedText>,
    /// Lines the uploader email was set on.
    pub email_lines: usize,
}

/// A label with its value stacked beneath it.
struct Cell {
    label: &'static str,
    label_size: f32,
    lines: Vec<String>,
    value_size: f32,
}

impl Cell {
    fn height(&self) -> f32 {
        line_height(self.label_size) + self.lines.len().max(1) as f32 * line_height(self.value_size)
    }
}

fn line_height(size: f32) -> f32 {
    size * LINE_HEIGHT_FACTOR
}

/// Computes the box and text placement for `page_box` (`[llx, lly, urx, ury]`).
pub fn layout_overlay(
    measurer: &dyn TextMeasurer,
    metadata: &OverlayMetadata,
    page_box: [f32; 4],
) -> OverlayLayout {
    let [llx, _lly, urx, ury] = page_box;
    let page_width = (urx - llx).abs();
    let m = measurer;
    let bold = |s: &str| m.width(s, FontId::Bold, NOMINAL_FONT_SIZE);
    let regular = |s: &str| m.width(s, FontId::Regular, NOMINAL_FONT_SIZE);

    let signed = format_date(metadata.signed_date);
    let expires = format_date(one_year_after(metadata.signed_date));
    let uploaded = metadata.upload_date.map(format_date);
    let email = metadata.uploaded_by_email.trim();

    // 1-2. Content width at the nominal size
    let id_label = "Waiver ID:";
    let id_row = bold(id_label) + LABEL_GAP + regular(&metadata.waiver_id);

    let mut col_a = bold("Signed:").max(regular(&signed));
    let mut col_b = bold("Expires:").max(regular(&expires));
    let mut full_width_email = 0.0_f32;
    match &uploaded {
        Some(date) => {
            col_a = col_a.max(bold("Uploaded:")).max(regular(date));
            col_b = col_b.max(bold("Uploaded by:")).max(regular(email));
        }
        None => full_width_email = bold("Uploaded by:").max(regular(email)),
    }
    let content_width = id_row
        .max(col_a + COLUMN_GAP + col_b)
        .max(full_width_email)
        .clamp(MIN_CONTENT_WIDTH, MAX_CONTENT_WIDTH);

    // 3. Box width, clamped to the page
    let max_box_width = (page_width - 2.0 * PAGE_MARGIN).max(0.0);
    let box_width = (content_width + 2.0 * BOX_PADDING).min(max_box_width);
    let inner = (box_width - 2.0 * BOX_PADDING).max(0.0);

    let col_a_width = col_a.min((inner - COLUMN_GAP).max(0.0) / 2.0);
    let col_b_width = (inner - COLUMN_GAP - col_a_width).max(0.0);

    // 4. Shrink values to their columns
    let id_label_width = bold(id_label);
    let id_avail = (inner - id_label_width - LABEL_GAP).max(0.0);
    let id_size = shrink(m, &metadata.waiver_id, FontId::Regular, id_avail);
    let id_text = truncate_to_width(m, &metadata.waiver_id, FontId::Regular, id_size, id_avail);
    if id_text != metadata.waiver_id {
        warn!(id = %metadata.waiver_id, "waiver id truncated to fit overlay");
    }

    let cell = |label: &'static str, value: &str, width: f32| Cell {
        label,
        label_size: shrink(m, label, FontId::Bold, width),
        value_size: shrink(m, value, FontId::Regular, width),
        lines: vec![value.to_string()],
    };

    // 5. Uploader email wraps once it is at the floor size
    let email_width = if uploaded.is_some() { col_b_width } else { inner };
    let mut email_cell = cell("Uploaded by:", email, email_width);
    if m.width(email, FontId::Regular, email_cell.value_size) > email_width {
        email_cell.lines = wrap_text(m, email, FontId::Regular, FLOOR_FONT_SIZE, email_width)
            .into_iter()
            .map(|l| l.text)
            .collect();
        if email_cell.lines.is_empty() {
            email_cell.lines.push(String::new());
        }
        debug!(lines = email_cell.lines.len(), "uploader email wrapped");
    }
    let email_lines = email_cell.lines.len();

    let mut rows: Vec<Vec<Cell>> = vec![vec![
        cell("Signed:", &signed, col_a_width),
        cell("Expires:", &expires, col_b_width),
    ]];
    match &uploaded {
        Some(date) => rows.push(vec![cell("Uploaded:", date, col_a_width), email_cell]),
        None => rows.push(vec![email_cell]),
    }

    // 6. Height and anchoring
    let id_row_height = line_height(NOMINAL_FONT_SIZE);
    let rows_height: f32 = rows
        .iter()
        .map(|row| row.iter().map(Cell::height).fold(0.0_f32, f32::max))
        .sum();
    let box_height = 2.0 * BOX_PADDING + id_row_height + rows_height + ROW_GAP * rows.len() as f32;

    let box_x = (urx - PAGE_MARGIN - box_width).max(llx + PAGE_MARGIN.min(page_width / 2.0));
    let box_top = ury - PAGE_MARGIN;
    let rect = BoxRect {
        x: box_x,
        y: box_top - box_height,
        width: box_width,
        height: box_height,
    };

    // 7. Text placement
    let left = box_x + BOX_PADDING;
    let mut texts = Vec::new();
    let mut row_top = box_top - BOX_PADDING;

    texts.push(PlacedText {
        x: left,
        y: row_top - NOMINAL_FONT_SIZE,
        text: id_label.to_string(),
        font: FontId::Bold,
        size: NOMINAL_FONT_SIZE,
    });
    texts.push(PlacedText {
        x: left + id_label_width + LABEL_GAP,
        y: row_top - NOMINAL_FONT_SIZE,
        text: id_text,
        font: FontId::Regular,
        size: id_size,
    });
    row_top -= id_row_height + ROW_GAP;

    for row in rows {
        let row_height = row.iter().map(Cell::height).fold(0.0_f32, f32::max);
        let mut x = left;
        for cell in row {
            let mut y = row_top - cell.label_size;
            texts.push(PlacedText {
                x,
                y,
                text: cell.label.to_string(),
                font: FontId::Bold,
                size: cell.label_size,
            });
            y -= line_height(cell.label_size) - cell.label_size + cell.value_size;
            for line in cell.lines {
                texts.push(PlacedText {
                    x,
                    y,
                    text: line,
                    font: FontId::Regular,
                    size: cell.value_size,
                });
                y -= line_height(cell.value_size);
            }
            x += col_a_width + COLUMN_GAP;
        }
        row_top -= row_height + ROW_GAP;
    }

    OverlayLayout {
        rect,
        texts,
        email_lines,
    }
}

fn shrink(m: &dyn TextMeasurer, text: &str, font: FontId, width: f32) -> f32 {
    fit_font_size(
        m,
        text,
        font,
        NOMINAL_FONT_SIZE,
        FLOOR_FONT_SIZE,
        FONT_STEP,
        width,
    )
}

// =============================================================================
// PDF Stamping
// =============================================================================

/// Stamps `metadata` onto the first page of `pdf_bytes`.
///
/// Input that lopdf cannot parse, or that has no pages, is rejected with
/// [`WaiverError::MalformedPdf`].
pub fn annotate(pdf_bytes: &[u8], metadata: &OverlayMetadata) -> Result<Vec<u8>> {
    annotate_with(&StandardFonts, pdf_bytes, metadata)
}

pub fn annotate_with(
    measurer: &dyn TextMeasurer,
    pdf_bytes: &[u8],
    metadata: &OverlayMetadata,
) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf_bytes)
        .map_err(|e| WaiverError::MalformedPdf(format!("Failed to load PDF: {}", e)))?;

    let page_id = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| WaiverError::MalformedPdf("document has no pages".to_string()))?;

    let media_box = media_box(&doc, page_id);
    let layout = layout_overlay(measurer, metadata, media_box);
    debug!(
        width = layout.rect.width,
        height = layout.rect.height,
        email_lines = layout.email_lines,
        "overlay laid out"
    );

    install_resources(&mut doc, page_id)?;
    let overlay = overlay_content(&layout);
    wrap_page_content(&mut doc, page_id, overlay)?;

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| WaiverError::PdfError(format!("Failed to save PDF: {}", e)))?;
    Ok(output)
}

/// The page's MediaBox, inherited through the page tree when needed.
fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut current = doc.get_dictionary(page_id).ok();
    // Depth limit guards against cyclic Parent chains.
    for _ in 0..16 {
        let Some(dict) = current else { break };
        if let Some(rect) = dict.get(b"MediaBox").ok().and_then(|o| rect_of(doc, o)) {
            return rect;
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_dictionary(*parent_id).ok(),
            _ => None,
        };
    }
    warn!("no MediaBox found, assuming US Letter");
    DEFAULT_MEDIA_BOX
}

fn rect_of(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let arr = match obj {
        Object::Array(arr) => arr,
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr,
            _ => return None,
        },
        _ => return None,
    };
    let values: Vec<f32> = arr.iter().filter_map(number).collect();
    match values.as_slice() {
        [a, b, c, d] => Some([a.min(*c), b.min(*d), a.max(*c), b.max(*d)]),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Resolves `obj` to an owned dictionary, following one reference.
fn owned_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// Page resources, inherited from the page tree when the page has none.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..16 {
        let Some(dict) = current else { break };
        if let Some(res) = dict.get(b"Resources").ok().and_then(|o| owned_dict(doc, o)) {
            return res;
        }
        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => doc.get_dictionary(*parent_id).ok(),
            _ => None,
        };
    }
    Dictionary::new()
}

/// Gives the page its own resource dictionary carrying the overlay's
/// fonts and transparency state alongside whatever it already used.
fn install_resources(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let gs_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(BOX_OPACITY.into()),
    });

    let mut resources = effective_resources(doc, page_id);

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|o| owned_dict(doc, o))
        .unwrap_or_default();
    fonts.set(FONT_REGULAR_NAME, Object::Reference(regular_id));
    fonts.set(FONT_BOLD_NAME, Object::Reference(bold_id));
    resources.set("Font", Object::Dictionary(fonts));

    let mut states = resources
        .get(b"ExtGState")
        .ok()
        .and_then(|o| owned_dict(doc, o))
        .unwrap_or_default();
    states.set(GSTATE_NAME, Object::Reference(gs_id));
    resources.set("ExtGState", Object::Dictionary(states));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| WaiverError::MalformedPdf(format!("first page is not a dictionary: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Brackets the existing content in `q`/`Q` so its graphics state cannot
/// leak into the overlay, then appends the overlay.
fn wrap_page_content(doc: &mut Document, page_id: ObjectId, overlay: String) -> Result<()> {
    let existing = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|d| d.get(b"Contents").ok())
        .cloned();

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(
        Dictionary::new(),
        format!("Q\n{}", overlay).into_bytes(),
    ));

    let mut contents = vec![Object::Reference(save_id)];
    match existing {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            // An indirect array of streams
            Ok(Object::Array(arr)) => contents.extend(arr.iter().cloned()),
            _ => contents.push(Object::Reference(id)),
        },
        Some(Object::Array(arr)) => contents.extend(arr),
        Some(other) => {
            warn!("unexpected page Contents, keeping as-is");
            contents.push(other);
        }
        None => {}
    }
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| WaiverError::MalformedPdf(format!("first page is not a dictionary: {}", e)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

fn overlay_content(layout: &OverlayLayout) -> String {
    let r = layout.rect;
    let mut content = String::new();

    // Box
    content.push_str("q\n");
    let _ = writeln!(content, "/{} gs", GSTATE_NAME);
    content.push_str("1 1 1 rg\n");
    let _ = writeln!(content, "{g:.2} {g:.2} {g:.2} RG", g = BORDER_GRAY);
    let _ = writeln!(content, "{:.2} w", BORDER_WIDTH);
    let _ = writeln!(
        content,
        "{:.2} {:.2} {:.2} {:.2} re B",
        r.x, r.y, r.width, r.height
    );
    content.push_str("Q\n");

    // Text
    content.push_str("q\n0 0 0 rg\n");
    for t in &layout.texts {
        if t.text.is_empty() {
            continue;
        }
        let font = match t.font {
            FontId::Bold => FONT_BOLD_NAME,
            FontId::Regular | FontId::Italic => FONT_REGULAR_NAME,
        };
        content.push_str("BT\n");
        let _ = writeln!(content, "/{} {:.2} Tf", font, t.size);
        let _ = writeln!(content, "{:.2} {:.2} Td", t.x, t.y);
        let _ = writeln!(content, "({}) Tj", escape_pdf_string(&t.text));
        content.push_str("ET\n");
    }
    content.push_str("Q\n");
    content
}

/// Escapes a literal string; characters outside WinAnsi's ASCII range
/// become `?`.
fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            _ => out.push('?'),
        }
    }
    out
}
