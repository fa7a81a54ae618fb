//! Full-document compositor.
//!
//! Lays a template and submission out as a [`DocumentPlan`] (pure, no PDF
//! backend involved) and hands the plan to the painter in [`crate::render`].

use chrono::{DateTime, Utc};
use image::DynamicImage;
use tracing::{debug, warn};

use crate::assets::{decode_signature, fit_within, RenderAssets};
use crate::config::RenderSettings;
use crate::content;
use crate::error::Result;
use crate::format::{format_date, format_effective_date, one_year_after, DisplayZone};
use crate::interpolate::{interpolate, InterpolationParams};
use crate::layout::{DocumentPlan, DrawOp, Gray, LayoutCursor, PagePlan};
use crate::metrics::{
    fit_font_size, mm_to_pt, pt_to_mm, truncate_to_width, wrap_text, FontId, MeasuredLine,
    StandardFonts, TextMeasurer,
};
use crate::model::{BlockKind, WaiverSubmission, WaiverTemplate};
use crate::waiver_id::generate_waiver_id;

// ============================================================================
// Constants
// ============================================================================

const MARGIN_MM: f32 = 16.0;
const LINE_HEIGHT_MM: f32 = 5.2;
const BULLET_INDENT_MM: f32 = 6.0;
const BULLET_DOT_OFFSET_MM: f32 = 2.0;
const BULLET_DOT_RADIUS_MM: f32 = 0.55;

const LOGO_SIZE_MM: f32 = 12.0;
const HEADER_GAP_MM: f32 = 6.0;
const MIN_TITLE_WIDTH_MM: f32 = 50.0;

/// Info box geometry
const INFO_MIN_WIDTH_MM: f32 = 60.0;
const INFO_MAX_WIDTH_MM: f32 = 80.0;
const INFO_LABEL_X_MM: f32 = 2.0;
const INFO_MIN_VALUE_X_MM: f32 = 22.0;
const INFO_RIGHT_PADDING_MM: f32 = 2.0;
const INFO_LINE_STEP_MM: f32 = 4.2;
const INFO_ROW_GAP_MM: f32 = 1.2;
const INFO_TOP_PADDING_MM: f32 = 4.0;
const INFO_BOTTOM_PADDING_MM: f32 = 3.0;
/// Headroom so a value measured at the floor size still fits after mm/pt rounding.
const INFO_FIT_SLACK_MM: f32 = 0.5;

/// Signature row geometry
const SIGNATURE_COLUMN_GAP_MM: f32 = 8.0;
const SIGNATURE_HEADING_STEP_MM: f32 = 6.0;
const SIGNATURE_IMAGE_OFFSET_MM: f32 = 4.0;
const SIGNATURE_IMAGE_HEIGHT_MM: f32 = 16.0;
const SIGNATURE_TIMESTAMP_GAP_MM: f32 = 4.0;
const SIGNATURE_TIMESTAMP_VALUE_X_MM: f32 = 20.0;
const SIGNATURE_TRAILING_MM: f32 = 6.0;

/// Everything from the "Signatures" heading to below the timestamps.
pub const SIGNATURE_BLOCK_HEIGHT_MM: f32 = SIGNATURE_HEADING_STEP_MM
    + SIGNATURE_IMAGE_OFFSET_MM
    + SIGNATURE_IMAGE_HEIGHT_MM
    + SIGNATURE_TIMESTAMP_GAP_MM
    + SIGNATURE_TRAILING_MM;

const FOOTER_OFFSET_MM: f32 = 10.0;

/// Font sizes in points
const ORG_NAME_FONT_SIZE: f32 = 14.0;
const TITLE_FONT_SIZE: f32 = 12.0;
const TITLE_LINE_STEP_MM: f32 = 5.0;
const SECTION_FONT_SIZE: f32 = 10.5;
const BODY_FONT_SIZE: f32 = 9.0;
const INFO_FONT_SIZE: f32 = 9.0;
const INFO_ID_MIN_FONT_SIZE: f32 = 6.0;
const SIGNATURES_HEADING_FONT_SIZE: f32 = 10.0;
const SIGNATURE_LABEL_MIN_FONT_SIZE: f32 = 7.0;
const TIMESTAMP_FONT_SIZE: f32 = 7.5;
const FOOTER_FONT_SIZE: f32 = 8.0;
const FONT_STEP: f32 = 0.5;

const RULE_GRAY: Gray = Gray(150);
const INFO_BORDER_GRAY: Gray = Gray(200);
const FOOTER_GRAY: Gray = Gray(100);

// ============================================================================
// Compositor
// ============================================================================

/// Builds complete waiver documents.
pub struct Compositor<'a> {
    measurer: &'a dyn TextMeasurer,
    settings: RenderSettings,
    zone: DisplayZone,
}

impl<'a> Compositor<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer, settings: RenderSettings, zone: DisplayZone) -> Self {
        Self {
            measurer,
            settings,
            zone,
        }
    }

    /// Renders straight to PDF bytes.
    pub fn compose(
        &self,
        template: &WaiverTemplate,
        submission: &WaiverSubmission,
        assets: &RenderAssets,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let plan = self.layout(template, submission, assets, now);
        crate::render::render(&plan)
    }

    /// Lays the document out without touching a PDF backend.
    pub fn layout(
        &self,
        template: &WaiverTemplate,
        submission: &WaiverSubmission,
        assets: &RenderAssets,
        now: DateTime<Utc>,
    ) -> DocumentPlan {
        let (page_width, page_height) = self.settings.page_size.dimensions_mm();
        let mut ctx = LayoutContext {
            measurer: self.measurer,
            cursor: LayoutCursor::new(MARGIN_MM, page_height - MARGIN_MM),
            images: Vec::new(),
            page_width,
            content_width: page_width - 2.0 * MARGIN_MM,
        };

        let waiver_id = match &submission.waiver_id {
            Some(id) => id.clone(),
            None => {
                let id = generate_waiver_id();
                debug!(id = %id, "submission has no waiver id, generated one");
                id
            }
        };
        let created = submission.created_at.unwrap_or(now);
        let created_date = self.zone.local_date(created);
        let expiry_date = submission
            .expiry_date
            .map(|e| self.zone.local_date(e))
            .unwrap_or_else(|| one_year_after(created_date));

        let mut params = InterpolationParams::from_submission(submission, now, &self.zone);
        params.set("waiverId", &waiver_id);

        let info_rows = [
            InfoField::single_line("Waiver ID:", waiver_id),
            InfoField::wrapped("Created:", format_date(created_date)),
            InfoField::wrapped("Expires:", format_date(expiry_date)),
        ];
        self.draw_header(&mut ctx, template, assets, &info_rows);
        self.draw_body(&mut ctx, template, submission, &params);
        self.draw_signatures(&mut ctx, submission);

        let images = std::mem::take(&mut ctx.images);
        let mut pages = ctx.cursor.into_pages();
        self.draw_footers(&mut pages, template, page_width, page_height);

        let title = format!(
            "{} Waiver - {}",
            submission.waiver_type.display_name(),
            submission.passenger.full_name()
        );
        debug!(pages = pages.len(), title = %title, "document laid out");

        DocumentPlan {
            title,
            width_mm: page_width,
            height_mm: page_height,
            pages,
            images,
        }
    }

    // ------------------------------------------------------------------------
    // Header
    // ------------------------------------------------------------------------

    fn draw_header(
        &self,
        ctx: &mut LayoutContext<'_>,
        template: &WaiverTemplate,
        assets: &RenderAssets,
        info_rows: &[InfoField],
    ) {
        let top = ctx.cursor.y();
        let info = self.measure_info_box(info_rows, header_room(ctx.content_width, assets));
        let info_x = ctx.page_width - MARGIN_MM - info.width;

        // Logo
        let mut logo_bottom = top;
        let mut title_left = MARGIN_MM;
        if let Some(logo) = &assets.logo {
            let (w, h) = fit_within(logo, LOGO_SIZE_MM, LOGO_SIZE_MM);
            let logo_y = top + 2.0;
            let index = ctx.add_image(logo.clone());
            ctx.cursor.push(DrawOp::Image {
                x: MARGIN_MM,
                y: logo_y,
                width: w,
                height: h,
                index,
            });
            logo_bottom = logo_y + LOGO_SIZE_MM;
            title_left = MARGIN_MM + LOGO_SIZE_MM + HEADER_GAP_MM;
        }

        // Organization name and title, centered between logo and info box
        let title_right = info_x - HEADER_GAP_MM;
        let title_width = (title_right - title_left).max(MIN_TITLE_WIDTH_MM);
        let title_center = title_left + title_width / 2.0;

        let org = &self.settings.organization_name;
        let org_size = fit_font_size(
            ctx.measurer,
            org,
            FontId::Bold,
            ORG_NAME_FONT_SIZE,
            TITLE_FONT_SIZE,
            FONT_STEP,
            mm_to_pt(title_width),
        );
        ctx.text_centered(org, title_center, top + 5.0, FontId::Bold, org_size, Gray::BLACK);

        let title_lines = ctx.wrap(&template.title, FontId::Bold, TITLE_FONT_SIZE, title_width);
        let title_y = top + 13.0;
        for (i, line) in title_lines.iter().enumerate() {
            ctx.text_centered(
                &line.text,
                title_center,
                title_y + i as f32 * TITLE_LINE_STEP_MM,
                FontId::Bold,
                TITLE_FONT_SIZE,
                Gray::BLACK,
            );
        }
        let title_bottom = title_y + title_lines.len().saturating_sub(1) as f32 * TITLE_LINE_STEP_MM;

        // Info box
        let mut line_y = top + INFO_TOP_PADDING_MM + INFO_LINE_STEP_MM;
        for row in &info.rows {
            ctx.cursor.push(DrawOp::Text {
                x: info_x + INFO_LABEL_X_MM,
                y: line_y,
                text: row.label.clone(),
                font: FontId::Bold,
                size: INFO_FONT_SIZE,
                color: Gray::BLACK,
            });
            for (i, line) in row.lines.iter().enumerate() {
                ctx.cursor.push(DrawOp::Text {
                    x: info_x + info.value_x,
                    y: line_y + i as f32 * INFO_LINE_STEP_MM,
                    text: line.clone(),
                    font: FontId::Regular,
                    size: row.value_size,
                    color: Gray::BLACK,
                });
            }
            line_y += row.height() + INFO_ROW_GAP_MM;
        }
        ctx.cursor.push(DrawOp::Rect {
            x: info_x,
            y: top,
            width: info.width,
            height: info.height,
            thickness_pt: 0.3,
            color: INFO_BORDER_GRAY,
        });
        let info_bottom = top + info.height;

        let row_bottom = logo_bottom.max(title_bottom).max(info_bottom) + HEADER_GAP_MM;
        ctx.cursor.set_y(row_bottom);
        ctx.cursor.push(DrawOp::Line {
            x1: MARGIN_MM,
            y1: row_bottom,
            x2: ctx.page_width - MARGIN_MM,
            y2: row_bottom,
            thickness_pt: 0.5,
            color: RULE_GRAY,
        });
        ctx.cursor.advance(HEADER_GAP_MM);
    }

    /// Sizes the info box from its content: the value column widens up to
    /// a cap, single-line values shrink toward a floor size, other values
    /// wrap. A single-line value that still does not fit at the floor size
    /// widens the box into `room`; truncation only happens beyond that.
    fn measure_info_box(&self, fields: &[InfoField], room: f32) -> InfoBox {
        let m = self.measurer;
        let label_width = fields
            .iter()
            .map(|f| pt_to_mm(m.width(&f.label, FontId::Bold, INFO_FONT_SIZE)))
            .fold(0.0_f32, f32::max);
        let value_x = (INFO_LABEL_X_MM + label_width + 2.0).max(INFO_MIN_VALUE_X_MM);

        let natural_value_width = fields
            .iter()
            .map(|f| pt_to_mm(m.width(&f.value, FontId::Regular, INFO_FONT_SIZE)))
            .fold(0.0_f32, f32::max);
        let max_width = INFO_MAX_WIDTH_MM.min(room).max(INFO_MIN_WIDTH_MM);
        let floor_value_width = fields
            .iter()
            .filter(|f| f.single_line)
            .map(|f| pt_to_mm(m.width(&f.value, FontId::Regular, INFO_ID_MIN_FONT_SIZE)))
            .fold(0.0_f32, f32::max);
        let floor_width = value_x + floor_value_width + INFO_RIGHT_PADDING_MM + INFO_FIT_SLACK_MM;
        let width = (value_x + natural_value_width + INFO_RIGHT_PADDING_MM)
            .clamp(INFO_MIN_WIDTH_MM, max_width)
            .max(floor_width.min(room.max(INFO_MIN_WIDTH_MM)));
        let value_max_width = width - value_x - INFO_RIGHT_PADDING_MM;

        let rows: Vec<InfoRow> = fields
            .iter()
            .map(|field| {
                if field.single_line {
                    let size = fit_font_size(
                        m,
                        &field.value,
                        FontId::Regular,
                        INFO_FONT_SIZE,
                        INFO_ID_MIN_FONT_SIZE,
                        FONT_STEP,
                        mm_to_pt(value_max_width),
                    );
                    if size < INFO_FONT_SIZE {
                        debug!(size, value = %field.value, "info box value shrunk to fit");
                    }
                    let line = truncate_to_width(
                        m,
                        &field.value,
                        FontId::Regular,
                        size,
                        mm_to_pt(value_max_width),
                    );
                    if line != field.value {
                        warn!(value = %field.value, "info box value truncated at floor size");
                    }
                    InfoRow {
                        label: field.label.clone(),
                        lines: vec![line],
                        value_size: size,
                    }
                } else {
                    let lines: Vec<String> = wrap_text(
                        m,
                        &field.value,
                        FontId::Regular,
                        INFO_FONT_SIZE,
                        mm_to_pt(value_max_width),
                    )
                    .into_iter()
                    .map(|l| l.text)
                    .collect();
                    InfoRow {
                        label: field.label.clone(),
                        lines,
                        value_size: INFO_FONT_SIZE,
                    }
                }
            })
            .collect();

        let content_height: f32 = rows.iter().map(InfoRow::height).sum::<f32>()
            + rows.len().saturating_sub(1) as f32 * INFO_ROW_GAP_MM;
        InfoBox {
            width,
            height: INFO_TOP_PADDING_MM + content_height + INFO_BOTTOM_PADDING_MM,
            value_x,
            rows,
        }
    }

    // ------------------------------------------------------------------------
    // Body
    // ------------------------------------------------------------------------

    fn draw_body(
        &self,
        ctx: &mut LayoutContext<'_>,
        template: &WaiverTemplate,
        submission: &WaiverSubmission,
        params: &InterpolationParams,
    ) {
        let waiver_type = submission.waiver_type;
        let mut blocks = template.blocks.iter();

        // Block 0 is the introduction whatever its id.
        if let Some(intro_block) = blocks.next() {
            let intro = interpolate(&intro_block.template_text, params);
            let prefix = content::intro_prefix(submission);
            match content::split_intro(&intro, &prefix) {
                Some((head, body)) => {
                    ctx.paragraph(head, BODY_FONT_SIZE, FontId::Bold, 0.0);
                    if !body.is_empty() {
                        ctx.paragraph(body, BODY_FONT_SIZE, FontId::Regular, 0.0);
                    }
                }
                None => ctx.paragraph(&intro, BODY_FONT_SIZE, FontId::Regular, 0.0),
            }
            ctx.cursor.advance(3.0);
        }

        let mut heading_drawn = false;
        let mut in_bullets = false;
        let mut media_drawn = false;

        for block in blocks {
            let kind = block.kind();
            if in_bullets && kind != BlockKind::Clause {
                ctx.cursor.advance(3.0);
                in_bullets = false;
            }
            match kind {
                BlockKind::Title => {
                    let text = interpolate(&block.template_text, params);
                    let heading = if text.trim().is_empty() { &block.label } else { &text };
                    ctx.heading(heading);
                    heading_drawn = true;
                }
                BlockKind::Clause => {
                    if !heading_drawn {
                        ctx.heading(content::default_section_title(waiver_type));
                        heading_drawn = true;
                    }
                    ctx.bullet(&interpolate(&block.template_text, params));
                    in_bullets = true;
                }
                BlockKind::Media => {
                    let title = if block.label.trim().is_empty() {
                        content::MEDIA_RELEASE_TITLE
                    } else {
                        block.label.as_str()
                    };
                    let description = interpolate(&block.template_text, params);
                    self.media_section(ctx, submission, title, &description);
                    media_drawn = true;
                }
                BlockKind::Intro => {
                    ctx.paragraph(
                        &interpolate(&block.template_text, params),
                        BODY_FONT_SIZE,
                        FontId::Regular,
                        0.0,
                    );
                    ctx.cursor.advance(3.0);
                }
            }
        }
        if in_bullets {
            ctx.cursor.advance(3.0);
        }

        if !media_drawn {
            self.media_section(
                ctx,
                submission,
                content::MEDIA_RELEASE_TITLE,
                content::MEDIA_RELEASE_DESCRIPTION,
            );
        }

        if submission.is_representative() {
            ctx.cursor.advance(2.0);
        } else {
            ctx.paragraph(content::ACKNOWLEDGMENT, BODY_FONT_SIZE, FontId::Regular, 0.0);
            ctx.cursor.advance(4.0);
        }
    }

    fn media_section(
        &self,
        ctx: &mut LayoutContext<'_>,
        submission: &WaiverSubmission,
        title: &str,
        description: &str,
    ) {
        ctx.heading(title);
        if !description.trim().is_empty() {
            ctx.paragraph(description, BODY_FONT_SIZE, FontId::Regular, 0.0);
            ctx.cursor.advance(2.0);
        }
        let sentence = content::media_release_sentence(
            submission.media_release,
            submission.waiver_type,
            &submission.passenger.first_name,
        );
        ctx.paragraph(&sentence, BODY_FONT_SIZE, FontId::Regular, 0.0);
        ctx.cursor.advance(3.0);
    }

    // ------------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------------

    fn draw_signatures(&self, ctx: &mut LayoutContext<'_>, submission: &WaiverSubmission) {
        // The heading, both columns and their timestamps move together.
        if ctx.cursor.check_page_break(SIGNATURE_BLOCK_HEIGHT_MM) {
            debug!("signature block moved to a fresh page");
        }

        let y = ctx.cursor.y();
        ctx.cursor.push(DrawOp::Text {
            x: MARGIN_MM,
            y,
            text: "Signatures".to_string(),
            font: FontId::Bold,
            size: SIGNATURES_HEADING_FONT_SIZE,
            color: Gray::BLACK,
        });
        let label_y = y + SIGNATURE_HEADING_STEP_MM;

        let column_width = (ctx.content_width - SIGNATURE_COLUMN_GAP_MM) / 2.0;
        let left_x = MARGIN_MM;
        let right_x = MARGIN_MM + column_width + SIGNATURE_COLUMN_GAP_MM;

        let signer_label = if submission.is_representative() {
            format!("Legal Representative ({}):", submission.signer_name())
        } else {
            format!("Passenger ({}):", submission.passenger.full_name())
        };
        let witness = &submission.signatures.witness;
        let witness_label = format!("Witness ({}):", witness.name);

        let passenger_sig = &submission.signatures.passenger;
        let columns = [
            (
                left_x,
                signer_label,
                passenger_sig.image.as_deref(),
                passenger_sig.timestamp.as_ref().and_then(|t| t.to_utc()),
            ),
            (
                right_x,
                witness_label,
                witness.image.as_deref(),
                witness.timestamp.as_ref().and_then(|t| t.to_utc()),
            ),
        ];

        let image_y = label_y + SIGNATURE_IMAGE_OFFSET_MM;
        let timestamp_y = image_y + SIGNATURE_IMAGE_HEIGHT_MM + SIGNATURE_TIMESTAMP_GAP_MM;

        for (x, label, image, signed_at) in columns {
            let label_size = fit_font_size(
                ctx.measurer,
                &label,
                FontId::Bold,
                BODY_FONT_SIZE,
                SIGNATURE_LABEL_MIN_FONT_SIZE,
                FONT_STEP,
                mm_to_pt(column_width),
            );
            let label = truncate_to_width(
                ctx.measurer,
                &label,
                FontId::Bold,
                label_size,
                mm_to_pt(column_width),
            );
            ctx.cursor.push(DrawOp::Text {
                x,
                y: label_y,
                text: label,
                font: FontId::Bold,
                size: label_size,
                color: Gray::BLACK,
            });

            match image.and_then(decode_signature) {
                Some(img) => {
                    let (w, h) = fit_within(&img, column_width - 4.0, SIGNATURE_IMAGE_HEIGHT_MM);
                    let index = ctx.add_image(img);
                    ctx.cursor.push(DrawOp::Image {
                        x: x + 2.0,
                        y: image_y,
                        width: w,
                        height: h,
                        index,
                    });
                }
                None => {
                    warn!("signature image missing or unreadable, drawing placeholder");
                    ctx.cursor.push(DrawOp::Text {
                        x: x + 15.0,
                        y: image_y + 8.0,
                        text: "[Signature]".to_string(),
                        font: FontId::Italic,
                        size: BODY_FONT_SIZE,
                        color: Gray::BLACK,
                    });
                }
            }

            ctx.cursor.push(DrawOp::Text {
                x,
                y: timestamp_y,
                text: "Signed on:".to_string(),
                font: FontId::Regular,
                size: TIMESTAMP_FONT_SIZE,
                color: Gray::BLACK,
            });
            ctx.cursor.push(DrawOp::Text {
                x: x + SIGNATURE_TIMESTAMP_VALUE_X_MM,
                y: timestamp_y,
                text: self.zone.format_timestamp(signed_at),
                font: FontId::Bold,
                size: TIMESTAMP_FONT_SIZE,
                color: Gray::BLACK,
            });
        }

        ctx.cursor.set_y(timestamp_y + SIGNATURE_TRAILING_MM);
    }

    // ------------------------------------------------------------------------
    // Footer
    // ------------------------------------------------------------------------

    fn draw_footers(
        &self,
        pages: &mut [PagePlan],
        template: &WaiverTemplate,
        page_width: f32,
        page_height: f32,
    ) {
        let m = self.measurer;
        let version = self.settings.version_tag(&template.version);
        let effective = format_effective_date(&template.effective_date);
        let total = pages.len();
        let y = page_height - FOOTER_OFFSET_MM;
        let width_mm = |s: &str| pt_to_mm(m.width(s, FontId::Regular, FOOTER_FONT_SIZE));

        for (i, page) in pages.iter_mut().enumerate() {
            let page_text = format!("Page {} of {}", i + 1, total);
            let runs = [
                (MARGIN_MM, version.clone()),
                (page_width / 2.0 - width_mm(&effective) / 2.0, effective.clone()),
                (page_width - MARGIN_MM - width_mm(&page_text), page_text),
            ];
            for (x, text) in runs {
                page.ops.push(DrawOp::Text {
                    x,
                    y,
                    text,
                    font: FontId::Regular,
                    size: FOOTER_FONT_SIZE,
                    color: FOOTER_GRAY,
                });
            }
        }
    }
}

/// Composes with the built-in Helvetica metrics, default settings, the
/// host's time zone and no logo.
pub fn compose(template: &WaiverTemplate, submission: &WaiverSubmission) -> Result<Vec<u8>> {
    let fonts = StandardFonts;
    Compositor::new(&fonts, RenderSettings::default(), DisplayZone::local()).compose(
        template,
        submission,
        &RenderAssets::default(),
        Utc::now(),
    )
}

// ============================================================================
// Layout helpers
// ============================================================================

/// Width the info box may take without squeezing the title below its minimum.
fn header_room(content_width: f32, assets: &RenderAssets) -> f32 {
    let logo = if assets.logo.is_some() {
        LOGO_SIZE_MM + HEADER_GAP_MM
    } else {
        0.0
    };
    content_width - logo - MIN_TITLE_WIDTH_MM - HEADER_GAP_MM
}

struct InfoField {
    label: String,
    value: String,
    single_line: bool,
}

impl InfoField {
    fn single_line(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            single_line: true,
        }
    }

    fn wrapped(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            single_line: false,
        }
    }
}

struct InfoRow {
    label: String,
    lines: Vec<String>,
    value_size: f32,
}

impl InfoRow {
    fn height(&self) -> f32 {
        self.lines.len().max(1) as f32 * INFO_LINE_STEP_MM
    }
}

struct InfoBox {
    width: f32,
    height: f32,
    value_x: f32,
    rows: Vec<InfoRow>,
}

/// Per-render drawing state.
struct LayoutContext<'m> {
    measurer: &'m dyn TextMeasurer,
    cursor: LayoutCursor,
    images: Vec<DynamicImage>,
    page_width: f32,
    content_width: f32,
}

impl LayoutContext<'_> {
    fn add_image(&mut self, img: DynamicImage) -> usize {
        self.images.push(img);
        self.images.len() - 1
    }

    fn wrap(&self, text: &str, font: FontId, size: f32, width_mm: f32) -> Vec<MeasuredLine> {
        wrap_text(self.measurer, text, font, size, mm_to_pt(width_mm))
    }

    fn text_centered(&mut self, text: &str, center: f32, y: f32, font: FontId, size: f32, color: Gray) {
        let width = pt_to_mm(self.measurer.width(text, font, size));
        self.cursor.push(DrawOp::Text {
            x: center - width / 2.0,
            y,
            text: text.to_string(),
            font,
            size,
            color,
        });
    }

    /// Wrapped paragraph at `indent` from the left margin. Kept whole
    /// unless it is taller than a page, in which case it flows line by line.
    fn paragraph(&mut self, text: &str, size: f32, font: FontId, indent: f32) {
        let lines = self.wrap(text, font, size, self.content_width - indent);
        if lines.is_empty() {
            return;
        }
        let height = lines.len() as f32 * LINE_HEIGHT_MM;
        let flows = height > self.cursor.usable_height();
        if !flows {
            self.cursor.check_page_break(height);
        }
        for line in lines {
            if flows {
                self.cursor.check_page_break(LINE_HEIGHT_MM);
            }
            let y = self.cursor.y();
            self.cursor.push(DrawOp::Text {
                x: MARGIN_MM + indent,
                y,
                text: line.text,
                font,
                size,
                color: Gray::BLACK,
            });
            self.cursor.advance(LINE_HEIGHT_MM);
        }
    }

    fn heading(&mut self, text: &str) {
        self.paragraph(text, SECTION_FONT_SIZE, FontId::Bold, 0.0);
        self.cursor.advance(2.0);
    }

    /// Bulleted clause; the dot is always drawn beside the first line.
    fn bullet(&mut self, text: &str) {
        let lines = self.wrap(
            text,
            FontId::Regular,
            BODY_FONT_SIZE,
            self.content_width - BULLET_INDENT_MM,
        );
        if lines.is_empty() {
            return;
        }
        let height = lines.len() as f32 * LINE_HEIGHT_MM + 1.0;
        let flows = height > self.cursor.usable_height();
        if !flows {
            self.cursor.check_page_break(height);
        }
        for (i, line) in lines.into_iter().enumerate() {
            if flows {
                self.cursor.check_page_break(LINE_HEIGHT_MM);
            }
            let y = self.cursor.y();
            if i == 0 {
                self.cursor.push(DrawOp::Dot {
                    cx: MARGIN_MM + BULLET_DOT_OFFSET_MM + BULLET_DOT_RADIUS_MM,
                    cy: y - 1.1,
                    radius: BULLET_DOT_RADIUS_MM,
                });
            }
            self.cursor.push(DrawOp::Text {
                x: MARGIN_MM + BULLET_INDENT_MM,
                y,
                text: line.text,
                font: FontId::Regular,
                size: BODY_FONT_SIZE,
                color: Gray::BLACK,
            });
            self.cursor.advance(LINE_HEIGHT_MM);
        }
        self.cursor.advance(1.0);
    }
}
