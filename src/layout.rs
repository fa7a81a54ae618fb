//! Page plans produced by the compositor and consumed by the painter.
//!
//! Coordinates are millimetres from the top-left corner of the page, with
//! `y` growing downward. Text `y` is the baseline. The painter flips to
//! PDF's bottom-left origin.

use image::DynamicImage;

use crate::metrics::FontId;

/// A grey level, 0 = black, 255 = white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gray(pub u8);

impl Gray {
    pub const BLACK: Gray = Gray(0);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        font: FontId,
        size: f32,
        color: Gray,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness_pt: f32,
        color: Gray,
    },
    /// Stroked outline.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness_pt: f32,
        color: Gray,
    },
    /// Filled bullet dot.
    Dot { cx: f32, cy: f32, radius: f32 },
    /// `index` points into [`DocumentPlan::images`]; `y` is the top edge.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        index: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub ops: Vec<DrawOp>,
}

impl PagePlan {
    /// Text runs on this page in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DocumentPlan {
    pub title: String,
    pub width_mm: f32,
    pub height_mm: f32,
    pub pages: Vec<PagePlan>,
    pub images: Vec<DynamicImage>,
}

impl DocumentPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the first page holding a text run equal to `needle`.
    pub fn page_of(&self, needle: &str) -> Option<usize> {
        self.pages
            .iter()
            .position(|page| page.texts().any(|t| t == needle))
    }

    /// All text runs joined by spaces, pages in order.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|page| page.texts())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Vertical write position threaded through every compositor step.
///
/// Owns the pages laid out so far; drawing always targets the last one.
#[derive(Debug)]
pub struct LayoutCursor {
    y: f32,
    top: f32,
    limit: f32,
    pages: Vec<PagePlan>,
}

impl LayoutCursor {
    /// Starts on page one at `top`. Content may extend down to `limit`.
    pub fn new(top: f32, limit: f32) -> Self {
        Self {
            y: top,
            top,
            limit,
            pages: vec![PagePlan::default()],
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    pub fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    /// Vertical space a fresh page offers.
    pub fn usable_height(&self) -> f32 {
        self.limit - self.top
    }

    pub fn remaining(&self) -> f32 {
        self.limit - self.y
    }

    /// Starts a new page when `height` does not fit below the cursor.
    /// Returns whether a page was added.
    pub fn check_page_break(&mut self, height: f32) -> bool {
        if self.y + height > self.limit {
            self.new_page();
            true
        } else {
            false
        }
    }

    pub fn new_page(&mut self) {
        self.pages.push(PagePlan::default());
        self.y = self.top;
        tracing::debug!(page = self.pages.len(), "page break");
    }

    pub fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn into_pages(self) -> Vec<PagePlan> {
        self.pages
    }
}
