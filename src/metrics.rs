//! Text measurement against font metrics.
//!
//! Layout code never asks a PDF backend how wide a string is. It goes
//! through [`TextMeasurer`], so the same wrapping and fitting logic runs
//! against the real Helvetica metrics in production and against a
//! fixed-advance fake in tests. All widths are in PDF points.

// ============================================================================
// Fonts
// ============================================================================

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

pub fn pt_to_mm(pt: f32) -> f32 {
    pt / PT_PER_MM
}

/// The three faces the engine draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontId {
    Regular,
    Bold,
    Italic,
}

/// Measures rendered string widths.
pub trait TextMeasurer {
    /// Width of `text` in points when set in `font` at `size` points.
    fn width(&self, text: &str, font: FontId, size: f32) -> f32;
}

/// A string known to render within the width it was wrapped to.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredLine {
    pub text: String,
    /// Rendered width in points.
    pub width: f32,
}

// ============================================================================
// Standard 14 Helvetica metrics
// ============================================================================

// Helvetica / Helvetica-Oblique advance widths for 32..=126, 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

// Helvetica-Bold advance widths for 32..=126, 1/1000 em
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

/// Metrics of the built-in Helvetica family, the faces both the
/// compositor and the annotator draw with.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFonts;

impl StandardFonts {
    fn advance(ch: char, font: FontId) -> u16 {
        let table = match font {
            FontId::Regular | FontId::Italic => &HELVETICA_WIDTHS,
            FontId::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match ch {
            ' '..='~' => table[ch as usize - 32],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' => 1000,
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201C}' | '\u{201D}' => 333,
            _ => FALLBACK_WIDTH,
        }
    }
}

impl TextMeasurer for StandardFonts {
    fn width(&self, text: &str, font: FontId, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| Self::advance(c, font) as u32).sum();
        units as f32 * size / 1000.0
    }
}

/// Deterministic measurer: every character advances by the same
/// fraction of the font size, bold slightly wider.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub advance_em: f32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self { advance_em: 0.5 }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn width(&self, text: &str, font: FontId, size: f32) -> f32 {
        let advance = match font {
            FontId::Bold => self.advance_em * 1.1,
            FontId::Regular | FontId::Italic => self.advance_em,
        };
        text.chars().count() as f32 * advance * size
    }
}

// ============================================================================
// Wrapping and fitting
// ============================================================================

/// Word-wraps `text` so every line renders within `max_width` points.
///
/// Explicit newlines start a new line. Words wider than `max_width` are
/// split between characters. Whitespace-only input yields no lines.
pub fn wrap_text(
    measurer: &dyn TextMeasurer,
    text: &str,
    font: FontId,
    size: f32,
    max_width: f32,
) -> Vec<MeasuredLine> {
    let mut lines = Vec::new();
    if text.trim().is_empty() {
        return lines;
    }

    let space_width = measurer.width(" ", font, size);

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = measurer.width(word, font, size);

            if !current.is_empty() && current_width + space_width + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space_width + word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(MeasuredLine {
                    text: std::mem::take(&mut current),
                    width: current_width,
                });
            }

            if word_width <= max_width {
                current = word.to_string();
                current_width = word_width;
            } else {
                let mut pieces = split_word(measurer, word, font, size, max_width);
                let last = pieces.pop();
                lines.extend(pieces);
                if let Some(last) = last {
                    current = last.text;
                    current_width = last.width;
                }
            }
        }

        lines.push(MeasuredLine {
            text: current,
            width: current_width,
        });
    }

    lines
}

/// Breaks a single unbreakable token into pieces no wider than `max_width`.
/// Each piece holds at least one character.
fn split_word(
    measurer: &dyn TextMeasurer,
    word: &str,
    font: FontId,
    size: f32,
    max_width: f32,
) -> Vec<MeasuredLine> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_width = 0.0;

    for ch in word.chars() {
        let mut buf = [0u8; 4];
        let ch_width = measurer.width(ch.encode_utf8(&mut buf), font, size);
        if !piece.is_empty() && piece_width + ch_width > max_width {
            pieces.push(MeasuredLine {
                text: std::mem::take(&mut piece),
                width: piece_width,
            });
            piece_width = 0.0;
        }
        piece.push(ch);
        piece_width += ch_width;
    }

    if !piece.is_empty() {
        pieces.push(MeasuredLine {
            text: piece,
            width: piece_width,
        });
    }
    pieces
}

/// Largest size in `[floor, start]`, stepping down by `step`, at which
/// `text` fits in `max_width`. Returns `floor` when nothing fits.
pub fn fit_font_size(
    measurer: &dyn TextMeasurer,
    text: &str,
    font: FontId,
    start: f32,
    floor: f32,
    step: f32,
    max_width: f32,
) -> f32 {
    let mut size = start;
    while size > floor && measurer.width(text, font, size) > max_width {
        size = (size - step).max(floor);
    }
    size
}

/// Cuts `text` down to fit `max_width`, marking the cut with "...".
pub fn truncate_to_width(
    measurer: &dyn TextMeasurer,
    text: &str,
    font: FontId,
    size: f32,
    max_width: f32,
) -> String {
    if measurer.width(text, font, size) <= max_width {
        return text.to_string();
    }

    let ellipsis = "...";
    let budget = max_width - measurer.width(ellipsis, font, size);
    let mut kept = String::new();
    for ch in text.chars() {
        kept.push(ch);
        if measurer.width(&kept, font, size) > budget {
            kept.pop();
            break;
        }
    }
    kept.push_str(ellipsis);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(lines: &[MeasuredLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn helvetica_widths_match_afm() {
        let fonts = StandardFonts;
        // H 722, e 556, l 222, l 222, o 556
        assert!((fonts.width("Hello", FontId::Regular, 1000.0) - 2278.0).abs() < 0.01);
        // H 722, e 556, l 278, l 278, o 611
        assert!((fonts.width("Hello", FontId::Bold, 1000.0) - 2445.0).abs() < 0.01);
        assert_eq!(fonts.width("", FontId::Regular, 12.0), 0.0);
    }

    #[test]
    fn italic_shares_regular_metrics() {
        let fonts = StandardFonts;
        assert_eq!(
            fonts.width("[Signature]", FontId::Italic, 9.0),
            fonts.width("[Signature]", FontId::Regular, 9.0)
        );
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        // 1pt per char at size 1
        let lines = wrap_text(&m, "aaa bbb ccc", FontId::Regular, 1.0, 7.0);
        assert_eq!(texts(&lines), vec!["aaa bbb", "ccc"]);
        assert!(lines.iter().all(|l| l.width <= 7.0));
    }

    #[test]
    fn splits_words_longer_than_line() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        let lines = wrap_text(&m, "abcdefghij", FontId::Regular, 1.0, 4.0);
        assert_eq!(texts(&lines), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn long_word_continues_on_its_last_piece() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        let lines = wrap_text(&m, "ab cdefgh i", FontId::Regular, 1.0, 4.0);
        assert_eq!(texts(&lines), vec!["ab", "cdef", "gh i"]);
    }

    #[test]
    fn keeps_explicit_line_breaks() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        let lines = wrap_text(&m, "one\n\ntwo", FontId::Regular, 1.0, 50.0);
        assert_eq!(texts(&lines), vec!["one", "", "two"]);
    }

    #[test]
    fn blank_text_has_no_lines() {
        let m = MonospaceMeasurer::default();
        assert!(wrap_text(&m, "   ", FontId::Regular, 9.0, 100.0).is_empty());
    }

    #[test]
    fn fit_shrinks_until_text_fits() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        // 10 chars: width = 10 * size
        let size = fit_font_size(&m, "0123456789", FontId::Regular, 9.0, 6.0, 0.5, 75.0);
        assert_eq!(size, 7.5);
    }

    #[test]
    fn fit_stops_at_floor() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        let size = fit_font_size(&m, "0123456789", FontId::Regular, 9.0, 6.0, 0.5, 10.0);
        assert_eq!(size, 6.0);
    }

    #[test]
    fn truncation_marks_the_cut() {
        let m = MonospaceMeasurer { advance_em: 1.0 };
        let out = truncate_to_width(&m, "PAS-ABCDEFGHJK", FontId::Regular, 1.0, 8.0);
        assert_eq!(out, "PAS-A...");
        assert_eq!(truncate_to_width(&m, "short", FontId::Regular, 1.0, 8.0), "short");
    }

    #[test]
    fn unit_conversion_round_trips() {
        assert!((pt_to_mm(mm_to_pt(25.4)) - 25.4).abs() < 1e-4);
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
    }
}
