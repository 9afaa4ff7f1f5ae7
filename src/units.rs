use crate::layout::{LayoutError, PageBounds};
use serde::{Deserialize, Serialize};

pub const MM_PER_INCH: f64 = 25.4;
pub const PT_PER_INCH: f64 = 72.0;
/// CSS reference pixel.
pub const PX_PER_INCH: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    In,
    Mm,
    Pt,
    Px,
}

impl Unit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "inch" | "inches" => Some(Unit::In),
            "mm" => Some(Unit::Mm),
            "pt" => Some(Unit::Pt),
            "px" => Some(Unit::Px),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::In => "in",
            Unit::Mm => "mm",
            Unit::Pt => "pt",
            Unit::Px => "px",
        }
    }

    pub fn per_inch(self) -> f64 {
        match self {
            Unit::In => 1.0,
            Unit::Mm => MM_PER_INCH,
            Unit::Pt => PT_PER_INCH,
            Unit::Px => PX_PER_INCH,
        }
    }

    /// Factor that converts a length in `self` to inches.
    pub fn to_inches(self) -> f64 {
        1.0 / self.per_inch()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    Letter,
    #[default]
    A4,
    Legal,
}

impl PaperSize {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letter" => Some(PaperSize::Letter),
            "a4" => Some(PaperSize::A4),
            "legal" => Some(PaperSize::Legal),
            _ => None,
        }
    }

    /// Portrait (width, height) in inches.
    pub fn size_in(self) -> (f64, f64) {
        match self {
            PaperSize::Letter => (8.5, 11.0),
            PaperSize::A4 => (210.0 / MM_PER_INCH, 297.0 / MM_PER_INCH),
            PaperSize::Legal => (8.5, 14.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Some(Orientation::Portrait),
            "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }
}

/// Printable area in inches after taking `margin_mm` off every edge.
pub fn printable_bounds(
    paper: PaperSize,
    orientation: Orientation,
    margin_mm: f64,
) -> Result<PageBounds, LayoutError> {
    if !(margin_mm.is_finite() && margin_mm >= 0.0) {
        return Err(LayoutError::invalid("marginMm", "must be a finite number >= 0"));
    }
    let (w, h) = match (paper.size_in(), orientation) {
        ((w, h), Orientation::Portrait) => (w, h),
        ((w, h), Orientation::Landscape) => (h, w),
    };
    let margin = margin_mm / MM_PER_INCH;
    let width = w - 2.0 * margin;
    let height = h - 2.0 * margin;
    if width <= 0.0 || height <= 0.0 {
        return Err(LayoutError::invalid(
            "marginMm",
            "leaves no printable area on the page",
        ));
    }
    PageBounds::new(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn letter_with_half_inch_margins() {
        let b = printable_bounds(PaperSize::Letter, Orientation::Portrait, 12.7).expect("bounds");
        assert!(close(b.available_width(), 7.5));
        assert!(close(b.available_height(), 10.0));
    }

    #[test]
    fn landscape_swaps_axes() {
        let p = printable_bounds(PaperSize::A4, Orientation::Portrait, 12.0).expect("portrait");
        let l = printable_bounds(PaperSize::A4, Orientation::Landscape, 12.0).expect("landscape");
        assert!(close(p.available_width(), l.available_height()));
        assert!(close(p.available_height(), l.available_width()));
    }

    #[test]
    fn margin_that_swallows_page_is_rejected() {
        let e = printable_bounds(PaperSize::Letter, Orientation::Portrait, 120.0)
            .expect_err("no printable area");
        assert_eq!(e.code(), "invalid_argument");
        assert!(printable_bounds(PaperSize::Letter, Orientation::Portrait, -1.0).is_err());
    }

    #[test]
    fn unit_factors_round_trip_through_inches() {
        for unit in [Unit::In, Unit::Mm, Unit::Pt, Unit::Px] {
            assert!(close(7.5 * unit.per_inch() * unit.to_inches(), 7.5));
        }
        assert!(close(612.0 * Unit::Pt.to_inches(), 8.5));
        assert!(close(720.0 * Unit::Px.to_inches(), 7.5));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(Unit::parse("PT"), Some(Unit::Pt));
        assert_eq!(Unit::parse("cm"), None);
        assert_eq!(PaperSize::parse(" A4 "), Some(PaperSize::A4));
        assert_eq!(Orientation::parse("Landscape"), Some(Orientation::Landscape));
    }
}
