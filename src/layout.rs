//! Grid packing for paged QR code sheets.
//!
//! A sheet is laid out by walking an ordered table of grid candidates, from
//! the fewest/largest codes per page to the most/smallest, and taking the
//! first one whose footprint fits the printable area. Item indices are then
//! split into pages of `columns * rows`.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::ops::Range;
use thiserror::Error;

/// Slack for the fit test, in inches. Footprints such as `4 * (1.6 + 0.3)`
/// and bounds converted from mm/pt/px land a few ulps off their exact value.
const FIT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("{field} {reason}")]
    InvalidArgument { field: String, reason: String },
    #[error("no candidate fits {width} x {height}")]
    NoFittingConfiguration { width: f64, height: f64 },
}

impl LayoutError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LayoutError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LayoutError::InvalidArgument { .. } => "invalid_argument",
            LayoutError::NoFittingConfiguration { .. } => "no_fitting_configuration",
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            LayoutError::InvalidArgument { field, .. } => serde_json::json!({ "field": field }),
            LayoutError::NoFittingConfiguration { width, height } => serde_json::json!({
                "availableWidth": width,
                "availableHeight": height
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Large,
    Medium,
    Small,
    #[serde(rename = "xsmall")]
    ExtraSmall,
}

impl SizeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SizeClass::Large => "large",
            SizeClass::Medium => "medium",
            SizeClass::Small => "small",
            SizeClass::ExtraSmall => "xsmall",
        }
    }
}

/// One candidate grid: a shape paired with the physical size of each code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub name: Cow<'static, str>,
    pub columns: usize,
    pub rows: usize,
    pub size_class: SizeClass,
    pub item_size: f64,
    #[serde(default)]
    pub item_padding: f64,
}

impl GridConfig {
    pub fn per_page(&self) -> usize {
        self.columns * self.rows
    }

    pub fn pitch(&self) -> f64 {
        self.item_size + self.item_padding
    }

    /// Total (width, height) the grid occupies on the page.
    pub fn footprint(&self) -> (f64, f64) {
        let pitch = self.pitch();
        (self.columns as f64 * pitch, self.rows as f64 * pitch)
    }

    pub fn fits(&self, bounds: &PageBounds) -> bool {
        let (w, h) = self.footprint();
        w <= bounds.available_width + FIT_EPSILON && h <= bounds.available_height + FIT_EPSILON
    }

    pub fn scaled(&self, factor: f64) -> GridConfig {
        GridConfig {
            item_size: self.item_size * factor,
            item_padding: self.item_padding * factor,
            ..self.clone()
        }
    }

    fn validate(&self, field: &str) -> Result<(), LayoutError> {
        if self.columns == 0 {
            return Err(LayoutError::invalid(format!("{field}.columns"), "must be > 0"));
        }
        if self.rows == 0 {
            return Err(LayoutError::invalid(format!("{field}.rows"), "must be > 0"));
        }
        if self.columns.checked_mul(self.rows).is_none() {
            return Err(LayoutError::invalid(field, "columns * rows overflows"));
        }
        if !(self.item_size.is_finite() && self.item_size > 0.0) {
            return Err(LayoutError::invalid(
                format!("{field}.itemSize"),
                "must be a finite number > 0",
            ));
        }
        if !(self.item_padding.is_finite() && self.item_padding >= 0.0) {
            return Err(LayoutError::invalid(
                format!("{field}.itemPadding"),
                "must be a finite number >= 0",
            ));
        }
        Ok(())
    }
}

/// Used for a lone code; never fit-tested.
pub const SINGLE: GridConfig = GridConfig {
    name: Cow::Borrowed("single"),
    columns: 1,
    rows: 1,
    size_class: SizeClass::Large,
    item_size: 4.0,
    item_padding: 0.5,
};

/// Built-in candidates in inches, in priority order.
pub const CANDIDATES: [GridConfig; 3] = [
    GridConfig {
        name: Cow::Borrowed("medium-2x3"),
        columns: 2,
        rows: 3,
        size_class: SizeClass::Medium,
        item_size: 2.6,
        item_padding: 0.4,
    },
    GridConfig {
        name: Cow::Borrowed("small-3x4"),
        columns: 3,
        rows: 4,
        size_class: SizeClass::Small,
        item_size: 1.6,
        item_padding: 0.3,
    },
    GridConfig {
        name: Cow::Borrowed("xsmall-4x5"),
        columns: 4,
        rows: 5,
        size_class: SizeClass::ExtraSmall,
        item_size: 1.1,
        item_padding: 0.25,
    },
];

/// Checks a caller-supplied candidate table before it is used for planning.
pub fn validate_candidates(candidates: &[GridConfig]) -> Result<(), LayoutError> {
    if candidates.is_empty() {
        return Err(LayoutError::invalid("candidates", "must not be empty"));
    }
    let mut prev_per_page = 0;
    for (i, c) in candidates.iter().enumerate() {
        c.validate(&format!("candidates[{i}]"))?;
        if c.per_page() < prev_per_page {
            return Err(LayoutError::invalid(
                format!("candidates[{i}]"),
                "must not hold fewer items per page than the candidate before it",
            ));
        }
        prev_per_page = c.per_page();
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBounds {
    available_width: f64,
    available_height: f64,
}

impl PageBounds {
    pub fn new(available_width: f64, available_height: f64) -> Result<Self, LayoutError> {
        if !(available_width.is_finite() && available_width > 0.0) {
            return Err(LayoutError::invalid(
                "bounds.availableWidth",
                "must be a finite number > 0",
            ));
        }
        if !(available_height.is_finite() && available_height > 0.0) {
            return Err(LayoutError::invalid(
                "bounds.availableHeight",
                "must be a finite number > 0",
            ));
        }
        Ok(PageBounds {
            available_width,
            available_height,
        })
    }

    pub fn available_width(&self) -> f64 {
        self.available_width
    }

    pub fn available_height(&self) -> f64 {
        self.available_height
    }

    pub fn scaled(&self, factor: f64) -> PageBounds {
        PageBounds {
            available_width: self.available_width * factor,
            available_height: self.available_height * factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitPolicy {
    /// Use the densest candidate when nothing fits.
    #[default]
    Fallback,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPlan {
    pub candidate: Cow<'static, str>,
    pub columns: usize,
    pub rows: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub item_count: usize,
    pub size_class: SizeClass,
    pub item_size: f64,
    pub item_padding: f64,
    pub fallback_used: bool,
}

impl LayoutPlan {
    fn from_config(config: &GridConfig, item_count: usize, fallback_used: bool) -> Self {
        let per_page = config.per_page();
        LayoutPlan {
            candidate: config.name.clone(),
            columns: config.columns,
            rows: config.rows,
            per_page,
            total_pages: item_count.div_ceil(per_page),
            item_count,
            size_class: config.size_class,
            item_size: config.item_size,
            item_padding: config.item_padding,
            fallback_used,
        }
    }

    pub fn pages(&self) -> Pagination {
        Pagination {
            item_count: self.item_count,
            per_page: self.per_page,
        }
    }

    pub fn scaled(&self, factor: f64) -> LayoutPlan {
        LayoutPlan {
            item_size: self.item_size * factor,
            item_padding: self.item_padding * factor,
            ..self.clone()
        }
    }
}

/// Converts a wire-level count, rejecting negatives.
pub fn item_count(raw: i64) -> Result<usize, LayoutError> {
    usize::try_from(raw).map_err(|_| LayoutError::invalid("itemCount", "must be >= 0"))
}

/// Plans with the built-in table, falling back to the densest candidate.
pub fn plan_layout(item_count: usize, bounds: &PageBounds) -> LayoutPlan {
    if item_count == 1 {
        return LayoutPlan::from_config(&SINGLE, 1, false);
    }
    match CANDIDATES.iter().find(|c| c.fits(bounds)) {
        Some(c) => LayoutPlan::from_config(c, item_count, false),
        None => LayoutPlan::from_config(&CANDIDATES[CANDIDATES.len() - 1], item_count, true),
    }
}

pub fn plan_layout_with(
    item_count: usize,
    bounds: &PageBounds,
    candidates: &[GridConfig],
    single: &GridConfig,
    policy: FitPolicy,
) -> Result<LayoutPlan, LayoutError> {
    validate_candidates(candidates)?;
    single.validate("single")?;
    if item_count == 1 {
        return Ok(LayoutPlan::from_config(single, 1, false));
    }
    if let Some(c) = candidates.iter().find(|c| c.fits(bounds)) {
        return Ok(LayoutPlan::from_config(c, item_count, false));
    }
    match policy {
        FitPolicy::Strict => Err(LayoutError::NoFittingConfiguration {
            width: bounds.available_width,
            height: bounds.available_height,
        }),
        // Non-empty: checked by validate_candidates.
        FitPolicy::Fallback => Ok(LayoutPlan::from_config(
            &candidates[candidates.len() - 1],
            item_count,
            true,
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_number: usize,
    pub item_indices: Range<usize>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.item_indices.len()
    }

    /// Grid cells for this page, filled row by row.
    pub fn cells(&self, columns: usize) -> impl Iterator<Item = Cell> + '_ {
        let columns = columns.max(1);
        self.item_indices
            .clone()
            .enumerate()
            .map(move |(slot, item_index)| Cell {
                item_index,
                row: slot / columns,
                column: slot % columns,
            })
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let indices: Vec<usize> = self.item_indices.clone().collect();
        let mut st = serializer.serialize_struct("Page", 2)?;
        st.serialize_field("pageNumber", &self.page_number)?;
        st.serialize_field("itemIndices", &indices)?;
        st.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub item_index: usize,
    pub row: usize,
    pub column: usize,
}

/// The page partition of `[0, item_count)`. Iterating it again yields the
/// same pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    item_count: usize,
    per_page: usize,
}

impl Pagination {
    pub fn total_pages(&self) -> usize {
        self.item_count.div_ceil(self.per_page)
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn iter(&self) -> Pages {
        Pages {
            item_count: self.item_count,
            per_page: self.per_page,
            next_start: 0,
        }
    }
}

impl IntoIterator for Pagination {
    type Item = Page;
    type IntoIter = Pages;

    fn into_iter(self) -> Pages {
        self.iter()
    }
}

impl IntoIterator for &Pagination {
    type Item = Page;
    type IntoIter = Pages;

    fn into_iter(self) -> Pages {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Pages {
    item_count: usize,
    per_page: usize,
    next_start: usize,
}

impl Iterator for Pages {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        if self.next_start >= self.item_count {
            return None;
        }
        let start = self.next_start;
        let end = start.saturating_add(self.per_page).min(self.item_count);
        self.next_start = end;
        Some(Page {
            page_number: start / self.per_page + 1,
            item_indices: start..end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .item_count
            .saturating_sub(self.next_start)
            .div_ceil(self.per_page);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Pages {}

pub fn paginate(item_count: usize, per_page: usize) -> Result<Pagination, LayoutError> {
    if per_page == 0 {
        return Err(LayoutError::invalid("perPage", "must be > 0"));
    }
    Ok(Pagination {
        item_count,
        per_page,
    })
}
