use crate::ipc::error::{err, layout_err};
use crate::ipc::handlers::setup::PrintSettings;
use crate::ipc::types::Request;
use crate::layout::{self, FitPolicy, GridConfig, LayoutError, LayoutPlan, PageBounds};
use crate::units::{self, Orientation, PaperSize, Unit};
use serde_json::{json, Value};
use tracing::warn;

pub enum HandlerErr {
    Params(String),
    Layout(LayoutError),
    Settings(anyhow::Error),
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::Params(message.into())
    }

    pub fn response(self, id: &str) -> Value {
        match self {
            HandlerErr::Params(message) => err(id, "bad_params", message, None),
            HandlerErr::Layout(e) => layout_err(id, &e),
            HandlerErr::Settings(e) => err(id, "db_query_failed", e.to_string(), None),
        }
    }
}

impl From<LayoutError> for HandlerErr {
    fn from(e: LayoutError) -> Self {
        HandlerErr::Layout(e)
    }
}

impl From<anyhow::Error> for HandlerErr {
    fn from(e: anyhow::Error) -> Self {
        HandlerErr::Settings(e)
    }
}

pub fn required_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    v.as_i64()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be integer", key)))
}

pub fn optional_bool(params: &Value, key: &str) -> Result<Option<bool>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be boolean", key))),
    }
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be string", key))),
    }
}

pub fn parse_unit(params: &Value, default: Unit) -> Result<Unit, HandlerErr> {
    match optional_str(params, "unit")? {
        None => Ok(default),
        Some(s) => Unit::parse(s)
            .ok_or_else(|| HandlerErr::bad_params("unit must be one of: in, mm, pt, px")),
    }
}

pub fn item_count(params: &Value) -> Result<usize, HandlerErr> {
    Ok(layout::item_count(required_i64(params, "itemCount")?)?)
}

/// Printable bounds in inches, either from `params.bounds` (in `unit`) or the
/// printer setup.
pub fn resolve_bounds(
    params: &Value,
    unit: Unit,
    settings: &PrintSettings,
) -> Result<PageBounds, HandlerErr> {
    match params.get("bounds") {
        None | Some(Value::Null) => Ok(printer_bounds(params, settings)?),
        Some(raw) => {
            let Some(obj) = raw.as_object() else {
                return Err(HandlerErr::bad_params("bounds must be an object"));
            };
            let dim = |key: &str| -> Result<f64, HandlerErr> {
                obj.get(key)
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| HandlerErr::bad_params(format!("bounds.{} must be a number", key)))
            };
            let width = dim("availableWidth")?;
            let height = dim("availableHeight")?;
            Ok(PageBounds::new(width, height)?.scaled(unit.to_inches()))
        }
    }
}

/// Bounds from the paper description in `params`, defaulting each part to
/// the printer setup.
pub fn printer_bounds(params: &Value, settings: &PrintSettings) -> Result<PageBounds, HandlerErr> {
    let paper = match optional_str(params, "paperSize")? {
        None => settings.paper_size,
        Some(s) => PaperSize::parse(s)
            .ok_or_else(|| HandlerErr::bad_params("paperSize must be one of: letter, a4, legal"))?,
    };
    let orientation = match optional_str(params, "orientation")? {
        None => settings.orientation,
        Some(s) => Orientation::parse(s).ok_or_else(|| {
            HandlerErr::bad_params("orientation must be one of: portrait, landscape")
        })?,
    };
    let margin_mm = match params.get("marginMm") {
        None | Some(Value::Null) => settings.margin_mm,
        Some(v) => v
            .as_f64()
            .ok_or_else(|| HandlerErr::bad_params("marginMm must be a number"))?,
    };
    Ok(units::printable_bounds(paper, orientation, margin_mm)?)
}

/// Caller-supplied candidates, converted from `unit` to inches.
pub fn parse_candidates(params: &Value, unit: Unit) -> Result<Option<Vec<GridConfig>>, HandlerErr> {
    match params.get("candidates") {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => {
            let table: Vec<GridConfig> = serde_json::from_value(raw.clone()).map_err(|e| {
                HandlerErr::bad_params(format!("candidates must be an array of grid configs: {}", e))
            })?;
            let factor = unit.to_inches();
            Ok(Some(table.iter().map(|c| c.scaled(factor)).collect()))
        }
    }
}

/// Everything a layout-producing handler needs, resolved once.
pub struct ResolvedPlan {
    pub plan: LayoutPlan,
    pub unit: Unit,
    pub bounds: PageBounds,
}

impl ResolvedPlan {
    /// Plan and bounds expressed in the caller's unit.
    pub fn to_json(&self) -> Value {
        let factor = self.unit.per_inch();
        json!({
            "unit": self.unit,
            "bounds": self.bounds.scaled(factor),
            "plan": self.plan.scaled(factor),
        })
    }
}

pub fn resolve_plan(
    req: &Request,
    settings: &PrintSettings,
    item_count: usize,
) -> Result<ResolvedPlan, HandlerErr> {
    let params = &req.params;
    let unit = parse_unit(params, settings.unit)?;
    let bounds = resolve_bounds(params, unit, settings)?;
    let strict = optional_bool(params, "strictFit")?.unwrap_or(settings.strict_fit);
    let policy = if strict {
        FitPolicy::Strict
    } else {
        FitPolicy::Fallback
    };

    let plan = match parse_candidates(params, unit)? {
        Some(table) => {
            layout::plan_layout_with(item_count, &bounds, &table, &layout::SINGLE, policy)?
        }
        None if policy == FitPolicy::Fallback => layout::plan_layout(item_count, &bounds),
        None => layout::plan_layout_with(
            item_count,
            &bounds,
            &layout::CANDIDATES,
            &layout::SINGLE,
            policy,
        )?,
    };
    if plan.fallback_used && settings.warn_on_fallback {
        warn!(
            candidate = %plan.candidate,
            item_count,
            width = bounds.available_width(),
            height = bounds.available_height(),
            "no candidate fits the printable area; using the densest layout"
        );
    }
    Ok(ResolvedPlan { plan, unit, bounds })
}
