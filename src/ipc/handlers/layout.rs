use crate::ipc::error::ok;
use crate::ipc::handlers::setup::{self, PrintSettings};
use crate::ipc::helpers::{self, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::layout::{self, GridConfig, Page};
use serde_json::json;

/// Largest partition `layout.paginate` will spell out index by index.
const MAX_PAGINATE_ITEMS: usize = 100_000;

fn settings(state: &AppState) -> Result<PrintSettings, HandlerErr> {
    Ok(setup::print_settings(state)?)
}

fn config_json(config: &GridConfig, factor: f64) -> serde_json::Value {
    let scaled = config.scaled(factor);
    let (width, height) = scaled.footprint();
    json!({
        "name": scaled.name,
        "columns": scaled.columns,
        "rows": scaled.rows,
        "perPage": scaled.per_page(),
        "sizeClass": scaled.size_class,
        "itemSize": scaled.item_size,
        "itemPadding": scaled.item_padding,
        "footprint": { "width": width, "height": height }
    })
}

fn layout_candidates(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let settings = settings(state)?;
    let unit = helpers::parse_unit(&req.params, settings.unit)?;
    let factor = unit.per_inch();
    let candidates: Vec<serde_json::Value> = layout::CANDIDATES
        .iter()
        .map(|c| config_json(c, factor))
        .collect();
    Ok(json!({
        "unit": unit,
        "single": config_json(&layout::SINGLE, factor),
        "candidates": candidates
    }))
}

fn layout_page_bounds(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let settings = settings(state)?;
    let unit = helpers::parse_unit(&req.params, settings.unit)?;
    let bounds = helpers::printer_bounds(&req.params, &settings)?;
    Ok(json!({
        "unit": unit,
        "bounds": bounds.scaled(unit.per_inch())
    }))
}

fn layout_plan(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let settings = settings(state)?;
    let item_count = helpers::item_count(&req.params)?;
    let resolved = helpers::resolve_plan(req, &settings, item_count)?;
    Ok(resolved.to_json())
}

fn layout_paginate(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let item_count = helpers::item_count(&req.params)?;
    if item_count > MAX_PAGINATE_ITEMS {
        return Err(layout::LayoutError::invalid(
            "itemCount",
            format!("must be <= {}", MAX_PAGINATE_ITEMS),
        )
        .into());
    }
    let per_page = helpers::required_i64(&req.params, "perPage")?;
    let per_page = usize::try_from(per_page)
        .map_err(|_| layout::LayoutError::invalid("perPage", "must be > 0"))?;
    let pagination = layout::paginate(item_count, per_page)?;
    let pages: Vec<Page> = pagination.iter().collect();
    Ok(json!({
        "itemCount": pagination.item_count(),
        "perPage": pagination.per_page(),
        "totalPages": pagination.total_pages(),
        "pages": pages
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "layout.candidates" => layout_candidates(state, req),
        "layout.pageBounds" => layout_page_bounds(state, req),
        "layout.plan" => layout_plan(state, req),
        "layout.paginate" => layout_paginate(req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
