use crate::ipc::error::ok;
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{self, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

/// Print model for a batch of attendance QR codes: the chosen grid plus every
/// item placed on its page, row and column. Items are passed through as-is.
fn qr_codes_model(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let settings = setup::print_settings(state)?;
    let Some(items) = req.params.get("items").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("items must be an array"));
    };
    let title = match req.params.get("title") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| HandlerErr::bad_params("title must be string"))?
                .trim()
                .to_string(),
        ),
    };

    let resolved = helpers::resolve_plan(req, &settings, items.len())?;
    let plan = &resolved.plan;

    let pages: Vec<Value> = plan
        .pages()
        .iter()
        .map(|page| {
            let cells: Vec<Value> = page
                .cells(plan.columns)
                .map(|cell| {
                    json!({
                        "index": cell.item_index,
                        "row": cell.row,
                        "column": cell.column,
                        "item": items[cell.item_index]
                    })
                })
                .collect();
            json!({
                "pageNumber": page.page_number,
                "itemCount": page.len(),
                "items": cells
            })
        })
        .collect();

    let mut warnings: Vec<String> = Vec::new();
    if plan.fallback_used && settings.warn_on_fallback {
        warnings.push(format!(
            "no layout fits the printable area; codes are printed at the {} size and may overflow",
            plan.size_class.as_str()
        ));
    }

    let mut model = resolved.to_json();
    model["title"] = json!(title);
    model["pages"] = json!(pages);
    model["warnings"] = json!(warnings);
    if settings.show_generated_at {
        model["generatedAt"] = json!(chrono::Local::now().to_rfc3339());
    }
    Ok(model)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "sheets.qrCodesModel" => qr_codes_model(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
