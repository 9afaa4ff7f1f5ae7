use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::units::{Orientation, PaperSize, Unit};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Printer,
    Layout,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "printer" => Some(Self::Printer),
            "layout" => Some(Self::Layout),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Printer => "setup.printer",
            Self::Layout => "setup.layout",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Printer => json!({
            "paperSize": "a4",
            "orientation": "portrait",
            "defaultMarginMm": 12,
            "showGeneratedAt": true
        }),
        SetupSection::Layout => json!({
            "strictFit": false,
            "unit": "in",
            "warnOnFallback": true
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_bool(v: &Value, key: &str) -> Result<bool, String> {
    v.as_bool()
        .ok_or_else(|| format!("{} must be boolean", key))
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Printer => match k.as_str() {
                "paperSize" => {
                    let s = parse_string_max(v, k, 16)?;
                    if PaperSize::parse(&s).is_none() {
                        return Err("paperSize must be one of: letter, a4, legal".into());
                    }
                    obj.insert(k.clone(), Value::String(s.to_ascii_lowercase()));
                }
                "orientation" => {
                    let s = parse_string_max(v, k, 16)?;
                    if Orientation::parse(&s).is_none() {
                        return Err("orientation must be one of: portrait, landscape".into());
                    }
                    obj.insert(k.clone(), Value::String(s.to_ascii_lowercase()));
                }
                "defaultMarginMm" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 5, 30)?));
                }
                "showGeneratedAt" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                _ => return Err(format!("unknown printer field: {}", k)),
            },
            SetupSection::Layout => match k.as_str() {
                "strictFit" | "warnOnFallback" => {
                    obj.insert(k.clone(), Value::Bool(parse_bool(v, k)?));
                }
                "unit" => {
                    let s = parse_string_max(v, k, 8)?;
                    let Some(unit) = Unit::parse(&s) else {
                        return Err("unit must be one of: in, mm, pt, px".into());
                    };
                    obj.insert(k.clone(), Value::String(unit.as_str().to_string()));
                }
                _ => return Err(format!("unknown layout field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: malformed historical values should not block printing.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

fn section_or_default(state: &AppState, section: SetupSection) -> anyhow::Result<Value> {
    match state.db.as_ref() {
        Some(conn) => load_section(conn, section),
        None => Ok(default_section(section)),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrinterSection {
    paper_size: PaperSize,
    orientation: Orientation,
    default_margin_mm: f64,
    show_generated_at: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutSection {
    strict_fit: bool,
    unit: Unit,
    warn_on_fallback: bool,
}

/// Printer and layout preferences in effect for a request. Falls back to the
/// built-in defaults when no workspace is open.
#[derive(Debug, Clone)]
pub struct PrintSettings {
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    pub margin_mm: f64,
    pub show_generated_at: bool,
    pub strict_fit: bool,
    pub unit: Unit,
    pub warn_on_fallback: bool,
}

pub fn print_settings(state: &AppState) -> anyhow::Result<PrintSettings> {
    let printer: PrinterSection =
        serde_json::from_value(section_or_default(state, SetupSection::Printer)?)?;
    let layout: LayoutSection =
        serde_json::from_value(section_or_default(state, SetupSection::Layout)?)?;
    Ok(PrintSettings {
        paper_size: printer.paper_size,
        orientation: printer.orientation,
        margin_mm: printer.default_margin_mm,
        show_generated_at: printer.show_generated_at,
        strict_fit: layout.strict_fit,
        unit: layout.unit,
        warn_on_fallback: layout.warn_on_fallback,
    })
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let printer = match load_section(conn, SetupSection::Printer) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let layout = match load_section(conn, SetupSection::Layout) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "printer": printer,
            "layout": layout
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section_raw, "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_workspace() {
        let state = AppState::default();
        let s = print_settings(&state).expect("defaults");
        assert_eq!(s.paper_size, PaperSize::A4);
        assert_eq!(s.orientation, Orientation::Portrait);
        assert_eq!(s.margin_mm, 12.0);
        assert!(s.show_generated_at);
        assert!(!s.strict_fit);
        assert_eq!(s.unit, Unit::In);
        assert!(s.warn_on_fallback);
    }

    #[test]
    fn patch_canonicalizes_and_validates() {
        let mut current = default_section(SetupSection::Printer);
        let patch = json!({ "paperSize": "Letter", "defaultMarginMm": 20 });
        merge_section_patch(
            SetupSection::Printer,
            &mut current,
            patch.as_object().expect("object"),
        )
        .expect("merge");
        assert_eq!(current["paperSize"], "letter");
        assert_eq!(current["defaultMarginMm"], 20);

        let bad = json!({ "defaultMarginMm": 2 });
        let e = merge_section_patch(
            SetupSection::Printer,
            &mut current,
            bad.as_object().expect("object"),
        )
        .expect_err("out of range");
        assert_eq!(e, "defaultMarginMm must be in 5..=30");

        let mut layout = default_section(SetupSection::Layout);
        let unknown = json!({ "columns": 3 });
        assert!(merge_section_patch(
            SetupSection::Layout,
            &mut layout,
            unknown.as_object().expect("object"),
        )
        .is_err());
    }
}
