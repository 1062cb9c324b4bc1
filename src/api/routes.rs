//! Status route definitions.

use super::state::AppState;
use crate::report::escape_html;
use axum::extract::State;
use axum::response::Html;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

/// `GET /health` -- machine-readable liveness document.
async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = Utc::now();
    Json(json!({
        "status": "ok",
        "service": state.service,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": now.to_rfc3339(),
        "localTime": state.zone.format(&now),
        "uptime": state.uptime_secs(),
        "targetCount": state.targets.len(),
        "bots": state.targets.len(),
        "schedule": state.schedule,
    }))
}

/// `GET /` -- human-readable status page.
async fn index(State(state): State<AppState>) -> Html<String> {
    let now = Utc::now();
    let rows: String = state
        .targets
        .iter()
        .map(|t| {
            format!(
                "<li><b>{}</b> &mdash; {}</li>",
                escape_html(&t.name),
                escape_html(&t.description)
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{service}</title></head>
<body>
<h1>{service} is running</h1>
<p>Local time: {local}</p>
<p>Uptime: {uptime}s</p>
<h2>Targets ({count})</h2>
<ul>{rows}</ul>
<h2>Schedule</h2>
<ul>
<li>Incident check: <code>{incident}</code></li>
<li>Full report: <code>{full}</code></li>
<li>Time zone: {tz}</li>
</ul>
<p><a href="/health">/health</a></p>
</body>
</html>"#,
        service = escape_html(&state.service),
        local = state.zone.format(&now),
        uptime = state.uptime_secs(),
        count = state.targets.len(),
        rows = rows,
        incident = escape_html(&state.schedule.incident_check),
        full = escape_html(&state.schedule.full_report),
        tz = escape_html(&state.schedule.timezone),
    ))
}
