use crate::alerts::send_due_alerts;
use crate::app::AppState;
use crate::auth::authorize_cron;
use crate::db::sync_state;
use crate::errors::ServerError;
use crate::responses::{error_to_response, json_response, ResultResp};
use crate::sync::{run_sync, SyncContext, SyncMode, SyncOptions};
use astra::{Request, Response};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;

/// Route a request and turn any error into its JSON error response.
pub fn respond(req: Request, state: &AppState) -> Response {
    match handle(req, state) {
        Ok(resp) => resp,
        Err(err) => error_to_response(err),
    }
}

pub fn handle(req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();
    let params = parse_query(&req);

    match (method, path) {
        ("GET", "/health") => json_response(200, &json!({ "ok": true })),

        // Scheduler endpoints
        ("GET" | "POST", "/api/sync-listings") => sync_listings(&req, &params, state),
        ("GET" | "POST", "/api/send-alerts") => send_alerts(&req, &params, state),
        ("GET", "/api/sync-status") => sync_status(&req, &params, state),

        _ => Err(ServerError::NotFound),
    }
}

fn cron_guard(req: &Request, params: &HashMap<String, String>, state: &AppState) -> Result<(), ServerError> {
    authorize_cron(
        req,
        params.get("secret").map(String::as_str),
        state.config.cron_secret.as_deref(),
    )
}

fn sync_listings(req: &Request, params: &HashMap<String, String>, state: &AppState) -> ResultResp {
    cron_guard(req, params, state)?;

    let mode = SyncMode::parse(params.get("mode").map(String::as_str))?;
    let reset = params.get("reset").is_some_and(|v| is_truthy(v));

    let ctx = SyncContext {
        db: &state.db,
        feed: &*state.feed,
        alerts: &*state.alerts,
        settings: &state.config.sync,
    };
    let report = run_sync(&ctx, SyncOptions { mode, reset }, Utc::now())?;

    json_response(200, &report)
}

fn send_alerts(req: &Request, params: &HashMap<String, String>, state: &AppState) -> ResultResp {
    cron_guard(req, params, state)?;

    let mailer = state
        .mailer
        .as_deref()
        .ok_or_else(|| ServerError::Config("BREVO_API_KEY environment variable not set".into()))?;

    let report = send_due_alerts(&state.db, mailer, &state.config.site_url, Utc::now())?;
    json_response(200, &report)
}

fn sync_status(req: &Request, params: &HashMap<String, String>, state: &AppState) -> ResultResp {
    cron_guard(req, params, state)?;

    let (current, holder) = state
        .db
        .with_conn(|conn| Ok((sync_state::read(conn)?, sync_state::lock_holder(conn)?)))?;
    json_response(
        200,
        &json!({
            "success": true,
            "running": holder.is_some(),
            "lockExpiresAt": current.lock_expires_at,
            "state": current,
        }),
    )
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}
