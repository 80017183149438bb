//! Web dashboard for the download queue.
//!
//! One page: the queue in order with the active job marked "(downloading)",
//! and a form that enqueues a URL. Everything else (retries, selection, the
//! worker) stays in the `run` loop; the dashboard only reads the stores and
//! appends to the queue, so it can run alongside a worker process.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use dq_core::audit::AuditLog;
use dq_core::config::DqConfig;
use dq_core::error::StoreError;
use dq_core::queue::QueueStore;
use dq_core::retry::RetryLedger;
use dq_core::state::StateStore;

/// Stores shared by the handlers.
pub struct WebState {
    queue: QueueStore,
    ledger: RetryLedger,
}

impl WebState {
    pub fn new(queue: QueueStore, ledger: RetryLedger) -> Self {
        WebState { queue, ledger }
    }

    pub fn from_config(cfg: &DqConfig) -> Self {
        WebState::new(
            QueueStore::new(cfg.queue.clone()),
            RetryLedger::new(
                StateStore::new(cfg.state.clone()),
                AuditLog::new(cfg.failed_log.clone()),
                AuditLog::new(cfg.completed_log.clone()),
                cfg.max_retries,
            ),
        )
    }
}

pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/", get(dashboard).post(add_url))
        .with_state(state)
}

async fn dashboard(State(state): State<Arc<WebState>>) -> Result<Html<String>, StatusCode> {
    let urls = state.queue.list().map_err(internal_error)?;
    let current = state
        .ledger
        .get_active(&state.queue)
        .map_err(internal_error)?;
    Ok(Html(render(&urls, current.as_deref())))
}

#[derive(Debug, Deserialize)]
struct AddForm {
    url: String,
}

async fn add_url(
    State(state): State<Arc<WebState>>,
    Form(form): Form<AddForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let url = form.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("not an HTTP(S) URL: {url}"),
        ));
    }
    state.queue.append([url]).map_err(|e| {
        tracing::error!(error = %e, "enqueue from dashboard failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage unavailable".to_string(),
        )
    })?;
    tracing::info!(url, "queued from dashboard");
    Ok(Redirect::to("/"))
}

fn internal_error(e: StoreError) -> StatusCode {
    tracing::error!(error = %e, "dashboard read failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn render(urls: &[String], current: Option<&str>) -> String {
    let mut items = String::new();
    if urls.is_empty() {
        items.push_str("        <li>Queue is empty.</li>\n");
    }
    for url in urls {
        let marker = if Some(url.as_str()) == current {
            " (downloading)"
        } else {
            ""
        };
        items.push_str(&format!(
            "        <li><code>{}</code>{}</li>\n",
            escape(url),
            marker
        ));
    }
    format!(
        "<!DOCTYPE html>\n\
         <html>\n<head><title>dq</title></head>\n<body>\n\
         <h2>Queue</h2>\n    <ul>\n{items}    </ul>\n\
         <h2>Add a URL</h2>\n\
         <form method=\"POST\" action=\"/\">\n\
         \x20   <input type=\"text\" name=\"url\" style=\"width: 25em;\">\n\
         \x20   <input type=\"submit\" value=\"Add URL\">\n\
         </form>\n\
         </body>\n</html>\n"
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
