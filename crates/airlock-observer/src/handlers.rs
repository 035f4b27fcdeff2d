//! REST endpoint handlers for the Observer server.
//!
//! Every handler reads the latest [`ObserverSnapshot`] from [`AppState`].
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | HTML status page |
//! | `GET` | `/api/snapshot` | Full latest snapshot |
//! | `GET` | `/api/agents` | Agents (`?status=active\|eliminated\|ejected\|all`) |
//! | `GET` | `/api/rooms` | Occupants and bodies per room |
//! | `GET` | `/api/events` | Recent-event feed (`?limit=N`, newest last) |

// Axum handlers are async even when they never await.
#![allow(clippy::unused_async)]

use std::fmt::Write as _;
use std::sync::Arc;

use airlock_types::{AgentStatus, ObserverSnapshot};
use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};

use crate::error::ObserverError;
use crate::state::AppState;

/// Query parameters for `GET /api/agents`.
#[derive(Debug, serde::Deserialize)]
pub struct AgentsQuery {
    /// `active`, `eliminated`, `ejected` or `all` (default).
    pub status: Option<String>,
}

/// Query parameters for `GET /api/events`.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Return at most this many of the newest entries.
    pub limit: Option<usize>,
}

fn latest(state: &AppState) -> Result<ObserverSnapshot, ObserverError> {
    state.snapshot().ok_or(ObserverError::NoGame)
}

/// Serve a minimal HTML status page.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(snapshot) = state.snapshot() else {
        return Html(page("<p>Waiting for a game to start.</p>"));
    };

    let active = snapshot
        .agents
        .iter()
        .filter(|a| a.status == AgentStatus::Active)
        .count();
    let mut rooms = String::new();
    for room in snapshot.rooms.iter().filter(|r| !r.occupants.is_empty() || !r.bodies.is_empty()) {
        let occupants: Vec<String> = room.occupants.iter().map(ToString::to_string).collect();
        let _ = write!(
            rooms,
            "<li><b>{}</b>: {}",
            escape_html(room.room.as_str()),
            occupants.join(", ")
        );
        if !room.bodies.is_empty() {
            let bodies: Vec<String> = room.bodies.iter().map(ToString::to_string).collect();
            let _ = write!(rooms, " <span class=\"body\">(bodies: {})</span>", bodies.join(", "));
        }
        rooms.push_str("</li>");
    }
    let mut feed = String::new();
    for entry in snapshot.feed.iter().rev().take(10) {
        let _ = write!(feed, "<li>[round {}] {}</li>", entry.round, escape_html(&entry.message));
    }

    Html(page(&format!(
        r#"<div>
        <div class="metric"><div class="label">Round</div><div class="value">{round}</div></div>
        <div class="metric"><div class="label">Phase</div><div class="value">{phase}</div></div>
        <div class="metric"><div class="label">Outcome</div><div class="value">{outcome}</div></div>
        <div class="metric"><div class="label">Active</div><div class="value">{active}/{total}</div></div>
    </div>
    <h2>Rooms</h2><ul>{rooms}</ul>
    <h2>Recent events</h2><ul>{feed}</ul>"#,
        round = snapshot.round,
        phase = snapshot.phase,
        outcome = snapshot.outcome,
        total = snapshot.agents.len(),
    )))
}

/// Escape text for an HTML element body. Room names come from config.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Airlock Observer</title>
    <style>
        body {{ background: #0d1117; color: #c9d1d9; font-family: monospace; padding: 2rem; max-width: 800px; margin: 0 auto; }}
        h1 {{ color: #58a6ff; }}
        .metric {{ display: inline-block; background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem 1.5rem; margin: 0.5rem 0.5rem 0.5rem 0; }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        .body {{ color: #f85149; }}
        a {{ color: #58a6ff; }}
    </style>
</head>
<body>
    <h1>Airlock Observer</h1>
    {body}
    <h2>API</h2>
    <ul>
        <li><a href="/api/snapshot">/api/snapshot</a></li>
        <li><a href="/api/agents">/api/agents</a></li>
        <li><a href="/api/rooms">/api/rooms</a></li>
        <li><a href="/api/events">/api/events</a></li>
        <li><code>ws://host:port/ws/phases</code></li>
    </ul>
</body>
</html>"#
    )
}

/// Return the full latest snapshot.
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(latest(&state)?))
}

/// List agents, optionally filtered by status.
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AgentsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let filter = match params.status.as_deref().unwrap_or("all") {
        "all" => None,
        "active" => Some(AgentStatus::Active),
        "eliminated" => Some(AgentStatus::Eliminated),
        "ejected" => Some(AgentStatus::Ejected),
        other => return Err(ObserverError::InvalidQuery(format!("unknown status: {other}"))),
    };
    let snapshot = latest(&state)?;
    let agents: Vec<_> = snapshot
        .agents
        .into_iter()
        .filter(|a| filter.is_none_or(|status| a.status == status))
        .collect();
    Ok(Json(serde_json::json!({
        "count": agents.len(),
        "agents": agents,
    })))
}

/// List rooms with their occupants and bodies.
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {

    let rooms = latest(&state)?.rooms;
    Ok(Json(serde_json::json!({
        "count": rooms.len(),
        "rooms": rooms,
    })))
}

/// Return the recent-event feed, oldest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let feed = latest(&state)?.feed;
    let limit = params.limit.unwrap_or(feed.len());
    let skip = feed.len().saturating_sub(limit);
    let events: Vec<_> = feed.into_iter().skip(skip).collect();
    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}
