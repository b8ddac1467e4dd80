//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tracing::{info, warn};

use crate::{monitor::ActivityEvent, state::AppState};
use super::responses::{ActivityResponse, ApiResponse, HealthResponse, StatusResponse};

/// Handle POST /session/start - Begin inactivity monitoring
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.navigation.clear();
    state.monitor.start();
    state.record_action("start");
    info!("Start endpoint called - monitoring enabled");

    Json(ApiResponse::monitoring("Inactivity monitoring started", state.monitor.status()))
}

/// Handle POST /session/stop - Stop inactivity monitoring
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.monitor.stop();
    state.record_action("stop");
    info!("Stop endpoint called - monitoring disabled");

    Json(ApiResponse::stopped("Inactivity monitoring stopped", state.monitor.status()))
}

/// Handle POST /activity - Feed a client input event to the monitor
pub async fn activity_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ActivityEvent>,
) -> Json<ActivityResponse> {
    let accepted = state.activity.emit(event);

    Json(ActivityResponse {
        accepted,
        monitor: state.monitor.status(),
    })
}

/// Handle POST /activity/manual - Extend the session after an API request
pub async fn manual_reset_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.monitor.reset_manually();
    state.record_action("manual-reset");

    Json(ApiResponse::from_status("Session extended", state.monitor.status()))
}

/// Handle POST /stay-logged-in - Dismiss the warning and restart the countdown
pub async fn stay_logged_in_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.monitor.stay_logged_in();
    state.record_action("stay-logged-in");

    Json(ApiResponse::from_status("Warning dismissed", state.monitor.status()))
}

/// Handle GET /status - Return monitor status and pending navigation
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        monitor: state.monitor.status(),
        warning: state.current_notice(),
        navigation: state.navigation.get(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /events - Stream warning notices as server-sent events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let notices = state.notices();

    // The first item is the current notice, then one per change
    let events = stream::unfold((notices, true), |(mut notices, first)| async move {
        if !first && notices.changed().await.is_err() {
            return None;
        }

        let notice = *notices.borrow_and_update();
        let event = match Event::default().event("warning").json_data(notice) {
            Ok(event) => event,
            Err(e) => {
                warn!("Failed to serialize warning notice: {}", e);
                Event::default().comment("unserializable notice")
            }
        };
        Some((Ok(event), (notices, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
