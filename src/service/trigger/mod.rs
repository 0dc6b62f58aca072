//! HTTP receiver for Firestore trigger deliveries.
//!
//! Every decodable event is acknowledged with `200 OK`, whatever happened to
//! the reply, so the trigger infrastructure never redelivers it.

pub mod cloud_event;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::types::{ReplyOutcome, SkipReason, Void},
    interaction::message_created::handle_message_created,
    runtime::Runtime,
};

/// Build the router: `POST /` for events, `GET /healthz` for liveness.
pub fn router(runtime: Runtime) -> Router {
    Router::new().route("/", post(receive_event)).route("/healthz", get(health)).with_state(runtime)
}

/// Serve the router until the process is asked to stop.
pub async fn serve(runtime: Runtime) -> Void {
    let address = format!("{}:{}", runtime.config.bind_address, runtime.config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!("Listening for message events on `{address}` (region `{}`) ...", runtime.config.region);

    axum::serve(listener, router(runtime)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped.");

    Ok(())
}

#[instrument(skip_all)]
async fn receive_event(State(runtime): State<Runtime>, headers: HeaderMap, body: Bytes) -> Response {
    let event_id = headers.get("ce-id").and_then(|value| value.to_str().ok()).unwrap_or("unknown");

    let event = match cloud_event::decode_message_event(&headers, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            info!("Event `{event_id}` carries no document; skipping.");
            return (StatusCode::OK, Json(ReplyOutcome::skipped(SkipReason::EmptySnapshot))).into_response();
        }
        Err(err) => {
            warn!("Rejecting event `{event_id}`: {err}");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    info!("Received event `{event_id}` ...");

    let outcome = handle_message_created(event, &runtime.config, &runtime.db, &runtime.llm).in_current_span().await;

    (StatusCode::OK, Json(outcome)).into_response()
}

async fn health() -> &'static str {
    "ok"
}

/// Resolves on ctrl-c, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down ...");
}
