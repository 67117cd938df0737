//! Endpoints of HTTP server.
//!
use std::{convert::Infallible, sync::Arc};

use async_stream::stream;
use axum::{
    body::StreamBody,
    extract::Query,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Extension, Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::{context::DetectContext, router::FrameRouter, BroadcastReceiver};

/// Search parameters available to streams.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateParams {
    name: String,
}

/// Health check endpoint.
pub async fn healthcheck() -> &'static str {
    "healthy"
}

/// Landing page with the overlay stream and the live control panel.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Endpoint of received raw image streams.
pub async fn named_stream(
    Extension(frame_router): Extension<Arc<FrameRouter>>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let name = params.name.unwrap_or_else(|| "shelf".into());
    log::info!("Stream for {} requested", &name);

    multipart_stream(frame_router.get_raw_receiver(&name))
}

/// Endpoint of streams with detection overlays rendered in.
pub async fn detections_stream(
    Extension(frame_router): Extension<Arc<FrameRouter>>,
    Query(params): Query<StreamParams>,
) -> impl IntoResponse {
    let name = params.name.unwrap_or_else(|| "shelf".into());
    log::info!("Detection stream for {} requested", &name);

    multipart_stream(frame_router.get_overlay_receiver(&name))
}

/// Current control names as JSON.
pub async fn controls(Extension(ctx): Extension<Arc<DetectContext>>) -> Json<Vec<String>> {
    Json(ctx.control_names())
}

/// Server-sent control updates, opening with a snapshot.
pub async fn controls_events(
    Extension(ctx): Extension<Arc<DetectContext>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = ctx.subscribe_controls();
    let stream = stream! {
        yield controls_event(ctx.control_names());
        loop {
            match updates.recv().await {
                Ok(names) => yield controls_event(names),
                // A lagged subscriber only needs the newest state.
                Err(RecvError::Lagged(_)) => yield controls_event(ctx.control_names()),
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Trigger the action behind a control.
pub async fn activate_control(
    Extension(ctx): Extension<Arc<DetectContext>>,
    Query(params): Query<ActivateParams>,
) -> StatusCode {
    if ctx.activate_control(&params.name) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

fn controls_event(names: Vec<String>) -> Result<Event, Infallible> {
    Ok(Event::default()
        .json_data(&names)
        .unwrap_or_else(|_| Event::default().data("[]")))
}

fn multipart_stream(rx: BroadcastReceiver) -> impl IntoResponse {
    let stream = BroadcastStream::new(rx)
        .filter_map(|frame| async move { frame.ok().map(Ok::<_, Infallible>) });

    // Set body and headers for multipart streaming
    let body = StreamBody::new(stream);
    let headers = [(
        header::CONTENT_TYPE,
        "multipart/x-mixed-replace; boundary=frame",
    )];

    (headers, body)
}

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>detect_server</title></head>
<body>
<h1>Live detection</h1>
<img src="./detection_stream?name=shelf" alt="detection stream" />
<div id="controls"></div>
<script>
const controls = document.getElementById('controls');
const source = new EventSource('./controls/events');
source.onmessage = (event) => {
    controls.replaceChildren();
    for (const name of JSON.parse(event.data)) {
        const button = document.createElement('button');
        button.textContent = name;
        button.onclick = () => fetch(`./activate?name=${encodeURIComponent(name)}`, { method: 'POST' });
        controls.appendChild(button);
    }
};
</script>
</body>
</html>
"#;
