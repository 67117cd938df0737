//! Detection server binary.
//!
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use clap::Parser;
use detect_server::{
    context::DetectContext,
    controls::{ActionFn, ControlPanel},
    data_socket::spawn_data_socket,
    endpoints::{
        activate_control, controls, controls_events, detections_stream, healthcheck, index,
        named_stream,
    },
    inferer::Inferer,
    labels::LabelMap,
    meter::spawn_meter_logger,
    nn::SsdModel,
    overlay::OverlayRenderer,
    reconcile::spawn_reconciler,
    router::FrameRouter,
    DETECT_JOBS_CHANNEL, INCOMING_FRAMES_CHANNEL,
};
use env_logger::TimestampPrecision;

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Address to serve the HTTP endpoints on
    #[clap(long, default_value = "127.0.0.1:3000")]
    server_address: String,

    /// Address of the socket receiving camera frames
    #[clap(long, default_value = "127.0.0.1:3001")]
    socket_address: String,

    /// Channel whose frames run through detection
    #[clap(long, default_value = "shelf")]
    detect_channel: String,

    /// Path to the detection model
    #[clap(long, default_value = "model/product_detect.onnx")]
    model: PathBuf,

    /// Path to the class dictionary
    #[clap(long, default_value = "model/dict.txt")]
    labels: PathBuf,

    /// Font for overlay label text
    #[clap(long)]
    font: Option<PathBuf>,

    /// URL receiving activated control names via POST
    #[clap(long)]
    action_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let (incoming_tx, incoming_rx) = INCOMING_FRAMES_CHANNEL.split();
    let (jobs_tx, jobs_rx) = DETECT_JOBS_CHANNEL.split();
    let frame_router = Arc::new(FrameRouter::new(jobs_tx, &args.detect_channel));

    let panel = match &args.action_url {
        Some(url) => ControlPanel::with_action(webhook_action(url.clone())),
        None => ControlPanel::new(),
    };
    let (labels, model) = match load_detection(&args) {
        Ok((labels, model)) => (labels, Some(model)),
        Err(e) => {
            log::error!("Detection disabled: {e:#}");
            (LabelMap::default(), None)
        }
    };
    let ctx = Arc::new(DetectContext::new(labels, panel));

    {
        let frame_router = frame_router.clone();
        tokio::spawn(async move { frame_router.run(incoming_rx).await });
    }

    match model {
        Some(model) => {
            let overlay = OverlayRenderer::new(args.font.as_deref());
            let inferer = Inferer::new(jobs_rx, model, overlay, ctx.clone());
            tokio::spawn(async move { inferer.run().await });
        }
        // Without a model nothing consumes jobs; dropping the receiver
        // closes the channel so the router sheds them instead of queueing.
        None => drop(jobs_rx),
    }

    spawn_reconciler(ctx.clone());

    // Create socket to receive camera streams via network
    spawn_data_socket(incoming_tx, &args.socket_address).await?;

    spawn_meter_logger();

    // Build HTTP server with endpoints
    let app = Router::new()
        .route("/", get(index))
        .route("/healthcheck", get(healthcheck))
        .route("/stream", get(named_stream))
        .route("/detection_stream", get(detections_stream))
        .route("/controls", get(controls))
        .route("/controls/events", get(controls_events))
        .route("/activate", post(activate_control))
        .layer(Extension(frame_router))
        .layer(Extension(ctx));

    // Serve HTTP server
    let addr: SocketAddr = args.server_address.parse()?;
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

fn load_detection(args: &Args) -> Result<(LabelMap, SsdModel)> {
    let labels = LabelMap::load(&args.labels)?;
    let model = SsdModel::new(&args.model)?;
    Ok((labels, model))
}

/// Forward activated control names to an external endpoint.
fn webhook_action(url: String) -> ActionFn {
    let client = reqwest::Client::new();
    Box::new(move |name| {
        let client = client.clone();
        let url = url.clone();
        let name = name.to_owned();
        tokio::spawn(async move {
            if let Err(e) = client.post(&url).body(name).send().await {
                log::warn!("Action webhook failed: {e}");
            }
        });
    })
}
