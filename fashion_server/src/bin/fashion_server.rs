//! Fashion classifier HTTP server binary.
//!
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use env_logger::TimestampPrecision;
use fashion_server::{
    classifier::Classifier,
    endpoints::app,
    meter::spawn_meter_logger,
    nn::{ModelConfig, OnnxModel},
    preproc::PreprocConfig,
    utils::ensure_model,
};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Address to serve the HTTP server on
    #[clap(long, default_value = "127.0.0.1:3000")]
    server_address: String,

    /// Path of the ONNX model file
    #[clap(long, default_value = "fashion_mnist.onnx")]
    model_path: PathBuf,

    /// URL to fetch the model from when `model_path` does not exist
    #[clap(long)]
    model_url: Option<String>,

    /// Name of the model input
    #[clap(long, default_value = "image")]
    input_name: String,

    /// Name of the model output carrying the class scores
    #[clap(long, default_value = "preds")]
    output_name: String,

    /// Gray level above which pixels are treated as background
    #[clap(long, default_value_t = 200.0)]
    background_threshold: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let preproc = PreprocConfig {
        background_threshold: args.background_threshold,
        ..Default::default()
    };
    let model_config = ModelConfig {
        path: ensure_model(&args.model_path, args.model_url.as_deref()).await?,
        input_name: args.input_name,
        output_name: args.output_name,
        size: preproc.size as usize,
    };

    // The model must be ready before the first request is accepted
    let model = tokio::task::spawn_blocking(move || OnnxModel::load(&model_config)).await??;
    let classifier = Arc::new(Classifier::new(Box::new(model), preproc));

    spawn_meter_logger();

    // Serve HTTP server
    let addr: SocketAddr = args.server_address.parse()?;
    log::info!("Serving on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app(classifier).into_make_service())
        .await?;

    Ok(())
}
