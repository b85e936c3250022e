//! Classify image files from the command line.
//!
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::TimestampPrecision;
use fashion_server::{
    classifier::{decode_image, Classifier},
    nn::{ModelConfig, OnnxModel},
    preproc::PreprocConfig,
    utils::ensure_model,
};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Images to classify
    #[clap(required = true)]
    images: Vec<PathBuf>,

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

    /// Directory to write the preprocessed model inputs to
    #[clap(long)]
    dump_input: Option<PathBuf>,

    /// Print predictions as JSON lines
    #[clap(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let preproc = PreprocConfig::default();
    let model_config = ModelConfig {
        path: ensure_model(&args.model_path, args.model_url.as_deref()).await?,
        input_name: args.input_name,
        output_name: args.output_name,
        size: preproc.size as usize,
    };
    let classifier = Classifier::new(Box::new(OnnxModel::load(&model_config)?), preproc);

    if let Some(dir) = &args.dump_input {
        std::fs::create_dir_all(dir)?;
    }

    for path in &args.images {
        let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let image = decode_image(&data)
            .with_context(|| format!("failed to decode {}", path.display()))?;

        if let Some(dir) = &args.dump_input {
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            let out = dir.join(format!("{stem}_input.png"));
            classifier.transform(&image).save(&out)?;
            log::info!("Wrote model input to {}", out.display());
        }

        let prediction = classifier.classify_image(&image)?;
        match args.json {
            true => println!("{}", serde_json::to_string(&prediction)?),
            false => println!(
                "{}: {} ({:.2}%)",
                path.display(),
                prediction.label,
                prediction.confidence * 100.0
            ),
        }
    }

    Ok(())
}
