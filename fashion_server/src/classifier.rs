//! Glue between preprocessing, the model and the class labels.
//!
use std::time::Instant;

use anyhow::{bail, Result};
use common::{
    labels::{FashionClass, NUM_CLASSES},
    protocol::Prediction,
};
use image::{DynamicImage, GrayImage, ImageError};

use crate::{
    meter::METER,
    nn::{argmax, softmax, InferModel},
    preproc::{to_input_array, transform_image, PreprocConfig},
};

pub struct Classifier {
    model: Box<dyn InferModel>,
    preproc: PreprocConfig,
}

impl Classifier {
    pub fn new(model: Box<dyn InferModel>, preproc: PreprocConfig) -> Self {
        Self { model, preproc }
    }

    /// Bitmap the model actually sees.
    pub fn transform(&self, image: &DynamicImage) -> GrayImage {
        transform_image(image, &self.preproc)
    }

    pub fn classify_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let bitmap = self.transform(image);

        let started = Instant::now();
        let logits = match self.infer_logits(&bitmap) {
            Ok(logits) => logits,
            Err(err) => {
                METER.tick_inference_failure();
                return Err(err);
            }
        };
        METER.record_inference(started.elapsed());

        let class = argmax(&logits)
            .and_then(FashionClass::from_index)
            .ok_or_else(|| anyhow::anyhow!("model returned no valid score"))?;
        let confidence = softmax(&logits)[class.index()];

        log::debug!("Classified as {} ({:.2}%)", class, confidence * 100.0);

        Ok(Prediction::new(class, confidence, logits))
    }

    fn infer_logits(&self, bitmap: &GrayImage) -> Result<Vec<f32>> {
        let logits = self.model.infer(to_input_array(bitmap, &self.preproc))?;

        if logits.len() != NUM_CLASSES {
            bail!(
                "model returned {} scores for {} classes",
                logits.len(),
                NUM_CLASSES
            );
        }

        Ok(logits)
    }

    pub fn classify_bytes(&self, data: &[u8]) -> Result<Prediction> {
        let image = decode_image(data)?;
        self.classify_image(&image)
    }
}

/// Decode an encoded image, guessing the format from its content.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(data).map_err(|err| {
        METER.tick_decode_failure();
        err
    })
}
