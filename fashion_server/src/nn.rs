use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::Array4;
use simple_error::simple_error;
use tract_onnx::prelude::*;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A model mapping a `[1, 1, height, width]` input to raw class scores.
pub trait InferModel: Send + Sync {
    fn infer(&self, input: Array4<f32>) -> Result<Vec<f32>>;
}

/// Location and tensor contract of an ONNX classifier.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub path: PathBuf,
    /// Name of the input node.
    pub input_name: String,
    /// Name of the output node carrying the logits.
    pub output_name: String,
    /// Side length of the square input.
    pub size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fashion_mnist.onnx"),
            input_name: "image".into(),
            output_name: "preds".into(),
            size: 28,
        }
    }
}

/// Classifier model executed by tract.
pub struct OnnxModel {
    model: NnModel,
    size: usize,
}

impl OnnxModel {
    pub fn load(config: &ModelConfig) -> Result<Self> {
        log::info!("Loading model from {}", config.path.display());

        let mut model = tract_onnx::onnx()
            .model_for_path(&config.path)
            .with_context(|| format!("failed to read model {}", config.path.display()))?;
        model
            .set_input_names([config.input_name.as_str()])
            .with_context(|| format!("model has no input named {}", config.input_name))?;
        model
            .set_output_names([config.output_name.as_str()])
            .with_context(|| format!("model has no output named {}", config.output_name))?;

        let input_fact = InferenceFact::dt_shape(
            f32::datum_type(),
            tvec!(1, 1, config.size, config.size),
        );
        let model = model
            .with_input_fact(0, input_fact)?
            .into_optimized()?
            .into_runnable()?;

        log::info!("Model loaded");

        Ok(Self {
            model,
            size: config.size,
        })
    }
}

impl InferModel for OnnxModel {
    fn infer(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let expected = [1, 1, self.size, self.size];
        if input.shape() != expected {
            return Err(simple_error!(
                "unexpected input shape {:?}, model expects {:?}",
                input.shape(),
                expected
            )
            .into());
        }

        let input: Tensor = input.into();
        let raw_nn_out = self.model.run(tvec!(input.into()))?;
        let logits = raw_nn_out
            .first()
            .ok_or_else(|| simple_error!("model produced no output"))?
            .to_array_view::<f32>()?
            .iter()
            .copied()
            .collect();

        Ok(logits)
    }
}

/// Index of the first maximum score. NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (idx, &score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((idx, score)),
        })
        .map(|(idx, _)| idx)
}

/// Turn raw scores into probabilities.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|score| (score - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|x| x / sum).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_argmax_picks_first_maximum() {
        assert_eq!(argmax(&[0.1, 2.0, -1.0, 2.0]), Some(1));
        assert_eq!(argmax(&[-3.0, -2.0, -5.0]), Some(1));
        assert_eq!(argmax(&[7.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_ignores_nan() {
        assert_eq!(argmax(&[f32::NAN, 1.0, 0.5]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_softmax() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1.0e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);

        // Large logits must not overflow
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn test_missing_model_file() {
        let config = ModelConfig {
            path: "does/not/exist.onnx".into(),
            ..Default::default()
        };
        assert!(OnnxModel::load(&config).is_err());
    }
}
