//! JSON messages exchanged between the HTTP server and its clients.
//!
use serde::{Deserialize, Serialize};

use crate::labels::FashionClass;

/// Result of classifying one image.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    /// Softmax probability of the predicted class.
    pub confidence: f32,
    /// Raw class scores as returned by the model.
    pub logits: Vec<f32>,
}

impl Prediction {
    pub fn new(class: FashionClass, confidence: f32, logits: Vec<f32>) -> Self {
        Self {
            class_index: class.index(),
            label: class.label().to_owned(),
            confidence,
            logits,
        }
    }

    pub fn class(&self) -> Option<FashionClass> {
        FashionClass::from_index(self.class_index)
    }
}

/// Error message body.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorMsg {
    pub error: String,
}

impl ErrorMsg {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
