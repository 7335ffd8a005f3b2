use std::path::Path;
use std::sync::Arc;

use ndarray::Array4;

use crate::config::OutputKind;
use crate::error::InferenceError;

/// A loaded, immutable model mapping a `(1, H, W, 3)` tensor to one score
/// per class.
pub trait Classifier: Send + Sync {
    /// Length of the vector returned by [`Classifier::classify`].
    fn output_len(&self) -> usize;

    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

pub fn load_classifier(
    model_path: &Path,
    input_shape: [usize; 4],
    output: OutputKind,
) -> Result<Arc<dyn Classifier>, InferenceError> {
    if !model_path.is_file() {
        return Err(InferenceError::Configuration(format!(
            "Model artifact not found at {}",
            model_path.display()
        )));
    }
    load_backend(model_path, input_shape, output)
}

#[cfg(feature = "torch")]
fn load_backend(
    model_path: &Path,
    input_shape: [usize; 4],
    output: OutputKind,
) -> Result<Arc<dyn Classifier>, InferenceError> {
    let classifier = torch::TorchClassifier::load(model_path, input_shape, output)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
fn load_backend(
    model_path: &Path,
    _input_shape: [usize; 4],
    _output: OutputKind,
) -> Result<Arc<dyn Classifier>, InferenceError> {
    Err(InferenceError::Configuration(format!(
        "Cannot load {}: this build has no model backend, rebuild with `--features torch`",
        model_path.display()
    )))
}

/// Checks that load-time scores look like a probability distribution: finite,
/// non-negative and summing to one.
pub fn check_distribution(scores: &[f32]) -> Result<(), String> {
    if let Some(bad) = scores.iter().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(format!("score {} is not a probability", bad));
    }
    let total: f32 = scores.iter().sum();
    if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(format!("scores sum to {} instead of 1", total));
    }
    Ok(())
}

pub const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

#[cfg(feature = "torch")]
mod torch {
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};

    use ndarray::Array4;
    use tch::{CModule, Device, Kind, Tensor};

    use super::{Classifier, check_distribution};
    use crate::config::OutputKind;
    use crate::error::InferenceError;

    /// TorchScript module loaded once at startup.
    pub struct TorchClassifier {
        module: Mutex<CModule>,
        device: Device,
        output: OutputKind,
        output_len: usize,
    }

    impl TorchClassifier {
        pub fn load(
            model_path: &Path,
            input_shape: [usize; 4],
            output: OutputKind,
        ) -> Result<Self, InferenceError> {
            let device = Device::cuda_if_available();
            let mut module = CModule::load_on_device(model_path, device).map_err(|e| {
                InferenceError::Configuration(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;
            module.set_eval();
            log::info!("Loaded {} on {:?}", model_path.display(), device);

            let mut classifier = Self {
                module: Mutex::new(module),
                device,
                output,
                output_len: 0,
            };

            // Run a blank input once to learn the declared output length.
            let blank = Array4::<f32>::zeros(input_shape);
            let scores = classifier.forward(&blank).map_err(|e| {
                InferenceError::Configuration(format!(
                    "Model rejected a {:?} input: {}",
                    input_shape, e
                ))
            })?;
            if scores.is_empty() {
                return Err(InferenceError::Configuration(
                    "Model produced an empty output".to_string(),
                ));
            }
            check_distribution(&scores).map_err(|e| {
                InferenceError::Configuration(format!(
                    "Model output is not a probability distribution ({}); set `model.output: logits` if it emits raw scores",
                    e
                ))
            })?;
            classifier.output_len = scores.len();
            Ok(classifier)
        }

        fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, String> {
            let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
            let contiguous = input.as_standard_layout();
            let data = contiguous
                .as_slice()
                .ok_or_else(|| "Input tensor is not contiguous".to_string())?;
            let tensor = Tensor::f_from_slice(data)
                .and_then(|t| t.f_reshape(shape.as_slice()))
                .and_then(|t| t.f_to_device(self.device))
                .map_err(|e| e.to_string())?;

            // The module is read-only after load, so a poisoned lock is still usable.
            let raw = {
                let module = self.module.lock().unwrap_or_else(PoisonError::into_inner);
                tch::no_grad(|| module.forward_ts(&[tensor])).map_err(|e| e.to_string())?
            };
            self.to_scores(raw).map_err(|e| e.to_string())
        }

        fn to_scores(&self, raw: Tensor) -> Result<Vec<f32>, tch::TchError> {
            let scores = match self.output {
                OutputKind::Logits => raw.f_softmax(-1, Kind::Float)?,
                OutputKind::Probabilities => raw.f_to_kind(Kind::Float)?,
            };
            let flat = scores.f_to_device(Device::Cpu)?.f_reshape([-1])?;
            let num_elements = flat.size()[0] as usize;
            let mut output_vec = vec![0.0f32; num_elements];
            flat.f_copy_data(&mut output_vec, num_elements)?;
            Ok(output_vec)
        }
    }

    impl Classifier for TorchClassifier {
        fn output_len(&self) -> usize {
            self.output_len
        }

        fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            self.forward(input)
                .map_err(InferenceError::ServiceUnavailable)
        }
    }

}
