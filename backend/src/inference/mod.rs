pub mod classifier;
pub mod decode;
pub mod labels;
pub mod preprocess;

use std::sync::Arc;

use classifier::{Classifier, load_classifier};
use decode::DecodedImage;
use labels::{LABELS, LabelMapper, Prediction};
use preprocess::Preprocessor;

use crate::config::ServiceConfig;
use crate::error::InferenceError;

/// Decode → Preprocess → Infer → Map, built once before the server binds.
pub struct InferenceService {
    classifier: Arc<dyn Classifier>,
    preprocessor: Preprocessor,
    mapper: LabelMapper,
}

impl InferenceService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        preprocessor: Preprocessor,
        labels: &'static [&'static str],
    ) -> Result<Self, InferenceError> {
        let mapper = LabelMapper::new(labels, classifier.output_len())?;
        Ok(Self {
            classifier,
            preprocessor,
            mapper,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, InferenceError> {
        let preprocessor = Preprocessor::new(&config.image);
        let classifier = load_classifier(
            &config.model_path,
            preprocessor.input_shape(),
            config.model.output,
        )?;
        log::info!(
            "Classifier declares {} outputs for {} labels",
            classifier.output_len(),
            LABELS.len()
        );
        Self::new(classifier, preprocessor, &LABELS)
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.mapper.labels()
    }

    pub fn predict(&self, image: &[u8]) -> Result<Prediction, InferenceError> {
        let decoded = DecodedImage::decode(image)?;
        log::debug!(
            "Decoded {}x{} image with {} channels",
            decoded.width(),
            decoded.height(),
            decoded.channels()
        );
        let tensor = self.preprocessor.run(&decoded)?;
        let scores = self.classifier.classify(&tensor)?;
        self.mapper.map(&scores)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::config::ImageConfig;
    use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage};

    #[test]
    fn predicts_label_at_argmax() {
        let service = service_with(FixedClassifier {
            scores: peaked_scores(22, 0.81),
        });
        let png = encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
            64,
            48,
            Rgb([30, 160, 40]),
        )));
        let prediction = service.predict(&png).unwrap();
        assert_eq!(prediction.index, 22);
        assert_eq!(prediction.label, "Tomato___Tomato_Yellow_Leaf_Curl_Virus");
        assert_eq!(prediction.confidence, 0.81);
    }

    #[test]
    fn any_colour_mode_reaches_the_classifier() {
        let service = service_with(FixedClassifier {
            scores: peaked_scores(3, 0.6),
        });
        for image in [
            DynamicImage::ImageLuma8(GrayImage::new(10, 500)),
            DynamicImage::ImageRgba8(RgbaImage::new(800, 600)),
        ] {
            let prediction = service.predict(&encode_png(&image)).unwrap();
            assert_eq!(prediction.label, "Apple___healthy");
        }
    }

    #[test]
    fn label_count_mismatch_prevents_construction() {
        let result = InferenceService::new(
            Arc::new(FixedClassifier {
                scores: vec![0.5; 24],
            }),
            Preprocessor::new(&ImageConfig::default()),
            &LABELS,
        );
        assert!(matches!(result, Err(InferenceError::Configuration(_))));
    }

    #[test]
    fn classifier_failure_is_service_unavailable() {
        let service = service_with(FailingClassifier);
        let png = encode_png(&DynamicImage::ImageRgb8(RgbImage::new(8, 8)));
        let err = service.predict(&png).unwrap_err();
        assert!(matches!(err, InferenceError::ServiceUnavailable(_)));
    }

    #[test]
    fn missing_model_fails_startup() {
        let config = ServiceConfig {
            model_path: "/nonexistent/model.pt".into(),
            ..ServiceConfig::default()
        };
        let result = InferenceService::from_config(&config);
        assert!(matches!(result, Err(InferenceError::Configuration(_))));
    }
}
