use crate::error::InferenceError;

/// Class names in classifier output order. Changing the model means changing
/// this list in lockstep.
pub const LABELS: [&str; 25] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Corn_(maize)___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: &'static str,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct LabelMapper {
    labels: &'static [&'static str],
}

impl LabelMapper {
    /// Fails unless the classifier emits exactly one score per label.
    pub fn new(
        labels: &'static [&'static str],
        classifier_output_len: usize,
    ) -> Result<Self, InferenceError> {
        if labels.is_empty() {
            return Err(InferenceError::Configuration(
                "Label set is empty".to_string(),
            ));
        }
        if labels.len() != classifier_output_len {
            return Err(InferenceError::Configuration(format!(
                "Label set has {} entries but the classifier outputs {}",
                labels.len(),
                classifier_output_len
            )));
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    pub fn map(&self, scores: &[f32]) -> Result<Prediction, InferenceError> {
        if scores.len() != self.labels.len() {
            return Err(InferenceError::ServiceUnavailable(format!(
                "Classifier returned {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }
        let (index, confidence) = argmax(scores).ok_or_else(|| {
            InferenceError::ServiceUnavailable("Classifier returned no finite scores".to_string())
        })?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(InferenceError::ServiceUnavailable(format!(
                "Classifier confidence {} is outside [0, 1]",
                confidence
            )));
        }
        Ok(Prediction {
            index,
            label: self.labels[index],
            confidence,
        })
    }
}

/// Index and value of the largest finite score. Ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .fold(None, |best, (index, score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((index, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> LabelMapper {
        LabelMapper::new(&LABELS, LABELS.len()).unwrap()
    }

    #[test]
    fn label_set_is_fixed_at_25_classes() {
        assert_eq!(LABELS.len(), 25);
        assert_eq!(LABELS[0], "Apple___Apple_scab");
        assert_eq!(LABELS[22], "Tomato___Tomato_Yellow_Leaf_Curl_Virus");
        assert_eq!(LABELS[24], "Tomato___healthy");
    }

    #[test]
    fn confidence_is_max_and_label_is_argmax() {
        let vectors: [&[f32]; 3] = [
            &[0.1, 0.7, 0.2],
            &[0.9, 0.05, 0.05],
            &[0.0, 0.0, 1.0],
        ];
        for scores in vectors {
            let mut padded = vec![0.0f32; LABELS.len()];
            padded[..scores.len()].copy_from_slice(scores);
            let prediction = mapper().map(&padded).unwrap();
            let max = padded.iter().copied().fold(f32::MIN, f32::max);
            assert_eq!(prediction.confidence, max);
            assert_eq!(padded[prediction.index], max);
            assert_eq!(prediction.label, LABELS[prediction.index]);
        }
    }

    #[test]
    fn ties_pick_the_lowest_index() {
        let mut scores = vec![0.01f32; LABELS.len()];
        scores[5] = 0.4;
        scores[17] = 0.4;
        let prediction = mapper().map(&scores).unwrap();
        assert_eq!(prediction.index, 5);
        assert_eq!(prediction.label, "Corn_(maize)___Common_rust_");

        assert_eq!(argmax(&[0.25; 4]), Some((0, 0.25)));
    }

    #[test]
    fn nan_never_wins() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.3]), Some((2, 0.3)));
        assert_eq!(argmax(&[0.3, f32::NAN, 0.2]), Some((0, 0.3)));
        assert_eq!(argmax(&[f32::NAN, f32::INFINITY]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn all_non_finite_scores_are_service_unavailable() {
        let scores = vec![f32::NAN; LABELS.len()];
        let err = mapper().map(&scores).unwrap_err();
        assert!(matches!(err, InferenceError::ServiceUnavailable(_)));
    }

    #[test]
    fn mismatched_output_length_is_configuration_error() {
        let err = LabelMapper::new(&LABELS, 24).unwrap_err();
        assert!(matches!(err, InferenceError::Configuration(_)));
        let err = LabelMapper::new(&[], 0).unwrap_err();
        assert!(matches!(err, InferenceError::Configuration(_)));
    }

    #[test]
    fn wrong_length_at_request_time_is_service_unavailable() {
        let err = mapper().map(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, InferenceError::ServiceUnavailable(_)));
    }

    #[test]
    fn confidence_outside_unit_range_is_service_unavailable() {
        let mut logits = vec![-3.0f32; LABELS.len()];
        logits[22] = 7.25;
        let err = mapper().map(&logits).unwrap_err();
        assert!(matches!(err, InferenceError::ServiceUnavailable(_)), "{:?}", err);

        let negative = vec![-0.5f32; LABELS.len()];
        let err = mapper().map(&negative).unwrap_err();
        assert!(matches!(err, InferenceError::ServiceUnavailable(_)), "{:?}", err);

        let mut certain = vec![0.0f32; LABELS.len()];
        certain[22] = 1.0;
        assert_eq!(mapper().map(&certain).unwrap().confidence, 1.0);
    }
}
