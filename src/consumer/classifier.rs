use crate::config::ClassifierConfig;
use crate::consumer::features::WindowFeatures;
use crate::defaults;
use crate::error::{KnockstreamError, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Scores per label, in the order the model defines its labels.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClassificationResult {
    scores: Vec<(String, f32)>,
}

impl ClassificationResult {
    pub fn new(scores: Vec<(String, f32)>) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> &[(String, f32)] {
        &self.scores
    }

    /// Score for `label`, if the model reports it.
    pub fn score(&self, label: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, score)| *score)
    }

    /// Label with the highest score.
    pub fn top(&self) -> Option<(&str, f32)> {
        self.scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(label, score)| (label.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Trait for window classifiers.
///
/// This trait allows swapping implementations (built-in model vs mock).
pub trait Classifier: Send {
    /// Number of values the model expects per window.
    fn window_size(&self) -> usize;

    /// Labels in output order.
    fn labels(&self) -> Vec<String>;

    /// Classify one window. `window.len()` equals `window_size()`.
    fn classify(&self, window: &[f32]) -> Result<ClassificationResult>;
}

impl<T: Classifier + ?Sized> Classifier for Box<T> {
    fn window_size(&self) -> usize {
        (**self).window_size()
    }

    fn labels(&self) -> Vec<String> {
        (**self).labels()
    }

    fn classify(&self, window: &[f32]) -> Result<ClassificationResult> {
        (**self).classify(window)
    }
}

/// Binary noise/knock model over window features.
///
/// A knock shows up as a short swing in acceleration magnitude, so the knock
/// score is a logistic function of the window's peak-to-peak value centred
/// on `ptp_threshold`.
#[derive(Debug, Clone)]
pub struct FeatureClassifier {
    window_size: usize,
    ptp_threshold: f32,
    ptp_scale: f32,
}

impl FeatureClassifier {
    pub fn new(window_size: usize, config: &ClassifierConfig) -> Self {
        Self {
            window_size,
            ptp_threshold: config.ptp_threshold,
            ptp_scale: config.ptp_scale,
        }
    }
}

impl Classifier for FeatureClassifier {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn labels(&self) -> Vec<String> {
        vec![
            defaults::NOISE_LABEL.to_string(),
            defaults::KNOCK_LABEL.to_string(),
        ]
    }

    fn classify(&self, window: &[f32]) -> Result<ClassificationResult> {
        if window.len() != self.window_size {
            return Err(KnockstreamError::WindowSizeMismatch {
                expected: self.window_size,
                actual: window.len(),
            });
        }
        let features =
            WindowFeatures::compute(window).ok_or_else(|| KnockstreamError::Classification {
                message: "empty window".to_string(),
            })?;
        if !features.ptp.is_finite() {
            return Err(KnockstreamError::Classification {
                message: format!("non-finite window features: {:?}", features),
            });
        }

        let knock = 1.0 / (1.0 + (-(features.ptp - self.ptp_threshold) / self.ptp_scale).exp());
        Ok(ClassificationResult::new(vec![
            (defaults::NOISE_LABEL.to_string(), 1.0 - knock),
            (defaults::KNOCK_LABEL.to_string(), knock),
        ]))
    }
}

/// Mock classifier for testing
///
/// Records every window it is asked to classify. Shared via `Arc` so tests
/// can inspect calls after handing the classifier to a driver.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    window_size: usize,
    scores: Vec<(String, f32)>,
    fail_calls: Vec<usize>,
    calls: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl MockClassifier {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            scores: vec![("idle".to_string(), 0.25), ("knock".to_string(), 0.75)],
            fail_calls: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scores returned on success
    pub fn with_scores(mut self, scores: Vec<(&str, f32)>) -> Self {
        self.scores = scores
            .into_iter()
            .map(|(label, score)| (label.to_string(), score))
            .collect();
        self
    }

    /// Fail the given call numbers (0-based)
    pub fn with_failures(mut self, calls: Vec<usize>) -> Self {
        self.fail_calls = calls;
        self
    }

    /// Handle to the recorded windows
    pub fn calls(&self) -> Arc<Mutex<Vec<Vec<f32>>>> {
        Arc::clone(&self.calls)
    }
}

impl Classifier for MockClassifier {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn labels(&self) -> Vec<String> {
        self.scores.iter().map(|(label, _)| label.clone()).collect()
    }

    fn classify(&self, window: &[f32]) -> Result<ClassificationResult> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| KnockstreamError::Other("mock classifier lock poisoned".to_string()))?;
            calls.push(window.to_vec());
            calls.len() - 1
        };
        if self.fail_calls.contains(&call) {
            return Err(KnockstreamError::Classification {
                message: format!("mock failure on call {}", call),
            });
        }
        Ok(ClassificationResult::new(self.scores.clone()))
    }
}
