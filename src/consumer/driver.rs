use crate::consumer::classifier::{ClassificationResult, Classifier};
use crate::consumer::window::StreamWindow;
use crate::error::{KnockstreamError, Result};

/// Runs the classifier over the current window.
///
/// The window is borrowed, never consumed: a failed inference leaves the
/// stream state exactly as it was.
pub struct InferenceDriver<C: Classifier> {
    classifier: C,
    inferences: u64,
    failures: u64,
}

impl<C: Classifier> InferenceDriver<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            inferences: 0,
            failures: 0,
        }
    }

    /// Check that a window of `size` fits the model.
    pub fn check_window_size(&self, size: usize) -> Result<()> {
        let expected = self.classifier.window_size();
        if expected != size {
            return Err(KnockstreamError::WindowSizeMismatch {
                expected,
                actual: size,
            });
        }
        Ok(())
    }

    /// Classify the window's contents as one flat feature vector.
    pub fn infer(&mut self, window: &StreamWindow) -> Result<ClassificationResult> {
        self.inferences += 1;
        match self.classifier.classify(window.as_slice()) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.failures += 1;
                Err(e)
            }
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Inference attempts, successful or not.
    pub fn inferences(&self) -> u64 {
        self.inferences
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::classifier::MockClassifier;

    #[test]
    fn test_infer_passes_window_contents() {
        let mock = MockClassifier::new(3);
        let calls = mock.calls();
        let mut driver = InferenceDriver::new(mock);

        let mut window = StreamWindow::new(3);
        for v in [0.1, 0.2, 0.3] {
            window.push(v);
        }
        let result = driver.infer(&window).unwrap();

        assert_eq!(result.score("knock"), Some(0.75));
        assert_eq!(calls.lock().unwrap()[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(driver.inferences(), 1);
    }

    #[test]
    fn test_failure_is_counted_and_window_untouched() {
        let mut driver = InferenceDriver::new(MockClassifier::new(2).with_failures(vec![0]));
        let mut window = StreamWindow::new(2);
        window.push(1.0);
        window.push(2.0);

        assert!(driver.infer(&window).is_err());
        assert_eq!(driver.failures(), 1);
        assert_eq!(window.as_slice(), &[1.0, 2.0]);
        assert_eq!(window.pushes(), 2);

        assert!(driver.infer(&window).is_ok());
        assert_eq!(driver.inferences(), 2);
    }

    #[test]
    fn test_window_size_check() {
        let driver = InferenceDriver::new(MockClassifier::new(100));
        assert!(driver.check_window_size(100).is_ok());
        assert!(matches!(
            driver.check_window_size(50),
            Err(KnockstreamError::WindowSizeMismatch {
                expected: 100,
                actual: 50
            })
        ));
    }
}
