//! Score to action mapping

use crate::{Action, Error, Result};
use serde::{Deserialize, Serialize};

/// Maps a 0-100 risk score to an enforcement action
///
/// Comparisons are strict, so a score sitting exactly on a threshold gets the
/// milder action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionClassifier {
    /// Scores above this are blocked
    pub block_above: f64,
    /// Scores above this (and not blocked) go to review
    pub review_above: f64,
}

impl Default for ActionClassifier {
    fn default() -> Self {
        Self {
            block_above: 80.0,
            review_above: 50.0,
        }
    }
}

impl ActionClassifier {
    /// Create classifier with explicit thresholds
    pub fn new(review_above: f64, block_above: f64) -> Result<Self> {
        let classifier = Self {
            block_above,
            review_above,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Check thresholds are ordered and inside 0-100
    pub fn validate(&self) -> Result<()> {
        let in_range = |t: f64| (0.0..=100.0).contains(&t);
        if !in_range(self.review_above) || !in_range(self.block_above) {
            return Err(Error::InvalidConfig(format!(
                "thresholds must lie in [0, 100], got review {} / block {}",
                self.review_above, self.block_above
            )));
        }
        if self.review_above > self.block_above {
            return Err(Error::InvalidConfig(format!(
                "review threshold {} exceeds block threshold {}",
                self.review_above, self.block_above
            )));
        }
        Ok(())
    }

    /// Classify a risk score
    pub fn classify(&self, risk_score: f64) -> Action {
        if risk_score > self.block_above {
            Action::Block
        } else if risk_score > self.review_above {
            Action::Review
        } else {
            Action::Approved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands() {
        let classifier = ActionClassifier::default();
        assert_eq!(classifier.classify(0.0), Action::Approved);
        assert_eq!(classifier.classify(16.0), Action::Approved);
        assert_eq!(classifier.classify(50.01), Action::Review);
        assert_eq!(classifier.classify(79.99), Action::Review);
        assert_eq!(classifier.classify(80.01), Action::Block);
        assert_eq!(classifier.classify(100.0), Action::Block);
    }

    #[test]
    fn test_boundaries_resolve_to_milder_action() {
        let classifier = ActionClassifier::default();
        assert_eq!(classifier.classify(80.0), Action::Review);
        assert_eq!(classifier.classify(50.0), Action::Approved);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(ActionClassifier::new(90.0, 80.0).is_err());
        assert!(ActionClassifier::new(50.0, 120.0).is_err());
        assert!(ActionClassifier::new(50.0, 80.0).is_ok());
    }
}
