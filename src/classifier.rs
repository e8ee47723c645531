use crate::features::{FeatureVector, FEATURE_COUNT};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const CLASS_COUNT: usize = 4;

/// Class index for benign navigation; every other index is a malicious
/// category.
pub const CLASS_LEGITIMATE: usize = 0;

/// Probability distribution over the four URL classes plus its argmax.
#[derive(Debug, Clone)]
pub struct ClassifierResult {
    pub probabilities: [f64; CLASS_COUNT],
    pub predicted_class: usize,
}

/// The classification contract: a length-16 feature vector in, a
/// distribution over four classes out. Implementations are immutable after
/// construction and shared read-only across requests.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> ClassifierResult;

    /// Relative per-feature weights, when the model carries them. Magnitude
    /// only; no normalization guarantee.
    fn feature_importances(&self) -> Option<&[f64]>;
}

/// Risk score derived from a prediction: the probability mass on the
/// malicious classes.
pub fn risk_score(result: &ClassifierResult) -> f64 {
    1.0 - result.probabilities[CLASS_LEGITIMATE]
}

/// On-disk model artifact. JSON rather than a binary dump so a repaired or
/// retrained model can be inspected and diffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Per-class rows of per-feature weights.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub feature_importances: Option<Vec<f64>>,
}

/// An immutable, process-lifetime handle to loaded model weights. Built
/// once at startup and shared behind an `Arc`; concurrent reads need no
/// synchronization.
#[derive(Debug)]
pub struct ModelHandle {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    feature_importances: Option<Vec<f64>>,
}

impl ModelHandle {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact: {path}"))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .with_context(|| format!("malformed model artifact: {path}"))?;
        let handle = Self::from_artifact(artifact)?;
        log::info!("Loaded model artifact from {path}");
        Ok(handle)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        if artifact.weights.len() != CLASS_COUNT {
            return Err(anyhow!(
                "model must carry {CLASS_COUNT} weight rows, found {}",
                artifact.weights.len()
            ));
        }
        for (class, row) in artifact.weights.iter().enumerate() {
            if row.len() != FEATURE_COUNT {
                return Err(anyhow!(
                    "weight row {class} must carry {FEATURE_COUNT} entries, found {}",
                    row.len()
                ));
            }
        }
        if artifact.bias.len() != CLASS_COUNT {
            return Err(anyhow!(
                "model must carry {CLASS_COUNT} bias entries, found {}",
                artifact.bias.len()
            ));
        }
        if let Some(importances) = &artifact.feature_importances {
            if importances.len() != FEATURE_COUNT {
                return Err(anyhow!(
                    "feature importances must carry {FEATURE_COUNT} entries, found {}",
                    importances.len()
                ));
            }
            if importances.iter().any(|&w| w < 0.0 || !w.is_finite()) {
                return Err(anyhow!("feature importances must be finite and non-negative"));
            }
        }

        Ok(Self {
            weights: artifact.weights,
            bias: artifact.bias,
            feature_importances: artifact.feature_importances,
        })
    }

    /// A small, well-formed artifact so the service can start before a
    /// trained artifact is provisioned.
    pub fn default_artifact() -> ModelArtifact {
        ModelArtifact {
            weights: vec![
                // Legitimate
                vec![
                    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                    0.0,
                ],
                // Credential theft: obfuscated destinations and broken records
                vec![
                    2.2, 2.4, 0.8, 0.3, 1.8, 2.0, 0.0, 0.0, 1.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
                    1.6,
                ],
                // Malware distribution: hostile page behavior on obscure hosts
                vec![
                    0.0, 0.0, 0.0, 0.4, 0.0, 0.0, 0.0, 0.6, 1.0, 1.2, 1.6, 0.0, 1.8, 1.7, 1.9,
                    0.0,
                ],
                // Social engineering: shorteners and lookalike domains
                vec![
                    0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.6, 1.8, 0.0, 0.8, 0.0, 1.2, 0.0, 0.0, 0.0,
                    0.0,
                ],
            ],
            bias: vec![3.5, 0.0, 0.0, 0.0],
            feature_importances: Some(vec![
                0.08, 0.07, 0.05, 0.02, 0.06, 0.09, 0.11, 0.07, 0.10, 0.05, 0.09, 0.03, 0.06,
                0.04, 0.05, 0.03,
            ]),
        }
    }

    pub fn write_default_artifact(path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(&Self::default_artifact())?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write model artifact: {path}"))?;
        Ok(())
    }
}

impl Classifier for ModelHandle {
    fn predict(&self, features: &FeatureVector) -> ClassifierResult {
        let mut logits = [0.0; CLASS_COUNT];
        for (class, logit) in logits.iter_mut().enumerate() {
            let dot: f64 = self.weights[class]
                .iter()
                .zip(features.values().iter())
                .map(|(w, x)| w * x)
                .sum();
            *logit = self.bias[class] + dot;
        }

        let probabilities = softmax(&logits);

        // Argmax; ties resolve to the lowest class index.
        let predicted_class = probabilities
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |(best, best_p), (class, &p)| {
                if p > best_p {
                    (class, p)
                } else {
                    (best, best_p)
                }
            })
            .0;

        ClassifierResult {
            probabilities,
            predicted_class,
        }
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

fn softmax(logits: &[f64; CLASS_COUNT]) -> [f64; CLASS_COUNT] {
    let max_logit = logits.iter().cloned().fold(f64::MIN, f64::max);
    let mut exps = [0.0; CLASS_COUNT];
    let mut sum = 0.0;
    for (i, &logit) in logits.iter().enumerate() {
        exps[i] = (logit - max_logit).exp();
        sum += exps[i];
    }
    for exp in exps.iter_mut() {
        *exp /= sum;
    }
    exps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> ModelHandle {
        ModelHandle::from_artifact(ModelHandle::default_artifact()).unwrap()
    }

    fn vector_with(fired: &[usize]) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        for &i in fired {
            values[i] = 1.0;
        }
        FeatureVector::new(values)
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = handle();
        for fired in [vec![], vec![0, 1, 4], vec![6, 7, 9], (0..16).collect()] {
            let result = model.predict(&vector_with(&fired));
            let sum: f64 = result.probabilities.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
            let risk = risk_score(&result);
            assert!((0.0..=1.0).contains(&risk));
            assert!((risk - (1.0 - result.probabilities[0])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quiet_vector_predicts_legitimate() {
        let model = handle();
        let result = model.predict(&vector_with(&[]));
        assert_eq!(result.predicted_class, CLASS_LEGITIMATE);
        assert!(result.probabilities[CLASS_LEGITIMATE] >= 0.9);
        assert!(risk_score(&result) < 0.1);
    }

    #[test]
    fn test_shortener_profile_predicts_social_engineering() {
        let model = handle();
        let result = model.predict(&vector_with(&[6, 7, 9]));
        assert_eq!(result.predicted_class, 3);
        assert!(risk_score(&result) > 0.5);
    }

    #[test]
    fn test_hostile_content_profile_predicts_malware() {
        let model = handle();
        let result = model.predict(&vector_with(&[8, 9, 10, 12, 13, 14]));
        assert_eq!(result.predicted_class, 2);
        assert!(risk_score(&result) > 0.5);
    }

    #[test]
    fn test_artifact_validation() {
        let mut artifact = ModelHandle::default_artifact();
        artifact.weights.pop();
        assert!(ModelHandle::from_artifact(artifact).is_err());

        let mut artifact = ModelHandle::default_artifact();
        artifact.weights[1].pop();
        assert!(ModelHandle::from_artifact(artifact).is_err());

        let mut artifact = ModelHandle::default_artifact();
        artifact.bias = vec![0.0; 3];
        assert!(ModelHandle::from_artifact(artifact).is_err());

        let mut artifact = ModelHandle::default_artifact();
        artifact.feature_importances = Some(vec![-0.1; FEATURE_COUNT]);
        assert!(ModelHandle::from_artifact(artifact).is_err());

        // Importances are optional.
        let mut artifact = ModelHandle::default_artifact();
        artifact.feature_importances = None;
        let model = ModelHandle::from_artifact(artifact).unwrap();
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn test_artifact_round_trip() {
        let json = serde_json::to_string(&ModelHandle::default_artifact()).unwrap();
        let artifact: ModelArtifact = serde_json::from_str(&json).unwrap();
        let model = ModelHandle::from_artifact(artifact).unwrap();
        assert_eq!(model.feature_importances().unwrap().len(), FEATURE_COUNT);

        assert!(serde_json::from_str::<ModelArtifact>("{\"weights\": 3}").is_err());
    }
}
