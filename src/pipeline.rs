use crate::classifier::{self, Classifier, CLASS_LEGITIMATE};
use crate::config::Config;
use crate::explain;
use crate::features::FeatureExtractor;
use crate::intent::{classify_intent, SAFE_INTENT};
use crate::trust::TrustGate;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const LABEL_LEGITIMATE: &str = "legitimate";
pub const LABEL_PHISHING: &str = "phishing";

/// The per-request output record: risk score, binary label, intent
/// category, and up to three human-readable reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub risk_score: f64,
    pub label: String,
    pub intent: String,
    pub explanations: Vec<String>,
}

/// The full detection pipeline: trust gate, feature extraction,
/// classification, and verdict assembly. One instance serves the whole
/// process; each `evaluate` call is independent, so concurrent requests
/// need no coordination.
pub struct Pipeline {
    trust_gate: TrustGate,
    extractor: FeatureExtractor,
    classifier: Arc<dyn Classifier>,
}

impl Pipeline {
    pub fn new(config: &Config, classifier: Arc<dyn Classifier>) -> Result<Self> {
        Ok(Self {
            trust_gate: TrustGate::new(config.trusted_domains.clone()),
            extractor: FeatureExtractor::new(config)?,
            classifier,
        })
    }

    /// Pipeline whose external lookups are served from fixed offline
    /// tables.
    pub fn with_mock_lookups(config: &Config, classifier: Arc<dyn Classifier>) -> Result<Self> {
        Ok(Self {
            trust_gate: TrustGate::new(config.trusted_domains.clone()),
            extractor: FeatureExtractor::with_mock_lookups(config)?,
            classifier,
        })
    }

    pub async fn evaluate(&self, url_text: &str) -> Result<Verdict> {
        if let Some(verdict) = self.trust_gate.check(url_text) {
            log::info!("Trusted domain, skipping classification: {url_text}");
            return Ok(verdict);
        }

        let features = self.extractor.extract(url_text).await?;
        let result = self.classifier.predict(&features);
        let risk_score = classifier::risk_score(&result);

        let label = if result.predicted_class != CLASS_LEGITIMATE {
            LABEL_PHISHING
        } else {
            LABEL_LEGITIMATE
        };

        let explanations = explain::explain(
            &features,
            risk_score,
            self.classifier.feature_importances(),
        );

        // Legitimate verdicts carry the safe intent directly; the mapper is
        // only consulted on the phishing path.
        let intent = if label == LABEL_PHISHING {
            classify_intent(result.predicted_class)
        } else {
            SAFE_INTENT
        };

        log::info!(
            "Evaluated {url_text}: label={label} class={} risk={risk_score:.3}",
            result.predicted_class
        );

        Ok(Verdict {
            risk_score,
            label: label.to_string(),
            intent: intent.to_string(),
            explanations,
        })
    }
}
