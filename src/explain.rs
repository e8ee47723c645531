use crate::features::{FeatureVector, FEATURE_COUNT};
use std::cmp::Ordering;

/// The single explanation returned for low-risk verdicts.
pub const SAFE_EXPLANATION: &str = "Model confidence indicates this URL is likely safe.";

/// Verdicts below this risk score get the fixed safe explanation and skip
/// reason selection entirely.
const EXPLANATION_RISK_THRESHOLD: f64 = 0.5;

const MAX_EXPLANATIONS: usize = 3;

/// Pre-authored reason per feature position. Indexes without an entry are
/// skipped during selection rather than surfaced raw.
const EXPLANATION_MAP: [&str; FEATURE_COUNT] = [
    "URL contains an IP address (often used to evade domain blocklists).",
    "URL obfuscates destination using the '@' symbol.",
    "URL is excessively long, attempting to hide the true domain.",
    "URL structure is abnormally deep.",
    "URL redirects using '//' in an unusual position.",
    "Domain pretends to be 'https' within the name itself.",
    "Uses a URL shortening service to hide the destination.",
    "Domain uses a dash '-' (typosquatting technique).",
    "Domain has missing or suspicious DNS records.",
    "Website has suspiciously low traffic volume.",
    "Domain is very new (recently registered).",
    "Domain is expiring soon.",
    "Page uses hidden iframes.",
    "Page alters status bar behavior.",
    "Right-click context menu is disabled.",
    "Site has excessive forwarding/redirects.",
];

/// Select up to three human-readable reasons for a verdict.
///
/// Fired features are ranked by the model's importance weights when those
/// are available, each rendered with its impact; without weights (or when
/// ranking selects nothing) the first three fired features are reported in
/// position order.
pub fn explain(
    features: &FeatureVector,
    risk_score: f64,
    importances: Option<&[f64]>,
) -> Vec<String> {
    if risk_score < EXPLANATION_RISK_THRESHOLD {
        return vec![SAFE_EXPLANATION.to_string()];
    }

    let mut explanations = Vec::new();

    if let Some(weights) = importances {
        let mut contributions: Vec<(f64, usize)> = (0..FEATURE_COUNT)
            .filter(|&index| features.fired(index))
            .filter_map(|index| weights.get(index).map(|&weight| (weight, index)))
            .collect();

        // Stable sort keeps position order between equal weights.
        contributions
            .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        for (weight, index) in contributions.into_iter().take(MAX_EXPLANATIONS) {
            if let Some(reason) = EXPLANATION_MAP.get(index) {
                explanations.push(format!("{reason} (Impact: {weight:.2})"));
            }
        }
    }

    if explanations.is_empty() {
        for index in 0..FEATURE_COUNT {
            if features.fired(index) {
                if let Some(reason) = EXPLANATION_MAP.get(index) {
                    explanations.push(reason.to_string());
                    if explanations.len() == MAX_EXPLANATIONS {
                        break;
                    }
                }
            }
        }
    }

    explanations
}
