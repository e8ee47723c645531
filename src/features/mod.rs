pub mod content;
pub mod lexical;
pub mod registration;
pub mod traffic;

use crate::config::Config;
use anyhow::{anyhow, Result};
use content::ContentFetcher;
use lexical::LexicalAnalyzer;
use registration::RegistrationChecker;
use std::time::SystemTime;
use traffic::TrafficRankChecker;
use url::Url;

pub const FEATURE_COUNT: usize = 16;

/// Position-bound feature names. The ordering is load-bearing: extraction,
/// classification, and explanation all address features by index.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "IP Address Check",
    "@ Symbol Check",
    "URL Length",
    "URL Depth",
    "Redirection (//)",
    "HTTP in Domain",
    "Shortening Service",
    "Prefix/Suffix (-)",
    "DNS Record",
    "Web Traffic",
    "Domain Age",
    "Domain End",
    "IFrame Redirection",
    "Status Bar Customization",
    "Right Click Disabled",
    "Website Forwarding",
];

/// Fixed-order numeric encoding of a URL's lexical, host-reputation, and
/// content signals. Every slot except URL depth (index 3) holds 0 or 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Whether the signal at `index` fired, i.e. holds exactly 1.
    pub fn fired(&self, index: usize) -> bool {
        self.get(index) == Some(1.0)
    }
}

/// Derives the full feature vector for a URL. Lexical signals are pure;
/// the three external lookups (registration, traffic rank, page content)
/// each fail independently toward the suspicious default, so extraction
/// only errors for URLs that cannot be parsed at all.
pub struct FeatureExtractor {
    lexical: LexicalAnalyzer,
    registration: RegistrationChecker,
    traffic: TrafficRankChecker,
    content: ContentFetcher,
}

impl FeatureExtractor {
    pub fn new(config: &Config) -> Result<Self> {
        Self::build(config, false)
    }

    /// Extractor whose lookups are served from fixed offline tables.
    pub fn with_mock_lookups(config: &Config) -> Result<Self> {
        Self::build(config, true)
    }

    fn build(config: &Config, use_mock: bool) -> Result<Self> {
        Ok(Self {
            lexical: LexicalAnalyzer::new(),
            registration: RegistrationChecker::new(config.lookups.whois_timeout_seconds, use_mock),
            traffic: TrafficRankChecker::new(
                &config.lookups.traffic_rank_endpoint,
                config.lookups.traffic_timeout_seconds,
                use_mock,
            )?,
            content: ContentFetcher::new(
                config.lookups.fetch_timeout_seconds,
                config.lookups.max_redirects,
                use_mock,
            )?,
        })
    }

    pub async fn extract(&self, url_text: &str) -> Result<FeatureVector> {
        let parsed =
            Url::parse(url_text).map_err(|e| anyhow!("unparsable URL '{url_text}': {e}"))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| anyhow!("URL has no host: '{url_text}'"))?
            .to_lowercase();

        let mut values = [0.0; FEATURE_COUNT];

        values[0] = LexicalAnalyzer::ip_literal_flag(url_text) as f64;
        values[1] = LexicalAnalyzer::at_sign_flag(url_text) as f64;
        values[2] = LexicalAnalyzer::length_flag(url_text) as f64;
        values[3] = LexicalAnalyzer::path_depth(&parsed) as f64;
        values[4] = LexicalAnalyzer::redirection_flag(url_text) as f64;
        values[5] = LexicalAnalyzer::https_in_host_flag(&parsed) as f64;
        values[6] = self.lexical.shortener_flag(url_text) as f64;
        values[7] = LexicalAnalyzer::hyphen_flag(&parsed) as f64;

        match self.registration.lookup(&host).await {
            Ok(info) => {
                values[8] = 0.0;
                values[10] = registration::domain_age_flag(&info) as f64;
                values[11] = registration::domain_expiry_flag(&info, SystemTime::now()) as f64;
            }
            Err(e) => {
                log::debug!("Registration lookup failed for {host}: {e}");
                values[8] = 1.0;
                values[10] = 1.0;
                values[11] = 1.0;
            }
        }

        values[9] = self.traffic.rank_flag(url_text).await as f64;

        let page = match self.content.fetch(url_text).await {
            Ok(page) => Some(page),
            Err(e) => {
                log::debug!("Content fetch failed for {url_text}: {e}");
                None
            }
        };
        values[12] = self.content.iframe_flag(page.as_ref()) as f64;
        values[13] = self.content.mouseover_flag(page.as_ref()) as f64;
        values[14] = self.content.right_click_flag(page.as_ref()) as f64;
        values[15] = self.content.forwarding_flag(page.as_ref()) as f64;

        log::debug!("Extracted features for {url_text}: {values:?}");

        Ok(FeatureVector::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_extractor() -> FeatureExtractor {
        FeatureExtractor::with_mock_lookups(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_vector_shape_and_value_ranges() {
        let extractor = mock_extractor();
        let vector = extractor
            .extract("http://secure-login.com/a/b/c")
            .await
            .unwrap();

        assert_eq!(vector.values().len(), FEATURE_COUNT);
        for (i, &value) in vector.values().iter().enumerate() {
            if i == 3 {
                assert!(value >= 0.0 && value.fract() == 0.0, "depth must be a count");
            } else {
                assert!(value == 0.0 || value == 1.0, "index {i} must be binary");
            }
        }
    }

    #[tokio::test]
    async fn test_clean_url_extracts_all_quiet() {
        let extractor = mock_extractor();
        let vector = extractor.extract("http://example.com/").await.unwrap();
        assert_eq!(vector.values(), &[0.0; FEATURE_COUNT]);
    }

    #[tokio::test]
    async fn test_lexical_positions() {
        let extractor = mock_extractor();
        let vector = extractor
            .extract("http://secure-login.com/a/b/c")
            .await
            .unwrap();

        assert_eq!(vector.get(3), Some(3.0)); // depth
        assert_eq!(vector.get(4), Some(0.0)); // "//" only at the scheme
        assert_eq!(vector.get(5), Some(0.0)); // no 'https' in host
        assert_eq!(vector.get(7), Some(1.0)); // hyphenated host
    }

    #[tokio::test]
    async fn test_failed_lookups_default_to_suspicious() {
        let extractor = mock_extractor();
        // Host absent from every mock table: registration, rank, and
        // content lookups all fail.
        let vector = extractor
            .extract("http://unknown-host.example/")
            .await
            .unwrap();

        for index in [8, 9, 10, 11, 12, 13, 14, 15] {
            assert_eq!(vector.get(index), Some(1.0), "index {index}");
        }
    }

    #[tokio::test]
    async fn test_unparsable_url_is_an_error() {
        let extractor = mock_extractor();
        assert!(extractor.extract("not a url").await.is_err());
        assert!(extractor.extract("mailto:user@example.com").await.is_err());
    }

    #[test]
    fn test_fired_requires_exactly_one() {
        let mut values = [0.0; FEATURE_COUNT];
        values[3] = 3.0;
        values[7] = 1.0;
        let vector = FeatureVector::new(values);

        assert!(vector.fired(7));
        assert!(!vector.fired(3)); // a depth of 3 is not a fired flag
        assert!(!vector.fired(0));
        assert!(!vector.fired(99));
    }
}
