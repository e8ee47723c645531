use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosts containing any of these entries bypass the pipeline with a
    /// safe verdict.
    pub trusted_domains: Vec<String>,
    /// Path to the JSON model artifact loaded at startup.
    pub model_path: String,
    pub lookups: LookupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub whois_timeout_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub traffic_timeout_seconds: u64,
    /// Ranking service endpoint; the URL under test is appended
    /// percent-encoded.
    pub traffic_rank_endpoint: String,
    pub max_redirects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trusted_domains: vec![
                "google.com".to_string(),
                "youtube.com".to_string(),
                "amazon.com".to_string(),
                "amazon.in".to_string(),
                "microsoft.com".to_string(),
                "apple.com".to_string(),
                "onlinesbi.sbi".to_string(),
                "icicibank.com".to_string(),
                "hdfcbank.com".to_string(),
                "india.gov.in".to_string(),
                "gov.in".to_string(),
            ],
            model_path: "phishguard-model.json".to_string(),
            lookups: LookupConfig {
                whois_timeout_seconds: 10,
                fetch_timeout_seconds: 5,
                traffic_timeout_seconds: 10,
                traffic_rank_endpoint: "http://data.alexa.com/data?cli=10&dat=s&url=".to_string(),
                max_redirects: 10,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_carries_trusted_domains() {
        let config = Config::default();
        assert!(config
            .trusted_domains
            .iter()
            .any(|domain| domain == "google.com"));
        assert_eq!(config.lookups.fetch_timeout_seconds, 5);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.trusted_domains, config.trusted_domains);
        assert_eq!(parsed.model_path, config.model_path);
        assert_eq!(
            parsed.lookups.traffic_rank_endpoint,
            config.lookups.traffic_rank_endpoint
        );
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(serde_yaml::from_str::<Config>("trusted_domains: 7").is_err());
    }
}
