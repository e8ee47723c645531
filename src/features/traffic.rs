use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Sites ranked at or beyond this position are treated as low-traffic.
const LOW_TRAFFIC_RANK: u64 = 100_000;

/// Looks up a site's global traffic rank from an external ranking service.
pub struct TrafficRankChecker {
    client: reqwest::Client,
    endpoint: String,
    rank_pattern: Regex,
    use_mock: bool,
}

impl TrafficRankChecker {
    pub fn new(endpoint: &str, timeout_seconds: u64, use_mock: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            rank_pattern: Regex::new(r#"RANK="(\d+)""#).unwrap(),
            use_mock,
        })
    }

    /// Low-traffic flag: 1 when the site ranks outside the top 100k, or when
    /// the rank cannot be determined at all.
    pub async fn rank_flag(&self, url_text: &str) -> u8 {
        match self.lookup_rank(url_text).await {
            Ok(rank) => {
                log::debug!("Traffic rank for {url_text}: {rank}");
                if rank >= LOW_TRAFFIC_RANK {
                    1
                } else {
                    0
                }
            }
            Err(e) => {
                log::debug!("Traffic rank lookup failed for {url_text}: {e}");
                1
            }
        }
    }

    async fn lookup_rank(&self, url_text: &str) -> Result<u64> {
        if self.use_mock {
            return self.mock_rank(url_text);
        }

        let encoded: String = url::form_urlencoded::byte_serialize(url_text.as_bytes()).collect();
        let query_url = format!("{}{}", self.endpoint, encoded);

        let body = self
            .client
            .get(&query_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let captures = self
            .rank_pattern
            .captures(&body)
            .ok_or_else(|| anyhow!("no RANK attribute in ranking response"))?;

        Ok(captures[1].parse()?)
    }

    fn mock_rank(&self, url_text: &str) -> Result<u64> {
        let mock_data: HashMap<&str, u64> = HashMap::from([
            ("google.com", 1),
            ("example.com", 1500),
            ("rust-lang.org", 9000),
            ("secure-login.com", 350_000),
            ("fresh-deal.info", 2_500_000),
        ]);

        let host = Url::parse(url_text)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .ok_or_else(|| anyhow!("no host in {url_text}"))?;

        mock_data
            .iter()
            .find(|(domain, _)| host.ends_with(*domain))
            .map(|(_, &rank)| rank)
            .ok_or_else(|| anyhow!("no mock rank for {host}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_checker() -> TrafficRankChecker {
        TrafficRankChecker::new("http://rank.invalid/?url=", 5, true).unwrap()
    }

    #[tokio::test]
    async fn test_high_traffic_site_stays_quiet() {
        let checker = mock_checker();
        assert_eq!(checker.rank_flag("http://example.com/").await, 0);
        assert_eq!(checker.rank_flag("https://google.com/search").await, 0);
    }

    #[tokio::test]
    async fn test_low_traffic_site_flags() {
        let checker = mock_checker();
        assert_eq!(checker.rank_flag("http://fresh-deal.info/win").await, 1);
        assert_eq!(checker.rank_flag("http://secure-login.com/a").await, 1);
    }

    #[tokio::test]
    async fn test_unknown_rank_defaults_to_flagged() {
        let checker = mock_checker();
        assert_eq!(checker.rank_flag("http://no-rank-here.example/").await, 1);
    }

    #[test]
    fn test_rank_pattern_parse() {
        let checker = mock_checker();
        let body = r#"<ALEXA><SD><POPULARITY URL="example.com/" TEXT="1500"/><REACH RANK="1500"/></SD></ALEXA>"#;
        let captures = checker.rank_pattern.captures(body).unwrap();
        assert_eq!(&captures[1], "1500");
    }
}
