use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Registration window (in months of 30 days) below which a domain's total
/// registered lifespan is considered suspiciously short.
const SHORT_LIFESPAN_MONTHS: f64 = 6.0;

/// Remaining-validity window (in months of 30 days) at or beyond which the
/// expiry flag raises.
const FAR_EXPIRY_MONTHS: f64 = 6.0;

#[derive(Debug, Clone)]
pub struct RegistrationInfo {
    pub domain: String,
    pub creation_date: Option<SystemTime>,
    pub expiration_date: Option<SystemTime>,
    pub cached_at: SystemTime,
}

/// WHOIS-backed registration lookup with a DNS existence pre-check.
/// One attempt per request; failures surface as `Err` and the caller maps
/// them to conservative feature defaults.
#[derive(Debug, Clone)]
pub struct RegistrationChecker {
    cache: Arc<RwLock<HashMap<String, RegistrationInfo>>>,
    cache_ttl: Duration,
    timeout: Duration,
    use_mock: bool,
}

impl RegistrationChecker {
    pub fn new(timeout_seconds: u64, use_mock: bool) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            timeout: Duration::from_secs(timeout_seconds),
            use_mock,
        }
    }

    /// Extract root domain for WHOIS queries (removes subdomains)
    /// e.g., "login.secure-login.com" -> "secure-login.com"
    pub fn extract_root_domain(&self, domain: &str) -> String {
        let parts: Vec<&str> = domain.split('.').collect();

        if parts.len() >= 2 {
            let root = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);

            // Handle common two-part TLDs like .co.uk, .com.au, etc.
            if parts.len() >= 3 {
                let potential_tld =
                    format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
                let common_two_part_tlds = [
                    "co.uk", "com.au", "co.jp", "co.kr", "com.br", "co.za", "com.mx", "co.in",
                    "com.sg", "co.nz", "com.ar", "co.il", "org.uk", "net.au", "gov.uk", "ac.uk",
                    "gov.in", "edu.au",
                ];

                if common_two_part_tlds.contains(&potential_tld.as_str()) {
                    return format!(
                        "{}.{}.{}",
                        parts[parts.len() - 3],
                        parts[parts.len() - 2],
                        parts[parts.len() - 1]
                    );
                }
            }

            root
        } else {
            domain.to_string()
        }
    }

    /// Look up registration dates for a host. Cached for 24 hours.
    pub async fn lookup(&self, host: &str) -> Result<RegistrationInfo> {
        let root_domain = self.extract_root_domain(host).to_lowercase();
        log::debug!("Looking up registration for {host} (root: {root_domain})");

        if root_domain.is_empty() || !root_domain.contains('.') || root_domain.len() > 255 {
            return Err(anyhow!("invalid domain format: {root_domain}"));
        }

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&root_domain) {
                let cache_age = SystemTime::now()
                    .duration_since(cached.cached_at)
                    .unwrap_or(Duration::from_secs(0));
                if cache_age < self.cache_ttl {
                    log::debug!("Using cached registration info for: {root_domain}");
                    return Ok(cached.clone());
                }
            }
        }

        let info = if self.use_mock {
            self.mock_registration_info(&root_domain)?
        } else {
            self.fetch_registration_info(&root_domain).await?
        };

        {
            let mut cache = self.cache.write().await;
            cache.insert(root_domain, info.clone());
        }

        Ok(info)
    }

    async fn fetch_registration_info(&self, domain: &str) -> Result<RegistrationInfo> {
        // A host without any DNS records cannot be served; skip the WHOIS
        // round trip entirely.
        self.check_resolvable(domain).await?;

        let whois_server = self.whois_server_for(domain);
        log::debug!("Using WHOIS server: {whois_server} for domain: {domain}");

        match self.query_whois_server(&whois_server, domain).await {
            Ok(whois_text) => self.parse_whois_text(&whois_text, domain),
            Err(e) => {
                log::debug!("WHOIS query failed: {e}");
                self.try_fallback_whois_servers(domain).await
            }
        }
    }

    async fn check_resolvable(&self, domain: &str) -> Result<()> {
        use hickory_resolver::TokioAsyncResolver;

        let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
        tokio::time::timeout(self.timeout, resolver.lookup_ip(domain))
            .await
            .map_err(|_| anyhow!("DNS lookup timed out for {domain}"))?
            .map_err(|e| anyhow!("domain does not resolve: {e}"))?;
        Ok(())
    }

    fn whois_server_for(&self, domain: &str) -> String {
        let tld = domain.split('.').next_back().unwrap_or(domain);

        let whois_servers = HashMap::from([
            ("com", "whois.verisign-grs.com"),
            ("net", "whois.verisign-grs.com"),
            ("org", "whois.pir.org"),
            ("info", "whois.afilias.net"),
            ("biz", "whois.neulevel.biz"),
            ("us", "whois.nic.us"),
            ("uk", "whois.nic.uk"),
            ("in", "whois.registry.in"),
            ("de", "whois.denic.de"),
            ("fr", "whois.afnic.fr"),
            ("it", "whois.nic.it"),
            ("nl", "whois.domain-registry.nl"),
            ("au", "whois.auda.org.au"),
            ("ca", "whois.cira.ca"),
            ("jp", "whois.jprs.jp"),
            ("cn", "whois.cnnic.cn"),
            ("ru", "whois.tcinet.ru"),
            ("br", "whois.registro.br"),
            ("mx", "whois.mx"),
            ("tk", "whois.dot.tk"),
            ("ml", "whois.dot.ml"),
            ("ga", "whois.dot.ga"),
            ("cf", "whois.dot.cf"),
        ]);

        match whois_servers.get(tld) {
            Some(&server) => server.to_string(),
            None => "whois.iana.org".to_string(),
        }
    }

    /// Query a WHOIS server directly using TCP port 43
    async fn query_whois_server(&self, server: &str, domain: &str) -> Result<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpStream;
        use tokio::time::timeout;

        log::debug!("Connecting to WHOIS server: {server}:43");

        let mut stream =
            timeout(self.timeout, TcpStream::connect(format!("{server}:43"))).await??;

        let query = format!("{domain}\r\n");
        stream.write_all(query.as_bytes()).await?;

        let mut response = String::new();
        timeout(self.timeout, stream.read_to_string(&mut response)).await??;

        if response.is_empty() {
            return Err(anyhow!("Empty WHOIS response"));
        }

        Ok(response)
    }

    async fn try_fallback_whois_servers(&self, domain: &str) -> Result<RegistrationInfo> {
        let fallback_servers = ["whois.iana.org", "whois.internic.net"];

        for server in fallback_servers {
            log::debug!("Trying fallback WHOIS server: {server}");
            match self.query_whois_server(server, domain).await {
                Ok(whois_text) => {
                    if let Ok(info) = self.parse_whois_text(&whois_text, domain) {
                        return Ok(info);
                    }
                }
                Err(e) => {
                    log::debug!("Fallback server {server} failed: {e}");
                    continue;
                }
            }
        }

        Err(anyhow!("all WHOIS servers failed for {domain}"))
    }

    /// Parse creation and expiration dates out of a text WHOIS response.
    /// Either date may be absent; the response itself counts as a successful
    /// lookup as long as it is non-empty.
    fn parse_whois_text(&self, text: &str, domain: &str) -> Result<RegistrationInfo> {
        let creation_patterns = [
            r"(?i)creation\s*date[:\s]+([^\r\n]+)",
            r"(?i)created[:\s]+([^\r\n]+)",
            r"(?i)registered[:\s]+([^\r\n]+)",
            r"(?i)domain\s*created[:\s]+([^\r\n]+)",
            r"(?i)registration\s*date[:\s]+([^\r\n]+)",
            r"(?i)created\s*on[:\s]+([^\r\n]+)",
            r"(?i)registered\s*on[:\s]+([^\r\n]+)",
            r"(?i)create_date[:\s]+([^\r\n]+)",
            r"(?i)registration_time[:\s]+([^\r\n]+)",
        ];
        let expiration_patterns = [
            r"(?i)registry\s*expiry\s*date[:\s]+([^\r\n]+)",
            r"(?i)expiration\s*date[:\s]+([^\r\n]+)",
            r"(?i)expiry\s*date[:\s]+([^\r\n]+)",
            r"(?i)expires\s*on[:\s]+([^\r\n]+)",
            r"(?i)expires[:\s]+([^\r\n]+)",
            r"(?i)paid-till[:\s]+([^\r\n]+)",
            r"(?i)renewal\s*date[:\s]+([^\r\n]+)",
        ];

        let creation_date = self.scan_date(&creation_patterns, text);
        let expiration_date = self.scan_date(&expiration_patterns, text);

        if creation_date.is_none() && expiration_date.is_none() {
            log::debug!("No registration dates found in WHOIS response for {domain}");
        }

        Ok(RegistrationInfo {
            domain: domain.to_string(),
            creation_date,
            expiration_date,
            cached_at: SystemTime::now(),
        })
    }

    fn scan_date(&self, patterns: &[&str], text: &str) -> Option<SystemTime> {
        for pattern in patterns {
            if let Ok(regex) = Regex::new(pattern) {
                if let Some(captures) = regex.captures(text) {
                    if let Some(date_match) = captures.get(1) {
                        let date_str = date_match.as_str().trim();
                        if let Ok(date) = parse_date_string(date_str) {
                            return Some(date);
                        }
                        log::debug!("Could not parse date format: '{date_str}'");
                    }
                }
            }
        }
        None
    }

    /// Get mock registration information for testing
    fn mock_registration_info(&self, domain: &str) -> Result<RegistrationInfo> {
        log::debug!("Using mock registration data for domain: {domain}");

        // (days since creation, days until expiration)
        let mock_data: HashMap<&str, (u64, u64)> = HashMap::from([
            ("example.com", (8000, 90)),
            ("google.com", (9000, 3000)),
            ("rust-lang.org", (7000, 60)),
            ("fresh-deal.info", (30, 60)),
            ("secure-login.com", (45, 120)),
        ]);

        let (created_days_ago, expires_in_days) = mock_data
            .get(domain)
            .copied()
            .ok_or_else(|| anyhow!("no mock registration data for {domain}"))?;

        let now = SystemTime::now();
        Ok(RegistrationInfo {
            domain: domain.to_string(),
            creation_date: now.checked_sub(Duration::from_secs(created_days_ago * SECONDS_PER_DAY)),
            expiration_date: now
                .checked_add(Duration::from_secs(expires_in_days * SECONDS_PER_DAY)),
            cached_at: now,
        })
    }
}

/// Raised when the domain's total registered lifespan
/// (|expiration − creation|) is under six 30-day months. Missing dates
/// raise the flag.
pub fn domain_age_flag(info: &RegistrationInfo) -> u8 {
    match (info.creation_date, info.expiration_date) {
        (Some(created), Some(expires)) => {
            let lifespan_days = abs_days_between(created, expires);
            if (lifespan_days as f64) / 30.0 < SHORT_LIFESPAN_MONTHS {
                1
            } else {
                0
            }
        }
        _ => 1,
    }
}

/// Raised when the expiration date sits six or more 30-day months away from
/// now. Missing dates raise the flag.
pub fn domain_expiry_flag(info: &RegistrationInfo, now: SystemTime) -> u8 {
    match info.expiration_date {
        Some(expires) => {
            let remaining_days = abs_days_between(now, expires);
            if (remaining_days as f64) / 30.0 >= FAR_EXPIRY_MONTHS {
                1
            } else {
                0
            }
        }
        None => 1,
    }
}

fn abs_days_between(a: SystemTime, b: SystemTime) -> u64 {
    let duration = b
        .duration_since(a)
        .or_else(|_| a.duration_since(b))
        .unwrap_or(Duration::from_secs(0));
    duration.as_secs() / SECONDS_PER_DAY
}

/// Parse the common `YYYY-MM-DD`-bearing WHOIS date formats.
fn parse_date_string(date_str: &str) -> Result<SystemTime> {
    let iso_regex = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();

    if let Some(captures) = iso_regex.captures(date_str) {
        let year: u32 = captures[1].parse()?;
        let month: u32 = captures[2].parse()?;
        let day: u32 = captures[3].parse()?;

        let days = days_since_epoch(year, month, day)?;
        return Ok(UNIX_EPOCH + Duration::from_secs(days * SECONDS_PER_DAY));
    }

    Err(anyhow!("Could not parse date: {}", date_str))
}

/// Calculate days since Unix epoch (approximate)
fn days_since_epoch(year: u32, month: u32, day: u32) -> Result<u64> {
    if year < 1970 || month == 0 || month > 12 || day == 0 || day > 31 {
        return Err(anyhow!("Invalid date"));
    }

    let years_since_1970 = year - 1970;
    let mut days = years_since_1970 as u64 * 365;

    // Leap days (approximate)
    days += years_since_1970 as u64 / 4;

    let days_in_month = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    for m in 1..month {
        days += days_in_month[(m - 1) as usize] as u64;
    }

    days += day as u64 - 1;

    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with(created_days_ago: Option<u64>, expires_in_days: Option<u64>) -> RegistrationInfo {
        let now = SystemTime::now();
        RegistrationInfo {
            domain: "test.example".to_string(),
            creation_date: created_days_ago
                .map(|d| now - Duration::from_secs(d * SECONDS_PER_DAY)),
            expiration_date: expires_in_days
                .map(|d| now + Duration::from_secs(d * SECONDS_PER_DAY)),
            cached_at: now,
        }
    }

    #[test]
    fn test_extract_root_domain() {
        let checker = RegistrationChecker::new(10, false);

        assert_eq!(checker.extract_root_domain("example.com"), "example.com");
        assert_eq!(checker.extract_root_domain("login.example.com"), "example.com");
        assert_eq!(
            checker.extract_root_domain("mail.example.co.uk"),
            "example.co.uk"
        );
        assert_eq!(checker.extract_root_domain("india.gov.in"), "india.gov.in");
        assert_eq!(checker.extract_root_domain("single"), "single");
    }

    #[test]
    fn test_domain_age_flag_short_lifespan() {
        // 90-day registration window: 3 months, under the threshold.
        assert_eq!(domain_age_flag(&info_with(Some(30), Some(60))), 1);
        // 8090-day window: far past the threshold.
        assert_eq!(domain_age_flag(&info_with(Some(8000), Some(90))), 0);
        // Exactly 180 days is 6.0 months, not under the threshold.
        assert_eq!(domain_age_flag(&info_with(Some(90), Some(90))), 0);
        // Missing dates default to suspicious.
        assert_eq!(domain_age_flag(&info_with(None, Some(90))), 1);
        assert_eq!(domain_age_flag(&info_with(Some(30), None)), 1);
    }

    #[test]
    fn test_domain_expiry_flag_far_window() {
        let now = SystemTime::now();
        // Expiring within 6 months stays quiet.
        assert_eq!(domain_expiry_flag(&info_with(None, Some(90)), now), 0);
        // A long remaining validity window raises the flag.
        assert_eq!(domain_expiry_flag(&info_with(None, Some(3000)), now), 1);
        // Exactly 180 days is 6.0 months and raises it.
        assert_eq!(domain_expiry_flag(&info_with(None, Some(180)), now), 1);
        // Missing expiration defaults to suspicious.
        assert_eq!(domain_expiry_flag(&info_with(Some(30), None), now), 1);
    }

    #[test]
    fn test_parse_whois_text_both_dates() {
        let checker = RegistrationChecker::new(10, false);
        let text = "Domain Name: EXAMPLE.COM\n\
                    Creation Date: 1995-08-14T04:00:00Z\n\
                    Registry Expiry Date: 2026-08-13T04:00:00Z\n";
        let info = checker.parse_whois_text(text, "example.com").unwrap();
        assert!(info.creation_date.is_some());
        assert!(info.expiration_date.is_some());
    }

    #[test]
    fn test_parse_whois_text_no_dates() {
        let checker = RegistrationChecker::new(10, false);
        let info = checker
            .parse_whois_text("No match for domain", "nowhere.example")
            .unwrap();
        assert!(info.creation_date.is_none());
        assert!(info.expiration_date.is_none());
    }

    #[test]
    fn test_parse_date_string() {
        assert!(parse_date_string("2024-10-10").is_ok());
        assert!(parse_date_string("2024-10-10T12:00:00Z").is_ok());
        assert!(parse_date_string("garbage").is_err());
        assert!(parse_date_string("1969-01-01").is_err());
    }

    #[tokio::test]
    async fn test_mock_lookup() {
        let checker = RegistrationChecker::new(10, true);

        let info = checker.lookup("www.example.com").await.unwrap();
        assert_eq!(info.domain, "example.com");
        assert_eq!(domain_age_flag(&info), 0);
        assert_eq!(domain_expiry_flag(&info, SystemTime::now()), 0);

        // Freshly registered, short window.
        let info = checker.lookup("fresh-deal.info").await.unwrap();
        assert_eq!(domain_age_flag(&info), 1);

        // Unknown hosts simulate an unreachable registry.
        assert!(checker.lookup("unknown-host.example").await.is_err());
    }
}
