use anyhow::{anyhow, Result};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// A fetched page body plus the number of redirect hops followed to reach it.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: String,
    pub redirect_count: usize,
}

/// Redirect chains longer than this are treated as excessive forwarding.
const FORWARDING_THRESHOLD: usize = 2;

/// Fetches page content with explicit redirect accounting. A single attempt
/// per request; any failure leaves the caller with the empty sentinel
/// (`None`) and every content flag raised.
pub struct ContentFetcher {
    client: reqwest::Client,
    max_redirects: usize,
    use_mock: bool,
    iframe_pattern: Regex,
    mouseover_pattern: Regex,
    right_click_pattern: Regex,
}

impl ContentFetcher {
    pub fn new(timeout_seconds: u64, max_redirects: usize, use_mock: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_redirects,
            use_mock,
            iframe_pattern: Regex::new(r"(?i)<iframe|frameborder").unwrap(),
            mouseover_pattern: Regex::new(r"<script>.+onmouseover.+</script>").unwrap(),
            right_click_pattern: Regex::new(r"event.button ?== ?2").unwrap(),
        })
    }

    /// Fetch the URL, following redirects one hop at a time so the chain
    /// length is observable.
    pub async fn fetch(&self, url_text: &str) -> Result<FetchedPage> {
        if self.use_mock {
            return self.mock_fetch(url_text);
        }

        let mut current_url = url_text.to_string();
        let mut redirect_count = 0;

        loop {
            let response = self.client.get(&current_url).send().await?;

            if response.status().is_redirection() {
                if redirect_count >= self.max_redirects {
                    return Err(anyhow!("redirect limit exceeded at {current_url}"));
                }
                let location = response
                    .headers()
                    .get("location")
                    .ok_or_else(|| anyhow!("redirect without location header"))?
                    .to_str()?;

                // Handle relative redirect targets
                current_url = if location.starts_with("http") {
                    location.to_string()
                } else {
                    let base = Url::parse(&current_url)?;
                    base.join(location)?.to_string()
                };

                redirect_count += 1;
                log::debug!("Following redirect {redirect_count} to {current_url}");
            } else {
                let body = response.text().await?;
                return Ok(FetchedPage {
                    body,
                    redirect_count,
                });
            }
        }
    }

    /// Quiet (0) when an iframe or frame-border marker is present in the
    /// body; raised otherwise and on the empty sentinel.
    pub fn iframe_flag(&self, page: Option<&FetchedPage>) -> u8 {
        match page {
            Some(page) if self.iframe_pattern.is_match(&page.body) => 0,
            Some(_) => 1,
            None => 1,
        }
    }

    /// Raised when a script block rewires `onmouseover`, and on the empty
    /// sentinel.
    pub fn mouseover_flag(&self, page: Option<&FetchedPage>) -> u8 {
        match page {
            Some(page) if self.mouseover_pattern.is_match(&page.body) => 1,
            Some(_) => 0,
            None => 1,
        }
    }

    /// Quiet (0) when an `event.button == 2` handler is present; raised
    /// otherwise and on the empty sentinel.
    pub fn right_click_flag(&self, page: Option<&FetchedPage>) -> u8 {
        match page {
            Some(page) if self.right_click_pattern.is_match(&page.body) => 0,
            Some(_) => 1,
            None => 1,
        }
    }

    /// Raised when the fetch followed more than two redirect hops, and on
    /// the empty sentinel.
    pub fn forwarding_flag(&self, page: Option<&FetchedPage>) -> u8 {
        match page {
            Some(page) if page.redirect_count <= FORWARDING_THRESHOLD => 0,
            Some(_) => 1,
            None => 1,
        }
    }

    fn mock_fetch(&self, url_text: &str) -> Result<FetchedPage> {
        let mock_pages: HashMap<&str, (&str, usize)> = HashMap::from([
            (
                "example.com",
                (
                    "<html><iframe src=\"/embed\"></iframe>\
                     <script>if (event.button == 2) { return; }</script></html>",
                    0,
                ),
            ),
            (
                "rust-lang.org",
                (
                    "<html><iframe src=\"/playground\"></iframe>\
                     <script>if (event.button == 2) { return; }</script></html>",
                    0,
                ),
            ),
            (
                "fresh-deal.info",
                (
                    "<html><script>document.onmouseover = hideStatus();</script></html>",
                    4,
                ),
            ),
            (
                "secure-login.com",
                (
                    "<html><script>banner.onmouseover = swapUrl();</script></html>",
                    1,
                ),
            ),
        ]);

        let host = Url::parse(url_text)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .ok_or_else(|| anyhow!("no host in {url_text}"))?;

        mock_pages
            .iter()
            .find(|(domain, _)| host.ends_with(*domain))
            .map(|(_, &(body, redirect_count))| FetchedPage {
                body: body.to_string(),
                redirect_count,
            })
            .ok_or_else(|| anyhow!("no mock page for {host}"))
    }
}
