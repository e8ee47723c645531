use regex::Regex;
use url::Url;

/// Domains operated by link-shortening services. Shortened links hide their
/// final destination from the user.
const SHORTENER_PATTERN: &str = r"bit\.ly|goo\.gl|shorte\.st|go2l\.ink|x\.co|ow\.ly|t\.co|tinyurl|tr\.im|is\.gd|cli\.gs|yfrog\.com|migre\.me|ff\.im|tiny\.cc|url4\.eu|twit\.ac|su\.pr|twurl\.nl|snipurl\.com|short\.to|BudURL\.com|ping\.fm|post\.ly|Just\.as|bkite\.com|snipr\.com|fic\.kr|loopt\.us|doiop\.com|short\.ie|kl\.am|wp\.me|rubyurl\.com|om\.ly|to\.ly|bit\.do|lnkd\.in|db\.tt|qr\.ae|adf\.ly|bitly\.com|cur\.lv|tinyurl\.com|ity\.im|q\.gs|po\.st|bc\.vc|u\.to|j\.mp|buzurl\.com|cutt\.us|yourls\.org|prettylinkpro\.com|scrnch\.me|v\.gd";

/// URLs at or above this length are flagged as attempting to hide their
/// true destination.
const LONG_URL_THRESHOLD: usize = 75;

/// Lexical URL signals computed from the request string alone, no I/O.
pub struct LexicalAnalyzer {
    shortener_pattern: Regex,
}

impl Default for LexicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalAnalyzer {
    pub fn new() -> Self {
        Self {
            shortener_pattern: Regex::new(SHORTENER_PATTERN).unwrap(),
        }
    }

    /// Flag raised when the request string parses as a bare IP address.
    /// The whole URL text is checked, so a well-formed URL with an IP host
    /// (scheme and path attached) does not raise it.
    pub fn ip_literal_flag(url_text: &str) -> u8 {
        if url_text.parse::<std::net::IpAddr>().is_ok() {
            1
        } else {
            0
        }
    }

    /// '@' anywhere in the URL hides the real destination from casual reading.
    pub fn at_sign_flag(url_text: &str) -> u8 {
        if url_text.contains('@') {
            1
        } else {
            0
        }
    }

    pub fn length_flag(url_text: &str) -> u8 {
        if url_text.len() >= LONG_URL_THRESHOLD {
            1
        } else {
            0
        }
    }

    /// Number of non-empty path segments.
    pub fn path_depth(parsed: &Url) -> u32 {
        parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .count() as u32
    }

    /// Position of the last "//" in the URL text. Past the scheme separator
    /// (byte 6 for http, 7 for https) a second "//" indicates an embedded
    /// redirect target.
    pub fn redirection_flag(url_text: &str) -> u8 {
        match url_text.rfind("//") {
            Some(pos) if pos > 6 => {
                if pos > 7 {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    /// 'https' appearing inside the host itself, e.g. `https-secure.example`.
    pub fn https_in_host_flag(parsed: &Url) -> u8 {
        match parsed.host_str() {
            Some(host) if host.contains("https") => 1,
            _ => 0,
        }
    }

    pub fn shortener_flag(&self, url_text: &str) -> u8 {
        if self.shortener_pattern.is_match(url_text) {
            1
        } else {
            0
        }
    }

    pub fn hyphen_flag(parsed: &Url) -> u8 {
        match parsed.host_str() {
            Some(host) if host.contains('-') => 1,
            _ => 0,
        }
    }
}
