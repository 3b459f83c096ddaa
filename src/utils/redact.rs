// file: src/utils/redact.rs
// description: scrubs access tokens out of urls and captured git output
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

pub const REDACTED: &str = "***";

lazy_static! {
    // userinfo section of http(s) urls, e.g. https://TOKEN@github.com/...
    static ref URL_USERINFO: Regex = Regex::new(
        r"(?i)\b(https?://)[^/@\s]+@"
    ).expect("URL_USERINFO regex is valid");
}

/// Replaces every occurrence of the given secrets, then masks any
/// remaining url userinfo.
pub fn redact(text: &str, secrets: &[&str]) -> String {
    let mut out = text.to_string();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        out = out.replace(secret, REDACTED);
    }
    redact_url_userinfo(&out)
}

pub fn redact_url_userinfo(text: &str) -> String {
    URL_USERINFO
        .replace_all(text, format!("${{1}}{}@", REDACTED).as_str())
        .into_owned()
}
