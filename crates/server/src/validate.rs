//! IPv4 input validation.
//!
//! Every address is checked here before it reaches the resolver.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ServerError;

static DOTTED_QUAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").expect("dotted-quad pattern compiles"));

/// Validate one address and return it trimmed.
pub fn ipv4(raw: &str) -> Result<String, ServerError> {
    let ip = raw.trim();
    if !DOTTED_QUAD.is_match(ip) || ip.split('.').any(|octet| octet.parse::<u8>().is_err()) {
        return Err(ServerError::InvalidInput(format!("invalid IPv4 address: {raw:?}")));
    }
    Ok(ip.to_string())
}

/// Validate a whole list. Any bad address rejects the list, naming all of them.
pub fn ipv4_list(raw: &[String]) -> Result<Vec<String>, ServerError> {
    let mut valid = Vec::with_capacity(raw.len());
    let mut invalid = Vec::new();
    for ip in raw {
        match ipv4(ip) {
            Ok(ip) => valid.push(ip),
            Err(_) => invalid.push(ip.as_str()),
        }
    }

    if !invalid.is_empty() {
        return Err(ServerError::InvalidInput(format!("invalid IPv4 addresses: {}", invalid.join(", "))));
    }
    Ok(valid)
}
