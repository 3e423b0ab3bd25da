use url::Url;

use crate::error::ValidationError;

/// Returns true if `candidate` parses as an absolute URL whose scheme is
/// exactly `http` or `https`.
pub fn is_valid_target(candidate: &str) -> bool {
    parse_target(candidate).is_ok()
}

/// Parse a target URL, rejecting anything that is not absolute http(s).
pub fn parse_target(candidate: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(candidate)
        .map_err(|_| ValidationError::InvalidTarget(candidate.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ValidationError::InvalidTarget(candidate.to_string())),
    }
}
