pub mod types;

pub use types::{ResourceUrl, UrlPattern};

use thiserror::Error;
use tracing::debug;

use crate::github::types::ResourceKind;
use types::SUPPORTED_PATTERNS;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid URL {url:?}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("unsupported URL type: {url} (supported: {})", kinds_list())]
    Unsupported { url: String },
}

fn kinds_list() -> String {
    supported_kinds()
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Return the first supported pattern that matches the whole of `url`.
pub fn match_pattern(url: &str) -> Option<&'static UrlPattern> {
    SUPPORTED_PATTERNS.iter().find(|p| p.pattern.is_match(url))
}

/// True if `url` has one of the supported shapes.
pub fn is_supported(url: &str) -> bool {
    match_pattern(url).is_some()
}

/// Resource kinds in pattern declaration order.
pub fn supported_kinds() -> Vec<ResourceKind> {
    SUPPORTED_PATTERNS.iter().map(|p| p.kind).collect()
}

/// Classify a URL into its resource kind and address components.
///
/// Never fails: unrecognised input yields a `ResourceUrl` with `is_valid == false`.
/// A number too large for `u64` is also reported as invalid.
pub fn classify(url: &str) -> ResourceUrl {
    let Some(pattern) = match_pattern(url) else {
        return ResourceUrl::invalid(url);
    };
    let Some(caps) = pattern.pattern.captures(url) else {
        return ResourceUrl::invalid(url);
    };

    let (Some(owner), Some(repo), Some(number)) = (caps.get(1), caps.get(2), caps.get(3)) else {
        return ResourceUrl::invalid(url);
    };
    let Ok(number) = number.as_str().parse::<u64>() else {
        debug!(url, "resource number out of range");
        return ResourceUrl::invalid(url);
    };

    ResourceUrl {
        original_url: url.to_string(),
        owner: owner.as_str().to_string(),
        repo: repo.as_str().to_string(),
        number,
        kind: Some(pattern.kind),
        is_valid: true,
    }
}

/// Like [`classify`], but reports why a URL was rejected.
///
/// Input that is not an absolute URL at all, or whose number does not fit in
/// a `u64`, is `Malformed`; anything else that fails to classify is `Unsupported`.
pub fn parse(url: &str) -> Result<ResourceUrl, ParseError> {
    if is_supported(url) {
        let resource_url = classify(url);
        if resource_url.is_valid {
            return Ok(resource_url);
        }
        return Err(ParseError::Malformed {
            url: url.to_string(),
            reason: "resource number is out of range".to_string(),
        });
    }

    if let Err(err) = reqwest::Url::parse(url) {
        return Err(ParseError::Malformed {
            url: url.to_string(),
            reason: err.to_string(),
        });
    }
    Err(ParseError::Unsupported {
        url: url.to_string(),
    })
}

/// Usage text listing every supported URL shape.
pub fn usage_help() -> String {
    let mut help = String::from("Supported URLs:\n");
    for pattern in SUPPORTED_PATTERNS.iter() {
        help.push_str(&format!("  {:<25} {}\n", pattern.description, pattern.example));
    }
    help
}
