use regex::Regex;
use std::sync::LazyLock;

use crate::github::types::ResourceKind;

/// The result of classifying a URL.
///
/// When `is_valid` is true, `owner`, `repo` and `number` all come from the same
/// pattern match and `kind` is set. Otherwise the fields are empty/zero and
/// `kind` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUrl {
    pub original_url: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub kind: Option<ResourceKind>,
    pub is_valid: bool,
}

impl ResourceUrl {
    pub(crate) fn invalid(url: &str) -> Self {
        ResourceUrl {
            original_url: url.to_string(),
            owner: String::new(),
            repo: String::new(),
            number: 0,
            kind: None,
            is_valid: false,
        }
    }
}

/// A compiled URL shape together with the resource kind it identifies.
#[derive(Debug)]
pub struct UrlPattern {
    pub pattern: Regex,
    pub kind: ResourceKind,
    pub description: &'static str,
    /// Example URL shown in usage text
    pub example: &'static str,
}

/// Supported URL shapes, in matching priority order.
pub static SUPPORTED_PATTERNS: LazyLock<[UrlPattern; 3]> = LazyLock::new(|| {
    [
        UrlPattern {
            pattern: Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/issues/(\d+)$")
                .expect("Failed to compile issue URL regex"),
            kind: ResourceKind::Issue,
            description: "GitHub Issue URL",
            example: "https://github.com/{owner}/{repo}/issues/{number}",
        },
        UrlPattern {
            pattern: Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/pull/(\d+)$")
                .expect("Failed to compile pull request URL regex"),
            kind: ResourceKind::PullRequest,
            description: "GitHub Pull Request URL",
            example: "https://github.com/{owner}/{repo}/pull/{number}",
        },
        UrlPattern {
            pattern: Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/discussions/(\d+)$")
                .expect("Failed to compile discussion URL regex"),
            kind: ResourceKind::Discussion,
            description: "GitHub Discussion URL",
            example: "https://github.com/{owner}/{repo}/discussions/{number}",
        },
    ]
});
