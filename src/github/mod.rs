pub mod client;
pub mod types;

pub use client::GitHubClient;
pub use types::{AnyResource, Discussion, Issue, PullRequest, Resource, ResourceKind};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::parser::ResourceUrl;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("unsupported URL type: {url} (supported: issues, pull requests, discussions)")]
    UnsupportedUrl { url: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication required for resource: {resource} (set GITHUB_TOKEN environment variable)")]
    AuthRequired { resource: String },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("rate limit exceeded, resets at {reset_at}")]
    RateLimitExceeded { reset_at: i64 },

    #[error("network error during {op}: {source}")]
    Network {
        op: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid API response: {reason}")]
    InvalidResponse { reason: String },

    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid path segment {segment:?} in request URL")]
    InvalidPathSegment { segment: String },
}

/// Source of fully populated resources.
///
/// Implementations do the network work; callers only see finished model values.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Issue, GitHubError>;

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GitHubError>;

    async fn fetch_discussion(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Discussion, GitHubError>;
}

/// Fetch whichever resource `target` was classified as.
#[instrument(
    skip(fetcher, target),
    fields(owner = %target.owner, repo = %target.repo, number = target.number)
)]
pub async fn fetch_resource(
    fetcher: &dyn ResourceFetcher,
    target: &ResourceUrl,
) -> Result<AnyResource, GitHubError> {
    let kind = match target.kind {
        Some(kind) if target.is_valid => kind,
        _ => {
            return Err(GitHubError::UnsupportedUrl {
                url: target.original_url.clone(),
            })
        }
    };
    debug!(kind = %kind, "dispatching fetch");

    let (owner, repo, number) = (target.owner.as_str(), target.repo.as_str(), target.number);
    let resource: AnyResource = match kind {
        ResourceKind::Issue => fetcher.fetch_issue(owner, repo, number).await?.into(),
        ResourceKind::PullRequest => fetcher.fetch_pull_request(owner, repo, number).await?.into(),
        ResourceKind::Discussion => fetcher.fetch_discussion(owner, repo, number).await?.into(),
    };
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::types::test_support::*;
    use super::*;
    use crate::parser;
    use std::sync::Mutex;

    /// Records which fetch path was taken and returns canned resources.
    #[derive(Default)]
    struct RecordingFetcher {
        calls: Mutex<Vec<(ResourceKind, String, String, u64)>>,
    }

    impl RecordingFetcher {
        fn record(&self, kind: ResourceKind, owner: &str, repo: &str, number: u64) {
            self.calls
                .lock()
                .unwrap()
                .push((kind, owner.to_string(), repo.to_string(), number));
        }
    }

    #[async_trait]
    impl ResourceFetcher for RecordingFetcher {
        async fn fetch_issue(
            &self,
            owner: &str,
            repo: &str,
            number: u64,
        ) -> Result<Issue, GitHubError> {
            self.record(ResourceKind::Issue, owner, repo, number);
            Ok(sample_issue())
        }

        async fn fetch_pull_request(
            &self,
            owner: &str,
            repo: &str,
            number: u64,
        ) -> Result<PullRequest, GitHubError> {
            self.record(ResourceKind::PullRequest, owner, repo, number);
            Ok(sample_pull_request())
        }

        async fn fetch_discussion(
            &self,
            owner: &str,
            repo: &str,
            number: u64,
        ) -> Result<Discussion, GitHubError> {
            self.record(ResourceKind::Discussion, owner, repo, number);
            Err(GitHubError::NotFound {
                url: format!("{owner}/{repo}#{number}"),
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_dispatches_on_issue_kind() {
        let fetcher = RecordingFetcher::default();
        let target = parser::classify("https://github.com/golang/go/issues/12345");
        let resource = fetch_resource(&fetcher, &target).await.unwrap();
        assert_eq!(resource.kind(), ResourceKind::Issue);

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[(ResourceKind::Issue, "golang".to_string(), "go".to_string(), 12345)]
        );
    }

    #[tokio::test]
    async fn test_fetch_dispatches_on_pull_request_kind() {
        let fetcher = RecordingFetcher::default();
        let target = parser::classify("https://github.com/golang/go/pull/999");
        let resource = fetch_resource(&fetcher, &target).await.unwrap();
        assert!(matches!(resource, AnyResource::PullRequest(_)));
    }

    #[tokio::test]
    async fn test_fetch_propagates_fetcher_errors() {
        let fetcher = RecordingFetcher::default();
        let target = parser::classify("https://github.com/golang/go/discussions/42");
        let err = fetch_resource(&fetcher, &target).await.unwrap_err();
        assert!(matches!(err, GitHubError::NotFound { .. }));
        assert_eq!(fetcher.calls.lock().unwrap()[0].0, ResourceKind::Discussion);
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_target() {
        let fetcher = RecordingFetcher::default();
        let target = parser::classify("https://github.com/golang/go/wiki/Home");
        let err = fetch_resource(&fetcher, &target).await.unwrap_err();
        assert!(matches!(
            err,
            GitHubError::UnsupportedUrl { ref url } if url.ends_with("/wiki/Home")
        ));
        assert!(fetcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_error_messages() {
        let err = GitHubError::AuthRequired {
            resource: "discussions".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authentication required for resource: discussions (set GITHUB_TOKEN environment variable)"
        );
        let err = GitHubError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 500): boom");
        let err = GitHubError::RateLimitExceeded { reset_at: 1_700_000_000 };
        assert_eq!(err.to_string(), "rate limit exceeded, resets at 1700000000");
    }
}
