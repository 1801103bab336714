use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::types::{
    Comment, Discussion, DiscussionCategory, Issue, Label, Milestone, PullRequest, Reactions,
    ResourceStatus, User,
};
use super::{GitHubError, ResourceFetcher};
use crate::config::GitHubConfig;

const PER_PAGE: usize = 100;
const MAX_PAGES: u32 = 50;

const DISCUSSION_QUERY: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    discussion(number: $number) {
      number
      title
      body
      url
      createdAt
      updatedAt
      closed
      closedAt
      isAnswered
      author { login avatarUrl url }
      category { id slug name description }
      answer { databaseId }
      reactionGroups { content reactors { totalCount } }
      comments(first: 100) {
        totalCount
        nodes {
          databaseId
          body
          createdAt
          updatedAt
          isAnswer
          author { login avatarUrl url }
          reactionGroups { content reactors { totalCount } }
          replies(first: 100) {
            nodes {
              databaseId
              body
              createdAt
              updatedAt
              isAnswer
              author { login avatarUrl url }
              reactionGroups { content reactors { totalCount } }
            }
          }
        }
      }
    }
  }
}
"#;

/// GitHub REST + GraphQL client.
///
/// Issues and pull requests come from the REST API; discussions are only
/// exposed over GraphQL, which always needs a token.
pub struct GitHubClient {
    http: Client,
    api_url: Url,
    graphql_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let api_url = Url::parse(&config.api_url).map_err(|err| GitHubError::InvalidBaseUrl {
            url: config.api_url.clone(),
            reason: err.to_string(),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(GitHubError::InvalidBaseUrl {
                url: config.api_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| GitHubError::Network {
                op: "client setup".to_string(),
                source,
            })?;

        Ok(GitHubClient {
            http,
            api_url,
            graphql_url: config.graphql_url.clone(),
            token: config.token().map(str::to_string),
        })
    }

    #[instrument(skip(self))]
    pub async fn load_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Issue, GitHubError> {
        let number_segment = number.to_string();
        let issue_url = self.endpoint(&["repos", owner, repo, "issues", &number_segment])?;
        let comments_url =
            self.endpoint(&["repos", owner, repo, "issues", &number_segment, "comments"])?;

        let (issue, comments) = tokio::try_join!(
            self.get_json::<IssueResponse>(issue_url, &[]),
            self.get_paginated::<CommentResponse>(comments_url),
        )?;
        debug!(fetched = comments.len(), total = issue.comments, "received issue");

        Ok(Issue {
            number: issue.number,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            author: user_or_ghost(issue.user),
            state: ResourceStatus::from_api_state(&issue.state),
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            closed_at: issue.closed_at,
            comments: comments.into_iter().map(Comment::from).collect(),
            reactions: issue.reactions.into(),
            labels: issue.labels.into_iter().map(Label::from).collect(),
            milestone: issue.milestone.map(Milestone::from),
            total_comments: issue.comments,
            url: issue.html_url,
            repository_url: repository_url(owner, repo),
        })
    }

    #[instrument(skip(self))]
    pub async fn load_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GitHubError> {
        let number_segment = number.to_string();
        let pull_url = self.endpoint(&["repos", owner, repo, "pulls", &number_segment])?;
        let issue_url = self.endpoint(&["repos", owner, repo, "issues", &number_segment])?;
        let comments_url =
            self.endpoint(&["repos", owner, repo, "issues", &number_segment, "comments"])?;
        let review_comments_url =
            self.endpoint(&["repos", owner, repo, "pulls", &number_segment, "comments"])?;

        // The pulls endpoint carries no reactions, so the issue view is fetched too.
        let (pull, issue, comments, review_comments) = tokio::try_join!(
            self.get_json::<PullResponse>(pull_url, &[]),
            self.get_json::<IssueResponse>(issue_url, &[]),
            self.get_paginated::<CommentResponse>(comments_url),
            self.get_paginated::<CommentResponse>(review_comments_url),
        )?;
        debug!(
            comments = comments.len(),
            review_comments = review_comments.len(),
            additions = pull.additions,
            deletions = pull.deletions,
            "received pull request"
        );

        let mut all_comments: Vec<Comment> = comments
            .into_iter()
            .chain(review_comments)
            .map(Comment::from)
            .collect();
        all_comments.sort_by_key(|c| c.created_at);

        let state = if pull.merged_at.is_some() {
            ResourceStatus::Merged
        } else {
            ResourceStatus::from_api_state(&pull.state)
        };

        Ok(PullRequest {
            number: pull.number,
            title: pull.title,
            body: pull.body.unwrap_or_default(),
            author: user_or_ghost(pull.user),
            state,
            created_at: pull.created_at,
            updated_at: pull.updated_at,
            closed_at: pull.closed_at,
            merged_at: pull.merged_at,
            comments: all_comments,
            reactions: issue.reactions.into(),
            labels: pull.labels.into_iter().map(Label::from).collect(),
            milestone: pull.milestone.map(Milestone::from),
            total_comments: pull.comments.saturating_add(pull.review_comments),
            url: pull.html_url,
            repository_url: repository_url(owner, repo),
            is_draft: pull.draft,
            mergeable: pull.mergeable.unwrap_or(false),
            additions: pull.additions,
            deletions: pull.deletions,
        })
    }

    #[instrument(skip(self))]
    pub async fn load_discussion(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Discussion, GitHubError> {
        let resource = format!("{}/discussions/{number}", repository_url(owner, repo));
        let variables = serde_json::json!({ "owner": owner, "repo": repo, "number": number });

        let data: DiscussionData = self.graphql(DISCUSSION_QUERY, variables, &resource).await?;
        let node = data
            .repository
            .and_then(|r| r.discussion)
            .ok_or_else(|| GitHubError::NotFound { url: resource.clone() })?;
        debug!(
            fetched = node.comments.nodes.len(),
            total = node.comments.total_count,
            "received discussion"
        );

        let mut comments = Vec::new();
        for mut node_comment in node.comments.nodes {
            let parent_id = node_comment.database_id;
            let replies = node_comment.replies.take().map(|r| r.nodes).unwrap_or_default();
            comments.push(node_comment.into_comment(None));
            comments.extend(replies.into_iter().map(|reply| reply.into_comment(parent_id)));
        }

        let state = if node.closed {
            ResourceStatus::Closed
        } else {
            ResourceStatus::Open
        };

        Ok(Discussion {
            number: node.number,
            title: node.title,
            body: node.body,
            author: actor_or_ghost(node.author),
            state,
            created_at: node.created_at,
            updated_at: node.updated_at,
            closed_at: node.closed_at,
            comments,
            reactions: reactions_from_groups(&node.reaction_groups),
            total_comments: node.comments.total_count,
            url: node.url,
            repository_url: repository_url(owner, repo),
            category: node.category.into(),
            is_answered: node.is_answered.unwrap_or(false),
            answer_comment_id: node.answer.and_then(|a| a.database_id),
        })
    }

    /// REST endpoint under the API base URL. Segments are percent-encoded;
    /// empty and dot segments are refused.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GitHubError> {
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(GitHubError::InvalidPathSegment {
                segment: (*segment).to_string(),
            });
        }

        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| GitHubError::InvalidBaseUrl {
                url: self.api_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, GitHubError> {
        let path = url.path().to_string();
        debug!(url = %url, "GET");

        let mut request = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "application/vnd.github+json")
            .query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| GitHubError::Network {
            op: format!("GET {path}"),
            source,
        })?;
        let response = check_status(response, url.as_str()).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| GitHubError::InvalidResponse {
                reason: format!("{path}: {err}"),
            })
    }

    async fn get_paginated<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let query = [("per_page", PER_PAGE.to_string()), ("page", page.to_string())];
            let batch: Vec<T> = self.get_json(url.clone(), &query).await?;
            let last_page = batch.len() < PER_PAGE;
            items.extend(batch);
            if last_page {
                return Ok(items);
            }
        }
        warn!(path = url.path(), pages = MAX_PAGES, "page limit reached, list truncated");
        Ok(items)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        resource: &str,
    ) -> Result<T, GitHubError> {
        let token = self.token.as_deref().ok_or_else(|| GitHubError::AuthRequired {
            resource: resource.to_string(),
        })?;
        debug!(url = %self.graphql_url, "POST graphql");

        let response = self
            .http
            .post(&self.graphql_url)
            .bearer_auth(token)
            .json(&GraphQLRequest { query, variables })
            .send()
            .await
            .map_err(|source| GitHubError::Network {
                op: "POST graphql".to_string(),
                source,
            })?;
        let response = check_status(response, resource).await?;
        let body: GraphQLResponse<T> =
            response.json().await.map_err(|err| GitHubError::InvalidResponse {
                reason: format!("graphql: {err}"),
            })?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            if errors.iter().any(|e| e.kind.as_deref() == Some("NOT_FOUND")) {
                return Err(GitHubError::NotFound {
                    url: resource.to_string(),
                });
            }
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(GitHubError::Api {
                status: StatusCode::OK.as_u16(),
                message: messages.join(", "),
            });
        }

        body.data.ok_or_else(|| GitHubError::InvalidResponse {
            reason: "GraphQL response missing data field".to_string(),
        })
    }
}

#[async_trait]
impl ResourceFetcher for GitHubClient {
    async fn fetch_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Issue, GitHubError> {
        self.load_issue(owner, repo, number).await
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequest, GitHubError> {
        self.load_pull_request(owner, repo, number).await
    }

    async fn fetch_discussion(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Discussion, GitHubError> {
        self.load_discussion(owner, repo, number).await
    }
}

async fn check_status(response: Response, resource: &str) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &headers, &body, resource))
}

fn status_error(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    resource: &str,
) -> GitHubError {
    let rate_limited = matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
        && header_str(headers, "x-ratelimit-remaining") == Some("0");
    if rate_limited {
        let reset_at = header_str(headers, "x-ratelimit-reset")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        return GitHubError::RateLimitExceeded { reset_at };
    }

    match status {
        StatusCode::UNAUTHORIZED => GitHubError::AuthRequired {
            resource: resource.to_string(),
        },
        StatusCode::NOT_FOUND => GitHubError::NotFound {
            url: resource.to_string(),
        },
        _ => GitHubError::Api {
            status: status.as_u16(),
            message: api_message(status, body),
        },
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn api_message(status: StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    }
}

fn repository_url(owner: &str, repo: &str) -> String {
    format!("https://github.com/{owner}/{repo}")
}

// REST payloads

#[derive(Deserialize)]
struct UserResponse {
    login: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    html_url: String,
}

fn user_or_ghost(user: Option<UserResponse>) -> User {
    user.map(|u| User {
        login: u.login,
        avatar_url: u.avatar_url,
        url: u.html_url,
    })
    .unwrap_or_else(User::ghost)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ReactionsResponse {
    #[serde(rename = "+1")]
    plus_one: u32,
    #[serde(rename = "-1")]
    minus_one: u32,
    laugh: u32,
    hooray: u32,
    confused: u32,
    heart: u32,
    rocket: u32,
    eyes: u32,
    total_count: u32,
}

impl From<ReactionsResponse> for Reactions {
    fn from(r: ReactionsResponse) -> Self {
        Reactions {
            thumbs_up: r.plus_one,
            thumbs_down: r.minus_one,
            laugh: r.laugh,
            hooray: r.hooray,
            confused: r.confused,
            heart: r.heart,
            rocket: r.rocket,
            eyes: r.eyes,
            total_count: r.total_count,
        }
    }
}

#[derive(Deserialize)]
struct LabelResponse {
    name: String,
    description: Option<String>,
    #[serde(default)]
    color: String,
}

impl From<LabelResponse> for Label {
    fn from(l: LabelResponse) -> Self {
        Label {
            name: l.name,
            description: l.description.unwrap_or_default(),
            color: l.color,
        }
    }
}

#[derive(Deserialize)]
struct MilestoneResponse {
    title: String,
    description: Option<String>,
    #[serde(default)]
    state: String,
    due_on: Option<DateTime<Utc>>,
}

impl From<MilestoneResponse> for Milestone {
    fn from(m: MilestoneResponse) -> Self {
        Milestone {
            title: m.title,
            description: m.description.unwrap_or_default(),
            state: m.state,
            due_date: m.due_on,
        }
    }
}

#[derive(Deserialize)]
struct IssueResponse {
    number: u64,
    title: String,
    body: Option<String>,
    user: Option<UserResponse>,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    labels: Vec<LabelResponse>,
    milestone: Option<MilestoneResponse>,
    #[serde(default)]
    comments: u32,
    html_url: String,
    #[serde(default)]
    reactions: ReactionsResponse,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    body: Option<String>,
    user: Option<UserResponse>,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    draft: bool,
    mergeable: Option<bool>,
    #[serde(default)]
    additions: u32,
    #[serde(default)]
    deletions: u32,
    #[serde(default)]
    comments: u32,
    #[serde(default)]
    review_comments: u32,
    #[serde(default)]
    labels: Vec<LabelResponse>,
    milestone: Option<MilestoneResponse>,
    html_url: String,
}

/// Issue comment or pull request review comment.
#[derive(Deserialize)]
struct CommentResponse {
    id: u64,
    user: Option<UserResponse>,
    body: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    reactions: ReactionsResponse,
    in_reply_to_id: Option<u64>,
}

impl From<CommentResponse> for Comment {
    fn from(c: CommentResponse) -> Self {
        Comment {
            id: c.id,
            author: user_or_ghost(c.user),
            body: c.body.unwrap_or_default(),
            created_at: c.created_at,
            updated_at: c.updated_at,
            reactions: c.reactions.into(),
            is_answer: false,
            reply_to: c.in_reply_to_id,
        }
    }
}

// GraphQL payloads

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize)]
struct GraphQLError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct DiscussionData {
    repository: Option<RepositoryNode>,
}

#[derive(Deserialize)]
struct RepositoryNode {
    discussion: Option<DiscussionNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionNode {
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    closed: bool,
    closed_at: Option<DateTime<Utc>>,
    is_answered: Option<bool>,
    author: Option<ActorNode>,
    category: CategoryNode,
    answer: Option<AnswerNode>,
    #[serde(default)]
    reaction_groups: Vec<ReactionGroupNode>,
    comments: CommentConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorNode {
    login: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    url: String,
}

fn actor_or_ghost(actor: Option<ActorNode>) -> User {
    actor
        .map(|a| User {
            login: a.login,
            avatar_url: a.avatar_url,
            url: a.url,
        })
        .unwrap_or_else(User::ghost)
}

#[derive(Deserialize)]
struct CategoryNode {
    id: String,
    slug: String,
    name: String,
    #[serde(default)]
    description: String,
}

impl From<CategoryNode> for DiscussionCategory {
    fn from(c: CategoryNode) -> Self {
        DiscussionCategory {
            id: c.id,
            slug: c.slug,
            name: c.name,
            description: c.description,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerNode {
    database_id: Option<u64>,
}

#[derive(Deserialize)]
struct ReactionGroupNode {
    content: String,
    reactors: CountNode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountNode {
    total_count: u32,
}

fn reactions_from_groups(groups: &[ReactionGroupNode]) -> Reactions {
    let mut reactions = Reactions::default();
    for group in groups {
        let count = group.reactors.total_count;
        let slot = match group.content.as_str() {
            "THUMBS_UP" => &mut reactions.thumbs_up,
            "THUMBS_DOWN" => &mut reactions.thumbs_down,
            "LAUGH" => &mut reactions.laugh,
            "HOORAY" => &mut reactions.hooray,
            "CONFUSED" => &mut reactions.confused,
            "HEART" => &mut reactions.heart,
            "ROCKET" => &mut reactions.rocket,
            "EYES" => &mut reactions.eyes,
            other => {
                debug!(content = other, "ignoring unknown reaction");
                continue;
            }
        };
        *slot += count;
        reactions.total_count += count;
    }
    reactions
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentConnection {
    total_count: u32,
    #[serde(default)]
    nodes: Vec<CommentNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    database_id: Option<u64>,
    #[serde(default)]
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    is_answer: bool,
    author: Option<ActorNode>,
    #[serde(default)]
    reaction_groups: Vec<ReactionGroupNode>,
    replies: Option<ReplyConnection>,
}

#[derive(Deserialize)]
struct ReplyConnection {
    #[serde(default)]
    nodes: Vec<CommentNode>,
}

impl CommentNode {
    fn into_comment(self, reply_to: Option<u64>) -> Comment {
        Comment {
            id: self.database_id.unwrap_or_default(),
            author: actor_or_ghost(self.author),
            body: self.body,
            created_at: self.created_at,
            updated_at: self.updated_at,
            reactions: reactions_from_groups(&self.reaction_groups),
            is_answer: self.is_answer,
            reply_to,
        }
    }
}
