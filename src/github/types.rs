use chrono::{DateTime, Utc};
use serde::Serialize;

/// The kind of GitHub resource a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Issue,
    #[serde(rename = "pr")]
    PullRequest,
    Discussion,
}

impl ResourceKind {
    /// Stable short identifier (`issue`, `pr`, `discussion`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Issue => "issue",
            ResourceKind::PullRequest => "pr",
            ResourceKind::Discussion => "discussion",
        }
    }

    /// Human-readable label used in rendered metadata.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Issue => "Issue",
            ResourceKind::PullRequest => "Pull Request",
            ResourceKind::Discussion => "Discussion",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a resource. `Merged` only applies to pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Open,
    Closed,
    Merged,
}

impl ResourceStatus {
    /// Map a REST (`open`/`closed`) or GraphQL (`OPEN`/`CLOSED`/`MERGED`) state
    /// string. Anything unrecognised is treated as open.
    pub fn from_api_state(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "closed" => ResourceStatus::Closed,
            "merged" => ResourceStatus::Merged,
            _ => ResourceStatus::Open,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Open => write!(f, "open"),
            ResourceStatus::Closed => write!(f, "closed"),
            ResourceStatus::Merged => write!(f, "merged"),
        }
    }
}

/// A GitHub account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    /// Login name
    pub login: String,
    /// Avatar image URL
    pub avatar_url: String,
    /// Profile URL
    pub url: String,
}

impl User {
    /// Placeholder for content whose author account has been deleted.
    pub fn ghost() -> Self {
        User {
            login: "ghost".to_string(),
            avatar_url: String::new(),
            url: "https://github.com/ghost".to_string(),
        }
    }
}

/// Reaction counters attached to a resource or comment.
///
/// Populated verbatim from the API. `total_count` is not recomputed, so it can
/// disagree with [`Reactions::named_total`] when upstream data is inconsistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reactions {
    pub thumbs_up: u32,
    pub thumbs_down: u32,
    pub laugh: u32,
    pub hooray: u32,
    pub confused: u32,
    pub heart: u32,
    pub rocket: u32,
    pub eyes: u32,
    pub total_count: u32,
}

impl Reactions {
    /// Sum of the eight named counters.
    pub fn named_total(&self) -> u64 {
        self.entries().iter().map(|(_, n)| u64::from(*n)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0 && self.named_total() == 0
    }

    /// `(emoji, count)` pairs in a fixed display order.
    pub fn entries(&self) -> [(&'static str, u32); 8] {
        [
            ("👍", self.thumbs_up),
            ("👎", self.thumbs_down),
            ("😄", self.laugh),
            ("🎉", self.hooray),
            ("😕", self.confused),
            ("❤️", self.heart),
            ("🚀", self.rocket),
            ("👀", self.eyes),
        ]
    }
}

/// Issue or pull request label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    pub description: String,
    /// Hex colour without the leading `#`
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    pub state: String,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscussionCategory {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
}

/// A comment on an issue, pull request or discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: u64,
    pub author: User,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reactions: Reactions,
    /// Marked as the accepted answer (discussions only)
    pub is_answer: bool,
    /// Id of the comment this one replies to. Only one level of replies is kept.
    pub reply_to: Option<u64>,
}

/// Read-only surface shared by every resource kind.
pub trait Resource {
    fn kind(&self) -> ResourceKind;
    fn status(&self) -> ResourceStatus;
    fn title(&self) -> &str;
    fn author(&self) -> &User;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn body(&self) -> &str;
    fn comments(&self) -> &[Comment];
    fn reactions(&self) -> &Reactions;
    /// Total comment count as reported upstream. This is a stored value and may
    /// exceed `comments().len()` when the fetched list was truncated.
    fn comment_count(&self) -> u32;
}

/// A GitHub issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: User,
    pub state: ResourceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
    pub reactions: Reactions,
    pub labels: Vec<Label>,
    pub milestone: Option<Milestone>,
    pub total_comments: u32,
    pub url: String,
    pub repository_url: String,
}

/// A GitHub pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: User,
    pub state: ResourceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Issue comments and review comments, in creation order
    pub comments: Vec<Comment>,
    pub reactions: Reactions,
    pub labels: Vec<Label>,
    pub milestone: Option<Milestone>,
    pub total_comments: u32,
    pub url: String,
    pub repository_url: String,
    pub is_draft: bool,
    pub mergeable: bool,
    pub additions: u32,
    pub deletions: u32,
}

/// A GitHub discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discussion {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: User,
    pub state: ResourceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Top-level comments, each followed by its replies
    pub comments: Vec<Comment>,
    pub reactions: Reactions,
    pub total_comments: u32,
    pub url: String,
    pub repository_url: String,
    pub category: DiscussionCategory,
    pub is_answered: bool,
    /// Id of the accepted answer within `comments`
    pub answer_comment_id: Option<u64>,
}

impl Discussion {
    /// The accepted answer, if one is set and present in the fetched comments.
    pub fn answer_comment(&self) -> Option<&Comment> {
        let id = self.answer_comment_id?;
        self.comments.iter().find(|c| c.id == id)
    }
}

macro_rules! impl_resource {
    ($ty:ty, $kind:expr) => {
        impl Resource for $ty {
            fn kind(&self) -> ResourceKind {
                $kind
            }
            fn status(&self) -> ResourceStatus {
                self.state
            }
            fn title(&self) -> &str {
                &self.title
            }
            fn author(&self) -> &User {
                &self.author
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }
            fn body(&self) -> &str {
                &self.body
            }
            fn comments(&self) -> &[Comment] {
                &self.comments
            }
            fn reactions(&self) -> &Reactions {
                &self.reactions
            }
            fn comment_count(&self) -> u32 {
                self.total_comments
            }
        }
    };
}

impl_resource!(Issue, ResourceKind::Issue);
impl_resource!(PullRequest, ResourceKind::PullRequest);
impl_resource!(Discussion, ResourceKind::Discussion);

/// Any fetched resource. Kind-specific fields are reached by matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnyResource {
    Issue(Issue),
    #[serde(rename = "pr")]
    PullRequest(PullRequest),
    Discussion(Discussion),
}

macro_rules! delegate {
    ($self:ident, $method:ident) => {
        match $self {
            AnyResource::Issue(inner) => inner.$method(),
            AnyResource::PullRequest(inner) => inner.$method(),
            AnyResource::Discussion(inner) => inner.$method(),
        }
    };
}

impl AnyResource {
    pub fn number(&self) -> u64 {
        match self {
            AnyResource::Issue(issue) => issue.number,
            AnyResource::PullRequest(pr) => pr.number,
            AnyResource::Discussion(discussion) => discussion.number,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            AnyResource::Issue(issue) => &issue.url,
            AnyResource::PullRequest(pr) => &pr.url,
            AnyResource::Discussion(discussion) => &discussion.url,
        }
    }
}

impl Resource for AnyResource {
    fn kind(&self) -> ResourceKind {
        delegate!(self, kind)
    }
    fn status(&self) -> ResourceStatus {
        delegate!(self, status)
    }
    fn title(&self) -> &str {
        delegate!(self, title)
    }
    fn author(&self) -> &User {
        delegate!(self, author)
    }
    fn created_at(&self) -> DateTime<Utc> {
        delegate!(self, created_at)
    }
    fn updated_at(&self) -> DateTime<Utc> {
        delegate!(self, updated_at)
    }
    fn body(&self) -> &str {
        delegate!(self, body)
    }
    fn comments(&self) -> &[Comment] {
        delegate!(self, comments)
    }
    fn reactions(&self) -> &Reactions {
        delegate!(self, reactions)
    }
    fn comment_count(&self) -> u32 {
        delegate!(self, comment_count)
    }
}

impl From<Issue> for AnyResource {
    fn from(issue: Issue) -> Self {
        AnyResource::Issue(issue)
    }
}

impl From<PullRequest> for AnyResource {
    fn from(pr: PullRequest) -> Self {
        AnyResource::PullRequest(pr)
    }
}

impl From<Discussion> for AnyResource {
    fn from(discussion: Discussion) -> Self {
        AnyResource::Discussion(discussion)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_resource_kinds() {
        assert_eq!(sample_issue().kind(), ResourceKind::Issue);
        assert_eq!(sample_pull_request().kind(), ResourceKind::PullRequest);
        assert_eq!(sample_discussion().kind(), ResourceKind::Discussion);
    }

    #[test]
    fn test_kind_identifiers() {
        assert_eq!(ResourceKind::Issue.to_string(), "issue");
        assert_eq!(ResourceKind::PullRequest.to_string(), "pr");
        assert_eq!(ResourceKind::Discussion.to_string(), "discussion");
        assert_eq!(ResourceKind::PullRequest.label(), "Pull Request");
    }

    #[test]
    fn test_status_from_api_state() {
        assert_eq!(ResourceStatus::from_api_state("open"), ResourceStatus::Open);
        assert_eq!(ResourceStatus::from_api_state("CLOSED"), ResourceStatus::Closed);
        assert_eq!(ResourceStatus::from_api_state("MERGED"), ResourceStatus::Merged);
        assert_eq!(ResourceStatus::from_api_state("weird"), ResourceStatus::Open);
        assert_eq!(ResourceStatus::Merged.to_string(), "merged");
    }

    #[test]
    fn test_accessors_project_stored_fields() {
        let issue = sample_issue();
        assert_eq!(issue.title(), "net/http: panic on nil handler");
        assert_eq!(issue.author().login, "gopher");
        assert_eq!(issue.body(), "Steps to reproduce");
        assert_eq!(issue.created_at(), ts(1));
        assert_eq!(issue.updated_at(), ts(3));
        assert_eq!(issue.status(), ResourceStatus::Open);
        assert_eq!(issue.reactions().thumbs_up, 3);
    }

    #[test]
    fn test_comment_count_aligned_with_comments() {
        let issue = sample_issue();
        assert_eq!(issue.comment_count() as usize, issue.comments().len());
    }

    #[test]
    fn test_comment_count_divergence_is_preserved() {
        let mut issue = sample_issue();
        issue.total_comments = 250;
        assert_eq!(issue.comment_count(), 250);
        assert_eq!(issue.comments().len(), 2);

        let mut pr = sample_pull_request();
        pr.comments.clear();
        assert_eq!(pr.comment_count(), 1);
        assert!(pr.comments().is_empty());
    }

    #[test]
    fn test_any_resource_delegates() {
        let resource = AnyResource::from(sample_discussion());
        assert_eq!(resource.kind(), ResourceKind::Discussion);
        assert_eq!(resource.title(), "How do I cancel a request?");
        assert_eq!(resource.comments().len(), 3);
        assert_eq!(resource.comment_count(), 2);
        assert_eq!(resource.number(), 42);
        assert_eq!(resource.url(), "https://github.com/golang/go/discussions/42");
    }

    #[test]
    fn test_kind_specific_fields_via_match() {
        let resource = AnyResource::from(sample_pull_request());
        match &resource {
            AnyResource::PullRequest(pr) => {
                assert_eq!(pr.status(), ResourceStatus::Merged);
                assert!(pr.merged_at.is_some());
                assert_eq!(pr.additions, 120);
                assert_eq!(pr.deletions, 7);
            }
            other => panic!("expected pull request, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_answer_comment_resolves_within_comments() {
        let discussion = sample_discussion();
        let answer = discussion.answer_comment().unwrap();
        assert_eq!(answer.id, 21);
        assert!(answer.is_answer);
    }

    #[test]
    fn test_answer_comment_missing_from_comments() {
        let mut discussion = sample_discussion();
        discussion.answer_comment_id = Some(9999);
        assert!(discussion.answer_comment().is_none());
        discussion.answer_comment_id = None;
        assert!(discussion.answer_comment().is_none());
    }

    #[test]
    fn test_reply_threads_are_one_level() {
        let discussion = sample_discussion();
        let reply = discussion.comments.iter().find(|c| c.reply_to.is_some()).unwrap();
        let parent = discussion
            .comments
            .iter()
            .find(|c| Some(c.id) == reply.reply_to)
            .unwrap();
        assert!(parent.reply_to.is_none());
    }

    #[test]
    fn test_reaction_total_covers_named_counters() {
        let reactions = sample_issue().reactions;
        assert_eq!(reactions.named_total(), 4);
        assert!(u64::from(reactions.total_count) >= reactions.named_total());
    }

    #[test]
    fn test_inconsistent_reaction_total_is_kept_verbatim() {
        let reactions = Reactions {
            rocket: 5,
            total_count: 1,
            ..Reactions::default()
        };
        assert_eq!(reactions.total_count, 1);
        assert_eq!(reactions.named_total(), 5);
        assert!(!reactions.is_empty());
        assert!(Reactions::default().is_empty());
    }

    #[test]
    fn test_malformed_data_accepted_as_is() {
        let mut issue = sample_issue();
        issue.author = User::default();
        issue.number = 0;
        assert_eq!(issue.author().login, "");
        assert_eq!(AnyResource::from(issue).number(), 0);
    }

    #[test]
    fn test_json_tags_resource_type() {
        let value = serde_json::to_value(AnyResource::from(sample_pull_request())).unwrap();
        assert_eq!(value["type"], "pr");
        assert_eq!(value["state"], "merged");
        assert_eq!(value["number"], 999);
    }
}
