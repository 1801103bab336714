pub mod types;

pub use types::{OutputFormat, RenderOptions};

use chrono::{DateTime, Utc};
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::types::{AnyResource, Comment, Reactions, Resource, User};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write output: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize resource: {0}")]
    Json(#[from] serde_json::Error),
}

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^A-Za-z0-9_@/\[`])@([A-Za-z0-9](?:[A-Za-z0-9-]{0,38}))")
        .expect("Failed to compile mention regex")
});

/// Render a resource in the format selected by `options`.
pub fn render(resource: &AnyResource, options: &RenderOptions) -> Result<String, RenderError> {
    match options.format {
        OutputFormat::Markdown => Ok(to_markdown(resource, options)),
        OutputFormat::Json => to_json(resource),
    }
}

pub fn to_json(resource: &AnyResource) -> Result<String, RenderError> {
    let mut json = serde_json::to_string_pretty(resource)?;
    json.push('\n');
    Ok(json)
}

/// Render a resource as a Markdown document.
///
/// ```text
/// # Title #123
///
/// - **Type:** Issue
/// - **Status:** open
/// ...
///
/// ## Description
///
/// ## Comments (2)
/// ```
pub fn to_markdown(resource: &AnyResource, options: &RenderOptions) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {} #{}\n\n", resource.title(), resource.number()));

    for (field, value) in metadata(resource, options) {
        md.push_str(&format!("- **{field}:** {value}\n"));
    }
    md.push('\n');

    md.push_str("## Description\n\n");
    push_body(&mut md, resource.body(), options);
    if options.enable_reactions {
        push_reactions(&mut md, resource.reactions());
    }

    push_comments(&mut md, resource, options);
    md
}

fn metadata(resource: &AnyResource, options: &RenderOptions) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("Type", resource.kind().label().to_string()),
        ("Status", resource.status().to_string()),
        ("Author", author(resource.author(), options)),
        ("Created", timestamp(resource.created_at())),
        ("Updated", timestamp(resource.updated_at())),
    ];

    match resource {
        AnyResource::Issue(issue) => {
            if let Some(closed_at) = issue.closed_at {
                fields.push(("Closed", timestamp(closed_at)));
            }
            if !issue.labels.is_empty() {
                fields.push(("Labels", label_list(issue.labels.iter().map(|l| l.name.as_str()))));
            }
            if let Some(milestone) = &issue.milestone {
                fields.push(("Milestone", milestone.title.clone()));
            }
        }
        AnyResource::PullRequest(pr) => {
            if let Some(closed_at) = pr.closed_at {
                fields.push(("Closed", timestamp(closed_at)));
            }
            if let Some(merged_at) = pr.merged_at {
                fields.push(("Merged", timestamp(merged_at)));
            }
            if !pr.labels.is_empty() {
                fields.push(("Labels", label_list(pr.labels.iter().map(|l| l.name.as_str()))));
            }
            if let Some(milestone) = &pr.milestone {
                fields.push(("Milestone", milestone.title.clone()));
            }
            fields.push(("Draft", yes_no(pr.is_draft)));
            fields.push(("Mergeable", yes_no(pr.mergeable)));
            fields.push(("Changes", format!("+{} -{}", pr.additions, pr.deletions)));
        }
        AnyResource::Discussion(discussion) => {
            if let Some(closed_at) = discussion.closed_at {
                fields.push(("Closed", timestamp(closed_at)));
            }
            fields.push(("Category", discussion.category.name.clone()));
            fields.push(("Answered", yes_no(discussion.is_answered)));
            if let Some(answer) = discussion.answer_comment() {
                fields.push((
                    "Answer",
                    format!("comment {} by {}", answer.id, author(&answer.author, options)),
                ));
            }
        }
    }

    fields.push(("Comments", resource.comment_count().to_string()));
    fields.push(("URL", resource.url().to_string()));
    fields
}

fn push_comments(md: &mut String, resource: &AnyResource, options: &RenderOptions) {
    let comments = resource.comments();
    let total = resource.comment_count() as usize;
    if comments.is_empty() && total == 0 {
        return;
    }

    md.push_str(&format!("## Comments ({})\n\n", comments.len()));
    if total > comments.len() {
        md.push_str(&format!("_Showing {} of {} comments._\n\n", comments.len(), total));
    }

    for comment in comments {
        md.push_str(&comment_heading(comment, options));
        push_body(md, &comment.body, options);
        if options.enable_reactions {
            push_reactions(md, &comment.reactions);
        }
    }
}

fn comment_heading(comment: &Comment, options: &RenderOptions) -> String {
    let who = author(&comment.author, options);
    let when = timestamp(comment.created_at);
    let mut heading = match comment.reply_to {
        Some(parent) => format!("#### ↳ {who} replied to comment {parent} on {when}"),
        None => format!("### {who} commented on {when}"),
    };
    if comment.is_answer {
        heading.push_str(" ✅ Accepted answer");
    }
    heading.push_str("\n\n");
    heading
}

fn push_body(md: &mut String, body: &str, options: &RenderOptions) {
    let body = body.trim();
    if body.is_empty() {
        md.push_str("_No description provided._\n\n");
        return;
    }
    if options.enable_user_links {
        md.push_str(&link_user_mentions(body));
    } else {
        md.push_str(body);
    }
    md.push_str("\n\n");
}

fn push_reactions(md: &mut String, reactions: &Reactions) {
    if reactions.is_empty() {
        return;
    }
    let counts: Vec<String> = reactions
        .entries()
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(emoji, n)| format!("{emoji} {n}"))
        .collect();
    md.push_str(&format!("**Reactions:** {}\n\n", counts.join(" · ")));
}

/// Replace `@login` mentions with profile links, leaving fenced code untouched.
pub fn link_user_mentions(text: &str) -> String {
    let mut in_fence = false;
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            lines.push(line.to_string());
            continue;
        }
        if in_fence {
            lines.push(line.to_string());
        } else {
            lines.push(
                MENTION_RE
                    .replace_all(line, "${1}[@${2}](https://github.com/${2})")
                    .into_owned(),
            );
        }
    }
    lines.join("\n")
}

fn author(user: &User, options: &RenderOptions) -> String {
    if !options.enable_user_links {
        return format!("@{}", user.login);
    }
    let url = if user.url.is_empty() {
        format!("https://github.com/{}", user.login)
    } else {
        user.url.clone()
    };
    format!("[@{}]({})", user.login, url)
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn yes_no(flag: bool) -> String {
    let word = if flag { "yes" } else { "no" };
    word.to_string()
}

fn label_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(|n| format!("`{n}`")).collect::<Vec<_>>().join(", ")
}

/// Write rendered output to `output_path`, or stdout when `None`.
#[instrument(skip(content), fields(bytes = content.len()))]
pub fn output(content: &str, output_path: Option<&Path>) -> Result<(), RenderError> {
    match output_path {
        None => {
            debug!("writing output to stdout");
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing output to file");
            std::fs::write(path, content)?;
            Ok(())
        }
    }
}
