//! Pure text rendering of discussions for the terminal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AppError, Comment, Discussion, DiscussionDetail, OutputFormat};

const ID_WIDTH: usize = 24;
const TITLE_WIDTH: usize = 50;
const AUTHOR_WIDTH: usize = 16;
const CATEGORY_WIDTH: usize = 16;

fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn format_datetime(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::api(format!("Failed to render JSON: {}", e)))
}

pub fn render_discussions(
    discussions: &[Discussion],
    format: OutputFormat,
) -> Result<String, AppError> {
    match format {
        OutputFormat::Json => to_json(discussions),
        OutputFormat::Markdown => Ok(discussions_markdown(discussions)),
        OutputFormat::Table => Ok(discussions_table(discussions)),
    }
}

fn discussions_table(discussions: &[Discussion]) -> String {
    if discussions.is_empty() {
        return "No discussions found in this repository.\n".to_string();
    }

    let mut out = format!(
        "{:<id$}  {:<title$}  {:<author$}  {:>8}  {:<category$}  {}\n",
        "ID",
        "TITLE",
        "AUTHOR",
        "COMMENTS",
        "CATEGORY",
        "UPDATED",
        id = ID_WIDTH,
        title = TITLE_WIDTH,
        author = AUTHOR_WIDTH,
        category = CATEGORY_WIDTH,
    );

    for d in discussions {
        let category = d.category.as_ref().map(|c| c.name.as_str()).unwrap_or("-");
        let title = if d.locked {
            format!("🔒 {}", d.title)
        } else {
            d.title.clone()
        };
        out.push_str(&format!(
            "{:<id$}  {:<title$}  {:<author$}  {:>8}  {:<category$}  {}\n",
            truncate(&d.id, ID_WIDTH),
            truncate(&title, TITLE_WIDTH),
            truncate(&d.author.login, AUTHOR_WIDTH),
            d.comment_count,
            truncate(category, CATEGORY_WIDTH),
            format_date(&d.updated_at),
            id = ID_WIDTH,
            title = TITLE_WIDTH,
            author = AUTHOR_WIDTH,
            category = CATEGORY_WIDTH,
        ));
    }
    out
}

fn discussions_markdown(discussions: &[Discussion]) -> String {
    let mut out = String::from("# Discussions\n");
    for d in discussions {
        out.push_str(&format!("\n## [{}]({})\n\n", d.title, d.url));
        out.push_str(&format!("- **Author:** {}\n", d.author.login));
        if let Some(category) = &d.category {
            out.push_str(&format!("- **Category:** {}\n", category.name));
        }
        out.push_str(&format!("- **Comments:** {}\n", d.comment_count));
        out.push_str(&format!("- **Updated:** {}\n", format_datetime(&d.updated_at)));
        if d.locked {
            out.push_str("- **Locked**\n");
        }
    }
    out
}

pub fn render_detail(detail: &DiscussionDetail, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Json => to_json(detail),
        OutputFormat::Markdown => Ok(detail_markdown(detail)),
        OutputFormat::Table => Ok(detail_text(detail)),
    }
}

fn detail_text(detail: &DiscussionDetail) -> String {
    let d = &detail.discussion;
    let mut out = format!("# {}\n\n", d.title);
    out.push_str(&format!("By: {}\n", d.author.login));
    out.push_str(&format!("Created: {}\n", format_datetime(&d.created_at)));
    out.push_str(&format!("Updated: {}\n", format_datetime(&d.updated_at)));
    out.push_str(&format!("Comments: {}\n", d.comment_count));
    out.push_str(&format!(
        "Category: {}\n",
        d.category.as_ref().map(|c| c.name.as_str()).unwrap_or("N/A")
    ));
    out.push_str(&format!("URL: {}\n", d.url));
    if d.locked {
        out.push_str("🔒 This discussion is locked\n");
    }

    out.push_str(&format!("\nDescription:\n{}\n", detail.body));

    if !detail.comments.is_empty() {
        out.push_str(&format!("\nComments ({}):\n", detail.comments.len()));
        out.push_str(&"═".repeat(60));
        out.push('\n');
        for (index, comment) in detail.comments.iter().enumerate() {
            if index > 0 {
                out.push_str(&"─".repeat(40));
                out.push('\n');
            }
            out.push_str(&format!("\nComment {}\n", index + 1));
            out.push_str(&format!(
                "By: {} • {}\n",
                comment.author.login,
                format_datetime(&comment.created_at)
            ));
            out.push_str(&format!("URL: {}\n\n{}\n", comment.url, comment.body));
        }
    }
    out
}

fn detail_markdown(detail: &DiscussionDetail) -> String {
    let d = &detail.discussion;
    let mut out = format!("# [{}]({})\n\n", d.title, d.url);
    out.push_str(&format!(
        "_Started by **{}** on {}_\n\n",
        d.author.login,
        format_datetime(&d.created_at)
    ));
    out.push_str(&detail.body);
    out.push('\n');

    for comment in &detail.comments {
        out.push_str(&format!(
            "\n---\n\n**{}** commented on {}:\n\n{}\n",
            comment.author.login,
            format_datetime(&comment.created_at),
            comment.body
        ));
    }
    out
}

pub fn render_comment(comment: &Comment) -> String {
    format!("URL: {}\n\nYour comment:\n{}\n", comment.url, comment.body)
}

pub fn render_created(discussion: &Discussion) -> String {
    let category = discussion
        .category
        .as_ref()
        .map(|c| format!(" in {}", c.name))
        .unwrap_or_default();
    format!(
        "Created discussion \"{}\"{}\nURL: {}\n",
        discussion.title, category, discussion.url
    )
}
