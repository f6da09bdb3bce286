//! Markdown rendering and plain-text export.

use serde::{Deserialize, Serialize};

use crate::planner::{FeatureBrief, StoryDraft, TaskDraft};

/// Output format for a spec export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

/// Rendered export ready to download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub content: String,
    pub format: ExportFormat,
    pub filename: String,
}

/// Render the canonical markdown document for a brief and its plan.
///
/// Tasks are listed by ascending `order` regardless of input order.
pub fn build_markdown(brief: &FeatureBrief, stories: &[StoryDraft], tasks: &[TaskDraft]) -> String {
    let story_lines = stories
        .iter()
        .enumerate()
        .map(|(idx, story)| {
            let mut block = format!("{}. {}\n", idx + 1, story.story);
            for criterion in &story.acceptance_criteria {
                block.push_str(&format!("  - {}\n", criterion));
            }
            block.push_str(&format!("  - Priority: {}", story.priority));
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut sorted: Vec<&TaskDraft> = tasks.iter().collect();
    sorted.sort_by_key(|t| t.order);

    let task_lines = sorted
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let estimate = task
                .estimate
                .as_deref()
                .filter(|e| !e.is_empty())
                .map(|e| format!(" - {}", e))
                .unwrap_or_default();
            format!(
                "{}. [{}] {} ({}, {}){}\n   {}",
                idx + 1,
                task.group,
                task.title,
                task.status,
                task.priority,
                estimate,
                task.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let risks = brief
        .risk_unknowns
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or("None provided.");

    [
        format!("# {}", brief.title),
        String::new(),
        format!("Template: {}", brief.template_type),
        String::new(),
        "## Goal".to_string(),
        brief.goal.clone(),
        String::new(),
        "## Users".to_string(),
        brief.users.clone(),
        String::new(),
        "## Constraints".to_string(),
        brief.constraints.clone(),
        String::new(),
        "## Risks / Unknowns".to_string(),
        risks.to_string(),
        String::new(),
        "## User Stories".to_string(),
        story_lines,
        String::new(),
        "## Engineering Tasks".to_string(),
        task_lines,
    ]
    .join("\n")
}

/// Flatten markdown into plain text.
///
/// Heading markers are removed, dash bullets and numbered items become
/// `- ` bullets, runs of three or more newlines collapse to two, and the
/// result is trimmed. Applying it twice gives the same result as once.
pub fn markdown_to_text(markdown: &str) -> String {
    let lines: Vec<String> = markdown.split('\n').map(flatten_line).collect();
    let joined = lines.join("\n");
    collapse_blank_runs(&joined).trim().to_string()
}

fn flatten_line(line: &str) -> String {
    let mut rest = line;

    // Strip every leading heading marker, including stacked ones like "# # x".
    loop {
        let candidate = rest.trim_start();
        if !candidate.starts_with('#') {
            break;
        }
        rest = candidate.trim_start_matches('#').trim_start();
    }

    let indented = rest.trim_start();
    if let Some(after) = indented.strip_prefix('-') {
        return format!("- {}", after.trim_start());
    }

    let digits = indented.len() - indented.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(after) = indented[digits..].strip_prefix('.') {
            return format!("- {}", after.trim_start());
        }
    }

    rest.to_string()
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}

/// Suggested download name: whitespace runs become `-`, lower-cased.
pub fn export_filename(title: &str, format: ExportFormat) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for ch in title.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            slug.extend(ch.to_lowercase());
        }
    }
    format!("{}.{}", slug, format.extension())
}

/// Render a stored spec's markdown in the requested format.
pub fn export_document(title: &str, markdown: &str, format: ExportFormat) -> ExportDocument {
    let content = match format {
        ExportFormat::Markdown => markdown.to_string(),
        ExportFormat::Text => markdown_to_text(markdown),
    };
    ExportDocument {
        content,
        format,
        filename: export_filename(title, format),
    }
}
