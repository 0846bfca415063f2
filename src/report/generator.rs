//! Session report generation.
//!
//! Renders a finished analysis session as Markdown or JSON.

use crate::models::{SessionMetadata, SessionReport, StageKind, StageRecord};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SessionReport) -> String {
    let mut output = String::new();

    output.push_str("# Datawright Session Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata, report));
    output.push_str(&generate_text_section("Data Summary", &report.data_summary));
    output.push_str(&generate_text_section("Results", &report.results));
    output.push_str(&generate_stages_section(&report.stages));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &SessionMetadata, report: &SessionReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **File:** `{}`\n", metadata.filename));
    section.push_str(&format!(
        "- **Started:** {}\n",
        metadata.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    if metadata.verifier_model != metadata.model_used {
        section.push_str(&format!(
            "- **Verifier Model:** `{}`\n",
            metadata.verifier_model
        ));
    }
    section.push_str(&format!("- **Stages Executed:** {}\n", report.stages.len()));
    section.push_str(&format!(
        "- **Ad-hoc Requests:** {}\n",
        report.request_count()
    ));
    section.push_str(&format!(
        "- **Session Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_text_section(title: &str, body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    format!("## {}\n\n{}\n\n", title, body.trim())
}

/// Generate the executed-stages section.
fn generate_stages_section(stages: &[StageRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Stages\n\n");

    if stages.is_empty() {
        section.push_str("No code was executed.\n\n");
        return section;
    }

    let mut request_number = 0;
    for stage in stages {
        let title = match stage.kind {
            StageKind::Request => {
                request_number += 1;
                format!("{} {} #{}", stage.kind.emoji(), stage.kind, request_number)
            }
            _ => format!("{} {}", stage.kind.emoji(), stage.kind),
        };
        section.push_str(&generate_stage_block(&title, stage));
    }

    section
}

/// Generate a single stage block.
fn generate_stage_block(title: &str, stage: &StageRecord) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", title));
    block.push_str(&format!("> {}\n\n", stage.instructions));

    block.push_str("<details>\n<summary>View Code</summary>\n\n```rhai\n");
    block.push_str(&stage.code);
    block.push_str("\n```\n</details>\n\n");

    if stage.output.trim().is_empty() {
        block.push_str("*No output.*\n\n");
    } else {
        block.push_str("**Output:**\n\n```text\n");
        block.push_str(stage.output.trim_end());
        block.push_str("\n```\n\n");
    }

    block.push_str("---\n\n");

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    "*Report generated by Datawright*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SessionReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
