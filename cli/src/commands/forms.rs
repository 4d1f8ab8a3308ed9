//! Forms commands

use anyhow::Result;
use colored::Colorize;
use portal_core::{FormSchema, FormSession, RenderedNode};
use serde::Serialize;

use super::{load_forms, select_form, Context};
use crate::output::{self, OutputFormat};
use crate::FormCommands;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormSummary {
    form_id: String,
    title: String,
    fields: usize,
}

impl From<&FormSchema> for FormSummary {
    fn from(schema: &FormSchema) -> Self {
        Self {
            form_id: schema.form_id.clone(),
            title: schema.title.clone(),
            fields: schema.leaves().len(),
        }
    }
}

pub async fn handle(action: FormCommands, ctx: &Context) -> Result<()> {
    let forms = load_forms(&ctx.service).await?;
    match action {
        FormCommands::List => {
            let summaries: Vec<FormSummary> = forms.iter().map(FormSummary::from).collect();
            match ctx.format {
                OutputFormat::Table if summaries.is_empty() => output::notice("No forms available"),
                OutputFormat::Table => {
                    let rows = summaries
                        .iter()
                        .map(|s| vec![s.form_id.clone(), s.title.clone(), s.fields.to_string()]);
                    println!("{}", output::table(["Form", "Title", "Fields"], rows));
                }
                format => format.print(&summaries)?,
            }
        }
        FormCommands::Show { form_id } => {
            let session = FormSession::new(select_form(forms, form_id.as_deref())?);
            let rendered = session.render();
            match ctx.format {
                OutputFormat::Table => {
                    println!("{}", rendered.title.bold());
                    for line in tree_lines(&rendered.nodes, 0) {
                        println!("{}", line);
                    }
                }
                format => format.print(&rendered)?,
            }
        }
        FormCommands::Check { form_id } => {
            let schema = select_form(forms, form_id.as_deref())?;
            let issues: Vec<String> = schema.lint().iter().map(ToString::to_string).collect();
            match ctx.format {
                OutputFormat::Table if issues.is_empty() => {
                    output::success(&format!("{}: no issues found", schema.form_id))
                }
                OutputFormat::Table => {
                    for issue in &issues {
                        output::notice(&format!("{}: {}", schema.form_id, issue));
                    }
                }
                format => format.print(&issues)?,
            }
        }
    }
    Ok(())
}

/// Indented outline of a render tree
pub fn tree_lines(nodes: &[RenderedNode], depth: usize) -> Vec<String> {
    let indent = "  ".repeat(depth);
    let mut lines = Vec::new();
    for node in nodes {
        match node {
            RenderedNode::Group { label, children, .. } => {
                lines.push(format!("{}{}", indent, label.underline()));
                lines.extend(tree_lines(children, depth + 1));
            }
            RenderedNode::Leaf { id, label, kind, required, options, .. } => {
                let marker = if *required { "*" } else { "" };
                let mut line = format!("{}- {}{} ({}, {})", indent, label, marker, id, kind);
                if !options.is_empty() {
                    line.push_str(&format!(": {}", options.join(" | ")));
                }
                lines.push(line);
            }
        }
    }
    lines
}
