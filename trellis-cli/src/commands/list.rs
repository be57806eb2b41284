//! `trellis list`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::SourceArgs;

/// Arguments for `trellis list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ListJson {
    count: usize,
    templates: Vec<String>,
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "template")]
    name: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let config = self.source.config()?;
        let renderer = self.source.renderer(&config)?;
        let templates = renderer
            .list_templates()
            .context("failed to list template directories")?;

        if self.json {
            let payload = ListJson {
                count: templates.len(),
                templates,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize template list")?
            );
            return Ok(());
        }

        if templates.is_empty() {
            println!("No templates found.");
            return Ok(());
        }
        println!("{} {}", templates.len().to_string().bold(), "templates".bright_black());
        let rows: Vec<TemplateRow> = templates.into_iter().map(|name| TemplateRow { name }).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
