//! `trellis compose <name>` — show what the composer hands to the executor.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use trellis_renderer::Composition;

use super::SourceArgs;

/// Arguments for `trellis compose`.
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Template name relative to a template directory.
    pub name: String,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Tabled)]
struct BlockRow {
    #[tabled(rename = "block")]
    block: String,
    #[tabled(rename = "synthetic name")]
    synthetic: String,
}

impl ComposeArgs {
    pub fn run(self) -> Result<()> {
        let config = self.source.config()?;
        let renderer = self.source.renderer(&config)?;
        let composition = renderer
            .compose(&self.name)
            .with_context(|| format!("failed to compose '{}'", self.name))?;
        print_composition(&composition);
        Ok(())
    }
}

fn print_composition(composition: &Composition) {
    let separator = "─".repeat(60).bright_black().to_string();
    let chain = composition.chain.names().join(" <- ");
    println!("{} {}", "chain:".bold(), chain);

    for (depth, node) in composition.chain.nodes().iter().enumerate() {
        println!("{separator}");
        let role = if depth == 0 { "root" } else { "child" };
        println!("{} {}", node.name.cyan().bold(), format!("({role})").bright_black());
        println!("{separator}");
        println!("{}", node.source);
    }
    println!("{separator}");

    let rows: Vec<BlockRow> = composition
        .blocks
        .iter()
        .map(|(block, synthetic)| BlockRow {
            block: block.to_string(),
            synthetic: synthetic.to_string(),
        })
        .collect();
    if rows.is_empty() {
        println!("No blocks defined.");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
