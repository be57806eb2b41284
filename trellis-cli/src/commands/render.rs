//! `trellis render <name>`

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use super::SourceArgs;

/// Arguments for `trellis render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template name relative to a template directory.
    pub name: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// JSON file whose contents become the template data.
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// HTML-escape every expression, overriding the config.
    #[arg(long)]
    pub autoescape: bool,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let mut config = self.source.config()?;
        config.autoescape |= self.autoescape;
        let renderer = self.source.renderer(&config)?;
        let data = load_data(self.data.as_deref())?;

        let mut buf = Vec::new();
        renderer
            .render(&mut buf, &self.name, &data)
            .with_context(|| format!("failed to render '{}'", self.name))?;

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(&buf).context("failed to write output")?;
        out.flush().context("failed to flush output")?;
        Ok(())
    }
}

fn load_data(path: Option<&std::path::Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}
