pub mod compose;
pub mod list;
pub mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use trellis_core::Config;
use trellis_renderer::Renderer;

/// Where templates come from. Shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Template directory; repeat to search several in order.
    #[arg(long = "dir", short = 'd', value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Allowed template extension (e.g. html); repeat for more. Default: any.
    #[arg(long = "ext", short = 'e', value_name = "EXT")]
    pub extensions: Vec<String>,

    /// YAML config file with cache, escaping, and directory settings.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    /// Config file settings overlaid with the flags given on the command line.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_at(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        Ok(config)
    }

    /// Flag directories are searched before the config's.
    pub fn renderer(&self, config: &Config) -> Result<Renderer> {
        let mut config = config.clone();
        let mut dirs = self.dirs.clone();
        dirs.append(&mut config.template_dirs);
        config.template_dirs = dirs;
        if config.template_dirs.is_empty() {
            anyhow::bail!("no template directories; pass --dir or set template_dirs in --config");
        }
        tracing::debug!(
            dirs = ?config.template_dirs,
            extensions = ?config.extensions,
            caching = config.cache.enabled,
            "template sources"
        );
        Ok(Renderer::from_config(&config))
    }
}
