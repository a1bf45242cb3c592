//! Command-line argument parsing for the key driver
//!
//! Supports:
//! - An explicit remap config file
//! - Overriding timeout, map depth and leader from the config
//! - Choosing the starting mode

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;

use crate::config::RemapConfig;
use crate::keymap::Mode;

/// Resolve Vim-style key sequences through user remappings
#[derive(Parser, Debug)]
#[command(
    name = "modal-keys",
    version,
    about = "Resolve Vim-style key sequences through user remappings"
)]
pub struct CliArgs {
    /// Remap config file (defaults to ~/.config/modal-keys/config.yaml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Milliseconds an ambiguous sequence waits for more keys
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Remap expansions allowed before E223
    #[arg(long, value_name = "N")]
    pub max_map_depth: Option<usize>,

    /// Key substituted for <leader>
    #[arg(long, value_name = "KEY")]
    pub leader: Option<String>,

    /// Mode to start in (normal, insert, visual, ...)
    #[arg(long, value_name = "MODE", default_value = "normal")]
    pub mode: String,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub remap: RemapConfig,
    pub mode: Mode,
}

impl CliArgs {
    /// Load the remap config and apply the command-line overrides
    ///
    /// An explicitly given config file must load; the default one falls
    /// back to defaults when missing or broken.
    pub fn into_config(self) -> anyhow::Result<StartupConfig> {
        let mode =
            Mode::from_name(&self.mode).ok_or_else(|| anyhow!("unknown mode '{}'", self.mode))?;

        let mut remap = match &self.config {
            Some(path) => RemapConfig::load_from(path)
                .with_context(|| format!("failed to load remap config {}", path.display()))?,
            None => RemapConfig::load(),
        };

        if let Some(timeout) = self.timeout {
            remap.timeout = timeout;
        }
        if let Some(depth) = self.max_map_depth {
            remap.max_map_depth = depth;
        }
        if let Some(leader) = self.leader {
            remap.leader = leader;
        }

        Ok(StartupConfig { remap, mode })
    }
}
