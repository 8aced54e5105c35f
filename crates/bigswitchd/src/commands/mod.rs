pub mod check;
pub mod start;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use bigswitch_core::Config;

/// Load and validate the config file, naming the path on failure.
pub fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("loading config {}", path.display()))
}
