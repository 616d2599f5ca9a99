//! Layered settings: built-in defaults, then the TOML file, then `RI_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use ri_linkage::ReconcileConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path: PathBuf,
  pub reconcile:  ReconcileConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self { store_path: PathBuf::from("ri.db"), reconcile: ReconcileConfig::default() }
  }
}

impl Settings {
  /// Load settings from `path` (optional) and the environment.
  ///
  /// Nested keys use a double underscore, e.g. `RI_RECONCILE__THRESHOLD=0.9`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("RI")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")?;

    Ok(Self { store_path: expand_tilde(&settings.store_path), ..settings })
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
