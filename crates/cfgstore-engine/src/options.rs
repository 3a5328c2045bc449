//! Backend options file
//!
//! ```toml
//! schema_file = "cfgstore.spec"
//! candidate_db = "db/candidate.db"
//! running_db = "db/running.db"
//! archive_dir = "archive"
//! autocommit = false
//! hook_timeout_ms = 5000
//! log_profile = "production"
//! ```
//!
//! Relative paths are taken from the directory holding the options file.

use cfgstore_core::errors::{ExError, ExErrorKind};
use cfgstore_core::logging_facility::Profile;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 5000;

fn default_hook_timeout_ms() -> u64 {
    DEFAULT_HOOK_TIMEOUT_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    pub schema_file: PathBuf,
    pub candidate_db: PathBuf,
    pub running_db: PathBuf,
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    /// Document file loaded into candidate and committed at startup
    #[serde(default)]
    pub startup_config: Option<PathBuf>,
    #[serde(default)]
    pub autocommit: bool,
    #[serde(default = "default_hook_timeout_ms")]
    pub hook_timeout_ms: u64,
    #[serde(default)]
    pub log_profile: Profile,
}

impl Options {
    /// Parse options text, resolving relative paths against `base_dir`
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, ExError> {
        let mut options: Options = toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_options")
                .with_message(e.to_string())
        })?;
        if options.hook_timeout_ms == 0 {
            return Err(ExError::new(ExErrorKind::Config)
                .with_op("load_options")
                .with_message("hook_timeout_ms must be positive"));
        }
        options.resolve_paths(base_dir);
        Ok(options)
    }

    /// Read an options file
    pub fn load(path: &Path) -> Result<Self, ExError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("load_options")
                .with_sub_code(e.raw_os_error().unwrap_or(0))
                .with_message(format!("cannot read options {}: {}", path.display(), e))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let options = Self::from_toml_str(&text, base)?;
        tracing::debug!(path = %path.display(), "options loaded");
        Ok(options)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout_ms)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.schema_file);
        resolve(&mut self.candidate_db);
        resolve(&mut self.running_db);
        if let Some(p) = self.archive_dir.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.startup_config.as_mut() {
            resolve(p);
        }
    }
}
