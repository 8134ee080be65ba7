//! Multi-source settings loader.

use std::path::{Path, PathBuf};

use anyhow::{Context, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::debug;

use crate::settings::{Settings, normalise};

/// File picked up from the working directory when present.
pub const PROJECT_CONFIG_FILE: &str = "tool-caller.toml";

/// Prefix of environment overrides, e.g. `TOOL_CALLER_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "TOOL_CALLER_";

/// Loads [`Settings`] from every configured source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads settings, later sources overriding earlier ones:
    ///
    /// 1. built-in defaults
    /// 2. `./tool-caller.toml`, if it exists
    /// 3. `explicit`, which must exist
    /// 4. `TOOL_CALLER_*` environment variables, `__` separating sections
    ///
    /// # Errors
    ///
    /// Fails when the explicit file is missing or any source holds values of
    /// the wrong shape.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Settings> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        let project = PathBuf::from(PROJECT_CONFIG_FILE);
        if project.exists() {
            debug!(path = %project.display(), "loading project configuration");
            figment = figment.merge(Toml::file(&project));
        }

        if let Some(path) = explicit {
            ensure!(path.exists(), "config file {} does not exist", path.display());
            debug!(path = %path.display(), "loading explicit configuration");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let settings = figment
            .extract::<Settings>()
            .context("failed to load configuration")?;
        Ok(normalise(settings))
    }

    /// Built-in defaults without consulting any file or the environment.
    #[must_use]
    pub fn load_defaults() -> Settings {
        Settings::default()
    }
}
