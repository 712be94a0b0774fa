//! Config loading entry points.

use std::path::Path;

use config::{ConfigError, Map};

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{config_file, environment, global_file};
use super::WaypostConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with full precedence: defaults, user file, `config_path` when
    /// given, then environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<WaypostConfig, ConfigError> {
        Self::load_layers(config_path, None)
    }

    /// Same as [`load`](Self::load), reading overrides from `vars` instead of
    /// the process environment.
    pub fn load_with_env(
        config_path: Option<&Path>,
        vars: Map<String, String>,
    ) -> Result<WaypostConfig, ConfigError> {
        Self::load_layers(config_path, Some(vars))
    }

    fn load_layers(
        config_path: Option<&Path>,
        vars: Option<Map<String, String>>,
    ) -> Result<WaypostConfig, ConfigError> {
        let mut builder = builder_with_defaults()?;
        builder = global_file::add_to_builder(builder)?;
        if let Some(path) = config_path {
            builder = config_file::add_to_builder(builder, path)?;
        }
        builder = environment::add_to_builder(builder, vars)?;
        builder.build()?.try_deserialize()
    }

    /// Load defaults plus a single file, ignoring user file and environment.
    pub fn load_from_file(path: &Path) -> Result<WaypostConfig, ConfigError> {
        let builder = config_file::add_to_builder(builder_with_defaults()?, path)?;
        builder.build()?.try_deserialize()
    }

    /// Merge-policy defaults only.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> WaypostConfig {
        builder_with_defaults()
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize())
            .unwrap_or_default()
    }
}
